//! Bearer-token interceptor with a single login-required retry
//!
//! [`AuthInterceptor`] is itself an [`HttpClient`] wrapping the real
//! transport. For every exchange it:
//!
//! 1. asks the [`CredentialProvider`] for a token and attaches it
//! 2. sends the request
//! 3. on a 2xx reply whose JSON body starts with `"result": 1000`, drops the
//!    reply, asks for a token again and resends once
//!
//! Only the first [`PEEK_LIMIT`] bytes are inspected and nothing is consumed,
//! so large download bodies still stream through untouched.

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse, ResponseBody};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::credentials::CredentialProvider;

/// API result code meaning "log in required"
pub const LOGIN_REQUIRED: u64 = 1000;

/// Maximum number of body bytes inspected for the result code
pub const PEEK_LIMIT: usize = 1024;

pub struct AuthInterceptor {
    inner: Arc<dyn HttpClient>,
    credentials: Arc<dyn CredentialProvider>,
}

impl AuthInterceptor {
    pub fn new(inner: Arc<dyn HttpClient>, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self { inner, credentials }
    }

    async fn authorize(&self, mut request: HttpRequest) -> Result<HttpRequest> {
        match self.credentials.access_token().await {
            Ok(Some(token)) => Ok(request.bearer_token(token)),
            Ok(None) => {
                request.headers.remove("Authorization");
                Ok(request)
            }
            Err(e) => {
                warn!(error = %e, "Credential provider failed; request not sent");
                Err(BridgeError::Credentials(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl HttpClient for AuthInterceptor {
    #[instrument(skip(self, request), fields(url = %request.url))]
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let first = self.authorize(request.clone()).await?;
        let mut response = self.inner.execute(first).await?;

        if response.is_success() && requires_login(&mut response.body).await? {
            debug!("Login required; retrying once with a fresh credential");
            drop(response);
            let retry = self.authorize(request).await?;
            return self.inner.execute(retry).await;
        }

        Ok(response)
    }
}

async fn requires_login(body: &mut ResponseBody) -> Result<bool> {
    let prefix = body.peek(PEEK_LIMIT).await?;
    Ok(leading_result_code(prefix) == Some(LOGIN_REQUIRED))
}

/// Value of `result` when it is the first member of a JSON object.
///
/// Works on a truncated prefix; returns `None` when the prefix does not start
/// that way or ends inside the number.
pub fn leading_result_code(prefix: &[u8]) -> Option<u64> {
    let rest = skip_ws(prefix).strip_prefix(b"{")?;
    let rest = skip_ws(rest).strip_prefix(b"\"result\"")?;
    let rest = skip_ws(rest).strip_prefix(b":")?;
    let rest = skip_ws(rest);

    let digits = rest.iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 || digits == rest.len() {
        return None;
    }
    std::str::from_utf8(&rest[..digits]).ok()?.parse().ok()
}

fn skip_ws(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    &bytes[start..]
}
