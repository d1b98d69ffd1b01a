//! Headers shared by every pCloud request

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use core_runtime::ClientConfig;
use std::sync::Arc;

/// Adds the client's `User-Agent` and a `Cookie` carrying the global
/// parameters (`timeformat=timestamp` by default) to each request.
pub struct GlobalParamsInterceptor {
    inner: Arc<dyn HttpClient>,
    user_agent: String,
    cookie: Option<String>,
}

impl GlobalParamsInterceptor {
    pub fn new(inner: Arc<dyn HttpClient>, config: &ClientConfig) -> Self {
        Self {
            inner,
            user_agent: config.user_agent().to_string(),
            cookie: cookie_value(config.global_params()),
        }
    }
}

fn cookie_value(params: &[(String, String)]) -> Option<String> {
    if params.is_empty() {
        return None;
    }
    let pairs: Vec<String> = params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    Some(pairs.join("; "))
}

#[async_trait]
impl HttpClient for GlobalParamsInterceptor {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut request = request.header("User-Agent", self.user_agent.as_str());
        if let Some(cookie) = &self.cookie {
            request = request.header("Cookie", cookie.as_str());
        }
        self.inner.execute(request).await
    }
}
