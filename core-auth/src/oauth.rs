//! OAuth 2.0 authorization helpers
//!
//! Builds the URL of the provider's authorization page and parses the
//! redirect the browser is sent back to. Presenting the page is left to the
//! host application.
//!
//! # Example
//!
//! ```no_run
//! use core_auth::oauth::{AuthorizationData, AuthorizationRequest, ResponseType};
//!
//! # fn example() -> core_auth::Result<()> {
//! let request = AuthorizationRequest::builder("my-client-id")
//!     .response_type(ResponseType::Token)
//!     .redirect_uri("myapp://oauth")
//!     .with_random_state()
//!     .build()?;
//!
//! let url = request.authorize_url()?;
//! // Open `url` in a browser, wait for the redirect...
//! # let redirect = "";
//! let data = AuthorizationData::from_redirect_url(&request, redirect)?;
//! println!("signed in as user {}", data.user_id);
//! # Ok(())
//! # }
//! ```

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use tracing::{debug, instrument};
use url::Url;

use crate::credentials::StaticTokenProvider;
use crate::error::{AuthError, Result};

/// Authorization page of the service
pub const AUTHORIZE_URL: &str = "https://my.pcloud.com/oauth2/authorize";

/// What the authorization page hands back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseType {
    /// An authorization code to be exchanged server-side
    Code,
    /// An access token directly in the redirect fragment
    #[default]
    Token,
}

impl ResponseType {
    fn as_str(self) -> &'static str {
        match self {
            ResponseType::Code => "code",
            ResponseType::Token => "token",
        }
    }
}

/// Parameters of an authorization attempt
#[derive(Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub response_type: ResponseType,
    pub client_id: String,
    pub permissions: BTreeSet<String>,
    pub force_approval: bool,
    pub redirect_uri: Option<String>,
    pub state: Option<String>,
}

impl fmt::Debug for AuthorizationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationRequest")
            .field("response_type", &self.response_type)
            .field("client_id", &self.client_id)
            .field("permissions", &self.permissions)
            .field("force_approval", &self.force_approval)
            .field("redirect_uri", &self.redirect_uri)
            .field("state", &self.state.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl AuthorizationRequest {
    pub fn builder(client_id: impl Into<String>) -> AuthorizationRequestBuilder {
        AuthorizationRequestBuilder {
            request: AuthorizationRequest {
                response_type: ResponseType::default(),
                client_id: client_id.into(),
                permissions: BTreeSet::new(),
                force_approval: false,
                redirect_uri: None,
                state: None,
            },
        }
    }

    /// Builder pre-filled with this request
    pub fn to_builder(&self) -> AuthorizationRequestBuilder {
        AuthorizationRequestBuilder {
            request: self.clone(),
        }
    }

    /// URL of the authorization page for this request
    #[instrument(skip(self), fields(client_id = %self.client_id))]
    pub fn authorize_url(&self) -> Result<Url> {
        let mut url = Url::parse(AUTHORIZE_URL)
            .map_err(|e| AuthError::InvalidRequest(format!("Invalid authorize URL: {}", e)))?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("response_type", self.response_type.as_str());
            query.append_pair("client_id", &self.client_id);
            if let Some(redirect_uri) = &self.redirect_uri {
                query.append_pair("redirect_uri", redirect_uri);
            }
            if self.force_approval {
                query.append_pair("force_reapprove", "true");
            }
            if !self.permissions.is_empty() {
                let permissions: Vec<&str> = self.permissions.iter().map(String::as_str).collect();
                query.append_pair("permissions", &permissions.join(","));
            }
            if let Some(state) = &self.state {
                query.append_pair("state", state);
            }
        }

        debug!(response_type = self.response_type.as_str(), "Built authorization URL");
        Ok(url)
    }
}

pub struct AuthorizationRequestBuilder {
    request: AuthorizationRequest,
}

impl AuthorizationRequestBuilder {
    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.request.response_type = response_type;
        self
    }

    pub fn permission(mut self, permission: impl Into<String>) -> Self {
        self.request.permissions.insert(permission.into());
        self
    }

    /// Ask the user to approve access again even if they did before
    pub fn force_approval(mut self, force: bool) -> Self {
        self.request.force_approval = force;
        self
    }

    pub fn redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.request.redirect_uri = Some(redirect_uri.into());
        self
    }

    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.request.state = Some(state.into());
        self
    }

    /// Attach a random 16-byte, base64url-encoded anti-forgery state
    pub fn with_random_state(self) -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill(&mut bytes);
        self.state(URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn build(self) -> Result<AuthorizationRequest> {
        if self.request.client_id.trim().is_empty() {
            return Err(AuthError::InvalidRequest(
                "client id must not be empty".to_string(),
            ));
        }
        if let Some(redirect_uri) = &self.request.redirect_uri {
            Url::parse(redirect_uri).map_err(|e| {
                AuthError::InvalidRequest(format!("invalid redirect URI '{}': {}", redirect_uri, e))
            })?;
        }
        Ok(self.request)
    }
}

/// Outcome of a granted authorization
#[derive(Clone, PartialEq, Eq)]
pub struct AuthorizationData {
    /// Present for [`ResponseType::Token`]
    pub access_token: Option<String>,
    /// Present for [`ResponseType::Code`]
    pub authorization_code: Option<String>,
    pub user_id: u64,
    pub location_id: u64,
    /// API host serving this account's data location
    pub api_host: String,
}

impl fmt::Debug for AuthorizationData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationData")
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field(
                "authorization_code",
                &self.authorization_code.as_ref().map(|_| "[REDACTED]"),
            )
            .field("user_id", &self.user_id)
            .field("location_id", &self.location_id)
            .field("api_host", &self.api_host)
            .finish()
    }
}

impl AuthorizationData {
    /// Parse the redirect URL the authorization page navigated to.
    ///
    /// Parameters are read from the fragment, falling back to the query.
    ///
    /// # Errors
    ///
    /// - [`AuthError::AccessDenied`] when the redirect carries neither a token
    ///   nor a code (or carries an `error` parameter)
    /// - [`AuthError::StateMismatch`] when the request had a state and the
    ///   redirect does not echo it
    /// - [`AuthError::InvalidRedirect`] when a required parameter is missing
    ///   or malformed
    pub fn from_redirect_url(request: &AuthorizationRequest, redirect_url: &str) -> Result<Self> {
        let url = Url::parse(redirect_url)
            .map_err(|e| AuthError::InvalidRedirect(format!("unparseable URL: {}", e)))?;

        let raw = match url.fragment() {
            Some(fragment) if !fragment.is_empty() => fragment.to_string(),
            _ => url.query().unwrap_or_default().to_string(),
        };
        let params: HashMap<String, String> = url::form_urlencoded::parse(raw.as_bytes())
            .into_owned()
            .collect();

        if let Some(error) = params.get("error") {
            return Err(AuthError::AccessDenied(error.clone()));
        }
        if !params.contains_key("access_token") && !params.contains_key("code") {
            return Err(AuthError::AccessDenied(
                "redirect carries no credential".to_string(),
            ));
        }
        if let Some(expected) = &request.state {
            if params.get("state") != Some(expected) {
                return Err(AuthError::StateMismatch);
            }
        }

        let (access_token, authorization_code) = match request.response_type {
            ResponseType::Token => (Some(required(&params, "access_token")?), None),
            ResponseType::Code => (None, Some(required(&params, "code")?)),
        };

        Ok(Self {
            access_token,
            authorization_code,
            user_id: required_u64(&params, "userid")?,
            location_id: required_u64(&params, "locationid")?,
            api_host: required(&params, "hostname")?,
        })
    }

    /// Credential provider for the granted access token, if any
    pub fn token_provider(&self) -> Option<StaticTokenProvider> {
        self.access_token.as_deref().map(StaticTokenProvider::new)
    }
}

fn required(params: &HashMap<String, String>, key: &str) -> Result<String> {
    params
        .get(key)
        .cloned()
        .ok_or_else(|| AuthError::InvalidRedirect(format!("missing '{}' parameter", key)))
}

fn required_u64(params: &HashMap<String, String>, key: &str) -> Result<u64> {
    let value = required(params, key)?;
    value.parse().map_err(|_| {
        AuthError::InvalidRedirect(format!("'{}' is not a valid value for '{}'", value, key))
    })
}
