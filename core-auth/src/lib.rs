//! # Authentication Module
//!
//! Bearer-token authentication for the storage API.
//!
//! ## Overview
//!
//! - [`CredentialProvider`] implementations supply the access token, asked
//!   once per attempt so refreshed tokens are picked up
//! - [`AuthInterceptor`] wraps any `HttpClient`, attaches the token and
//!   retries exactly once when the API answers "log in required" (1000)
//! - [`oauth`] builds authorization page URLs and parses the redirect
//!
//! ## Usage
//!
//! ```ignore
//! use core_auth::{AuthInterceptor, StaticTokenProvider};
//! use std::sync::Arc;
//!
//! let transport = Arc::new(AuthInterceptor::new(
//!     http_client,
//!     Arc::new(StaticTokenProvider::new(access_token)),
//! ));
//! ```

pub mod credentials;
pub mod error;
pub mod interceptor;
pub mod oauth;

pub use credentials::{
    CredentialProvider, FnCredentialProvider, NoCredentials, SharedToken, SignedOut,
    StaticTokenProvider,
};
pub use error::{AuthError, Result};
pub use interceptor::{AuthInterceptor, LOGIN_REQUIRED, PEEK_LIMIT};
pub use oauth::{AuthorizationData, AuthorizationRequest, ResponseType};
