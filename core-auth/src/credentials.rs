//! Credential providers
//!
//! A [`CredentialProvider`] is asked for the current access token before
//! every attempt of an exchange, so a provider backed by refreshable state
//! hands out the newest token on the login-required retry.

use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{AuthError, Result};

/// Source of the bearer token attached to outgoing requests.
///
/// `Ok(None)` means "send the request anonymously"; an error aborts the
/// exchange before anything is sent.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn access_token(&self) -> Result<Option<String>>;
}

/// Always returns the same token
#[derive(Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl CredentialProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<Option<String>> {
        Ok(Some(self.token.clone()))
    }
}

/// Token slot that can be replaced or cleared while calls are running.
///
/// Cloning yields a handle to the same slot.
#[derive(Clone, Default)]
pub struct SharedToken {
    token: Arc<RwLock<Option<String>>>,
}

impl SharedToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Arc::new(RwLock::new(Some(token.into()))),
        }
    }

    /// An empty slot; requests go out without credentials until [`set`](Self::set)
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub async fn set(&self, token: impl Into<String>) {
        *self.token.write().await = Some(token.into());
    }

    pub async fn clear(&self) {
        *self.token.write().await = None;
    }

    pub async fn is_set(&self) -> bool {
        self.token.read().await.is_some()
    }
}

impl fmt::Debug for SharedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedToken").finish_non_exhaustive()
    }
}

#[async_trait]
impl CredentialProvider for SharedToken {
    async fn access_token(&self) -> Result<Option<String>> {
        Ok(self.token.read().await.clone())
    }
}

/// Adapts an async closure into a [`CredentialProvider`].
///
/// # Example
///
/// ```ignore
/// use core_auth::credentials::FnCredentialProvider;
///
/// let provider = FnCredentialProvider::new(|| async {
///     keychain_lookup().await.map(Some)
/// });
/// ```
pub struct FnCredentialProvider<F> {
    fetch: F,
}

impl<F, Fut> FnCredentialProvider<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<String>>> + Send,
{
    pub fn new(fetch: F) -> Self {
        Self { fetch }
    }
}

#[async_trait]
impl<F, Fut> CredentialProvider for FnCredentialProvider<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<String>>> + Send,
{
    async fn access_token(&self) -> Result<Option<String>> {
        (self.fetch)().await
    }
}

/// Provider that never yields a token
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCredentials;

#[async_trait]
impl CredentialProvider for NoCredentials {
    async fn access_token(&self) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Provider that always fails; useful for signed-out states
#[derive(Debug, Clone, Copy, Default)]
pub struct SignedOut;

#[async_trait]
impl CredentialProvider for SignedOut {
    async fn access_token(&self) -> Result<Option<String>> {
        Err(AuthError::NotAuthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_static_provider() {
        let provider = StaticTokenProvider::new("abc");
        assert_eq!(provider.access_token().await.unwrap(), Some("abc".into()));
        assert!(!format!("{:?}", provider).contains("abc"));
    }

    #[tokio::test]
    async fn test_shared_token_updates_are_visible_to_clones() {
        let token = SharedToken::anonymous();
        let handle = token.clone();
        assert_eq!(token.access_token().await.unwrap(), None);

        handle.set("fresh").await;
        assert_eq!(token.access_token().await.unwrap(), Some("fresh".into()));

        handle.clear().await;
        assert!(!token.is_set().await);
    }

    #[tokio::test]
    async fn test_fn_provider_is_called_each_time() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let provider = FnCredentialProvider::new(move || {
            let n = c.fetch_add(1, Ordering::SeqCst);
            async move { Ok(Some(format!("token-{}", n))) }
        });

        assert_eq!(provider.access_token().await.unwrap(), Some("token-0".into()));
        assert_eq!(provider.access_token().await.unwrap(), Some("token-1".into()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_signed_out_fails() {
        assert_eq!(
            SignedOut.access_token().await,
            Err(AuthError::NotAuthenticated)
        );
    }
}
