//! Credential sources for stream and REST requests.

use std::fmt;

use async_trait::async_trait;

use crate::error::Result;

/// Source of bearer tokens for cloud requests.
///
/// The SDK queries the provider on every stream connect and reconnect
/// attempt and on every REST request, so implementations backed by
/// refreshing OAuth flows stay valid across long-lived sessions.
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use voltstream::{AuthProvider, Error, Result};
///
/// #[derive(Debug)]
/// struct EnvToken;
///
/// #[async_trait]
/// impl AuthProvider for EnvToken {
///     async fn access_token(&self) -> Result<String> {
///         std::env::var("VOLT_TOKEN").map_err(|_| Error::auth("VOLT_TOKEN not set"))
///     }
/// }
/// ```
#[async_trait]
pub trait AuthProvider: Send + Sync + fmt::Debug {
    /// Produce a currently-valid access token.
    async fn access_token(&self) -> Result<String>;
}

/// A fixed bearer token.
#[derive(Clone)]
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    /// Wrap a token string.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl AuthProvider for StaticToken {
    async fn access_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}

// Tokens stay out of debug output and logs.
impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticToken").field("token", &"***").finish()
    }
}
