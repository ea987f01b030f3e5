use crate::error::{Result, SocketError};
use async_trait::async_trait;

/// Trait for providing the access credential embedded at connect time
///
/// Called on every connection and reconnection, so a provider backed by a
/// token store always hands out its current value. The manager itself has
/// no refresh operation: after a login/logout the caller closes and reopens.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Get the current access token
    ///
    /// # Returns
    /// * `Ok(Some(token))` - Embed this token in the sub-protocol
    /// * `Ok(None)` - Connect without a sub-protocol
    /// * `Err(SocketError)` - Lookup failed, the connection attempt is abandoned
    async fn access_token(&self) -> Result<Option<String>>;
}

/// A provider for anonymous connections
pub struct NoCredentials;

#[async_trait]
impl CredentialProvider for NoCredentials {
    async fn access_token(&self) -> Result<Option<String>> {
        Ok(None)
    }
}

/// A fixed token
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl CredentialProvider for StaticToken {
    async fn access_token(&self) -> Result<Option<String>> {
        Ok(Some(self.token.clone()))
    }
}

/// Reads the token from an environment variable on each connect
///
/// A missing variable means anonymous; a variable holding non-unicode data
/// is an error.
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

#[async_trait]
impl CredentialProvider for EnvToken {
    async fn access_token(&self) -> Result<Option<String>> {
        match std::env::var(&self.var) {
            Ok(token) if token.is_empty() => Ok(None),
            Ok(token) => Ok(Some(token)),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(e) => Err(SocketError::Credentials(format!("{}: {}", self.var, e))),
        }
    }
}
