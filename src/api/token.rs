use anyhow::Result;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

/// Supplies the bearer credential for outgoing requests.
///
/// This is the only contact the engine has with the identity provider: it
/// asks for the current access token before every request and never inspects
/// session state itself.
///
/// Returns `Ok(None)` when there is no active session.
/// Returns `Err` when the provider could not be queried.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Result<Option<SecretString>>;
}

/// A fixed token, e.g. a service credential handed over at startup.
pub struct StaticTokenSource {
    token: SecretString,
}

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::from(token.into()),
        }
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn token(&self) -> Result<Option<SecretString>> {
        Ok(Some(SecretString::from(
            self.token.expose_secret().to_string(),
        )))
    }
}

/// Reads the token from an environment variable on every request.
#[derive(Debug, Clone)]
pub struct EnvTokenSource {
    var: String,
}

impl EnvTokenSource {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    pub fn var(&self) -> &str {
        &self.var
    }
}

#[async_trait]
impl TokenSource for EnvTokenSource {
    async fn token(&self) -> Result<Option<SecretString>> {
        match std::env::var(&self.var) {
            Ok(value) if !value.trim().is_empty() => {
                Ok(Some(SecretString::from(value.trim().to_string())))
            }
            Ok(_) | Err(std::env::VarError::NotPresent) => Ok(None),
            Err(err) => Err(anyhow::anyhow!("Failed to read {}: {err}", self.var)),
        }
    }
}

/// Never authenticates.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTokenSource;

#[async_trait]
impl TokenSource for NoTokenSource {
    async fn token(&self) -> Result<Option<SecretString>> {
        Ok(None)
    }
}
