//! Environment-variable token provider
//!
//! Token acquisition is out of scope for the client: an external tool
//! (Azure CLI, a broker, a test harness) issues the bearer token and
//! hands it over through `SPYGLASS_ACCESS_TOKEN`. This provider is
//! silent-only; it cannot prompt.

use async_trait::async_trait;
use spyglass_core::{AccessToken, SpyglassError, SpyglassResult, TokenProvider};

/// Environment variable the provider reads on every acquisition
pub const ACCESS_TOKEN_ENV_VAR: &str = "SPYGLASS_ACCESS_TOKEN";

/// [`TokenProvider`] backed by a user environment variable
pub struct EnvTokenProvider;

#[async_trait]
impl TokenProvider for EnvTokenProvider {
    async fn acquire_token_silent(&self) -> SpyglassResult<Option<AccessToken>> {
        match std::env::var(ACCESS_TOKEN_ENV_VAR) {
            Ok(secret) if !secret.trim().is_empty() => {
                Ok(Some(AccessToken::new(secret.trim().to_string())))
            }
            _ => Ok(None),
        }
    }

    async fn acquire_token_interactive(&self) -> SpyglassResult<AccessToken> {
        Err(SpyglassError::auth(format!(
            "no token available; export {ACCESS_TOKEN_ENV_VAR} with a bearer token \
             issued for the configured scopes"
        )))
    }
}
