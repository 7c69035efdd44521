use crate::Credential;
use async_trait::async_trait;
use ddbkit_core::{Context, ProvideCredential, Result};

/// StaticCredentialProvider hands out a session that was obtained elsewhere.
///
/// Once the session expires the provider keeps returning it, so callers
/// see the stale credential rejected by the service instead of a silent
/// refresh. Use [`SessionTokenCredentialProvider`](super::SessionTokenCredentialProvider)
/// when refreshes are wanted.
#[derive(Debug, Clone)]
pub struct StaticCredentialProvider {
    credential: Credential,
}

impl StaticCredentialProvider {
    /// Create a new StaticCredentialProvider with a temporary key pair and its session token.
    pub fn new(access_key_id: &str, secret_access_key: &str, session_token: &str) -> Self {
        Self {
            credential: Credential {
                access_key_id: access_key_id.to_string(),
                secret_access_key: secret_access_key.to_string(),
                session_token: session_token.to_string(),
                expires_in: None,
            },
        }
    }

    /// Create a new StaticCredentialProvider from a complete credential.
    pub fn from_credential(credential: Credential) -> Self {
        Self { credential }
    }
}

#[async_trait]
impl ProvideCredential for StaticCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, _: &Context) -> Result<Option<Self::Credential>> {
        Ok(Some(self.credential.clone()))
    }
}
