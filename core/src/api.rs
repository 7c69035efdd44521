use crate::{Context, Result};
use std::fmt::Debug;

/// SigningCredential is the trait used by the credential manager to decide
/// whether a cached credential can still be handed out.
pub trait SigningCredential: Clone + Debug + Send + Sync + Unpin + 'static {
    /// Check if the credential is valid, including its safety margin before
    /// expiry.
    fn is_valid(&self) -> bool;
}

impl<T: SigningCredential> SigningCredential for Option<T> {
    fn is_valid(&self) -> bool {
        let Some(ctx) = self else {
            return false;
        };

        ctx.is_valid()
    }
}

/// ProvideCredential is the trait used by the credential manager to fetch a
/// fresh credential, for example from a token issuing endpoint.
#[async_trait::async_trait]
pub trait ProvideCredential: Debug + Send + Sync + Unpin + 'static {
    /// Credential returned by this provider.
    ///
    /// Typically, it will be a temporary session credential.
    type Credential: Send + Sync + Unpin + 'static;

    /// Load a credential.
    ///
    /// Returns `Ok(None)` if this provider has nothing to offer.
    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>>;
}
