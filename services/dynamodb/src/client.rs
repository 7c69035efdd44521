use crate::dispatch::Dispatcher;
use crate::provide_credential::{SessionTokenCredentialProvider, StaticCredentialProvider};
use crate::retry::RetryPolicy;
use crate::sign_request::RequestSigner;
use crate::{Config, Credential};
use ddbkit_core::{Context, CredentialManager, Error, Result};
use log::debug;
use serde_json::Value;

/// Client for the DynamoDB JSON API.
///
/// Cloning is cheap: clones share the cached credential and the consumed
/// capacity counter.
#[derive(Debug, Clone)]
pub struct Client {
    dispatcher: Dispatcher,
}

impl Client {
    /// Create a new client.
    ///
    /// With a long-lived key pair, sessions are requested from STS when
    /// needed. A pre-obtained `session_token` with `session_expiration` is
    /// used until it expires. With only a session, that session is used for
    /// the life of the client.
    pub fn new(ctx: Context, config: Config) -> Result<Self> {
        let (scheme, host) = config.service_endpoint()?;
        let credentials = credential_manager(&ctx, &config)?;
        debug!("creating client for {scheme}://{host} with {config:?}");

        let dispatcher = Dispatcher::new(
            ctx,
            credentials,
            RequestSigner::new(&host),
            &scheme,
            RetryPolicy::new(config.max_retries()),
        );
        Ok(Self { dispatcher })
    }

    /// Execute a raw operation, for example `"ListTables"`.
    ///
    /// Marshalling is up to the caller.
    pub async fn execute(&self, operation: &str, body: &Value) -> Result<Value> {
        self.dispatcher.execute(operation, body).await
    }

    /// Capacity units consumed by this client so far.
    pub fn consumed_capacity(&self) -> f64 {
        self.dispatcher.consumed_capacity()
    }

    /// Return a valid session credential, requesting one if needed.
    pub async fn ensure_credential(&self) -> Result<Credential> {
        self.dispatcher.credentials().ensure_credential().await
    }
}

fn credential_manager(ctx: &Context, config: &Config) -> Result<CredentialManager<Credential>> {
    let session = config.session_token.as_ref().map(|token| Credential {
        access_key_id: config
            .session_access_key_id
            .clone()
            .or_else(|| config.access_key_id.clone())
            .unwrap_or_default(),
        secret_access_key: config
            .session_secret_access_key
            .clone()
            .or_else(|| config.secret_access_key.clone())
            .unwrap_or_default(),
        session_token: token.clone(),
        expires_in: config.session_expiration,
    });

    match (&config.access_key_id, &config.secret_access_key, session) {
        (Some(ak), Some(sk), session) => {
            let provider =
                SessionTokenCredentialProvider::new(ak, sk).with_endpoint(config.sts_host());
            let manager = CredentialManager::new(ctx.clone(), provider);

            Ok(match session {
                Some(cred) if cred.expires_in.is_some() => manager.with_credential(cred),
                _ => manager,
            })
        }
        (_, _, Some(cred))
            if !cred.access_key_id.is_empty() && !cred.secret_access_key.is_empty() =>
        {
            Ok(CredentialManager::new(
                ctx.clone(),
                StaticCredentialProvider::from_credential(cred),
            ))
        }
        _ => Err(Error::config_invalid(
            "access_key_id and secret_access_key are required",
        )),
    }
}
