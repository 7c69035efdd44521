use crate::{Context, Error, ProvideCredential, Result, SigningCredential};
use log::{debug, warn};
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

/// CredentialManager owns one cached credential and refreshes it on demand.
///
/// Concurrent callers that find the cache empty or stale share a single
/// refresh: the first caller drives it, everyone arriving while it is in
/// flight waits for the same outcome, success or error.
#[derive(Clone)]
pub struct CredentialManager<K: SigningCredential> {
    ctx: Context,
    provider: Arc<dyn ProvideCredential<Credential = K>>,
    state: Arc<Mutex<State<K>>>,
}

struct State<K> {
    credential: Option<K>,
    /// `Some` while a refresh is in flight.
    waiters: Option<Vec<oneshot::Sender<Result<K>>>>,
}

impl<K: SigningCredential> Debug for CredentialManager<K> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock().expect("lock poisoned");
        f.debug_struct("CredentialManager")
            .field("ctx", &self.ctx)
            .field("provider", &self.provider)
            .field("credential", &state.credential)
            .field("refreshing", &state.waiters.is_some())
            .finish()
    }
}

impl<K: SigningCredential> CredentialManager<K> {
    /// Create a new manager with an empty cache.
    pub fn new(ctx: Context, provider: impl ProvideCredential<Credential = K>) -> Self {
        Self {
            ctx,
            provider: Arc::new(provider),
            state: Arc::new(Mutex::new(State {
                credential: None,
                waiters: None,
            })),
        }
    }

    /// Seed the cache with a credential obtained elsewhere.
    ///
    /// A valid seed is returned without contacting the provider.
    pub fn with_credential(self, credential: K) -> Self {
        self.state.lock().expect("lock poisoned").credential = Some(credential);
        self
    }

    /// Get the context used for refreshes.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Return a valid credential, refreshing it first if needed.
    pub async fn ensure_credential(&self) -> Result<K> {
        let waiter = {
            let mut state = self.state.lock().expect("lock poisoned");
            if let Some(cred) = state.credential.as_ref().filter(|v| v.is_valid()) {
                return Ok(cred.clone());
            }
            state.credential = None;

            match state.waiters.as_mut() {
                Some(waiters) => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push(tx);
                    Some(rx)
                }
                None => {
                    state.waiters = Some(Vec::new());
                    None
                }
            }
        };

        if let Some(rx) = waiter {
            debug!("credential refresh in flight, waiting for it");
            return rx.await.unwrap_or_else(|_| {
                Err(Error::credential_invalid(
                    "credential refresh was abandoned before it completed",
                ))
            });
        }

        let inflight = Inflight {
            state: &self.state,
            finished: false,
        };

        debug!("refreshing credential");
        let result = match self.provider.provide_credential(&self.ctx).await {
            Ok(Some(cred)) => Ok(cred),
            Ok(None) => Err(Error::credential_invalid(
                "credential provider returned no credential",
            )),
            Err(err) => Err(err),
        };
        if let Err(err) = &result {
            warn!("credential refresh failed: {err}");
        }

        inflight.finish(result)
    }
}

/// Clears the in-flight marker of a refresh, even when the refreshing
/// future is dropped half way.
struct Inflight<'a, K> {
    state: &'a Mutex<State<K>>,
    finished: bool,
}

impl<K: Clone> Inflight<'_, K> {
    fn finish(mut self, result: Result<K>) -> Result<K> {
        let waiters = {
            let mut state = self.state.lock().expect("lock poisoned");
            if let Ok(cred) = &result {
                state.credential = Some(cred.clone());
            }
            state.waiters.take().unwrap_or_default()
        };
        self.finished = true;

        for tx in waiters {
            // The waiter may have given up already, nothing to do then.
            let _ = tx.send(result.clone());
        }
        result
    }
}

impl<K> Drop for Inflight<'_, K> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        // Dropping the senders wakes every waiter with an error.
        if let Ok(mut state) = self.state.lock() {
            state.waiters = None;
        }
    }
}
