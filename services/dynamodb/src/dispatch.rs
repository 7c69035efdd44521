use crate::constants::X_AMZN_REQUEST_ID;
use crate::retry::RetryPolicy;
use crate::sign_request::RequestSigner;
use crate::Credential;
use bytes::Bytes;
use ddbkit_core::time::now;
use ddbkit_core::{Context, CredentialManager, Error, Result};
use http::StatusCode;
use log::{debug, warn};
use rand::Rng;
use serde_json::Value;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Error codes the service uses to report exhausted throughput.
const THROTTLING_CODES: [&str; 2] = ["ProvisionedThroughputExceededException", "ThrottlingException"];

/// Details of a failed response, attached as the source of the returned
/// [`Error`] and reachable through [`Error::downcast_source`].
#[derive(thiserror::Error, Debug, Clone)]
#[error("{status} {error_type}: {message}")]
pub struct ServiceError {
    /// HTTP status of the response.
    pub status: StatusCode,
    /// Full `__type` of the failure, `<namespace>#<Code>`.
    pub error_type: String,
    /// `__type` without its namespace.
    pub code: String,
    /// Human readable message returned by the service.
    pub message: String,
    /// Request id assigned by the service, if any.
    pub request_id: Option<String>,
    /// The whole decoded response body.
    pub payload: Value,
}

/// Dispatcher turns an operation and its body into a signed HTTP call and
/// drives retries until exactly one outcome is known.
#[derive(Clone)]
pub struct Dispatcher {
    ctx: Context,
    credentials: CredentialManager<Credential>,
    signer: RequestSigner,
    scheme: String,
    policy: RetryPolicy,

    consumed_capacity: Arc<Mutex<f64>>,
}

impl Debug for Dispatcher {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("credentials", &self.credentials)
            .field("signer", &self.signer)
            .field("scheme", &self.scheme)
            .field("policy", &self.policy)
            .finish()
    }
}

/// Progress of a single logical call.
enum State {
    Idle,
    Calling { attempt: u32 },
    RetryScheduled {
        attempt: u32,
        delay: Duration,
        cause: Error,
    },
    Done(Result<Value>),
}

impl Dispatcher {
    /// Create a new dispatcher sending to `scheme://<signer host>/`.
    pub fn new(
        ctx: Context,
        credentials: CredentialManager<Credential>,
        signer: RequestSigner,
        scheme: &str,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            ctx,
            credentials,
            signer,
            scheme: scheme.to_string(),
            policy,
            consumed_capacity: Arc::new(Mutex::new(0.0)),
        }
    }

    /// Capacity units consumed by every successful call so far.
    pub fn consumed_capacity(&self) -> f64 {
        *self.consumed_capacity.lock().expect("lock poisoned")
    }

    /// Get the credential manager used to sign calls.
    pub fn credentials(&self) -> &CredentialManager<Credential> {
        &self.credentials
    }

    /// Execute `operation` with `body` and return the decoded response.
    pub async fn execute(&self, operation: &str, body: &Value) -> Result<Value> {
        let body = Bytes::from(serde_json::to_vec(body)?);

        let mut state = State::Idle;
        loop {
            state = match state {
                State::Idle => State::Calling { attempt: 0 },
                State::Calling { attempt } => match self.call(operation, body.clone()).await {
                    Ok(v) => State::Done(Ok(v)),
                    Err(err) => {
                        let jitter: f64 = rand::thread_rng().gen();
                        match self.policy.next_delay(attempt, &err, jitter) {
                            Some(delay) => {
                                warn!(
                                    "{operation} failed on attempt {}, retrying in {delay:?}: {err}",
                                    attempt + 1
                                );
                                State::RetryScheduled {
                                    attempt,
                                    delay,
                                    cause: err,
                                }
                            }
                            None => State::Done(Err(err)),
                        }
                    }
                },
                State::RetryScheduled {
                    attempt,
                    delay,
                    cause,
                } => {
                    let waited = if delay.is_zero() {
                        Ok(())
                    } else {
                        self.ctx.sleep(delay).await
                    };
                    match waited {
                        Ok(()) => State::Calling {
                            attempt: attempt + 1,
                        },
                        // A retry must never skip its backoff.
                        Err(err) => {
                            warn!("{operation} can't back off before retrying: {err}");
                            State::Done(Err(err
                                .with_context(format!("operation: {operation}"))
                                .with_context(format!("retry delay: {delay:?}"))
                                .with_source(cause)))
                        }
                    }
                }
                State::Done(res) => return res,
            }
        }
    }

    /// Make one signed attempt.
    async fn call(&self, operation: &str, body: Bytes) -> Result<Value> {
        let cred = self.credentials.ensure_credential().await?;
        let headers = self.signer.sign(&cred, operation, &body, now())?;

        let mut req = http::Request::builder()
            .method(http::Method::POST)
            .uri(format!("{}://{}/", self.scheme, self.signer.host()))
            .body(body)?;
        *req.headers_mut() = headers;

        let resp = self
            .ctx
            .http_send(req)
            .await
            .map_err(|e| e.with_context(format!("operation: {operation}")))?;
        let (parts, body) = resp.into_parts();
        debug!("{operation} answered with status {}", parts.status);

        let request_id = parts
            .headers
            .get(X_AMZN_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let payload: Value = serde_json::from_slice(&body).map_err(|e| {
            Error::transport("response body is not valid JSON")
                .with_source(e)
                .with_context(format!("operation: {operation}"))
                .with_context(format!("status: {}", parts.status))
        })?;

        if parts.status.as_u16() < 300 {
            self.record_capacity(&payload);
            return Ok(payload);
        }

        Err(classify(parts.status, payload, request_id)
            .with_context(format!("operation: {operation}")))
    }

    fn record_capacity(&self, payload: &Value) {
        let Some(units) = payload.get("ConsumedCapacityUnits").and_then(Value::as_f64) else {
            return;
        };
        let mut total = self.consumed_capacity.lock().expect("lock poisoned");
        *total += units;
        debug!("consumed {units} capacity units, {total} in total");
    }
}

/// Turn a failed response into an error of the right kind.
fn classify(status: StatusCode, payload: Value, request_id: Option<String>) -> Error {
    let error_type = payload
        .get("__type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let code = match error_type.rsplit_once('#') {
        Some((_, code)) => code.to_string(),
        None => error_type.clone(),
    };
    let message = payload
        .get("message")
        .or_else(|| payload.get("Message"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let summary = match (code.is_empty(), message.is_empty()) {
        (true, true) => format!("service responded with {status}"),
        (true, false) => message.clone(),
        (false, true) => code.clone(),
        (false, false) => format!("{code}: {message}"),
    };

    let mut err = if status == StatusCode::INTERNAL_SERVER_ERROR
        || status == StatusCode::SERVICE_UNAVAILABLE
    {
        Error::transient_service(summary)
    } else if status == StatusCode::BAD_REQUEST && THROTTLING_CODES.contains(&code.as_str()) {
        Error::throttling(summary)
    } else {
        Error::service(summary)
    };

    if !code.is_empty() {
        err = err.with_code(code.clone());
    }
    err = err.with_context(format!("status: {status}"));
    if let Some(id) = &request_id {
        err = err.with_context(format!("request_id: {id}"));
    }

    err.with_source(ServiceError {
        status,
        error_type,
        code,
        message,
        request_id,
        payload,
    })
}
