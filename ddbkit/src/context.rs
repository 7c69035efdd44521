use ddbkit_core::{Context, OsEnv};
use ddbkit_http_send_reqwest::ReqwestHttpSend;
use ddbkit_sleep_tokio::TokioSleep;

/// Create a context ready for real use:
///
/// - HTTP through a fresh `reqwest::Client`
/// - retry delays on the tokio timer
/// - environment of the current process
pub fn default_context() -> Context {
    Context::new()
        .with_http_send(ReqwestHttpSend::default())
        .with_sleep(TokioSleep)
        .with_env(OsEnv)
}

/// Same as [`default_context`], sharing the connection pool of `client`.
pub fn default_context_with_client(client: reqwest::Client) -> Context {
    default_context().with_http_send(ReqwestHttpSend::new(client))
}
