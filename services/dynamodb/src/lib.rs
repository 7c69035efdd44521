//! DynamoDB client for the `DynamoDB_20111205` JSON API.
//!
//! Every request is signed with the AWS3 `HmacSHA256` scheme using a
//! temporary session obtained from STS `GetSessionToken`. Sessions are
//! cached and shared: concurrent calls that need a new session trigger a
//! single token request.
//!
//! ## Quick Start
//!
//! ```no_run
//! use ddbkit_core::{Context, OsEnv};
//! use ddbkit_dynamodb::{Client, Config, GetItemOptions};
//! use ddbkit_http_send_reqwest::ReqwestHttpSend;
//! use ddbkit_sleep_tokio::TokioSleep;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> ddbkit_core::Result<()> {
//!     let ctx = Context::new()
//!         .with_http_send(ReqwestHttpSend::default())
//!         .with_env(OsEnv)
//!         .with_sleep(TokioSleep);
//!
//!     // Reads AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY and friends.
//!     let config = Config::default().from_env(&ctx);
//!     let client = Client::new(ctx, config)?;
//!
//!     let out = client
//!         .get_item("users", &json!("alice"), None, GetItemOptions::default())
//!         .await?;
//!     println!("{:?}, {} units used", out.item, client.consumed_capacity());
//!     Ok(())
//! }
//! ```
//!
//! ## Values
//!
//! Items are plain JSON objects. Numbers, non-empty strings and non-empty
//! arrays of them are supported, `null` fields are skipped. See
//! [`marshal`] for the exact mapping.
//!
//! ## Retries
//!
//! Server faults (500, 503) and throttled calls are retried with backoff,
//! see [`RetryPolicy`]. Every other failure is returned right away.
//!
//! Backoff waits on the [`Sleep`](ddbkit_core::Sleep) of the context. A
//! context built without one fails with `ConfigInvalid` as soon as a
//! retry needs to wait, the triggering error is kept as its source.

mod constants;

mod config;
pub use config::Config;

mod credential;
pub use credential::Credential;

mod sign_request;
pub use sign_request::RequestSigner;

mod provide_credential;
pub use provide_credential::*;

mod retry;
pub use retry::RetryPolicy;

mod dispatch;
pub use dispatch::Dispatcher;
pub use dispatch::ServiceError;

pub mod marshal;
pub use marshal::AttributeValue;
pub use marshal::Item;

mod client;
pub use client::Client;

mod operation;
pub use operation::*;
