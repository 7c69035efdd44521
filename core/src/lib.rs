//! Core components of the ddbkit client.
//!
//! This crate provides the foundational types and traits shared by the
//! ddbkit crates.
//!
//! ## Overview
//!
//! The crate is built around several key concepts:
//!
//! - **Context**: A container that holds implementations for HTTP sending, environment access and sleeping
//! - **Traits**: Abstract interfaces for credential loading (`ProvideCredential`) and credential validity (`SigningCredential`)
//! - **CredentialManager**: Caches one credential and coalesces concurrent refreshes into a single call
//!
//! ## Example
//!
//! ```no_run
//! use ddbkit_core::{Context, CredentialManager, ProvideCredential, Result, SigningCredential};
//! use async_trait::async_trait;
//!
//! // Define your credential type
//! #[derive(Clone, Debug)]
//! struct MyCredential {
//!     token: String,
//! }
//!
//! impl SigningCredential for MyCredential {
//!     fn is_valid(&self) -> bool {
//!         !self.token.is_empty()
//!     }
//! }
//!
//! // Implement credential loader
//! #[derive(Debug)]
//! struct MyLoader;
//!
//! #[async_trait]
//! impl ProvideCredential for MyLoader {
//!     type Credential = MyCredential;
//!
//!     async fn provide_credential(&self, _: &Context) -> Result<Option<Self::Credential>> {
//!         Ok(Some(MyCredential {
//!             token: "my-token".to_string(),
//!         }))
//!     }
//! }
//!
//! # async fn example() -> Result<()> {
//! let manager = CredentialManager::new(Context::new(), MyLoader);
//!
//! // Concurrent callers share one refresh.
//! let cred = manager.ensure_credential().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Traits
//!
//! - [`HttpSend`]: For sending HTTP requests
//! - [`Env`]: For environment variable access
//! - [`Sleep`]: For waiting between retries
//! - [`ProvideCredential`]: For loading credentials
//! - [`SigningCredential`]: For validating credentials
//!
//! ## Utilities
//!
//! - [`hash`]: Cryptographic hashing utilities
//! - [`time`]: Time manipulation utilities
//! - [`utils`]: General utilities including data redaction

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod hash;
pub mod time;
pub mod utils;

mod context;
pub use context::Context;
pub use context::Env;
pub use context::HttpSend;
pub use context::NoopEnv;
pub use context::NoopHttpSend;
pub use context::NoopSleep;
pub use context::OsEnv;
pub use context::Sleep;
pub use context::StaticEnv;

mod error;
pub use error::{Error, ErrorKind, Result};

mod api;
pub use api::{ProvideCredential, SigningCredential};
mod manager;
pub use manager::CredentialManager;
