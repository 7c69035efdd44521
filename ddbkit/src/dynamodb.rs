// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! DynamoDB client with convenience constructors.

pub use ddbkit_dynamodb::*;

#[cfg(feature = "default-context")]
use crate::{default_context, Result};

/// Create a client from the process environment.
///
/// This function uses:
/// - [`default_context`](crate::default_context) for HTTP, timer and env
/// - [`Config::from_env`] for keys, endpoints and retries
///
/// # Example
///
/// ```no_run
/// # #[tokio::main]
/// # async fn main() -> ddbkit::Result<()> {
/// let client = ddbkit::dynamodb::default_client()?;
/// let tables = client.list_tables(Default::default()).await?;
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "default-context")]
pub fn default_client() -> Result<Client> {
    let ctx = default_context();
    let config = Config::default().from_env(&ctx);
    Client::new(ctx, config)
}

/// Create a client from an explicit config.
///
/// Fields left empty in `config` are still filled from the environment.
#[cfg(feature = "default-context")]
pub fn default_client_with_config(config: Config) -> Result<Client> {
    let ctx = default_context();
    let config = config.from_env(&ctx);
    Client::new(ctx, config)
}
