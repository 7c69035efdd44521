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

use ddbkit_core::time::{now, DateTime};
use ddbkit_core::utils::Redact;
use ddbkit_core::SigningCredential;
use std::fmt::{Debug, Formatter};

/// Credentials are dropped this many seconds before they expire.
pub const EXPIRY_MARGIN_SECONDS: i64 = 60;

/// Temporary session credential used to sign service requests.
#[derive(Default, Clone, PartialEq, Eq)]
pub struct Credential {
    /// Temporary access key id.
    pub access_key_id: String,
    /// Temporary secret access key.
    pub secret_access_key: String,
    /// Session token sent along with every request.
    pub session_token: String,
    /// Expiration time for this credential.
    pub expires_in: Option<DateTime>,
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_key_id", &Redact::from(&self.access_key_id))
            .field("secret_access_key", &Redact::from(&self.secret_access_key))
            .field("session_token", &Redact::from(&self.session_token))
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

impl SigningCredential for Credential {
    fn is_valid(&self) -> bool {
        if self.access_key_id.is_empty()
            || self.secret_access_key.is_empty()
            || self.session_token.is_empty()
        {
            return false;
        }

        match self.expires_in {
            Some(expires_in) => {
                expires_in > now() + chrono::TimeDelta::seconds(EXPIRY_MARGIN_SECONDS)
            }
            None => true,
        }
    }
}
