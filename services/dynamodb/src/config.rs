use crate::constants::*;
use ddbkit_core::time::{parse_rfc3339, DateTime};
use ddbkit_core::utils::Redact;
use ddbkit_core::{Context, Error, Result};
use log::warn;
use std::fmt::{Debug, Formatter};

/// Config for the DynamoDB client.
///
/// Explicitly set fields always win, [`Config::from_env`] only fills the gaps.
#[derive(Clone, Default)]
pub struct Config {
    /// Long-lived access key id used to request session tokens.
    pub access_key_id: Option<String>,
    /// Long-lived secret access key used to request session tokens.
    pub secret_access_key: Option<String>,
    /// Pre-obtained session token; skips the first token request when set
    /// together with `session_expiration`.
    pub session_token: Option<String>,
    /// Expiration of the pre-obtained session.
    pub session_expiration: Option<DateTime>,
    /// Temporary access key id of the pre-obtained session.
    ///
    /// Falls back to `access_key_id` when unset.
    pub session_access_key_id: Option<String>,
    /// Temporary secret key of the pre-obtained session.
    ///
    /// Falls back to `secret_access_key` when unset.
    pub session_secret_access_key: Option<String>,
    /// Service host, optionally with a scheme: `localhost:8000`,
    /// `http://localhost:8000`.
    pub endpoint: Option<String>,
    /// Host of the token issuing endpoint.
    pub sts_endpoint: Option<String>,
    /// Maximum number of retries for server faults and throttled calls.
    ///
    /// Throttled calls are never retried more than ten times.
    pub max_retries: Option<u32>,
}

impl Debug for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("access_key_id", &Redact::from(&self.access_key_id))
            .field("secret_access_key", &Redact::from(&self.secret_access_key))
            .field("session_token", &Redact::from(&self.session_token))
            .field("session_expiration", &self.session_expiration)
            .field(
                "session_access_key_id",
                &Redact::from(&self.session_access_key_id),
            )
            .field(
                "session_secret_access_key",
                &Redact::from(&self.session_secret_access_key),
            )
            .field("endpoint", &self.endpoint)
            .field("sts_endpoint", &self.sts_endpoint)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl Config {
    /// Load config from env.
    pub fn from_env(mut self, ctx: &Context) -> Self {
        let envs = ctx.env_vars();

        if self.access_key_id.is_none() {
            self.access_key_id = envs.get(AWS_ACCESS_KEY_ID).cloned();
        }
        if self.secret_access_key.is_none() {
            self.secret_access_key = envs.get(AWS_SECRET_ACCESS_KEY).cloned();
        }
        if self.session_token.is_none() {
            self.session_token = envs.get(AWS_SESSION_TOKEN).cloned();
        }
        if self.session_expiration.is_none() {
            if let Some(v) = envs.get(AWS_SESSION_EXPIRATION) {
                match parse_rfc3339(v) {
                    Ok(t) => self.session_expiration = Some(t),
                    Err(e) => warn!("ignoring {AWS_SESSION_EXPIRATION}={v}: {e}"),
                }
            }
        }
        if self.endpoint.is_none() {
            self.endpoint = envs.get(DYNAMODB_ENDPOINT).cloned();
        }
        if self.sts_endpoint.is_none() {
            self.sts_endpoint = envs.get(AWS_STS_ENDPOINT).cloned();
        }
        if self.max_retries.is_none() {
            if let Some(v) = envs.get(DYNAMODB_MAX_RETRIES) {
                match v.parse() {
                    Ok(n) => self.max_retries = Some(n),
                    Err(e) => warn!("ignoring {DYNAMODB_MAX_RETRIES}={v}: {e}"),
                }
            }
        }

        self
    }

    /// Split the configured endpoint into scheme and host.
    ///
    /// The host is what gets signed, so it must match what the service sees.
    pub fn service_endpoint(&self) -> Result<(String, String)> {
        let endpoint = self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT);
        let (scheme, host) = match endpoint.split_once("://") {
            Some((scheme, host)) => (scheme, host),
            None => ("https", endpoint),
        };
        let host = host.trim_end_matches('/');

        if host.is_empty() || host.contains('/') {
            return Err(Error::config_invalid(format!(
                "endpoint must be a bare host, got: {endpoint}"
            )));
        }
        if scheme != "http" && scheme != "https" {
            return Err(Error::config_invalid(format!(
                "endpoint scheme must be http or https, got: {scheme}"
            )));
        }

        Ok((scheme.to_string(), host.to_string()))
    }

    /// Host of the token issuing endpoint.
    pub fn sts_host(&self) -> &str {
        self.sts_endpoint.as_deref().unwrap_or(DEFAULT_STS_ENDPOINT)
    }

    /// Maximum number of retries for server faults.
    pub fn max_retries(&self) -> u32 {
        self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES)
    }
}
