use crate::constants::{AWS_QUERY_ENCODE_SET, SESSION_DURATION_SECONDS, STS_VERSION};
use crate::credential::Credential;
use async_trait::async_trait;
use bytes::Bytes;
use ddbkit_core::hash::base64_hmac_sha256;
use ddbkit_core::time::{format_iso8601, now, parse_rfc3339, DateTime};
use ddbkit_core::utils::Redact;
use ddbkit_core::{Context, Error, ProvideCredential, Result};
use log::debug;
use percent_encoding::utf8_percent_encode;
use quick_xml::de;
use serde::Deserialize;
use std::fmt::{Debug, Formatter};

/// SessionTokenCredentialProvider exchanges a long-lived key pair for a
/// temporary session via STS `GetSessionToken`.
///
/// The request is signed with signature version 2 in the query string.
#[derive(Clone)]
pub struct SessionTokenCredentialProvider {
    access_key_id: String,
    secret_access_key: String,
    endpoint: String,

    time: Option<DateTime>,
}

impl Debug for SessionTokenCredentialProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTokenCredentialProvider")
            .field("access_key_id", &Redact::from(&self.access_key_id))
            .field("secret_access_key", &Redact::from(&self.secret_access_key))
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl SessionTokenCredentialProvider {
    /// Create a new provider for the given long-lived key pair.
    pub fn new(access_key_id: &str, secret_access_key: &str) -> Self {
        Self {
            access_key_id: access_key_id.to_string(),
            secret_access_key: secret_access_key.to_string(),
            endpoint: crate::constants::DEFAULT_STS_ENDPOINT.to_string(),
            time: None,
        }
    }

    /// Set the STS host, for example `sts.us-west-2.amazonaws.com`.
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    /// Specify the signing time.
    ///
    /// # Note
    ///
    /// We should always take current time to sign requests.
    /// Only use this function for testing.
    #[cfg(test)]
    pub fn with_time(mut self, time: DateTime) -> Self {
        self.time = Some(time);
        self
    }

    /// Build the signed query string of a `GetSessionToken` request.
    fn signed_query(&self, now: DateTime) -> String {
        // Parameters must stay sorted by name, the signature covers them
        // as they appear here.
        let query = [
            ("AWSAccessKeyId", self.access_key_id.clone()),
            ("Action", "GetSessionToken".to_string()),
            ("DurationSeconds", SESSION_DURATION_SECONDS.to_string()),
            ("SignatureMethod", "HmacSHA256".to_string()),
            ("SignatureVersion", "2".to_string()),
            ("Timestamp", format_iso8601(now)),
            ("Version", STS_VERSION.to_string()),
        ]
        .iter()
        .map(|(k, v)| format!("{k}={}", utf8_percent_encode(v, &AWS_QUERY_ENCODE_SET)))
        .collect::<Vec<_>>()
        .join("&");

        let string_to_sign = format!("GET\n{}\n/\n{query}", self.endpoint);
        debug!("calculated session token string to sign: {string_to_sign}");

        let signature = base64_hmac_sha256(
            self.secret_access_key.as_bytes(),
            string_to_sign.as_bytes(),
        );
        format!(
            "{query}&Signature={}",
            utf8_percent_encode(&signature, &AWS_QUERY_ENCODE_SET)
        )
    }
}

#[async_trait]
impl ProvideCredential for SessionTokenCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let now = self.time.unwrap_or_else(now);
        let url = format!("https://{}/?{}", self.endpoint, self.signed_query(now));

        let req = http::Request::builder()
            .method(http::Method::GET)
            .uri(url)
            .body(Bytes::new())
            .map_err(|e| {
                Error::config_invalid("failed to build GetSessionToken request")
                    .with_source(e)
                    .with_context(format!("endpoint: https://{}", self.endpoint))
            })?;

        let resp = ctx.http_send_as_string(req).await.map_err(|e| {
            e.with_context("operation: GetSessionToken")
                .with_context(format!("endpoint: https://{}", self.endpoint))
        })?;
        debug!("GetSessionToken answered with status {}", resp.status());

        parse_session_token_response(resp.body()).map(Some)
    }
}

/// Classify a `GetSessionToken` response body.
///
/// The body is inspected regardless of the status code:
///
/// - a complete credential set is a success
/// - a complete `Type`/`Code`/`Message` triple is a denial
/// - anything else is unparseable
fn parse_session_token_response(body: &str) -> Result<Credential> {
    if let Ok(resp) = de::from_str::<GetSessionTokenResponse>(body) {
        let c = resp.result.credentials;
        let token = c.session_token.trim();
        if !token.is_empty()
            && !c.secret_access_key.is_empty()
            && !c.access_key_id.is_empty()
            && !c.expiration.is_empty()
        {
            let expires_in = parse_rfc3339(c.expiration.trim()).map_err(|e| {
                Error::credential_invalid("failed to parse session credential expiration")
                    .with_source(e)
                    .with_context(format!("expiration_value: {}", c.expiration))
            })?;

            return Ok(Credential {
                access_key_id: c.access_key_id,
                secret_access_key: c.secret_access_key,
                session_token: token.to_string(),
                expires_in: Some(expires_in),
            });
        }
    }

    if let Ok(resp) = de::from_str::<ErrorResponse>(body) {
        let e = resp.error;
        if !e.r#type.is_empty() && !e.code.is_empty() && !e.message.is_empty() {
            let mut err = Error::credential_denied(format!("AUTH [{}]: {}", e.code, e.message))
                .with_code(e.code)
                .with_context(format!("type: {}", e.r#type));
            if !resp.request_id.is_empty() {
                err = err.with_context(format!("request_id: {}", resp.request_id));
            }
            return Err(err);
        }
    }

    Err(Error::credential_invalid("AUTH: Unknown Error")
        .with_context(format!("response_length: {}", body.len())))
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct GetSessionTokenResponse {
    #[serde(rename = "GetSessionTokenResult")]
    result: GetSessionTokenResult,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct GetSessionTokenResult {
    credentials: SessionCredentials,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct SessionCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: String,
    expiration: String,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct ErrorResponse {
    error: ErrorDetail,
    request_id: String,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct ErrorDetail {
    r#type: String,
    code: String,
    message: String,
}
