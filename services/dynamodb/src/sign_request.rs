use crate::constants::{
    CONTENT_TYPE_JSON, TARGET_PREFIX, X_AMZ_DATE, X_AMZ_SECURITY_TOKEN, X_AMZ_TARGET,
    X_AMZN_AUTHORIZATION,
};
use crate::Credential;
use ddbkit_core::hash::{base64_hmac_sha256, sha256};
use ddbkit_core::time::{format_http_date, DateTime};
use ddbkit_core::{Error, Result};
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, DATE, HOST};
use http::{HeaderMap, HeaderName, HeaderValue};
use log::debug;
use std::fmt::Write;

/// Headers covered by the signature, in the order the service expects them
/// to be listed.
const SIGNED_HEADERS: &str = "host;x-amz-date;x-amz-target;x-amz-security-token";

/// RequestSigner that implements the AWS3 `HmacSHA256` scheme used by the
/// JSON protocol.
///
/// Signing is pure: the caller passes the timestamp, so the same inputs
/// always produce the same headers.
#[derive(Debug, Clone)]
pub struct RequestSigner {
    host: String,
}

impl RequestSigner {
    /// Create a new signer for the given service host.
    pub fn new(host: &str) -> Self {
        Self {
            host: host.to_string(),
        }
    }

    /// Host that gets signed.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Build every header of a signed request for `operation` carrying `body`.
    pub fn sign(
        &self,
        cred: &Credential,
        operation: &str,
        body: &[u8],
        now: DateTime,
    ) -> Result<HeaderMap> {
        let date = format_http_date(now);
        let target = format!("{TARGET_PREFIX}.{operation}");

        let creq = self.canonical_request_string(cred, &target, &date, body)?;
        debug!("calculated canonical request: {creq}");

        let signature = base64_hmac_sha256(
            cred.secret_access_key.as_bytes(),
            &sha256(creq.as_bytes()),
        );

        let mut headers = HeaderMap::with_capacity(8);
        headers.insert(HOST, header_value(&self.host)?);
        headers.insert(DATE, header_value(&date)?);
        headers.insert(HeaderName::from_static(X_AMZ_DATE), header_value(&date)?);
        headers.insert(HeaderName::from_static(X_AMZ_TARGET), header_value(&target)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSON));
        headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));

        let mut token = header_value(&cred.session_token)?;
        token.set_sensitive(true);
        headers.insert(HeaderName::from_static(X_AMZ_SECURITY_TOKEN), token);

        let mut authorization = header_value(&format!(
            "AWS3 AWSAccessKeyId={},Algorithm=HmacSHA256,SignedHeaders={SIGNED_HEADERS},Signature={signature}",
            cred.access_key_id
        ))?;
        authorization.set_sensitive(true);
        headers.insert(HeaderName::from_static(X_AMZN_AUTHORIZATION), authorization);

        Ok(headers)
    }

    /// Canonical request:
    ///
    /// ```text
    /// POST
    /// /
    ///
    /// host:<host>
    /// x-amz-date:<date>
    /// x-amz-security-token:<token>
    /// x-amz-target:<target>
    ///
    /// <body>
    /// ```
    fn canonical_request_string(
        &self,
        cred: &Credential,
        target: &str,
        date: &str,
        body: &[u8],
    ) -> Result<String> {
        let body = std::str::from_utf8(body)
            .map_err(|e| Error::validation("request body must be utf-8").with_source(e))?;

        let mut f = String::with_capacity(256 + body.len());
        writeln!(f, "POST")?;
        writeln!(f, "/")?;
        writeln!(f)?;
        writeln!(f, "host:{}", self.host)?;
        writeln!(f, "{X_AMZ_DATE}:{date}")?;
        writeln!(f, "{X_AMZ_SECURITY_TOKEN}:{}", cred.session_token)?;
        writeln!(f, "{X_AMZ_TARGET}:{target}")?;
        writeln!(f)?;
        write!(f, "{body}")?;
        Ok(f)
    }
}

fn header_value(v: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(v).map_err(|e| {
        Error::validation("header value contains invalid characters").with_source(e)
    })
}
