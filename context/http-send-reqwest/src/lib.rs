//! [`HttpSend`] implementation backed by [`reqwest`].
//!
//! Pass your own [`Client`] through [`ReqwestHttpSend::new`] to share a
//! connection pool with the rest of your application.

use async_trait::async_trait;
use bytes::Bytes;
use ddbkit_core::{Error, HttpSend, Result};
use http_body_util::BodyExt;
use reqwest::{Client, Request};

/// HttpSend that sends requests through a `reqwest::Client`.
#[derive(Debug, Default, Clone)]
pub struct ReqwestHttpSend {
    client: Client,
}

impl ReqwestHttpSend {
    /// Create a new ReqwestHttpSend with a reqwest::Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpSend for ReqwestHttpSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let req = Request::try_from(req)
            .map_err(|e| Error::unexpected("failed to convert http request").with_source(e))?;
        let url = req.url().to_string();

        let resp: http::Response<_> = self
            .client
            .execute(req)
            .await
            .map_err(|e| {
                Error::transport("failed to send http request")
                    .with_source(e)
                    .with_context(format!("url: {url}"))
            })?
            .into();

        let (parts, body) = resp.into_parts();
        let bs = BodyExt::collect(body)
            .await
            .map(|buf| buf.to_bytes())
            .map_err(|e| {
                Error::transport("failed to read http response body")
                    .with_source(e)
                    .with_context(format!("url: {url}"))
            })?;
        Ok(http::Response::from_parts(parts, bs))
    }
}
