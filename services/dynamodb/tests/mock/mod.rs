use async_trait::async_trait;
use bytes::Bytes;
use ddbkit_core::{Context, Error, HttpSend, Result, Sleep};
use ddbkit_dynamodb::{Client, Config};
use http::{Request, Response, StatusCode};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const STS_SUCCESS: &str = r#"<GetSessionTokenResponse xmlns="https://sts.amazonaws.com/doc/2011-06-15/">
  <GetSessionTokenResult>
    <Credentials>
      <SessionToken>mock-session-token</SessionToken>
      <SecretAccessKey>mock-temp-secret</SecretAccessKey>
      <Expiration>2099-01-01T00:00:00Z</Expiration>
      <AccessKeyId>ASIAMOCK</AccessKeyId>
    </Credentials>
  </GetSessionTokenResult>
  <ResponseMetadata>
    <RequestId>58c5dbae-abef-11e0-8cfe-09039844ac7d</RequestId>
  </ResponseMetadata>
</GetSessionTokenResponse>"#;

pub const STS_DENIED: &str = r#"<ErrorResponse xmlns="https://sts.amazonaws.com/doc/2011-06-15/">
  <Error>
    <Type>Sender</Type>
    <Code>InvalidClientTokenId</Code>
    <Message>The security token included in the request is invalid.</Message>
  </Error>
  <RequestId>4b1c0e2c-1b2d-11e2-9f5b-1d1c2b2a9d3f</RequestId>
</ErrorResponse>"#;

pub const STS_HOST: &str = "sts.mock.local";
pub const SERVICE_HOST: &str = "localhost:8000";

/// A request seen by [`MockHttpSend`].
#[derive(Debug, Clone)]
pub struct Recorded {
    pub uri: String,
    pub headers: http::HeaderMap,
    pub body: Bytes,
}

/// Answers token requests with a fixed body and service requests from a
/// script, recording everything it sees.
#[derive(Debug, Clone)]
pub struct MockHttpSend {
    sts_body: &'static str,
    sts_calls: Arc<Mutex<usize>>,
    script: Arc<Mutex<VecDeque<Result<Response<Bytes>>>>>,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl MockHttpSend {
    pub fn new() -> Self {
        Self::with_sts_body(STS_SUCCESS)
    }

    pub fn with_sts_body(body: &'static str) -> Self {
        Self {
            sts_body: body,
            sts_calls: Arc::default(),
            script: Arc::default(),
            requests: Arc::default(),
        }
    }

    /// Queue a JSON response.
    pub fn respond(&self, status: u16, body: &str) -> &Self {
        self.respond_with(status, &[], body)
    }

    /// Queue a response with extra headers.
    pub fn respond_with(&self, status: u16, headers: &[(&str, &str)], body: &str) -> &Self {
        let mut builder = Response::builder().status(status);
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        let resp = builder
            .body(Bytes::from(body.to_string()))
            .expect("response must be valid");
        self.script.lock().unwrap().push_back(Ok(resp));
        self
    }

    /// Queue a network failure.
    pub fn fail(&self, err: Error) -> &Self {
        self.script.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn sts_calls(&self) -> usize {
        *self.sts_calls.lock().unwrap()
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpSend for MockHttpSend {
    async fn http_send(&self, req: Request<Bytes>) -> Result<Response<Bytes>> {
        if req.uri().host() == Some(STS_HOST) {
            *self.sts_calls.lock().unwrap() += 1;
            // Give concurrent callers a chance to pile up behind the refresh.
            tokio::time::sleep(Duration::from_millis(20)).await;
            return Ok(Response::builder()
                .status(StatusCode::OK)
                .body(Bytes::from_static(self.sts_body.as_bytes()))
                .expect("response must be valid"));
        }

        let (parts, body) = req.into_parts();
        self.requests.lock().unwrap().push(Recorded {
            uri: parts.uri.to_string(),
            headers: parts.headers,
            body,
        });

        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::unexpected("mock script exhausted")))
    }
}

/// Records requested delays instead of waiting.
#[derive(Debug, Clone, Default)]
pub struct RecordingSleep {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleep {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleep for RecordingSleep {
    async fn sleep(&self, dur: Duration) -> Result<()> {
        self.delays.lock().unwrap().push(dur);
        Ok(())
    }
}

/// Config pointing at the mocks.
pub fn mock_config() -> Config {
    Config {
        access_key_id: Some("AKIDEXAMPLE".to_string()),
        secret_access_key: Some("wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".to_string()),
        endpoint: Some(format!("http://{SERVICE_HOST}")),
        sts_endpoint: Some(STS_HOST.to_string()),
        ..Default::default()
    }
}

/// Build a client talking to the mocks.
pub fn mock_client(http: &MockHttpSend, sleep: &RecordingSleep) -> Client {
    mock_client_with_config(http, sleep, mock_config())
}

/// Build a client talking to the mocks with a custom config.
pub fn mock_client_with_config(
    http: &MockHttpSend,
    sleep: &RecordingSleep,
    config: Config,
) -> Client {
    let _ = env_logger::builder().is_test(true).try_init();

    let ctx = Context::new()
        .with_http_send(http.clone())
        .with_sleep(sleep.clone());
    Client::new(ctx, config).expect("client must build")
}
