use crate::mock::{
    mock_client, mock_client_with_config, mock_config, MockHttpSend, RecordingSleep,
    SERVICE_HOST,
};
use anyhow::Result;
use ddbkit_core::{Context, Error, ErrorKind};
use ddbkit_dynamodb::{Client, Config, ServiceError};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;

const UNAVAILABLE: &str = r#"{"__type":"com.amazon.coral.availability#ServiceUnavailableException"}"#;
const THROTTLED: &str = r#"{"__type":"com.amazonaws.dynamodb.v20111205#ProvisionedThroughputExceededException","message":"The level of configured provisioned throughput for the table was exceeded."}"#;

#[tokio::test]
async fn test_signed_request_shape() -> Result<()> {
    let http = MockHttpSend::new();
    let sleep = RecordingSleep::default();
    let client = mock_client(&http, &sleep);

    http.respond(200, r#"{"TableNames":[]}"#);
    client.execute("ListTables", &json!({"Limit": 5})).await?;

    let reqs = http.requests();
    assert_eq!(reqs.len(), 1);
    let req = &reqs[0];
    assert_eq!(req.uri, format!("http://{SERVICE_HOST}/"));
    assert_eq!(req.headers["host"], SERVICE_HOST);
    assert_eq!(req.headers["x-amz-target"], "DynamoDB_20111205.ListTables");
    assert_eq!(req.headers["x-amz-security-token"], "mock-session-token");
    assert_eq!(req.headers["content-type"], "application/x-amz-json-1.0");
    assert_eq!(
        req.headers["content-length"],
        req.body.len().to_string().as_str()
    );
    assert_eq!(req.headers["date"], req.headers["x-amz-date"]);

    let auth = req.headers["x-amzn-authorization"].to_str()?;
    assert!(auth.starts_with(
        "AWS3 AWSAccessKeyId=ASIAMOCK,Algorithm=HmacSHA256,\
         SignedHeaders=host;x-amz-date;x-amz-target;x-amz-security-token,Signature="
    ));

    assert_eq!(serde_json::from_slice::<serde_json::Value>(&req.body)?, json!({"Limit": 5}));
    Ok(())
}

#[tokio::test]
async fn test_server_fault_retry_schedule() -> Result<()> {
    let http = MockHttpSend::new();
    let sleep = RecordingSleep::default();
    let client = mock_client(&http, &sleep);

    for _ in 0..4 {
        http.respond(503, UNAVAILABLE);
    }

    let err = client
        .execute("ListTables", &json!({}))
        .await
        .expect_err("must give up");
    assert_eq!(err.kind(), ErrorKind::TransientService);
    assert_eq!(err.code(), Some("ServiceUnavailableException"));
    assert_eq!(http.requests().len(), 4);
    assert_eq!(
        sleep.delays(),
        [100, 400, 1600].map(Duration::from_millis).to_vec()
    );
    Ok(())
}

#[tokio::test]
async fn test_server_fault_recovers() -> Result<()> {
    let http = MockHttpSend::new();
    let sleep = RecordingSleep::default();
    let client = mock_client(&http, &sleep);

    http.respond(500, r#"{"__type":"com.amazon.coral.service#InternalFailure"}"#)
        .respond(200, r#"{"TableNames":["users"]}"#);

    let resp = client.execute("ListTables", &json!({})).await?;
    assert_eq!(resp, json!({"TableNames": ["users"]}));
    assert_eq!(sleep.delays(), vec![Duration::from_millis(100)]);
    Ok(())
}

#[tokio::test]
async fn test_throttle_retry_schedule() -> Result<()> {
    let http = MockHttpSend::new();
    let sleep = RecordingSleep::default();
    let client = mock_client_with_config(
        &http,
        &sleep,
        Config {
            max_retries: Some(10),
            ..mock_config()
        },
    );

    // One first try plus ten retries.
    for _ in 0..11 {
        http.respond(400, THROTTLED);
    }

    let err = client
        .execute("GetItem", &json!({"TableName": "users"}))
        .await
        .expect_err("must give up");
    assert_eq!(err.kind(), ErrorKind::Throttling);
    assert_eq!(http.requests().len(), 11);

    // The first retry goes out right away.
    let delays = sleep.delays();
    assert_eq!(delays.len(), 9);
    for (i, delay) in delays.iter().enumerate() {
        let low = Duration::from_millis(25 * 2u64.pow(i as u32));
        assert!(
            *delay >= low && *delay < low * 2,
            "delay {delay:?} of retry {} out of range",
            i + 2
        );
    }
    Ok(())
}

#[tokio::test]
async fn test_throttle_retries_follow_configured_budget() -> Result<()> {
    let http = MockHttpSend::new();
    let sleep = RecordingSleep::default();
    let client = mock_client(&http, &sleep);

    for _ in 0..4 {
        http.respond(400, THROTTLED);
    }

    let err = client
        .execute("GetItem", &json!({"TableName": "users"}))
        .await
        .expect_err("must give up");
    assert_eq!(err.kind(), ErrorKind::Throttling);
    // Three retries by default, the first one right away.
    assert_eq!(http.requests().len(), 4);
    let delays = sleep.delays();
    assert_eq!(delays.len(), 2);
    assert!(delays[0] >= Duration::from_millis(25) && delays[0] < Duration::from_millis(50));
    assert!(delays[1] >= Duration::from_millis(50) && delays[1] < Duration::from_millis(100));
    Ok(())
}

#[tokio::test]
async fn test_zero_retries_disables_throttle_retries() -> Result<()> {
    let http = MockHttpSend::new();
    let sleep = RecordingSleep::default();
    let client = mock_client_with_config(
        &http,
        &sleep,
        Config {
            max_retries: Some(0),
            ..mock_config()
        },
    );

    http.respond(400, THROTTLED).respond(503, UNAVAILABLE);

    let err = client
        .execute("GetItem", &json!({}))
        .await
        .expect_err("must not retry");
    assert_eq!(err.kind(), ErrorKind::Throttling);
    let err = client
        .execute("GetItem", &json!({}))
        .await
        .expect_err("must not retry");
    assert_eq!(err.kind(), ErrorKind::TransientService);

    assert_eq!(http.requests().len(), 2);
    assert!(sleep.delays().is_empty());
    Ok(())
}

/// Client whose context has no timer configured.
fn client_without_timer(http: &MockHttpSend) -> Client {
    let ctx = Context::new().with_http_send(http.clone());
    Client::new(ctx, mock_config()).expect("client must build")
}

#[tokio::test]
async fn test_server_fault_without_timer_is_not_retried_back_to_back() -> Result<()> {
    let http = MockHttpSend::new();
    let client = client_without_timer(&http);

    http.respond(503, UNAVAILABLE).respond(503, UNAVAILABLE);

    let err = client
        .execute("ListTables", &json!({}))
        .await
        .expect_err("must fail");
    assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    assert!(err.context().contains(&"retry delay: 100ms".to_string()));
    let cause = err
        .downcast_source::<Error>()
        .expect("triggering error must be attached");
    assert_eq!(cause.kind(), ErrorKind::TransientService);
    assert_eq!(cause.code(), Some("ServiceUnavailableException"));

    // No retry went out without its delay.
    assert_eq!(http.requests().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_throttle_without_timer_only_retries_immediately() -> Result<()> {
    let http = MockHttpSend::new();
    let client = client_without_timer(&http);

    http.respond(400, THROTTLED).respond(400, THROTTLED);

    let err = client
        .execute("GetItem", &json!({}))
        .await
        .expect_err("must fail");
    assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    assert_eq!(
        err.downcast_source::<Error>().map(Error::kind),
        Some(ErrorKind::Throttling)
    );
    assert_eq!(http.requests().len(), 2);

    // Calls that need no retry still work.
    http.respond(200, r#"{"TableNames":[]}"#);
    client.execute("ListTables", &json!({})).await?;
    Ok(())
}

#[tokio::test]
async fn test_throttle_recovers_without_waiting() -> Result<()> {
    let http = MockHttpSend::new();
    let sleep = RecordingSleep::default();
    let client = mock_client(&http, &sleep);

    http.respond(400, THROTTLED)
        .respond(200, r#"{"ConsumedCapacityUnits":1.0}"#);

    client.execute("PutItem", &json!({})).await?;
    assert_eq!(http.requests().len(), 2);
    assert!(sleep.delays().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_service_error_details() -> Result<()> {
    let http = MockHttpSend::new();
    let sleep = RecordingSleep::default();
    let client = mock_client(&http, &sleep);

    http.respond_with(
        400,
        &[("x-amzn-RequestId", "REQ-42")],
        r#"{"__type":"com.amazon.coral.validate#ValidationException","message":"One or more parameter values were invalid"}"#,
    );

    let err = client
        .execute("PutItem", &json!({}))
        .await
        .expect_err("must fail");
    assert_eq!(err.kind(), ErrorKind::Service);
    assert_eq!(err.code(), Some("ValidationException"));
    assert_eq!(
        err.to_string(),
        "ValidationException: One or more parameter values were invalid"
    );
    assert!(err.context().contains(&"operation: PutItem".to_string()));
    assert!(sleep.delays().is_empty());

    let detail = err
        .downcast_source::<ServiceError>()
        .expect("service error must be attached");
    assert_eq!(detail.status, http::StatusCode::BAD_REQUEST);
    assert_eq!(detail.request_id.as_deref(), Some("REQ-42"));
    assert_eq!(detail.message, "One or more parameter values were invalid");
    Ok(())
}

#[tokio::test]
async fn test_invalid_json_is_transport_error() -> Result<()> {
    let http = MockHttpSend::new();
    let sleep = RecordingSleep::default();
    let client = mock_client(&http, &sleep);

    http.respond(503, "<html>Service Unavailable</html>");

    let err = client
        .execute("ListTables", &json!({}))
        .await
        .expect_err("must fail");
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(http.requests().len(), 1);
    assert!(sleep.delays().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_network_failure_is_not_retried() -> Result<()> {
    let http = MockHttpSend::new();
    let sleep = RecordingSleep::default();
    let client = mock_client(&http, &sleep);

    http.fail(Error::transport("connection reset by peer"));

    let err = client
        .execute("ListTables", &json!({}))
        .await
        .expect_err("must fail");
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(err.context(), ["operation: ListTables"]);
    assert_eq!(http.requests().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_consumed_capacity() -> Result<()> {
    let http = MockHttpSend::new();
    let sleep = RecordingSleep::default();
    let client = mock_client(&http, &sleep);

    http.respond(200, r#"{"ConsumedCapacityUnits":0.5}"#)
        .respond(200, r#"{"ConsumedCapacityUnits":1}"#)
        .respond(200, r#"{"TableNames":[]}"#)
        .respond(400, r#"{"__type":"x#ConditionalCheckFailedException","ConsumedCapacityUnits":5}"#);

    assert_eq!(client.consumed_capacity(), 0.0);
    client.execute("GetItem", &json!({})).await?;
    client.execute("PutItem", &json!({})).await?;
    client.execute("ListTables", &json!({})).await?;
    let _ = client.execute("PutItem", &json!({})).await;

    assert_eq!(client.consumed_capacity(), 1.5);
    // Clones share the counter.
    assert_eq!(client.clone().consumed_capacity(), 1.5);
    Ok(())
}
