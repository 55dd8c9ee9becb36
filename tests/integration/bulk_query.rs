//! Bulk query lifecycle against a mock Admin API

use super::test_utils::{orchestrator_for, requests_containing, Sequence, API_PATH};
use serde_json::{json, Value};
use shopify_bulk::stream::RetrievalPolicy;
use shopify_bulk::{BulkError, BulkStatus, OutputShape};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PRODUCTS_QUERY: &str = r#"{
  products {
    edges {
      node {
        id
        title
        metafields(namespace: "custom") {
          edges { node { id key value } }
        }
      }
    }
  }
}"#;

fn submitted() -> Value {
    json!({"data": {"bulkOperationRunQuery": {
        "bulkOperation": {"id": "gid://shopify/BulkOperation/7", "status": "CREATED"},
        "userErrors": [],
    }}})
}

fn status(status: &str, url: Option<String>) -> Value {
    json!({"data": {"currentBulkOperation": {
        "id": "gid://shopify/BulkOperation/7",
        "status": status,
        "errorCode": null,
        "createdAt": "2025-07-01T10:00:00Z",
        "completedAt": null,
        "objectCount": "3",
        "fileSize": "212",
        "url": url,
        "partialDataUrl": null,
    }}})
}

async fn mount_submit(server: &MockServer, response: Value) {
    Mock::given(method("POST"))
        .and(path(API_PATH))
        .and(body_string_contains("bulkOperationRunQuery"))
        .respond_with(ResponseTemplate::new(200).set_body_json(response))
        .expect(1)
        .mount(server)
        .await;
}

const RESULT_BODY: &str = concat!(
    "{\"id\":\"gid://shopify/Product/1\",\"title\":\"Hat\",\"__typename\":\"Product\"}\n",
    "{\"id\":\"gid://shopify/Metafield/10\",\"key\":\"size\",\"value\":\"M\",\"__typename\":\"Metafield\",\"__parentId\":\"gid://shopify/Product/1\"}\n",
    "{\"id\":\"gid://shopify/Product/2\",\"title\":\"Scarf\",\"__typename\":\"Product\"}\n",
);

#[tokio::test]
async fn test_query_submits_polls_and_streams_results() {
    let server = MockServer::start().await;
    let result_url = format!("{}/results/7.jsonl", server.uri());

    mount_submit(&server, submitted()).await;
    Mock::given(method("POST"))
        .and(path(API_PATH))
        .and(body_string_contains("currentBulkOperation"))
        .respond_with(Sequence::new(vec![
            status("RUNNING", None),
            status("RUNNING", None),
            status("COMPLETED", Some(result_url)),
        ]))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/results/7.jsonl"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RESULT_BODY))
        .expect(1)
        .mount(&server)
        .await;

    let bulk = orchestrator_for(&server, RetrievalPolicy::Propagate);
    let result = bulk.run_query(PRODUCTS_QUERY).await.unwrap();

    assert_eq!(result.operation.status, BulkStatus::Completed);
    assert_eq!(result.operation.object_count, Some(3));
    assert_eq!(result.records.len(), 3);
    assert_eq!(result.records[1]["__parentId"], "gid://shopify/Product/1");

    // The query text travels as a variable, quotes intact
    let requests = server.received_requests().await.unwrap_or_default();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["variables"]["query"], PRODUCTS_QUERY);
}

#[tokio::test]
async fn test_query_results_as_tree() {
    let server = MockServer::start().await;
    let result_url = format!("{}/results/7.jsonl", server.uri());

    mount_submit(&server, submitted()).await;
    Mock::given(method("POST"))
        .and(path(API_PATH))
        .and(body_string_contains("currentBulkOperation"))
        .respond_with(Sequence::new(vec![status("COMPLETED", Some(result_url))]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/results/7.jsonl"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RESULT_BODY))
        .mount(&server)
        .await;

    let bulk = orchestrator_for(&server, RetrievalPolicy::Propagate);
    let tree = bulk
        .run_query(PRODUCTS_QUERY)
        .await
        .unwrap()
        .shaped(OutputShape::Tree)
        .unwrap();

    assert_eq!(tree.len(), 2);
    assert_eq!(tree[0]["title"], "Hat");
    assert_eq!(tree[0]["metafields"][0]["key"], "size");
    assert!(tree[0]["metafields"][0].get("__parentId").is_none());
    assert!(tree[1].get("metafields").is_none());
}

#[tokio::test]
async fn test_user_errors_stop_before_polling() {
    let server = MockServer::start().await;
    mount_submit(
        &server,
        json!({"data": {"bulkOperationRunQuery": {
            "bulkOperation": null,
            "userErrors": [
                {"field": ["query"], "message": "Invalid bulk query"},
                {"field": null, "message": "A bulk query operation is already in progress"},
            ],
        }}}),
    )
    .await;
    Mock::given(method("POST"))
        .and(path(API_PATH))
        .and(body_string_contains("currentBulkOperation"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status("RUNNING", None)))
        .expect(0)
        .mount(&server)
        .await;

    let bulk = orchestrator_for(&server, RetrievalPolicy::Propagate);
    match bulk.run_query(PRODUCTS_QUERY).await {
        Err(BulkError::Submission(message)) => assert_eq!(
            message,
            "Invalid bulk query, A bulk query operation is already in progress"
        ),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_expired_result_file_soft_fails_to_empty() {
    let server = MockServer::start().await;
    let result_url = format!("{}/results/expired.jsonl", server.uri());

    mount_submit(&server, submitted()).await;
    Mock::given(method("POST"))
        .and(path(API_PATH))
        .and(body_string_contains("currentBulkOperation"))
        .respond_with(Sequence::new(vec![status("COMPLETED", Some(result_url))]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/results/expired.jsonl"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let bulk = orchestrator_for(&server, RetrievalPolicy::SoftFail);
    let result = bulk.run_query(PRODUCTS_QUERY).await.unwrap();
    assert!(result.records.is_empty());
    assert_eq!(requests_containing(&server, "currentBulkOperation").await, 1);
}

#[tokio::test]
async fn test_expired_result_file_propagates_when_strict() {
    let server = MockServer::start().await;
    let result_url = format!("{}/results/expired.jsonl", server.uri());

    mount_submit(&server, submitted()).await;
    Mock::given(method("POST"))
        .and(path(API_PATH))
        .and(body_string_contains("currentBulkOperation"))
        .respond_with(Sequence::new(vec![status("COMPLETED", Some(result_url))]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/results/expired.jsonl"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let bulk = orchestrator_for(&server, RetrievalPolicy::Propagate);
    let err = bulk.run_query(PRODUCTS_QUERY).await.unwrap_err();
    assert!(matches!(err, BulkError::Stream(ref e) if e.is_transport()));
}

#[tokio::test]
async fn test_failed_operation_without_file_returns_no_records() {
    let server = MockServer::start().await;

    mount_submit(&server, submitted()).await;
    Mock::given(method("POST"))
        .and(path(API_PATH))
        .and(body_string_contains("currentBulkOperation"))
        .respond_with(Sequence::new(vec![
            status("RUNNING", None),
            json!({"data": {"currentBulkOperation": {
                "id": "gid://shopify/BulkOperation/7",
                "status": "FAILED",
                "errorCode": "INTERNAL_SERVER_ERROR",
                "url": null,
            }}}),
        ]))
        .expect(2)
        .mount(&server)
        .await;

    let bulk = orchestrator_for(&server, RetrievalPolicy::Propagate);
    let result = bulk.run_query(PRODUCTS_QUERY).await.unwrap();
    assert_eq!(result.operation.status, BulkStatus::Failed);
    assert_eq!(result.operation.error_code.as_deref(), Some("INTERNAL_SERVER_ERROR"));
    assert!(result.records.is_empty());
}
