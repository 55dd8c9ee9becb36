//! End-to-end runs of the shopify-bulk binary.

use super::test_utils::{Sequence, API_PATH};
use serde_json::json;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Binary invocation isolated from the caller's config and log environment
fn command(home: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_shopify-bulk"));
    // Other tests set SHOPIFY_BULK__* variables in this process
    command
        .env_clear()
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("HOME", home)
        .arg("--workspace")
        .arg(home);
    command
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim_end().to_string()
}

#[test]
fn test_tree_command_with_file_logging() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("result.jsonl");
    let log_file = temp_dir.path().join("logs").join("run.log");
    fs::write(
        &input,
        "{\"id\":\"1\",\"__typename\":\"Product\"}\n{\"id\":\"2\",\"__typename\":\"ProductVariant\",\"__parentId\":\"1\"}\n",
    )
    .unwrap();

    let output = command(temp_dir.path())
        .arg("--log-level")
        .arg("debug")
        .arg("--log-output")
        .arg("file")
        .arg("--log-file")
        .arg(&log_file)
        .arg("tree")
        .arg(&input)
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "tree should succeed: stderr={:?}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(
        stdout(&output),
        "{\"id\":\"1\",\"__typename\":\"Product\",\"productVariants\":[{\"id\":\"2\",\"__typename\":\"ProductVariant\"}]}"
    );

    let content = fs::read_to_string(&log_file).unwrap();
    assert!(content.contains("shopify-bulk starting"));
    assert!(content.contains("Command finished"));
}

#[test]
fn test_invalid_config_reports_category_and_exit_code() {
    let temp_dir = TempDir::new().unwrap();
    let output = command(temp_dir.path())
        .arg("config")
        .arg("--validate")
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error[config]"), "stderr={}", stderr);
    assert!(stderr.contains("subdomain is required"), "stderr={}", stderr);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_bulk_query_through_binary() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(API_PATH))
        .and(header("X-Shopify-Access-Token", "shpat_cli"))
        .and(body_string_contains("bulkOperationRunQuery"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {
            "bulkOperationRunQuery": {
                "bulkOperation": {"id": "gid://shopify/BulkOperation/3", "status": "CREATED"},
                "userErrors": [],
            }
        }})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(API_PATH))
        .and(body_string_contains("currentBulkOperation"))
        .respond_with(Sequence::new(vec![json!({"data": {"currentBulkOperation": {
            "id": "gid://shopify/BulkOperation/3",
            "status": "COMPLETED",
            "url": format!("{}/results/3.jsonl", server.uri()),
        }}})]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/results/3.jsonl"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "{\"id\":\"gid://shopify/Product/1\",\"__typename\":\"Product\"}\n{\"id\":\"gid://shopify/Metafield/2\",\"__typename\":\"Metafield\",\"__parentId\":\"gid://shopify/Product/1\"}\n",
        ))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let mut cmd = command(temp_dir.path());
    cmd.env("SHOPIFY_BULK__AUTH__MODE", "access_token")
        .env("SHOPIFY_BULK__AUTH__ACCESS_TOKEN", "shpat_cli")
        .env("SHOPIFY_BULK__BULK__POLL_INTERVAL_MS", "10")
        .arg("--shop")
        .arg("demo")
        .arg("--endpoint")
        .arg(format!("{}{}", server.uri(), API_PATH))
        .arg("bulk-query")
        .arg("{ products { edges { node { id metafields { edges { node { id } } } } } } }")
        .arg("--output")
        .arg("tree");

    let output = tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap();

    assert!(
        output.status.success(),
        "bulk-query should succeed: stderr={:?}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(
        stdout(&output),
        "{\"id\":\"gid://shopify/Product/1\",\"__typename\":\"Product\",\"metafields\":[{\"id\":\"gid://shopify/Metafield/2\",\"__typename\":\"Metafield\"}]}"
    );
}
