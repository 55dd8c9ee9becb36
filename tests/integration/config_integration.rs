//! Configuration layering across the global file, workspace files and environment

use super::test_utils::with_config_env;
use shopify_bulk::client::{AuthMode, CredentialStore, Credentials};
use shopify_bulk::config::ConfigLoader;
use shopify_bulk::stream::RetrievalPolicy;
use shopify_bulk::{BulkError, OutputShape};
use std::path::Path;
use tempfile::TempDir;

fn write(path: &Path, contents: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

#[test]
fn test_global_file_from_xdg_config_home() {
    let home = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    write(
        &home.path().join("shopify-bulk").join("config.toml"),
        r#"
[shop]
subdomain = "global-shop"

[auth]
mode = "access_token"
access_token = "shpat_global"

[bulk]
poll_interval_ms = 2500
retrieval = "propagate"
output = "tree"
"#,
    );

    let config = with_config_env(&home, &[], || ConfigLoader::load(workspace.path())).unwrap();

    assert_eq!(config.shop.subdomain, "global-shop");
    assert_eq!(config.shop.api_version, "2025-07");
    assert_eq!(config.auth.mode, AuthMode::AccessToken);
    assert_eq!(config.bulk.poll_interval_ms, 2500);
    assert_eq!(config.bulk.retrieval, RetrievalPolicy::Propagate);
    assert_eq!(config.bulk.output, OutputShape::Tree);
    config.ensure_valid().unwrap();

    match config.credentials(AuthMode::AccessToken).unwrap() {
        Credentials::AccessToken {
            shop_subdomain,
            access_token,
        } => {
            assert_eq!(shop_subdomain, "global-shop");
            assert_eq!(access_token, "shpat_global");
        }
        other => panic!("unexpected credentials: {other:?}"),
    }
}

#[test]
fn test_environment_overrides_files() {
    let home = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    write(
        &workspace.path().join("config").join("config.toml"),
        "[shop]\nsubdomain = \"workspace-shop\"\n",
    );

    let config = with_config_env(
        &home,
        &[
            ("SHOPIFY_BULK__SHOP__SUBDOMAIN", "env-shop"),
            ("SHOPIFY_BULK__AUTH__MODE", "oauth2"),
            ("SHOPIFY_BULK__AUTH__CLIENT_ID", "client"),
            ("SHOPIFY_BULK__AUTH__CLIENT_SECRET", "secret"),
        ],
        || ConfigLoader::load(workspace.path()),
    )
    .unwrap();

    assert_eq!(config.shop.subdomain, "env-shop");
    assert_eq!(config.auth.mode, AuthMode::OAuth2);
    assert_eq!(config.auth.client_id.as_deref(), Some("client"));
    config.ensure_valid().unwrap();
}

#[test]
fn test_environment_specific_workspace_file() {
    let home = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    write(
        &workspace.path().join("config").join("config.toml"),
        "[shop]\nsubdomain = \"dev-shop\"\napi_version = \"2024-10\"\n",
    );
    write(
        &workspace.path().join("config").join("staging.toml"),
        "[shop]\nsubdomain = \"staging-shop\"\n",
    );

    let config = with_config_env(&home, &[("SHOPIFY_BULK_ENV", "staging")], || {
        ConfigLoader::load(workspace.path())
    })
    .unwrap();

    assert_eq!(config.shop.subdomain, "staging-shop");
    assert_eq!(config.shop.api_version, "2024-10");
}

#[test]
fn test_incomplete_credentials_fail_validation() {
    let home = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    write(
        &workspace.path().join("config").join("config.toml"),
        "[shop]\nsubdomain = \"demo\"\n\n[auth]\nmode = \"api_key\"\napi_key = \"key\"\n",
    );

    let config = with_config_env(&home, &[], || ConfigLoader::load(workspace.path())).unwrap();
    match config.ensure_valid() {
        Err(BulkError::Config(message)) => assert!(message.contains("password")),
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(config.credentials(AuthMode::ApiKey).is_err());
}

#[test]
fn test_explicit_file_must_exist() {
    let dir = TempDir::new().unwrap();
    let result = ConfigLoader::load_from_file(&dir.path().join("missing.toml"));
    assert!(matches!(result, Err(BulkError::Config(_))));
}

#[test]
fn test_redacted_rendering_hides_secrets() {
    let home = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    write(
        &workspace.path().join("config").join("config.toml"),
        "[shop]\nsubdomain = \"demo\"\n\n[auth]\nmode = \"access_token\"\naccess_token = \"shpat_secret\"\n",
    );

    let config = with_config_env(&home, &[], || ConfigLoader::load(workspace.path())).unwrap();
    let rendered = config.redacted().to_toml().unwrap();
    assert!(rendered.contains("subdomain = \"demo\""));
    assert!(!rendered.contains("shpat_secret"));
    assert!(rendered.contains("***"));
}
