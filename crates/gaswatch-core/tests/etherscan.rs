//! Gas oracle client and full check cycle against mocked HTTP endpoints

use std::path::Path;

use gaswatch::config::{Config, SourceConfig};
use gaswatch::error::RetrievalError;
use gaswatch::models::CheckOutcome;
use gaswatch::source::{EtherscanSource, PriceSource};
use gaswatch::{Error, PriceCheckRunner};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn oracle_body(propose: &str) -> serde_json::Value {
    json!({
        "status": "1",
        "message": "OK",
        "result": {
            "LastBlock": "20000000",
            "SafeGasPrice": "8",
            "ProposeGasPrice": propose,
            "FastGasPrice": "15",
            "suggestBaseFee": "7.9",
            "gasUsedRatio": "0.5,0.4"
        }
    })
}

fn source_config(server: &MockServer, api_key: &str) -> SourceConfig {
    SourceConfig {
        api_url: format!("{}/api", server.uri()),
        api_key: api_key.to_string(),
        timeout_seconds: 5,
        ..SourceConfig::default()
    }
}

fn test_config(etherscan: &MockServer, telegram: &MockServer, data_dir: &Path) -> Config {
    let mut config = Config::default();
    config.source = source_config(etherscan, "KEY");
    config.alerting.gas_fee_threshold = 20.0;
    config.storage.data_dir = data_dir.to_path_buf();
    config.telegram.bot_token = Some("123:abc".to_string());
    config.telegram.chat_id = Some("777".to_string());
    config.telegram.api_base = telegram.uri();
    config
}

#[tokio::test]
async fn test_fetch_sends_oracle_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api"))
        .and(query_param("chainid", "1"))
        .and(query_param("module", "gastracker"))
        .and(query_param("action", "gasoracle"))
        .and(query_param("apikey", "KEY"))
        .respond_with(ResponseTemplate::new(200).set_body_json(oracle_body("12")))
        .expect(1)
        .mount(&server)
        .await;

    let source = EtherscanSource::new(&source_config(&server, "KEY")).unwrap();
    let observation = source.fetch().await.unwrap();

    assert_eq!(observation.value, 12.0);
    assert_eq!(observation.source, source.name());
    let quote = observation.quote.unwrap();
    assert_eq!(quote.safe, 8.0);
    assert_eq!(quote.fast, 15.0);
    assert_eq!(quote.last_block, Some(20_000_000));
}

#[tokio::test]
async fn test_server_error_is_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let source = EtherscanSource::new(&source_config(&server, "")).unwrap();

    match source.fetch().await {
        Err(RetrievalError::Status { status, body }) => {
            assert_eq!(status, 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_rate_limit_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "0",
            "message": "NOTOK",
            "result": "Max rate limit reached"
        })))
        .mount(&server)
        .await;

    let source = EtherscanSource::new(&source_config(&server, "")).unwrap();

    assert!(matches!(
        source.fetch().await,
        Err(RetrievalError::Api { detail, .. }) if detail == "Max rate limit reached"
    ));
}

#[tokio::test]
async fn test_unreachable_source_hides_api_key() {
    let config = SourceConfig {
        api_url: "http://127.0.0.1:9/api".to_string(),
        api_key: "SECRETKEY".to_string(),
        timeout_seconds: 2,
        ..SourceConfig::default()
    };
    let source = EtherscanSource::new(&config).unwrap();

    let err = source.fetch().await.unwrap_err();

    assert!(matches!(err, RetrievalError::Http(_)));
    assert!(!err.to_string().contains("SECRETKEY"));
}

#[tokio::test]
async fn test_check_cycle_end_to_end() {
    let etherscan = MockServer::start().await;
    let telegram = MockServer::start().await;
    let data = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/api"))
        .respond_with(ResponseTemplate::new(200).set_body_json(oracle_body("14.2")))
        .mount(&etherscan)
        .await;
    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendMessage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&telegram)
        .await;

    let config = test_config(&etherscan, &telegram, data.path());
    let runner = PriceCheckRunner::from_config(&config).unwrap();

    let first = runner.run().await.unwrap();
    assert_eq!(first.outcome, CheckOutcome::Triggered);
    assert!(first.notified);

    let second = runner.run().await.unwrap();
    assert_eq!(second.outcome, CheckOutcome::NoAction);

    assert_eq!(runner.log().read_all().await.unwrap().len(), 2);
    assert_eq!(
        std::fs::read_to_string(data.path().join("notified_state.txt")).unwrap(),
        "True"
    );
}

#[tokio::test]
async fn test_check_cycle_without_network_fails_cleanly() {
    let telegram = MockServer::start().await;
    let data = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&telegram)
        .await;

    let mut config = Config::default();
    config.source.api_url = "http://127.0.0.1:9/api".to_string();
    config.source.timeout_seconds = 2;
    config.storage.data_dir = data.path().to_path_buf();
    config.telegram.bot_token = Some("123:abc".to_string());
    config.telegram.chat_id = Some("777".to_string());
    config.telegram.api_base = telegram.uri();

    let runner = PriceCheckRunner::from_config(&config).unwrap();
    let err = runner.run().await.unwrap_err();

    assert!(err.is_retrieval());
    assert!(matches!(err, Error::Retrieval(RetrievalError::Http(_))));
    assert!(std::fs::read_dir(data.path()).unwrap().next().is_none());
}
