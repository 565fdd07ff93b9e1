#![allow(clippy::unwrap_used)]
// Integration tests for `ApplianceClient` using wiremock.

use serde_json::json;
use url::Url;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use flowscope_api::{ApplianceClient, Error, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, ApplianceClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = ApplianceClient::new(base_url, &TransportConfig::default()).unwrap();
    (server, client)
}

// ── Happy-path tests ────────────────────────────────────────────────

#[tokio::test]
async fn test_config() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "config_file": "/etc/dispatch.conf",
            "load_balancers": [
                { "id": 1, "address": "10.0.0.1", "interface": "eth0",
                  "contention_ratio": 3, "enabled": true },
                { "id": 2, "address": "10.0.0.2", "interface": "wlan0",
                  "contention_ratio": 1, "enabled": false }
            ],
            "settings": { "listen_host": "0.0.0.0", "listen_port": 1080 }
        })))
        .mount(&server)
        .await;

    let config = client.config().await.unwrap();

    assert_eq!(config.load_balancers.len(), 2);
    assert_eq!(config.load_balancers[0].address, "10.0.0.1");
    assert_eq!(config.load_balancers[0].contention_ratio, 3);
    assert!(config.load_balancers[0].enabled);
    assert!(!config.load_balancers[1].enabled);
    assert_eq!(config.load_balancers[1].id, Some(2));
    assert_eq!(config.settings.listen_address(), "0.0.0.0:1080");
}

#[tokio::test]
async fn test_stats() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "traffic_stats": {
                "bytes_in_per_second": 600_000,
                "bytes_out_per_second": 120_000,
                "active_connections": 7
            },
            "load_balancers": [
                { "address": "10.0.0.1", "bytes_in_per_second": 600_000,
                  "bytes_out_per_second": 120_000, "total_connections": 42,
                  "success_rate": 97.5 }
            ],
            "active_sources": [
                { "source_ip": "192.168.1.45", "bytes_in_per_second": 500_000,
                  "bytes_out_per_second": 100_000, "total_connections": 12,
                  "active_connections": 3, "assigned_lb": "10.0.0.1" }
            ]
        })))
        .mount(&server)
        .await;

    let stats = client.stats().await.unwrap();

    assert_eq!(stats.traffic_stats.active_connections, 7);
    assert_eq!(stats.load_balancers[0].total_connections, 42);
    assert!((stats.load_balancers[0].success_rate - 97.5).abs() < f64::EPSILON);
    assert_eq!(stats.active_sources[0].source_ip, "192.168.1.45");
    assert_eq!(stats.active_sources[0].assigned_lb, "10.0.0.1");
}

#[tokio::test]
async fn test_resolve_hostname_sends_ip_query() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/resolve-hostname"))
        .and(query_param("ip", "192.168.1.45"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "hostname": "dens-tv.lan" })),
        )
        .mount(&server)
        .await;

    let resp = client.resolve_hostname("192.168.1.45").await.unwrap();
    assert_eq!(resp.hostname.as_deref(), Some("dens-tv.lan"));
}

#[tokio::test]
async fn test_device_info() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/device-info"))
        .and(query_param("ip", "192.168.1.77"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "vendor": "Apple, Inc.",
            "os": "iOS 17"
        })))
        .mount(&server)
        .await;

    let info = client.device_info("192.168.1.77").await.unwrap();
    assert!(info.name.is_none());
    assert_eq!(info.vendor.as_deref(), Some("Apple, Inc."));
    assert_eq!(info.os.as_deref(), Some("iOS 17"));
}

#[tokio::test]
async fn test_login_success() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_string_contains("username=admin"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .mount(&server)
        .await;

    let secret: secrecy::SecretString = "hunter2".to_string().into();
    client.login("admin", &secret).await.unwrap();
}

#[tokio::test]
async fn test_login_redirect_keeps_session_cookie() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", "/")
                .insert_header("Set-Cookie", "session=abc123; Path=/"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>dashboard</html>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/stats"))
        .and(header("cookie", "session=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let secret: secrecy::SecretString = "hunter2".to_string().into();
    client.login("admin", &secret).await.unwrap();
    client.stats().await.unwrap();
}

// ── Error-path tests ────────────────────────────────────────────────

#[tokio::test]
async fn test_login_failure() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid credentials"))
        .mount(&server)
        .await;

    let secret: secrecy::SecretString = "wrong".to_string().into();
    let result = client.login("admin", &secret).await;

    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_unauthorized_stats() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/stats"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&server)
        .await;

    let result = client.stats().await;
    assert!(result.unwrap_err().is_auth_expired());
}

#[tokio::test]
async fn test_redirect_to_login_is_auth_failure() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/config"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/login"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<form>login</form>"))
        .mount(&server)
        .await;

    let result = client.config().await;
    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_server_error_is_status_and_transient() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/stats"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client.stats().await.unwrap_err();
    assert!(matches!(err, Error::Status { status: 503, .. }));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_garbage_body_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/config"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client.config().await.unwrap_err();
    match err {
        Error::Deserialization { body, .. } => assert_eq!(body, "not json"),
        other => panic!("expected Deserialization error, got: {other:?}"),
    }
}
