#![allow(clippy::unwrap_used)]
// End-to-end refresh tests: wiremock appliance → RefreshLoop → Engine.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use flowscope_api::{ApplianceClient, TransportConfig};
use flowscope_core::identity::IdentitySource;
use flowscope_core::refresh::fetch_snapshot;
use flowscope_core::{
    Applied, ClientKind, DeviceKind, Engine, EngineConfig, IdentityResolver, NoLookup,
    RefreshLoop,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, ApplianceClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = ApplianceClient::new(base_url, &TransportConfig::default()).unwrap();
    (server, client)
}

async fn mount_config(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "load_balancers": [
                { "id": 1, "address": "10.0.0.1", "interface": "eth0",
                  "contention_ratio": 1, "enabled": true },
                { "id": 2, "address": "10.0.0.2", "interface": "eth1",
                  "contention_ratio": 1, "enabled": false }
            ],
            "settings": { "listen_host": "0.0.0.0", "listen_port": 1080 }
        })))
        .mount(server)
        .await;
}

async fn mount_stats(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "traffic_stats": {
                "bytes_in_per_second": 500_000,
                "bytes_out_per_second": 100_000,
                "active_connections": 3
            },
            "load_balancers": [
                { "address": "10.0.0.1", "bytes_in_per_second": 500_000,
                  "bytes_out_per_second": 100_000, "total_connections": 9,
                  "success_rate": 100.0 }
            ],
            "active_sources": [
                { "source_ip": "192.168.1.45", "bytes_in_per_second": 500_000,
                  "bytes_out_per_second": 100_000, "total_connections": 4,
                  "active_connections": 2, "assigned_lb": "10.0.0.1" }
            ]
        })))
        .mount(server)
        .await;
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn snapshot_resolves_identity_through_appliance() {
    let (server, client) = setup().await;
    mount_config(&server).await;
    mount_stats(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/resolve-hostname"))
        .and(query_param("ip", "192.168.1.45"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "hostname": "dens-tv.lan" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/device-info"))
        .respond_with(ResponseTemplate::new(404))
        .expect(0)
        .mount(&server)
        .await;

    let resolver = IdentityResolver::new(client.clone());
    let first = fetch_snapshot(&client, &resolver).await.unwrap();
    // Second cycle is served from the identity cache.
    let _second = fetch_snapshot(&client, &resolver).await.unwrap();

    let identity = &first.identities["192.168.1.45"];
    assert_eq!(identity.name, "Dens Tv");
    assert_eq!(identity.kind, ClientKind::Tv);
    assert_eq!(identity.source, IdentitySource::Hostname);
}

#[tokio::test]
async fn loop_outcome_builds_expected_topology() {
    let (server, client) = setup().await;
    mount_config(&server).await;
    mount_stats(&server).await;

    let (tx, mut rx) = mpsc::channel(4);
    let resolver = Arc::new(IdentityResolver::new(NoLookup));
    let refresh = RefreshLoop::spawn(client, resolver, Duration::from_secs(60), tx);

    let mut engine = Engine::new(1200.0, 700.0, &EngineConfig::default());
    let outcome = rx.recv().await.unwrap();
    assert_eq!(engine.apply(outcome), Applied::Rebuilt);

    let topo = Arc::clone(engine.topology());
    assert_eq!(topo.devices().len(), 5);
    assert_eq!(topo.connections().len(), 5);
    assert_eq!(topo.device("gateway").unwrap().subtitle, "0.0.0.0:1080");

    let client = topo.device("client:192.168.1.45").unwrap();
    assert!(matches!(client.kind, DeviceKind::Client(_)));

    for particle in engine.particles().particles() {
        let connection = &topo.connections()[particle.connection];
        assert!(connection.enabled);
        let (from, _) = topo.endpoints(connection).unwrap();
        assert_ne!(from.id, "lb:10.0.0.2");
    }

    refresh.shutdown().await;
}

#[tokio::test]
async fn failing_stats_keeps_last_good_topology() {
    let (server, client) = setup().await;
    mount_config(&server).await;
    mount_stats(&server).await;

    let resolver = IdentityResolver::new(NoLookup);
    let mut engine = Engine::new(1200.0, 700.0, &EngineConfig::default());

    let good = fetch_snapshot(&client, &resolver).await;
    engine.apply(flowscope_core::RefreshOutcome {
        generation: 1,
        result: good,
    });
    let before = Arc::clone(engine.topology());

    server.reset().await;
    mount_config(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/stats"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let bad = fetch_snapshot(&client, &resolver).await;
    assert!(bad.is_err());
    assert_eq!(
        engine.apply(flowscope_core::RefreshOutcome {
            generation: 2,
            result: bad,
        }),
        Applied::Failed
    );
    assert!(Arc::ptr_eq(&before, engine.topology()));
    assert!(engine.error_view().is_none());
}

#[tokio::test]
async fn session_expiry_surfaces_as_auth_error() {
    let (server, client) = setup().await;
    mount_config(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/stats"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let resolver = IdentityResolver::new(NoLookup);
    let mut engine = Engine::new(1200.0, 700.0, &EngineConfig::default());
    let result = fetch_snapshot(&client, &resolver).await;
    engine.apply(flowscope_core::RefreshOutcome {
        generation: 1,
        result,
    });

    assert!(matches!(
        engine.error_view(),
        Some(flowscope_core::CoreError::AuthenticationFailed { .. })
    ));
}
