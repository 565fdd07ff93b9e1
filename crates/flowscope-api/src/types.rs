// Wire types for the appliance status API.
//
// The appliance is loose about its JSON: fields go missing between
// firmware builds and numbers occasionally arrive as strings or null.
// Every field is defaulted and decoded leniently, so one bad field
// degrades to zero/empty instead of failing the whole payload, and one
// bad list entry is dropped without losing its siblings.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// Fallback listen host when `settings.listen_host` is absent or empty.
pub const DEFAULT_LISTEN_HOST: &str = "127.0.0.1";
/// Fallback listen port when `settings.listen_port` is absent or zero.
pub const DEFAULT_LISTEN_PORT: u16 = 8080;

/// Decode a field, falling back to `T::default()` when the value is
/// present but has the wrong shape.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Decode a list one element at a time, dropping only the elements that
/// fail. Anything other than an array decodes to an empty list.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let serde_json::Value::Array(items) = value else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

// ── GET /api/config ─────────────────────────────────────────────────

/// Appliance configuration: the configured uplinks and listener settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ConfigResponse {
    #[serde(default, deserialize_with = "lenient_list")]
    pub load_balancers: Vec<LoadBalancerConfig>,
    #[serde(default, deserialize_with = "lenient")]
    pub settings: Settings,
}

/// One configured load balancer (outbound uplink).
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct LoadBalancerConfig {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub address: String,
    #[serde(default, deserialize_with = "lenient")]
    pub interface: String,
    #[serde(default, deserialize_with = "lenient")]
    pub contention_ratio: u32,
    #[serde(default, deserialize_with = "lenient")]
    pub enabled: bool,
}

/// Listener settings of the proxy itself.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default, deserialize_with = "lenient")]
    pub listen_host: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub listen_port: Option<u16>,
}

impl Settings {
    /// Listen host, falling back to loopback.
    pub fn listen_host(&self) -> &str {
        self.listen_host
            .as_deref()
            .filter(|h| !h.is_empty())
            .unwrap_or(DEFAULT_LISTEN_HOST)
    }

    /// Listen port, falling back to 8080.
    pub fn listen_port(&self) -> u16 {
        self.listen_port
            .filter(|p| *p != 0)
            .unwrap_or(DEFAULT_LISTEN_PORT)
    }

    /// `host:port` the proxy accepts clients on.
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.listen_host(), self.listen_port())
    }
}

// ── GET /api/stats ──────────────────────────────────────────────────

/// Live traffic statistics snapshot.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct StatsResponse {
    #[serde(default, deserialize_with = "lenient")]
    pub traffic_stats: TrafficStats,
    #[serde(default, deserialize_with = "lenient_list")]
    pub load_balancers: Vec<LoadBalancerStats>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub active_sources: Vec<SourceStats>,
}

/// Appliance-wide traffic counters.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TrafficStats {
    #[serde(default, deserialize_with = "lenient")]
    pub bytes_in_per_second: u64,
    #[serde(default, deserialize_with = "lenient")]
    pub bytes_out_per_second: u64,
    #[serde(default, deserialize_with = "lenient")]
    pub active_connections: u64,
    #[serde(default, deserialize_with = "lenient")]
    pub total_bytes_in: u64,
    #[serde(default, deserialize_with = "lenient")]
    pub total_bytes_out: u64,
}

/// Per-uplink counters, matched to configuration by `address`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct LoadBalancerStats {
    #[serde(default, deserialize_with = "lenient")]
    pub address: String,
    #[serde(default, deserialize_with = "lenient")]
    pub bytes_in_per_second: u64,
    #[serde(default, deserialize_with = "lenient")]
    pub bytes_out_per_second: u64,
    #[serde(default, deserialize_with = "lenient")]
    pub total_connections: u64,
    #[serde(default, deserialize_with = "lenient")]
    pub success_rate: f64,
}

/// A client source IP with traffic currently flowing through the proxy.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SourceStats {
    #[serde(default, deserialize_with = "lenient")]
    pub source_ip: String,
    #[serde(default, deserialize_with = "lenient")]
    pub bytes_in_per_second: u64,
    #[serde(default, deserialize_with = "lenient")]
    pub bytes_out_per_second: u64,
    #[serde(default, deserialize_with = "lenient")]
    pub total_connections: u64,
    #[serde(default, deserialize_with = "lenient")]
    pub active_connections: u64,
    #[serde(default, deserialize_with = "lenient")]
    pub assigned_lb: String,
}

// ── Identity helpers ────────────────────────────────────────────────

/// `GET /api/resolve-hostname?ip=` response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct HostnameResponse {
    #[serde(default, deserialize_with = "lenient")]
    pub hostname: Option<String>,
}

/// `GET /api/device-info?ip=` response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct DeviceInfoResponse {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    pub device_type: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub user_agent: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub vendor: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub os: Option<String>,
}
