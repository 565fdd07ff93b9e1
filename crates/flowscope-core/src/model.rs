// ── Topology domain model ──
//
// Devices and connections are rebuilt wholesale on every data refresh.
// A connection refers to its endpoints by index into the device list of
// the same `Topology`, so the pair is only meaningful together.

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::geometry::Point;

// ── Kinds ────────────────────────────────────────────────────────────

/// Client device category, used for naming and icon selection.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString, IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum ClientKind {
    Desktop,
    Laptop,
    Phone,
    Tablet,
    Tv,
    Console,
    Iot,
}

/// Role of a device in the topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Isp,
    LoadBalancer,
    Gateway,
    Client(ClientKind),
}

impl DeviceKind {
    /// Stable kebab-case key ("isp", "load-balancer", "gateway", "laptop", ...).
    ///
    /// Used as the icon file stem and in logs.
    pub fn key(self) -> &'static str {
        match self {
            Self::Isp => "isp",
            Self::LoadBalancer => "load-balancer",
            Self::Gateway => "gateway",
            Self::Client(kind) => kind.into(),
        }
    }

    /// Fixed layout layer for this kind.
    pub fn layer(self) -> Layer {
        match self {
            Self::Isp => Layer::Isp,
            Self::LoadBalancer => Layer::LoadBalancer,
            Self::Gateway => Layer::Gateway,
            Self::Client(_) => Layer::Client,
        }
    }

    /// Every kind that can appear on screen, for icon preloading.
    pub fn all() -> impl Iterator<Item = Self> {
        use strum::IntoEnumIterator;
        [Self::Isp, Self::LoadBalancer, Self::Gateway]
            .into_iter()
            .chain(ClientKind::iter().map(Self::Client))
    }
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Horizontal rank in the layered layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Layer {
    Isp = 0,
    LoadBalancer = 1,
    Gateway = 2,
    Client = 3,
}

impl Layer {
    pub const ALL: [Self; 4] = [Self::Isp, Self::LoadBalancer, Self::Gateway, Self::Client];

    pub fn index(self) -> usize {
        match self {
            Self::Isp => 0,
            Self::LoadBalancer => 1,
            Self::Gateway => 2,
            Self::Client => 3,
        }
    }
}

// ── Device ───────────────────────────────────────────────────────────

/// Extra per-device facts shown in the details panel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceMetadata {
    /// Total connections handled (load balancers, clients).
    pub connections: u64,
    /// Currently open connections.
    pub active_connections: u64,
    /// Dispatch success rate in percent (load balancers only).
    pub success_rate: Option<f64>,
    /// Outbound interface name (load balancers only).
    pub interface: Option<String>,
    /// Configured contention ratio (load balancers only).
    pub contention_ratio: Option<u32>,
    /// Load balancer address a client is pinned to.
    pub assigned_lb: Option<String>,
    /// Bytes received and sent since the appliance started (ISP, gateway).
    pub transferred: Option<(u64, u64)>,
}

/// A positioned node of the topology.
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    /// Stable key derived from role and address ("isp", "lb:10.0.0.1", ...).
    pub id: String,
    pub kind: DeviceKind,
    pub name: String,
    /// Secondary line under the name (address, listen socket, ...).
    pub subtitle: String,
    /// Formatted download rate label.
    pub download: String,
    /// Formatted upload rate label.
    pub upload: String,
    /// Center of the device in surface coordinates.
    pub position: Point,
    pub layer: Layer,
    /// Edge length of the device's square footprint.
    pub size: f64,
    pub enabled: bool,
    pub metadata: DeviceMetadata,
}

// ── Connection ───────────────────────────────────────────────────────

/// Bandwidth figures driving a connection's visual weight.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LinkLoad {
    /// Current combined (down + up) throughput in Kbps.
    pub current_kbps: f64,
    /// Busiest connection's throughput in this snapshot, in Kbps.
    pub max_kbps: f64,
    /// `current / max(max, 1)`, clamped to `[0, 1]`.
    pub usage_ratio: f64,
}

/// A directed edge between two devices of the same topology.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    /// Index of the source device.
    pub from: usize,
    /// Index of the target device.
    pub to: usize,
    pub enabled: bool,
    pub load: LinkLoad,
}

// ── Topology ─────────────────────────────────────────────────────────

/// Header figures for the whole appliance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TopologySummary {
    /// Combined in + out bytes per second.
    pub total_bytes_per_sec: u64,
    pub active_connections: u64,
    pub load_balancers: usize,
    pub clients: usize,
}

/// One refresh cycle's device graph.
///
/// Every connection's endpoints index into `devices` of the same value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Topology {
    devices: Vec<Device>,
    connections: Vec<Connection>,
    summary: TopologySummary,
}

impl Topology {
    pub(crate) fn new(
        devices: Vec<Device>,
        connections: Vec<Connection>,
        summary: TopologySummary,
    ) -> Self {
        debug_assert!(
            connections
                .iter()
                .all(|c| c.from < devices.len() && c.to < devices.len()),
            "connection endpoint outside device list"
        );
        Self {
            devices,
            connections,
            summary,
        }
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn summary(&self) -> TopologySummary {
        self.summary
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Resolve a connection's endpoints.
    pub fn endpoints(&self, connection: &Connection) -> Option<(&Device, &Device)> {
        Some((
            self.devices.get(connection.from)?,
            self.devices.get(connection.to)?,
        ))
    }

    /// Look up a device by its stable id.
    pub fn device(&self, id: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.id == id)
    }
}
