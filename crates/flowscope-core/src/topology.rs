// ── Topology builder ──
//
// Turns one config + stats snapshot into the positioned device graph.
// Missing or malformed fields have already been defaulted by the wire
// types, so building never fails: an empty snapshot still yields the
// ISP and gateway pair.

use std::collections::{HashMap, HashSet};

use flowscope_api::{ConfigResponse, LoadBalancerConfig, SourceStats, StatsResponse};

use crate::format::{format_rate, parse_rate_kbps};
use crate::geometry::Point;
use crate::identity::{Identity, fallback_identity};
use crate::layout::{CLIENT_SPACING, LOAD_BALANCER_SPACING, Layout};
use crate::model::{
    Connection, Device, DeviceKind, DeviceMetadata, Layer, LinkLoad, Topology, TopologySummary,
};
use crate::particles::usage_ratio;

pub const ISP_ID: &str = "isp";
pub const GATEWAY_ID: &str = "gateway";

/// Square footprint per device role.
pub fn device_size(kind: DeviceKind) -> f64 {
    match kind {
        DeviceKind::Isp | DeviceKind::Gateway => 60.0,
        DeviceKind::LoadBalancer => 50.0,
        DeviceKind::Client(_) => 40.0,
    }
}

pub fn load_balancer_id(address: &str) -> String {
    format!("lb:{address}")
}

pub fn client_id(ip: &str) -> String {
    format!("client:{ip}")
}

/// Build the topology for one refresh cycle.
///
/// Produces `1 + N + 1 + M` devices (ISP, load balancers, gateway, clients)
/// and `2N + M` connections, where N and M count distinct load balancer
/// addresses and source IPs; a repeated entry keeps its first occurrence.
/// Identities missing from `identities` use the deterministic fallback.
pub fn build(
    config: &ConfigResponse,
    stats: &StatsResponse,
    identities: &HashMap<String, Identity>,
    layout: &Layout,
) -> Topology {
    let traffic = &stats.traffic_stats;
    let balancers = first_by_key(&config.load_balancers, |lb| lb.address.as_str());
    let sources = first_by_key(&stats.active_sources, |s| s.source_ip.as_str());
    let lb_count = balancers.len();
    let client_count = sources.len();
    let mut devices = Vec::with_capacity(lb_count + client_count + 2);
    let mut links: Vec<(usize, usize, bool)> = Vec::with_capacity(2 * lb_count + client_count);

    // ── Uplink ──
    let isp = devices.len();
    devices.push(Device {
        id: ISP_ID.into(),
        kind: DeviceKind::Isp,
        name: "Internet".into(),
        subtitle: "ISP uplink".into(),
        download: format_rate(traffic.bytes_in_per_second),
        upload: format_rate(traffic.bytes_out_per_second),
        position: layout.anchor(Layer::Isp),
        layer: Layer::Isp,
        size: device_size(DeviceKind::Isp),
        enabled: true,
        metadata: DeviceMetadata {
            active_connections: traffic.active_connections,
            transferred: Some((traffic.total_bytes_in, traffic.total_bytes_out)),
            ..DeviceMetadata::default()
        },
    });

    // ── Load balancers ──
    let lb_positions = layout.column(Layer::LoadBalancer, lb_count, LOAD_BALANCER_SPACING);
    let mut lb_indices = Vec::with_capacity(lb_count);
    for (i, (lb, position)) in balancers.into_iter().zip(lb_positions).enumerate() {
        let index = devices.len();
        devices.push(load_balancer_device(lb, i, stats, position));
        lb_indices.push((index, lb.enabled));
    }

    // ── Gateway ──
    let gateway = devices.len();
    devices.push(Device {
        id: GATEWAY_ID.into(),
        kind: DeviceKind::Gateway,
        name: "Gateway".into(),
        subtitle: config.settings.listen_address(),
        download: format_rate(traffic.bytes_in_per_second),
        upload: format_rate(traffic.bytes_out_per_second),
        position: layout.anchor(Layer::Gateway),
        layer: Layer::Gateway,
        size: device_size(DeviceKind::Gateway),
        enabled: true,
        metadata: DeviceMetadata {
            active_connections: traffic.active_connections,
            transferred: Some((traffic.total_bytes_in, traffic.total_bytes_out)),
            ..DeviceMetadata::default()
        },
    });

    for &(lb, enabled) in &lb_indices {
        links.push((isp, lb, enabled));
        links.push((lb, gateway, enabled));
    }

    // ── Clients ──
    let client_positions = layout.column(Layer::Client, client_count, CLIENT_SPACING);
    for (source, position) in sources.into_iter().zip(client_positions) {
        let identity = identities
            .get(&source.source_ip)
            .cloned()
            .unwrap_or_else(|| fallback_identity(&source.source_ip));
        let index = devices.len();
        devices.push(client_device(source, identity, position));
        links.push((gateway, index, true));
    }

    let connections = weigh_connections(&devices, &links);
    let summary = TopologySummary {
        total_bytes_per_sec: traffic
            .bytes_in_per_second
            .saturating_add(traffic.bytes_out_per_second),
        active_connections: traffic.active_connections,
        load_balancers: lb_count,
        clients: client_count,
    };

    Topology::new(devices, connections, summary)
}

/// Entries in order, skipping any whose key was already seen.
fn first_by_key<'a, T>(items: &'a [T], key: impl Fn(&'a T) -> &'a str) -> Vec<&'a T> {
    let mut seen = HashSet::new();
    items.iter().filter(|item| seen.insert(key(*item))).collect()
}

fn load_balancer_device(
    lb: &LoadBalancerConfig,
    position_index: usize,
    stats: &StatsResponse,
    position: Point,
) -> Device {
    let live = stats.load_balancers.iter().find(|s| s.address == lb.address);
    let (down, up) = live.map_or((0, 0), |s| (s.bytes_in_per_second, s.bytes_out_per_second));
    let number = lb
        .id
        .map_or_else(|| (position_index + 1).to_string(), |id| id.to_string());
    let subtitle = if lb.interface.is_empty() {
        lb.address.clone()
    } else {
        format!("{} ({})", lb.address, lb.interface)
    };

    Device {
        id: load_balancer_id(&lb.address),
        kind: DeviceKind::LoadBalancer,
        name: format!("LB{number}"),
        subtitle,
        download: format_rate(down),
        upload: format_rate(up),
        position,
        layer: Layer::LoadBalancer,
        size: device_size(DeviceKind::LoadBalancer),
        enabled: lb.enabled,
        metadata: DeviceMetadata {
            connections: live.map_or(0, |s| s.total_connections),
            success_rate: live.map(|s| s.success_rate),
            interface: Some(lb.interface.clone()).filter(|i| !i.is_empty()),
            contention_ratio: Some(lb.contention_ratio),
            ..DeviceMetadata::default()
        },
    }
}

fn client_device(source: &SourceStats, identity: Identity, position: Point) -> Device {
    let kind = DeviceKind::Client(identity.kind);
    Device {
        id: client_id(&source.source_ip),
        kind,
        name: identity.name,
        subtitle: source.source_ip.clone(),
        download: format_rate(source.bytes_in_per_second),
        upload: format_rate(source.bytes_out_per_second),
        position,
        layer: Layer::Client,
        size: device_size(kind),
        enabled: true,
        metadata: DeviceMetadata {
            connections: source.total_connections,
            active_connections: source.active_connections,
            assigned_lb: Some(source.assigned_lb.clone()).filter(|a| !a.is_empty()),
            ..DeviceMetadata::default()
        },
    }
}

/// Attach bandwidth figures to each link.
///
/// A link's current load is its destination's download + upload labels
/// read back as Kbps; the maximum is the busiest link in this snapshot.
fn weigh_connections(devices: &[Device], links: &[(usize, usize, bool)]) -> Vec<Connection> {
    let current: Vec<f64> = links
        .iter()
        .map(|&(_, to, _)| {
            devices.get(to).map_or(0.0, |d| {
                parse_rate_kbps(&d.download) + parse_rate_kbps(&d.upload)
            })
        })
        .collect();
    let max_kbps = current.iter().copied().fold(0.0_f64, f64::max);

    links
        .iter()
        .zip(current)
        .map(|(&(from, to, enabled), current_kbps)| Connection {
            from,
            to,
            enabled,
            load: LinkLoad {
                current_kbps,
                max_kbps,
                usage_ratio: usage_ratio(current_kbps, max_kbps),
            },
        })
        .collect()
}
