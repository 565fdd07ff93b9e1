// flowscope-api: Async Rust client for the dispatch proxy status API

pub mod client;
pub mod error;
pub mod transport;
pub mod types;

pub use client::ApplianceClient;
pub use error::Error;
pub use transport::TransportConfig;
pub use types::{
    ConfigResponse, DeviceInfoResponse, HostnameResponse, LoadBalancerConfig, LoadBalancerStats,
    Settings, SourceStats, StatsResponse, TrafficStats,
};
