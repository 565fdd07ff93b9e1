// flowscope-core: Topology engine between flowscope-api and the terminal host.

pub mod config;
pub mod engine;
pub mod error;
pub mod format;
pub mod geometry;
pub mod identity;
pub mod layout;
pub mod model;
pub mod particles;
pub mod refresh;
pub mod render;
pub mod topology;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::EngineConfig;
pub use engine::{Applied, Engine, LoadStatus};
pub use error::CoreError;
pub use identity::{Identity, IdentityLookup, IdentityResolver, NoLookup};
pub use refresh::{RefreshLoop, RefreshOutcome, Snapshot, SnapshotSource};

// Re-export model types at the crate root for ergonomics.
pub use geometry::{OrthogonalPath, Point};
pub use layout::Layout;
pub use model::{
    ClientKind, Connection, Device, DeviceKind, DeviceMetadata, Layer, LinkLoad, Topology,
    TopologySummary,
};
pub use particles::{Particle, ParticleField};
pub use render::{Color, Icon, IconSet, IconState, Rect, StrokeStyle, Surface, TextAlign, TextStyle};
