// Fixed colors of the topology scene.

use super::Color;
use crate::model::{ClientKind, DeviceKind};

pub const BACKGROUND: Color = Color::rgb(0x0f, 0x17, 0x2a);

// ── Connections ──
pub const CONNECTION_DISABLED: Color = Color::rgb(0x44, 0x44, 0x44);
pub const DISABLED_OPACITY: f64 = 0.3;

// ── Usage bands ──
pub const USAGE_LOW: Color = Color::rgb(0x2e, 0xd5, 0x73);
pub const USAGE_MEDIUM: Color = Color::rgb(0xff, 0xa5, 0x02);
pub const USAGE_HIGH: Color = Color::rgb(0xff, 0x47, 0x57);

pub const MEDIUM_USAGE_RATIO: f64 = 0.33;
pub const HIGH_USAGE_RATIO: f64 = 0.66;

// ── Labels ──
pub const LABEL: Color = Color::rgb(0xf8, 0xfa, 0xfc);
pub const SUBTITLE: Color = Color::rgb(0x94, 0xa3, 0xb8);
pub const DOWNLOAD: Color = Color::rgb(0x2e, 0xd5, 0x73);
pub const UPLOAD: Color = Color::rgb(0x1e, 0x90, 0xff);

/// Color for a usage ratio: green, amber, then red.
pub fn usage_color(ratio: f64) -> Color {
    if ratio >= HIGH_USAGE_RATIO {
        USAGE_HIGH
    } else if ratio >= MEDIUM_USAGE_RATIO {
        USAGE_MEDIUM
    } else {
        USAGE_LOW
    }
}

/// Fallback shape color per device kind.
pub fn device_color(kind: DeviceKind) -> Color {
    match kind {
        DeviceKind::Isp => Color::rgb(0x53, 0x52, 0xed),
        DeviceKind::LoadBalancer => Color::rgb(0x1e, 0x90, 0xff),
        DeviceKind::Gateway => Color::rgb(0xff, 0x6b, 0x81),
        DeviceKind::Client(client) => match client {
            ClientKind::Desktop => Color::rgb(0x70, 0xa1, 0xff),
            ClientKind::Laptop => Color::rgb(0x7b, 0xed, 0x9f),
            ClientKind::Phone => Color::rgb(0xec, 0xcc, 0x68),
            ClientKind::Tablet => Color::rgb(0xff, 0x7f, 0x50),
            ClientKind::Tv => Color::rgb(0xa2, 0x9b, 0xfe),
            ClientKind::Console => Color::rgb(0xfd, 0x79, 0xa8),
            ClientKind::Iot => Color::rgb(0x00, 0xce, 0xc9),
        },
    }
}
