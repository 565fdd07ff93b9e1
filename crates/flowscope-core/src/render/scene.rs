// ── Scene renderer ──
//
// One frame: background, connections, particles, devices. Pure draw calls
// against a `Surface`; nothing in the model is touched.

use super::palette::{
    BACKGROUND, CONNECTION_DISABLED, DISABLED_OPACITY, DOWNLOAD, LABEL, SUBTITLE, UPLOAD,
    device_color, usage_color,
};
use super::{Color, IconSet, Rect, StrokeStyle, Surface, TextAlign, TextStyle};
use crate::geometry::{OrthogonalPath, Point};
use crate::model::{Connection, Device, Topology};
use crate::particles::ParticleField;

/// Thinnest connection line.
pub const MIN_THICKNESS: f64 = 2.0;
/// Extra width the busiest link can add on top of [`MIN_THICKNESS`].
pub const THICKNESS_RANGE: f64 = 6.0;

const GLOW_SCALE: f64 = 2.2;
const GLOW_OPACITY: f64 = 0.25;
const NAME_SIZE: f64 = 12.0;
const SPEED_SIZE: f64 = 10.0;

/// Line style for a connection.
///
/// Width grows with `log10(max + 1)` up to a 2–8 unit band and is
/// modulated by usage; opacity runs 0.6–1.0 by usage. Disabled links are
/// a faint grey.
pub fn connection_style(connection: &Connection) -> StrokeStyle {
    if !connection.enabled {
        return StrokeStyle {
            color: CONNECTION_DISABLED.with_alpha(DISABLED_OPACITY),
            width: MIN_THICKNESS,
        };
    }
    let load = connection.load;
    let scale = ((load.max_kbps.max(0.0) + 1.0).log10() / 6.0).clamp(0.0, 1.0);
    let ratio = load.usage_ratio.clamp(0.0, 1.0);
    StrokeStyle {
        color: usage_color(ratio).with_alpha(0.6 + 0.4 * ratio),
        width: MIN_THICKNESS + THICKNESS_RANGE * scale * (0.5 + 0.5 * ratio),
    }
}

/// Draw one frame.
pub fn render<S: Surface + ?Sized>(
    topology: &Topology,
    particles: &ParticleField,
    icons: &IconSet,
    surface: &mut S,
) {
    surface.clear(BACKGROUND);

    let paths: Vec<Option<OrthogonalPath>> = topology
        .connections()
        .iter()
        .map(|c| {
            topology
                .endpoints(c)
                .map(|(from, to)| OrthogonalPath::route(from.position, to.position))
        })
        .collect();

    // ── Connections ──
    for (connection, path) in topology.connections().iter().zip(&paths) {
        let Some(path) = path else { continue };
        let mut points = path.points().iter();
        let Some(&start) = points.next() else { continue };
        surface.begin_path();
        surface.move_to(start);
        for &p in points {
            surface.line_to(p);
        }
        surface.stroke(&connection_style(connection));
    }

    // ── Particles ──
    for particle in particles.particles() {
        let Some(connection) = topology.connections().get(particle.connection) else {
            continue;
        };
        let Some(Some(path)) = paths.get(particle.connection) else {
            continue;
        };
        if !connection.enabled {
            continue;
        }
        let at = path.point_at_offset(particle.progress, particle.lateral_offset);
        let color = usage_color(connection.load.usage_ratio);
        surface.fill_circle(
            at,
            particle.size * GLOW_SCALE,
            color.with_alpha(particle.opacity * GLOW_OPACITY),
        );
        surface.fill_circle(at, particle.size, color.with_alpha(particle.opacity));
    }

    // ── Devices ──
    for device in topology.devices() {
        draw_device(device, icons, surface);
    }
}

fn draw_device<S: Surface + ?Sized>(device: &Device, icons: &IconSet, surface: &mut S) {
    let rect = Rect::centered(device.position, device.size);
    match icons.get(device.kind) {
        Some(icon) => surface.draw_image(icon, rect),
        None => {
            let alpha = if device.enabled { 1.0 } else { 0.4 };
            surface.fill_rounded_rect(
                rect,
                device.size * 0.2,
                device_color(device.kind).with_alpha(alpha),
            );
        }
    }

    let x = device.position.x;
    let below = device.position.y + device.size / 2.0;
    let label = |color: Color, size: f64, bold: bool| TextStyle {
        color,
        size,
        align: TextAlign::Center,
        bold,
    };

    surface.fill_text(
        &device.name,
        Point::new(x, below + NAME_SIZE + 2.0),
        &label(LABEL, NAME_SIZE, true),
    );
    surface.fill_text(
        &format!("↓ {}", device.download),
        Point::new(x, below + NAME_SIZE + SPEED_SIZE + 6.0),
        &label(DOWNLOAD, SPEED_SIZE, false),
    );
    surface.fill_text(
        &format!("↑ {}", device.upload),
        Point::new(x, below + NAME_SIZE + 2.0 * SPEED_SIZE + 10.0),
        &label(UPLOAD, SPEED_SIZE, false),
    );
}

/// Outline a device, e.g. the host's current selection.
pub fn highlight<S: Surface + ?Sized>(device: &Device, color: Color, surface: &mut S) {
    let pad = 4.0;
    let rect = Rect::centered(device.position, device.size + 2.0 * pad);
    let corners = [
        Point::new(rect.x, rect.y),
        Point::new(rect.x + rect.width, rect.y),
        Point::new(rect.x + rect.width, rect.y + rect.height),
        Point::new(rect.x, rect.y + rect.height),
        Point::new(rect.x, rect.y),
    ];
    surface.begin_path();
    surface.move_to(corners[0]);
    for &p in &corners[1..] {
        surface.line_to(p);
    }
    surface.stroke(&StrokeStyle { color, width: 1.0 });
    surface.fill_text(
        &device.subtitle,
        Point::new(device.position.x, rect.y - 4.0),
        &TextStyle {
            color: SUBTITLE,
            size: SPEED_SIZE,
            align: TextAlign::Center,
            bold: false,
        },
    );
}
