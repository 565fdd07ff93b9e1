//! Deterministic layered placement.
//!
//! Four fixed columns (ISP, load balancers, gateway, clients). Single-device
//! layers sit at mid-height; multi-device layers are spread evenly around
//! the vertical center with a capped spacing.

use crate::geometry::Point;
use crate::model::Layer;

/// Column centers as fractions of the surface width, indexed by layer.
pub const LAYER_X: [f64; 4] = [0.12, 0.38, 0.62, 0.88];

/// Vertical room reserved for headers and labels above and below a column.
pub const VERTICAL_MARGIN: f64 = 200.0;

/// Maximum gap between stacked load balancers.
pub const LOAD_BALANCER_SPACING: f64 = 100.0;

/// Maximum gap between stacked clients.
pub const CLIENT_SPACING: f64 = 80.0;

/// Surface dimensions plus the placement rules derived from them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    width: f64,
    height: f64,
}

impl Layout {
    /// Negative or non-finite sizes are treated as zero.
    pub fn new(width: f64, height: f64) -> Self {
        let sane = |v: f64| if v.is_finite() { v.max(0.0) } else { 0.0 };
        Self {
            width: sane(width),
            height: sane(height),
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Horizontal center of a layer's column.
    pub fn layer_x(&self, layer: Layer) -> f64 {
        LAYER_X[layer.index()] * self.width
    }

    /// Position of a layer's single pinned device (ISP, gateway).
    pub fn anchor(&self, layer: Layer) -> Point {
        Point::new(self.layer_x(layer), self.height / 2.0)
    }

    /// Gap between `count` stacked devices, never more than `cap`.
    #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
    pub fn spacing(&self, count: usize, cap: f64) -> f64 {
        let gaps = count.saturating_sub(1).max(1) as f64;
        ((self.height - VERTICAL_MARGIN) / gaps).max(0.0).min(cap)
    }

    /// Centers for `count` devices stacked in `layer`, top to bottom,
    /// symmetric around mid-height.
    #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
    pub fn column(&self, layer: Layer, count: usize, cap: f64) -> Vec<Point> {
        let x = self.layer_x(layer);
        let spacing = self.spacing(count, cap);
        let top = self.height / 2.0 - spacing * count.saturating_sub(1) as f64 / 2.0;
        (0..count)
            .map(|i| Point::new(x, top + spacing * i as f64))
            .collect()
    }
}
