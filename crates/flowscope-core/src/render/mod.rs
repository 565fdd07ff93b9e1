//! Host-agnostic rendering.
//!
//! The engine draws through [`Surface`], a minimal 2D drawing context.
//! Hosts implement it over whatever they paint on (a terminal canvas, an
//! image buffer, a recorder in tests).

pub mod icons;
pub mod palette;
pub mod scene;

pub use icons::{Icon, IconSet, IconState};
pub use scene::{connection_style, render};

use crate::geometry::Point;

/// RGB color with a float alpha in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Same color at a different opacity, clamped to `[0, 1]`.
    pub fn with_alpha(self, a: f64) -> Self {
        Self {
            a: if a.is_finite() { a.clamp(0.0, 1.0) } else { 0.0 },
            ..self
        }
    }

    /// Composite over an opaque `background`.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::as_conversions
    )]
    pub fn blend_over(self, background: Self) -> Self {
        let mix = |fg: u8, bg: u8| {
            let v = f64::from(fg) * self.a + f64::from(bg) * (1.0 - self.a);
            v.round().clamp(0.0, 255.0) as u8
        };
        Self::rgb(
            mix(self.r, background.r),
            mix(self.g, background.g),
            mix(self.b, background.b),
        )
    }
}

/// Axis-aligned rectangle; `(x, y)` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Square of side `size` centered on `center`.
    pub fn centered(center: Point, size: f64) -> Self {
        Self {
            x: center.x - size / 2.0,
            y: center.y - size / 2.0,
            width: size,
            height: size,
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    pub color: Color,
    pub width: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub color: Color,
    /// Font size in surface units.
    pub size: f64,
    pub align: TextAlign,
    pub bold: bool,
}

/// Minimal 2D drawing context.
///
/// Coordinates are surface units with the origin top-left and y growing
/// downward. Paths are built with `begin_path`/`move_to`/`line_to` and
/// drawn by `stroke`.
pub trait Surface {
    /// Current `(width, height)`.
    fn size(&self) -> (f64, f64);

    fn clear(&mut self, color: Color);

    fn begin_path(&mut self);

    fn move_to(&mut self, p: Point);

    fn line_to(&mut self, p: Point);

    fn stroke(&mut self, style: &StrokeStyle);

    fn fill_circle(&mut self, center: Point, radius: f64, color: Color);

    fn fill_rect(&mut self, rect: Rect, color: Color);

    fn fill_rounded_rect(&mut self, rect: Rect, radius: f64, color: Color);

    fn draw_image(&mut self, icon: &Icon, rect: Rect);

    /// Draw one line of text anchored at `at` according to `style.align`.
    fn fill_text(&mut self, text: &str, at: Point, style: &TextStyle);
}
