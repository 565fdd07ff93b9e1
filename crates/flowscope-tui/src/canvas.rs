//! [`Surface`] implementation over a ratatui braille [`Canvas`].
//!
//! The engine draws in virtual pixels where every terminal cell is
//! [`CELL_WIDTH`] × [`CELL_HEIGHT`]. Draw calls are recorded while the
//! engine renders and replayed when the canvas widget paints. A terminal
//! cell has no transparency, so colors are blended over the background at
//! record time. Text is snapped to cells; a label that would overlap an
//! earlier one on the same row is pushed down a row.

use flowscope_core::render::palette;
use flowscope_core::{Color, Icon, Point, Rect, StrokeStyle, Surface, TextAlign, TextStyle};
use ratatui::style::{Color as TermColor, Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::text::Line as TextLine;
use ratatui::widgets::canvas::{Canvas, Circle, Context, Line as CanvasLine, Points};

/// Virtual pixels per terminal column.
pub const CELL_WIDTH: f64 = 10.0;
/// Virtual pixels per terminal row.
pub const CELL_HEIGHT: f64 = 20.0;

/// One braille dot (2×4 dots per cell).
const DOT: f64 = 5.0;
const MAX_STROKE_LINES: usize = 3;
const MAX_LABEL_NUDGE: usize = 3;

#[derive(Debug, Clone, PartialEq)]
enum Op {
    Line {
        from: (f64, f64),
        to: (f64, f64),
        color: TermColor,
    },
    Dot {
        at: (f64, f64),
        color: TermColor,
    },
    Ring {
        at: (f64, f64),
        radius: f64,
        color: TermColor,
    },
    Text {
        at: (f64, f64),
        text: String,
        style: Style,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LabelSpan {
    row: i64,
    start: i64,
    end: i64,
}

/// One frame's worth of recorded drawing.
#[derive(Debug)]
pub struct CanvasSurface {
    cols: u16,
    rows: u16,
    width: f64,
    height: f64,
    background: Color,
    subpaths: Vec<Vec<Point>>,
    ops: Vec<Op>,
    labels: Vec<LabelSpan>,
}

/// Virtual pixel size of a `cols` × `rows` cell area.
pub fn pixel_size(cols: u16, rows: u16) -> (f64, f64) {
    (f64::from(cols) * CELL_WIDTH, f64::from(rows) * CELL_HEIGHT)
}

/// Parallel lines used to suggest a stroke of `width` virtual pixels.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::as_conversions
)]
pub fn stroke_lines(width: f64) -> usize {
    if !width.is_finite() || width <= 0.0 {
        return 1;
    }
    ((width / DOT).round() as usize).clamp(1, MAX_STROKE_LINES)
}

fn to_term(color: Color) -> TermColor {
    TermColor::Rgb(color.r, color.g, color.b)
}

impl CanvasSurface {
    pub fn new(cols: u16, rows: u16) -> Self {
        let (width, height) = pixel_size(cols, rows);
        Self {
            cols,
            rows,
            width,
            height,
            background: palette::BACKGROUND,
            subpaths: Vec::new(),
            ops: Vec::new(),
            labels: Vec::new(),
        }
    }

    /// The recorded frame as a widget.
    pub fn widget(&self) -> Canvas<'_, impl Fn(&mut Context<'_>) + '_> {
        Canvas::default()
            .marker(Marker::Braille)
            .background_color(to_term(self.background))
            .x_bounds([0.0, self.width])
            .y_bounds([0.0, self.height])
            .paint(move |ctx: &mut Context<'_>| self.replay(ctx))
    }

    fn replay(&self, ctx: &mut Context<'_>) {
        for op in &self.ops {
            match op {
                Op::Line { from, to, color } => {
                    ctx.draw(&CanvasLine::new(from.0, from.1, to.0, to.1, *color));
                }
                Op::Dot { at, color } => ctx.draw(&Points {
                    coords: &[*at],
                    color: *color,
                }),
                Op::Ring { at, radius, color } => ctx.draw(&Circle {
                    x: at.0,
                    y: at.1,
                    radius: *radius,
                    color: *color,
                }),
                Op::Text { at, text, style } => {
                    ctx.print(at.0, at.1, TextLine::styled(text.clone(), *style));
                }
            }
        }
    }

    fn paint(&self, color: Color) -> TermColor {
        to_term(color.blend_over(self.background))
    }

    /// Surface coordinates (y down) to canvas coordinates (y up).
    fn flip(&self, p: Point) -> (f64, f64) {
        (p.x, self.height - p.y)
    }

    /// Canvas coordinates that the widget maps back onto cell `(col, row)`.
    #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
    fn cell_anchor(&self, col: i64, row: i64) -> (f64, f64) {
        let x_step = self.width / f64::from(self.cols.saturating_sub(1).max(1));
        let y_step = self.height / f64::from(self.rows.saturating_sub(1).max(1));
        (
            (col as f64 + 0.5) * x_step,
            self.height - (row as f64 + 0.5) * y_step,
        )
    }

    fn push_line(&mut self, a: Point, b: Point, color: TermColor) {
        self.ops.push(Op::Line {
            from: self.flip(a),
            to: self.flip(b),
            color,
        });
    }

    /// Reserve a row for a label spanning `[start, end)` columns, starting
    /// at `row` and moving down while it collides.
    fn place_label(&mut self, mut row: i64, start: i64, end: i64) -> i64 {
        for _ in 0..MAX_LABEL_NUDGE {
            let taken = self
                .labels
                .iter()
                .any(|l| l.row == row && l.start < end && start < l.end);
            if !taken {
                break;
            }
            row += 1;
        }
        self.labels.push(LabelSpan { row, start, end });
        row
    }
}

impl Surface for CanvasSurface {
    fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    fn clear(&mut self, color: Color) {
        self.background = color.with_alpha(1.0);
        self.subpaths.clear();
        self.ops.clear();
        self.labels.clear();
    }

    fn begin_path(&mut self) {
        self.subpaths.clear();
    }

    fn move_to(&mut self, p: Point) {
        self.subpaths.push(vec![p]);
    }

    fn line_to(&mut self, p: Point) {
        match self.subpaths.last_mut() {
            Some(path) => path.push(p),
            None => self.subpaths.push(vec![p]),
        }
    }

    #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
    fn stroke(&mut self, style: &StrokeStyle) {
        let color = self.paint(style.color);
        let lines = stroke_lines(style.width);
        let spread = (lines - 1) as f64 / 2.0;
        for path in std::mem::take(&mut self.subpaths) {
            for pair in path.windows(2) {
                let [a, b] = pair else { continue };
                let len = a.distance(*b);
                if len <= f64::EPSILON {
                    continue;
                }
                let (nx, ny) = (-(b.y - a.y) / len, (b.x - a.x) / len);
                for k in 0..lines {
                    let off = (k as f64 - spread) * DOT;
                    self.push_line(
                        Point::new(a.x + nx * off, a.y + ny * off),
                        Point::new(b.x + nx * off, b.y + ny * off),
                        color,
                    );
                }
            }
        }
    }

    fn fill_circle(&mut self, center: Point, radius: f64, color: Color) {
        let color = self.paint(color);
        let at = self.flip(center);
        if radius <= DOT {
            self.ops.push(Op::Dot { at, color });
        } else {
            self.ops.push(Op::Ring { at, radius, color });
        }
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.fill_rounded_rect(rect, 0.0, color);
    }

    fn fill_rounded_rect(&mut self, rect: Rect, radius: f64, color: Color) {
        if !(rect.height.is_finite() && rect.width.is_finite()) || rect.height < 0.0 {
            return;
        }
        let color = self.paint(color);
        let r = radius.clamp(0.0, rect.width.min(rect.height).max(0.0) / 2.0);
        let (top, bottom) = (rect.y, rect.y + rect.height);
        let mut y = top;
        while y <= bottom {
            let dy = if y < top + r {
                top + r - y
            } else if y > bottom - r {
                y - (bottom - r)
            } else {
                0.0
            };
            let inset = r - (r * r - dy * dy).max(0.0).sqrt();
            self.push_line(
                Point::new(rect.x + inset, y),
                Point::new(rect.x + rect.width - inset, y),
                color,
            );
            y += DOT;
        }
    }

    #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
    fn draw_image(&mut self, icon: &Icon, rect: Rect) {
        let center = rect.center();
        let left = center.x - icon.width() as f64 * CELL_WIDTH / 2.0;
        let first = center.y - (icon.height().saturating_sub(1)) as f64 * CELL_HEIGHT / 2.0;
        let style = TextStyle {
            color: palette::LABEL,
            size: CELL_HEIGHT,
            align: TextAlign::Left,
            bold: false,
        };
        for (i, row) in icon.rows().iter().enumerate() {
            let y = first + i as f64 * CELL_HEIGHT;
            self.fill_text(row, Point::new(left, y), &style);
        }
    }

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::as_conversions
    )]
    fn fill_text(&mut self, text: &str, at: Point, style: &TextStyle) {
        if text.is_empty() || !(at.x.is_finite() && at.y.is_finite()) {
            return;
        }
        let chars = text.chars().count();
        let width = chars as f64 * CELL_WIDTH;
        let left = match style.align {
            TextAlign::Left => at.x,
            TextAlign::Center => at.x - width / 2.0,
            TextAlign::Right => at.x - width,
        };
        let col = (left / CELL_WIDTH).round() as i64;
        let row = (at.y / CELL_HEIGHT).floor() as i64;
        let end = col.saturating_add(i64::try_from(chars).unwrap_or(i64::MAX));
        let row = self.place_label(row, col, end);

        let mut term_style = Style::default().fg(self.paint(style.color));
        if style.bold {
            term_style = term_style.add_modifier(Modifier::BOLD);
        }
        self.ops.push(Op::Text {
            at: self.cell_anchor(col, row),
            text: text.to_owned(),
            style: term_style,
        });
    }
}
