//! Slate palette and semantic styles for the dashboard chrome.
//!
//! The topology scene itself is colored by `flowscope_core::render::palette`;
//! these are the colors around it.

use ratatui::style::{Color, Modifier, Style};

// ── Core Palette ──────────────────────────────────────────────────────

pub const SKY: Color = Color::Rgb(56, 189, 248); // #38bdf8
pub const VIOLET: Color = Color::Rgb(167, 139, 250); // #a78bfa
pub const AMBER: Color = Color::Rgb(255, 165, 2); // #ffa502
pub const SUCCESS_GREEN: Color = Color::Rgb(46, 213, 115); // #2ed573
pub const ERROR_RED: Color = Color::Rgb(255, 71, 87); // #ff4757
pub const UPLOAD_BLUE: Color = Color::Rgb(30, 144, 255); // #1e90ff

// ── Extended Palette ──────────────────────────────────────────────────

pub const TEXT: Color = Color::Rgb(248, 250, 252); // #f8fafc
pub const DIM_TEXT: Color = Color::Rgb(148, 163, 184); // #94a3b8
pub const BORDER_GRAY: Color = Color::Rgb(71, 85, 105); // #475569
pub const BG_DARK: Color = Color::Rgb(15, 23, 42); // #0f172a

// ── Semantic Styles ───────────────────────────────────────────────────

pub fn title_style() -> Style {
    Style::default().fg(SKY).add_modifier(Modifier::BOLD)
}

pub fn border_default() -> Style {
    Style::default().fg(BORDER_GRAY)
}

pub fn border_error() -> Style {
    Style::default().fg(ERROR_RED)
}

/// Field label in the details panel.
pub fn label() -> Style {
    Style::default().fg(DIM_TEXT)
}

pub fn value() -> Style {
    Style::default().fg(TEXT)
}

pub fn key_hint() -> Style {
    Style::default().fg(DIM_TEXT)
}

pub fn key_hint_key() -> Style {
    Style::default().fg(SKY).add_modifier(Modifier::BOLD)
}
