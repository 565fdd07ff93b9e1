//! Header summary and bottom status line.

use std::time::Duration;

use flowscope_core::format::format_rate;
use flowscope_core::{LoadStatus, TopologySummary};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use tokio::time::Instant;

use crate::theme;

/// Compact age ("4s", "2m 05s", "1h 12m").
pub fn fmt_age(age: Duration) -> String {
    let secs = age.as_secs();
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    if hours > 0 {
        format!("{hours}h {minutes:02}m")
    } else if minutes > 0 {
        format!("{minutes}m {seconds:02}s")
    } else {
        format!("{seconds}s")
    }
}

/// Top line: appliance-wide throughput and counts.
pub fn header_line(summary: &TopologySummary) -> Line<'static> {
    let sep = || Span::styled("  │  ", theme::key_hint());
    Line::from(vec![
        Span::styled(
            " flowscope",
            theme::title_style().add_modifier(Modifier::BOLD),
        ),
        sep(),
        Span::styled("⇅ ", theme::label()),
        Span::styled(format_rate(summary.total_bytes_per_sec), theme::value()),
        sep(),
        Span::styled(summary.active_connections.to_string(), theme::value()),
        Span::styled(" active connections", theme::label()),
        sep(),
        Span::styled(summary.load_balancers.to_string(), theme::value()),
        Span::styled(" load balancers", theme::label()),
        sep(),
        Span::styled(summary.clients.to_string(), theme::value()),
        Span::styled(" clients", theme::label()),
    ])
}

fn indicator(status: LoadStatus<'_>, now: Instant) -> Span<'static> {
    match status {
        LoadStatus::Loading => Span::styled("◐ loading", Style::default().fg(theme::AMBER)),
        LoadStatus::Live { updated } => Span::styled(
            format!(
                "● live · updated {} ago",
                fmt_age(now.saturating_duration_since(updated))
            ),
            Style::default().fg(theme::SUCCESS_GREEN),
        ),
        LoadStatus::Stale { updated, error } => Span::styled(
            format!(
                "◐ stale · updated {} ago · {error}",
                fmt_age(now.saturating_duration_since(updated))
            ),
            Style::default().fg(theme::AMBER),
        ),
        LoadStatus::Failed { error } => {
            Span::styled(format!("○ {error}"), Style::default().fg(theme::ERROR_RED))
        }
    }
}

/// Bottom line: data freshness, refresh mode, animation speed, key hints.
pub fn status_line(
    status: LoadStatus<'_>,
    paused: bool,
    interval: Duration,
    speed: f64,
    now: Instant,
) -> Line<'static> {
    let refresh = if paused {
        Span::styled("auto-refresh paused", Style::default().fg(theme::AMBER))
    } else {
        Span::styled(
            format!("every {}", fmt_age(interval)),
            theme::key_hint(),
        )
    };

    let mut spans = vec![
        Span::raw(" "),
        indicator(status, now),
        Span::styled(" │ ", theme::key_hint()),
        refresh,
        Span::styled(" │ ", theme::key_hint()),
        Span::styled(format!("speed {speed}×"), theme::value()),
        Span::styled(" │ ", theme::key_hint()),
    ];
    for (key, what) in [
        ("r", "refresh"),
        ("p", "pause"),
        ("+/-", "speed"),
        ("Tab", "select"),
        ("q", "quit"),
    ] {
        spans.push(Span::styled(key, theme::key_hint_key()));
        spans.push(Span::styled(format!(" {what}  "), theme::key_hint()));
    }
    Line::from(spans)
}
