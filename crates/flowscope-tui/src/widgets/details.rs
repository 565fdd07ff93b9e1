//! Details panel for the selected device.

use flowscope_core::format::{format_bytes, format_percent};
use flowscope_core::{Device, DeviceKind};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};

use crate::theme;

fn field(label: &str, value: impl Into<String>) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!(" {label:<12}"), theme::label()),
        Span::styled(value.into(), theme::value()),
    ])
}

/// Panel body for `device`.
pub fn details_lines(device: &Device) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(Span::styled(
            format!(" {}", device.name),
            theme::title_style().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(format!(" {}", device.subtitle), theme::label())),
        Line::from(""),
        field("Type", device.kind.key()),
        Line::from(vec![
            Span::styled(format!(" {:<12}", "Download"), theme::label()),
            Span::styled(
                format!("↓ {}", device.download),
                Style::default().fg(theme::SUCCESS_GREEN),
            ),
        ]),
        Line::from(vec![
            Span::styled(format!(" {:<12}", "Upload"), theme::label()),
            Span::styled(
                format!("↑ {}", device.upload),
                Style::default().fg(theme::UPLOAD_BLUE),
            ),
        ]),
    ];

    let meta = &device.metadata;
    match device.kind {
        DeviceKind::LoadBalancer => {
            let state = if device.enabled { "enabled" } else { "disabled" };
            lines.push(field("Status", state));
            if let Some(iface) = &meta.interface {
                lines.push(field("Interface", iface.clone()));
            }
            if let Some(ratio) = meta.contention_ratio {
                lines.push(field("Contention", ratio.to_string()));
            }
            lines.push(field("Connections", meta.connections.to_string()));
            if let Some(rate) = meta.success_rate {
                lines.push(field("Success", format_percent(rate)));
            }
        }
        DeviceKind::Client(_) => {
            lines.push(field("Connections", meta.connections.to_string()));
            lines.push(field("Active", meta.active_connections.to_string()));
            if let Some(lb) = &meta.assigned_lb {
                lines.push(field("Via", lb.clone()));
            }
        }
        DeviceKind::Gateway => {
            lines.push(field("Active", meta.active_connections.to_string()));
        }
        DeviceKind::Isp => {}
    }
    if let Some((received, sent)) = meta.transferred {
        lines.push(field("Received", format_bytes(received)));
        lines.push(field("Sent", format_bytes(sent)));
    }
    lines
}

/// Panel body when nothing is selected.
pub fn placeholder_lines() -> Vec<Line<'static>> {
    vec![
        Line::from(""),
        Line::from(vec![
            Span::styled(" Tab", theme::key_hint_key()),
            Span::styled(" to select a device", theme::key_hint()),
        ]),
    ]
}
