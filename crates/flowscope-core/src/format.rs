//! Human-readable rate and byte formatting helpers.
//!
//! Device speed labels are produced by [`format_rate`] and read back by
//! [`parse_rate_kbps`] when the particle simulator needs a number, so the
//! formatted label stays the single source of truth for "current speed".

/// Format a rate in bytes/sec as bits/sec with decimal units ("4.0 Mbps").
#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
pub fn format_rate(bytes_per_sec: u64) -> String {
    let bits = bytes_per_sec.saturating_mul(8);
    if bits >= 1_000_000_000 {
        format!("{:.1} Gbps", bits as f64 / 1_000_000_000.0)
    } else if bits >= 1_000_000 {
        format!("{:.1} Mbps", bits as f64 / 1_000_000.0)
    } else if bits >= 1_000 {
        format!("{:.1} Kbps", bits as f64 / 1_000.0)
    } else {
        format!("{bits} bps")
    }
}

/// Parse a label produced by [`format_rate`] back into Kbps.
///
/// Leading decoration (arrows, spaces) is skipped. Anything that does not
/// look like `<number> <unit>` parses as `0.0`.
pub fn parse_rate_kbps(label: &str) -> f64 {
    let trimmed = label.trim_start_matches(|c: char| !c.is_ascii_digit());
    let mut parts = trimmed.split_whitespace();
    let Some(value) = parts.next().and_then(|v| v.parse::<f64>().ok()) else {
        return 0.0;
    };
    let scale = match parts.next().map(str::to_ascii_lowercase).as_deref() {
        Some("bps") => 0.001,
        Some("kbps") => 1.0,
        Some("mbps") => 1_000.0,
        Some("gbps") => 1_000_000.0,
        _ => return 0.0,
    };
    let kbps = value * scale;
    if kbps.is_finite() && kbps > 0.0 { kbps } else { 0.0 }
}

/// Format a byte count with binary units ("0 B", "1.5 KB", "3.25 MB").
#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if bytes == 0 {
        return "0 B".into();
    }
    let mut exp = 0;
    let mut divisor = 1u64;
    while exp < UNITS.len() - 1 && bytes / divisor >= 1024 {
        divisor *= 1024;
        exp += 1;
    }
    let value = bytes as f64 / divisor as f64;
    let mut text = format!("{value:.2}");
    if text.contains('.') {
        text = text.trim_end_matches('0').trim_end_matches('.').to_owned();
    }
    format!("{text} {}", UNITS[exp])
}

/// Format a success percentage ("97.5%").
pub fn format_percent(pct: f64) -> String {
    format!("{:.1}%", pct.clamp(0.0, 100.0))
}
