//! Every state change in the dashboard is expressed as an [`Action`].

use flowscope_core::{CoreError, DeviceKind, Icon, RefreshOutcome};

#[derive(Debug)]
pub enum Action {
    // ── Lifecycle ──────────────────────────────────────────────────
    Quit,
    Render,
    Resize(u16, u16),

    // ── Refresh control ───────────────────────────────────────────
    RefreshNow,
    TogglePause,

    // ── Animation ─────────────────────────────────────────────────
    SpeedUp,
    SpeedDown,

    // ── Selection ─────────────────────────────────────────────────
    SelectNext,
    SelectPrev,
    ClearSelection,

    // ── Data (from background tasks) ──────────────────────────────
    Refreshed(RefreshOutcome),
    IconLoaded(DeviceKind, Result<Icon, CoreError>),
}
