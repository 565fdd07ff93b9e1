// ── Device icons ──
//
// Icons are small glyph-art files, one per device kind, named after the
// kind's key (`laptop.txt`, `load-balancer.txt`, ...). They load in the
// background; until a kind's icon arrives the renderer draws the colored
// fallback shape. A kind whose icon failed to load keeps the fallback for
// the rest of the session.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::DeviceKind;

/// Glyph-art image: rows of characters, top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icon {
    rows: Vec<String>,
}

impl Icon {
    /// Parse icon text. Trailing blank lines are dropped; an icon with no
    /// visible glyphs is rejected.
    pub fn parse(text: &str) -> Option<Self> {
        let mut rows: Vec<String> = text.lines().map(|l| l.trim_end().to_owned()).collect();
        while rows.last().is_some_and(String::is_empty) {
            rows.pop();
        }
        if rows.iter().all(|r| r.trim().is_empty()) {
            return None;
        }
        Some(Self { rows })
    }

    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    /// Widest row, in characters.
    pub fn width(&self) -> usize {
        self.rows.iter().map(|r| r.chars().count()).max().unwrap_or(0)
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }
}

/// Load status of one kind's icon.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum IconState {
    #[default]
    Pending,
    Loaded(Icon),
    Failed,
}

/// Per-kind icon cache.
#[derive(Debug, Clone, Default)]
pub struct IconSet {
    states: HashMap<DeviceKind, IconState>,
}

impl IconSet {
    /// Every kind pending.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every kind permanently on its fallback shape.
    pub fn disabled() -> Self {
        Self {
            states: DeviceKind::all().map(|k| (k, IconState::Failed)).collect(),
        }
    }

    pub fn state(&self, kind: DeviceKind) -> &IconState {
        static PENDING: IconState = IconState::Pending;
        self.states.get(&kind).unwrap_or(&PENDING)
    }

    /// The loaded icon for `kind`, if any.
    pub fn get(&self, kind: DeviceKind) -> Option<&Icon> {
        match self.state(kind) {
            IconState::Loaded(icon) => Some(icon),
            IconState::Pending | IconState::Failed => None,
        }
    }

    /// Record a load result. Only pending kinds change state.
    pub fn apply(&mut self, kind: DeviceKind, result: Result<Icon, CoreError>) {
        let state = self.states.entry(kind).or_default();
        if *state != IconState::Pending {
            return;
        }
        *state = match result {
            Ok(icon) => IconState::Loaded(icon),
            Err(e) => {
                debug!(kind = %kind, error = %e, "icon unavailable, using fallback shape");
                IconState::Failed
            }
        };
    }

    #[cfg(test)]
    pub(crate) fn loaded_count(&self) -> usize {
        self.states
            .values()
            .filter(|s| matches!(s, IconState::Loaded(_)))
            .count()
    }
}

/// Path of `kind`'s icon inside `dir`.
pub fn icon_path(dir: &Path, kind: DeviceKind) -> PathBuf {
    dir.join(format!("{}.txt", kind.key()))
}

/// Read and parse one icon.
pub async fn load_icon(dir: &Path, kind: DeviceKind) -> Result<Icon, CoreError> {
    let path = icon_path(dir, kind);
    let text = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| CoreError::Icon {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
    Icon::parse(&text).ok_or_else(|| CoreError::Icon {
        path: path.display().to_string(),
        message: "no glyphs".into(),
    })
}

/// Load every kind's icon from `dir` concurrently.
pub async fn load_all(dir: &Path) -> Vec<(DeviceKind, Result<Icon, CoreError>)> {
    let loads = DeviceKind::all().map(|kind| async move { (kind, load_icon(dir, kind).await) });
    let results = futures::future::join_all(loads).await;
    let loaded = results.iter().filter(|(_, r)| r.is_ok()).count();
    if loaded == 0 {
        warn!(dir = %dir.display(), "no device icons found");
    } else {
        debug!(dir = %dir.display(), loaded, "device icons loaded");
    }
    results
}
