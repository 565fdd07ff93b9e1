// ── Engine ──
//
// Owns everything the render loop reads: the current topology, its
// particles, icons and the animation speed. Refresh outcomes arrive from
// the background loop and are applied here, on the host's UI task, so
// nothing in the engine needs a lock. The topology is replaced wholesale
// behind an `Arc`; a frame either sees the old graph or the new one.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::{EngineConfig, clamp_speed};
use crate::error::CoreError;
use crate::layout::Layout;
use crate::model::{DeviceKind, Topology};
use crate::particles::ParticleField;
use crate::refresh::{RefreshOutcome, Snapshot};
use crate::render::{Icon, IconSet, Surface};
use crate::topology::build;

/// What [`Engine::apply`] did with an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// New snapshot; topology and particles rebuilt.
    Rebuilt,
    /// Failed cycle; previous topology kept.
    Failed,
    /// Superseded or arrived after teardown; ignored.
    Discarded,
}

/// Data freshness, for status lines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadStatus<'a> {
    /// Nothing received yet.
    Loading,
    /// Showing the latest snapshot.
    Live { updated: Instant },
    /// Showing an older snapshot because the latest cycle failed.
    Stale {
        updated: Instant,
        error: &'a CoreError,
    },
    /// No snapshot has ever loaded.
    Failed { error: &'a CoreError },
}

#[derive(Debug)]
pub struct Engine {
    layout: Layout,
    topology: Arc<Topology>,
    particles: ParticleField,
    snapshot: Option<Arc<Snapshot>>,
    icons: IconSet,
    icon_dir: Option<PathBuf>,
    speed: f64,
    last_generation: u64,
    last_success: Option<Instant>,
    last_error: Option<CoreError>,
}

impl Engine {
    /// Engine for a `width` × `height` surface.
    pub fn new(width: f64, height: f64, config: &EngineConfig) -> Self {
        let icons = if config.icon_dir.is_some() {
            IconSet::new()
        } else {
            IconSet::disabled()
        };
        Self {
            layout: Layout::new(width, height),
            topology: Arc::new(Topology::default()),
            particles: ParticleField::new(),
            snapshot: None,
            icons,
            icon_dir: config.icon_dir.clone(),
            speed: clamp_speed(config.animation_speed),
            last_generation: 0,
            last_success: None,
            last_error: None,
        }
    }

    /// Swap in a particle field, e.g. a seeded one.
    pub fn with_particles(mut self, particles: ParticleField) -> Self {
        self.particles = particles;
        self.particles.initialize(&self.topology);
        self
    }

    // ── Refresh ──────────────────────────────────────────────────────

    /// Apply one refresh outcome.
    ///
    /// Outcomes not newer than the last applied generation are dropped.
    /// A failure keeps the current topology and particles untouched.
    pub fn apply(&mut self, outcome: RefreshOutcome) -> Applied {
        if outcome.generation <= self.last_generation {
            debug!(
                generation = outcome.generation,
                current = self.last_generation,
                "discarding superseded refresh outcome"
            );
            return Applied::Discarded;
        }
        self.last_generation = outcome.generation;

        match outcome.result {
            Ok(snapshot) => {
                let first = self.last_success.is_none();
                self.snapshot = Some(Arc::new(snapshot));
                self.rebuild();
                self.last_success = Some(Instant::now());
                self.last_error = None;
                if first {
                    info!(
                        devices = self.topology.devices().len(),
                        connections = self.topology.connections().len(),
                        "initial topology loaded"
                    );
                }
                Applied::Rebuilt
            }
            Err(error) => {
                self.last_error = Some(error);
                Applied::Failed
            }
        }
    }

    /// Stop accepting outcomes and drop all state.
    pub fn teardown(&mut self) {
        self.last_generation = u64::MAX;
        self.snapshot = None;
        self.topology = Arc::new(Topology::default());
        self.particles.clear();
        info!("engine torn down");
    }

    #[cfg(test)]
    pub(crate) fn is_torn_down(&self) -> bool {
        self.last_generation == u64::MAX
    }

    // ── Frame ────────────────────────────────────────────────────────

    /// Re-layout for a new surface size. Returns `false` if nothing changed.
    pub fn resize(&mut self, width: f64, height: f64) -> bool {
        let layout = Layout::new(width, height);
        if layout == self.layout {
            return false;
        }
        self.layout = layout;
        self.rebuild();
        debug!(width, height, "engine resized");
        true
    }

    /// Step the particle simulation by `dt` of wall time.
    pub fn advance(&mut self, dt: Duration) {
        self.particles.advance(dt, self.speed);
    }

    /// Draw the current frame.
    pub fn render<S: Surface + ?Sized>(&self, surface: &mut S) {
        crate::render::render(&self.topology, &self.particles, &self.icons, surface);
    }

    // ── Icons ────────────────────────────────────────────────────────

    pub fn icon_dir(&self) -> Option<&PathBuf> {
        self.icon_dir.as_ref()
    }

    /// Record one icon load result.
    pub fn apply_icon(&mut self, kind: DeviceKind, result: Result<Icon, CoreError>) {
        self.icons.apply(kind, result);
    }

    pub fn icons(&self) -> &IconSet {
        &self.icons
    }

    // ── Speed ────────────────────────────────────────────────────────

    /// Set the animation multiplier, clamped to the supported range.
    pub fn set_speed(&mut self, speed: f64) -> f64 {
        self.speed = clamp_speed(speed);
        self.speed
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    // ── State ────────────────────────────────────────────────────────

    pub fn topology(&self) -> &Arc<Topology> {
        &self.topology
    }

    pub fn particles(&self) -> &ParticleField {
        &self.particles
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn snapshot(&self) -> Option<&Arc<Snapshot>> {
        self.snapshot.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.last_generation
    }

    /// The error to show full-screen: only while nothing has ever loaded.
    pub fn error_view(&self) -> Option<&CoreError> {
        if self.last_success.is_some() {
            None
        } else {
            self.last_error.as_ref()
        }
    }

    pub fn status(&self) -> LoadStatus<'_> {
        match (self.last_success, self.last_error.as_ref()) {
            (None, None) => LoadStatus::Loading,
            (None, Some(error)) => LoadStatus::Failed { error },
            (Some(updated), None) => LoadStatus::Live { updated },
            (Some(updated), Some(error)) => LoadStatus::Stale { updated, error },
        }
    }

    fn rebuild(&mut self) {
        let Some(snapshot) = &self.snapshot else {
            return;
        };
        self.topology = Arc::new(build(
            &snapshot.config,
            &snapshot.stats,
            &snapshot.identities,
            &self.layout,
        ));
        self.particles.initialize(&self.topology);
    }
}
