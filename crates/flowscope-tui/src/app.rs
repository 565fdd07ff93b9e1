//! Application core: event loop, action dispatch, background task wiring.

use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use flowscope_api::ApplianceClient;
use flowscope_core::{Engine, EngineConfig, IdentityResolver, NoLookup, RefreshLoop};

use crate::action::Action;
use crate::canvas::pixel_size;
use crate::component::Component;
use crate::data_bridge;
use crate::event::{Event, EventReader};
use crate::screens::TopologyScreen;
use crate::tui::Tui;

/// ~30 FPS.
const RENDER_RATE: Duration = Duration::from_millis(33);
/// Longest simulation step per frame; a stalled terminal does not teleport particles.
const MAX_FRAME_STEP: Duration = Duration::from_millis(250);
const OUTCOME_BUFFER: usize = 4;

pub struct App {
    screen: TopologyScreen,
    client: ApplianceClient,
    config: EngineConfig,
    refresh: Option<RefreshLoop>,
    running: bool,
    last_frame: Option<Instant>,
    /// Stops the bridge tasks.
    cancel: CancellationToken,
    action_tx: mpsc::UnboundedSender<Action>,
    action_rx: mpsc::UnboundedReceiver<Action>,
}

impl App {
    pub fn new(client: ApplianceClient, config: EngineConfig) -> Self {
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        let (width, height) = pixel_size(80, 24);
        let engine = Engine::new(width, height, &config);

        Self {
            screen: TopologyScreen::new(engine, config.refresh_interval),
            client,
            config,
            refresh: None,
            running: true,
            last_frame: None,
            cancel: CancellationToken::new(),
            action_tx,
            action_rx,
        }
    }

    /// Start the refresh loop, its bridge, and icon loading.
    fn start_background(&mut self) {
        let (tx, rx) = mpsc::channel(OUTCOME_BUFFER);
        let period = self.config.refresh_interval;
        let client = self.client.clone();

        let refresh = if self.config.identity_lookup {
            let resolver = Arc::new(IdentityResolver::new(client.clone()));
            RefreshLoop::spawn(client, resolver, period, tx)
        } else {
            info!("client identity lookups disabled");
            RefreshLoop::spawn(client, Arc::new(IdentityResolver::new(NoLookup)), period, tx)
        };
        self.refresh = Some(refresh);

        tokio::spawn(data_bridge::forward_outcomes(
            rx,
            self.action_tx.clone(),
            self.cancel.clone(),
        ));

        if let Some(dir) = self.screen.engine().icon_dir().cloned() {
            info!(dir = %dir.display(), "loading device icons");
            tokio::spawn(data_bridge::load_icons(dir, self.action_tx.clone()));
        }
    }

    /// Run until the user quits.
    pub async fn run(&mut self) -> Result<()> {
        let mut tui = Tui::new()?;
        tui.enter()?;
        self.screen.fit(tui.area()?);
        self.start_background();

        let mut events = EventReader::new(RENDER_RATE);
        info!("event loop started");

        while self.running {
            let Some(event) = events.next().await else {
                break;
            };

            match event {
                Event::Key(key) => {
                    if let Some(action) = self.handle_key_event(key)? {
                        self.action_tx.send(action)?;
                    }
                }
                Event::Resize(w, h) => self.action_tx.send(Action::Resize(w, h))?,
                Event::Render => self.action_tx.send(Action::Render)?,
            }

            while let Ok(action) = self.action_rx.try_recv() {
                if let Action::Render = action {
                    self.draw_frame(&mut tui)?;
                } else {
                    self.process_action(action)?;
                }
            }
        }

        events.stop();
        tui.exit();
        self.shutdown().await;
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        match (key.modifiers, key.code) {
            (KeyModifiers::CONTROL, KeyCode::Char('c'))
            | (KeyModifiers::NONE, KeyCode::Char('q')) => Ok(Some(Action::Quit)),
            _ => self.screen.handle_key_event(key),
        }
    }

    fn process_action(&mut self, action: Action) -> Result<()> {
        match action {
            Action::Quit => self.running = false,

            Action::Resize(w, h) => debug!(cols = w, rows = h, "terminal resized"),

            Action::RefreshNow => {
                if let Some(refresh) = &self.refresh {
                    refresh.refresh_now();
                }
            }

            Action::TogglePause => {
                if let Some(refresh) = &self.refresh {
                    let paused = !refresh.is_paused();
                    refresh.set_paused(paused);
                    self.screen.set_paused(paused);
                }
            }

            other => {
                if let Some(follow_up) = self.screen.update(other)? {
                    self.action_tx.send(follow_up)?;
                }
            }
        }
        Ok(())
    }

    /// Step the animation by the wall time since the last frame, then draw.
    fn draw_frame(&mut self, tui: &mut Tui) -> Result<()> {
        let now = Instant::now();
        let dt = self
            .last_frame
            .map_or(Duration::ZERO, |last| now.saturating_duration_since(last))
            .min(MAX_FRAME_STEP);
        self.last_frame = Some(now);

        self.screen.fit(tui.area()?);
        self.screen.tick(dt);

        let screen = &self.screen;
        tui.draw(|frame| screen.render(frame, frame.area()))
    }

    async fn shutdown(&mut self) {
        self.screen.engine_mut().teardown();
        self.cancel.cancel();
        if let Some(refresh) = self.refresh.take() {
            refresh.shutdown().await;
        }
        info!("dashboard stopped");
    }
}
