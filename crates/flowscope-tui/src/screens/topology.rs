//! Topology screen: the live flow canvas plus summary, details and status.

use std::time::Duration;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap};
use tokio::time::Instant;
use tracing::{debug, info};

use flowscope_core::render::scene::highlight;
use flowscope_core::{Applied, Color, CoreError, Device, Engine, LoadStatus};

use crate::action::Action;
use crate::canvas::{CanvasSurface, pixel_size};
use crate::component::Component;
use crate::theme;
use crate::widgets::details::{details_lines, placeholder_lines};
use crate::widgets::status::{header_line, status_line};

const DETAILS_WIDTH: u16 = 34;
/// Narrower terminals give the whole body to the canvas.
const MIN_WIDTH_FOR_DETAILS: u16 = 90;
const SPEED_STEP: f64 = 2.0;
const SELECTION: Color = Color::rgb(56, 189, 248);

/// Where each part of the screen goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Regions {
    pub header: Rect,
    /// Bordered frame around the canvas.
    pub body: Rect,
    /// Drawable canvas inside `body`.
    pub canvas: Rect,
    pub details: Option<Rect>,
    pub status: Rect,
}

fn canvas_block() -> Block<'static> {
    Block::default()
        .title(" Topology ")
        .title_style(theme::title_style())
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme::border_default())
}

pub fn regions(area: Rect) -> Regions {
    let [header, middle, status] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(1),
        Constraint::Length(1),
    ])
    .areas(area);

    let (body, details) = if middle.width >= MIN_WIDTH_FOR_DETAILS {
        let [body, details] =
            Layout::horizontal([Constraint::Min(1), Constraint::Length(DETAILS_WIDTH)])
                .areas(middle);
        (body, Some(details))
    } else {
        (middle, None)
    };

    Regions {
        header,
        body,
        canvas: canvas_block().inner(body),
        details,
        status,
    }
}

/// Centered rectangle of at most `width` × `height` inside `area`.
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

fn error_hint(error: &CoreError) -> &'static str {
    match error {
        CoreError::AuthenticationFailed { .. } => {
            "Check appliance.username and the password in the config file."
        }
        CoreError::Unreachable { .. } | CoreError::Timeout => {
            "Is the appliance web UI running and reachable at the configured URL?"
        }
        CoreError::Status { .. } | CoreError::MalformedResponse { .. } => {
            "The appliance answered, but not with data this dashboard understands."
        }
        CoreError::Config { .. } => "Fix the configuration and restart.",
        CoreError::Icon { .. } => "",
    }
}

pub struct TopologyScreen {
    engine: Engine,
    /// Stable id of the selected device, kept across rebuilds.
    selected: Option<String>,
    paused: bool,
    interval: Duration,
}

impl TopologyScreen {
    pub fn new(engine: Engine, interval: Duration) -> Self {
        Self {
            engine,
            selected: None,
            paused: false,
            interval,
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Match the engine's surface to the canvas region of `area`.
    pub fn fit(&mut self, area: Rect) {
        let canvas = regions(area).canvas;
        let (width, height) = pixel_size(canvas.width, canvas.height);
        self.engine.resize(width, height);
    }

    pub fn tick(&mut self, dt: Duration) {
        self.engine.advance(dt);
    }

    pub fn selected_device(&self) -> Option<&Device> {
        let id = self.selected.as_deref()?;
        self.engine.topology().device(id)
    }

    fn step_selection(&mut self, forward: bool) {
        let devices = self.engine.topology().devices();
        let n = devices.len();
        if n == 0 {
            self.selected = None;
            return;
        }
        let current = self
            .selected
            .as_deref()
            .and_then(|id| devices.iter().position(|d| d.id == id));
        let next = match (current, forward) {
            (None, true) => 0,
            (None, false) => n - 1,
            (Some(i), true) => (i + 1) % n,
            (Some(i), false) => (i + n - 1) % n,
        };
        self.selected = devices.get(next).map(|d| d.id.clone());
    }

    fn change_speed(&mut self, factor: f64) {
        let speed = self.engine.set_speed(self.engine.speed() * factor);
        info!(speed, "animation speed changed");
    }

    fn render_canvas(&self, frame: &mut Frame, regions: &Regions) {
        frame.render_widget(canvas_block(), regions.body);

        let area = regions.canvas;
        let mut surface = CanvasSurface::new(area.width, area.height);
        self.engine.render(&mut surface);
        if let Some(device) = self.selected_device() {
            highlight(device, SELECTION, &mut surface);
        }
        frame.render_widget(surface.widget(), area);

        if self.engine.topology().is_empty() {
            let waiting = Paragraph::new(Line::from(Span::styled(
                "waiting for the first snapshot…",
                theme::key_hint(),
            )))
            .alignment(Alignment::Center);
            frame.render_widget(waiting, centered(area, area.width, 1));
        }
    }

    fn render_details(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(" Details ")
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_default());
        let lines = self
            .selected_device()
            .map_or_else(placeholder_lines, details_lines);
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn render_error(&self, frame: &mut Frame, area: Rect, error: &CoreError) {
        let block = Block::default()
            .title(" Cannot load topology ")
            .title_style(
                Style::default()
                    .fg(theme::ERROR_RED)
                    .add_modifier(Modifier::BOLD),
            )
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_error());

        let retry = if self.paused {
            "auto-refresh paused".to_owned()
        } else {
            format!("retrying every {}s", self.interval.as_secs())
        };
        let lines = vec![
            Line::from(""),
            Line::from(Span::styled(error.to_string(), theme::value())),
            Line::from(""),
            Line::from(Span::styled(error_hint(error), theme::label())),
            Line::from(""),
            Line::from(Span::styled(retry, theme::key_hint())),
            Line::from(vec![
                Span::styled("r", theme::key_hint_key()),
                Span::styled(" retry now  ", theme::key_hint()),
                Span::styled("q", theme::key_hint_key()),
                Span::styled(" quit", theme::key_hint()),
            ]),
        ];

        let popup = centered(area, 72, 11);
        frame.render_widget(Clear, popup);
        frame.render_widget(
            Paragraph::new(lines)
                .block(block)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true }),
            popup,
        );
    }
}

impl Component for TopologyScreen {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        let action = match (key.modifiers, key.code) {
            (_, KeyCode::Char('r')) => Action::RefreshNow,
            (_, KeyCode::Char('p')) => Action::TogglePause,
            (_, KeyCode::Char('+' | '=')) => Action::SpeedUp,
            (_, KeyCode::Char('-')) => Action::SpeedDown,
            (KeyModifiers::NONE, KeyCode::Tab) => Action::SelectNext,
            (_, KeyCode::BackTab) => Action::SelectPrev,
            (_, KeyCode::Esc) => Action::ClearSelection,
            _ => return Ok(None),
        };
        Ok(Some(action))
    }

    fn update(&mut self, action: Action) -> Result<Option<Action>> {
        match action {
            Action::SpeedUp => self.change_speed(SPEED_STEP),
            Action::SpeedDown => self.change_speed(1.0 / SPEED_STEP),
            Action::SelectNext => self.step_selection(true),
            Action::SelectPrev => self.step_selection(false),
            Action::ClearSelection => self.selected = None,
            Action::Refreshed(outcome) => {
                let generation = outcome.generation;
                let applied = self.engine.apply(outcome);
                debug!(generation, ?applied, "refresh outcome");
                if applied == Applied::Rebuilt && self.selected_device().is_none() {
                    self.selected = None;
                }
            }
            Action::IconLoaded(kind, result) => self.engine.apply_icon(kind, result),
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let regions = regions(area);
        let topology = self.engine.topology();

        frame.render_widget(Paragraph::new(header_line(&topology.summary())), regions.header);

        if let Some(error) = self.engine.error_view() {
            frame.render_widget(canvas_block(), regions.body);
            self.render_error(frame, regions.canvas, error);
        } else {
            self.render_canvas(frame, &regions);
        }

        if let Some(details) = regions.details {
            self.render_details(frame, details);
        }

        let status: LoadStatus<'_> = self.engine.status();
        frame.render_widget(
            Paragraph::new(status_line(
                status,
                self.paused,
                self.interval,
                self.engine.speed(),
                Instant::now(),
            )),
            regions.status,
        );
    }
}
