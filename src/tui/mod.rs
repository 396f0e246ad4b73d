//! Ratatui-based terminal viewer.
//!
//! Shows the raw curve and every transform of the bank. The operator can
//! step through transforms, cycle the derivative order, nudge the Schwarz
//! exponent offset and export everything as a series bundle.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
};

use crate::app::pipeline::{BankEntry, analyze_bank, build_bundle};
use crate::chemistry::simulate_with;
use crate::domain::{Curve, DerivativeOrder, K_STEP, ResponseKind, TuiConfig, ViewerSource};
use crate::error::AppError;
use crate::io::{bundle::write_bundle_json, ingest::load_curve};
use crate::math::{DerivativeSet, analyze};

mod plotters_chart;

use plotters_chart::TitrationChart;

/// Start the viewer.
pub fn run(config: TuiConfig) -> Result<(), AppError> {
    // Load before touching the terminal so errors print normally.
    let mut app = App::new(config)?;

    let _guard = TerminalGuard::new()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal =
        Terminal::new(backend).map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

struct App {
    config: TuiConfig,
    source_label: String,
    kind: ResponseKind,
    raw: Curve,
    raw_derivatives: Option<DerivativeSet>,
    /// Equivalence volumes of a simulated source.
    landmarks: Vec<f64>,
    entries: Vec<BankEntry>,
    /// 0 is the raw curve, `i + 1` is `entries[i]`.
    selected: usize,
    order: DerivativeOrder,
    status: String,
}

impl App {
    fn new(config: TuiConfig) -> Result<Self, AppError> {
        let (source_label, kind, raw, landmarks) = match &config.source {
            ViewerSource::File { path, kind } => {
                let loaded = load_curve(path, *kind)?;
                (path.display().to_string(), *kind, loaded.curve, Vec::new())
            }
            ViewerSource::Simulated {
                chemistry,
                parameters,
                model,
            } => {
                let sim = simulate_with(parameters, *chemistry, *model)?;
                let mut landmarks = vec![sim.landmarks.first_equivalence_ml];
                landmarks.extend(sim.landmarks.second_equivalence_ml);
                (
                    format!("simulated {}", chemistry.display_name()),
                    ResponseKind::Ph,
                    sim.curve()?,
                    landmarks,
                )
            }
        };

        let raw_derivatives = analyze(&raw).ok();
        let entries = analyze_bank(&raw, config.initial_volume_ml, config.constants, config.fit_window)?;
        tracing::info!(source = %source_label, points = raw.len(), transforms = entries.len(), "viewer loaded");

        Ok(Self {
            config,
            source_label,
            kind,
            raw,
            raw_derivatives,
            landmarks,
            entries,
            selected: 0,
            order: DerivativeOrder::None,
            status: "Ready.".to_string(),
        })
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100)).map_err(|e| AppError::new(4, format!("Event poll error: {e}")))? {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the viewer should exit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected < self.entries.len() {
                    self.selected += 1;
                }
            }
            KeyCode::Char('d') => {
                self.order = self.order.next();
                self.status = format!("derivative: {:?}", self.order).to_lowercase();
            }
            KeyCode::Char('+') | KeyCode::Char('=') => self.adjust_k(K_STEP),
            KeyCode::Char('-') => self.adjust_k(-K_STEP),
            KeyCode::Char('e') => self.export(),
            _ => {}
        }
        false
    }

    fn adjust_k(&mut self, delta: f64) {
        let mut constants = self.config.constants;
        // Round to the step so repeated nudges do not drift.
        constants.exponent_offset = ((constants.exponent_offset + delta) / K_STEP).round() * K_STEP;

        match analyze_bank(&self.raw, self.config.initial_volume_ml, constants, self.config.fit_window) {
            Ok(entries) => {
                self.entries = entries;
                self.config.constants = constants;
                self.status = format!("Schwarz k = {:.2}", constants.exponent_offset);
            }
            Err(err) => {
                self.status = format!("k = {:.2} rejected: {err}", constants.exponent_offset);
            }
        }
    }

    fn export(&mut self) {
        let bundle = build_bundle(Some(self.source_label.clone()), &self.raw, self.kind, &self.entries);
        self.status = match write_bundle_json(&self.config.bundle_path, &bundle) {
            Ok(()) => format!("Wrote bundle: {}", self.config.bundle_path.display()),
            Err(err) => format!("Export failed: {err}"),
        };
    }

    fn selected_entry(&self) -> Option<&BankEntry> {
        self.selected.checked_sub(1).and_then(|i| self.entries.get(i))
    }

    fn selected_label(&self) -> String {
        match self.selected_entry() {
            Some(entry) => entry.transformed.spec.label(),
            None => "raw".to_string(),
        }
    }

    /// The curve currently on screen.
    fn shown_curve(&self) -> Curve {
        match self.selected_entry() {
            Some(entry) => entry.curve(self.order),
            None => match (self.order, &self.raw_derivatives) {
                (DerivativeOrder::First, Some(set)) => set.first.clone(),
                (DerivativeOrder::Second, Some(set)) => set.second.clone(),
                _ => self.raw.clone(),
            },
        }
    }

    fn shown_markers(&self) -> Vec<f64> {
        let mut markers = self.landmarks.clone();
        if self.order == DerivativeOrder::None {
            markers.extend(self.selected_entry().and_then(|e| e.fit).and_then(|f| f.x_intercept()));
        }
        markers
    }

    fn y_label(&self) -> String {
        let base = match self.selected_entry() {
            Some(entry) => entry.transformed.spec.index().display_name().to_string(),
            None => self.kind.axis_label().to_string(),
        };
        format!("{}{base}", self.order.prefix())
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut lines: Vec<Line> = Vec::new();
        lines.push(Line::from(vec![
            Span::styled("grantit", Style::default().fg(Color::Cyan)),
            Span::raw(format!(" - {}", self.source_label)),
        ]));

        let v = self.raw.volumes();
        lines.push(Line::from(Span::styled(
            format!(
                "n={} | V=[{:.2}, {:.2}] mL | V0={:.2} mL | k={:.2} s={:.2} | showing: {} ({})",
                self.raw.len(),
                v[0],
                v[v.len() - 1],
                self.config.initial_volume_ml,
                self.config.constants.exponent_offset,
                self.config.constants.divisor,
                self.selected_label(),
                format!("{:?}", self.order).to_lowercase(),
            ),
            Style::default().fg(Color::Gray),
        )));

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(36), Constraint::Min(0)])
            .split(area);

        self.draw_list(frame, chunks[0]);
        self.draw_chart(frame, chunks[1]);
    }

    fn draw_list(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut items = vec![ListItem::new(format!("raw ({})", self.kind.axis_label()))];
        for entry in &self.entries {
            let mut label = entry.transformed.spec.label();
            if !entry.transformed.warnings.is_empty() {
                label.push_str(" !");
            }
            items.push(ListItem::new(label));
        }

        let list = List::new(items)
            .block(Block::default().title("Transforms").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ListState::default();
        state.select(Some(self.selected));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title(self.selected_label()).borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let curve = self.shown_curve();
        let points = plottable_points(&curve);
        let Some((x_bounds, y_bounds)) = chart_bounds(&points) else {
            let msg = Paragraph::new("Nothing to plot (all values saturated).")
                .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
            frame.render_widget(msg, inner);
            return;
        };
        let markers = self.shown_markers();

        let widget = TitrationChart {
            line: &points,
            points: &points,
            markers: &markers,
            x_bounds,
            y_bounds,
            x_label: "V (mL)",
            y_label: self.y_label(),
            fmt_x: fmt_axis_x,
            fmt_y: fmt_axis_y,
        };
        frame.render_widget(widget, inner);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ select  d derivative  +/- Schwarz k  e export  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

/// Points with drawable responses; saturated transform values are dropped.
fn plottable_points(curve: &Curve) -> Vec<(f64, f64)> {
    curve
        .points()
        .filter(|(_, y)| y.is_finite() && y.abs() < f64::MAX)
        .collect()
}

/// Padded x/y bounds, or `None` when there is nothing to draw.
fn chart_bounds(points: &[(f64, f64)]) -> Option<([f64; 2], [f64; 2])> {
    let (first, last) = (points.first()?, points.last()?);
    let (x0, x1) = (first.0, last.0);
    if x1 <= x0 {
        return None;
    }

    let (mut y_min, mut y_max) = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(_, y)| (lo.min(y), hi.max(y)));
    if y_max <= y_min {
        // Flat series still needs a non-empty range.
        let half = (y_min.abs() * 0.5).max(1.0);
        y_min -= half;
        y_max += half;
    }
    let pad = ((y_max - y_min) * 0.05).max(1e-12);
    Some(([x0, x1], [y_min - pad, y_max + pad]))
}

fn fmt_axis_x(v: f64) -> String {
    format!("{v:.1}")
}

fn fmt_axis_y(v: f64) -> String {
    if v != 0.0 && (v.abs() >= 1e4 || v.abs() < 1e-2) {
        format!("{v:.1e}")
    } else {
        format!("{v:.2}")
    }
}
