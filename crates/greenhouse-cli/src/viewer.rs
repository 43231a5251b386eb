use std::io;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use crossterm::event::{self, Event, KeyCode};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use greenhouse_core::{Catalog, ControllerTransport, DashboardSnapshot, NodeView, Poller, Reading};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph};
use ratatui::Terminal;

pub fn format_reading(reading: &Reading) -> String {
    match reading {
        Reading::Number(value) => format!("{value:.1}"),
        Reading::Boolean(true) => "on".to_string(),
        Reading::Boolean(false) => "off".to_string(),
        Reading::Text(text) => text.clone(),
    }
}

pub(crate) fn catalog_color(name: &str) -> Color {
    match name {
        "purple" => Color::Magenta,
        "orange" => Color::LightRed,
        "teal" => Color::Cyan,
        "darkblue" => Color::Blue,
        other => other.parse().unwrap_or(Color::Gray),
    }
}

pub(crate) struct ChartSeries {
    pub(crate) label: String,
    pub(crate) color: Color,
    pub(crate) points: Vec<(f64, f64)>,
}

impl ChartSeries {
    pub(crate) fn bounds(series: &[ChartSeries]) -> [f64; 2] {
        let mut min = f64::MAX;
        let mut max = f64::MIN;
        for (_, y) in series.iter().flat_map(|s| s.points.iter()) {
            min = min.min(*y);
            max = max.max(*y);
        }
        if min > max {
            return [0.0, 1.0];
        }
        if (max - min).abs() < f64::EPSILON {
            [min - 1.0, max + 1.0]
        } else {
            let pad = (max - min) * 0.12;
            [min - pad, max + pad]
        }
    }

    pub(crate) fn x_min(series: &[ChartSeries]) -> f64 {
        series
            .iter()
            .flat_map(|s| s.points.first())
            .map(|(x, _)| *x)
            .fold(0.0, f64::min)
            .min(-1.0)
    }
}

struct ViewerState {
    node_idx: usize,
    signal_idx: usize,
    message: Option<String>,
    latest: Option<DashboardSnapshot>,
    history: Vec<ChartSeries>,
    comparison: Vec<ChartSeries>,
}

impl ViewerState {
    fn new() -> Self {
        Self {
            node_idx: 0,
            signal_idx: 0,
            message: None,
            latest: None,
            history: Vec::new(),
            comparison: Vec::new(),
        }
    }

    fn selected_node<'a>(&self, catalog: &'a Catalog) -> Option<&'a str> {
        let count = catalog.nodes.len();
        if count == 0 {
            return None;
        }
        catalog.nodes.keys().nth(self.node_idx % count).map(String::as_str)
    }

    fn selected_signal<'a>(&self, catalog: &'a Catalog) -> Option<&'a str> {
        let node = self.selected_node(catalog)?;
        let signals = catalog.signals_for(node);
        if signals.is_empty() {
            return None;
        }
        Some(signals[self.signal_idx % signals.len()])
    }

    async fn refresh<T: ControllerTransport>(&mut self, poller: &Poller<T>) {
        let catalog = poller.catalog().clone();
        let controller = poller.controller();
        let state = poller.state().await;
        let now = Utc::now();

        self.latest = Some(state.snapshot(&controller));
        self.history.clear();
        self.comparison.clear();

        let (Some(node), Some(signal)) = (self.selected_node(&catalog), self.selected_signal(&catalog)) else {
            return;
        };
        let signal_info = catalog.signals.get(signal);

        for (filter, info) in &catalog.filters {
            let points: Vec<(f64, f64)> = state
                .series(node, signal, filter)
                .iter()
                .map(|sample| (seconds_before(now, sample.ts), sample.value))
                .collect();

            if info.primary {
                self.history.push(ChartSeries {
                    label: signal_info
                        .map(|s| s.chart_title.clone())
                        .unwrap_or_else(|| signal.to_string()),
                    color: signal_info
                        .map(|s| catalog_color(&s.color))
                        .unwrap_or(Color::Gray),
                    points: points.clone(),
                });
            }
            self.comparison.push(ChartSeries {
                label: info.label.clone(),
                color: catalog_color(&info.color),
                points,
            });
        }
    }
}

fn seconds_before(now: DateTime<Utc>, ts: DateTime<Utc>) -> f64 {
    (ts - now).num_milliseconds() as f64 / 1000.0
}

pub async fn run_viewer<T: ControllerTransport>(poller: &mut Poller<T>) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let catalog = poller.catalog().clone();
    let mut state = ViewerState::new();
    poller.start();

    let run_result = async {
        loop {
            if event::poll(Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => break,
                        KeyCode::Tab | KeyCode::Char('n') => {
                            state.node_idx += 1;
                            state.signal_idx = 0;
                        }
                        KeyCode::Char('s') => state.signal_idx += 1,
                        KeyCode::Char('r') => {
                            poller.refresh_now().await;
                            state.message = Some("refreshed".to_string());
                        }
                        KeyCode::Char('p') => {
                            if poller.is_running() {
                                poller.stop();
                                state.message = Some("polling paused".to_string());
                            } else {
                                poller.start();
                                state.message = Some("polling resumed".to_string());
                            }
                        }
                        KeyCode::Char('x') => {
                            state.message = Some(match poller.reset_alarm().await {
                                Ok(()) => "alarm reset sent".to_string(),
                                Err(err) => format!("alarm reset failed: {err}"),
                            });
                        }
                        _ => {}
                    }
                }
            }

            state.refresh(poller).await;
            let running = poller.is_running();
            terminal.draw(|frame| draw_ui(frame.size(), frame, &state, &catalog, running))?;
        }

        Ok::<(), anyhow::Error>(())
    }
    .await;

    poller.stop();
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    run_result
}

fn draw_ui(area: Rect, frame: &mut ratatui::Frame<'_>, state: &ViewerState, catalog: &Catalog, running: bool) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Length(9),
            Constraint::Min(0),
        ])
        .split(area);

    frame.render_widget(render_header(state, running), rows[0]);

    let nodes = state.latest.as_ref().map(|s| s.nodes.as_slice()).unwrap_or(&[]);
    let node_cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(node_constraints(nodes.len()))
        .split(rows[1]);
    let selected = state.node_idx.checked_rem(catalog.nodes.len());
    for (idx, (node, col)) in nodes.iter().zip(node_cols.iter().copied()).enumerate() {
        frame.render_widget(render_node(node, selected == Some(idx)), col);
    }

    let chart_cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[2]);

    let node_label = state
        .selected_node(catalog)
        .and_then(|id| catalog.nodes.get(id).map(|n| n.name.clone()))
        .unwrap_or_else(|| "-".to_string());
    let unit = state
        .selected_signal(catalog)
        .and_then(|s| catalog.signals.get(s))
        .map(|s| s.unit.clone())
        .unwrap_or_default();

    render_chart(frame, chart_cols[0], &format!("{node_label}: history"), &unit, &state.history);
    render_chart(frame, chart_cols[1], &format!("{node_label}: filters"), &unit, &state.comparison);
}

/// One equal column per node panel, at least one so the row is still laid out.
pub(crate) fn node_constraints(count: usize) -> Vec<Constraint> {
    let count = u32::try_from(count.max(1)).unwrap_or(u32::MAX);
    vec![Constraint::Ratio(1, count); count as usize]
}

fn render_header(state: &ViewerState, running: bool) -> Paragraph<'static> {
    let mut lines = Vec::new();
    match &state.latest {
        Some(snapshot) => {
            let link = if snapshot.connected {
                Span::styled("connected", Style::default().fg(Color::Green))
            } else {
                Span::styled("disconnected", Style::default().fg(Color::Red))
            };
            let last = snapshot
                .last_update
                .map(|ts| ts.format("%H:%M:%S").to_string())
                .unwrap_or_else(|| "never".to_string());
            lines.push(Line::from(vec![
                Span::styled("Greenhouse Monitor  ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
                link,
                Span::raw(format!(
                    "  controller={} last_update={} polling={} ok/err={}/{}",
                    snapshot.controller,
                    last,
                    if running { "on" } else { "paused" },
                    snapshot.quality.data_ok,
                    snapshot.quality.data_err,
                )),
            ]));
            if snapshot.alarm {
                lines.push(Line::from(Span::styled(
                    "ALARM ACTIVE - press 'x' to reset",
                    Style::default().fg(Color::White).bg(Color::Red).add_modifier(Modifier::BOLD),
                )));
            } else {
                lines.push(Line::from("alarm: clear"));
            }
        }
        None => lines.push(Line::from("Waiting first snapshot...")),
    }
    lines.push(Line::from(format!(
        "q quit  tab node  s signal  r refresh  p pause  x reset alarm   {}",
        state.message.clone().unwrap_or_default()
    )));

    Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Status"))
}

fn render_node(node: &NodeView, selected: bool) -> Paragraph<'static> {
    let mut lines: Vec<Line> = node
        .readings
        .iter()
        .map(|(key, value)| Line::from(format!("{key}: {}", format_reading(value))))
        .collect();
    if lines.is_empty() {
        lines.push(Line::from(Span::styled("no data", Style::default().fg(Color::DarkGray))));
    }

    let border = if node.reachable { Color::Green } else { Color::Red };
    let mut title_style = Style::default().fg(border);
    if selected {
        title_style = title_style.add_modifier(Modifier::BOLD | Modifier::REVERSED);
    }

    Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(Span::styled(node.name.clone(), title_style)),
    )
}

fn render_chart(frame: &mut ratatui::Frame<'_>, area: Rect, title: &str, unit: &str, series: &[ChartSeries]) {
    let x_min = ChartSeries::x_min(series);
    let y_bounds = ChartSeries::bounds(series);

    let datasets: Vec<Dataset> = series
        .iter()
        .map(|s| {
            Dataset::default()
                .name(s.label.clone())
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(s.color))
                .data(&s.points)
        })
        .collect();

    let chart = Chart::new(datasets)
        .block(Block::default().borders(Borders::ALL).title(title.to_string()))
        .x_axis(
            Axis::default()
                .title("seconds ago")
                .style(Style::default().fg(Color::Gray))
                .bounds([x_min, 0.0])
                .labels(vec![
                    Span::raw(format!("{x_min:.0}")),
                    Span::raw(format!("{:.0}", x_min / 2.0)),
                    Span::raw("0"),
                ]),
        )
        .y_axis(
            Axis::default()
                .title(unit.to_string())
                .style(Style::default().fg(Color::Gray))
                .bounds(y_bounds)
                .labels(vec![
                    Span::raw(format!("{:.1}", y_bounds[0])),
                    Span::raw(format!("{:.1}", (y_bounds[0] + y_bounds[1]) / 2.0)),
                    Span::raw(format!("{:.1}", y_bounds[1])),
                ]),
        );

    frame.render_widget(chart, area);
}
