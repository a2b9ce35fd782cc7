use std::{io, time::Duration};

use chrono::{NaiveDateTime, TimeDelta};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Line as CanvasLine, Points},
        Block, BorderType, Borders, Paragraph,
    },
    Frame, Terminal,
};

use crate::store::Sample;
use crate::util::{format_optional_rate, format_rate, format_views};

const VIEWS_COLOR: Color = Color::Blue;
const RATE_COLOR: Color = Color::Red;
const AXIS_WIDTH: u16 = 10;
const EVENT_POLL_MS: u64 = 250;

/// A log prepared for drawing: x is seconds since the first sample, y is
/// normalized into `0.0..=1.0` per axis so both series share one canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    pub title: String,
    pub start: NaiveDateTime,
    pub span_secs: f64,
    pub views: Vec<(f64, f64)>,
    /// Consecutive runs of known rates; a missing rate breaks the line.
    pub rate_runs: Vec<Vec<(f64, f64)>>,
    pub views_bounds: [f64; 2],
    pub rate_bounds: Option<[f64; 2]>,
    pub latest_views: u64,
    pub latest_rate: Option<f64>,
    pub peak_rate: Option<(f64, NaiveDateTime)>,
}

impl ChartData {
    pub fn new(title: impl Into<String>, samples: &[Sample]) -> Option<Self> {
        let first = samples.first()?;
        let last = samples.last()?;
        let start = first.timestamp;
        let x = |s: &Sample| (s.timestamp - start).num_seconds() as f64;

        let views_bounds = padded_bounds(samples.iter().map(|s| s.views as f64))?;
        let rate_bounds = padded_bounds(samples.iter().filter_map(|s| s.rate));

        let views = samples
            .iter()
            .map(|s| (x(s), normalize(s.views as f64, views_bounds)))
            .collect();

        let mut rate_runs = Vec::new();
        if let Some(bounds) = rate_bounds {
            let mut run = Vec::new();
            for s in samples {
                match s.rate {
                    Some(r) => run.push((x(s), normalize(r, bounds))),
                    None if !run.is_empty() => rate_runs.push(std::mem::take(&mut run)),
                    None => {}
                }
            }
            if !run.is_empty() {
                rate_runs.push(run);
            }
        }

        let peak_rate = samples
            .iter()
            .filter_map(|s| s.rate.map(|r| (r, s.timestamp)))
            .fold(None, |peak: Option<(f64, NaiveDateTime)>, cur| match peak {
                Some(p) if p.0 >= cur.0 => Some(p),
                _ => Some(cur),
            });

        Some(Self {
            title: title.into(),
            start,
            span_secs: x(last).max(1.0),
            views,
            rate_runs,
            views_bounds,
            rate_bounds,
            latest_views: last.views,
            latest_rate: last.rate,
            peak_rate,
        })
    }

    fn time_at(&self, fraction: f64) -> NaiveDateTime {
        self.start + TimeDelta::seconds((self.span_secs * fraction).round() as i64)
    }
}

// widened when flat
fn padded_bounds(values: impl Iterator<Item = f64>) -> Option<[f64; 2]> {
    let (lo, hi) = values.fold(None, |acc: Option<(f64, f64)>, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })?;
    if hi > lo {
        Some([lo, hi])
    } else {
        Some([lo - 1.0, hi + 1.0])
    }
}

fn normalize(value: f64, [lo, hi]: [f64; 2]) -> f64 {
    (value - lo) / (hi - lo)
}

pub fn show(chart: &ChartData) -> io::Result<()> {
    enable_raw_mode()?;
    with_cleanup(
        || {
            execute!(io::stdout(), EnterAlternateScreen)?;
            let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
            let res = run_chart_loop(&mut terminal, chart);
            terminal.show_cursor()?;
            res
        },
        // Cleanup, whichever step above failed
        || {
            disable_raw_mode()?;
            execute!(io::stdout(), LeaveAlternateScreen)
        },
    )
}

// Runs `cleanup` after `body` no matter how `body` ended; the body's error wins.
fn with_cleanup<T>(
    body: impl FnOnce() -> io::Result<T>,
    cleanup: impl FnOnce() -> io::Result<()>,
) -> io::Result<T> {
    let res = body();
    let cleaned = cleanup();
    let value = res?;
    cleaned?;
    Ok(value)
}

fn run_chart_loop<B: Backend>(terminal: &mut Terminal<B>, chart: &ChartData) -> io::Result<()> {
    loop {
        terminal.draw(|f| draw(f, chart))?;

        if event::poll(Duration::from_millis(EVENT_POLL_MS))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                let ctrl_c = key.code == KeyCode::Char('c')
                    && key.modifiers.contains(KeyModifiers::CONTROL);
                if ctrl_c || matches!(key.code, KeyCode::Char('q') | KeyCode::Esc | KeyCode::Enter) {
                    return Ok(());
                }
            }
        }
    }
}

pub fn draw(f: &mut Frame, chart: &ChartData) {
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(8),    // Chart box
            Constraint::Length(1), // Bottom status bar
        ])
        .split(f.size());

    let chart_block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", chart.title))
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Cyan));
    f.render_widget(chart_block.clone(), main_chunks[0]);
    let inner = chart_block.inner(main_chunks[0]);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // axis titles
            Constraint::Min(3),    // plot
            Constraint::Length(1), // time labels
        ])
        .split(inner);
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(AXIS_WIDTH),
            Constraint::Min(10),
            Constraint::Length(AXIS_WIDTH),
        ])
        .split(rows[1]);

    let axis_titles = Line::from(vec![
        Span::styled("Views", Style::default().fg(VIEWS_COLOR).add_modifier(Modifier::BOLD)),
        Span::raw("  vs  "),
        Span::styled(
            "Rate of Increase (views/min)",
            Style::default().fg(RATE_COLOR).add_modifier(Modifier::BOLD),
        ),
    ]);
    f.render_widget(Paragraph::new(axis_titles).alignment(Alignment::Center), rows[0]);

    draw_axis(
        f,
        cols[0],
        Some(chart.views_bounds),
        format_views,
        VIEWS_COLOR,
        Alignment::Right,
    );
    draw_axis(
        f,
        cols[2],
        chart.rate_bounds,
        format_rate,
        RATE_COLOR,
        Alignment::Left,
    );

    let canvas = Canvas::default()
        .block(Block::default().borders(Borders::LEFT | Borders::RIGHT | Borders::BOTTOM))
        .marker(Marker::Braille)
        .x_bounds([0.0, chart.span_secs])
        .y_bounds([0.0, 1.0])
        .paint(|ctx| {
            for pair in chart.views.windows(2) {
                ctx.draw(&CanvasLine {
                    x1: pair[0].0,
                    y1: pair[0].1,
                    x2: pair[1].0,
                    y2: pair[1].1,
                    color: VIEWS_COLOR,
                });
            }
            ctx.draw(&Points {
                coords: &chart.views,
                color: VIEWS_COLOR,
            });
            ctx.layer();
            for run in &chart.rate_runs {
                for pair in run.windows(2) {
                    ctx.draw(&CanvasLine {
                        x1: pair[0].0,
                        y1: pair[0].1,
                        x2: pair[1].0,
                        y2: pair[1].1,
                        color: RATE_COLOR,
                    });
                }
                ctx.draw(&Points {
                    coords: run,
                    color: RATE_COLOR,
                });
            }
        });
    f.render_widget(canvas, cols[1]);

    draw_time_axis(f, rows[2], chart);
    draw_status_bar(f, main_chunks[1], chart);
}

// Top, middle and bottom tick labels for one y axis
fn draw_axis(
    f: &mut Frame,
    area: Rect,
    bounds: Option<[f64; 2]>,
    format: fn(f64) -> String,
    color: Color,
    alignment: Alignment,
) {
    if area.height == 0 {
        return;
    }
    let mut lines = vec![Line::raw(""); area.height as usize];
    let last = lines.len() - 1;
    match bounds {
        Some([lo, hi]) => {
            lines[0] = Line::raw(format(hi));
            lines[last / 2] = Line::raw(format((lo + hi) / 2.0));
            lines[last] = Line::raw(format(lo));
        }
        None => lines[last / 2] = Line::raw("-"),
    }
    let axis = Paragraph::new(lines)
        .alignment(alignment)
        .style(Style::default().fg(color));
    f.render_widget(axis, area);
}

fn draw_time_axis(f: &mut Frame, area: Rect, chart: &ChartData) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(AXIS_WIDTH),
            Constraint::Min(10),
            Constraint::Length(AXIS_WIDTH),
        ])
        .split(area);
    let thirds = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(cols[1]);

    let label = |fraction: f64| chart.time_at(fraction).format("%m-%d %H:%M").to_string();
    let style = Style::default().fg(Color::DarkGray);
    for (area, fraction, alignment) in [
        (thirds[0], 0.0, Alignment::Left),
        (thirds[1], 0.5, Alignment::Center),
        (thirds[2], 1.0, Alignment::Right),
    ] {
        f.render_widget(
            Paragraph::new(label(fraction)).alignment(alignment).style(style),
            area,
        );
    }
}

fn draw_status_bar(f: &mut Frame, area: Rect, chart: &ChartData) {
    let peak = match chart.peak_rate {
        Some((rate, at)) => format!("{} (@{})", format_rate(rate), at.format("%m-%d %H:%M")),
        None => "-".to_string(),
    };
    let status_content = Line::from(vec![
        Span::styled(
            " LATEST ",
            Style::default().bg(Color::White).fg(Color::Black).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::styled("VIEWS: ", Style::default().fg(VIEWS_COLOR).add_modifier(Modifier::BOLD)),
        Span::raw(format!("{} ", chart.latest_views)),
        Span::raw(" | "),
        Span::styled("RATE: ", Style::default().fg(RATE_COLOR).add_modifier(Modifier::BOLD)),
        Span::raw(format_optional_rate(chart.latest_rate)),
        Span::raw(" | "),
        Span::styled("PEAK RATE: ", Style::default().fg(RATE_COLOR).add_modifier(Modifier::BOLD)),
        Span::raw(peak),
        Span::raw(" | Press 'q' to continue"),
    ]);

    let status_bar = Paragraph::new(status_content).style(Style::default().bg(Color::Rgb(20, 20, 20)));
    f.render_widget(status_bar, area);
}
