use std::{
    io::{self, Stdout, Write},
    panic,
    time::Duration,
};

use anyhow::Result;
use citycast_core::{
    Config, Dispatcher, Event, NavKey, Widget, WidgetState,
    clock::{self, ClockTicker},
    present::{ClockColor, Readings, snapshot_icon},
    provider::{forecast_source_from_config, geocoder_from_config, http_client},
};
use crossterm::{
    cursor,
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event as TermEvent, KeyCode, KeyEvent,
        KeyEventKind, KeyModifiers, MouseButton, MouseEventKind,
    },
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    prelude::*,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::info;

const PLACEHOLDER: &str = "Search for a city";
const FRAME: Duration = Duration::from_millis(33);

pub async fn run(config: &Config) -> Result<()> {
    let http = http_client(config)?;
    let geocoder = geocoder_from_config(config, http.clone());
    let forecasts = forecast_source_from_config(config, http);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let dispatcher = Dispatcher::new(geocoder, forecasts, tx.clone());
    let mut widget = Widget::new(config.default_location(), config.stale_policy());

    info!(
        location = %widget.state().location.label,
        policy = ?widget.policy(),
        "widget starting"
    );

    dispatcher.dispatch(widget.mount());
    let ticker = ClockTicker::start(tx, clock::TICK);

    let mut terminal = setup_terminal()?;
    let result = event_loop(&mut terminal, &dispatcher, &mut widget, &mut rx).await;

    ticker.stop().await;
    restore_terminal(&mut terminal)?;
    info!("widget stopped");
    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    dispatcher: &Dispatcher,
    widget: &mut Widget,
    rx: &mut UnboundedReceiver<Event>,
) -> Result<()> {
    let mut hits = HitAreas::default();

    loop {
        // Results from finished requests and clock ticks
        while let Ok(event) = rx.try_recv() {
            dispatcher.apply(widget, event);
        }

        terminal.draw(|f| hits = draw(f, widget.state()))?;

        if !event::poll(FRAME)? {
            continue;
        }
        match event::read()? {
            TermEvent::Key(key) if key.kind == KeyEventKind::Press => {
                match translate_key(key, &widget.state().input) {
                    Input::Quit => return Ok(()),
                    Input::Widget(event) => dispatcher.apply(widget, event),
                    Input::Ignored => {}
                }
            }
            TermEvent::Mouse(mouse) if mouse.kind == MouseEventKind::Down(MouseButton::Left) => {
                if let Some(event) = hits.event_at(mouse.column, mouse.row) {
                    dispatcher.apply(widget, event);
                }
            }
            _ => {}
        }
    }
}

#[derive(Debug, PartialEq)]
enum Input {
    Quit,
    Widget(Event),
    Ignored,
}

/// Map a key press onto a widget event, given the text currently in the box.
fn translate_key(key: KeyEvent, input: &str) -> Input {
    match key.code {
        KeyCode::Esc => Input::Quit,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Input::Quit,
        KeyCode::Enter => Input::Widget(Event::Key(NavKey::Enter)),
        KeyCode::Down => Input::Widget(Event::Key(NavKey::Down)),
        KeyCode::Up => Input::Widget(Event::Key(NavKey::Up)),
        KeyCode::Backspace => {
            let mut text = input.to_string();
            if text.pop().is_none() {
                return Input::Ignored;
            }
            Input::Widget(Event::InputChanged(text))
        }
        KeyCode::Char(c)
            if !key
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            let mut text = input.to_string();
            text.push(c);
            Input::Widget(Event::InputChanged(text))
        }
        _ => Input::Ignored,
    }
}

/// Clickable regions from the last frame.
#[derive(Debug, Default, Clone, Copy)]
struct HitAreas {
    search_button: Rect,
    /// Inner area of the suggestion list, one row per entry.
    suggestions: Rect,
    suggestion_count: usize,
}

impl HitAreas {
    fn event_at(&self, column: u16, row: u16) -> Option<Event> {
        if contains(self.search_button, column, row) {
            return Some(Event::SearchClicked);
        }
        if contains(self.suggestions, column, row) {
            let index = usize::from(row - self.suggestions.y);
            if index < self.suggestion_count {
                return Some(Event::SuggestionClicked(index));
            }
        }
        None
    }
}

fn contains(area: Rect, column: u16, row: u16) -> bool {
    column >= area.x
        && column < area.x.saturating_add(area.width)
        && row >= area.y
        && row < area.y.saturating_add(area.height)
}

fn draw(f: &mut Frame, state: &WidgetState) -> HitAreas {
    let list_height = if state.suggestions.is_empty() {
        0
    } else {
        u16::try_from(state.suggestions.len()).unwrap_or(u16::MAX).saturating_add(2)
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(list_height),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(f.area());

    render_clock(f, rows[0], state);
    let search_button = render_search_bar(f, rows[1], state);
    let suggestions = render_suggestions(f, rows[2], state);
    render_weather(f, rows[3], state);
    render_notice(f, rows[4], state);

    HitAreas {
        search_button,
        suggestions,
        suggestion_count: state.suggestions.len(),
    }
}

fn clock_style(color: ClockColor) -> Style {
    let (r, g, b) = color.rgb();
    Style::default()
        .fg(Color::Rgb(r, g, b))
        .add_modifier(Modifier::BOLD)
}

fn render_clock(f: &mut Frame, area: Rect, state: &WidgetState) {
    f.render_widget(
        Paragraph::new(state.current_time.as_str())
            .style(clock_style(state.clock_color))
            .alignment(Alignment::Center),
        area,
    );
}

/// Returns the button area for click handling.
fn render_search_bar(f: &mut Frame, area: Rect, state: &WidgetState) -> Rect {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(10), Constraint::Length(10)])
        .split(area);

    let block = Block::default().borders(Borders::ALL).title(" city ");
    let inner = block.inner(cols[0]);
    let text = if state.input.is_empty() {
        Line::from(Span::styled(
            PLACEHOLDER,
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Line::from(state.input.as_str())
    };
    f.render_widget(Paragraph::new(text).block(block), cols[0]);

    let typed = u16::try_from(state.input.chars().count()).unwrap_or(u16::MAX);
    let cursor_x = inner.x.saturating_add(typed).min(inner.right().saturating_sub(1));
    f.set_cursor_position((cursor_x, inner.y));

    f.render_widget(
        Paragraph::new("Search")
            .alignment(Alignment::Center)
            .style(Style::default().add_modifier(Modifier::BOLD))
            .block(Block::default().borders(Borders::ALL)),
        cols[1],
    );

    cols[1]
}

/// Returns the inner list area for click handling.
fn render_suggestions(f: &mut Frame, area: Rect, state: &WidgetState) -> Rect {
    if state.suggestions.is_empty() || area.height == 0 {
        return Rect::default();
    }

    let items: Vec<ListItem> = state
        .suggestions
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let style = if state.active_suggestion == Some(i) {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            ListItem::new(name.as_str()).style(style)
        })
        .collect();

    let block = Block::default().borders(Borders::ALL);
    let inner = block.inner(area);
    f.render_widget(List::new(items).block(block), area);
    inner
}

fn render_weather(f: &mut Frame, area: Rect, state: &WidgetState) {
    let block = Block::default().borders(Borders::ALL);

    if state.loading {
        f.render_widget(
            Paragraph::new("Loading...")
                .style(Style::default().fg(Color::Yellow))
                .block(block),
            area,
        );
        return;
    }

    let Some(forecast) = &state.forecast else {
        f.render_widget(
            Paragraph::new("No weather data available.").block(block),
            area,
        );
        return;
    };

    let readings = Readings::from_forecast(forecast);
    let mut lines = vec![
        Line::from(Span::styled(
            readings.temperature_text(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(state.location.label.as_str()),
    ];
    if let Some(icon) = snapshot_icon(Some(forecast)) {
        lines.push(Line::from(format!("{} {}", icon.glyph(), icon.label())));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(format!(
        "Precipitation {}    Wind {}",
        readings.precipitation_text(),
        readings.wind_text()
    )));
    if let Some(updated) = forecast.updated_at() {
        lines.push(Line::from(Span::styled(
            format!(
                "updated {}",
                updated.with_timezone(&chrono::Local).format("%H:%M")
            ),
            Style::default().fg(Color::DarkGray),
        )));
    }

    f.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(block),
        area,
    );
}

fn render_notice(f: &mut Frame, area: Rect, state: &WidgetState) {
    let line = match &state.notice {
        Some(notice) => Line::from(Span::styled(
            notice.as_str(),
            Style::default().fg(Color::Red),
        )),
        None => Line::from(Span::styled(
            "Enter search · ↑/↓ pick · Esc quit",
            Style::default().fg(Color::DarkGray),
        )),
    };
    f.render_widget(Paragraph::new(line), area);
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    terminal::enable_raw_mode()?;
    let mut out = io::stdout();
    if let Err(e) = execute!(out, EnterAlternateScreen, EnableMouseCapture) {
        let _ = leave_screen(&mut out);
        let _ = terminal::disable_raw_mode();
        return Err(e.into());
    }
    install_panic_hook();
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

/// Put the terminal back before the default hook prints the panic message.
fn install_panic_hook() {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let _ = leave_screen(&mut io::stdout());
        let _ = terminal::disable_raw_mode();
        previous(info);
    }));
}

fn leave_screen(out: &mut impl Write) -> io::Result<()> {
    execute!(out, DisableMouseCapture, cursor::Show, LeaveAlternateScreen)
}

fn restore_terminal(term: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    leave_screen(&mut io::stdout())?;
    terminal::disable_raw_mode()?;
    term.show_cursor()?;
    Ok(())
}
