mod tui_app;

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, List, ListItem, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use tui_app::{
    format_change, format_hit_ratio, format_hours, format_percent, format_rupees, truncate, AppState,
    ConnectionStatus,
};

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> io::Result<()> {
    let base_url = std::env::var("API_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .map_err(io::Error::other)?;

    let mut app = AppState::new(base_url);

    // Initial fetch before rendering
    app.refresh(&client).await;

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut board_table_state = TableState::default();
    board_table_state.select(if app.board.entries.is_empty() { None } else { Some(0) });

    let result = run_loop(&mut terminal, &mut app, &client, &mut board_table_state).await;

    // Restore terminal regardless of result
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
    client: &reqwest::Client,
    board_state: &mut TableState,
) -> io::Result<()> {
    let refresh_interval = Duration::from_secs(2);
    let mut last_tick = std::time::Instant::now();

    loop {
        terminal.draw(|f| render(f, app, board_state))?;

        let timeout = refresh_interval
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(()),
                        KeyCode::Char('r') | KeyCode::Char('R') => {
                            app.refresh(client).await;
                            last_tick = std::time::Instant::now();
                        }
                        KeyCode::Down | KeyCode::Char('j') => {
                            let max = app.board.entries.len().saturating_sub(1);
                            let next = board_state.selected().map_or(0, |i| (i + 1).min(max));
                            board_state.select(Some(next));
                        }
                        KeyCode::Up | KeyCode::Char('k') => {
                            let prev = board_state
                                .selected()
                                .map_or(0, |i| i.saturating_sub(1));
                            board_state.select(Some(prev));
                        }
                        _ => {}
                    }
                }
            }
        }

        if last_tick.elapsed() >= refresh_interval {
            app.refresh(client).await;
            if board_state.selected().is_none() && !app.board.entries.is_empty() {
                board_state.select(Some(0));
            }
            last_tick = std::time::Instant::now();
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render(f: &mut Frame, app: &AppState, board_state: &mut TableState) {
    let area = f.area();

    // Outer vertical split: header | kpis | body | footer
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Length(3), // kpis
            Constraint::Min(0),    // body
            Constraint::Length(1), // footer
        ])
        .split(area);

    render_header(f, app, chunks[0]);
    render_kpis(f, app, chunks[1]);
    render_body(f, app, board_state, chunks[2]);
    render_footer(f, chunks[3]);
}

fn render_header(f: &mut Frame, app: &AppState, area: Rect) {
    let (status_text, status_color) = match &app.status {
        ConnectionStatus::Connected => ("● connected".to_string(), Color::Green),
        ConnectionStatus::Connecting => ("◌ connecting".to_string(), Color::Yellow),
        ConnectionStatus::Error(e) => (format!("✗ {}", truncate(e, 40)), Color::Red),
    };

    let generated = app
        .board
        .generated_at
        .as_deref()
        .and_then(|t| t.get(11..19))
        .map_or("—".to_string(), |t| format!("board @ {t}"));

    let title_spans = vec![
        Span::styled(
            " Matchday Insights  ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(status_text, Style::default().fg(status_color)),
        Span::raw("  │  "),
        Span::styled(generated, Style::default().fg(Color::White)),
        Span::raw("  │  "),
        Span::styled(
            format!("{} polls", app.health.board_cycles.unwrap_or(0)),
            Style::default().fg(Color::White),
        ),
        Span::raw("  │  "),
        Span::styled(
            format!("cache hit {}", format_hit_ratio(app.health.cache_hits, app.health.cache_misses)),
            Style::default().fg(Color::White),
        ),
        Span::raw("  │  "),
        Span::styled(
            format!("{} notified", app.health.notifications_dispatched.unwrap_or(0)),
            Style::default().fg(Color::White),
        ),
    ];

    let paragraph = Paragraph::new(Line::from(title_spans))
        .block(Block::default().borders(Borders::ALL).border_style(
            Style::default().fg(Color::DarkGray),
        ));

    f.render_widget(paragraph, area);
}

fn render_kpis(f: &mut Frame, app: &AppState, area: Rect) {
    let label = Style::default().fg(Color::DarkGray);
    let value = Style::default().fg(Color::White).add_modifier(Modifier::BOLD);

    let line = match &app.metrics {
        Some(m) => Line::from(vec![
            Span::styled(" revenue ", label),
            Span::styled(format_rupees(m.total_revenue), value),
            Span::styled("  sold ", label),
            Span::styled(m.tickets_sold.to_string(), value),
            Span::styled("  avg ", label),
            Span::styled(format_rupees(m.average_ticket_price), value),
            Span::styled("  conv ", label),
            Span::styled(format!("{:.1}%", m.conversion_rate), value),
            Span::styled("  users ", label),
            Span::styled(m.active_users.to_string(), value),
            Span::styled("  bounce ", label),
            Span::styled(format!("{:.1}%", m.bounce_rate), value),
            Span::styled("  csat ", label),
            Span::styled(format!("{:.1}/5", m.customer_satisfaction), value),
        ]),
        None => Line::from(Span::styled(" waiting for dashboard metrics…", label)),
    };

    let paragraph = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(
                " KPIs ",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
    );
    f.render_widget(paragraph, area);
}

fn render_body(f: &mut Frame, app: &AppState, board_state: &mut TableState, area: Rect) {
    // Horizontal split: board (60%) | insights + notifications (40%)
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(halves[1]);

    render_board_table(f, app, board_state, halves[0]);
    render_insights(f, app, board_state.selected(), right[0]);
    render_notifications(f, app, right[1]);
}

fn render_board_table(f: &mut Frame, app: &AppState, state: &mut TableState, area: Rect) {
    let header_cells = ["Event", "Price", "Change", "Trend", "Kickoff", "Demand", "Left", "Sellout"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
    let header = Row::new(header_cells).height(1);

    let rows: Vec<Row> = app
        .board
        .entries
        .iter()
        .map(|e| {
            let change_color = match e.quote.direction.as_str() {
                "up" => Color::Red,
                "down" => Color::Green,
                _ => Color::White,
            };
            let demand_color = match e.demand.level.as_str() {
                "high" => Color::Red,
                "medium" => Color::Yellow,
                _ => Color::Green,
            };
            let price = match e.quote.original_amount {
                Some(base) if base != e.quote.current_amount => {
                    format!("{} ({})", format_rupees(e.quote.current_amount), format_rupees(base))
                }
                _ => format_rupees(e.quote.current_amount),
            };

            Row::new(vec![
                Cell::from(truncate(&e.title, 24)),
                Cell::from(price),
                Cell::from(format_change(&e.quote.direction, e.quote.percent_change))
                    .style(Style::default().fg(change_color)),
                Cell::from(e.quote.trend_label.clone()),
                Cell::from(format_hours(e.quote.hours_to_event)).style(Style::default().fg(Color::DarkGray)),
                Cell::from(format!("{} {}", e.demand.level, format_percent(e.demand.percent_sold)))
                    .style(Style::default().fg(demand_color)),
                Cell::from(e.demand.tickets_remaining.to_string()).style(Style::default().fg(Color::Cyan)),
                Cell::from(truncate(&e.demand.projected_sellout_text, 18)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Min(12),
            Constraint::Length(18),
            Constraint::Length(8),
            Constraint::Length(8),
            Constraint::Length(7),
            Constraint::Length(11),
            Constraint::Length(6),
            Constraint::Length(18),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(
                " EVENT BOARD ",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
    )
    .row_highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    );

    f.render_stateful_widget(table, area, state);
}

fn render_insights(f: &mut Frame, app: &AppState, selected: Option<usize>, area: Rect) {
    let (title, lines) = match app.selected_entry(selected) {
        Some(entry) if !entry.insights.is_empty() => {
            let lines: Vec<Line> = entry
                .insights
                .iter()
                .flat_map(|i| {
                    let color = if i.is_urgent { Color::Red } else { Color::Yellow };
                    [
                        Line::from(vec![
                            Span::styled(
                                format!("{} ", if i.is_urgent { "!" } else { "•" }),
                                Style::default().fg(color),
                            ),
                            Span::styled(i.title.clone(), Style::default().fg(color).add_modifier(Modifier::BOLD)),
                            Span::styled(
                                format!("  [{}] {}%", i.category, i.confidence_percent),
                                Style::default().fg(Color::DarkGray),
                            ),
                        ]),
                        Line::from(format!("  {}", i.message)),
                    ]
                })
                .collect();
            (format!(" INSIGHTS · {} ", entry.event_id), lines)
        }
        Some(entry) => (
            format!(" INSIGHTS · {} ", entry.event_id),
            vec![Line::from(Span::styled(" nothing notable", Style::default().fg(Color::DarkGray)))],
        ),
        None => (
            " INSIGHTS ".to_string(),
            vec![Line::from(Span::styled(" select an event", Style::default().fg(Color::DarkGray)))],
        ),
    };

    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(
                title,
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
    );
    f.render_widget(paragraph, area);
}

fn render_notifications(f: &mut Frame, app: &AppState, area: Rect) {
    let items: Vec<ListItem> = app
        .notifications
        .iter()
        .map(|n| {
            let color = match n.kind.as_str() {
                "booking_confirmed" => Color::Green,
                "price_drop" => Color::LightGreen,
                "match_reminder" => Color::Yellow,
                _ => Color::White,
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!("{} ", n.title), Style::default().fg(color)),
                Span::raw(n.body.clone()),
            ]))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(
                " NOTIFICATIONS ",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
    );
    f.render_widget(list, area);
}

fn render_footer(f: &mut Frame, area: Rect) {
    let line = Line::from(vec![
        Span::styled(" [q] ", Style::default().fg(Color::Yellow)),
        Span::raw("quit  "),
        Span::styled("[r] ", Style::default().fg(Color::Yellow)),
        Span::raw("refresh  "),
        Span::styled("[↑↓ / j k] ", Style::default().fg(Color::Yellow)),
        Span::raw("select event  "),
        Span::styled("auto-refresh: 2s", Style::default().fg(Color::DarkGray)),
    ]);
    let paragraph = Paragraph::new(line).style(Style::default().fg(Color::White));
    f.render_widget(paragraph, area);
}
