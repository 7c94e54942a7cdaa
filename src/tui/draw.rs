//! All drawing / rendering functions.

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, List, ListItem, Paragraph, Wrap};

use crate::format::{format_bytes, format_timestamp};
use crate::remote::Entry;

use super::app::{App, AppState, ViewItem};

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

const HELP: &str = "enter: open  ←/h: back  m: mark  d: download  c: copy link  o: play  r: retry  q: quit";

pub fn draw(frame: &mut Frame, app: &mut App) {
    let mut constraints = Vec::new();
    if app.overlays.title {
        constraints.push(Constraint::Length(1));
    }
    constraints.push(Constraint::Min(3));
    if app.overlays.status {
        constraints.push(Constraint::Length(1));
    }
    if app.overlays.help {
        constraints.push(Constraint::Length(2));
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(frame.area());
    let mut next = 0;

    if app.overlays.title {
        draw_title(frame, app, chunks[next]);
        next += 1;
    }

    let body = chunks[next];
    next += 1;
    match app.state {
        AppState::Loading => draw_loading(frame, app, body),
        AppState::Ready => draw_folder(frame, app, body),
        AppState::Downloading => draw_downloading(frame, app, body),
        AppState::Error => draw_error(frame, app, body),
        AppState::Empty => draw_empty(frame, app, body),
    }

    if app.overlays.status {
        draw_status(frame, app, chunks[next]);
        next += 1;
    }

    if app.overlays.help {
        let help = Paragraph::new(HELP)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(help, chunks[next]);
    }
}

fn spinner(app: &App) -> &'static str {
    if app.overlays.spinner {
        SPINNER[app.spinner_frame % SPINNER.len()]
    } else {
        " "
    }
}

fn draw_title(frame: &mut Frame, app: &App, area: Rect) {
    let line = Line::from(vec![
        Span::styled(
            " seedr-dl ",
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(app.stack.path(), Style::default().fg(Color::Cyan)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn draw_loading(frame: &mut Frame, app: &App, area: Rect) {
    let text = format!("{} {}", spinner(app), app.loading_message);
    let loading = Paragraph::new(text)
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(loading, area);
}

/// Second line of a list row: kind, size and last update.
fn describe(entry: &Entry) -> String {
    let base = format!(
        "{} | Size: {} | Last Update: {}",
        entry.kind(),
        format_bytes(entry.size()),
        format_timestamp(entry.last_update())
    );
    match entry {
        Entry::Torrent(t) => format!("{base} | Progress: {}%", t.progress),
        _ => base,
    }
}

fn list_row(item: &ViewItem) -> ListItem<'static> {
    let (icon, color) = match item.entry {
        Entry::Folder(_) => ("\u{1f4c1} ", Color::Blue),
        Entry::File(_) => ("", Color::White),
        Entry::Torrent(_) => ("\u{2193} ", Color::Magenta),
    };
    let mark = if item.marked { "✅ " } else { "" };
    ListItem::new(vec![
        Line::from(Span::styled(
            format!("{mark}{icon}{}", item.entry.name()),
            Style::default().fg(color),
        )),
        Line::from(Span::styled(
            format!("   {}", describe(&item.entry)),
            Style::default().fg(Color::DarkGray),
        )),
    ])
}

fn draw_folder(frame: &mut Frame, app: &mut App, area: Rect) {
    let mut block = Block::default().borders(Borders::ALL);
    if app.overlays.path {
        block = block.title(format!(" {} ", app.stack.path()));
    }

    let items: Vec<ListItem> = app.items.iter().map(list_row).collect();
    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, area, &mut app.list_state);
}

fn draw_downloading(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let (label, ratio) = app
        .transfer
        .as_ref()
        .map_or_else(|| (String::new(), 0.0), |t| (t.label(), t.fraction.clamp(0.0, 1.0)));

    let header = Paragraph::new(format!(" {} {label}", spinner(app)))
        .style(Style::default().fg(Color::Yellow));
    frame.render_widget(header, chunks[0]);

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let pct = (ratio * 100.0) as u16;
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL))
        .gauge_style(Style::default().fg(Color::Green))
        .ratio(ratio)
        .label(format!("{pct}%"));
    frame.render_widget(gauge, chunks[1]);
}

/// Recovery keys offered on the error and empty screens.
fn recovery_hint(app: &App) -> &'static str {
    if app.stack.can_go_back() {
        "r: retry  ←/h: back  q: quit"
    } else {
        "r: retry  q: quit"
    }
}

fn draw_error(frame: &mut Frame, app: &App, area: Rect) {
    let message = app.last_error.as_deref().unwrap_or("unknown error");
    let mut lines: Vec<Line> = message
        .lines()
        .map(|l| Line::from(Span::styled(l.to_string(), Style::default().fg(Color::Red))))
        .collect();
    lines.insert(
        0,
        Line::from(Span::styled(
            "Error:",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
    );
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        recovery_hint(app),
        Style::default().fg(Color::DarkGray),
    )));

    let error = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL))
        .wrap(Wrap { trim: false });
    frame.render_widget(error, area);
}

fn draw_empty(frame: &mut Frame, app: &App, area: Rect) {
    let lines = vec![
        Line::from("This folder is empty."),
        Line::from(""),
        Line::from(Span::styled(
            recovery_hint(app),
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let empty = Paragraph::new(lines).block(Block::default().borders(Borders::ALL));
    frame.render_widget(empty, area);
}

fn draw_status(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = Vec::new();
    if let Some(notice) = &app.notice {
        spans.push(Span::styled(
            format!(" {notice}"),
            Style::default().fg(Color::Cyan),
        ));
    } else {
        spans.push(Span::styled(
            format!(" {} items", app.items.len()),
            Style::default().fg(Color::DarkGray),
        ));
    }
    if !app.selection.is_empty() {
        spans.push(Span::styled(" | ", Style::default().fg(Color::DarkGray)));
        spans.push(Span::styled(
            format!("{} marked", app.selection.len()),
            Style::default().fg(Color::Green),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
