use crate::app::App;
use crate::theme::{board_theme, BoardTheme};
use chrono::{DateTime, Utc};
use lineboard_core::StatusItem;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

const COMPACT_WIDTH: u16 = 80;

pub fn render(frame: &mut Frame, app: &App) {
    let size = frame.size();
    let theme = board_theme();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(size);
    frame.render_widget(render_header(app, theme, size.width), layout[0]);
    frame.render_widget(render_lines(app, theme, size.width), layout[1]);
    frame.render_widget(render_footer(app, theme, Utc::now()), layout[2]);
    if app.help_open {
        render_help_overlay(frame, theme);
    }
}

fn titled_block(title: &'static str, theme: BoardTheme) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border))
        .style(Style::default().bg(theme.surface))
        .title(Span::styled(
            title,
            Style::default()
                .fg(theme.title)
                .add_modifier(Modifier::BOLD),
        ))
}

fn render_header(app: &App, theme: BoardTheme, width: u16) -> Paragraph<'static> {
    let view = &app.view;
    let inner_width = usize::from(width.saturating_sub(4)).max(12);
    let connection = format!("{} via {}", view.connection, view.mode.as_str());
    let fields = vec![
        format!("Server: {}", app.server),
        format!("Link: {connection}"),
        format!("Updated: {}", view.sync_label),
    ];
    let first = if is_compact(width) {
        format!("Updated: {}", view.sync_label)
    } else {
        fit_fields(&fields, inner_width)
    };

    let second = match view.banner.message() {
        Some(message) => Line::from(Span::styled(
            ellipsize(message, inner_width),
            Style::default()
                .fg(theme.banner(view.banner))
                .add_modifier(Modifier::BOLD),
        )),
        None => Line::from(Span::styled(
            ellipsize(&connection, inner_width),
            Style::default().fg(theme.connection(view.connection)),
        )),
    };

    Paragraph::new(Text::from(vec![
        Line::from(Span::styled(first, Style::default().fg(theme.text))),
        second,
    ]))
    .style(Style::default().fg(theme.text).bg(theme.bg))
    .block(titled_block("Line Status", theme))
}

fn render_lines(app: &App, theme: BoardTheme, width: u16) -> Paragraph<'static> {
    let compact = is_compact(width);
    let lines: Vec<Line<'static>> = if app.view.items.is_empty() {
        vec![Line::from(Span::styled(
            "No lines to show.",
            Style::default().fg(theme.muted),
        ))]
    } else {
        app.view
            .items
            .iter()
            .map(|item| item_line(item, theme, compact))
            .collect()
    };
    Paragraph::new(Text::from(lines))
        .style(Style::default().fg(theme.text).bg(theme.surface))
        .block(titled_block("Lines", theme))
        .scroll((app.scroll, 0))
}

fn item_line(item: &StatusItem, theme: BoardTheme, compact: bool) -> Line<'static> {
    let label_width = if compact { 24 } else { 36 };
    let mut spans = vec![
        Span::styled(
            format!("{:<label_width$} ", ellipsize(&item.line_en, label_width)),
            Style::default()
                .fg(theme.text)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            item.status_en.clone(),
            Style::default().fg(theme.severity(item.severity())),
        ),
    ];
    if !item.reason.is_empty() {
        spans.push(Span::styled(
            format!("  {}", item.reason),
            Style::default().fg(theme.muted),
        ));
    }
    if !compact && !item.line.is_empty() && item.line != item.line_en {
        spans.push(Span::styled(
            format!("  [{}]", item.line),
            Style::default().fg(theme.muted),
        ));
    }
    Line::from(spans)
}

fn render_footer(app: &App, theme: BoardTheme, now: DateTime<Utc>) -> Paragraph<'static> {
    let stats = &app.view.stats;
    let fields = vec![
        format!("Snapshots: {}", stats.snapshots_applied),
        format!("Last: {}", format_age(stats.last_applied_at, now)),
        format!("Dropped: {}", stats.malformed_payloads),
        format!("Failures: {}", stats.transport_failures),
        format!("Reconnects: {}", stats.reconnect_attempts),
        "? help".to_string(),
    ];
    Paragraph::new(Line::from(Span::styled(
        fit_fields(&fields, usize::from(u16::MAX)),
        Style::default().fg(theme.muted),
    )))
    .style(Style::default().fg(theme.text).bg(theme.bg))
    .block(titled_block("Sync", theme))
}

fn render_help_overlay(frame: &mut Frame, theme: BoardTheme) {
    let area = centered_rect(60, 50, frame.size());
    let lines = vec![
        Line::from(Span::styled(
            "Controls",
            Style::default()
                .fg(theme.title)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from("  j/k      scroll lines"),
        Line::from("  g/G      jump to top / bottom"),
        Line::from("  ? or F1  toggle this help"),
        Line::from("  q/Esc    quit"),
        Line::from(""),
        Line::from(Span::styled(
            "Severe lines are shown in red; a banner appears when the server has nothing to report.",
            Style::default().fg(theme.muted),
        )),
    ];
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(Text::from(lines))
            .style(Style::default().fg(theme.text).bg(theme.surface))
            .block(titled_block("Help", theme))
            .wrap(Wrap { trim: false }),
        area,
    );
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100u16.saturating_sub(percent_y)) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100u16.saturating_sub(percent_y)) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100u16.saturating_sub(percent_x)) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100u16.saturating_sub(percent_x)) / 2),
        ])
        .split(vertical[1])[1]
}

fn is_compact(width: u16) -> bool {
    width < COMPACT_WIDTH
}

fn format_age(at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    match at {
        Some(at) => format!("{}s ago", (now - at).num_seconds().max(0)),
        None => "never".to_string(),
    }
}

fn ellipsize(input: &str, max: usize) -> String {
    if input.chars().count() <= max {
        return input.to_string();
    }
    if max <= 3 {
        return "...".chars().take(max).collect();
    }
    let prefix: String = input.chars().take(max - 3).collect();
    format!("{prefix}...")
}

fn fit_fields(fields: &[String], max: usize) -> String {
    let mut output = String::new();
    for field in fields {
        let candidate = if output.is_empty() {
            field.clone()
        } else {
            format!("{output} | {field}")
        };
        if candidate.chars().count() > max {
            if output.is_empty() {
                return ellipsize(field, max);
            }
            break;
        }
        output = candidate;
    }
    output
}
