use super::app::{App, COPY_COLUMN_WIDTH, StatusKind, StatusLine};
use super::pagination::{ButtonKind, PageButton, layout_pagination, rows_needed};
use crate::cache::QueryView;
use crate::claim::Claims;
use crate::model::{PageResult, hours_left_today};
use chrono::Timelike;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

/// Rows the page bar may grow to before it switches to windows
const MAX_BAR_ROWS: u16 = 4;

/// Per-frame values pulled out of the app before the cache is borrowed
struct Context<'a> {
    page: u32,
    selected: usize,
    tick: u64,
    refreshing: bool,
    status: Option<&'a StatusLine>,
    claims: &'a Claims,
}

/// Where the clickable parts ended up this frame
struct HitAreas {
    table_area: Rect,
    table_offset: usize,
    pagination_inner: Rect,
    buttons: Vec<PageButton>,
}

pub fn render(frame: &mut Frame, app: &mut App) {
    let area = frame.area();
    let key = app.key();
    let ctx = Context {
        page: app.page,
        selected: app.selected_row,
        tick: app.tick,
        refreshing: app.client.cache().is_pending(key),
        status: app.status.as_ref(),
        claims: &app.claims,
    };

    let hits = match app.client.view(key) {
        QueryView::Loading => {
            render_loading(frame, area, ctx.tick);
            None
        }
        QueryView::Failed { error } => {
            render_failed(frame, area, ctx.page, error);
            None
        }
        QueryView::Ready { data, placeholder } => Some(render_directory(frame, &ctx, data, placeholder)),
    };

    match hits {
        Some(h) => app.set_hit_areas(h.table_area, h.table_offset, h.pagination_inner, h.buttons),
        None => app.clear_hit_areas(),
    }
}

fn render_directory(frame: &mut Frame, ctx: &Context, data: &PageResult, placeholder: bool) -> HitAreas {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Min(8),    // Sidebar + table
            Constraint::Length(1), // Status
            Constraint::Length(1), // Footer
        ])
        .split(frame.area());

    render_header(frame, ctx, placeholder, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(30), Constraint::Min(40)])
        .split(chunks[1]);

    render_stats(frame, ctx, data, body[0]);

    let bar_width = body[1].width.saturating_sub(2);
    let buttons = layout_pagination(data.total_pages, ctx.page, bar_width, MAX_BAR_ROWS);
    let bar_rows = rows_needed(&buttons);

    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(bar_rows + 2)])
        .split(body[1]);

    let table_offset = render_table(frame, ctx, data, placeholder, main[0]);
    let (pagination_inner, buttons) = render_pagination(frame, buttons, main[1]);

    render_status(frame, ctx, chunks[2]);
    render_footer(frame, chunks[3]);

    HitAreas {
        table_area: main[0],
        table_offset,
        pagination_inner,
        buttons,
    }
}

fn render_header(frame: &mut Frame, ctx: &Context, placeholder: bool, area: Rect) {
    let mut spans = vec![
        Span::styled("userdeck", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw(" "),
        Span::styled(" DIRECTORY ", Style::default().bg(Color::Blue).fg(Color::White)),
        Span::raw(format!(" page {}", ctx.page)),
    ];

    if placeholder || ctx.refreshing {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            " LOADING ",
            Style::default().bg(Color::Yellow).fg(Color::Black),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_stats(frame: &mut Frame, ctx: &Context, data: &PageResult, area: Rect) {
    let hours_left = hours_left_today(chrono::Local::now().hour());

    let stat = |label: &'static str, value: String, color: Color| {
        Line::from(vec![
            Span::raw(format!(" {}: ", label)),
            Span::styled(value, Style::default().fg(color).add_modifier(Modifier::BOLD)),
        ])
    };

    let lines = vec![
        Line::raw(""),
        stat("Total Users", data.total_users.to_string(), Color::Green),
        stat("Active this Page", data.active_count().to_string(), Color::Yellow),
        stat("Today Copied", data.today_copied.to_string(), Color::Blue),
        stat("Total Copied", data.total_copied.to_string(), Color::Red),
        stat("Hours Left Today", hours_left.to_string(), Color::Magenta),
        stat(
            "Page",
            format!("{} / {}", ctx.page, data.total_pages),
            Color::LightGreen,
        ),
    ];

    let block = Block::default()
        .title(" Stats ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Draw the user table; returns the scroll offset ratatui settled on
fn render_table(frame: &mut Frame, ctx: &Context, data: &PageResult, placeholder: bool, area: Rect) -> usize {
    let title = if placeholder {
        format!(" Premium User Directory (loading page {}) ", ctx.page)
    } else {
        " Premium User Directory ".to_string()
    };

    let block = Block::default()
        .title(title)
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    if data.users.is_empty() {
        let msg = Paragraph::new(" No users on this page")
            .block(block)
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(msg, area);
        return 0;
    }

    let header_cells = ["Full Name", "First", "Last", "City", "Copy"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)));
    let header = Row::new(header_cells).height(1);

    let rows: Vec<Row> = data
        .users
        .iter()
        .map(|user| {
            let (marker, marker_color) = if user.locked {
                ("🔒", Color::DarkGray)
            } else if ctx.claims.is_pending(&user.id) {
                ("⏳", Color::Yellow)
            } else {
                ("📋", Color::Green)
            };

            let style = if user.locked {
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::DIM)
            } else {
                Style::default()
            };

            Row::new(vec![
                Cell::from(user.full_name.clone()),
                Cell::from(user.first_name.clone()),
                Cell::from(user.last_name.clone()),
                Cell::from(user.city.clone()),
                Cell::from(marker).style(Style::default().fg(marker_color)),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Percentage(30),
        Constraint::Percentage(20),
        Constraint::Percentage(20),
        Constraint::Percentage(20),
        Constraint::Length(COPY_COLUMN_WIDTH - 2),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .row_highlight_style(Style::default().bg(Color::DarkGray));

    let selected = ctx.selected.min(data.users.len() - 1);
    let mut state = TableState::default().with_selected(Some(selected));
    frame.render_stateful_widget(table, area, &mut state);
    state.offset()
}

/// Draw the page controls. Returns the inner area of the bar and the buttons
/// that were actually drawn; anything the area cannot hold is dropped.
fn render_pagination(frame: &mut Frame, buttons: Vec<PageButton>, area: Rect) -> (Rect, Vec<PageButton>) {
    let block = Block::default()
        .title(" Pages ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let drawn: Vec<PageButton> = buttons
        .into_iter()
        .filter(|b| {
            let rect = b.rect(inner);
            rect.bottom() <= inner.bottom() && rect.right() <= inner.right()
        })
        .collect();

    for button in &drawn {
        let style = match button.kind {
            ButtonKind::Page if button.current => {
                Style::default().bg(Color::Green).fg(Color::Black).add_modifier(Modifier::BOLD)
            }
            ButtonKind::Page => Style::default().bg(Color::DarkGray).fg(Color::Gray),
            ButtonKind::Previous | ButtonKind::Next => {
                Style::default().bg(Color::Blue).fg(Color::White)
            }
        };
        frame.render_widget(Paragraph::new(Span::styled(button.label(), style)), button.rect(inner));
    }

    (inner, drawn)
}

fn render_status(frame: &mut Frame, ctx: &Context, area: Rect) {
    let line = match ctx.status {
        Some(status) => {
            let color = match status.kind {
                StatusKind::Info => Color::Gray,
                StatusKind::Success => Color::Green,
                StatusKind::Error => Color::Red,
            };
            Line::from(Span::styled(format!(" {}", status.text), Style::default().fg(color)))
        }
        None if ctx.claims.pending_count() > 0 => Line::from(Span::styled(
            format!(" {} lock(s) in flight", ctx.claims.pending_count()),
            Style::default().fg(Color::Yellow),
        )),
        None => Line::raw(""),
    };
    frame.render_widget(Paragraph::new(line), area);
}

fn render_footer(frame: &mut Frame, area: Rect) {
    let key_style = Style::default().bg(Color::DarkGray);
    let spans = vec![
        Span::styled(" q ", key_style),
        Span::raw(" quit "),
        Span::styled(" j/k ", key_style),
        Span::raw(" select "),
        Span::styled(" ⏎/c ", key_style),
        Span::raw(" claim "),
        Span::styled(" h/l ", key_style),
        Span::raw(" page "),
        Span::styled(" r ", key_style),
        Span::raw(" refresh "),
    ];
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_loading(frame: &mut Frame, area: Rect, tick: u64) {
    let width = area.width.min(60);
    let height = area.height.min(12);
    let panel = centered(area, width, height);
    let bar_width = width.saturating_sub(8) as usize;

    let logo_style = if (tick / 8) % 2 == 0 {
        Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::LightBlue)
    };

    let mut lines = vec![
        Line::from(Span::styled("✦", logo_style)),
        Line::raw(""),
        Line::from(Span::styled(
            "Loading, hang tight...",
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "Fetching premium data, this will only take a moment.",
            Style::default().fg(Color::Gray),
        )),
        Line::raw(""),
    ];
    for i in 0..3u64 {
        lines.push(Line::from(Span::styled(
            shimmer_bar(bar_width, tick, i * 4),
            Style::default().fg(Color::DarkGray),
        )));
    }
    lines.push(Line::raw(""));

    let mut meta = vec![Span::styled("Preparing secure view ", Style::default().fg(Color::DarkGray))];
    let lit = ((tick / 4) % 3) as usize;
    for dot in 0..3 {
        let color = if dot == lit { Color::LightBlue } else { Color::DarkGray };
        meta.push(Span::styled("●", Style::default().fg(color)));
    }
    lines.push(Line::from(meta));

    let paragraph = Paragraph::new(lines).alignment(Alignment::Center);
    frame.render_widget(paragraph, panel);
}

fn render_failed(frame: &mut Frame, area: Rect, page: u32, error: &str) {
    let panel = centered(area, area.width.min(70), area.height.min(9));
    let block = Block::default()
        .title(format!(" Page {} failed to load ", page))
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));

    let lines = vec![
        Line::raw(""),
        Line::from(Span::styled(error.to_string(), Style::default().fg(Color::Red))),
        Line::raw(""),
        Line::from(vec![
            Span::styled(" r ", Style::default().bg(Color::DarkGray)),
            Span::raw(" retry   "),
            Span::styled(" q ", Style::default().bg(Color::DarkGray)),
            Span::raw(" quit"),
        ]),
    ];

    let paragraph = Paragraph::new(lines)
        .block(block)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, panel);
}

/// A track with a bright window sliding across it
fn shimmer_bar(width: usize, tick: u64, phase: u64) -> String {
    const GLOW: usize = 6;
    if width == 0 {
        return String::new();
    }
    let span = (width + GLOW) as u64;
    let head = ((tick + phase) % span) as usize;

    (0..width)
        .map(|i| if i < head && i + GLOW >= head { '━' } else { '─' })
        .collect()
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width,
        height,
    }
}
