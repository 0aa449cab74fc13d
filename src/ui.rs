use crate::app::{App, ModalState, PaneFocus, RowKind, SearchField, TreeRow};
use crate::diff::DiffSummary;
use crate::domain::{LoadState, ToggleState};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::prelude::{Alignment, Color, Line, Modifier, Span, Style};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};

pub fn draw(frame: &mut Frame, app: &mut App) {
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let main = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(outer[1]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(9), Constraint::Min(3)])
        .split(main[1]);

    draw_search_bar(frame, app, outer[0]);
    draw_tree(frame, app, main[0]);
    draw_summary(frame, app, right[0]);
    draw_logs(frame, app, right[1]);
    draw_status_bar(frame, app, outer[2]);
    draw_modal(frame, app);
}

fn draw_search_bar(frame: &mut Frame, app: &App, area: Rect) {
    let group = app
        .group_filter()
        .and_then(|id| app.catalog().group(id))
        .map_or_else(|| "all".to_string(), |g| g.name.clone());

    let line = Line::from(vec![
        Span::styled(" title: ", Style::default().fg(Color::Gray)),
        Span::styled(
            display_or_dash(app.title_query()),
            Style::default().fg(Color::Yellow),
        ),
        Span::styled("  id: ", Style::default().fg(Color::Gray)),
        Span::styled(
            display_or_dash(app.page_id_query()),
            Style::default().fg(Color::Yellow),
        ),
        Span::styled("  group: ", Style::default().fg(Color::Gray)),
        Span::styled(group, Style::default().fg(Color::LightCyan)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn display_or_dash(value: &str) -> &str {
    if value.is_empty() { "-" } else { value }
}

fn draw_tree(frame: &mut Frame, app: &mut App, area: Rect) {
    let viewport_rows = area.height.saturating_sub(2) as usize;
    app.sync_list_scroll(viewport_rows);

    let border_style = if app.focus == PaneFocus::Tree {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let title = match &app.store {
        Some(store) => format!(" Pages: {store} "),
        None => " Pages ".to_string(),
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style);

    if app.visible_rows().is_empty() {
        let message = empty_tree_message(app);
        let p = Paragraph::new(message)
            .block(block)
            .wrap(Wrap { trim: false });
        frame.render_widget(p, area);
        return;
    }

    let items: Vec<ListItem> = app.visible_rows().iter().map(row_line).map(ListItem::new).collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::LightGreen)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▶ ");

    let mut state = ListState::default()
        .with_offset(app.list_scroll())
        .with_selected(Some(app.selected_index));

    frame.render_stateful_widget(list, area, &mut state);
}

fn empty_tree_message(app: &App) -> Line<'static> {
    match &app.load_state {
        LoadState::Failed(message) => Line::from(Span::styled(
            format!("failed to load pages: {message}"),
            Style::default().fg(Color::Red),
        )),
        LoadState::Loading => Line::from("loading pages..."),
        _ if app.store.is_none() => Line::from("no vector store selected; press p to pick one"),
        _ if !app.query().is_empty() => Line::from("no page matches the current search"),
        _ => Line::from("no pages available"),
    }
}

fn row_line(row: &TreeRow) -> Line<'static> {
    let indent = "  ".repeat(row.depth);
    let fold = match (row.has_children, row.expanded) {
        (false, _) => "  ",
        (true, true) => "▾ ",
        (true, false) => "▸ ",
    };
    let marker_style = match row.state {
        ToggleState::ON => Style::default().fg(Color::Green),
        ToggleState::PARTIAL => Style::default().fg(Color::Yellow),
        _ => Style::default().fg(Color::DarkGray),
    };

    let mut spans = vec![
        Span::raw(format!("{indent}{fold}")),
        Span::styled(format!("{} ", row.state.as_marker()), marker_style),
    ];
    match row.kind {
        RowKind::Group => spans.push(Span::styled(
            row.title.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        RowKind::Node => {
            spans.push(Span::raw(row.title.clone()));
            spans.push(Span::styled(
                format!("  #{}", row.id),
                Style::default().fg(Color::DarkGray),
            ));
        }
    }
    Line::from(spans)
}

fn draw_summary(frame: &mut Frame, app: &App, area: Rect) {
    let summary = app.diff_summary();
    let lines = summary_lines(&summary, app.diff().add_limit, app.diff().required_reduction());

    let border_style = if summary.is_over_limit {
        Style::default().fg(Color::LightRed)
    } else {
        Style::default()
    };
    let p = Paragraph::new(lines)
        .block(
            Block::default()
                .title(" Changes ")
                .borders(Borders::ALL)
                .border_style(border_style),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(p, area);
}

fn summary_lines(summary: &DiffSummary, limit: usize, reduction: usize) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(Span::styled(
            format!("+{} to add", summary.added_count),
            Style::default().fg(Color::Green),
        )),
        Line::from(Span::styled(
            format!("-{} to remove", summary.removed_count),
            Style::default().fg(Color::Red),
        )),
        Line::from(format!("{} page(s) after sync", summary.final_total)),
        Line::from(""),
    ];

    if summary.is_over_limit {
        lines.push(
            Line::from(format!(
                "over the limit of {limit} additions; deselect {reduction} more"
            ))
            .style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
        );
    } else if summary.has_changes {
        lines.push(Line::from("s: sync these changes").style(Style::default().fg(Color::Cyan)));
    } else {
        lines.push(Line::from("in sync").style(Style::default().fg(Color::Gray)));
    }
    lines
}

fn draw_logs(frame: &mut Frame, app: &App, area: Rect) {
    let border_style = if app.focus == PaneFocus::Log {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };

    let end = app.logs.len().saturating_sub(app.log_tail_offset);
    let visible = area.height.saturating_sub(2) as usize;
    let start = end.saturating_sub(visible);
    let lines: Vec<Line> = app.logs[start..end]
        .iter()
        .map(|line| Line::from(line.as_str()))
        .collect();

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .title(" Log ")
                .borders(Borders::ALL)
                .border_style(border_style),
        )
        .wrap(Wrap { trim: false });

    frame.render_widget(paragraph, area);
}

fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let (label, style) = if app.is_syncing() {
        ("SYNC", Style::default().bg(Color::Magenta).fg(Color::Black))
    } else if app.is_busy() {
        ("BUSY", Style::default().bg(Color::Yellow).fg(Color::Black))
    } else {
        ("IDLE", Style::default().bg(Color::DarkGray).fg(Color::White))
    };
    let text = Line::from(vec![
        Span::styled(format!(" {label} "), style),
        Span::raw("  "),
        Span::styled(
            app.load_state.label().to_string(),
            Style::default().fg(Color::Gray),
        ),
        Span::raw("  "),
        Span::styled(
            "space toggle | l/h fold | / title # id g group | s sync r reload p store | ? help",
            Style::default().fg(Color::Gray),
        ),
    ]);

    let paragraph = Paragraph::new(text).alignment(Alignment::Left);
    frame.render_widget(paragraph, area);
}

fn draw_modal(frame: &mut Frame, app: &App) {
    match &app.modal {
        ModalState::None => {}
        ModalState::Help => {
            let area = centered_rect(60, 70, frame.area());
            frame.render_widget(Clear, area);
            let lines: Vec<Line> = HELP_LINES.iter().map(|line| Line::from(*line)).collect();
            let p = Paragraph::new(lines)
                .block(
                    Block::default()
                        .title(" Keys ")
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(Color::Cyan)),
                )
                .wrap(Wrap { trim: false });
            frame.render_widget(p, area);
        }
        ModalState::Search { field, .. } => {
            let area = centered_rect(60, 20, frame.area());
            frame.render_widget(Clear, area);
            let hint = match field {
                SearchField::Title => "case-insensitive, matches part of the title",
                SearchField::PageId => "matches part of the page id",
            };
            let lines = vec![
                Line::from(format!("> {}", app.search_text(*field)))
                    .style(Style::default().fg(Color::Yellow)),
                Line::from(hint).style(Style::default().fg(Color::Gray)),
                Line::from("Enter: keep  Esc: restore"),
            ];
            let p = Paragraph::new(lines).block(
                Block::default()
                    .title(format!(" Search by {} ", field.label()))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::LightBlue)),
            );
            frame.render_widget(p, area);
        }
        ModalState::StorePicker { selected } => {
            let area = centered_rect(60, 60, frame.area());
            frame.render_widget(Clear, area);
            let block = Block::default()
                .title(" Vector stores ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan));

            if app.stores.is_empty() {
                let message = if app.is_busy() {
                    "loading stores..."
                } else {
                    "no vector stores found (r: retry)"
                };
                frame.render_widget(Paragraph::new(message).block(block), area);
                return;
            }

            let items: Vec<ListItem> = app
                .stores
                .iter()
                .map(|store| ListItem::new(store.to_string()))
                .collect();
            let list = List::new(items)
                .block(block)
                .highlight_style(
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::LightYellow)
                        .add_modifier(Modifier::BOLD),
                )
                .highlight_symbol("▶ ");

            let mut state = ListState::default();
            state.select(Some(*selected));
            frame.render_stateful_widget(list, area, &mut state);
        }
    }
}

const HELP_LINES: &[&str] = &[
    "j/k, Up/Down   move",
    "l/Right        expand",
    "h/Left         collapse or go to parent",
    "Enter          toggle expansion",
    "space          enable/disable (subtree for parents and groups)",
    "/              search by title",
    "#              search by page id",
    "Esc            clear search",
    "g              cycle group filter",
    "s              sync changes",
    "r              reload pages",
    "p              pick vector store",
    "Tab            switch focus (tree/log)",
    "PgUp/PgDn      scroll log",
    "q              quit",
];

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
