use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use crate::app::App;
use crate::board::Partitions;
use crate::cli::column_title;
use crate::model::{Column, Task};

use super::app::{BoardState, Mode, StatusKind};

const COLOR_TEXT: Color = Color::Rgb(234, 236, 239);
const COLOR_MUTED: Color = Color::Rgb(160, 165, 172);
const COLOR_INFO: Color = Color::Rgb(116, 198, 219);
const COLOR_WARNING: Color = Color::Rgb(244, 200, 98);
const COLOR_ERROR: Color = Color::Rgb(255, 107, 107);
const COLOR_SUCCESS: Color = Color::Rgb(126, 210, 146);
const COLOR_ACCENT: Color = Color::Rgb(122, 170, 255);
const COLOR_BORDER_LIST: Color = Color::Rgb(92, 126, 166);
const COLOR_BORDER_DETAIL: Color = Color::Rgb(180, 156, 92);

pub fn render(frame: &mut Frame, app: &App, state: &BoardState) {
    let area = frame.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(8),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(area);

    let parts = Partitions::of(app.store().tasks());
    render_header(frame, app, chunks[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(chunks[1]);
    render_column(frame, app, state, &parts, Column::Incomplete, columns[0]);
    render_column(frame, app, state, &parts, Column::Complete, columns[1]);

    render_comments(frame, app, state, &parts, chunks[2]);
    render_footer(frame, app, state, chunks[3]);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let who = match app.current_user() {
        Some(user) => format!("{} <{}>", user.name, user.email),
        None => "signed out".to_string(),
    };
    let line = Line::from(vec![
        Span::styled(
            "taskboard",
            Style::default()
                .fg(COLOR_ACCENT)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(who, Style::default().fg(COLOR_MUTED)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn render_column(
    frame: &mut Frame,
    app: &App,
    state: &BoardState,
    parts: &Partitions<'_>,
    column: Column,
    area: Rect,
) {
    let tasks = parts.column(column);
    let focused = state.focus == column;
    let board = app.board();
    let hovered = board.dragging().is_some() && board.hovering() == Some(column);

    let border = if hovered {
        COLOR_WARNING
    } else if focused {
        COLOR_ACCENT
    } else {
        COLOR_BORDER_LIST
    };
    let title = format!(
        " {} ({}) ",
        column_title(column, &app.config().board),
        tasks.len()
    );
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border));

    let height = area.height.saturating_sub(2) as usize;
    let selected = state.selected_index(column);
    let (start, end) = list_window(tasks.len(), Some(selected), height);

    let mut lines: Vec<Line> = Vec::new();
    if tasks.is_empty() {
        lines.push(Line::from(Span::styled(
            "  (empty)",
            Style::default().fg(COLOR_MUTED),
        )));
    }
    for (idx, task) in tasks.iter().enumerate().take(end).skip(start) {
        let is_selected = focused && idx == selected;
        let is_dragged = board.dragging() == Some(task.id);
        lines.push(task_line(app, task, is_selected, is_dragged));
    }

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn task_line<'a>(app: &App, task: &'a Task, selected: bool, dragged: bool) -> Line<'a> {
    let marker = if dragged {
        "» "
    } else if selected {
        "> "
    } else {
        "  "
    };
    let mut text_style = if task.completed {
        Style::default().fg(COLOR_SUCCESS)
    } else {
        Style::default().fg(COLOR_TEXT)
    };
    if selected {
        text_style = text_style.add_modifier(Modifier::REVERSED);
    }
    if dragged {
        text_style = text_style.fg(COLOR_WARNING).add_modifier(Modifier::BOLD);
    }

    let mut spans = vec![
        Span::styled(marker, Style::default().fg(COLOR_ACCENT)),
        Span::styled(format!("#{} ", task.id), Style::default().fg(COLOR_MUTED)),
        Span::styled(task.text.as_str(), text_style),
    ];
    let comments = app.store().comments_for(task.id).len();
    if comments > 0 {
        spans.push(Span::styled(
            format!("  [{comments}]"),
            Style::default().fg(COLOR_INFO),
        ));
    }
    Line::from(spans)
}

fn render_comments(
    frame: &mut Frame,
    app: &App,
    state: &BoardState,
    parts: &Partitions<'_>,
    area: Rect,
) {
    let block = Block::default()
        .title(" Comments ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(COLOR_BORDER_DETAIL));

    let mut lines: Vec<Line> = Vec::new();
    match state.selected_task(parts) {
        Some(task_id) => {
            let comments = app.store().comments_for(task_id);
            if comments.is_empty() {
                lines.push(Line::from(Span::styled(
                    "no comments yet; press c to add one",
                    Style::default().fg(COLOR_MUTED),
                )));
            }
            let height = area.height.saturating_sub(2) as usize;
            let skip = comments.len().saturating_sub(height);
            for comment in comments.into_iter().skip(skip) {
                lines.push(Line::from(vec![
                    Span::styled(
                        comment.created_at.format("%m-%d %H:%M ").to_string(),
                        Style::default().fg(COLOR_MUTED),
                    ),
                    Span::styled(
                        format!("{}: ", comment.author_name),
                        Style::default().fg(COLOR_INFO),
                    ),
                    Span::styled(comment.content.clone(), Style::default().fg(COLOR_TEXT)),
                ]));
            }
        }
        None => lines.push(Line::from(Span::styled(
            "select a task",
            Style::default().fg(COLOR_MUTED),
        ))),
    }

    let widget = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(widget, area);
}

fn render_footer(frame: &mut Frame, app: &App, state: &BoardState, area: Rect) {
    let hint = state.footer_hint(app.board().dragging().is_some());
    let hint_span = Span::styled(hint, Style::default().fg(COLOR_INFO));
    let line = if let Some((status, kind)) = state.status_line() {
        let status_style = match kind {
            StatusKind::Error => Style::default()
                .fg(COLOR_ERROR)
                .add_modifier(Modifier::BOLD),
            StatusKind::Info => Style::default().fg(COLOR_WARNING),
        };
        Line::from(vec![
            hint_span,
            Span::raw("  |  "),
            Span::styled(status, status_style),
        ])
    } else {
        Line::from(hint_span)
    };

    let prompt = match &state.mode {
        Mode::AddTask(input) => format!("new task: {input}_"),
        Mode::AddComment { task_id, input } => format!("comment on #{task_id}: {input}_"),
        _ => String::new(),
    };
    let prompt_line = Line::from(Span::styled(prompt, Style::default().fg(COLOR_ACCENT)));

    let widget = Paragraph::new(vec![line, prompt_line])
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(Style::default().fg(COLOR_BORDER_LIST)),
        );
    frame.render_widget(widget, area);
}

fn list_window(total: usize, selected: Option<usize>, height: usize) -> (usize, usize) {
    if total == 0 || height == 0 {
        return (0, 0);
    }
    if total <= height {
        return (0, total);
    }
    let selected = selected.unwrap_or(0);
    let mut start = selected.saturating_sub(height / 2);
    if start + height > total {
        start = total - height;
    }
    (start, start + height)
}

#[cfg(test)]
mod tests {
    use super::list_window;

    #[test]
    fn list_window_keeps_selection_visible() {
        assert_eq!(list_window(0, None, 5), (0, 0));
        assert_eq!(list_window(3, Some(2), 5), (0, 3));
        assert_eq!(list_window(20, Some(10), 5), (8, 13));
        assert_eq!(list_window(20, Some(19), 5), (15, 20));
    }
}
