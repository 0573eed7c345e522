use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::runtime::Runtime;

use crate::app::App;
use crate::board::{BoardController, DropOutcome, Partitions};
use crate::error::{Error, Result};
use crate::model::{Column, TaskId};

use super::view;

const EVENT_POLL_MS: u64 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Normal,
    AddTask(String),
    AddComment { task_id: TaskId, input: String },
    ConfirmDelete(TaskId),
}

/// What a key press asks the loop to do against the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    None,
    Quit,
    Pick(TaskId),
    Hover(Column),
    Drop(Column),
    Cancel,
    Toggle(TaskId),
    AddTask(String),
    AddComment(TaskId, String),
    Delete(TaskId),
    Reload,
}

/// Cursor and input state. Task data lives in the store.
#[derive(Debug, Clone)]
pub struct BoardState {
    pub focus: Column,
    selected: [usize; 2],
    pub mode: Mode,
    status: Option<(String, StatusKind)>,
}

impl Default for BoardState {
    fn default() -> Self {
        Self {
            focus: Column::Incomplete,
            selected: [0, 0],
            mode: Mode::Normal,
            status: None,
        }
    }
}

fn slot(column: Column) -> usize {
    match column {
        Column::Incomplete => 0,
        Column::Complete => 1,
    }
}

impl BoardState {
    pub fn selected_index(&self, column: Column) -> usize {
        self.selected[slot(column)]
    }

    pub fn selected_task(&self, parts: &Partitions<'_>) -> Option<TaskId> {
        parts
            .column(self.focus)
            .get(self.selected_index(self.focus))
            .map(|task| task.id)
    }

    pub fn status_line(&self) -> Option<(&str, StatusKind)> {
        self.status
            .as_ref()
            .map(|(text, kind)| (text.as_str(), *kind))
    }

    pub fn set_info(&mut self, message: impl Into<String>) {
        self.status = Some((message.into(), StatusKind::Info));
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.status = Some((message.into(), StatusKind::Error));
    }

    /// Keep each cursor inside its column.
    pub fn clamp(&mut self, parts: &Partitions<'_>) {
        for column in [Column::Incomplete, Column::Complete] {
            let len = parts.column(column).len();
            let index = &mut self.selected[slot(column)];
            *index = (*index).min(len.saturating_sub(1));
        }
    }

    /// Put the cursor on `task_id` wherever it now lives.
    pub fn follow(&mut self, task_id: TaskId, parts: &Partitions<'_>) {
        for column in [Column::Incomplete, Column::Complete] {
            if let Some(pos) = parts.column(column).iter().position(|t| t.id == task_id) {
                self.focus = column;
                self.selected[slot(column)] = pos;
            }
        }
    }

    fn move_cursor(&mut self, delta: isize, parts: &Partitions<'_>) {
        let len = parts.column(self.focus).len();
        if len == 0 {
            return;
        }
        let index = &mut self.selected[slot(self.focus)];
        *index = index.saturating_add_signed(delta).min(len - 1);
    }

    pub fn handle_key(
        &mut self,
        key: KeyEvent,
        parts: &Partitions<'_>,
        board: &BoardController,
    ) -> Action {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Action::Quit;
        }

        match std::mem::replace(&mut self.mode, Mode::Normal) {
            Mode::Normal => self.handle_normal(key, parts, board),
            Mode::AddTask(mut input) => match key.code {
                KeyCode::Enter => Action::AddTask(input),
                KeyCode::Esc => Action::None,
                code => {
                    edit_input(&mut input, code);
                    self.mode = Mode::AddTask(input);
                    Action::None
                }
            },
            Mode::AddComment { task_id, mut input } => match key.code {
                KeyCode::Enter => Action::AddComment(task_id, input),
                KeyCode::Esc => Action::None,
                code => {
                    edit_input(&mut input, code);
                    self.mode = Mode::AddComment { task_id, input };
                    Action::None
                }
            },
            Mode::ConfirmDelete(task_id) => match key.code {
                KeyCode::Char('y') | KeyCode::Enter => Action::Delete(task_id),
                _ => {
                    self.set_info("cancelled");
                    Action::None
                }
            },
        }
    }

    fn handle_normal(
        &mut self,
        key: KeyEvent,
        parts: &Partitions<'_>,
        board: &BoardController,
    ) -> Action {
        let dragging = board.dragging().is_some();
        match key.code {
            KeyCode::Char('q') => Action::Quit,
            KeyCode::Esc if dragging => Action::Cancel,
            KeyCode::Up | KeyCode::Char('k') => {
                self.move_cursor(-1, parts);
                Action::None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.move_cursor(1, parts);
                Action::None
            }
            KeyCode::Left | KeyCode::Char('h') => self.focus_column(Column::Incomplete, dragging),
            KeyCode::Right | KeyCode::Char('l') => self.focus_column(Column::Complete, dragging),
            KeyCode::Tab => self.focus_column(self.focus.other(), dragging),
            KeyCode::Char(' ') if dragging => Action::Cancel,
            KeyCode::Char(' ') => match self.selected_task(parts) {
                Some(id) => Action::Pick(id),
                None => Action::None,
            },
            KeyCode::Enter if dragging => Action::Drop(board.hovering().unwrap_or(self.focus)),
            KeyCode::Enter | KeyCode::Char('t') => match self.selected_task(parts) {
                Some(id) => Action::Toggle(id),
                None => Action::None,
            },
            KeyCode::Char('a') => {
                self.mode = Mode::AddTask(String::new());
                Action::None
            }
            KeyCode::Char('c') => {
                if let Some(task_id) = self.selected_task(parts) {
                    self.mode = Mode::AddComment {
                        task_id,
                        input: String::new(),
                    };
                }
                Action::None
            }
            KeyCode::Char('d') => {
                if let Some(task_id) = self.selected_task(parts) {
                    self.mode = Mode::ConfirmDelete(task_id);
                }
                Action::None
            }
            KeyCode::Char('r') => Action::Reload,
            _ => Action::None,
        }
    }

    fn focus_column(&mut self, column: Column, dragging: bool) -> Action {
        self.focus = column;
        if dragging {
            Action::Hover(column)
        } else {
            Action::None
        }
    }

    pub fn footer_hint(&self, dragging: bool) -> &'static str {
        match &self.mode {
            Mode::AddTask(_) => "enter save  esc cancel",
            Mode::AddComment { .. } => "enter post  esc cancel",
            Mode::ConfirmDelete(_) => "delete task and its comments? y/n",
            Mode::Normal if dragging => "left/right choose column  enter drop  esc cancel",
            Mode::Normal => {
                "j/k move  h/l column  space pick  t toggle  a add  c comment  d delete  r reload  q quit"
            }
        }
    }
}

fn edit_input(input: &mut String, code: KeyCode) {
    match code {
        KeyCode::Backspace => {
            input.pop();
        }
        KeyCode::Char(ch) => input.push(ch),
        _ => {}
    }
}

/// Interactive board for the signed-in user.
pub fn run(app: &mut App, runtime: &Runtime) -> Result<()> {
    let mut state = BoardState::default();
    run_terminal(app, runtime, &mut state)
}

fn run_terminal(app: &mut App, runtime: &Runtime, state: &mut BoardState) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, app, runtime, state);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    runtime: &Runtime,
    state: &mut BoardState,
) -> Result<()> {
    let mut dirty = true;
    loop {
        if runtime.block_on(app.sync()).is_some() {
            dirty = true;
        }
        if app.current_user().is_none() {
            return Err(Error::Unauthenticated);
        }

        if dirty {
            state.clamp(&Partitions::of(app.store().tasks()));
            terminal.draw(|frame| view::render(frame, app, state))?;
            dirty = false;
        }

        if event::poll(Duration::from_millis(EVENT_POLL_MS))? {
            match event::read()? {
                Event::Key(key) if key.kind != KeyEventKind::Release => {
                    let action = {
                        let parts = Partitions::of(app.store().tasks());
                        state.handle_key(key, &parts, app.board())
                    };
                    if action == Action::Quit {
                        break;
                    }
                    apply(action, app, runtime, state);
                    dirty = true;
                }
                Event::Resize(_, _) => dirty = true,
                _ => {}
            }
        }
    }
    Ok(())
}

/// Run `action` against the store. Failures land in the status line.
pub fn apply(action: Action, app: &mut App, runtime: &Runtime, state: &mut BoardState) {
    let result = match action {
        Action::None | Action::Quit => Ok(None),
        Action::Pick(id) => {
            app.board_and_store().0.pick(id);
            state.set_info(format!("picked #{id}; choose a column and press enter"));
            Ok(None)
        }
        Action::Hover(column) => {
            app.board_and_store().0.hover(column);
            Ok(None)
        }
        Action::Cancel => {
            app.board_and_store().0.cancel();
            state.set_info("drag cancelled");
            Ok(None)
        }
        Action::Drop(column) => {
            let (board, store) = app.board_and_store();
            runtime
                .block_on(board.drop(column, store))
                .map(|outcome| match outcome {
                    DropOutcome::Moved(task) => {
                        state.set_info(format!("moved #{}", task.id));
                        Some(task.id)
                    }
                    DropOutcome::Unchanged => {
                        state.set_info("already there");
                        None
                    }
                    DropOutcome::NothingPicked => None,
                })
        }
        Action::Toggle(id) => runtime
            .block_on(app.store_mut().toggle_task(id))
            .map(|task| Some(task.id)),
        Action::AddTask(text) => runtime
            .block_on(app.store_mut().add_task(&text))
            .map(|task| {
                state.set_info(format!("added #{}", task.id));
                Some(task.id)
            }),
        Action::AddComment(task_id, content) => runtime
            .block_on(app.store_mut().add_comment(task_id, &content))
            .map(|_| {
                state.set_info("comment posted");
                Some(task_id)
            }),
        Action::Delete(id) => runtime
            .block_on(app.store_mut().remove_task(id))
            .map(|()| {
                state.set_info(format!("deleted #{id}"));
                None
            }),
        Action::Reload => {
            let report = runtime.block_on(app.reload());
            if report.is_some_and(|report| !report.is_complete()) {
                state.set_error("reload incomplete; see logs");
            } else {
                state.set_info("reloaded");
            }
            Ok(None)
        }
    };

    match result {
        Ok(Some(task_id)) => state.follow(task_id, &Partitions::of(app.store().tasks())),
        Ok(None) => {}
        Err(err) => state.set_error(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Task;
    use chrono::Utc;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn tasks() -> Vec<Task> {
        [(3, false), (2, false), (1, true)]
            .into_iter()
            .map(|(id, completed)| Task {
                id,
                owner_id: "a".to_string(),
                text: format!("task {id}"),
                completed,
                created_at: Utc::now(),
                updated_at: None,
            })
            .collect()
    }

    #[test]
    fn cursor_moves_within_focused_column() {
        let tasks = tasks();
        let parts = Partitions::of(&tasks);
        let board = BoardController::new();
        let mut state = BoardState::default();

        assert_eq!(state.selected_task(&parts), Some(3));
        state.handle_key(key(KeyCode::Down), &parts, &board);
        state.handle_key(key(KeyCode::Down), &parts, &board);
        assert_eq!(state.selected_task(&parts), Some(2));

        state.handle_key(key(KeyCode::Right), &parts, &board);
        assert_eq!(state.focus, Column::Complete);
        assert_eq!(state.selected_task(&parts), Some(1));
    }

    #[test]
    fn drag_keys_map_to_pick_hover_drop() {
        let tasks = tasks();
        let parts = Partitions::of(&tasks);
        let mut board = BoardController::new();
        let mut state = BoardState::default();

        let action = state.handle_key(key(KeyCode::Char(' ')), &parts, &board);
        assert_eq!(action, Action::Pick(3));
        board.pick(3);

        let action = state.handle_key(key(KeyCode::Right), &parts, &board);
        assert_eq!(action, Action::Hover(Column::Complete));
        board.hover(Column::Complete);

        let action = state.handle_key(key(KeyCode::Enter), &parts, &board);
        assert_eq!(action, Action::Drop(Column::Complete));
    }

    #[test]
    fn add_prompt_collects_text_until_enter() {
        let tasks = tasks();
        let parts = Partitions::of(&tasks);
        let board = BoardController::new();
        let mut state = BoardState::default();

        state.handle_key(key(KeyCode::Char('a')), &parts, &board);
        for ch in "milkx".chars() {
            state.handle_key(key(KeyCode::Char(ch)), &parts, &board);
        }
        state.handle_key(key(KeyCode::Backspace), &parts, &board);
        let action = state.handle_key(key(KeyCode::Enter), &parts, &board);
        assert_eq!(action, Action::AddTask("milk".to_string()));
        assert_eq!(state.mode, Mode::Normal);
    }

    #[test]
    fn delete_needs_confirmation() {
        let tasks = tasks();
        let parts = Partitions::of(&tasks);
        let board = BoardController::new();
        let mut state = BoardState::default();

        assert_eq!(state.handle_key(key(KeyCode::Char('d')), &parts, &board), Action::None);
        assert_eq!(state.mode, Mode::ConfirmDelete(3));
        assert_eq!(state.handle_key(key(KeyCode::Char('n')), &parts, &board), Action::None);
        assert_eq!(state.mode, Mode::Normal);

        state.handle_key(key(KeyCode::Char('d')), &parts, &board);
        assert_eq!(state.handle_key(key(KeyCode::Char('y')), &parts, &board), Action::Delete(3));
    }
}
