//! Command-line interface for tb
//!
//! This module defines the CLI structure using clap derive macros.
//! Each command group is defined in its own submodule.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::runtime::Runtime;

use crate::app::App;
use crate::config::{resolve_data_dir, BackendKind, BoardConfig, Config};
use crate::error::{Error, Result};
use crate::events::{Event, EventDestination, EventSink};
use crate::model::{Column, User};
use crate::output::{emit_success, HumanOutput, OutputOptions};

mod auth;
mod board;
mod comment;
mod task;
mod user;

/// tb - per-user tasks and comments on a two-column board
///
/// Works against a local data directory or a hosted backend.
#[derive(Parser, Debug)]
#[command(name = "tb")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Data directory (defaults to the platform data dir)
    #[arg(long, global = true, env = "TASKBOARD_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Backend to use: local or remote (overrides config)
    #[arg(long, global = true, env = "TASKBOARD_BACKEND")]
    pub backend: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit JSONL events to a file, or `-` for stdout
    #[arg(long, global = true)]
    pub events: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Register a new user and sign in
    Signup {
        /// Email address
        email: String,

        /// Display name
        #[arg(long)]
        name: String,

        /// Password (at least 6 characters)
        #[arg(long, env = "TASKBOARD_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Sign in as an existing user
    Signin {
        /// Email address
        email: String,

        /// Password
        #[arg(long, env = "TASKBOARD_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Sign out
    Signout,

    /// Show the signed-in user
    Whoami,

    /// Profile of the signed-in user
    #[command(subcommand)]
    Profile(ProfileCommands),

    /// Local user management
    #[command(subcommand)]
    User(UserCommands),

    /// Task commands
    #[command(subcommand)]
    Task(TaskCommands),

    /// Comment commands
    #[command(subcommand)]
    Comment(CommentCommands),

    /// Board view
    #[command(subcommand)]
    Board(BoardCommands),
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// Show the profile
    Show,

    /// Change name and/or email
    Update {
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        email: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// List registered users
    List,

    /// Switch the active user without a password
    Switch {
        /// Email of the user to activate
        email: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Add a task
    Add {
        /// Task text
        text: String,
    },

    /// List tasks, newest first
    List {
        /// Only one column (todo/done or the configured titles)
        #[arg(long)]
        column: Option<String>,
    },

    /// Flip a task between incomplete and complete
    Toggle {
        /// Task ID
        id: i64,
    },

    /// Edit text and/or completion
    Edit {
        /// Task ID
        id: i64,

        /// New text
        #[arg(long)]
        text: Option<String>,

        /// Mark complete
        #[arg(long, conflicts_with = "undone")]
        done: bool,

        /// Mark incomplete
        #[arg(long)]
        undone: bool,
    },

    /// Delete a task and its comments
    Rm {
        /// Task ID
        id: i64,
    },
}

#[derive(Subcommand, Debug)]
pub enum CommentCommands {
    /// Comment on a task
    Add {
        /// Task ID
        task_id: i64,

        /// Comment text
        content: String,
    },

    /// List comments, oldest first
    List {
        /// Only comments on this task
        task_id: Option<i64>,
    },

    /// Delete a comment
    Rm {
        /// Comment ID
        id: i64,
    },
}

#[derive(Subcommand, Debug)]
pub enum BoardCommands {
    /// Print both columns
    Show,

    /// Move a task to a column
    Move {
        /// Task ID
        id: i64,

        /// Target column (todo/done or the configured titles)
        column: String,
    },

    /// Interactive board
    Ui,
}

/// Flags shared by every command.
#[derive(Debug, Clone)]
pub struct CommonOptions {
    pub data_dir: Option<PathBuf>,
    pub backend: Option<String>,
    pub json: bool,
    pub quiet: bool,
    pub events: Option<String>,
}

/// Everything a command needs: runtime, app and event output.
pub(crate) struct Context {
    pub runtime: Runtime,
    pub app: App,
    sink: Option<Arc<Mutex<EventSink>>>,
    events_to_stdout: bool,
    json: bool,
    quiet: bool,
    warnings: Arc<Mutex<Vec<String>>>,
}

impl Context {
    /// Open the app and sync the store with the restored session.
    pub fn open(common: &CommonOptions) -> Result<Self> {
        let data_dir = resolve_data_dir(common.data_dir.as_deref());
        let mut config = Config::load_from_dir(&data_dir);
        if let Some(raw) = common.backend.as_deref() {
            config.backend = BackendKind::parse(raw)?;
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let mut app = {
            let _guard = runtime.enter();
            App::open(&data_dir, config)?
        };

        let destination = EventDestination::parse(common.events.as_deref());
        let sink = destination
            .as_ref()
            .map(|dest| dest.open())
            .transpose()?
            .map(|sink| Arc::new(Mutex::new(sink)));
        let events_to_stdout = matches!(destination, Some(EventDestination::Stdout));

        let warnings: Arc<Mutex<Vec<String>>> = Arc::default();
        if let Some(sink) = &sink {
            let sink = Arc::clone(sink);
            let warnings = Arc::clone(&warnings);
            // Sign-in and switches change the user mid-command.
            let session = app.session().subscribe();
            app.store_mut().subscribe(move |event| {
                let actor = session.borrow().as_ref().map(|user| user.email.clone());
                let result = Event::from_store(event, actor).and_then(|event| {
                    sink.lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .emit(&event)
                });
                if let Err(err) = result {
                    warnings
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(format!("event output failed: {err}"));
                }
            });
        }

        let mut ctx = Self {
            runtime,
            app,
            sink,
            events_to_stdout,
            json: common.json,
            quiet: common.quiet,
            warnings,
        };
        if let Some(report) = ctx.runtime.block_on(ctx.app.sync()) {
            if !report.tasks_loaded {
                ctx.warn("tasks failed to load; showing none");
            }
            if !report.comments_loaded {
                ctx.warn("comments failed to load; showing none");
            }
        }
        Ok(ctx)
    }

    pub fn output(&self) -> OutputOptions {
        OutputOptions {
            json: self.json && !self.events_to_stdout,
            quiet: self.quiet || self.events_to_stdout,
        }
    }

    pub fn board_config(&self) -> &BoardConfig {
        &self.app.config().board
    }

    pub fn require_user(&self) -> Result<User> {
        self.app.current_user().ok_or(Error::Unauthenticated)
    }

    pub fn warn(&self, warning: impl Into<String>) {
        self.warnings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(warning.into());
    }

    /// Warnings collected so far, e.g. failed event writes.
    pub fn take_warnings(&self) -> Vec<String> {
        std::mem::take(&mut *self.warnings.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Emit the success envelope with any collected warnings attached.
    pub fn finish<T: Serialize>(&self, command: &str, data: &T, mut human: HumanOutput) -> Result<()> {
        for warning in self.take_warnings() {
            human.push_warning(warning);
        }
        emit_success(self.output(), command, data, Some(&human))
    }

    pub fn emit_session_changed(&self) {
        let Some(sink) = &self.sink else {
            return;
        };
        let user = self.app.current_user();
        let result = Event::session_changed(user.as_ref()).and_then(|event| {
            sink.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .emit(&event)
        });
        if let Err(err) = result {
            self.warn(format!("event output failed: {err}"));
        }
    }
}

/// Resolve a column by its canonical name or configured title.
pub(crate) fn parse_column(raw: &str, board: &BoardConfig) -> Result<Column> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case(&board.incomplete_title) {
        return Ok(Column::Incomplete);
    }
    if trimmed.eq_ignore_ascii_case(&board.complete_title) {
        return Ok(Column::Complete);
    }
    Column::parse(trimmed).ok_or_else(|| {
        Error::InvalidArgument(format!(
            "unknown column '{trimmed}' (expected {} or {})",
            board.incomplete_title, board.complete_title
        ))
    })
}

pub(crate) fn column_title(column: Column, board: &BoardConfig) -> &str {
    match column {
        Column::Incomplete => &board.incomplete_title,
        Column::Complete => &board.complete_title,
    }
}

impl Cli {
    fn common(&self) -> CommonOptions {
        CommonOptions {
            data_dir: self.data_dir.clone(),
            backend: self.backend.clone(),
            json: self.json,
            quiet: self.quiet,
            events: self.events.clone(),
        }
    }

    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let common = self.common();
        match self.command {
            Commands::Signup {
                email,
                name,
                password,
            } => auth::run_signup(auth::SignupOptions {
                email,
                name,
                password,
                common,
            }),
            Commands::Signin { email, password } => auth::run_signin(auth::SigninOptions {
                email,
                password,
                common,
            }),
            Commands::Signout => auth::run_signout(common),
            Commands::Whoami => auth::run_whoami(common),
            Commands::Profile(cmd) => match cmd {
                ProfileCommands::Show => user::run_profile_show(common),
                ProfileCommands::Update { name, email } => {
                    user::run_profile_update(user::ProfileUpdateOptions {
                        name,
                        email,
                        common,
                    })
                }
            },
            Commands::User(cmd) => match cmd {
                UserCommands::List => user::run_list(common),
                UserCommands::Switch { email } => {
                    user::run_switch(user::SwitchOptions { email, common })
                }
            },
            Commands::Task(cmd) => match cmd {
                TaskCommands::Add { text } => task::run_add(task::AddOptions { text, common }),
                TaskCommands::List { column } => {
                    task::run_list(task::ListOptions { column, common })
                }
                TaskCommands::Toggle { id } => {
                    task::run_toggle(task::ToggleOptions { id, common })
                }
                TaskCommands::Edit {
                    id,
                    text,
                    done,
                    undone,
                } => task::run_edit(task::EditOptions {
                    id,
                    text,
                    completed: if done {
                        Some(true)
                    } else if undone {
                        Some(false)
                    } else {
                        None
                    },
                    common,
                }),
                TaskCommands::Rm { id } => task::run_rm(task::RmOptions { id, common }),
            },
            Commands::Comment(cmd) => match cmd {
                CommentCommands::Add { task_id, content } => {
                    comment::run_add(comment::AddOptions {
                        task_id,
                        content,
                        common,
                    })
                }
                CommentCommands::List { task_id } => {
                    comment::run_list(comment::ListOptions { task_id, common })
                }
                CommentCommands::Rm { id } => comment::run_rm(comment::RmOptions { id, common }),
            },
            Commands::Board(cmd) => match cmd {
                BoardCommands::Show => board::run_show(common),
                BoardCommands::Move { id, column } => {
                    board::run_move(board::MoveOptions { id, column, common })
                }
                BoardCommands::Ui => board::run_ui(common),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_resolve_by_configured_title() {
        let board = BoardConfig {
            incomplete_title: "Backlog".to_string(),
            complete_title: "Shipped".to_string(),
        };
        assert_eq!(parse_column("shipped", &board).unwrap(), Column::Complete);
        assert_eq!(parse_column("todo", &board).unwrap(), Column::Incomplete);
        assert!(matches!(
            parse_column("later", &board),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn cli_parses_edit_flags() {
        let cli = Cli::try_parse_from(["tb", "task", "edit", "3", "--done"]).unwrap();
        match cli.command {
            Commands::Task(TaskCommands::Edit { id, done, undone, .. }) => {
                assert_eq!(id, 3);
                assert!(done && !undone);
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(Cli::try_parse_from(["tb", "task", "edit", "3", "--done", "--undone"]).is_err());
    }
}
