//! taskboard - per-user tasks and threaded comments on a two-column board
//!
//! # Core Concepts
//!
//! - **Session**: who is signed in, local accounts or a hosted auth service
//! - **Persistence adapter**: one contract over a local JSON store and a
//!   hosted table service
//! - **Task store**: in-memory tasks and comments for the signed-in user
//! - **Board**: incomplete/complete partitions and drag-and-drop moves
//!
//! # Module Organization
//!
//! - `adapter`: `PersistenceAdapter` and its local and remote implementations
//! - `app`: wires session, store and board together
//! - `board`: partitions and the drag controller
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `.taskboard.toml`
//! - `error`: Error types and result aliases
//! - `events`: JSONL event stream for store and session changes
//! - `lock`: File locking and atomic writes
//! - `model`: users, tasks, comments and patches
//! - `remote`: hosted backend client (HTTP and in-memory)
//! - `session`: `SessionProvider` and its implementations
//! - `storage`: on-disk layout of the local store
//! - `store`: the task/comment store
//! - `ui`: terminal board

pub mod adapter;
pub mod app;
pub mod board;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod lock;
pub mod model;
pub mod output;
pub mod remote;
pub mod session;
pub mod storage;
pub mod store;
pub mod ui;

pub use error::{Error, Result};
