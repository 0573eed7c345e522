//! tb board show / move / ui

use serde::Serialize;

use crate::board::{BoardController, DropOutcome};
use crate::error::Result;
use crate::model::{Column, Task, TaskId};
use crate::output::HumanOutput;
use crate::ui;

use super::task::{describe_task, task_row, TaskRow};
use super::{column_title, parse_column, CommonOptions, Context};

/// Options for `tb board move`
pub struct MoveOptions {
    pub id: TaskId,
    pub column: String,
    pub common: CommonOptions,
}

#[derive(Serialize)]
struct BoardColumn {
    column: Column,
    title: String,
    tasks: Vec<TaskRow>,
}

#[derive(Serialize)]
struct BoardReport {
    columns: Vec<BoardColumn>,
}

#[derive(Serialize)]
struct MoveReport {
    id: TaskId,
    column: Column,
    moved: bool,
}

pub fn run_show(common: CommonOptions) -> Result<()> {
    let ctx = Context::open(&common)?;
    ctx.require_user()?;
    let parts = BoardController::partitions(ctx.app.store());

    let mut human = HumanOutput::new(format!(
        "tb board: {} task(s)",
        ctx.app.store().tasks().len()
    ));
    let mut columns = Vec::new();
    for column in [Column::Incomplete, Column::Complete] {
        let title = column_title(column, ctx.board_config()).to_string();
        let tasks = parts.column(column);
        human.push_summary(title.clone(), tasks.len().to_string());
        for task in tasks {
            human.push_item(&title, describe_task(task));
        }
        columns.push(BoardColumn {
            column,
            title,
            tasks: tasks.iter().map(|task| task_row(&ctx, task)).collect(),
        });
    }

    ctx.finish("board show", &BoardReport { columns }, human)
}

pub fn run_move(options: MoveOptions) -> Result<()> {
    let mut ctx = Context::open(&options.common)?;
    ctx.require_user()?;
    let column = parse_column(&options.column, ctx.board_config())?;

    let outcome = {
        let (board, store) = ctx.app.board_and_store();
        ctx.runtime
            .block_on(board.move_task(options.id, column, store))?
    };
    let title = column_title(column, ctx.board_config()).to_string();
    let (human, moved) = match &outcome {
        DropOutcome::Moved(task) => (moved_output(task, &title), true),
        _ => (
            HumanOutput::new(format!("tb board move: #{} already in {title}", options.id)),
            false,
        ),
    };

    let report = MoveReport {
        id: options.id,
        column,
        moved,
    };
    ctx.finish("board move", &report, human)
}

pub fn run_ui(common: CommonOptions) -> Result<()> {
    let mut ctx = Context::open(&common)?;
    ctx.require_user()?;
    ui::board::run(&mut ctx.app, &ctx.runtime)
}

fn moved_output(task: &Task, title: &str) -> HumanOutput {
    let mut human = HumanOutput::new(format!("tb board move: #{} -> {title}", task.id));
    human.push_summary("text", task.text.clone());
    human
}
