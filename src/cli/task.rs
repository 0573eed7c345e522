//! tb task commands

use serde::Serialize;

use crate::board::Partitions;
use crate::error::Result;
use crate::model::{Column, Task, TaskId, TaskPatch};
use crate::output::HumanOutput;

use super::{column_title, parse_column, CommonOptions, Context};

/// Options for `tb task add`
pub struct AddOptions {
    pub text: String,
    pub common: CommonOptions,
}

/// Options for `tb task list`
pub struct ListOptions {
    pub column: Option<String>,
    pub common: CommonOptions,
}

/// Options for `tb task toggle`
pub struct ToggleOptions {
    pub id: TaskId,
    pub common: CommonOptions,
}

/// Options for `tb task edit`
pub struct EditOptions {
    pub id: TaskId,
    pub text: Option<String>,
    pub completed: Option<bool>,
    pub common: CommonOptions,
}

/// Options for `tb task rm`
pub struct RmOptions {
    pub id: TaskId,
    pub common: CommonOptions,
}

#[derive(Serialize)]
pub(crate) struct TaskRow {
    #[serde(flatten)]
    task: Task,
    column: Column,
    comments: usize,
}

#[derive(Serialize)]
struct TaskListReport {
    total: usize,
    tasks: Vec<TaskRow>,
}

#[derive(Serialize)]
struct TaskRemovedReport {
    id: TaskId,
    comments_removed: usize,
}

pub(crate) fn task_row(ctx: &Context, task: &Task) -> TaskRow {
    TaskRow {
        task: task.clone(),
        column: task.column(),
        comments: ctx.app.store().comments_for(task.id).len(),
    }
}

pub(crate) fn describe_task(task: &Task) -> String {
    let mark = if task.completed { "x" } else { " " };
    format!("#{} [{mark}] {}", task.id, task.text)
}

pub fn run_add(options: AddOptions) -> Result<()> {
    let mut ctx = Context::open(&options.common)?;
    ctx.require_user()?;
    let task = ctx
        .runtime
        .block_on(ctx.app.store_mut().add_task(&options.text))?;

    let mut human = HumanOutput::new(format!("tb task add: created #{}", task.id));
    human.push_summary("text", task.text.clone());
    human.push_summary("column", column_title(task.column(), ctx.board_config()));
    human.push_next_step(format!("tb task toggle {}", task.id));
    ctx.finish("task add", &task_row(&ctx, &task), human)
}

pub fn run_list(options: ListOptions) -> Result<()> {
    let ctx = Context::open(&options.common)?;
    ctx.require_user()?;
    let column = options
        .column
        .as_deref()
        .map(|raw| parse_column(raw, ctx.board_config()))
        .transpose()?;

    let tasks: Vec<&Task> = match column {
        Some(column) => Partitions::of(ctx.app.store().tasks())
            .column(column)
            .to_vec(),
        None => ctx.app.store().tasks().iter().collect(),
    };

    let header = match column {
        Some(column) => format!(
            "tb task list: {} task(s) in {}",
            tasks.len(),
            column_title(column, ctx.board_config())
        ),
        None => format!("tb task list: {} task(s)", tasks.len()),
    };
    let mut human = HumanOutput::new(header);
    for task in &tasks {
        let comments = ctx.app.store().comments_for(task.id).len();
        if comments > 0 {
            human.push_detail(format!("{} ({comments} comment(s))", describe_task(task)));
        } else {
            human.push_detail(describe_task(task));
        }
    }
    if tasks.is_empty() && column.is_none() {
        human.push_next_step("tb task add \"...\"");
    }

    let report = TaskListReport {
        total: tasks.len(),
        tasks: tasks.iter().map(|task| task_row(&ctx, task)).collect(),
    };
    ctx.finish("task list", &report, human)
}

pub fn run_toggle(options: ToggleOptions) -> Result<()> {
    let mut ctx = Context::open(&options.common)?;
    ctx.require_user()?;
    let task = ctx
        .runtime
        .block_on(ctx.app.store_mut().toggle_task(options.id))?;

    let mut human = HumanOutput::new(format!(
        "tb task toggle: #{} is now in {}",
        task.id,
        column_title(task.column(), ctx.board_config())
    ));
    human.push_summary("text", task.text.clone());
    ctx.finish("task toggle", &task_row(&ctx, &task), human)
}

pub fn run_edit(options: EditOptions) -> Result<()> {
    let mut ctx = Context::open(&options.common)?;
    ctx.require_user()?;
    let patch = TaskPatch {
        text: options.text,
        completed: options.completed,
    };
    let task = ctx
        .runtime
        .block_on(ctx.app.store_mut().update_task(options.id, patch))?;

    let mut human = HumanOutput::new(format!("tb task edit: updated #{}", task.id));
    human.push_summary("text", task.text.clone());
    human.push_summary("column", column_title(task.column(), ctx.board_config()));
    ctx.finish("task edit", &task_row(&ctx, &task), human)
}

pub fn run_rm(options: RmOptions) -> Result<()> {
    let mut ctx = Context::open(&options.common)?;
    ctx.require_user()?;
    let comments_removed = ctx.app.store().comments_for(options.id).len();
    ctx.runtime
        .block_on(ctx.app.store_mut().remove_task(options.id))?;

    let mut human = HumanOutput::new(format!("tb task rm: deleted #{}", options.id));
    if comments_removed > 0 {
        human.push_summary("comments removed", comments_removed.to_string());
    }
    let report = TaskRemovedReport {
        id: options.id,
        comments_removed,
    };
    ctx.finish("task rm", &report, human)
}
