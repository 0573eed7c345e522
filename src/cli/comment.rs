//! tb comment commands

use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{Comment, CommentId, TaskId};
use crate::output::HumanOutput;

use super::{CommonOptions, Context};

/// Options for `tb comment add`
pub struct AddOptions {
    pub task_id: TaskId,
    pub content: String,
    pub common: CommonOptions,
}

/// Options for `tb comment list`
pub struct ListOptions {
    pub task_id: Option<TaskId>,
    pub common: CommonOptions,
}

/// Options for `tb comment rm`
pub struct RmOptions {
    pub id: CommentId,
    pub common: CommonOptions,
}

#[derive(Serialize)]
struct CommentListReport<'a> {
    total: usize,
    comments: Vec<&'a Comment>,
}

#[derive(Serialize)]
struct CommentRemovedReport {
    id: CommentId,
}

fn describe_comment(comment: &Comment) -> String {
    format!(
        "#{} on #{} by {} ({}): {}",
        comment.id,
        comment.task_id,
        comment.author_name,
        comment.created_at.format("%Y-%m-%d %H:%M"),
        comment.content
    )
}

pub fn run_add(options: AddOptions) -> Result<()> {
    let mut ctx = Context::open(&options.common)?;
    ctx.require_user()?;
    let comment = ctx.runtime.block_on(
        ctx.app
            .store_mut()
            .add_comment(options.task_id, &options.content),
    )?;

    let mut human = HumanOutput::new(format!(
        "tb comment add: #{} on task #{}",
        comment.id, comment.task_id
    ));
    human.push_summary("author", comment.author_name.clone());
    human.push_summary("content", comment.content.clone());
    ctx.finish("comment add", &comment, human)
}

pub fn run_list(options: ListOptions) -> Result<()> {
    let ctx = Context::open(&options.common)?;
    ctx.require_user()?;
    let store = ctx.app.store();

    let comments: Vec<&Comment> = match options.task_id {
        Some(task_id) => {
            if store.task(task_id).is_none() {
                return Err(Error::TaskNotFound(task_id));
            }
            store.comments_for(task_id)
        }
        None => store.comments().iter().collect(),
    };

    let header = match options.task_id {
        Some(task_id) => format!("tb comment list: {} on task #{task_id}", comments.len()),
        None => format!("tb comment list: {} comment(s)", comments.len()),
    };
    let mut human = HumanOutput::new(header);
    for comment in &comments {
        human.push_detail(describe_comment(comment));
    }

    let report = CommentListReport {
        total: comments.len(),
        comments,
    };
    ctx.finish("comment list", &report, human)
}

pub fn run_rm(options: RmOptions) -> Result<()> {
    let mut ctx = Context::open(&options.common)?;
    ctx.require_user()?;
    ctx.runtime
        .block_on(ctx.app.store_mut().remove_comment(options.id))?;

    let human = HumanOutput::new(format!("tb comment rm: deleted #{}", options.id));
    ctx.finish("comment rm", &CommentRemovedReport { id: options.id }, human)
}
