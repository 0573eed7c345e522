//! Two-column board over the store: partitions and drag-and-drop.
//!
//! Partitions are recomputed from the store on every call and hold no state
//! of their own. A drag is `pick` then any number of `hover`s then `drop`;
//! only `drop` can change anything, and only the `completed` flag.

use crate::error::{Error, Result};
use crate::model::{Column, Task, TaskId};
use crate::store::TaskStore;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Partitions<'a> {
    pub incomplete: Vec<&'a Task>,
    pub complete: Vec<&'a Task>,
}

impl<'a> Partitions<'a> {
    /// Split `tasks` by completion, keeping their order.
    pub fn of(tasks: &'a [Task]) -> Self {
        let (complete, incomplete) = tasks.iter().partition(|task| task.completed);
        Self {
            incomplete,
            complete,
        }
    }

    pub fn column(&self, column: Column) -> &[&'a Task] {
        match column {
            Column::Incomplete => &self.incomplete,
            Column::Complete => &self.complete,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    /// The task changed column.
    Moved(Task),
    /// Dropped on the column it was already in.
    Unchanged,
    /// `drop` without a prior `pick`.
    NothingPicked,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BoardController {
    dragging: Option<TaskId>,
    hovering: Option<Column>,
}

impl BoardController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn partitions(store: &TaskStore) -> Partitions<'_> {
        Partitions::of(store.tasks())
    }

    pub fn pick(&mut self, task_id: TaskId) {
        self.dragging = Some(task_id);
        self.hovering = None;
    }

    /// Provisional target, for feedback only.
    pub fn hover(&mut self, column: Column) {
        if self.dragging.is_some() {
            self.hovering = Some(column);
        }
    }

    pub fn dragging(&self) -> Option<TaskId> {
        self.dragging
    }

    pub fn hovering(&self) -> Option<Column> {
        self.hovering
    }

    pub fn cancel(&mut self) {
        self.dragging = None;
        self.hovering = None;
    }

    /// Finish the drag. Toggles the task only when `column` implies a
    /// different `completed` value. Drag state is cleared either way.
    pub async fn drop(&mut self, column: Column, store: &mut TaskStore) -> Result<DropOutcome> {
        let hovered = self.hovering.take();
        let Some(task_id) = self.dragging.take() else {
            return Ok(DropOutcome::NothingPicked);
        };
        tracing::trace!(task_id, ?column, ?hovered, "drop");

        let completed = store
            .task(task_id)
            .map(|task| task.completed)
            .ok_or(Error::TaskNotFound(task_id))?;
        if completed == column.implies_completed() {
            return Ok(DropOutcome::Unchanged);
        }
        let task = store.toggle_task(task_id).await?;
        Ok(DropOutcome::Moved(task))
    }

    /// `pick` then `drop` in one step.
    pub async fn move_task(
        &mut self,
        task_id: TaskId,
        column: Column,
        store: &mut TaskStore,
    ) -> Result<DropOutcome> {
        self.pick(task_id);
        self.hover(column);
        self.drop(column, store).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn task(id: TaskId, completed: bool) -> Task {
        Task {
            id,
            owner_id: "a".to_string(),
            text: format!("task {id}"),
            completed,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn every_task_lands_in_exactly_one_partition() {
        let tasks = vec![task(3, false), task(2, true), task(1, false)];
        let parts = Partitions::of(&tasks);
        let incomplete: Vec<TaskId> = parts.incomplete.iter().map(|t| t.id).collect();
        let complete: Vec<TaskId> = parts.complete.iter().map(|t| t.id).collect();
        assert_eq!(incomplete, vec![3, 1]);
        assert_eq!(complete, vec![2]);
        for t in &tasks {
            let in_incomplete = parts.incomplete.iter().any(|p| p.id == t.id);
            let in_complete = parts.complete.iter().any(|p| p.id == t.id);
            assert!(in_incomplete ^ in_complete);
        }
    }

    #[test]
    fn hover_without_pick_is_ignored() {
        let mut board = BoardController::new();
        board.hover(Column::Complete);
        assert_eq!(board.hovering(), None);

        board.pick(7);
        board.hover(Column::Complete);
        assert_eq!(board.hovering(), Some(Column::Complete));
        board.cancel();
        assert_eq!(board.dragging(), None);
    }
}
