//! The pending-task pool, ordered for assignment.
//!
//! # Ordering
//!
//! Higher-priority tasks come first, ties broken by arrival time (oldest
//! first), further ties by input order.  Internally each task gets a weight
//! `max_priority − priority` so the sort is ascending on (weight, arrival);
//! the original priority values are preserved for callers that read them.

use rustc_hash::FxHashSet;

use agv_core::TaskId;

use crate::task::{Task, TaskStatus};

/// The tick's pending tasks, sorted for assignment.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: Vec<Task>,
}

impl TaskRegistry {
    /// Take ownership of the backlog snapshot and order it.
    pub fn new(mut tasks: Vec<Task>) -> Self {
        let max_priority = tasks.iter().map(|t| t.priority).max().unwrap_or(0);
        for task in &mut tasks {
            task.weight = max_priority - task.priority;
        }
        // Stable sort keeps input order for full ties.
        tasks.sort_by_key(|t| (t.weight, t.start_time));
        Self { tasks }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// All pending tasks in assignment order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Tasks nobody owns yet: no robot pinned, status still TO_DO.
    pub fn unassigned_unstarted(&self) -> impl Iterator<Item = &Task> {
        self.tasks
            .iter()
            .filter(|t| t.robot.is_none() && t.status == TaskStatus::ToDo)
    }

    /// The pending task with `id`, if any.
    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    /// Remove and return the task with `id`, if still pending.
    pub fn take(&mut self, id: &TaskId) -> Option<Task> {
        let idx = self.tasks.iter().position(|t| &t.id == id)?;
        Some(self.tasks.remove(idx))
    }

    /// Drop every task whose id is in `ids`.
    pub fn remove_by_id(&mut self, ids: &[TaskId]) {
        let doomed: FxHashSet<&TaskId> = ids.iter().collect();
        self.tasks.retain(|t| !doomed.contains(&t.id));
    }
}
