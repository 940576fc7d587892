use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use ri_core::{FilePathId, ProjectPartId};

use crate::progress_counter::ProgressCounter;
use crate::task_scheduler::{Task, TaskSchedulerInterface};

/// A pending (re)index of one source file of one project part.
///
/// Equality and order look at `(file_path_id, project_part_id)` only.
pub struct SymbolIndexerTask<P> {
    pub file_path_id: FilePathId,
    pub project_part_id: ProjectPartId,
    pub callable: Task<P>,
}

impl<P> SymbolIndexerTask<P> {
    pub fn new(file_path_id: FilePathId, project_part_id: ProjectPartId, callable: Task<P>) -> Self {
        Self {
            file_path_id,
            project_part_id,
            callable,
        }
    }

    fn key(&self) -> (FilePathId, ProjectPartId) {
        (self.file_path_id, self.project_part_id)
    }
}

impl<P> PartialEq for SymbolIndexerTask<P> {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl<P> Eq for SymbolIndexerTask<P> {}

impl<P> PartialOrd for SymbolIndexerTask<P> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<P> Ord for SymbolIndexerTask<P> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl<P> fmt::Debug for SymbolIndexerTask<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymbolIndexerTask")
            .field("file_path_id", &self.file_path_id)
            .field("project_part_id", &self.project_part_id)
            .finish_non_exhaustive()
    }
}

/// Pending index tasks, at most one per `(file, project part)`, sorted by
/// that key.
pub struct SymbolIndexerTaskQueue<P> {
    tasks: Vec<SymbolIndexerTask<P>>,
    progress: Arc<ProgressCounter>,
}

impl<P> SymbolIndexerTaskQueue<P> {
    pub fn new(progress: Arc<ProgressCounter>) -> Self {
        Self {
            tasks: Vec::new(),
            progress,
        }
    }

    /// Merge `tasks` into the queue. A task whose key is already queued
    /// replaces the queued one; among incoming duplicates the last wins.
    pub fn add_or_update_tasks(&mut self, mut tasks: Vec<SymbolIndexerTask<P>>) {
        if tasks.is_empty() {
            return;
        }
        tasks.sort();
        let incoming = keep_last_per_key(tasks);

        let existing = std::mem::take(&mut self.tasks);
        let mut merged = Vec::with_capacity(existing.len() + incoming.len());
        let mut added = 0usize;

        let mut old = existing.into_iter().peekable();
        let mut new = incoming.into_iter().peekable();
        loop {
            let order = match (old.peek(), new.peek()) {
                (Some(a), Some(b)) => a.cmp(b),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => break,
            };
            match order {
                Ordering::Less => merged.extend(old.next()),
                Ordering::Greater => {
                    added += 1;
                    merged.extend(new.next());
                }
                Ordering::Equal => {
                    old.next();
                    merged.extend(new.next());
                }
            }
        }

        self.tasks = merged;
        self.progress.add_total(added);
    }

    /// Drop queued tasks of the given project parts.
    pub fn remove_tasks(&mut self, project_part_ids: &[ProjectPartId]) {
        let mut ids = project_part_ids.to_vec();
        ids.sort();
        let before = self.tasks.len();
        self.tasks
            .retain(|task| ids.binary_search(&task.project_part_id).is_err());
        self.progress.remove_total(before - self.tasks.len());
    }

    /// Hand as many tasks as there are free slots to `scheduler`, taken
    /// from the tail of the queue.
    pub fn process_entries<S>(&mut self, scheduler: &mut S)
    where
        S: TaskSchedulerInterface<Task<P>>,
    {
        let free = scheduler.slot_usage().free;
        if free == 0 || self.tasks.is_empty() {
            return;
        }
        let split = self.tasks.len().saturating_sub(free);
        let taken = self.tasks.split_off(split);
        tracing::debug!(
            started = taken.len(),
            pending = self.tasks.len(),
            "dispatching index tasks"
        );
        scheduler.add_tasks(taken.into_iter().map(|task| task.callable).collect());
    }

    pub fn tasks(&self) -> &[SymbolIndexerTask<P>] {
        &self.tasks
    }

    /// Take the pending tasks without running them through a scheduler.
    pub fn into_tasks(self) -> Vec<SymbolIndexerTask<P>> {
        self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// `tasks` must be sorted; later duplicates replace earlier ones.
fn keep_last_per_key<P>(tasks: Vec<SymbolIndexerTask<P>>) -> Vec<SymbolIndexerTask<P>> {
    let mut unique: Vec<SymbolIndexerTask<P>> = Vec::with_capacity(tasks.len());
    for task in tasks {
        match unique.last_mut() {
            Some(last) if *last == task => *last = task,
            _ => unique.push(task),
        }
    }
    unique
}
