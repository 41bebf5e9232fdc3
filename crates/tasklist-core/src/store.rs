use std::collections::HashSet;

use anyhow::Context;
use tracing::{debug, error, info, warn};

use crate::counts::Counts;
use crate::filter::{FilterPatch, FilterState};
use crate::notify::{NotificationKind, Notifier, TracingNotifier};
use crate::services::{Clock, IdGenerator, SystemClock, UuidIds};
use crate::storage::KeyValueStore;
use crate::task::{Category, Task, TaskId, TaskPatch, decode_tasks, encode_tasks};

pub const DEFAULT_STORAGE_KEY: &str = "todos";

/// Result of a mutation that addresses a task by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Unchanged,
}

impl Outcome {
    pub fn is_applied(self) -> bool {
        self == Outcome::Applied
    }
}

/// Owns the task collection, the current filter and the collaborators the
/// collection is persisted and reported through.
///
/// Every mutation writes the whole collection under the storage key before it
/// returns; the in-memory collection only changes once that write succeeded.
pub struct TaskStore {
    tasks: Vec<Task>,
    filter: FilterState,
    key: String,
    storage: Box<dyn KeyValueStore>,
    ids: Box<dyn IdGenerator>,
    clock: Box<dyn Clock>,
    notifier: Box<dyn Notifier>,
}

impl std::fmt::Debug for TaskStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskStore")
            .field("tasks", &self.tasks.len())
            .field("filter", &self.filter)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl TaskStore {
    pub fn open(storage: impl KeyValueStore + 'static) -> Self {
        Self::open_with_key(storage, DEFAULT_STORAGE_KEY)
    }

    #[tracing::instrument(skip(storage))]
    pub fn open_with_key(storage: impl KeyValueStore + 'static, key: &str) -> Self {
        let tasks = load_saved(&storage, key);
        info!(count = tasks.len(), "task store ready");

        Self {
            tasks,
            filter: FilterState::default(),
            key: key.to_string(),
            storage: Box::new(storage),
            ids: Box::new(UuidIds),
            clock: Box::new(SystemClock),
            notifier: Box::new(TracingNotifier),
        }
    }

    pub fn with_id_generator(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Box::new(ids);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| &task.id == id)
    }

    pub fn filter(&self) -> FilterState {
        self.filter
    }

    pub fn storage_key(&self) -> &str {
        &self.key
    }

    pub fn storage(&self) -> &dyn KeyValueStore {
        self.storage.as_ref()
    }

    /// Prepends a new task. Returns `None` without touching anything when
    /// the title is blank.
    #[tracing::instrument(skip(self, title, description))]
    pub fn add(
        &mut self,
        title: &str,
        description: Option<&str>,
        category: Category,
    ) -> anyhow::Result<Option<TaskId>> {
        let title = title.trim();
        if title.is_empty() {
            debug!("ignoring add with blank title");
            return Ok(None);
        }

        let task = Task::new(
            self.ids.next_id(),
            title.to_string(),
            description.map(|text| text.trim().to_string()),
            category,
            self.clock.now(),
        );
        let id = task.id.clone();

        let mut next = Vec::with_capacity(self.tasks.len() + 1);
        next.push(task);
        next.extend(self.tasks.iter().cloned());
        self.commit(next)?;

        info!(id = %id, "added task");
        self.announce("Task added successfully");
        Ok(Some(id))
    }

    #[tracing::instrument(skip(self, id), fields(id = %id))]
    pub fn toggle(&mut self, id: &TaskId) -> anyhow::Result<Outcome> {
        let Some(idx) = self.position(id) else {
            debug!("toggle of unknown task ignored");
            return Ok(Outcome::Unchanged);
        };

        let mut next = self.tasks.clone();
        next[idx].completed = !next[idx].completed;
        let completed = next[idx].completed;
        self.commit(next)?;

        info!(completed, "toggled task");
        Ok(Outcome::Applied)
    }

    #[tracing::instrument(skip(self, id), fields(id = %id))]
    pub fn delete(&mut self, id: &TaskId) -> anyhow::Result<Outcome> {
        let Some(idx) = self.position(id) else {
            debug!("delete of unknown task ignored");
            return Ok(Outcome::Unchanged);
        };

        let mut next = self.tasks.clone();
        next.remove(idx);
        self.commit(next)?;

        info!("deleted task");
        self.announce("Task removed");
        Ok(Outcome::Applied)
    }

    /// Overwrites the fields present in `patch`. The title is stored as
    /// given; blank-title checks belong to the caller.
    #[tracing::instrument(skip(self, id, patch), fields(id = %id))]
    pub fn edit(&mut self, id: &TaskId, patch: TaskPatch) -> anyhow::Result<Outcome> {
        let Some(idx) = self.position(id) else {
            debug!("edit of unknown task ignored");
            return Ok(Outcome::Unchanged);
        };

        let mut next = self.tasks.clone();
        patch.apply_to(&mut next[idx]);
        self.commit(next)?;

        info!(?patch, "edited task");
        self.announce("Task updated");
        Ok(Outcome::Applied)
    }

    pub fn set_filter(&mut self, patch: FilterPatch) {
        self.filter.merge(patch);
        debug!(status = %self.filter.status, category = %self.filter.category, "filter updated");
    }

    pub fn derived_view(&self) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|task| self.filter.matches(task))
            .collect()
    }

    pub fn counts(&self) -> Counts {
        Counts::tally(&self.tasks)
    }

    fn position(&self, id: &TaskId) -> Option<usize> {
        self.tasks.iter().position(|task| &task.id == id)
    }

    fn commit(&mut self, next: Vec<Task>) -> anyhow::Result<()> {
        let encoded = encode_tasks(&next)?;
        self.storage
            .set(&self.key, &encoded)
            .with_context(|| format!("failed to save tasks under key {:?}", self.key))?;
        debug!(count = next.len(), bytes = encoded.len(), "persisted tasks");
        self.tasks = next;
        Ok(())
    }

    fn announce(&self, message: &str) {
        if let Err(err) = self.notifier.notify(message, NotificationKind::Success) {
            warn!(error = %err, notice = message, "notification sink failed");
        }
    }
}

fn load_saved(storage: &dyn KeyValueStore, key: &str) -> Vec<Task> {
    let raw = match storage.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!(key, "no saved tasks");
            return Vec::new();
        }
        Err(err) => {
            error!(key, error = %format!("{err:#}"), "failed to read saved tasks; starting empty");
            return Vec::new();
        }
    };

    let tasks = match decode_tasks(&raw) {
        Ok(tasks) => tasks,
        Err(err) => {
            error!(key, error = %format!("{err:#}"), "failed to parse saved tasks; starting empty");
            return Vec::new();
        }
    };

    let mut seen = HashSet::with_capacity(tasks.len());
    let before = tasks.len();
    let kept: Vec<Task> = tasks
        .into_iter()
        .filter(|task| seen.insert(task.id.clone()))
        .collect();
    if kept.len() != before {
        warn!(
            key,
            dropped = before - kept.len(),
            "dropped saved tasks with duplicate ids"
        );
    }

    debug!(key, count = kept.len(), "restored saved tasks");
    kept
}
