use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::Config;
use crate::error::{Result, StorageError, TrackerError};
use crate::models::{Event, Task, Template};

const TASKS_FILE: &str = "tasks.json";
const TEMPLATES_FILE: &str = "templates.json";
const EVENTS_FILE: &str = "events.json";

/// Handle to the task, template and event stores.
///
/// Each store is a JSON array in the data directory. Every
/// read-modify-write runs under `write_lock` and replaces the file via
/// rename, so a reader never observes a half-written file.
pub struct Store {
    dir: PathBuf,
    write_lock: Mutex<()>,
    generation_locks: Mutex<HashMap<NaiveDate, Arc<Mutex<()>>>>,
}

impl Store {
    /// Opens the store in the configured data directory, creating it if needed.
    pub fn open(config: &Config) -> Result<Store> {
        let dir = config.data_dir.clone();
        fs::create_dir_all(&dir).map_err(|source| io_error(&dir, source))?;
        tracing::debug!(dir = %dir.display(), "store opened");
        Ok(Store {
            dir,
            write_lock: Mutex::new(()),
            generation_locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.dir
    }

    /// Lock serializing template expansion for one date.
    ///
    /// Callers hold the returned mutex for the whole check-and-insert.
    pub fn generation_lock(&self, date: NaiveDate) -> Result<Arc<Mutex<()>>> {
        let mut locks = self
            .generation_locks
            .lock()
            .map_err(|_| StorageError::Poisoned)?;
        Ok(locks.entry(date).or_default().clone())
    }

    /// Hands back a lock from `generation_lock`, dropping the date's entry
    /// once no other caller holds it.
    pub fn release_generation_lock(&self, date: NaiveDate, lock: Arc<Mutex<()>>) -> Result<()> {
        let mut locks = self
            .generation_locks
            .lock()
            .map_err(|_| StorageError::Poisoned)?;
        drop(lock);
        if locks.get(&date).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(&date);
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn generation_lock_count(&self) -> usize {
        self.generation_locks.lock().map(|l| l.len()).unwrap_or(0)
    }

    /// Returns every task matching `filter`, in insertion order.
    pub fn find_tasks(&self, filter: impl Fn(&Task) -> bool) -> Result<Vec<Task>> {
        let tasks: Vec<Task> = self.load(TASKS_FILE)?;
        Ok(tasks.into_iter().filter(|t| filter(t)).collect())
    }

    /// Loads a single task by its ID.
    pub fn find_task(&self, id: &str) -> Result<Option<Task>> {
        Ok(self.find_tasks(|t| t.id == id)?.into_iter().next())
    }

    /// Inserts tasks in a single write.
    ///
    /// Rejects the whole batch if any task would duplicate an id or a
    /// `(template_id, scheduled_date)` pair already present.
    pub fn insert_tasks(&self, new_tasks: Vec<Task>) -> Result<()> {
        let _guard = self.lock_writes()?;
        let mut tasks: Vec<Task> = self.load(TASKS_FILE)?;
        for (i, task) in new_tasks.iter().enumerate() {
            let earlier = tasks.iter().chain(new_tasks[..i].iter());
            for existing in earlier {
                if existing.id == task.id {
                    return Err(TrackerError::invalid(format!(
                        "task id {} already exists",
                        task.id
                    )));
                }
                if task.template_id.is_some()
                    && task.scheduled_date.is_some()
                    && existing.template_id == task.template_id
                    && existing.scheduled_date == task.scheduled_date
                {
                    return Err(TrackerError::invalid(format!(
                        "template {} already has a task on {}",
                        task.template_id.as_deref().unwrap_or_default(),
                        task.scheduled_date.map(|d| d.to_string()).unwrap_or_default()
                    )));
                }
            }
        }
        tasks.extend(new_tasks);
        self.save(TASKS_FILE, &tasks)
    }

    /// Removes a task and every event recorded against it.
    ///
    /// Both files are rewritten under one hold of `write_lock`, so no event
    /// can be inserted for the task in between. Events are written first: a
    /// failed task write leaves a task whose delete can be retried, never
    /// orphaned events. Returns the number of events removed, or `None` if
    /// the task does not exist.
    pub fn delete_task(&self, id: &str) -> Result<Option<usize>> {
        let _guard = self.lock_writes()?;
        let mut tasks: Vec<Task> = self.load(TASKS_FILE)?;
        let len_before = tasks.len();
        tasks.retain(|t| t.id != id);
        if tasks.len() == len_before {
            return Ok(None);
        }
        let removed = self.remove_events(id)?;
        self.save(TASKS_FILE, &tasks)?;
        Ok(Some(removed))
    }

    pub fn find_templates(&self, filter: impl Fn(&Template) -> bool) -> Result<Vec<Template>> {
        let templates: Vec<Template> = self.load(TEMPLATES_FILE)?;
        Ok(templates.into_iter().filter(|t| filter(t)).collect())
    }

    pub fn insert_template(&self, template: Template) -> Result<()> {
        let _guard = self.lock_writes()?;
        let mut templates: Vec<Template> = self.load(TEMPLATES_FILE)?;
        if templates.iter().any(|t| t.id == template.id) {
            return Err(TrackerError::invalid(format!(
                "template id {} already exists",
                template.id
            )));
        }
        templates.push(template);
        self.save(TEMPLATES_FILE, &templates)
    }

    pub fn delete_template(&self, id: &str) -> Result<bool> {
        let _guard = self.lock_writes()?;
        let mut templates: Vec<Template> = self.load(TEMPLATES_FILE)?;
        let len_before = templates.len();
        templates.retain(|t| t.id != id);
        if templates.len() == len_before {
            return Ok(false);
        }
        self.save(TEMPLATES_FILE, &templates)?;
        Ok(true)
    }

    pub fn find_events(&self, filter: impl Fn(&Event) -> bool) -> Result<Vec<Event>> {
        let events: Vec<Event> = self.load(EVENTS_FILE)?;
        Ok(events.into_iter().filter(|e| filter(e)).collect())
    }

    /// Folds over the events matching `filter` without collecting them.
    pub fn fold_events<A>(
        &self,
        filter: impl Fn(&Event) -> bool,
        init: A,
        f: impl FnMut(A, &Event) -> A,
    ) -> Result<A> {
        let events: Vec<Event> = self.load(EVENTS_FILE)?;
        Ok(events.iter().filter(|e| filter(e)).fold(init, f))
    }

    /// Appends an event. Fails with `NotFound` if its task is gone, checked
    /// under the same lock that task deletion holds.
    pub fn insert_event(&self, event: Event) -> Result<()> {
        let _guard = self.lock_writes()?;
        let tasks: Vec<Task> = self.load(TASKS_FILE)?;
        if !tasks.iter().any(|t| t.id == event.task_id) {
            return Err(TrackerError::task_not_found(&event.task_id));
        }
        let mut events: Vec<Event> = self.load(EVENTS_FILE)?;
        events.push(event);
        self.save(EVENTS_FILE, &events)
    }

    /// Deletes every event of a task. Returns how many were removed.
    pub fn delete_events_for_task(&self, task_id: &str) -> Result<usize> {
        let _guard = self.lock_writes()?;
        self.remove_events(task_id)
    }

    /// Caller holds `write_lock`.
    fn remove_events(&self, task_id: &str) -> Result<usize> {
        let mut events: Vec<Event> = self.load(EVENTS_FILE)?;
        let len_before = events.len();
        events.retain(|e| e.task_id != task_id);
        let removed = len_before - events.len();
        if removed > 0 {
            self.save(EVENTS_FILE, &events)?;
        }
        Ok(removed)
    }

    fn lock_writes(&self) -> Result<MutexGuard<'_, ()>> {
        Ok(self.write_lock.lock().map_err(|_| StorageError::Poisoned)?)
    }

    /// Reads a store file. A missing file is an empty store.
    fn load<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>> {
        let path = self.dir.join(file);
        let data = match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(io_error(&path, source).into()),
        };
        if data.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&data).map_err(|source| {
            tracing::error!(path = %path.display(), error = %source, "corrupt store file");
            StorageError::Corrupt { path, source }.into()
        })
    }

    /// Overwrites a store file via a temporary sibling and rename.
    fn save<T: Serialize>(&self, file: &str, records: &[T]) -> Result<()> {
        let path = self.dir.join(file);
        let tmp = self.dir.join(format!("{}.tmp", file));
        let s = serde_json::to_string_pretty(records).map_err(|source| StorageError::Corrupt {
            path: path.clone(),
            source,
        })?;
        fs::write(&tmp, s).map_err(|source| io_error(&tmp, source))?;
        fs::rename(&tmp, &path).map_err(|source| io_error(&path, source))?;
        Ok(())
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StorageError {
    tracing::error!(path = %path.display(), error = %source, "store I/O failed");
    StorageError::Io { path: path.to_path_buf(), source }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn task(id: &str, template_id: Option<&str>, date: Option<NaiveDate>) -> Task {
        Task {
            id: id.into(),
            name: "t".into(),
            color: crate::models::DEFAULT_COLOR.into(),
            metric: crate::models::MetricType::Count,
            goal: None,
            template_id: template_id.map(String::from),
            scheduled_date: date,
            created_at: Utc::now(),
        }
    }

    fn event(task_id: &str) -> Event {
        Event {
            id: uuid::Uuid::new_v4().to_string(),
            task_id: task_id.into(),
            kind: crate::models::EventType::Increment,
            value: None,
            at: Utc::now(),
        }
    }

    #[test]
    fn missing_files_read_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(&Config::with_data_dir(dir.path())).unwrap();
        assert!(store.find_tasks(|_| true).unwrap().is_empty());
        assert!(store.find_events(|_| true).unwrap().is_empty());
        assert!(store.find_templates(|_| true).unwrap().is_empty());
    }

    #[test]
    fn rejects_duplicate_template_date_pair() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(&Config::with_data_dir(dir.path())).unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        store.insert_tasks(vec![task("a", Some("tpl"), Some(day))]).unwrap();

        let err = store.insert_tasks(vec![task("b", Some("tpl"), Some(day))]).unwrap_err();
        assert!(matches!(err, TrackerError::InvalidInput(_)));
        assert_eq!(store.find_tasks(|_| true).unwrap().len(), 1);

        // Ad-hoc tasks on the same day are fine.
        store
            .insert_tasks(vec![task("c", None, Some(day)), task("d", None, Some(day))])
            .unwrap();
        assert_eq!(store.find_tasks(|_| true).unwrap().len(), 3);
    }

    #[test]
    fn corrupt_file_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(TASKS_FILE), "{not json").unwrap();
        let store = Store::open(&Config::with_data_dir(dir.path())).unwrap();
        let err = store.find_tasks(|_| true).unwrap_err();
        assert!(matches!(err, TrackerError::Storage(StorageError::Corrupt { .. })));
        assert_eq!(err.to_string(), "storage operation failed");
    }

    #[test]
    fn generation_lock_entry_dropped_after_last_release() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(&Config::with_data_dir(dir.path())).unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();

        let first = store.generation_lock(day).unwrap();
        let second = store.generation_lock(day).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        store.release_generation_lock(day, first).unwrap();
        assert_eq!(store.generation_lock_count(), 1);
        store.release_generation_lock(day, second).unwrap();
        assert_eq!(store.generation_lock_count(), 0);
    }

    #[test]
    fn delete_task_takes_its_events_along() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(&Config::with_data_dir(dir.path())).unwrap();
        store.insert_tasks(vec![task("a", None, None), task("b", None, None)]).unwrap();
        for task_id in ["a", "a", "b"] {
            store.insert_event(event(task_id)).unwrap();
        }

        assert_eq!(store.delete_task("a").unwrap(), Some(2));
        assert_eq!(store.delete_task("a").unwrap(), None);
        let left = store.find_events(|_| true).unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].task_id, "b");

        // Clearing events alone keeps the task.
        assert_eq!(store.delete_events_for_task("b").unwrap(), 1);
        assert!(store.find_task("b").unwrap().is_some());
    }

    #[test]
    fn insert_event_requires_existing_task() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(&Config::with_data_dir(dir.path())).unwrap();
        let err = store.insert_event(event("gone")).unwrap_err();
        assert!(matches!(err, TrackerError::NotFound { kind: "task", .. }));
        assert!(store.find_events(|_| true).unwrap().is_empty());
    }
}
