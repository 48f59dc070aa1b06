use std::cmp::Ordering;
use std::fs::{self, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use log::debug;

use crate::error::{Result, TrackerError};
use crate::models::Task;

/// Returns the default path of the tasks database file (`tasks.json`).
///
/// The path is determined in the following order:
/// 1. `TASKS_DB` environment variable.
/// 2. `~/.local/share/timebox/tasks.json` (on Linux).
/// 3. `./tasks.json` (fallback).
pub fn default_db_path() -> PathBuf {
    std::env::var("TASKS_DB").map(PathBuf::from).unwrap_or_else(|_| {
        let mut p = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        p.push("timebox");
        p.push("tasks.json");
        p
    })
}

/// Path of another data file kept in the same directory as the database.
pub fn sibling_path(db: &Path, file_name: &str) -> PathBuf {
    let mut p = db.to_path_buf();
    p.pop();
    p.push(file_name);
    p
}

/// Persistent home of the task records.
///
/// Stores only need to hand out a full snapshot and replace it as a unit;
/// filtering and ordering happen in the query helpers below.
pub trait TaskStore {
    /// Loads every record, ordered by id.
    fn load(&self) -> Result<Vec<Task>>;

    /// Replaces the stored records with `tasks`, all or nothing.
    fn commit(&mut self, tasks: &[Task]) -> Result<()>;
}

/// Task store backed by a single JSON file.
#[derive(Debug, Clone)]
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    pub fn open(path: impl Into<PathBuf>) -> JsonStore {
        JsonStore { path: path.into() }
    }
}

/// Writes `contents` beside `path` and renames it into place, so readers never
/// see half a file. The temporary file is removed when any step fails.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);
    let written = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&tmp)
        .and_then(|mut f| {
            f.write_all(contents.as_bytes())?;
            f.sync_all()
        })
        .and_then(|()| fs::rename(&tmp, path));
    if written.is_err() && tmp.exists() {
        if let Err(e) = fs::remove_file(&tmp) {
            debug!("could not remove {}: {}", tmp.display(), e);
        }
    }
    written
}

impl TaskStore for JsonStore {
    fn load(&self) -> Result<Vec<Task>> {
        if !self.path.exists() {
            debug!("no task file at {}, starting empty", self.path.display());
            return Ok(Vec::new());
        }
        let unavailable = |source| TrackerError::StoreUnavailable {
            path: self.path.clone(),
            source,
        };
        let mut f = OpenOptions::new().read(true).open(&self.path).map_err(unavailable)?;
        let mut s = String::new();
        f.read_to_string(&mut s).map_err(unavailable)?;
        if s.trim().is_empty() {
            return Ok(Vec::new());
        }
        let mut tasks: Vec<Task> = serde_json::from_str(&s).map_err(|source| TrackerError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        tasks.sort_by_key(|t| t.id);
        debug!("loaded {} tasks from {}", tasks.len(), self.path.display());
        Ok(tasks)
    }

    fn commit(&mut self, tasks: &[Task]) -> Result<()> {
        let s = serde_json::to_string_pretty(tasks).map_err(TrackerError::Encode)?;
        write_atomic(&self.path, &s).map_err(|source| TrackerError::StoreUnavailable {
            path: self.path.clone(),
            source,
        })?;
        debug!("committed {} tasks to {}", tasks.len(), self.path.display());
        Ok(())
    }
}

/// Task store that lives only in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    tasks: Vec<Task>,
    commits: usize,
    fail_commits: bool,
}

impl MemoryStore {
    pub fn new(tasks: Vec<Task>) -> MemoryStore {
        MemoryStore {
            tasks,
            ..MemoryStore::default()
        }
    }

    /// Number of successful commits so far.
    pub fn commits(&self) -> usize {
        self.commits
    }

    /// Makes every following commit fail, as an unreachable disk would.
    pub fn fail_commits(&mut self, fail: bool) {
        self.fail_commits = fail;
    }
}

impl TaskStore for MemoryStore {
    fn load(&self) -> Result<Vec<Task>> {
        let mut tasks = self.tasks.clone();
        tasks.sort_by_key(|t| t.id);
        Ok(tasks)
    }

    fn commit(&mut self, tasks: &[Task]) -> Result<()> {
        if self.fail_commits {
            return Err(TrackerError::StoreUnavailable {
                path: PathBuf::from("<memory>"),
                source: io::Error::other("commit refused"),
            });
        }
        self.tasks = tasks.to_vec();
        self.commits += 1;
        Ok(())
    }
}

/// A unit of work over a task store.
///
/// Changes are made to a private snapshot and reach the store only through
/// [`Transaction::commit`]. Dropping the transaction without committing
/// discards them.
pub struct Transaction<'s, S: TaskStore + ?Sized> {
    store: &'s mut S,
    tasks: Vec<Task>,
    dirty: bool,
    finished: bool,
}

impl<'s, S: TaskStore + ?Sized> Transaction<'s, S> {
    pub fn begin(store: &'s mut S) -> Result<Transaction<'s, S>> {
        let tasks = store.load()?;
        Ok(Transaction {
            store,
            tasks,
            dirty: false,
            finished: false,
        })
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: u64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut Task> {
        let task = self.tasks.iter_mut().find(|t| t.id == id);
        if task.is_some() {
            self.dirty = true;
        }
        task
    }

    /// Adds a task under the next free id and returns that id.
    pub fn insert(&mut self, mut task: Task) -> u64 {
        let next_id = self.tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1;
        task.id = next_id;
        self.tasks.push(task);
        self.dirty = true;
        next_id
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Writes the snapshot back. A clean transaction leaves the store untouched.
    pub fn commit(mut self) -> Result<()> {
        self.finished = true;
        if !self.dirty {
            return Ok(());
        }
        self.store.commit(&self.tasks)
    }

    pub fn rollback(mut self) {
        self.finished = true;
        if self.dirty {
            debug!("rolled back transaction with pending changes");
        }
    }
}

impl<S: TaskStore + ?Sized> Drop for Transaction<'_, S> {
    fn drop(&mut self) {
        if !self.finished && self.dirty {
            debug!("transaction dropped without commit, discarding changes");
        }
    }
}

/// Orders by due date with absent dates after every present one, then by id.
pub fn by_due_nulls_last(a: &Task, b: &Task) -> Ordering {
    let by_due = match (a.due_date, b.due_date) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_due.then(a.id.cmp(&b.id))
}

pub fn find(tasks: &[Task], id: u64) -> Result<&Task> {
    tasks.iter().find(|t| t.id == id).ok_or(TrackerError::TaskNotFound(id))
}

/// Incomplete tasks due on or before `today`, earliest due first.
pub fn overdue(tasks: &[Task], today: NaiveDate) -> Vec<&Task> {
    let mut out: Vec<&Task> = tasks
        .iter()
        .filter(|t| !t.completed && t.due_date.is_some_and(|d| d <= today))
        .collect();
    out.sort_by(|a, b| by_due_nulls_last(a, b));
    out
}

/// Incomplete tasks without a due date or due after `today`, cheapest first.
pub fn upcoming(tasks: &[Task], today: NaiveDate) -> Vec<&Task> {
    let mut out: Vec<&Task> = tasks
        .iter()
        .filter(|t| !t.completed && t.due_date.map_or(true, |d| d > today))
        .collect();
    out.sort_by(|a, b| a.time_cost.cmp(&b.time_cost).then(a.id.cmp(&b.id)));
    out
}

/// Incomplete recurring tasks whose due date is strictly before `today`.
pub fn lapsed_recurring(tasks: &[Task], today: NaiveDate) -> Vec<&Task> {
    tasks
        .iter()
        .filter(|t| {
            !t.completed && t.recurring_interval.is_recurring() && t.due_date.is_some_and(|d| d < today)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Interval;
    use tempfile::tempdir;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    fn task(id: u64, cost: u32, due: Option<NaiveDate>) -> Task {
        let mut t = Task::new(format!("t{id}"), cost);
        t.id = id;
        t.due_date = due;
        t
    }

    #[test]
    fn nulls_sort_after_dates() {
        let mut tasks = vec![task(1, 5, None), task(2, 5, Some(day(9))), task(3, 5, Some(day(2)))];
        tasks.sort_by(by_due_nulls_last);
        let ids: Vec<u64> = tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn overdue_and_upcoming_partition_incomplete_tasks() {
        let mut done = task(4, 1, Some(day(1)));
        done.completed = true;
        let tasks = vec![
            task(1, 30, Some(day(10))),
            task(2, 10, None),
            task(3, 50, Some(day(10))),
            done,
            task(5, 20, Some(day(11))),
        ];
        let over: Vec<u64> = overdue(&tasks, day(10)).iter().map(|t| t.id).collect();
        let up: Vec<u64> = upcoming(&tasks, day(10)).iter().map(|t| t.id).collect();
        assert_eq!(over, vec![1, 3]);
        assert_eq!(up, vec![2, 5]);
    }

    #[test]
    fn lapsed_recurring_skips_one_off_and_current_tasks() {
        let mut weekly = task(1, 5, Some(day(1)));
        weekly.recurring_interval = Interval::Weekly;
        let mut current = task(2, 5, Some(day(5)));
        current.recurring_interval = Interval::Daily;
        let one_off = task(3, 5, Some(day(1)));
        let tasks = vec![weekly, current, one_off];
        let ids: Vec<u64> = lapsed_recurring(&tasks, day(5)).iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn json_store_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = JsonStore::open(dir.path().join("nested").join("tasks.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn json_store_commit_then_load() {
        let dir = tempdir().unwrap();
        let mut store = JsonStore::open(dir.path().join("nested").join("tasks.json"));
        store.commit(&[task(2, 15, Some(day(3))), task(1, 5, None)]).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, 1);
        assert!(!dir.path().join("nested").join("tasks.json.tmp").exists());
    }

    #[test]
    fn json_store_reports_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        fs::write(&path, "{ not json").unwrap();
        let err = JsonStore::open(&path).load().unwrap_err();
        assert!(matches!(err, TrackerError::Corrupt { .. }));
    }

    #[test]
    fn json_store_reports_unreadable_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        fs::create_dir(&path).unwrap();
        let err = JsonStore::open(&path).load().unwrap_err();
        assert!(matches!(err, TrackerError::StoreUnavailable { .. }));
    }

    #[test]
    fn failed_commit_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("occupied"), "x").unwrap();

        let mut store = JsonStore::open(&path);
        let err = store.commit(&[task(1, 5, None)]).unwrap_err();
        assert!(matches!(err, TrackerError::StoreUnavailable { .. }));
        assert!(!dir.path().join("tasks.json.tmp").exists());
    }

    #[test]
    fn rollback_discards_pending_changes() {
        let mut store = MemoryStore::new(vec![task(1, 5, None), task(2, 8, None)]);
        let mut txn = Transaction::begin(&mut store).unwrap();
        assert!(!txn.is_dirty());
        txn.get_mut(2).unwrap().title = "renamed".into();
        assert!(txn.is_dirty());
        assert_eq!(txn.get(2).unwrap().title, "renamed");
        assert!(txn.get(3).is_none());
        txn.rollback();

        assert_eq!(store.commits(), 0);
        assert_eq!(find(&store.load().unwrap(), 2).unwrap().title, "t2");
    }

    #[test]
    fn dropped_transaction_discards_changes() {
        let mut store = MemoryStore::new(vec![task(1, 5, None)]);
        {
            let mut txn = Transaction::begin(&mut store).unwrap();
            txn.get_mut(1).unwrap().time_cost = 99;
            txn.insert(task(0, 1, None));
        }
        let tasks = store.load().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].time_cost, 5);
        assert_eq!(store.commits(), 0);
    }

    #[test]
    fn insert_assigns_next_id() {
        let mut store = MemoryStore::new(vec![task(7, 5, None)]);
        let mut txn = Transaction::begin(&mut store).unwrap();
        let id = txn.insert(task(0, 3, None));
        txn.commit().unwrap();
        assert_eq!(id, 8);
        assert_eq!(store.load().unwrap().len(), 2);
    }

    #[test]
    fn clean_commit_does_not_touch_store() {
        let mut store = MemoryStore::new(vec![task(1, 5, None)]);
        let txn = Transaction::begin(&mut store).unwrap();
        txn.commit().unwrap();
        assert_eq!(store.commits(), 0);
    }
}
