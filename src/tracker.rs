use chrono::{Local, NaiveDate, NaiveTime};
use log::{debug, info};

use crate::error::{Result, TrackerError};
use crate::models::{Interval, Task};
use crate::rescheduler::{reschedule, Rollover};
use crate::selector::{select, DailyPlan};
use crate::store::{by_due_nulls_last, find, TaskStore, Transaction};

/// Changes to apply to an existing task. `None` leaves a field as it is.
#[derive(Debug, Clone, Default)]
pub struct TaskEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub recurring_interval: Option<Interval>,
    pub due_date: Option<NaiveDate>,
    pub clear_due_date: bool,
    pub due_time: Option<NaiveTime>,
    pub clear_due_time: bool,
    pub time_cost: Option<u32>,
    pub reminder_lead_days: Option<u32>,
    pub completed: Option<bool>,
}

impl TaskEdit {
    fn apply(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = if description.is_empty() { None } else { Some(description) };
        }
        if let Some(interval) = self.recurring_interval {
            task.recurring_interval = interval;
        }
        if self.clear_due_date {
            task.due_date = None;
        }
        if let Some(due) = self.due_date {
            task.due_date = Some(due);
        }
        if self.clear_due_time {
            task.due_time = None;
        }
        if let Some(time) = self.due_time {
            task.due_time = Some(time);
        }
        if let Some(cost) = self.time_cost {
            task.time_cost = cost;
        }
        if let Some(days) = self.reminder_lead_days {
            task.reminder_lead_days = days;
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
    }
}

/// The tracker service. Built once at startup around a task store and handed
/// to whichever front end drives it.
#[derive(Debug)]
pub struct Tracker<S: TaskStore> {
    store: S,
}

impl<S: TaskStore> Tracker<S> {
    pub fn new(store: S) -> Tracker<S> {
        Tracker { store }
    }

    pub fn task(&self, id: u64) -> Result<Task> {
        let tasks = self.store.load()?;
        find(&tasks, id).cloned()
    }

    /// Tasks by due date (undated last), then id. Completed tasks only with `all`.
    pub fn list(&self, all: bool) -> Result<Vec<Task>> {
        let mut tasks = self.store.load()?;
        if !all {
            tasks.retain(|t| !t.completed);
        }
        tasks.sort_by(by_due_nulls_last);
        Ok(tasks)
    }

    /// Today's work for `budget_minutes` and the reminders that are due.
    pub fn daily_plan(&self, budget_minutes: u32, today: NaiveDate) -> Result<DailyPlan> {
        let tasks = self.store.load()?;
        let plan = select(budget_minutes, today, &tasks);
        debug!(
            "plan for {}: {} chosen ({} of {} min), {} reminders",
            today,
            plan.chosen.len(),
            plan.total_minutes,
            budget_minutes,
            plan.notifications.len()
        );
        Ok(plan)
    }

    /// Moves every lapsed recurring task to its next occurrence, as one batch.
    pub fn roll_forward(&mut self, today: NaiveDate) -> Result<Vec<Rollover>> {
        let mut txn = Transaction::begin(&mut self.store)?;
        let rolled = reschedule(&mut txn, today)?;
        txn.commit()?;
        if !rolled.is_empty() {
            info!("rolled {} recurring tasks forward", rolled.len());
        }
        Ok(rolled)
    }

    /// Stores a new task and returns its id.
    pub fn add(&mut self, mut task: Task) -> Result<u64> {
        task.validate()?;
        task.created = Local::now();
        let mut txn = Transaction::begin(&mut self.store)?;
        let id = txn.insert(task);
        txn.commit()?;
        info!("added task {}", id);
        Ok(id)
    }

    pub fn edit(&mut self, id: u64, edit: TaskEdit) -> Result<Task> {
        let mut txn = Transaction::begin(&mut self.store)?;
        let task = txn.get_mut(id).ok_or(TrackerError::TaskNotFound(id))?;
        edit.apply(task);
        task.validate()?;
        task.created = Local::now();
        let updated = task.clone();
        txn.commit()?;
        Ok(updated)
    }

    pub fn complete(&mut self, id: u64) -> Result<Task> {
        self.edit(
            id,
            TaskEdit {
                completed: Some(true),
                ..TaskEdit::default()
            },
        )
    }
}
