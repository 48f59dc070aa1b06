use chrono::{Days, NaiveDate};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::models::{Task, TaskSummary};
use crate::store::{overdue, upcoming};

/// What to work on today, and what to be reminded about.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct DailyPlan {
    /// Overdue tasks first (earliest due first), then the upcoming tasks that fit.
    #[serde(rename = "tasks")]
    pub chosen: Vec<TaskSummary>,
    /// Upcoming tasks whose reminder window has opened.
    #[serde(rename = "notifs")]
    pub notifications: Vec<TaskSummary>,
    /// Minutes of work in `chosen`. Can exceed the budget when overdue work does.
    #[serde(skip)]
    pub total_minutes: u32,
    #[serde(skip)]
    pub budget_minutes: u32,
}

/// Picks today's tasks for a budget of `budget_minutes`.
///
/// - Every incomplete task due on or before `today` is chosen, whatever the budget.
/// - The remaining incomplete tasks are walked cheapest first and added while
///   they fit; the walk stops at the first one that does not.
/// - Reminders come from the same cheapest-first list. The scan ends at the
///   first task without a due date, so a dated task that sorts after it is
///   never flagged.
pub fn select(budget_minutes: u32, today: NaiveDate, tasks: &[Task]) -> DailyPlan {
    let mut chosen = Vec::new();
    let mut total: u32 = 0;

    for task in overdue(tasks, today) {
        total = total.saturating_add(task.time_cost);
        chosen.push(task.summary());
    }

    let candidates = upcoming(tasks, today);
    for task in &candidates {
        let next = total.saturating_add(task.time_cost);
        if next > budget_minutes {
            debug!("task {} ({} min) does not fit, {} of {} used", task.id, task.time_cost, total, budget_minutes);
            break;
        }
        total = next;
        chosen.push(task.summary());
    }

    let mut notifications = Vec::new();
    for task in &candidates {
        let Some(due) = task.due_date else {
            break;
        };
        if reminder_open(due, task.reminder_lead_days, today) {
            notifications.push(task.summary());
        }
    }

    DailyPlan {
        chosen,
        notifications,
        total_minutes: total,
        budget_minutes,
    }
}

/// True once `today` has reached `lead_days` before `due`.
fn reminder_open(due: NaiveDate, lead_days: u32, today: NaiveDate) -> bool {
    match due.checked_sub_days(Days::new(u64::from(lead_days))) {
        Some(opens) => today >= opens,
        // Window starts before the earliest representable date.
        None => true,
    }
}
