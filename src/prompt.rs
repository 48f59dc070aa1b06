//! Text surface for the daily prompt: reading the user's budget reply,
//! rendering the plan as a message, and keeping the named daily prompt job.

use std::fs::OpenOptions;
use std::io::Read;
use std::path::Path;

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};
use crate::models::TaskSummary;
use crate::selector::DailyPlan;
use crate::store::write_atomic;

pub const PROMPT_MESSAGE: &str = "How much time for today (in minutes)?";

const FORMAT_HINT: &str = "Make sure the time is in the format HH:MM.";
const RANGE_HINT: &str = "Make sure the time is in a valid 24 hour format.";

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

/// Reads a budget reply such as `"90"`.
pub fn parse_budget(text: &str) -> Result<u32> {
    let text = text.trim();
    if !all_digits(text) {
        return Err(TrackerError::InvalidBudget);
    }
    text.parse().map_err(|_| TrackerError::InvalidBudget)
}

/// Reads a prompt time such as `"7:30"`: two numeric fields, 24 hour clock.
pub fn parse_prompt_time(text: &str) -> Result<NaiveTime> {
    let parts: Vec<&str> = text.trim().split(':').collect();
    if parts.len() != 2 || !parts.iter().all(|p| all_digits(p)) {
        return Err(TrackerError::InvalidPromptTime(FORMAT_HINT.to_string()));
    }
    let out_of_range = || TrackerError::InvalidPromptTime(RANGE_HINT.to_string());
    let hour: u32 = parts[0].parse().map_err(|_| out_of_range())?;
    let minute: u32 = parts[1].parse().map_err(|_| out_of_range())?;
    if hour > 23 || minute > 59 {
        return Err(out_of_range());
    }
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(out_of_range)
}

fn days_word(n: i64) -> &'static str {
    if n == 1 {
        "day"
    } else {
        "days"
    }
}

/// "Due TODAY", "Due 3 days ago" or "Due in 1 day".
pub fn relative_due(due: NaiveDate, today: NaiveDate) -> String {
    let diff = (due - today).num_days();
    if diff < 0 {
        format!("Due {} {} ago", -diff, days_word(-diff))
    } else if diff == 0 {
        "Due TODAY".to_string()
    } else {
        format!("Due in {} {}", diff, days_word(diff))
    }
}

/// 12 hour rendering, e.g. `00:05` -> `12:05 AM`, `13:40` -> `1:40 PM`.
pub fn clock_12h(time: NaiveTime) -> String {
    let meridiem = if time.hour() >= 12 { "PM" } else { "AM" };
    let hour = match time.hour() {
        0 => 12,
        h if h > 12 => h - 12,
        h => h,
    };
    format!("{}:{:02} {}", hour, time.minute(), meridiem)
}

pub fn edit_link(base_url: &str, id: u64) -> String {
    format!("{}/edit/{}", base_url.trim_end_matches('/'), id)
}

fn due_line(task: &TaskSummary, today: NaiveDate) -> Option<String> {
    let due = task.due_date?;
    let mut line = relative_due(due, today);
    if let Some(time) = task.due_time {
        line.push_str(" at ");
        line.push_str(&clock_12h(time));
    }
    Some(line)
}

/// Renders a plan as the reply to a budget message.
pub fn render_plan(plan: &DailyPlan, today: NaiveDate, base_url: &str) -> String {
    let mut msg = String::from("List of tasks:\n");
    if plan.chosen.is_empty() {
        msg.push_str("Nothing fits today.\n\n");
    }
    for task in &plan.chosen {
        msg.push_str(&format!(
            "Task Name: {} ({}) - {} minutes\n",
            task.title,
            edit_link(base_url, task.id),
            task.time_cost
        ));
        if let Some(line) = due_line(task, today) {
            msg.push_str(&line);
            msg.push('\n');
        }
        msg.push('\n');
    }
    msg.push_str(&format!("Total: {} of {} minutes\n", plan.total_minutes, plan.budget_minutes));
    if !plan.notifications.is_empty() {
        msg.push_str("\nReminders:\n");
        for task in &plan.notifications {
            match due_line(task, today) {
                Some(line) => msg.push_str(&format!("- {} ({})\n", task.title, line)),
                None => msg.push_str(&format!("- {}\n", task.title)),
            }
        }
    }
    msg
}

/// A prompt sent every day at `time`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PromptJob {
    pub name: String,
    pub time: NaiveTime,
    pub message: String,
}

impl PromptJob {
    /// Next time the job fires at or after `now`.
    pub fn next_fire(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        let today = now.date().and_time(self.time);
        if today >= now {
            return Some(today);
        }
        now.date().checked_add_days(Days::new(1)).map(|d| d.and_time(self.time))
    }
}

/// The set of daily prompt jobs, stored as JSON beside the task database.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct PromptSchedule {
    jobs: Vec<PromptJob>,
}

impl PromptSchedule {
    /// Loads the schedule; a missing file is an empty schedule.
    pub fn load(path: &Path) -> Result<PromptSchedule> {
        if !path.exists() {
            return Ok(PromptSchedule::default());
        }
        let unavailable = |source| TrackerError::StoreUnavailable {
            path: path.to_path_buf(),
            source,
        };
        let mut f = OpenOptions::new().read(true).open(path).map_err(unavailable)?;
        let mut s = String::new();
        f.read_to_string(&mut s).map_err(unavailable)?;
        serde_json::from_str(&s).map_err(|source| TrackerError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let s = serde_json::to_string_pretty(self).map_err(TrackerError::Encode)?;
        write_atomic(path, &s).map_err(|source| TrackerError::StoreUnavailable {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn jobs(&self) -> &[PromptJob] {
        &self.jobs
    }

    pub fn job(&self, name: &str) -> Option<&PromptJob> {
        self.jobs.iter().find(|j| j.name == name)
    }

    /// Replaces every job called `name` with one daily job at `time_text`.
    ///
    /// The time is validated first; an invalid time leaves the schedule as it was.
    pub fn set_daily(&mut self, name: &str, time_text: &str) -> Result<&PromptJob> {
        let time = parse_prompt_time(time_text)?;
        let removed = self.jobs.iter().filter(|j| j.name == name).count();
        self.jobs.retain(|j| j.name != name);
        info!("prompt job '{}' set to {} (replaced {})", name, time.format("%H:%M"), removed);
        self.jobs.push(PromptJob {
            name: name.to_string(),
            time,
            message: PROMPT_MESSAGE.to_string(),
        });
        Ok(&self.jobs[self.jobs.len() - 1])
    }

    /// Adds the default job when none named `name` exists yet.
    pub fn ensure_default(&mut self, name: &str, time: NaiveTime) -> bool {
        if self.job(name).is_some() {
            return false;
        }
        self.jobs.push(PromptJob {
            name: name.to_string(),
            time,
            message: PROMPT_MESSAGE.to_string(),
        });
        true
    }
}
