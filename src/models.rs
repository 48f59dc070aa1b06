use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::TrackerError;

/// How often a task repeats.
///
/// Stored as its integer code (`0..=3`) so files stay compatible with the
/// numeric column the tracker has always used.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(try_from = "u8", into = "u8")]
pub enum Interval {
    #[default]
    Never,
    Daily,
    Weekly,
    Monthly,
}

impl Interval {
    /// Cycle length in days, `None` for tasks that do not recur.
    ///
    /// A month is counted as a fixed 30 days.
    pub fn cycle_days(self) -> Option<u64> {
        match self {
            Interval::Never => None,
            Interval::Daily => Some(1),
            Interval::Weekly => Some(7),
            Interval::Monthly => Some(30),
        }
    }

    pub fn is_recurring(self) -> bool {
        self != Interval::Never
    }

    pub fn name(self) -> &'static str {
        match self {
            Interval::Never => "never",
            Interval::Daily => "daily",
            Interval::Weekly => "weekly",
            Interval::Monthly => "monthly",
        }
    }
}

impl From<Interval> for u8 {
    fn from(interval: Interval) -> u8 {
        match interval {
            Interval::Never => 0,
            Interval::Daily => 1,
            Interval::Weekly => 2,
            Interval::Monthly => 3,
        }
    }
}

impl TryFrom<u8> for Interval {
    type Error = TrackerError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Interval::Never),
            1 => Ok(Interval::Daily),
            2 => Ok(Interval::Weekly),
            3 => Ok(Interval::Monthly),
            other => Err(TrackerError::InvalidInterval(other.to_string())),
        }
    }
}

impl FromStr for Interval {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(code) = s.parse::<u8>() {
            return Interval::try_from(code);
        }
        match s.to_lowercase().as_str() {
            "never" | "none" => Ok(Interval::Never),
            "daily" => Ok(Interval::Daily),
            "weekly" => Ok(Interval::Weekly),
            "monthly" => Ok(Interval::Monthly),
            _ => Err(TrackerError::InvalidInterval(s.to_string())),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Represents a single task in the tracker.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Task {
    /// Unique identifier, assigned by the store.
    pub id: u64,
    /// Short name of the task.
    pub title: String,
    /// Optional free-form notes.
    #[serde(default)]
    pub description: Option<String>,
    /// Repeat cycle. When not `Never`, `due_date` is the anchor of the cycle.
    #[serde(default)]
    pub recurring_interval: Interval,
    /// Due date, or cycle anchor for recurring tasks.
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// Time of day the task is due, independent of the date.
    #[serde(default)]
    pub due_time: Option<NaiveTime>,
    /// Minutes needed to finish the task.
    pub time_cost: u32,
    /// Days before `due_date` at which a reminder fires.
    #[serde(default)]
    pub reminder_lead_days: u32,
    /// Whether the task has been completed.
    #[serde(default)]
    pub completed: bool,
    /// Set on creation, refreshed on edit.
    pub created: DateTime<Local>,
}

impl Task {
    /// Builds a new, not yet stored task. The id is assigned on insert.
    pub fn new(title: impl Into<String>, time_cost: u32) -> Task {
        Task {
            id: 0,
            title: title.into(),
            description: None,
            recurring_interval: Interval::Never,
            due_date: None,
            due_time: None,
            time_cost,
            reminder_lead_days: 0,
            completed: false,
            created: Local::now(),
        }
    }

    /// Checks the field invariants enforced on create and edit.
    pub fn validate(&self) -> Result<(), TrackerError> {
        if self.title.trim().is_empty() {
            return Err(TrackerError::EmptyTitle);
        }
        if self.time_cost == 0 {
            return Err(TrackerError::InvalidTimeCost);
        }
        if self.recurring_interval.is_recurring() && self.due_date.is_none() {
            return Err(TrackerError::MissingAnchor);
        }
        Ok(())
    }

    pub fn summary(&self) -> TaskSummary {
        TaskSummary {
            id: self.id,
            title: self.title.clone(),
            due_date: self.due_date,
            due_time: self.due_time,
            time_cost: self.time_cost,
        }
    }
}

/// The shape a task takes in selector output.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TaskSummary {
    pub id: u64,
    pub title: String,
    pub due_date: Option<NaiveDate>,
    pub due_time: Option<NaiveTime>,
    pub time_cost: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_serializes_as_code() {
        let json = serde_json::to_string(&Interval::Weekly).unwrap();
        assert_eq!(json, "2");
        let back: Interval = serde_json::from_str("3").unwrap();
        assert_eq!(back, Interval::Monthly);
    }

    #[test]
    fn interval_rejects_out_of_range_code() {
        assert!(serde_json::from_str::<Interval>("4").is_err());
        assert!(matches!(Interval::try_from(9), Err(TrackerError::InvalidInterval(_))));
    }

    #[test]
    fn interval_parses_names_and_codes() {
        assert_eq!("Weekly".parse::<Interval>().unwrap(), Interval::Weekly);
        assert_eq!("1".parse::<Interval>().unwrap(), Interval::Daily);
        assert!("fortnightly".parse::<Interval>().is_err());
    }

    #[test]
    fn recurring_task_needs_anchor() {
        let mut t = Task::new("Water plants", 5);
        t.recurring_interval = Interval::Daily;
        assert!(matches!(t.validate(), Err(TrackerError::MissingAnchor)));
        t.due_date = NaiveDate::from_ymd_opt(2025, 3, 1);
        assert!(t.validate().is_ok());
    }

    #[test]
    fn blank_title_and_zero_cost_are_rejected() {
        assert!(matches!(Task::new("  ", 10).validate(), Err(TrackerError::EmptyTitle)));
        assert!(matches!(Task::new("x", 0).validate(), Err(TrackerError::InvalidTimeCost)));
    }

    #[test]
    fn reads_record_without_optional_fields() {
        let json = r#"{"id":4,"title":"Call bank","time_cost":15,"created":"2025-01-02T09:00:00+00:00"}"#;
        let t: Task = serde_json::from_str(json).unwrap();
        assert_eq!(t.recurring_interval, Interval::Never);
        assert_eq!(t.reminder_lead_days, 0);
        assert!(t.due_date.is_none());
        assert!(!t.completed);
    }
}
