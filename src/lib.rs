pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod prompt;
pub mod rescheduler;
pub mod selector;
pub mod store;
pub mod tracker;
pub mod tui;

pub use error::{Result, TrackerError};
pub use models::{Interval, Task, TaskSummary};
pub use selector::{select, DailyPlan};
pub use tracker::Tracker;
