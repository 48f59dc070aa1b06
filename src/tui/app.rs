use chrono::{Local, NaiveDate};
use ratatui::widgets::TableState;

use crate::config::Config;
use crate::prompt::parse_budget;
use crate::selector::DailyPlan;
use crate::store::TaskStore;
use crate::tracker::Tracker;

/// Minutes added or removed by `+` and `-`.
pub const BUDGET_STEP: u32 = 15;

#[derive(PartialEq, Debug)]
pub enum InputMode {
    Normal,
    Budget,
}

pub struct App<S: TaskStore> {
    pub tracker: Tracker<S>,
    pub plan: DailyPlan,
    pub budget: u32,
    pub today: NaiveDate,
    pub state: TableState,
    pub input_mode: InputMode,
    pub input_buffer: String,
    pub status: Option<String>,
}

impl<S: TaskStore> App<S> {
    /// Creates the dashboard. Recurring tasks roll forward on open only when configured.
    pub fn new(tracker: Tracker<S>, config: &Config) -> App<S> {
        let mut app = App {
            tracker,
            plan: DailyPlan::default(),
            budget: config.plan.default_budget,
            today: Local::now().date_naive(),
            state: TableState::default(),
            input_mode: InputMode::Normal,
            input_buffer: String::new(),
            status: None,
        };
        if config.plan.roll_on_plan {
            app.roll_forward();
        }
        app.reload();
        app
    }

    /// Rebuilds the plan for the current budget.
    pub fn reload(&mut self) {
        match self.tracker.daily_plan(self.budget, self.today) {
            Ok(plan) => self.plan = plan,
            Err(e) => self.status = Some(format!("Error: {e}")),
        }
        if self.plan.chosen.is_empty() {
            self.state.select(None);
        } else {
            let i = self.state.selected().unwrap_or(0).min(self.plan.chosen.len() - 1);
            self.state.select(Some(i));
        }
    }

    pub fn next(&mut self) {
        if self.plan.chosen.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < self.plan.chosen.len() => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        if self.plan.chosen.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => self.plan.chosen.len() - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    pub fn grow_budget(&mut self) {
        self.budget = self.budget.saturating_add(BUDGET_STEP);
        self.reload();
    }

    pub fn shrink_budget(&mut self) {
        self.budget = self.budget.saturating_sub(BUDGET_STEP);
        self.reload();
    }

    pub fn start_budget_input(&mut self) {
        self.input_mode = InputMode::Budget;
        self.input_buffer.clear();
    }

    /// Applies the typed budget. A non-numeric entry is reported and changes nothing.
    pub fn submit_budget(&mut self) {
        match parse_budget(&self.input_buffer) {
            Ok(budget) => {
                self.budget = budget;
                self.status = None;
                self.reload();
            }
            Err(e) => self.status = Some(e.to_string()),
        }
        self.input_mode = InputMode::Normal;
        self.input_buffer.clear();
    }

    pub fn roll_forward(&mut self) {
        match self.tracker.roll_forward(self.today) {
            Ok(rolled) if rolled.is_empty() => self.status = Some("No recurring tasks to roll forward.".into()),
            Ok(rolled) => self.status = Some(format!("Rolled {} recurring tasks forward.", rolled.len())),
            Err(e) => self.status = Some(format!("Error: {e}")),
        }
        self.reload();
    }

    /// Marks the highlighted chosen task as done.
    pub fn complete_selected(&mut self) {
        let Some(task) = self.state.selected().and_then(|i| self.plan.chosen.get(i)) else {
            return;
        };
        let id = task.id;
        match self.tracker.complete(id) {
            Ok(t) => self.status = Some(format!("Completed '{}'.", t.title)),
            Err(e) => self.status = Some(format!("Error: {e}")),
        }
        self.reload();
    }
}
