use std::io::{BufRead, Write};
use std::time::Duration;

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use log::{debug, info};
use clap::Args;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};

use crate::config::Config;
use crate::error::{Result, TrackerError};
use crate::models::{Interval, Task};
use crate::prompt::{clock_12h, parse_budget, relative_due, render_plan, PromptSchedule};
use crate::store::{sibling_path, JsonStore};
use crate::tracker::{TaskEdit, Tracker};

/// Fields for a new task.
#[derive(Args, Debug, Clone, Default)]
pub struct AddArgs {
    /// Task title (quoted if it has spaces)
    pub title: String,
    /// Minutes needed to finish the task
    #[arg(short, long)]
    pub cost: u32,
    /// Free-form description
    #[arg(short = 'D', long)]
    pub description: Option<String>,
    /// Due date in YYYY-MM-DD (required for recurring tasks)
    #[arg(short, long)]
    pub due: Option<String>,
    /// Due time in HH:MM
    #[arg(short, long)]
    pub time: Option<String>,
    /// Recurrence (never, daily, weekly, monthly)
    #[arg(short, long)]
    pub recur: Option<String>,
    /// Days before the due date to start reminding
    #[arg(short = 'R', long, default_value_t = 0)]
    pub reminder: u32,
}

/// Fields to change on an existing task.
#[derive(Args, Debug, Clone, Default)]
pub struct EditArgs {
    /// New title
    #[arg(short = 'T', long)]
    pub title: Option<String>,
    /// New description (empty string clears it)
    #[arg(short = 'D', long)]
    pub description: Option<String>,
    /// New time cost in minutes
    #[arg(short, long)]
    pub cost: Option<u32>,
    /// New due date in YYYY-MM-DD
    #[arg(short, long, conflicts_with = "clear_due")]
    pub due: Option<String>,
    /// Remove the due date
    #[arg(long)]
    pub clear_due: bool,
    /// New due time in HH:MM
    #[arg(short, long, conflicts_with = "clear_time")]
    pub time: Option<String>,
    /// Remove the due time
    #[arg(long)]
    pub clear_time: bool,
    /// New recurrence
    #[arg(short, long)]
    pub recur: Option<String>,
    /// New reminder lead in days
    #[arg(short = 'R', long)]
    pub reminder: Option<u32>,
    /// Reopen a completed task
    #[arg(long)]
    pub reopen: bool,
}

pub fn open_tracker(config: &Config) -> Tracker<JsonStore> {
    Tracker::new(JsonStore::open(config.db_path()))
}

fn schedule_path(config: &Config) -> std::path::PathBuf {
    sibling_path(&config.db_path(), "schedule.json")
}

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| TrackerError::InvalidDate(s.to_string()))
}

pub fn parse_time(s: &str) -> Result<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|_| TrackerError::InvalidTime(s.to_string()))
}

/// Adds a new task and returns its id.
pub fn cmd_add(config: &Config, args: AddArgs, silent: bool) -> Result<u64> {
    let mut task = Task::new(args.title, args.cost);
    task.description = args.description.filter(|d| !d.is_empty());
    task.due_date = args.due.as_deref().map(parse_date).transpose()?;
    task.due_time = args.time.as_deref().map(parse_time).transpose()?;
    task.recurring_interval = match args.recur.as_deref() {
        Some(r) => r.parse()?,
        None => Interval::Never,
    };
    task.reminder_lead_days = args.reminder;

    let id = open_tracker(config).add(task)?;
    if !silent {
        println!("Task added (id = {})", id);
    }
    Ok(id)
}

/// Edits an existing task's details.
pub fn cmd_edit(config: &Config, id: u64, args: EditArgs, silent: bool) -> Result<()> {
    let edit = TaskEdit {
        title: args.title,
        description: args.description,
        recurring_interval: args.recur.as_deref().map(str::parse::<Interval>).transpose()?,
        due_date: args.due.as_deref().map(parse_date).transpose()?,
        clear_due_date: args.clear_due,
        due_time: args.time.as_deref().map(parse_time).transpose()?,
        clear_due_time: args.clear_time,
        time_cost: args.cost,
        reminder_lead_days: args.reminder,
        completed: if args.reopen { Some(false) } else { None },
    };
    open_tracker(config).edit(id, edit)?;
    if !silent {
        println!("Task {} updated.", id);
    }
    Ok(())
}

/// Marks a task as complete by ID.
pub fn cmd_complete(config: &Config, id: u64, silent: bool) -> Result<()> {
    open_tracker(config).complete(id)?;
    if !silent {
        println!("Task {} marked as complete.", id);
    }
    Ok(())
}

fn due_cell(task: &Task, today: NaiveDate) -> Cell {
    match task.due_date {
        Some(due) => {
            let overdue = due < today && !task.completed;
            Cell::new(format!("{} ({})", due, relative_due(due, today)))
                .fg(if overdue { Color::Red } else { Color::Reset })
        }
        None => Cell::new("-"),
    }
}

/// Lists tasks in a table, by due date with undated tasks last.
///
/// By default, hides completed tasks unless `all` is true.
pub fn cmd_list(config: &Config, all: bool) -> Result<()> {
    let tasks = open_tracker(config).list(all)?;
    if tasks.is_empty() {
        println!("No tasks found.");
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").add_attribute(Attribute::Bold),
            Cell::new("Title").add_attribute(Attribute::Bold),
            Cell::new("Recurs").add_attribute(Attribute::Bold),
            Cell::new("Due").add_attribute(Attribute::Bold),
            Cell::new("At").add_attribute(Attribute::Bold),
            Cell::new("Min").add_attribute(Attribute::Bold),
            Cell::new("Remind").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
        ]);

    let today = Local::now().date_naive();

    for t in &tasks {
        let status = if t.completed { "Done" } else { "Pending" };
        let status_color = if t.completed { Color::Green } else { Color::Yellow };
        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(&t.title),
            Cell::new(t.recurring_interval),
            due_cell(t, today),
            Cell::new(t.due_time.map(clock_12h).unwrap_or_default()),
            Cell::new(t.time_cost),
            Cell::new(format!("{}d", t.reminder_lead_days)),
            Cell::new(status).fg(status_color),
        ]);
    }

    println!("{table}");
    Ok(())
}

/// Prints every field of one task.
pub fn cmd_show(config: &Config, id: u64) -> Result<()> {
    let t = open_tracker(config).task(id)?;
    let today = Local::now().date_naive();
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.add_row(vec!["ID".to_string(), t.id.to_string()]);
    table.add_row(vec!["Title".to_string(), t.title.clone()]);
    table.add_row(vec!["Description".to_string(), t.description.clone().unwrap_or_else(|| "-".into())]);
    table.add_row(vec!["Recurs".to_string(), t.recurring_interval.to_string()]);
    table.add_row(vec![
        "Due".to_string(),
        t.due_date
            .map(|d| format!("{} ({})", d, relative_due(d, today)))
            .unwrap_or_else(|| "-".into()),
    ]);
    table.add_row(vec!["At".to_string(), t.due_time.map(clock_12h).unwrap_or_else(|| "-".into())]);
    table.add_row(vec!["Minutes".to_string(), t.time_cost.to_string()]);
    table.add_row(vec!["Reminder".to_string(), format!("{} days before", t.reminder_lead_days)]);
    table.add_row(vec!["Completed".to_string(), t.completed.to_string()]);
    table.add_row(vec!["Updated".to_string(), t.created.to_rfc3339()]);
    println!("{table}");
    Ok(())
}

/// Picks today's tasks for a budget and prints them with any reminders.
///
/// `minutes` is the raw reply text; it goes through the same check as a
/// budget message, so a non-numeric value never reaches the selector.
pub fn cmd_plan(config: &Config, minutes: Option<&str>, json: bool, roll: bool, today: NaiveDate) -> Result<()> {
    let budget = match minutes {
        Some(text) => parse_budget(text)?,
        None => config.plan.default_budget,
    };
    let mut tracker = open_tracker(config);
    if roll {
        tracker.roll_forward(today)?;
    }
    let plan = tracker.daily_plan(budget, today)?;
    if json {
        let out = serde_json::to_string_pretty(&plan).map_err(TrackerError::Encode)?;
        println!("{out}");
    } else {
        print!("{}", render_plan(&plan, today, &config.links.base_url));
    }
    Ok(())
}

/// Rolls lapsed recurring tasks forward to their next occurrence.
pub fn cmd_roll(config: &Config, json: bool, today: NaiveDate, silent: bool) -> Result<usize> {
    let rolled = open_tracker(config).roll_forward(today)?;
    if silent {
        return Ok(rolled.len());
    }
    if json {
        println!("\"Done\"");
    } else if rolled.is_empty() {
        println!("No recurring tasks to roll forward.");
    } else {
        for r in &rolled {
            println!("Rolled task {} from {} to {}", r.id, r.from, r.to);
        }
    }
    Ok(rolled.len())
}

fn load_schedule(config: &Config) -> Result<PromptSchedule> {
    let mut schedule = PromptSchedule::load(&schedule_path(config))?;
    schedule.ensure_default(&config.prompt.job_name, config.default_prompt_time()?);
    Ok(schedule)
}

/// Sets the time of the daily prompt, replacing the existing job.
pub fn cmd_prompt_set(config: &Config, time: &str, silent: bool) -> Result<()> {
    let mut schedule = load_schedule(config)?;
    schedule.set_daily(&config.prompt.job_name, time)?;
    schedule.save(&schedule_path(config))?;
    if !silent {
        println!("The daily time has been updated successfully!");
    }
    Ok(())
}

/// Shows the daily prompt job and when it fires next.
pub fn cmd_prompt_show(config: &Config, now: NaiveDateTime) -> Result<()> {
    let schedule = load_schedule(config)?;
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Job", "Time", "Next", "Message"]);
    for job in schedule.jobs() {
        table.add_row(vec![
            job.name.clone(),
            clock_12h(job.time),
            job.next_fire(now)
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".into()),
            job.message.clone(),
        ]);
    }
    println!("{table}");
    Ok(())
}

/// Runs the daily prompt: waits for the job's next fire time, asks for the
/// day's budget, reads one reply line and answers with the plan.
///
/// The schedule is reread every cycle, so `prompt set` takes effect at the
/// next prompt. An invalid reply gets the error text and no plan. Stops after
/// `cycles` prompts, or when `input` reaches end of file. Returns the number
/// of replies read.
pub fn cmd_prompt_run<R: BufRead, W: Write>(
    config: &Config,
    clock: impl Fn() -> NaiveDateTime,
    mut sleep: impl FnMut(Duration),
    mut input: R,
    mut out: W,
    cycles: Option<usize>,
) -> Result<usize> {
    let tracker = open_tracker(config);
    let mut last_fire: Option<NaiveDateTime> = None;
    let mut replies = 0;

    while cycles.map_or(true, |n| replies < n) {
        let schedule = load_schedule(config)?;
        let job = schedule
            .job(&config.prompt.job_name)
            .ok_or_else(|| TrackerError::Config(format!("no prompt job named '{}'", config.prompt.job_name)))?;

        let now = clock();
        let from = match last_fire {
            Some(fired) => now.max(fired + TimeDelta::seconds(1)),
            None => now,
        };
        let Some(fire) = job.next_fire(from) else {
            return Ok(replies);
        };
        debug!("next prompt '{}' at {}", job.name, fire);
        sleep((fire - now).to_std().unwrap_or_default());
        last_fire = Some(fire);

        writeln!(out, "{}", job.message).map_err(TrackerError::Console)?;
        out.flush().map_err(TrackerError::Console)?;

        let mut reply = String::new();
        if input.read_line(&mut reply).map_err(TrackerError::Console)? == 0 {
            info!("prompt input closed, stopping");
            return Ok(replies);
        }
        replies += 1;

        match parse_budget(&reply) {
            Ok(budget) => {
                let plan = tracker.daily_plan(budget, fire.date())?;
                write!(out, "{}", render_plan(&plan, fire.date(), &config.links.base_url))
                    .map_err(TrackerError::Console)?;
            }
            Err(e) => writeln!(out, "{e}").map_err(TrackerError::Console)?,
        }
    }
    Ok(replies)
}
