//! # Timebox
//!
//! A personal task tracker that plans your day around the time you actually have.
//! Tell it how many minutes you can spend today and it picks the work: everything
//! overdue first, then the quickest remaining tasks that still fit.
//!
//! ## Features
//!
//! *   **Daily budget**: `timebox plan 90` chooses tasks for a 90 minute day.
//! *   **Reminders**: tasks surface a configurable number of days before they are due.
//! *   **Recurrence**: daily, weekly and monthly tasks roll forward once they lapse.
//! *   **Daily prompt**: a named daily job asks for today's budget and replies with the plan.
//! *   **Dashboard**: run without arguments for an interactive view of today's plan.
//!
//! ## Usage
//!
//! ```bash
//! # Add tasks
//! timebox add "Write report" --cost 45 --due 2025-12-01 --time 17:00
//! timebox add "Water plants" --cost 5 --due 2025-11-20 --recur weekly
//! timebox add "Renew passport" --cost 60 --due 2025-12-15 --reminder 14
//!
//! # What fits into an hour today?
//! timebox plan 60
//! timebox plan 60 --json
//!
//! # Roll lapsed recurring tasks forward
//! timebox roll
//!
//! # Ask for the budget at 07:30 every day
//! timebox prompt set 7:30
//! timebox prompt run
//! ```
//!
//! ## Data Storage
//!
//! Tasks are saved in your local data directory (`~/.local/share/timebox/tasks.json`
//! on Linux). Override it with the `TASKS_DB` environment variable or
//! `storage.db_path` in `~/.config/timebox/timebox.yml`.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Local;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use log::debug;

use timebox::commands::*;
use timebox::config::Config;
use timebox::tui::run_tui;

#[derive(Parser)]
#[command(name = "timebox")]
#[command(about = "Plan today's tasks around the time you have", long_about = None)]
struct Cli {
    /// Path to a config file
    #[arg(short = 'C', long, global = true)]
    config: Option<PathBuf>,
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new task
    Add(AddArgs),
    /// Edit a task
    Edit {
        id: u64,
        #[command(flatten)]
        changes: EditArgs,
    },
    /// Mark a task as complete
    Complete {
        id: u64,
    },
    /// List tasks by due date
    List {
        /// Show completed tasks
        #[arg(short, long)]
        all: bool,
    },
    /// Show one task in full
    Show {
        id: u64,
    },
    /// Choose today's tasks for a time budget
    Plan {
        /// Minutes available today (defaults to plan.default_budget)
        minutes: Option<String>,
        /// Print JSON instead of a message
        #[arg(long)]
        json: bool,
        /// Roll lapsed recurring tasks forward first
        #[arg(long)]
        roll: bool,
    },
    /// Roll lapsed recurring tasks forward
    Roll {
        /// Print JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Manage the daily prompt
    Prompt {
        #[command(subcommand)]
        command: PromptCommands,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell, elvish)
        shell: Shell,
    },
    /// Open interactive TUI
    Ui,
}

#[derive(Subcommand)]
enum PromptCommands {
    /// Set the daily prompt time (HH:MM, 24 hour)
    Set {
        time: String,
    },
    /// Show the daily prompt and when it fires next
    Show,
    /// Wait for the daily prompt, then read the budget from stdin and print the plan
    Run {
        /// Answer a single prompt, then exit
        #[arg(long)]
        once: bool,
    },
}

fn setup_logging(level: Option<&str>) {
    let mut builder = env_logger::Builder::from_default_env();
    if std::env::var_os("RUST_LOG").is_none() || level.is_some() {
        let filter = match level.map(str::to_lowercase).as_deref() {
            Some("error") => log::LevelFilter::Error,
            Some("info") => log::LevelFilter::Info,
            Some("debug") => log::LevelFilter::Debug,
            Some("trace") => log::LevelFilter::Trace,
            Some("warn") | Some("warning") | None => log::LevelFilter::Warn,
            Some(other) => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to WARN", other);
                log::LevelFilter::Warn
            }
        };
        builder.filter_level(filter);
    }
    builder.init();
}

fn run(cli: Cli) -> timebox::Result<()> {
    let config = Config::load(cli.config.as_ref())?;
    let today = Local::now().date_naive();
    debug!("using task database {}", config.db_path().display());

    match cli.command {
        Some(Commands::Add(args)) => cmd_add(&config, args, false).map(|_| ()),
        Some(Commands::Edit { id, changes }) => cmd_edit(&config, id, changes, false),
        Some(Commands::Complete { id }) => cmd_complete(&config, id, false),
        Some(Commands::List { all }) => cmd_list(&config, all),
        Some(Commands::Show { id }) => cmd_show(&config, id),
        Some(Commands::Plan { minutes, json, roll }) => {
            let roll = roll || config.plan.roll_on_plan;
            cmd_plan(&config, minutes.as_deref(), json, roll, today)
        }
        Some(Commands::Roll { json }) => cmd_roll(&config, json, today, false).map(|_| ()),
        Some(Commands::Prompt { command }) => match command {
            PromptCommands::Set { time } => cmd_prompt_set(&config, &time, false),
            PromptCommands::Show => cmd_prompt_show(&config, Local::now().naive_local()),
            PromptCommands::Run { once } => cmd_prompt_run(
                &config,
                || Local::now().naive_local(),
                std::thread::sleep,
                io::stdin().lock(),
                io::stdout(),
                once.then_some(1),
            )
            .map(|_| ()),
        },
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "timebox", &mut io::stdout());
            Ok(())
        }
        Some(Commands::Ui) | None => run_tui(open_tracker(&config), &config).map_err(timebox::TrackerError::Console),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.log_level.as_deref());

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
