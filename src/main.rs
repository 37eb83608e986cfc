use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use systemd_user_tui::app::App;
use systemd_user_tui::app::model::{ServiceAction, ServiceRecord};
use systemd_user_tui::app::runner::ProcessRunner;
use systemd_user_tui::app::systemd::{ListFormat, Scope, Systemctl};
use systemd_user_tui::config::Settings;

/// List and control systemd user services.
#[derive(Parser, Debug)]
#[command(name = "systemd-user-tui", version, about)]
struct Args {
    /// Configuration file [default: <config_dir>/systemd-user-tui/config.toml]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Talk to the system manager instead of the user session
    #[arg(long)]
    system: bool,

    /// List only active units
    #[arg(long)]
    active_only: bool,

    /// Timeout in seconds for each systemctl invocation
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Unit listing format: auto, json or text
    #[arg(long)]
    format: Option<ListFormat>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print all service units
    List {
        #[arg(long)]
        json: bool,
    },
    /// Print the current state of one unit
    Status {
        unit: String,
        #[arg(long)]
        json: bool,
    },
    Start { unit: String },
    Stop { unit: String },
    Restart { unit: String },
    /// Stop the unit if it is running, start it otherwise
    Toggle { unit: String },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load_or_default(args.config.as_deref())?;
    if args.system {
        settings.scope = Scope::System;
    }
    if args.active_only {
        settings.list_all = false;
    }
    if let Some(timeout) = args.timeout {
        settings.timeout_secs = timeout;
    }
    if let Some(format) = args.format {
        settings.format = format;
    }
    settings.validate()?;

    init_logging(&settings, args.command.is_none())?;

    let systemctl = Systemctl::from_settings(&settings);
    match args.command {
        None => run_tui(systemctl, &settings),
        Some(command) => run_command(&systemctl, command),
    }
}

fn run_tui(systemctl: Systemctl<ProcessRunner>, settings: &Settings) -> Result<()> {
    info!(scope = ?settings.scope, "Starting interactive mode");

    let mut app = App::new(systemctl).with_refresh_interval(settings.refresh_interval());
    let mut terminal = ratatui::init();
    let result = app.run(&mut terminal);
    ratatui::restore();
    result
}

fn run_command(systemctl: &Systemctl<ProcessRunner>, command: Command) -> Result<()> {
    match command {
        Command::List { json } => {
            let snapshot = systemctl.read_snapshot()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                print_table(snapshot.as_slice());
            }
        }
        Command::Status { unit, json } => {
            let record = systemctl.query_unit(&unit)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else {
                print_table(std::slice::from_ref(&record));
            }
        }
        Command::Start { unit } => dispatch(systemctl, &unit, ServiceAction::Start)?,
        Command::Stop { unit } => dispatch(systemctl, &unit, ServiceAction::Stop)?,
        Command::Restart { unit } => dispatch(systemctl, &unit, ServiceAction::Restart)?,
        Command::Toggle { unit } => {
            let (action, record) = systemctl.toggle(&unit)?;
            println!("{} {}", action.past_tense(), unit);
            print_table(std::slice::from_ref(&record));
        }
    }
    Ok(())
}

fn dispatch(
    systemctl: &Systemctl<ProcessRunner>,
    unit: &str,
    action: ServiceAction,
) -> Result<()> {
    let record = systemctl.dispatch_action(unit, action)?;
    println!("{} {}", action.past_tense(), unit);
    print_table(std::slice::from_ref(&record));
    Ok(())
}

fn print_table(records: &[ServiceRecord]) {
    let width = records
        .iter()
        .map(|r| r.name.len())
        .max()
        .unwrap_or(0)
        .max("UNIT".len());

    println!("{:<width$}  {:<10} {:<10} SUB", "UNIT", "LOAD", "ACTIVE");
    for r in records {
        println!(
            "{:<width$}  {:<10} {:<10} {}",
            r.name, r.load_state, r.active_state, r.sub_state
        );
    }
}

/// The TUI owns the terminal, so interactive mode logs to a file; one-shot
/// commands log to stderr.
fn init_logging(settings: &Settings, interactive: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));

    if interactive {
        let path = settings.log_file();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}
