use clap::{Parser, Subcommand};

mod commands;
mod notify;

#[derive(Parser)]
#[command(name = "everyhour", version, about = "Periodic check-in reminder")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the reminder daemon in the foreground
    Daemon {
        /// Exit when stdin reaches end of file
        #[arg(long)]
        exit_on_eof: bool,
    },
    /// Record what you are working on
    Checkin {
        /// Task description
        #[arg(required = true, num_args = 1..)]
        task: Vec<String>,
    },
    /// Record that the current task has not changed
    Same,
    /// Print current task, settings and last entry as JSON
    State,
    /// Clear the check-in history (the current task is kept)
    Clear,
    /// Reminder cadence
    Settings {
        #[command(subcommand)]
        action: commands::settings::SettingsAction,
    },
    /// Send a raw protocol request, e.g. '{"type":"get-state"}'
    Request {
        /// Request object as JSON
        json: String,
    },
    /// Show recent check-ins
    Log {
        /// Maximum number of entries
        #[arg(long, default_value = "40")]
        limit: usize,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show active hours per day
    Timeline {
        /// Number of days with activity to show
        #[arg(long, default_value = "7")]
        days: usize,
    },
    /// Export the full history as JSON
    Export {
        /// Write to this file instead of stdout
        #[arg(long, conflicts_with = "save")]
        output: Option<std::path::PathBuf>,
        /// Write to everyhour-checkins-<date>.json in the current directory
        #[arg(long)]
        save: bool,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Generate shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Daemon { exit_on_eof } => commands::daemon::run(exit_on_eof),
        Commands::Checkin { task } => commands::checkin::submit(&task.join(" "), false),
        Commands::Same => commands::checkin::submit("", true),
        Commands::State => commands::checkin::state(),
        Commands::Clear => commands::checkin::clear(),
        Commands::Settings { action } => commands::settings::run(action),
        Commands::Request { json } => commands::checkin::raw(&json),
        Commands::Log { limit, json } => commands::history::log(limit, json),
        Commands::Timeline { days } => commands::history::timeline(days),
        Commands::Export { output, save } => commands::history::export(output, save),
        Commands::Config { action } => commands::config::run(action),
        Commands::Completions { shell } => commands::completions(shell),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
