use clap::{Parser, Subcommand};
use habitloop_core::Config;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "habitloop", version, about = "Habit tracker with scheduled reminders")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Habit management
    Habit {
        #[command(subcommand)]
        action: commands::habit::HabitAction,
    },
    /// Reminder ticks and previews
    Remind {
        #[command(subcommand)]
        action: commands::remind::RemindAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Authentication management for delivery channels
    Auth {
        #[command(subcommand)]
        action: commands::auth::AuthAction,
    },
}

/// Logs go to stderr so stdout stays machine-readable. `RUST_LOG` wins over
/// the configured filter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let configured = Config::load_or_default().logging.filter;
        EnvFilter::try_new(&configured).unwrap_or_else(|_| EnvFilter::new("info"))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let result = match cli.command {
        Commands::Habit { action } => commands::habit::run(action),
        Commands::Remind { action } => commands::remind::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Auth { action } => commands::auth::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
