use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod common;

#[derive(Parser)]
#[command(name = "doselog", version, about = "Doselog CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Experience management
    Experience {
        #[command(subcommand)]
        action: commands::experience::ExperienceAction,
    },
    /// Log and inspect ingestions
    Ingestion {
        #[command(subcommand)]
        action: commands::ingestion::IngestionAction,
    },
    /// Effect timeline of an experience
    Timeline(commands::timeline::TimelineArgs),
    /// Usage statistics
    Stats(commands::stats::StatsArgs),
    /// Search the substance catalog
    Search(commands::search::SearchArgs),
    /// Drug checking services by country
    Testing(commands::testing::TestingArgs),
    /// Dose classes
    Dose {
        #[command(subcommand)]
        action: commands::dose::DoseAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("DOSELOG_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Experience { action } => commands::experience::run(action),
        Commands::Ingestion { action } => commands::ingestion::run(action),
        Commands::Timeline(args) => commands::timeline::run(args),
        Commands::Stats(args) => commands::stats::run(args),
        Commands::Search(args) => commands::search::run(args),
        Commands::Testing(args) => commands::testing::run(args),
        Commands::Dose { action } => commands::dose::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
