//! rindex - main entry point

use clap::Parser;
use rindex_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use rindex_ingest::commands::{self, run::RunArgs};
use rindex_ingest::{Cli, Commands};
use std::process;
use tracing::error;

#[tokio::main]
async fn main() {
    // a missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    if cli.markdown_help {
        println!("{}", clap_markdown::help_markdown::<Cli>());
        return;
    }

    let Some(command) = cli.command else {
        eprintln!("Error: A subcommand is required");
        eprintln!();
        eprintln!("For more information, try '--help'.");
        process::exit(2);
    };

    let level = if cli.verbose { LogLevel::Debug } else { LogLevel::Info };
    let defaults = LogConfig::builder()
        .level(level)
        .output(LogOutput::Console)
        .log_file_prefix("rindex")
        .build();
    let log_config = match defaults.clone().merge_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: ignoring LOG_* settings: {}", e);
            defaults
        },
    };
    // keep the file writer alive until exit
    let _guard = match init_logging(&log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Warning: logging disabled: {}", e);
            None
        },
    };

    if let Err(e) = execute(command).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn execute(command: Commands) -> rindex_ingest::Result<()> {
    match command {
        Commands::List => commands::list::run(),
        Commands::Init { element_tables } => commands::init::run(element_tables).await,
        Commands::Run {
            ids,
            all,
            max_elements,
            batch_size,
            dry_run,
            no_progress,
        } => {
            commands::run::run(RunArgs {
                ids,
                all,
                max_elements,
                batch_size,
                dry_run,
                no_progress,
            })
            .await
        },
        Commands::Status { id } => commands::status::run(id).await,
        Commands::Query { id, text, new_only } => commands::query::run(id, text, new_only).await,
        Commands::Reset { id, drop, purge } => commands::reset::run(id, drop, purge).await,
        Commands::Stats { id } => commands::stats::run(id).await,
        Commands::Complete { id } => commands::complete::run(id).await,
    }
}
