//! Command-line definition of the `rindex` binary

use clap::{Parser, Subcommand};

/// rindex - biomedical resource index ingestion
#[derive(Parser, Debug)]
#[command(name = "rindex")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Debug logging on the console
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print the full command reference as Markdown
    #[arg(long, hide = true)]
    pub markdown_help: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List every registered resource and its contexts
    List,

    /// Create the shared tables
    Init {
        /// Also register every resource and create its element table
        #[arg(long)]
        element_tables: bool,
    },

    /// Fetch new elements and load them into element tables
    Run {
        /// Resource IDs (case-insensitive)
        #[arg(value_name = "ID")]
        ids: Vec<String>,

        /// Run every registered resource
        #[arg(short, long, conflicts_with = "ids")]
        all: bool,

        /// Cap on new elements fetched per resource
        #[arg(short, long, env = "INGEST_MAX_ELEMENTS")]
        max_elements: Option<usize>,

        /// Rows per insert statement
        #[arg(short, long, env = "INGEST_BATCH_SIZE")]
        batch_size: Option<usize>,

        /// Fetch and dedupe without writing
        #[arg(long)]
        dry_run: bool,

        /// Hide progress bars
        #[arg(long)]
        no_progress: bool,
    },

    /// Show stored resources with element counts and dates
    Status {
        /// Limit to one resource
        id: Option<String>,
    },

    /// Query a live resource for matching local element IDs
    Query {
        /// Resource ID
        id: String,

        /// Free-text query
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// Only show IDs not yet in the element table
        #[arg(long)]
        new_only: bool,
    },

    /// Empty a resource's element table and reset its counters
    Reset {
        /// Resource ID
        id: String,

        /// Drop the element table instead of truncating it
        #[arg(long)]
        drop: bool,

        /// Also remove the resource row
        #[arg(long, requires = "drop")]
        purge: bool,
    },

    /// Show annotation statistics of a resource
    Stats {
        /// Resource ID
        id: String,
    },

    /// Record that the annotation workflow finished for a resource
    Complete {
        /// Resource ID
        id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::parse_from(["rindex", "run", "geo", "pm", "--max-elements", "10", "--dry-run"]);
        match cli.command {
            Some(Commands::Run {
                ids,
                all,
                max_elements,
                dry_run,
                ..
            }) => {
                assert_eq!(ids, vec!["geo", "pm"]);
                assert!(!all);
                assert_eq!(max_elements, Some(10));
                assert!(dry_run);
            },
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_all_conflicts_with_ids() {
        assert!(Cli::try_parse_from(["rindex", "run", "--all", "GEO"]).is_err());
    }

    #[test]
    fn test_purge_requires_drop() {
        assert!(Cli::try_parse_from(["rindex", "reset", "GEO", "--purge"]).is_err());
        assert!(Cli::try_parse_from(["rindex", "reset", "GEO", "--drop", "--purge"]).is_ok());
    }
}
