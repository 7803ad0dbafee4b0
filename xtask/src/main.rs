//! Build automation tasks for the resource index
//!
//! - `generate-cli-docs`: render the `rindex` command reference as Markdown

use clap::Parser;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation tasks for rindex", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Generate the rindex CLI reference in Markdown
    GenerateCliDocs {
        /// Output directory for generated documentation
        #[arg(short, long, default_value = "docs")]
        output_dir: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::GenerateCliDocs { output_dir } => generate_cli_docs(&output_dir)?,
    }

    Ok(())
}

fn generate_cli_docs(output_dir: &str) -> anyhow::Result<()> {
    println!("Generating CLI documentation...");

    let markdown = clap_markdown::help_markdown::<rindex_ingest::Cli>();
    let resources = rindex_ingest::framework::registry::tool_ids();

    let content = format!(
        r#"# rindex CLI Reference

Generated from the CLI source on {}.

## Overview

`rindex` fetches records from external biomedical resources, normalizes
them into context-tagged elements and stores new elements in one MySQL
table per resource.

Registered resources: {}.

## Quick Start

```bash
# Create the shared tables
rindex init

# Ingest two resources, at most 500 new elements each
rindex run GEO PM --max-elements 500

# Check what is stored
rindex status
```

## Commands

{}

## Environment Variables

- `DATABASE_URL` - MySQL connection string (required for database commands)
- `DB_MAX_CONNECTIONS`, `DB_MAX_RETRIES`, `DB_RETRY_DELAY_MS` - pool and retry settings
- `INGEST_MAX_ELEMENTS`, `INGEST_BATCH_SIZE` - per-run defaults for `rindex run`
- `INGEST_HTTP_TIMEOUT_SECS`, `INGEST_HTTP_MAX_RETRIES` - HTTP client settings
- `LOG_LEVEL`, `LOG_OUTPUT`, `LOG_FORMAT`, `LOG_DIR` - logging

Connector settings use a per-resource prefix, e.g. `YOUTUBE_API_KEY`,
`DRUGBANK_SOURCE`, `REACTOME_DATABASE_URL`, `OMIM_FTP_HOST`.

---

*To update, run `cargo xtask generate-cli-docs`.*
"#,
        chrono::Utc::now().format("%Y-%m-%d"),
        resources.join(", "),
        markdown
    );

    let output_path = PathBuf::from(output_dir);
    fs::create_dir_all(&output_path)?;

    let file_path = output_path.join("cli-reference.md");
    fs::write(&file_path, content)?;

    println!("Generated CLI documentation at: {}", file_path.display());
    Ok(())
}
