use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "jgraph",
    version,
    about = "Java structural dependency graph loader",
    after_help = r#"Examples:
  jgraph load src/main/java
  jgraph load --dry-run --quiet Example.java
  jgraph load --db graph.sqlite --audit-log load.log --no-reset a/A.java b/B.java
  jgraph facts src/main/java
"#
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Extract facts from Java sources and load them into the graph.
    Load {
        /// Graph database file (defaults to JGRAPH_DB or .jgraph/graph.sqlite).
        #[arg(long)]
        db: Option<PathBuf>,
        /// Write-command log (defaults to JGRAPH_AUDIT_LOG or db.log).
        #[arg(long)]
        audit_log: Option<PathBuf>,
        /// Keep existing graph contents instead of deleting them first.
        #[arg(long)]
        no_reset: bool,
        /// Load into an in-memory graph; nothing is persisted.
        #[arg(long)]
        dry_run: bool,
        /// Suppress the per-relationship report.
        #[arg(long)]
        quiet: bool,
        /// Include files ignored by .gitignore.
        #[arg(long)]
        no_ignore: bool,
        /// Java files or directories, processed in order.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Extract and merge facts, then print them as JSON.
    Facts {
        /// Include files ignored by .gitignore.
        #[arg(long)]
        no_ignore: bool,
        /// Java files or directories, processed in order.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}
