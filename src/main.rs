use anyhow::Result;
use clap::Parser;
use jgraph::cli;
use jgraph::config::Config;
use jgraph::db::SqliteGraph;
use jgraph::graph::{AuditedStore, GraphStore, MemoryGraph};
use jgraph::indexer::{Indexer, scan::ScanOptions};
use jgraph::loader::GraphLoader;
use std::io::{self, Write};

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let args = cli::Args::parse();
    let config = Config::get();

    match args.command {
        cli::Command::Load {
            db,
            audit_log,
            no_reset,
            dry_run,
            quiet,
            no_ignore,
            paths,
        } => {
            let mut indexer = Indexer::new_with_options(ScanOptions::new(no_ignore))?;
            let (facts, index_stats) = indexer.index_paths(&paths)?;
            tracing::info!(
                indexed = index_stats.indexed,
                skipped = index_stats.skipped,
                duration_ms = index_stats.duration_ms as u64,
                "facts ready"
            );

            let store: Box<dyn GraphStore> = if dry_run {
                Box::new(MemoryGraph::new())
            } else {
                let db_path = db.unwrap_or_else(|| config.db_path.clone());
                Box::new(SqliteGraph::open(&db_path)?)
            };
            let audit_log = audit_log.unwrap_or_else(|| config.audit_log.clone());
            let mut loader = GraphLoader::new(AuditedStore::open(store, &audit_log)?);

            if config.reset && !no_reset {
                loader.reset()?;
            }

            let mut report: Box<dyn Write> = if quiet {
                Box::new(io::sink())
            } else {
                Box::new(io::stdout().lock())
            };
            let stats = loader.load(&facts, report.as_mut())?;
            report.flush()?;
            drop(report);

            tracing::info!(
                lines = loader.store().lines(),
                path = %loader.store().log_path().display(),
                "audit log written"
            );
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(())
        }
        cli::Command::Facts { no_ignore, paths } => {
            let mut indexer = Indexer::new_with_options(ScanOptions::new(no_ignore))?;
            let (facts, _) = indexer.index_paths(&paths)?;
            println!("{}", serde_json::to_string_pretty(&facts)?);
            Ok(())
        }
    }
}
