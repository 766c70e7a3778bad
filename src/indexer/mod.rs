use crate::model::{ClassFact, IndexStats};
use anyhow::Result;
use std::path::PathBuf;
use std::time::Instant;

pub mod aggregate;
pub mod bindings;
pub mod java;
pub mod scan;

use aggregate::{ClassFactAggregator, FactSet};
use java::JavaExtractor;

/// Runs extraction over a list of input paths and merges the per-unit facts.
pub struct Indexer {
    extractor: JavaExtractor,
    scan_options: scan::ScanOptions,
}

impl Indexer {
    pub fn new() -> Result<Self> {
        Self::new_with_options(scan::ScanOptions::default())
    }

    pub fn new_with_options(scan_options: scan::ScanOptions) -> Result<Self> {
        Ok(Self {
            extractor: JavaExtractor::new()?,
            scan_options,
        })
    }

    /// Extracts a single in-memory unit.
    pub fn index_source(&mut self, unit_name: &str, source: &str) -> Result<ClassFact> {
        self.extractor.extract(source, unit_name)
    }

    /// Parses every source reachable from `paths`, in order, and merges the
    /// results. Files that cannot be read are logged and skipped.
    pub fn index_paths(&mut self, paths: &[PathBuf]) -> Result<(FactSet, IndexStats)> {
        let started = Instant::now();
        let files = scan::collect_sources(paths, self.scan_options)?;
        let mut stats = IndexStats {
            scanned: files.len(),
            ..IndexStats::default()
        };
        let mut aggregator = ClassFactAggregator::new();

        for path in &files {
            let source = match crate::util::read_to_string(path) {
                Ok(source) => source,
                Err(err) => {
                    tracing::warn!("read error {}: {err:#}", crate::util::normalize_path(path));
                    stats.skipped += 1;
                    continue;
                }
            };
            let unit = java::unit_name_from_path(path);
            let fact = self.extractor.extract(&source, &unit)?;
            tracing::debug!(
                unit = unit.as_str(),
                path = %path.display(),
                methods = fact.methods.len(),
                "unit extracted"
            );
            aggregator.add_unit(fact);
            stats.indexed += 1;
        }

        stats.replaced = aggregator.replaced();
        stats.duration_ms = started.elapsed().as_millis();
        let facts = aggregator.finish();
        tracing::info!(
            scanned = stats.scanned,
            indexed = stats.indexed,
            skipped = stats.skipped,
            classes = facts.len(),
            "extraction finished"
        );
        Ok((facts, stats))
    }
}
