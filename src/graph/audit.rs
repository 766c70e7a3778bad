use crate::graph::{GraphCommand, GraphStore, NodeRef};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Wraps a store and appends every write command, rendered as one
/// statement line, to an audit log before executing it.
///
/// The log is truncated when the store is opened and flushed after each line.
/// Existence checks are reads and are not logged.
pub struct AuditedStore<S> {
    inner: S,
    log: File,
    log_path: PathBuf,
    lines: usize,
}

impl<S: GraphStore> AuditedStore<S> {
    pub fn open(inner: S, log_path: &Path) -> Result<Self> {
        crate::util::ensure_parent_dir(log_path)?;
        let log = File::create(log_path)
            .with_context(|| format!("open audit log {}", log_path.display()))?;
        Ok(Self {
            inner,
            log,
            log_path: log_path.to_path_buf(),
            lines: 0,
        })
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn lines(&self) -> usize {
        self.lines
    }
}

impl<S: GraphStore> GraphStore for AuditedStore<S> {
    fn node_exists(&self, node: &NodeRef) -> Result<bool> {
        self.inner.node_exists(node)
    }

    fn execute(&mut self, command: &GraphCommand) -> Result<()> {
        writeln!(self.log, "{command}")
            .and_then(|_| self.log.flush())
            .with_context(|| format!("write audit log {}", self.log_path.display()))?;
        self.lines += 1;
        self.inner.execute(command)
    }
}
