use crate::graph::{
    GraphCommand, GraphStore, NodeKind, NodeRef, Properties, RelKind, Relationship,
};
use anyhow::{Context, Result, anyhow};
use blake3::Hasher;
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use std::path::{Path, PathBuf};
use std::time::Duration;

mod migrations;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDigest {
    pub rows: usize,
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphDigest {
    pub nodes: TableDigest,
    pub relationships: TableDigest,
}

/// Property graph persisted in SQLite. Every command runs in its own
/// transaction.
pub struct SqliteGraph {
    db_path: Option<PathBuf>,
    conn: Connection,
}

impl SqliteGraph {
    pub fn open(db_path: &Path) -> Result<Self> {
        crate::util::ensure_parent_dir(db_path)?;
        let conn = Connection::open(db_path)
            .with_context(|| format!("open sqlite db at {}", db_path.display()))?;
        configure(&conn)?;
        migrations::migrate(&conn)?;
        tracing::debug!(path = %db_path.display(), "graph database ready");
        Ok(Self {
            db_path: Some(db_path.to_path_buf()),
            conn,
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
        configure(&conn)?;
        migrations::migrate(&conn)?;
        Ok(Self {
            db_path: None,
            conn,
        })
    }

    /// Get the database file path
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    pub fn node_count(&self, kind: NodeKind) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM nodes WHERE kind = ?",
            params![kind.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub fn relationship_count(&self, kind: RelKind) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM relationships WHERE kind = ?",
            params![kind.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// All relationships in creation order.
    pub fn relationships(&self) -> Result<Vec<Relationship>> {
        let mut stmt = self.conn.prepare(
            "SELECT r.kind, f.kind, f.key, t.kind, t.key, r.properties
             FROM relationships r
             JOIN nodes f ON r.from_id = f.id
             JOIN nodes t ON r.to_id = t.id
             ORDER BY r.id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (kind, from_kind, from_key, to_kind, to_key, properties) = row?;
            let kind =
                RelKind::parse(&kind).ok_or_else(|| anyhow!("unknown relationship kind {kind}"))?;
            let properties: Properties = serde_json::from_str(&properties)
                .with_context(|| format!("decode properties of {kind} relationship"))?;
            out.push(Relationship {
                kind,
                from: NodeRef::new(parse_node_kind(&from_kind)?, &from_key),
                to: NodeRef::new(parse_node_kind(&to_kind)?, &to_key),
                properties,
            });
        }
        Ok(out)
    }

    /// Content hash that ignores row ids, so two loads of the same facts
    /// compare equal.
    pub fn digest(&self) -> Result<GraphDigest> {
        Ok(GraphDigest {
            nodes: self.digest_nodes()?,
            relationships: self.digest_relationships()?,
        })
    }

    fn digest_nodes(&self) -> Result<TableDigest> {
        let mut stmt = self
            .conn
            .prepare("SELECT kind || char(9) || key FROM nodes ORDER BY kind, key")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        digest_rows(rows)
    }

    fn digest_relationships(&self) -> Result<TableDigest> {
        let mut stmt = self.conn.prepare(
            "SELECT r.kind || char(9) || f.kind || char(9) || f.key || char(9)
                    || t.kind || char(9) || t.key || char(9) || r.properties AS line
             FROM relationships r
             JOIN nodes f ON r.from_id = f.id
             JOIN nodes t ON r.to_id = t.id
             ORDER BY line",
        )?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        digest_rows(rows)
    }
}

impl GraphStore for SqliteGraph {
    fn node_exists(&self, node: &NodeRef) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM nodes WHERE kind = ? AND key = ?",
            params![node.kind.as_str(), &node.key],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn execute(&mut self, command: &GraphCommand) -> Result<()> {
        let tx = self.conn.transaction()?;
        match command {
            GraphCommand::DeleteAll => {
                tx.execute_batch("DELETE FROM relationships; DELETE FROM nodes;")?;
            }
            GraphCommand::CreateNode(node) => {
                tx.execute(
                    "INSERT INTO nodes (kind, key) VALUES (?, ?)",
                    params![node.kind.as_str(), &node.key],
                )
                .with_context(|| format!("create {} node {:?}", node.kind, node.key))?;
            }
            GraphCommand::CreateRelationship(rel) => {
                let from_id = require_node(&tx, &rel.from, rel.kind)?;
                let to_id = require_node(&tx, &rel.to, rel.kind)?;
                let properties = serde_json::to_string(&rel.properties)?;
                tx.execute(
                    "INSERT INTO relationships (kind, from_id, to_id, properties)
                     VALUES (?, ?, ?, ?)",
                    params![rel.kind.as_str(), from_id, to_id, properties],
                )?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

fn configure(conn: &Connection) -> Result<()> {
    conn.busy_timeout(Duration::from_secs(30))?;
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        ",
    )?;
    Ok(())
}

fn require_node(tx: &Transaction<'_>, node: &NodeRef, rel: RelKind) -> Result<i64> {
    tx.query_row(
        "SELECT id FROM nodes WHERE kind = ? AND key = ?",
        params![node.kind.as_str(), &node.key],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| anyhow!("{rel} endpoint {} {:?} does not exist", node.kind, node.key))
}

fn digest_rows<I>(rows: I) -> Result<TableDigest>
where
    I: Iterator<Item = rusqlite::Result<String>>,
{
    let mut hasher = Hasher::new();
    let mut count = 0;
    for row in rows {
        let row = row?;
        hasher.update(row.as_bytes());
        hasher.update(b"\n");
        count += 1;
    }
    Ok(TableDigest {
        rows: count,
        hash: hasher.finalize().to_hex().to_string(),
    })
}

fn parse_node_kind(raw: &str) -> Result<NodeKind> {
    NodeKind::parse(raw).ok_or_else(|| anyhow!("unknown node kind {raw}"))
}
