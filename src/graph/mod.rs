//! Typed write model for the property graph and the store abstraction that
//! executes it.
//!
//! Nodes are keyed by `(kind, name)`. Each [`GraphCommand`] is executed as its
//! own atomic unit; there is no transaction spanning several commands.

use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

pub mod audit;
pub mod memory;

pub use audit::AuditedStore;
pub use memory::MemoryGraph;

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeKind {
    Class,
    Method,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Class => "Class",
            NodeKind::Method => "Method",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Class" => Some(NodeKind::Class),
            "Method" => Some(NodeKind::Method),
            _ => None,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelKind {
    Imports,
    Extends,
    Implements,
    Owns,
    UsesVar,
    UsesArg,
    Uses,
    Calls,
    UsesReturn,
    ComposedBy,
}

impl RelKind {
    pub const ALL: [RelKind; 10] = [
        RelKind::Imports,
        RelKind::Extends,
        RelKind::Implements,
        RelKind::Owns,
        RelKind::UsesVar,
        RelKind::UsesArg,
        RelKind::Uses,
        RelKind::Calls,
        RelKind::UsesReturn,
        RelKind::ComposedBy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RelKind::Imports => "IMPORTS",
            RelKind::Extends => "EXTENDS",
            RelKind::Implements => "IMPLEMENTS",
            RelKind::Owns => "OWNS",
            RelKind::UsesVar => "USES_VAR",
            RelKind::UsesArg => "USES_ARG",
            RelKind::Uses => "USES",
            RelKind::Calls => "CALLS",
            RelKind::UsesReturn => "USES_RETURN",
            RelKind::ComposedBy => "COMPOSED_BY",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        RelKind::ALL.into_iter().find(|kind| kind.as_str() == raw)
    }

    /// Node kinds at the `(from, to)` ends of this relationship.
    pub fn endpoints(&self) -> (NodeKind, NodeKind) {
        match self {
            RelKind::Imports | RelKind::Extends | RelKind::Implements | RelKind::ComposedBy => {
                (NodeKind::Class, NodeKind::Class)
            }
            RelKind::Owns => (NodeKind::Class, NodeKind::Method),
            RelKind::UsesVar | RelKind::UsesArg | RelKind::Uses | RelKind::UsesReturn => {
                (NodeKind::Method, NodeKind::Class)
            }
            RelKind::Calls => (NodeKind::Method, NodeKind::Method),
        }
    }
}

impl fmt::Display for RelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeRef {
    pub kind: NodeKind,
    pub key: String,
}

impl NodeRef {
    pub fn new(kind: NodeKind, key: &str) -> Self {
        Self {
            kind,
            key: key.to_string(),
        }
    }

    pub fn class(key: &str) -> Self {
        Self::new(NodeKind::Class, key)
    }

    pub fn method(key: &str) -> Self {
        Self::new(NodeKind::Method, key)
    }

    fn pattern(&self, var: &str) -> String {
        format!("({var}:{} {{name: {}}})", self.kind, quote(&self.key))
    }
}

pub type Properties = BTreeMap<String, String>;

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub kind: RelKind,
    pub from: NodeRef,
    pub to: NodeRef,
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphCommand {
    DeleteAll,
    CreateNode(NodeRef),
    CreateRelationship(Relationship),
}

/// Renders the command as a single Cypher statement. This is the line
/// written to the audit log.
impl fmt::Display for GraphCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphCommand::DeleteAll => f.write_str("MATCH (n) DETACH DELETE n"),
            GraphCommand::CreateNode(node) => write!(f, "CREATE {}", node.pattern("n")),
            GraphCommand::CreateRelationship(rel) => {
                write!(
                    f,
                    "MATCH {}, {} CREATE (a)-[:{}",
                    rel.from.pattern("a"),
                    rel.to.pattern("b"),
                    rel.kind
                )?;
                if !rel.properties.is_empty() {
                    let props: Vec<String> = rel
                        .properties
                        .iter()
                        .map(|(key, value)| format!("{}: {}", key, quote(value)))
                        .collect();
                    write!(f, " {{{}}}", props.join(", "))?;
                }
                f.write_str("]->(b)")
            }
        }
    }
}

/// Single-quoted Cypher string literal.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
    out.push('\'');
    out
}

/// A property graph that accepts typed write commands.
pub trait GraphStore {
    fn node_exists(&self, node: &NodeRef) -> Result<bool>;

    fn execute(&mut self, command: &GraphCommand) -> Result<()>;
}

impl<S: GraphStore + ?Sized> GraphStore for &mut S {
    fn node_exists(&self, node: &NodeRef) -> Result<bool> {
        (**self).node_exists(node)
    }

    fn execute(&mut self, command: &GraphCommand) -> Result<()> {
        (**self).execute(command)
    }
}

impl<S: GraphStore + ?Sized> GraphStore for Box<S> {
    fn node_exists(&self, node: &NodeRef) -> Result<bool> {
        (**self).node_exists(node)
    }

    fn execute(&mut self, command: &GraphCommand) -> Result<()> {
        (**self).execute(command)
    }
}
