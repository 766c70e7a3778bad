use crate::graph::{GraphCommand, GraphStore, NodeKind, NodeRef, RelKind, Relationship};
use anyhow::{Result, bail};
use std::collections::BTreeSet;

/// In-process graph with the same semantics as the SQLite store.
#[derive(Debug, Default, Clone)]
pub struct MemoryGraph {
    nodes: BTreeSet<NodeRef>,
    relationships: Vec<Relationship>,
    commands: usize,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self, kind: NodeKind) -> usize {
        self.nodes.iter().filter(|node| node.kind == kind).count()
    }

    pub fn relationship_count(&self, kind: RelKind) -> usize {
        self.relationships
            .iter()
            .filter(|rel| rel.kind == kind)
            .count()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeRef> {
        self.nodes.iter()
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    /// Number of write commands executed so far.
    pub fn commands(&self) -> usize {
        self.commands
    }
}

impl GraphStore for MemoryGraph {
    fn node_exists(&self, node: &NodeRef) -> Result<bool> {
        Ok(self.nodes.contains(node))
    }

    fn execute(&mut self, command: &GraphCommand) -> Result<()> {
        match command {
            GraphCommand::DeleteAll => {
                self.nodes.clear();
                self.relationships.clear();
            }
            GraphCommand::CreateNode(node) => {
                if !self.nodes.insert(node.clone()) {
                    bail!("{} node {:?} already exists", node.kind, node.key);
                }
            }
            GraphCommand::CreateRelationship(rel) => {
                for end in [&rel.from, &rel.to] {
                    if !self.nodes.contains(end) {
                        bail!("{} endpoint {} {:?} does not exist", rel.kind, end.kind, end.key);
                    }
                }
                self.relationships.push(rel.clone());
            }
        }
        self.commands += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Properties;

    fn extends(from: &str, to: &str) -> GraphCommand {
        GraphCommand::CreateRelationship(Relationship {
            kind: RelKind::Extends,
            from: NodeRef::class(from),
            to: NodeRef::class(to),
            properties: Properties::new(),
        })
    }

    #[test]
    fn duplicate_node_creation_is_rejected() {
        let mut graph = MemoryGraph::new();
        graph.execute(&GraphCommand::CreateNode(NodeRef::class("A"))).unwrap();
        assert!(graph.execute(&GraphCommand::CreateNode(NodeRef::class("A"))).is_err());
        // Same key, different kind is a different node.
        graph.execute(&GraphCommand::CreateNode(NodeRef::method("A"))).unwrap();
        assert_eq!(graph.node_count(NodeKind::Class), 1);
        assert_eq!(graph.node_count(NodeKind::Method), 1);
    }

    #[test]
    fn relationships_are_not_deduplicated() {
        let mut graph = MemoryGraph::new();
        graph.execute(&GraphCommand::CreateNode(NodeRef::class("A"))).unwrap();
        graph.execute(&GraphCommand::CreateNode(NodeRef::class("B"))).unwrap();
        graph.execute(&extends("A", "B")).unwrap();
        graph.execute(&extends("A", "B")).unwrap();
        assert_eq!(graph.relationship_count(RelKind::Extends), 2);
    }

    #[test]
    fn relationship_requires_endpoints() {
        let mut graph = MemoryGraph::new();
        graph.execute(&GraphCommand::CreateNode(NodeRef::class("A"))).unwrap();
        let err = graph.execute(&extends("A", "Missing")).unwrap_err();
        assert!(err.to_string().contains("Missing"));
    }

    #[test]
    fn delete_all_clears_graph() {
        let mut graph = MemoryGraph::new();
        graph.execute(&GraphCommand::CreateNode(NodeRef::class("A"))).unwrap();
        graph.execute(&GraphCommand::CreateNode(NodeRef::class("B"))).unwrap();
        graph.execute(&extends("A", "B")).unwrap();
        graph.execute(&GraphCommand::DeleteAll).unwrap();
        assert_eq!(graph.nodes().count(), 0);
        assert!(graph.relationships().is_empty());
        assert_eq!(graph.commands(), 4);
    }
}
