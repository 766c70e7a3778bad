//! Writes a merged [`FactSet`] into a [`GraphStore`].
//!
//! Nodes are created at most once per `(kind, name)`; relationships are
//! created unconditionally, so loading the same facts twice without a reset
//! duplicates every edge.

use crate::graph::{GraphCommand, GraphStore, NodeRef, Properties, RelKind, Relationship};
use crate::indexer::aggregate::FactSet;
use crate::model::{ClassFact, LoadStats, MethodFact, split_call};
use anyhow::{Context, Result};
use std::io::Write;
use std::time::Instant;
use tracing::{debug, info};

pub struct GraphLoader<S> {
    store: S,
    stats: LoadStats,
}

impl<S: GraphStore> GraphLoader<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            stats: LoadStats::default(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Totals over the lifetime of this loader.
    pub fn stats(&self) -> &LoadStats {
        &self.stats
    }

    /// Deletes every node and relationship in the store.
    pub fn reset(&mut self) -> Result<()> {
        self.store
            .execute(&GraphCommand::DeleteAll)
            .context("reset graph")
    }

    /// Creates the Class node unless it exists. Returns whether it was created.
    pub fn ensure_class_node(&mut self, name: &str) -> Result<bool> {
        self.ensure_node(NodeRef::class(name))
    }

    /// Creates the Method node unless it exists. Methods are keyed by bare
    /// name, so equally named methods of different classes share a node.
    pub fn ensure_method_node(&mut self, name: &str) -> Result<bool> {
        self.ensure_node(NodeRef::method(name))
    }

    fn ensure_node(&mut self, node: NodeRef) -> Result<bool> {
        if self.store.node_exists(&node)? {
            self.stats.nodes_reused += 1;
            return Ok(false);
        }
        let kind = node.kind;
        self.store
            .execute(&GraphCommand::CreateNode(node))
            .with_context(|| format!("create {kind} node"))?;
        self.stats.nodes_created += 1;
        Ok(true)
    }

    pub fn create_relationship(&mut self, kind: RelKind, from: &str, to: &str) -> Result<()> {
        self.create_relationship_with(kind, from, to, Properties::new())
    }

    pub fn create_relationship_with(
        &mut self,
        kind: RelKind,
        from: &str,
        to: &str,
        properties: Properties,
    ) -> Result<()> {
        let (from_kind, to_kind) = kind.endpoints();
        let rel = Relationship {
            kind,
            from: NodeRef::new(from_kind, from),
            to: NodeRef::new(to_kind, to),
            properties,
        };
        self.store
            .execute(&GraphCommand::CreateRelationship(rel))
            .with_context(|| format!("create {kind} relationship {from} -> {to}"))?;
        self.stats.relationships += 1;
        Ok(())
    }

    /// Loads every class in key order, writing one report line per
    /// relationship. Returns the counts for this call only.
    pub fn load(&mut self, facts: &FactSet, report: &mut dyn Write) -> Result<LoadStats> {
        let start = Instant::now();
        let before = self.stats.clone();
        for class in facts.iter() {
            self.load_class(class, report)
                .with_context(|| format!("load class {}", class.name))?;
        }
        let stats = LoadStats {
            classes: self.stats.classes - before.classes,
            nodes_created: self.stats.nodes_created - before.nodes_created,
            nodes_reused: self.stats.nodes_reused - before.nodes_reused,
            relationships: self.stats.relationships - before.relationships,
            referenced_only: facts.referenced_only().len(),
        };
        info!(
            classes = stats.classes,
            referenced_only = stats.referenced_only,
            nodes_created = stats.nodes_created,
            relationships = stats.relationships,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "graph load finished"
        );
        Ok(stats)
    }

    pub fn load_class(&mut self, class: &ClassFact, report: &mut dyn Write) -> Result<()> {
        let c = class.name.as_str();
        writeln!(report, "{c}")?;
        self.ensure_class_node(c)?;

        for import in &class.imports {
            writeln!(report, "{c} imports {import}")?;
            self.ensure_class_node(import)?;
            self.create_relationship(RelKind::Imports, c, import)?;
        }
        if let Some(superclass) = &class.superclass {
            writeln!(report, "{c} extends {superclass}")?;
            self.ensure_class_node(superclass)?;
            self.create_relationship(RelKind::Extends, c, superclass)?;
        }
        for interface in &class.interfaces {
            writeln!(report, "{c} implements {interface}")?;
            self.ensure_class_node(interface)?;
            self.create_relationship(RelKind::Implements, c, interface)?;
        }
        for method in class.methods.values() {
            writeln!(report, "{c} owns {}", method.name)?;
            self.ensure_method_node(&method.name)?;
            self.create_relationship(RelKind::Owns, c, &method.name)?;
            self.load_method(method, report)?;
        }
        for composed in &class.composed_types {
            writeln!(report, "{c} composed by {composed}")?;
            self.ensure_class_node(composed)?;
            self.create_relationship(RelKind::ComposedBy, c, composed)?;
        }

        self.stats.classes += 1;
        debug!(class = c, methods = class.methods.len(), "class loaded");
        Ok(())
    }

    fn load_method(&mut self, method: &MethodFact, report: &mut dyn Write) -> Result<()> {
        let m = method.name.as_str();
        let typed = [
            (&method.local_var_types, RelKind::UsesVar, "localvar"),
            (&method.arg_types, RelKind::UsesArg, "args"),
            (&method.used_types, RelKind::Uses, "use"),
        ];
        for (types, kind, label) in typed {
            for ty in types {
                writeln!(report, "\t{m} {label} {ty}")?;
                self.ensure_class_node(ty)?;
                self.create_relationship(kind, m, ty)?;
            }
        }
        for call in &method.calls {
            writeln!(report, "\t{m} calls {call}")?;
            let (_, target) = split_call(call);
            self.ensure_method_node(target)?;
            let mut properties = Properties::new();
            properties.insert("target".to_string(), call.clone());
            self.create_relationship_with(RelKind::Calls, m, target, properties)?;
        }
        if let Some(ret) = &method.return_type {
            writeln!(report, "\t{m} returns {ret}")?;
            self.ensure_class_node(ret)?;
            self.create_relationship(RelKind::UsesReturn, m, ret)?;
        }
        Ok(())
    }
}
