use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Separator between the qualifier and the method name in a call fact.
pub const CALL_SEPARATOR: &str = "::";

#[derive(Debug, Serialize, Clone, Default, PartialEq, Eq)]
pub struct MethodFact {
    pub name: String,
    pub arg_types: BTreeSet<String>,
    pub local_var_types: BTreeSet<String>,
    pub used_types: BTreeSet<String>,
    pub calls: BTreeSet<String>,
    pub return_type: Option<String>,
    pub var_info: BTreeSet<(String, String)>,
}

impl MethodFact {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn record_call(&mut self, qualifier: &str, method: &str) {
        self.calls.insert(format!("{qualifier}{CALL_SEPARATOR}{method}"));
    }
}

/// Splits a call fact into its qualifier and the called method name.
///
/// The method name is whatever follows the last separator, so a qualifier
/// that itself contains `::` stays intact.
pub fn split_call(call: &str) -> (Option<&str>, &str) {
    match call.rsplit_once(CALL_SEPARATOR) {
        Some((qualifier, method)) => (Some(qualifier), method),
        None => (None, call),
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum VariableBinding {
    Global {
        name: String,
        #[serde(rename = "type")]
        ty: String,
    },
    Local {
        method: String,
        name: String,
        #[serde(rename = "type")]
        ty: String,
    },
}

#[derive(Debug, Serialize, Clone, Default, PartialEq, Eq)]
pub struct ClassFact {
    pub name: String,
    pub imports: BTreeSet<String>,
    pub superclass: Option<String>,
    pub interfaces: BTreeSet<String>,
    pub composed_types: BTreeSet<String>,
    pub methods: BTreeMap<String, MethodFact>,
    pub variable_bindings: BTreeSet<VariableBinding>,
}

impl ClassFact {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Returns the method fact for `name`, creating it on first reference.
    pub fn method_mut(&mut self, name: &str) -> &mut MethodFact {
        self.methods
            .entry(name.to_string())
            .or_insert_with(|| MethodFact::new(name))
    }

    pub fn method(&self, name: &str) -> Option<&MethodFact> {
        self.methods.get(name)
    }

    /// Every class name this fact points at: imports, supertypes, composed
    /// types, and the types used by its methods. Call qualifiers are not
    /// included since they may be expressions rather than types.
    pub fn referenced_classes(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        out.extend(self.imports.iter().cloned());
        out.extend(self.superclass.iter().cloned());
        out.extend(self.interfaces.iter().cloned());
        out.extend(self.composed_types.iter().cloned());
        for method in self.methods.values() {
            out.extend(method.arg_types.iter().cloned());
            out.extend(method.local_var_types.iter().cloned());
            out.extend(method.used_types.iter().cloned());
            out.extend(method.return_type.iter().cloned());
        }
        out
    }
}

#[derive(Debug, Serialize, Clone, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub classes: usize,
    pub nodes_created: usize,
    pub nodes_reused: usize,
    pub relationships: usize,
    /// Classes referenced by the loaded facts but defined by no unit.
    pub referenced_only: usize,
}

#[derive(Debug, Serialize, Clone, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub scanned: usize,
    pub indexed: usize,
    pub skipped: usize,
    pub replaced: usize,
    pub duration_ms: u128,
}
