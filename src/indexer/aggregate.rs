use crate::model::ClassFact;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Run-wide facts keyed by class name.
#[derive(Debug, Serialize, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct FactSet {
    classes: BTreeMap<String, ClassFact>,
}

impl FactSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a unit's facts. A class already present under the same name is
    /// replaced as a whole (last write wins) and handed back to the caller.
    pub fn merge(&mut self, fact: ClassFact) -> Option<ClassFact> {
        self.classes.insert(fact.name.clone(), fact)
    }

    pub fn get(&self, name: &str) -> Option<&ClassFact> {
        self.classes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassFact> {
        self.classes.values()
    }

    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    /// Classes referenced by some fact but not defined by any unit.
    pub fn referenced_only(&self) -> BTreeSet<String> {
        self.classes
            .values()
            .flat_map(ClassFact::referenced_classes)
            .filter(|name| !self.classes.contains_key(name))
            .collect()
    }
}

impl FromIterator<ClassFact> for FactSet {
    fn from_iter<T: IntoIterator<Item = ClassFact>>(iter: T) -> Self {
        let mut set = FactSet::new();
        for fact in iter {
            set.merge(fact);
        }
        set
    }
}

/// Folds per-unit results into the run-wide [`FactSet`].
#[derive(Debug, Default)]
pub struct ClassFactAggregator {
    facts: FactSet,
    units: usize,
    replaced: usize,
}

impl ClassFactAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_unit(&mut self, fact: ClassFact) {
        self.units += 1;
        let name = fact.name.clone();
        if self.facts.merge(fact).is_some() {
            self.replaced += 1;
            tracing::warn!(class = name.as_str(), "class defined by more than one unit; keeping the last");
        }
    }

    pub fn units(&self) -> usize {
        self.units
    }

    pub fn replaced(&self) -> usize {
        self.replaced
    }

    pub fn finish(self) -> FactSet {
        self.facts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(name: &str, superclass: Option<&str>) -> ClassFact {
        let mut fact = ClassFact::new(name);
        fact.superclass = superclass.map(str::to_string);
        fact
    }

    #[test]
    fn later_unit_replaces_earlier() {
        let mut set = FactSet::new();
        assert!(set.merge(class("A", Some("B"))).is_none());
        let previous = set.merge(class("A", Some("C"))).unwrap();
        assert_eq!(previous.superclass.as_deref(), Some("B"));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("A").unwrap().superclass.as_deref(), Some("C"));
    }

    #[test]
    fn replacement_is_not_a_deep_merge() {
        let mut first = class("A", None);
        first.imports.insert("java.util.List".to_string());
        let mut second = class("A", None);
        second.method_mut("m");
        let set: FactSet = vec![first, second].into_iter().collect();
        let merged = set.get("A").unwrap();
        assert!(merged.imports.is_empty());
        assert!(merged.method("m").is_some());
    }

    #[test]
    fn referenced_only_excludes_defined_classes() {
        let set: FactSet = vec![class("A", Some("B")), class("B", Some("Base"))]
            .into_iter()
            .collect();
        let refs = set.referenced_only();
        assert_eq!(refs.into_iter().collect::<Vec<_>>(), vec!["Base".to_string()]);
    }

    #[test]
    fn aggregator_counts_units_and_replacements() {
        let mut aggregator = ClassFactAggregator::new();
        aggregator.add_unit(class("A", None));
        aggregator.add_unit(class("A", None));
        aggregator.add_unit(class("B", None));
        assert_eq!(aggregator.units(), 3);
        assert_eq!(aggregator.replaced(), 1);
        assert_eq!(aggregator.finish().len(), 2);
    }
}
