use crate::model::VariableBinding;
use std::collections::BTreeMap;

/// Declared types of the variables seen so far in one compilation unit.
///
/// Fields live in a class-wide table, locals and parameters in a table per
/// method. A local always shadows a field with the same identifier.
#[derive(Debug, Default, Clone)]
pub struct VariableTypeIndex {
    fields: BTreeMap<String, String>,
    locals: BTreeMap<String, BTreeMap<String, String>>,
}

impl VariableTypeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind_field(&mut self, name: &str, ty: &str) {
        self.fields.insert(name.to_string(), ty.to_string());
    }

    pub fn bind_local(&mut self, method: &str, name: &str, ty: &str) {
        self.locals
            .entry(method.to_string())
            .or_default()
            .insert(name.to_string(), ty.to_string());
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn local(&self, method: &str, name: &str) -> Option<&str> {
        self.locals
            .get(method)
            .and_then(|vars| vars.get(name))
            .map(String::as_str)
    }

    /// Looks `name` up in the locals of `method` first, then in the fields.
    pub fn resolve(&self, method: Option<&str>, name: &str) -> Option<&str> {
        method
            .and_then(|method| self.local(method, name))
            .or_else(|| self.field(name))
    }

    pub fn bindings(&self) -> impl Iterator<Item = VariableBinding> + '_ {
        let globals = self.fields.iter().map(|(name, ty)| VariableBinding::Global {
            name: name.clone(),
            ty: ty.clone(),
        });
        let locals = self.locals.iter().flat_map(|(method, vars)| {
            vars.iter().map(move |(name, ty)| VariableBinding::Local {
                method: method.clone(),
                name: name.clone(),
                ty: ty.clone(),
            })
        });
        globals.chain(locals)
    }
}
