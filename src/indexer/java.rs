use crate::indexer::bindings::VariableTypeIndex;
use crate::model::ClassFact;
use anyhow::Result;
use std::path::Path;
use tree_sitter::{Node, Parser};

/// Scope threaded down the traversal in place of ancestor lookups.
#[derive(Clone, Default)]
struct Context {
    type_depth: usize,
    class: Option<String>,
    method: Option<String>,
}

pub struct JavaExtractor {
    parser: Parser,
}

impl JavaExtractor {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        let language = tree_sitter_java::LANGUAGE;
        parser.set_language(&language.into())?;
        Ok(Self { parser })
    }

    /// Parses one compilation unit and returns the facts it contributes.
    pub fn extract(&mut self, source: &str, unit_name: &str) -> Result<ClassFact> {
        let mut extractor = FactExtractor::new(unit_name, source);
        match self.parser.parse(source, None) {
            Some(tree) => extractor.visit(tree.root_node()),
            None => tracing::debug!(unit = unit_name, "parser returned no tree"),
        }
        Ok(extractor.finish())
    }
}

/// Name of the class fact a source file contributes to: the file stem.
pub fn unit_name_from_path(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("unit")
        .to_string()
}

/// Accumulates the facts of a single compilation unit.
///
/// Lookups that cannot be resolved (a call outside any method, a type
/// argument in a field type) drop the fact instead of failing.
pub struct FactExtractor<'s> {
    source: &'s str,
    fact: ClassFact,
    bindings: VariableTypeIndex,
}

impl<'s> FactExtractor<'s> {
    pub fn new(unit_name: &str, source: &'s str) -> Self {
        Self {
            source,
            fact: ClassFact::new(unit_name),
            bindings: VariableTypeIndex::new(),
        }
    }

    pub fn visit(&mut self, root: Node<'_>) {
        self.walk_node(root, &Context::default());
    }

    pub fn finish(mut self) -> ClassFact {
        self.fact.variable_bindings = self.bindings.bindings().collect();
        self.fact
    }

    fn walk_node(&mut self, node: Node<'_>, ctx: &Context) {
        match node.kind() {
            "import_declaration" => {
                self.handle_import(node);
                return;
            }
            "class_declaration"
            | "interface_declaration"
            | "enum_declaration"
            | "record_declaration"
            | "annotation_type_declaration" => {
                self.handle_type(node, ctx);
                return;
            }
            "method_declaration" | "constructor_declaration" | "compact_constructor_declaration" => {
                self.handle_method(node, ctx);
                return;
            }
            "field_declaration" => self.handle_field(node),
            "local_variable_declaration" => self.handle_local(node, ctx),
            "method_invocation" => self.handle_call(node, ctx),
            "type_arguments" => self.handle_type_arguments(node, ctx),
            _ => {}
        }
        self.walk_children(node, ctx);
    }

    fn walk_children(&mut self, node: Node<'_>, ctx: &Context) {
        for child in named_children(node) {
            self.walk_node(child, ctx);
        }
    }

    fn handle_import(&mut self, node: Node<'_>) {
        let path = named_children(node)
            .into_iter()
            .filter(|child| matches!(child.kind(), "scoped_identifier" | "identifier"))
            .map(|child| node_text(child, self.source))
            .last();
        if let Some(path) = path.filter(|p| !p.is_empty()) {
            self.fact.imports.insert(path);
        }
    }

    fn handle_type(&mut self, node: Node<'_>, ctx: &Context) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name_node, self.source);
        if name.is_empty() {
            return;
        }
        if ctx.type_depth == 0 {
            self.record_supertypes(node);
        }
        if node.kind() == "record_declaration" {
            self.record_components(node);
        }
        let next_ctx = Context {
            type_depth: ctx.type_depth + 1,
            class: Some(name),
            method: None,
        };
        self.walk_children(node, &next_ctx);
    }

    fn record_supertypes(&mut self, node: Node<'_>) {
        for child in named_children(node) {
            match child.kind() {
                "superclass" => {
                    let ty = first_type_child(child).and_then(|ty| type_name(ty, self.source));
                    if let Some(ty) = ty {
                        self.fact.superclass = Some(ty);
                    }
                }
                "super_interfaces" | "extends_interfaces" => {
                    for ty in type_list_names(child, self.source) {
                        self.fact.interfaces.insert(ty);
                    }
                }
                _ => {}
            }
        }
    }

    /// Record components are the record's fields.
    fn record_components(&mut self, node: Node<'_>) {
        let Some(params) = node.child_by_field_name("parameters") else {
            return;
        };
        for (ty, name) in parameter_types(params, self.source) {
            if let Some(name) = name {
                self.bindings.bind_field(&name, &ty);
            }
            self.fact.composed_types.insert(ty);
        }
    }

    fn handle_field(&mut self, node: Node<'_>) {
        let Some(ty) = node
            .child_by_field_name("type")
            .and_then(|ty| type_name(ty, self.source))
        else {
            return;
        };
        for name in declarator_names(node, self.source) {
            self.bindings.bind_field(&name, &ty);
        }
        self.fact.composed_types.insert(ty);
    }

    fn handle_method(&mut self, node: Node<'_>, ctx: &Context) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name_node, self.source);
        if name.is_empty() {
            return;
        }
        if let Some(ty) = node
            .child_by_field_name("type")
            .and_then(|ty| type_name(ty, self.source))
        {
            self.fact.method_mut(&name).return_type = Some(ty);
        }
        if let Some(params) = node.child_by_field_name("parameters") {
            for (ty, param) in parameter_types(params, self.source) {
                if let Some(param) = param {
                    self.bindings.bind_local(&name, &param, &ty);
                }
                self.fact.method_mut(&name).arg_types.insert(ty);
            }
        }
        let next_ctx = Context {
            method: Some(name),
            ..ctx.clone()
        };
        self.walk_children(node, &next_ctx);
    }

    fn handle_local(&mut self, node: Node<'_>, ctx: &Context) {
        let Some(method) = ctx.method.as_deref() else {
            return;
        };
        let Some(ty) = node
            .child_by_field_name("type")
            .and_then(|ty| type_name(ty, self.source))
            .filter(|ty| ty != "var")
        else {
            return;
        };
        let names = declarator_names(node, self.source);
        let fact = self.fact.method_mut(method);
        fact.local_var_types.insert(ty.clone());
        for name in names {
            self.bindings.bind_local(method, &name, &ty);
            fact.var_info.insert((name, ty.clone()));
        }
    }

    fn handle_call(&mut self, node: Node<'_>, ctx: &Context) {
        let Some(method) = ctx.method.as_deref() else {
            return;
        };
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let target = node_text(name_node, self.source);
        if target.is_empty() {
            return;
        }
        // A bare call targets the enclosing class itself.
        let Some(object) = node.child_by_field_name("object") else {
            return;
        };
        let receiver = compact_text(object, self.source);
        if receiver.is_empty() {
            return;
        }
        let qualifier = resolve_receiver(&self.bindings, method, &receiver);
        tracing::trace!(
            class = ctx.class.as_deref().unwrap_or(""),
            method,
            qualifier = qualifier.as_str(),
            target = target.as_str(),
            "call"
        );
        self.fact.method_mut(method).record_call(&qualifier, &target);
    }

    fn handle_type_arguments(&mut self, node: Node<'_>, ctx: &Context) {
        let Some(method) = ctx.method.as_deref() else {
            return;
        };
        for arg in named_children(node) {
            let ty = match arg.kind() {
                "wildcard" => named_children(arg)
                    .into_iter()
                    .filter(|child| is_type_kind(child.kind()))
                    .last()
                    .and_then(|bound| type_name(bound, self.source)),
                _ => type_name(arg, self.source),
            };
            if let Some(ty) = ty {
                self.fact.method_mut(method).used_types.insert(ty);
            }
        }
    }
}

/// Qualifier of a call: the declared type of the receiver variable when one
/// is known, otherwise the receiver text itself.
fn resolve_receiver(bindings: &VariableTypeIndex, method: &str, receiver: &str) -> String {
    if let Some(field) = receiver.strip_prefix("this.") {
        return bindings.field(field).unwrap_or(receiver).to_string();
    }
    bindings
        .resolve(Some(method), receiver)
        .unwrap_or(receiver)
        .to_string()
}

fn is_type_kind(kind: &str) -> bool {
    matches!(
        kind,
        "type_identifier"
            | "scoped_type_identifier"
            | "generic_type"
            | "array_type"
            | "annotated_type"
            | "integral_type"
            | "floating_point_type"
            | "boolean_type"
            | "void_type"
    )
}

/// Name of a class or interface type with type arguments and annotations
/// stripped. Primitive and void types have no name.
fn type_name(node: Node<'_>, source: &str) -> Option<String> {
    match node.kind() {
        "type_identifier" => Some(node_text(node, source)).filter(|name| !name.is_empty()),
        "scoped_type_identifier" => {
            let parts: Vec<String> = named_children(node)
                .into_iter()
                .filter_map(|child| type_name(child, source))
                .collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join("."))
            }
        }
        "generic_type" => named_children(node)
            .into_iter()
            .find(|child| matches!(child.kind(), "type_identifier" | "scoped_type_identifier"))
            .and_then(|child| type_name(child, source)),
        "array_type" => node
            .child_by_field_name("element")
            .and_then(|element| type_name(element, source)),
        "annotated_type" => named_children(node)
            .into_iter()
            .filter(|child| is_type_kind(child.kind()))
            .last()
            .and_then(|child| type_name(child, source)),
        _ => None,
    }
}

fn first_type_child(node: Node<'_>) -> Option<Node<'_>> {
    named_children(node)
        .into_iter()
        .find(|child| is_type_kind(child.kind()))
}

fn type_list_names(node: Node<'_>, source: &str) -> Vec<String> {
    let mut out = Vec::new();
    for child in named_children(node) {
        if child.kind() != "type_list" {
            continue;
        }
        for ty in named_children(child) {
            if let Some(name) = type_name(ty, source) {
                out.push(name);
            }
        }
    }
    out
}

fn declarator_names(node: Node<'_>, source: &str) -> Vec<String> {
    let mut cursor = node.walk();
    node.children_by_field_name("declarator", &mut cursor)
        .filter_map(|declarator| declarator.child_by_field_name("name"))
        .map(|name| node_text(name, source))
        .filter(|name| !name.is_empty())
        .collect()
}

/// `(type, parameter name)` for each class-typed formal parameter.
fn parameter_types(node: Node<'_>, source: &str) -> Vec<(String, Option<String>)> {
    let mut out = Vec::new();
    for param in named_children(node) {
        let (ty, name) = match param.kind() {
            "formal_parameter" => (
                param.child_by_field_name("type"),
                param.child_by_field_name("name"),
            ),
            "spread_parameter" => (
                first_type_child(param),
                named_children(param)
                    .into_iter()
                    .find(|child| child.kind() == "variable_declarator")
                    .and_then(|declarator| declarator.child_by_field_name("name")),
            ),
            _ => continue,
        };
        let Some(ty) = ty.and_then(|ty| type_name(ty, source)) else {
            continue;
        };
        let name = name
            .map(|name| node_text(name, source))
            .filter(|name| !name.is_empty());
        out.push((ty, name));
    }
    out
}

fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

fn node_text(node: Node<'_>, source: &str) -> String {
    let start = node.start_byte();
    let end = node.end_byte();
    source.get(start..end).unwrap_or("").trim().to_string()
}

/// Node text with line breaks and indentation removed, so a receiver
/// spread over several lines reads the same as a single-line one.
fn compact_text(node: Node<'_>, source: &str) -> String {
    node_text(node, source)
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .concat()
}

#[cfg(test)]
mod tests {
    use super::{JavaExtractor, unit_name_from_path};
    use std::path::Path;

    fn extract(source: &str) -> crate::model::ClassFact {
        let mut extractor = JavaExtractor::new().unwrap();
        extractor.extract(source, "Unit").unwrap()
    }

    #[test]
    fn unit_name_is_file_stem() {
        assert_eq!(
            unit_name_from_path(Path::new("src/com/acme/Widget.java")),
            "Widget"
        );
        assert_eq!(unit_name_from_path(Path::new("Main.java")), "Main");
    }

    #[test]
    fn wildcard_import_records_package() {
        let fact = extract("import java.util.*;\nimport static org.junit.Assert.assertEquals;\nclass Unit {}");
        assert!(fact.imports.contains("java.util"));
        assert!(fact.imports.contains("org.junit.Assert.assertEquals"));
    }

    #[test]
    fn generic_and_array_types_are_erased() {
        let fact = extract(
            r#"
class Unit {
    java.util.List<Item> items;
    java.util.List<Item> all(Map<String, List<Entry>> index) {
        String[] names = {"a"};
        int[] counts = {1};
        return null;
    }
}
"#,
        );
        assert!(fact.composed_types.contains("java.util.List"));
        let method = fact.method("all").unwrap();
        assert_eq!(method.return_type.as_deref(), Some("java.util.List"));
        assert!(method.arg_types.contains("Map"));
        assert!(method.local_var_types.contains("String"));
        assert_eq!(method.local_var_types.len(), 1);
        for used in ["Item", "String", "List", "Entry"] {
            assert!(method.used_types.contains(used), "missing {used}");
        }
    }

    #[test]
    fn type_arguments_outside_methods_are_dropped() {
        let fact = extract("class Unit { java.util.List<Item> items; }");
        assert!(fact.methods.is_empty());
    }

    #[test]
    fn wildcard_bounds_are_used_types() {
        let fact = extract(
            "class Unit { void m() { java.util.List<? extends Shape> shapes = null; } }",
        );
        let method = fact.method("m").unwrap();
        assert!(method.used_types.contains("Shape"));
        assert!(method.local_var_types.contains("java.util.List"));
    }

    #[test]
    fn primitive_and_var_locals_are_skipped() {
        let fact = extract(
            r#"
class Unit {
    void m() {
        int n = 0;
        var w = new Widget();
        w.run();
    }
}
"#,
        );
        let method = fact.method("m").unwrap();
        assert!(method.local_var_types.is_empty());
        assert!(method.var_info.is_empty());
        assert!(method.calls.contains("w::run"));
    }

    #[test]
    fn nested_type_supertypes_do_not_override_unit() {
        let fact = extract(
            r#"
class Unit extends Base implements Api {
    static class Inner extends Other implements Extra {
        void helper(Widget w) { w.go(); }
    }
}
"#,
        );
        assert_eq!(fact.superclass.as_deref(), Some("Base"));
        assert_eq!(fact.interfaces.len(), 1);
        assert!(fact.interfaces.contains("Api"));
        let helper = fact.method("helper").unwrap();
        assert!(helper.calls.contains("Widget::go"));
    }

    #[test]
    fn interface_extends_list_is_recorded() {
        let fact = extract("interface Unit extends Runnable, Comparable<Unit> { Result run(Input in); }");
        assert!(fact.interfaces.contains("Runnable"));
        assert!(fact.interfaces.contains("Comparable"));
        let run = fact.method("run").unwrap();
        assert_eq!(run.return_type.as_deref(), Some("Result"));
        assert!(run.arg_types.contains("Input"));
    }

    #[test]
    fn parameters_resolve_call_receivers() {
        let fact = extract(
            "class Unit { void m(Widget w, String... rest) { w.run(); rest.clone(); } }",
        );
        let method = fact.method("m").unwrap();
        assert!(method.arg_types.contains("Widget"));
        assert!(method.arg_types.contains("String"));
        assert!(method.calls.contains("Widget::run"));
        assert!(method.calls.contains("String::clone"));
        assert!(method.var_info.is_empty());
    }

    #[test]
    fn this_field_receiver_uses_field_type() {
        let fact = extract(
            r#"
class Unit {
    private Repository repo;
    void save() { this.repo.store(); this.flush(); }
}
"#,
        );
        let save = fact.method("save").unwrap();
        assert!(save.calls.contains("Repository::store"));
        assert!(save.calls.contains("this::flush"));
    }

    #[test]
    fn multiline_receiver_is_compacted() {
        let fact = extract(
            r#"
class Unit {
    void m() {
        builder
            .name("x")
            .build();
    }
}
"#,
        );
        let method = fact.method("m").unwrap();
        assert!(method.calls.contains("builder.name(\"x\")::build"));
        assert!(method.calls.contains("builder::name"));
    }

    #[test]
    fn record_components_bind_as_fields() {
        let fact = extract(
            r#"
record Unit(Widget w, int size) {
    void check() {
        w.check();
    }
}
"#,
        );
        assert!(fact.composed_types.contains("Widget"));
        assert_eq!(fact.composed_types.len(), 1);
        let check = fact.method("check").unwrap();
        assert!(check.calls.contains("Widget::check"));
        assert!(check.arg_types.is_empty());
    }

    #[test]
    fn field_declared_after_use_is_not_yet_bound() {
        let fact = extract(
            r#"
class Unit {
    void before() { f.go(); }
    Flow f;
    void after() { f.go(); }
}
"#,
        );
        assert!(fact.method("before").unwrap().calls.contains("f::go"));
        assert!(fact.method("after").unwrap().calls.contains("Flow::go"));
    }

    #[test]
    fn constructor_is_a_method_scope() {
        let fact = extract(
            r#"
class Unit {
    Unit(Config config) {
        Loader loader = new Loader();
        loader.load(config);
    }
}
"#,
        );
        let ctor = fact.method("Unit").unwrap();
        assert!(ctor.arg_types.contains("Config"));
        assert!(ctor.local_var_types.contains("Loader"));
        assert!(ctor.calls.contains("Loader::load"));
    }

    #[test]
    fn calls_outside_methods_are_dropped() {
        let fact = extract(
            r#"
class Unit {
    static final Logger LOG = LoggerFactory.getLogger(Unit.class);
    static { LOG.info("loaded"); }
}
"#,
        );
        assert!(fact.methods.is_empty());
        assert!(fact.composed_types.contains("Logger"));
    }

    #[test]
    fn empty_source_yields_empty_fact() {
        let fact = extract("");
        assert_eq!(fact.name, "Unit");
        assert!(fact.imports.is_empty());
        assert!(fact.methods.is_empty());
        assert!(fact.superclass.is_none());
    }
}
