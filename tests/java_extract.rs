use jgraph::indexer::Indexer;
use jgraph::indexer::bindings::VariableTypeIndex;
use jgraph::indexer::java::JavaExtractor;
use jgraph::model::VariableBinding;
use std::collections::BTreeSet;
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn extract_class_with_supertypes_fields_and_method() {
    let source = "class A extends B implements C, D { E f; void m(F p){ G g; g.x(); } }";
    let mut extractor = JavaExtractor::new().unwrap();
    let fact = extractor.extract(source, "A").unwrap();

    assert_eq!(fact.name, "A");
    assert_eq!(fact.superclass.as_deref(), Some("B"));
    assert_eq!(fact.interfaces, set(&["C", "D"]));
    assert_eq!(fact.composed_types, set(&["E"]));
    assert_eq!(fact.methods.len(), 1);

    let m = fact.method("m").unwrap();
    assert_eq!(m.arg_types, set(&["F"]));
    assert_eq!(m.local_var_types, set(&["G"]));
    assert_eq!(m.calls, set(&["G::x"]));
    assert!(m.used_types.is_empty());
    assert!(m.return_type.is_none());
    assert!(m.var_info.contains(&("g".to_string(), "G".to_string())));
}

#[test]
fn local_binding_shadows_field_of_same_name() {
    let source = r#"
class A {
    Logger obj;

    void m() {
        Widget obj = new Widget();
        obj.run();
    }

    void n() {
        obj.run();
    }
}
"#;
    let mut extractor = JavaExtractor::new().unwrap();
    let fact = extractor.extract(source, "A").unwrap();
    assert_eq!(fact.method("m").unwrap().calls, set(&["Widget::run"]));
    assert_eq!(fact.method("n").unwrap().calls, set(&["Logger::run"]));

    assert!(fact.variable_bindings.contains(&VariableBinding::Global {
        name: "obj".to_string(),
        ty: "Logger".to_string(),
    }));
    assert!(fact.variable_bindings.contains(&VariableBinding::Local {
        method: "m".to_string(),
        name: "obj".to_string(),
        ty: "Widget".to_string(),
    }));
}

#[test]
fn binding_index_prefers_locals() {
    let mut index = VariableTypeIndex::new();
    index.bind_local("m", "obj", "Widget");
    index.bind_field("obj", "Logger");
    assert_eq!(index.resolve(Some("m"), "obj"), Some("Widget"));
    assert_eq!(index.resolve(Some("other"), "obj"), Some("Logger"));
    assert_eq!(index.resolve(None, "obj"), Some("Logger"));
    assert_eq!(index.resolve(Some("m"), "missing"), None);
}

#[test]
fn bare_call_is_not_recorded() {
    let source = "class A { void m() { helper(); } void helper() {} }";
    let mut extractor = JavaExtractor::new().unwrap();
    let fact = extractor.extract(source, "A").unwrap();
    assert!(fact.method("m").is_none());
    assert!(fact.method("helper").is_none());
}

#[test]
fn unbound_receiver_is_used_verbatim() {
    let source = r#"
class A {
    void m() {
        Widget obj;
        obj.run();
        Logger.info("x");
        System.out.println("y");
    }
}
"#;
    let mut extractor = JavaExtractor::new().unwrap();
    let fact = extractor.extract(source, "A").unwrap();
    assert_eq!(
        fact.method("m").unwrap().calls,
        set(&["Widget::run", "Logger::info", "System.out::println"])
    );
}

#[test]
fn call_resolves_against_bindings_declared_before_it() {
    let source = r#"
class A {
    void m() {
        obj.run();
        Widget obj;
        obj.stop();
    }
}
"#;
    let mut extractor = JavaExtractor::new().unwrap();
    let fact = extractor.extract(source, "A").unwrap();
    assert_eq!(
        fact.method("m").unwrap().calls,
        set(&["obj::run", "Widget::stop"])
    );
}

#[test]
fn overloads_share_one_method_and_last_return_type_wins() {
    let source = r#"
class A {
    Foo m(X x) { return null; }
    Bar m(Y y) { return null; }
}
"#;
    let mut extractor = JavaExtractor::new().unwrap();
    let fact = extractor.extract(source, "A").unwrap();
    assert_eq!(fact.methods.len(), 1);
    let m = fact.method("m").unwrap();
    assert_eq!(m.return_type.as_deref(), Some("Bar"));
    assert_eq!(m.arg_types, set(&["X", "Y"]));
}

#[test]
fn later_top_level_superclass_wins() {
    let source = "class A extends B {}\nclass Z extends Q implements R {}";
    let mut extractor = JavaExtractor::new().unwrap();
    let fact = extractor.extract(source, "A").unwrap();
    assert_eq!(fact.superclass.as_deref(), Some("Q"));
    assert_eq!(fact.interfaces, set(&["R"]));
}

#[test]
fn syntax_errors_are_tolerated() {
    let source = "class A { void m() { Widget w; w.run(); } }\n@@@ ###";
    let mut extractor = JavaExtractor::new().unwrap();
    let fact = extractor.extract(source, "A").unwrap();
    assert_eq!(fact.name, "A");
    assert!(fact.method("m").unwrap().calls.contains("Widget::run"));
}

#[test]
fn fixture_example_facts() {
    let mut indexer = Indexer::new().unwrap();
    let (facts, stats) = indexer
        .index_paths(&[fixture_path("java_mvp").join("Example.java")])
        .unwrap();
    assert_eq!(stats.indexed, 1);
    let example = facts.get("Example").unwrap();

    assert_eq!(example.imports, set(&["java.util.ArrayList"]));
    assert_eq!(example.superclass.as_deref(), Some("SuperclassExample"));
    assert_eq!(example.interfaces, set(&["InterfaceExample"]));
    assert!(example.composed_types.is_empty());

    let main = example.method("main").unwrap();
    assert_eq!(main.arg_types, set(&["String"]));
    assert_eq!(main.calls, set(&["System.out::println"]));

    let helper = example.method("helper").unwrap();
    assert_eq!(helper.local_var_types, set(&["String", "ArrayList"]));
    assert_eq!(helper.used_types, set(&["String"]));
    assert_eq!(
        helper.calls,
        set(&["ArrayList::add", "ArrayList::get", "System.out::println"])
    );
    assert!(helper.return_type.is_none());
}

#[test]
fn fixture_directory_facts() {
    let mut indexer = Indexer::new().unwrap();
    let (facts, stats) = indexer.index_paths(&[fixture_path("java_mvp")]).unwrap();
    assert_eq!(stats.scanned, 3);
    assert_eq!(stats.skipped, 0);
    let names: Vec<_> = facts.class_names().collect();
    assert_eq!(names, vec!["Cart", "Example", "Receipt"]);

    let cart = facts.get("Cart").unwrap();
    assert_eq!(
        cart.imports,
        set(&["java.util.List", "java.util.Map", "shop.pricing"])
    );
    assert!(cart.superclass.is_none());
    assert_eq!(cart.interfaces, set(&["Iterable", "Serializable"]));
    assert_eq!(
        cart.composed_types,
        set(&["List", "Logger", "PriceCalculator"])
    );

    let ctor = cart.method("Cart").unwrap();
    assert_eq!(ctor.arg_types, set(&["Logger"]));
    assert!(ctor.calls.is_empty());

    let checkout = cart.method("checkout").unwrap();
    assert_eq!(checkout.return_type.as_deref(), Some("Receipt"));
    assert_eq!(checkout.arg_types, set(&["Customer", "Coupon"]));
    assert_eq!(checkout.local_var_types, set(&["Map", "Receipt"]));
    assert_eq!(checkout.used_types, set(&["String", "Item"]));
    assert_eq!(
        checkout.calls,
        set(&[
            "Receipt::add",
            "Logger::info",
            "PriceCalculator::apply",
            "Logger::flush",
        ])
    );

    let iterator = cart.method("iterator").unwrap();
    assert_eq!(iterator.return_type.as_deref(), Some("Iterator"));
    assert_eq!(iterator.calls, set(&["List::iterator"]));

    let receipt = facts.get("Receipt").unwrap();
    assert_eq!(receipt.superclass.as_deref(), Some("Document"));
    let add = receipt.method("add").unwrap();
    assert_eq!(add.arg_types, set(&["Item"]));
    assert_eq!(add.calls, set(&["Line::render"]));
    assert!(add.var_info.contains(&("line".to_string(), "Line".to_string())));
}
