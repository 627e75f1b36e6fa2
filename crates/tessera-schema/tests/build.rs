//! Integration tests for registration and the phased build.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::json;
use tessera_core::{
    Args, FieldResult, FieldValue, InputFieldConfig, OutputFieldConfig, RequestContext,
    ResolveInfo, ResolveParams, Resolver, SchemaError, TypeConfig, TypeExpr, TypeGraph, TypeKind,
};
use tessera_plugin::{Plugin, PluginRegistry};
use tessera_schema::{
    BuildConfig, EnumType, InputObjectType, InterfaceType, ObjectType, RootType, ScalarType,
    SchemaBuilder, UnionType,
};

fn call(graph: &TypeGraph, type_name: &str, field_name: &str, parent: FieldValue) -> FieldResult {
    let field = graph.field(type_name, field_name).unwrap();
    let params = ResolveParams {
        parent,
        args: Arc::new(Args::new()),
        context: RequestContext::new(),
        info: Arc::new(ResolveInfo {
            field_name: field_name.into(),
            parent_type: type_name.into(),
            return_type: field.ty.clone(),
        }),
    };
    field
        .resolver
        .as_ref()
        .unwrap()
        .call(params)
        .into_ready()
        .unwrap()
}

fn field_names(graph: &TypeGraph, type_name: &str) -> Vec<String> {
    graph.fields(type_name).unwrap().keys().cloned().collect()
}

/// Counts type hook invocations per type name.
#[derive(Default)]
struct CountTypes {
    seen: Mutex<HashMap<String, usize>>,
    builds: AtomicUsize,
}

impl Plugin for CountTypes {
    fn name(&self) -> &str {
        "count"
    }

    fn on_type_config(&self, config: TypeConfig) -> Option<TypeConfig> {
        *self
            .seen
            .lock()
            .unwrap()
            .entry(config.name.clone())
            .or_default() += 1;
        Some(config)
    }

    fn before_build(&self) {
        self.builds.fetch_add(1, Ordering::SeqCst);
    }
}

/// Drops every type whose name is listed.
struct Veto(&'static [&'static str]);

impl Plugin for Veto {
    fn name(&self) -> &str {
        "veto"
    }

    fn on_type_config(&self, config: TypeConfig) -> Option<TypeConfig> {
        (!self.0.contains(&config.name.as_str())).then_some(config)
    }
}

/// Marks the graph and upper-cases every string result.
#[derive(Default)]
struct Shout;

impl Plugin for Shout {
    fn name(&self) -> &str {
        "shout"
    }

    fn wrap_resolve(&self, resolver: Resolver, _field: &OutputFieldConfig) -> Resolver {
        Resolver::new(move |params| {
            resolver.call(params).map(|result| {
                result.map(|value| match value.as_json().and_then(|v| v.as_str()) {
                    Some(text) => FieldValue::value(text.to_uppercase()),
                    None => value,
                })
            })
        })
    }

    fn after_build(&self, mut graph: TypeGraph) -> TypeGraph {
        graph.extensions_mut().insert("shouted".into(), json!(true));
        graph
    }
}

#[test]
fn test_registration_order_does_not_matter() {
    let mut builder = SchemaBuilder::new();

    // Query first, referencing Event by name before it exists.
    builder.query_type().unwrap();
    builder
        .query_fields(|| {
            vec![
                OutputFieldConfig::new("events", TypeExpr::list_nn(TypeExpr::named_nn("Event")))
                    .resolve_with(|_| {
                        Ok(FieldValue::list([FieldValue::value(json!({"at": "2024-01-01"}))]))
                    }),
            ]
        })
        .unwrap();

    let event = builder.object_ref("Event");
    builder
        .object_fields(&event, || {
            vec![OutputFieldConfig::new("date", TypeExpr::named_nn("Date")).expose("at")]
        })
        .unwrap();
    builder.implement_object(&event, ObjectType::new("Event")).unwrap();
    builder.scalar_type(ScalarType::new("Date")).unwrap();

    let graph = builder.build(&BuildConfig::default()).unwrap();

    assert_eq!(graph.field("Query", "events").unwrap().ty.to_string(), "[Event!]!");
    let date = graph.field("Event", "date").unwrap();
    assert_eq!(date.ty.to_string(), "Date!");
    assert_eq!(date.return_kind, TypeKind::Scalar);
    assert_eq!(graph.query_type().map(|ty| ty.name.as_str()), Some("Query"));

    let value = call(&graph, "Event", "date", FieldValue::value(json!({"at": "2024-01-01"}))).unwrap();
    assert_eq!(value.as_json(), Some(&json!("2024-01-01")));
}

#[test]
fn test_unknown_field_type_fails_build() {
    let mut builder = SchemaBuilder::new();
    builder
        .object_type(
            ObjectType::new("A").field(OutputFieldConfig::new("b", TypeExpr::named("B")).expose("b")),
        )
        .unwrap();

    let err = builder.build(&BuildConfig::default()).unwrap_err();
    assert_eq!(err, SchemaError::unresolved(["B"]));
}

#[test]
fn test_unbound_forward_reference_fails_finalize() {
    let mut builder = SchemaBuilder::new();
    let ghost = builder.object_ref("Ghost");
    builder
        .object_fields(&ghost, || {
            vec![OutputFieldConfig::new("boo", TypeExpr::named("String")).expose("boo")]
        })
        .unwrap();

    let err = builder.build(&BuildConfig::default()).unwrap_err();
    assert_eq!(err, SchemaError::unresolved(["Ghost"]));
}

#[test]
fn test_mutually_recursive_types_build() {
    let mut builder = SchemaBuilder::new();
    let a = builder.object_ref("A");
    let b = builder.object_ref("B");

    // Both field lists name the other handle before either is bound.
    let to_b = b.clone();
    builder
        .object_fields(&a, move || {
            vec![
                OutputFieldConfig::new("name", TypeExpr::named("String")).expose("name"),
                OutputFieldConfig::new("b", TypeExpr::named(&to_b)).expose("b"),
            ]
        })
        .unwrap();
    let to_a = a.clone();
    builder
        .object_fields(&b, move || {
            vec![OutputFieldConfig::new("a", TypeExpr::named_nn(&to_a)).expose("a")]
        })
        .unwrap();
    builder.implement_object(&b, ObjectType::new("B")).unwrap();
    builder.implement_object(&a, ObjectType::new("A")).unwrap();
    builder
        .root_type(
            RootType::query()
                .field(OutputFieldConfig::new("a", TypeExpr::named(&a)).expose("a")),
        )
        .unwrap();

    let graph = builder.build(&BuildConfig::default()).unwrap();

    let to_b = graph.field("A", "b").unwrap();
    assert_eq!(to_b.ty.to_string(), "B");
    assert_eq!(to_b.return_kind, TypeKind::Object);
    let to_a = graph.field("B", "a").unwrap();
    assert_eq!(to_a.ty.to_string(), "A!");
    assert_eq!(to_a.return_kind, TypeKind::Object);
    assert_eq!(field_names(&graph, "A"), vec!["name", "b"]);
    assert_eq!(field_names(&graph, "B"), vec!["a"]);
}

#[test]
fn test_field_thunks_run_once_during_build() {
    let thunks = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&thunks);
    let mut builder = SchemaBuilder::new();
    let giraffe = builder.object_ref("Giraffe");
    builder
        .object_fields(&giraffe, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            vec![OutputFieldConfig::new("name", TypeExpr::named("String")).expose("name")]
        })
        .unwrap();
    builder.implement_object(&giraffe, ObjectType::new("Giraffe")).unwrap();

    let graph = builder.build(&BuildConfig::default()).unwrap();
    assert_eq!(thunks.load(Ordering::SeqCst), 1);

    // The finished graph hands out the maps merged during build.
    assert_eq!(field_names(&graph, "Giraffe"), vec!["name"]);
    assert!(graph.field("Giraffe", "name").is_some());
    assert_eq!(thunks.load(Ordering::SeqCst), 1);
}

#[test]
fn test_root_fields_without_root_type() {
    let mut builder = SchemaBuilder::new();
    builder
        .query_fields(|| vec![OutputFieldConfig::new("ping", TypeExpr::named("String")).expose("ping")])
        .unwrap();

    let err = builder.build(&BuildConfig::default()).unwrap_err();
    assert_eq!(err, SchemaError::unresolved(["Query"]));
}

#[test]
fn test_type_hooks_run_once_per_type() {
    let counter = Arc::new(CountTypes::default());
    let mut builder = SchemaBuilder::new();
    builder.add_plugin_arc(counter.clone()).unwrap();

    let node = builder
        .interface_type(
            InterfaceType::new("Node")
                .field(OutputFieldConfig::new("id", TypeExpr::named_nn("ID")).expose("id")),
        )
        .unwrap();
    for name in ["Giraffe", "Sheep", "Llama"] {
        builder
            .object_type(ObjectType::new(name).implements(&node))
            .unwrap();
    }

    let graph = builder.build(&BuildConfig::default()).unwrap();
    assert_eq!(graph.implementors("Node").len(), 3);

    let seen = counter.seen.lock().unwrap();
    assert_eq!(seen.get("Node"), Some(&1));
    assert_eq!(seen.get("Giraffe"), Some(&1));
    assert_eq!(seen.get("ID"), Some(&1));
    assert_eq!(counter.builds.load(Ordering::SeqCst), 1);
}

#[test]
fn test_interface_fields_are_inherited() {
    let mut builder = SchemaBuilder::new();
    let animal = builder
        .interface_type(
            InterfaceType::new("Animal")
                .field(OutputFieldConfig::new("name", TypeExpr::named_nn("String")).expose("name"))
                .field(
                    OutputFieldConfig::new("sound", TypeExpr::named("String"))
                        .description("What it says"),
                ),
        )
        .unwrap();
    builder
        .object_type(
            ObjectType::new("Giraffe")
                .implements(&animal)
                .field(
                    OutputFieldConfig::new("sound", TypeExpr::named("String"))
                        .resolve_with(|_| Ok(FieldValue::value("hum"))),
                )
                .field(OutputFieldConfig::new("height", TypeExpr::named("Float")).expose("height")),
        )
        .unwrap();

    let graph = builder.build(&BuildConfig::default()).unwrap();

    assert_eq!(field_names(&graph, "Giraffe"), vec!["name", "sound", "height"]);
    assert_eq!(field_names(&graph, "Animal"), vec!["name", "sound"]);
    assert_eq!(graph.field("Giraffe", "name").unwrap().parent_type, "Giraffe");
    assert!(graph.field("Giraffe", "sound").unwrap().description.is_none());
    assert!(graph.field("Animal", "sound").unwrap().resolver.is_none());
    assert_eq!(graph.implementors("Animal"), ["Giraffe".to_string()]);

    let name = call(&graph, "Giraffe", "name", FieldValue::value(json!({"name": "Gerald"}))).unwrap();
    assert_eq!(name.as_json(), Some(&json!("Gerald")));
}

#[test]
fn test_inherited_field_without_resolver_is_missing() {
    let mut builder = SchemaBuilder::new();
    let animal = builder
        .interface_type(
            InterfaceType::new("Animal")
                .field(OutputFieldConfig::new("sound", TypeExpr::named("String"))),
        )
        .unwrap();
    builder
        .object_type(ObjectType::new("Giraffe").implements(&animal))
        .unwrap();

    let err = builder.build(&BuildConfig::default()).unwrap_err();
    assert_eq!(
        err,
        SchemaError::missing_implementation("Giraffe", "sound", "resolver")
    );
}

#[test]
fn test_conflicting_interfaces_are_rejected() {
    let mut builder = SchemaBuilder::new();
    let named = builder
        .interface_type(
            InterfaceType::new("Named")
                .field(OutputFieldConfig::new("name", TypeExpr::named("String")).expose("name")),
        )
        .unwrap();
    let labelled = builder
        .interface_type(
            InterfaceType::new("Labelled")
                .field(OutputFieldConfig::new("name", TypeExpr::named("String")).expose("label")),
        )
        .unwrap();
    builder
        .object_type(ObjectType::new("Giraffe").implements(&named).implements(&labelled))
        .unwrap();

    let err = builder.build(&BuildConfig::default()).unwrap_err();
    assert_eq!(err, SchemaError::duplicate_field("Giraffe", "name"));
}

#[test]
fn test_duplicate_field_across_contributions() {
    let mut builder = SchemaBuilder::new();
    let giraffe = builder
        .object_type(
            ObjectType::new("Giraffe")
                .field(OutputFieldConfig::new("name", TypeExpr::named("String")).expose("name")),
        )
        .unwrap();
    builder
        .field(
            &giraffe,
            OutputFieldConfig::new("name", TypeExpr::named("String")).expose("nickname"),
        )
        .unwrap();

    let err = builder.build(&BuildConfig::default()).unwrap_err();
    assert_eq!(err, SchemaError::duplicate_field("Giraffe", "name"));
}

#[test]
fn test_duplicate_type_name() {
    let mut builder = SchemaBuilder::new();
    builder.object_type(ObjectType::new("Giraffe")).unwrap();
    let err = builder.enum_type(EnumType::new("Giraffe")).unwrap_err();
    assert_eq!(err, SchemaError::duplicate_type("Giraffe"));
}

#[test]
fn test_duplicate_enum_value_fails_registration() {
    let mut builder = SchemaBuilder::new();
    let err = builder
        .enum_type(EnumType::new("Color").values(["RED", "BLUE", "RED"]))
        .unwrap_err();
    assert_eq!(err, SchemaError::duplicate_field("Color", "RED"));
    assert!(!builder.registry().contains("Color"));
}

#[test]
fn test_kind_mismatches() {
    let mut builder = SchemaBuilder::new();
    builder.scalar_type(ScalarType::new("Date")).unwrap();
    builder
        .object_type(ObjectType::new("Event").implements("Date"))
        .unwrap();
    let err = builder.build(&BuildConfig::default()).unwrap_err();
    assert_eq!(
        err,
        SchemaError::kind_mismatch("Date", "an Interface", TypeKind::Scalar)
    );

    let mut builder = SchemaBuilder::new();
    builder.object_type(ObjectType::new("Event")).unwrap();
    builder
        .input_type(
            InputObjectType::new("Filter")
                .field(InputFieldConfig::new("event", TypeExpr::named("Event"))),
        )
        .unwrap();
    let err = builder.build(&BuildConfig::default()).unwrap_err();
    assert_eq!(err.error_code(), "KIND_MISMATCH");

    let mut builder = SchemaBuilder::new();
    let err = builder
        .fields("String", || Vec::new())
        .unwrap_err();
    assert_eq!(
        err,
        SchemaError::kind_mismatch("String", "a type with fields", TypeKind::Scalar)
    );
}

#[test]
fn test_missing_resolver_and_default_resolver() {
    let register = || {
        let mut builder = SchemaBuilder::new();
        builder
            .object_type(
                ObjectType::new("Giraffe")
                    .field(OutputFieldConfig::new("name", TypeExpr::named("String"))),
            )
            .unwrap();
        builder
    };

    let err = register().build(&BuildConfig::default()).unwrap_err();
    assert_eq!(err.error_code(), "MISSING_IMPLEMENTATION");

    let graph = register()
        .build(&BuildConfig::default().with_default_field_resolver(true))
        .unwrap();
    let name = call(&graph, "Giraffe", "name", FieldValue::value(json!({"name": "Gerald"}))).unwrap();
    assert_eq!(name.as_json(), Some(&json!("Gerald")));
}

#[test]
fn test_subscription_field_needs_subscriber() {
    let mut builder = SchemaBuilder::new();
    builder
        .root_type(
            RootType::subscription()
                .field(OutputFieldConfig::new("ticks", TypeExpr::named("Int"))),
        )
        .unwrap();

    let err = builder.build(&BuildConfig::default()).unwrap_err();
    assert_eq!(
        err,
        SchemaError::missing_implementation("Subscription", "ticks", "subscriber")
    );
}

#[test]
fn test_vetoed_types_are_pruned() {
    let mut builder = SchemaBuilder::new();
    builder.add_plugin(Veto(&["Secret"])).unwrap();

    let secret = builder.object_type(ObjectType::new("Secret")).unwrap();
    let public = builder.object_type(ObjectType::new("Public")).unwrap();
    builder
        .union_type(UnionType::new("Hidden").member(&secret))
        .unwrap();
    builder
        .union_type(UnionType::new("Anything").member(&secret).member(&public))
        .unwrap();
    builder
        .root_type(
            RootType::query()
                .field(OutputFieldConfig::new("secret", TypeExpr::named(&secret)).expose("secret"))
                .field(OutputFieldConfig::new("hidden", TypeExpr::named("Hidden")).expose("hidden"))
                .field(OutputFieldConfig::new("public", TypeExpr::named(&public)).expose("public")),
        )
        .unwrap();

    let graph = builder.build(&BuildConfig::default()).unwrap();

    assert!(!graph.contains("Secret"));
    assert!(!graph.contains("Hidden"));
    assert_eq!(graph.possible_types("Anything"), vec!["Public"]);
    assert_eq!(field_names(&graph, "Query"), vec!["public"]);
}

#[test]
fn test_sort_output() {
    let mut builder = SchemaBuilder::new();
    builder
        .object_type(
            ObjectType::new("Zebra")
                .field(OutputFieldConfig::new("stripes", TypeExpr::named("Int")).expose("stripes"))
                .field(OutputFieldConfig::new("age", TypeExpr::named("Int")).expose("age")),
        )
        .unwrap();
    builder.enum_type(EnumType::new("Color").values(["RED", "BLUE"])).unwrap();

    let graph = builder
        .build(&BuildConfig::default().with_sort_output(true))
        .unwrap();

    let names: Vec<&str> = graph.types().map(|ty| ty.name.as_str()).collect();
    let mut sorted = names.clone();
    sorted.sort_unstable();
    assert_eq!(names, sorted);
    assert_eq!(field_names(&graph, "Zebra"), vec!["age", "stripes"]);
}

#[test]
fn test_plugins_wrap_resolvers_and_see_the_graph() {
    let mut builder = SchemaBuilder::new();
    builder.add_plugin(Shout).unwrap();
    builder
        .object_type(
            ObjectType::new("Giraffe")
                .field(OutputFieldConfig::new("name", TypeExpr::named("String")).expose("name")),
        )
        .unwrap();

    let graph = builder
        .build(&BuildConfig::default().with_extension("version", "2"))
        .unwrap();

    assert_eq!(graph.extensions().get("shouted"), Some(&json!(true)));
    assert_eq!(graph.extensions().get("version"), Some(&json!("2")));

    // Leaf results are not wrapped in nodes.
    let name = call(&graph, "Giraffe", "name", FieldValue::value(json!({"name": "gerald"}))).unwrap();
    assert!(name.as_node().is_none());
    assert_eq!(name.as_json(), Some(&json!("GERALD")));
}

#[test]
fn test_configured_plugins_come_from_registry() {
    let registry = Arc::new(PluginRegistry::new());
    registry
        .register("shout", || Arc::new(Shout) as Arc<dyn Plugin>, false)
        .unwrap();

    let config = BuildConfig::default().with_plugin("shout");
    let graph = SchemaBuilder::new()
        .with_plugin_registry(Arc::clone(&registry))
        .build(&config)
        .unwrap();
    assert_eq!(graph.extensions().get("shouted"), Some(&json!(true)));

    let err = SchemaBuilder::new()
        .with_plugin_registry(Arc::clone(&registry))
        .build(&BuildConfig::default().with_plugin("whisper"))
        .unwrap_err();
    assert_eq!(err.error_code(), "UNKNOWN_PLUGIN");
}

#[test]
fn test_configured_plugin_replaces_builder_plugin_only_when_allowed() {
    let registry = Arc::new(PluginRegistry::new());
    registry
        .register("shout", || Arc::new(Shout) as Arc<dyn Plugin>, false)
        .unwrap();
    let builder = || {
        let mut builder = SchemaBuilder::new().with_plugin_registry(Arc::clone(&registry));
        builder.add_plugin(Shout).unwrap();
        builder
    };

    let mut config = BuildConfig::default().with_plugin("shout");
    let err = builder().build(&config).unwrap_err();
    assert_eq!(err.error_code(), "PLUGIN_REGISTRATION");

    config.allow_plugin_override = true;
    assert!(builder().build(&config).is_ok());
}

#[test]
fn test_config_from_toml_drives_build() {
    let config: BuildConfig = toml::from_str(
        r#"
        sort_output = true
        default_field_resolver = true
        "#,
    )
    .unwrap();

    let mut builder = SchemaBuilder::new();
    builder
        .object_type(
            ObjectType::new("Giraffe")
                .field(OutputFieldConfig::new("name", TypeExpr::named("String"))),
        )
        .unwrap();
    assert!(builder.build(&config).is_ok());
}
