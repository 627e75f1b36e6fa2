//! End-to-end execution of built type graphs through async-graphql.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::StreamExt;
use serde_json::json;
use tessera_core::{
    EnumValueConfig, FieldError, FieldValue, InputFieldConfig, IsTypeOf, OutputFieldConfig,
    PluginData, RequestContext, Resolver, Subscriber, TypeExpr, TypeGraph,
};
use tessera_graphql::{LazySchema, SchemaState, execute, subscribe, to_dynamic_schema};
use tessera_plugin::{Plugin, ResolveHookParams, ResolveHooks};
use tessera_schema::{
    BuildConfig, EnumType, InterfaceType, ObjectType, RootType, ScalarType, SchemaBuilder,
};

fn events_builder() -> SchemaBuilder {
    let mut builder = SchemaBuilder::new();
    builder.query_type().unwrap();
    builder
        .query_fields(|| {
            vec![
                OutputFieldConfig::new("events", TypeExpr::list_nn(TypeExpr::named_nn("Event")))
                    .resolve(Resolver::from_async(|_| async {
                        Ok(FieldValue::list([
                            FieldValue::value(json!({"at": "2024-01-01"})),
                            FieldValue::value(json!({"at": "2024-02-29"})),
                        ]))
                    })),
                OutputFieldConfig::new("giraffe", TypeExpr::named("String")).resolve_with(|_| {
                    Err(FieldError::new("No giraffes today").with_extension("code", "E_NONE"))
                }),
            ]
        })
        .unwrap();
    builder
        .object_type(
            ObjectType::new("Event")
                .field(OutputFieldConfig::new("date", TypeExpr::named_nn("Date")).expose("at")),
        )
        .unwrap();
    builder
        .scalar_type(ScalarType::new("Date").description("An ISO-8601 date"))
        .unwrap();
    builder
}

/// Routes build and execution logs to the test output. Set `RUST_LOG` to see them.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn schema(builder: SchemaBuilder) -> async_graphql::dynamic::Schema {
    init_tracing();
    let graph = builder.build(&BuildConfig::default()).unwrap();
    to_dynamic_schema(Arc::new(graph)).unwrap()
}

/// Counts per-request data creation and field resolutions.
#[derive(Default)]
struct Counter {
    created: AtomicUsize,
}

impl Plugin for Counter {
    fn name(&self) -> &str {
        "counter"
    }

    fn create_request_data(&self, _context: &RequestContext) -> Option<PluginData> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Some(Arc::new(AtomicUsize::new(0)))
    }

    fn before_resolve(&self, params: &ResolveHookParams<'_>) -> ResolveHooks {
        if let Some(resolved) = params
            .request_data
            .and_then(|data| data.downcast_ref::<AtomicUsize>())
        {
            resolved.fetch_add(1, Ordering::SeqCst);
        }
        ResolveHooks::new()
    }
}

#[tokio::test]
async fn test_query_across_deferred_types() {
    let schema = schema(events_builder());

    let response = execute(&schema, "{ events { date } }", RequestContext::new()).await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    assert_eq!(
        response.data.into_json().unwrap(),
        json!({"events": [{"date": "2024-01-01"}, {"date": "2024-02-29"}]})
    );
}

#[tokio::test]
async fn test_field_errors_keep_extensions() {
    let schema = schema(events_builder());

    let response = execute(&schema, "{ giraffe }", RequestContext::new()).await;
    assert_eq!(response.errors.len(), 1);
    assert_eq!(response.errors[0].message, "No giraffes today");
    let code = response.errors[0]
        .extensions
        .as_ref()
        .and_then(|extensions| extensions.get("code"))
        .cloned();
    assert_eq!(code, Some(async_graphql::Value::from("E_NONE")));
    assert_eq!(response.data.into_json().unwrap(), json!({"giraffe": null}));
}

#[tokio::test]
async fn test_request_context_is_required() {
    let schema = schema(events_builder());

    let response = schema.execute("{ events { date } }").await;
    assert_eq!(
        response.errors[0].message,
        "Request was executed without a request context"
    );
}

#[tokio::test]
async fn test_plugin_request_data_is_shared_per_request() {
    let counter = Arc::new(Counter::default());
    let mut builder = events_builder();
    builder.add_plugin_arc(counter.clone()).unwrap();
    let schema = schema(builder);

    let context = RequestContext::new();
    let response = execute(
        &schema,
        "{ first: events { date } second: events { date } }",
        context.clone(),
    )
    .await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);

    // Two list fields plus two dates each.
    let resolved = context
        .plugin_data("counter")
        .and_then(|data| data.downcast_ref::<AtomicUsize>().map(|n| n.load(Ordering::SeqCst)));
    assert_eq!(resolved, Some(6));
    assert_eq!(counter.created.load(Ordering::SeqCst), 1);

    execute(&schema, "{ events { date } }", RequestContext::new()).await;
    assert_eq!(counter.created.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_query_through_mutually_recursive_types() {
    let mut builder = SchemaBuilder::new();
    let a = builder.object_ref("A");
    let b = builder.object_ref("B");
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
            vec![OutputFieldConfig::new("a", TypeExpr::named(&to_a)).expose("a")]
        })
        .unwrap();
    builder.implement_object(&a, ObjectType::new("A")).unwrap();
    builder.implement_object(&b, ObjectType::new("B")).unwrap();
    builder
        .root_type(RootType::query().field(
            OutputFieldConfig::new("a", TypeExpr::named(&a)).resolve_with(|_| {
                Ok(FieldValue::value(json!({
                    "name": "outer",
                    "b": {"a": {"name": "inner", "b": null}},
                })))
            }),
        ))
        .unwrap();
    let schema = schema(builder);

    let response = execute(
        &schema,
        "{ a { name b { a { name b { a { name } } } } } }",
        RequestContext::new(),
    )
    .await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    assert_eq!(
        response.data.into_json().unwrap(),
        json!({"a": {"name": "outer", "b": {"a": {"name": "inner", "b": null}}}})
    );
}

#[tokio::test]
async fn test_abstract_types_use_brand_then_is_type_of() {
    let mut builder = SchemaBuilder::new();
    let animal = builder
        .interface_type(
            InterfaceType::new("Animal")
                .field(OutputFieldConfig::new("name", TypeExpr::named_nn("String")).expose("name")),
        )
        .unwrap();
    builder
        .object_type(
            ObjectType::new("Giraffe")
                .implements(&animal)
                .field(OutputFieldConfig::new("height", TypeExpr::named("Float")).expose("height")),
        )
        .unwrap();
    builder
        .object_type(
            ObjectType::new("Sheep")
                .implements(&animal)
                .is_type_of(IsTypeOf::new(|value, _| {
                    value.as_json().is_some_and(|json| json.get("wool").is_some())
                }))
                .field(OutputFieldConfig::new("wool", TypeExpr::named("Boolean")).expose("wool")),
        )
        .unwrap();
    builder
        .root_type(RootType::query().field(
            OutputFieldConfig::new("animals", TypeExpr::list_nn(TypeExpr::named_nn(&animal)))
                .resolve_with(|_| {
                    Ok(FieldValue::list([
                        FieldValue::value(json!({"name": "Gerald", "height": 5.5}))
                            .with_type("Giraffe"),
                        FieldValue::value(json!({"name": "Dolly", "wool": true})),
                    ]))
                }),
        ))
        .unwrap();
    let schema = schema(builder);

    let response = execute(
        &schema,
        "{ animals { __typename name ... on Giraffe { height } ... on Sheep { wool } } }",
        RequestContext::new(),
    )
    .await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    assert_eq!(
        response.data.into_json().unwrap(),
        json!({"animals": [
            {"__typename": "Giraffe", "name": "Gerald", "height": 5.5},
            {"__typename": "Sheep", "name": "Dolly", "wool": true},
        ]})
    );
}

#[tokio::test]
async fn test_enums_map_between_names_and_values() {
    let mut builder = SchemaBuilder::new();
    let color = builder
        .enum_type(
            EnumType::new("Color")
                .value(EnumValueConfig::new("RED").value(1))
                .value(EnumValueConfig::new("BLUE").value(2)),
        )
        .unwrap();
    builder
        .root_type(
            RootType::query()
                .field(
                    OutputFieldConfig::new("paint", TypeExpr::named_nn(&color))
                        .argument(InputFieldConfig::new("color", TypeExpr::named_nn(&color)))
                        .resolve_with(|params| {
                            Ok(FieldValue::value(params.arg("color").cloned().unwrap_or_default()))
                        }),
                )
                .field(
                    OutputFieldConfig::new("code", TypeExpr::named_nn("Int"))
                        .argument(InputFieldConfig::new("color", TypeExpr::named_nn(&color)))
                        .resolve_with(|params| {
                            Ok(FieldValue::value(params.arg("color").cloned().unwrap_or_default()))
                        }),
                ),
        )
        .unwrap();
    let schema = schema(builder);

    let response = execute(
        &schema,
        "{ paint(color: BLUE) code(color: BLUE) }",
        RequestContext::new(),
    )
    .await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    assert_eq!(
        response.data.into_json().unwrap(),
        json!({"paint": "BLUE", "code": 2})
    );
}

#[tokio::test]
async fn test_subscription_events_pass_through_resolver() {
    let mut builder = SchemaBuilder::new();
    builder
        .root_type(RootType::query().field(
            OutputFieldConfig::new("ping", TypeExpr::named("String"))
                .resolve_with(|_| Ok(FieldValue::value("pong"))),
        ))
        .unwrap();
    builder
        .root_type(RootType::subscription().field(
            OutputFieldConfig::new("ticks", TypeExpr::named_nn("Int")).subscribe(Subscriber::sync(
                |_| {
                    Ok(futures_util::stream::iter([1, 2, 3].map(|n| Ok(FieldValue::value(n))))
                        .boxed())
                },
            )),
        ))
        .unwrap();
    let schema = schema(builder);

    let responses: Vec<_> = subscribe(&schema, "subscription { ticks }", RequestContext::new())
        .collect()
        .await;
    let ticks: Vec<_> = responses
        .into_iter()
        .map(|response| response.data.into_json().unwrap())
        .collect();
    assert_eq!(
        ticks,
        vec![json!({"ticks": 1}), json!({"ticks": 2}), json!({"ticks": 3})]
    );
}

#[tokio::test]
async fn test_lazy_schema_builds_once() {
    let builds = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&builds);
    let lazy = LazySchema::new(move || -> tessera_core::Result<TypeGraph> {
        counter.fetch_add(1, Ordering::SeqCst);
        events_builder().build(&BuildConfig::default())
    });

    let first = lazy.get_or_build().await.unwrap();
    let second = lazy.get_or_build().await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(lazy.state().await, SchemaState::Ready);
    assert_eq!(builds.load(Ordering::SeqCst), 1);

    lazy.invalidate().await;
    assert!(lazy.get().await.is_none());
    lazy.get_or_build_wait().await.unwrap();
    assert_eq!(builds.load(Ordering::SeqCst), 2);

    let response = execute(&first, "{ events { date } }", RequestContext::new()).await;
    assert!(response.errors.is_empty());
}
