//! Integration tests for plugin composition and value propagation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::json;
use tessera_core::{
    Args, FieldError, FieldValue, OutputFieldConfig, PluginData, RequestContext, ResolveInfo,
    ResolveParams, Resolver, TypeExpr,
};
use tessera_plugin::{Plugin, PluginChain, ResolveHookParams, ResolveHooks, wrap_field_resolver};

type Log = Arc<Mutex<Vec<String>>>;

struct Marker {
    name: &'static str,
    log: Log,
}

impl Plugin for Marker {
    fn name(&self) -> &str {
        self.name
    }

    fn wrap_resolve(&self, resolver: Resolver, _field: &OutputFieldConfig) -> Resolver {
        let (name, log) = (self.name, Arc::clone(&self.log));
        Resolver::new(move |params| {
            log.lock().unwrap().push(format!("{name}:before"));
            let log = Arc::clone(&log);
            resolver.call(params).map(move |result| {
                log.lock().unwrap().push(format!("{name}:after"));
                result
            })
        })
    }
}

/// Counts resolutions per request and allows reuse of identical invocations.
#[derive(Default)]
struct Dedupe {
    created: AtomicUsize,
}

impl Plugin for Dedupe {
    fn name(&self) -> &str {
        "dedupe"
    }

    fn create_request_data(&self, _context: &RequestContext) -> Option<PluginData> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Some(Arc::new(AtomicUsize::new(0)))
    }

    fn before_resolve(&self, params: &ResolveHookParams<'_>) -> ResolveHooks {
        if let Some(counter) = params
            .request_data
            .and_then(|data| data.downcast_ref::<AtomicUsize>())
        {
            counter.fetch_add(1, Ordering::SeqCst);
        }
        ResolveHooks::new()
    }

    fn allow_reuse(&self, _params: &ResolveHookParams<'_>) -> bool {
        true
    }
}

/// Records whether each resolution failed.
struct Outcome {
    log: Log,
}

impl Plugin for Outcome {
    fn name(&self) -> &str {
        "outcome"
    }

    fn before_resolve(&self, params: &ResolveHookParams<'_>) -> ResolveHooks {
        let log = Arc::clone(&self.log);
        let field = params.field.name.clone();
        ResolveHooks::new().on_resolve(move |result| {
            let status = if result.is_ok() { "ok" } else { "failed" };
            log.lock().unwrap().push(format!("{field}:{status}"));
        })
    }
}

fn field(name: &str) -> Arc<OutputFieldConfig> {
    let mut field = OutputFieldConfig::new(name, TypeExpr::named("Giraffe"));
    field.parent_type = "Query".into();
    Arc::new(field)
}

fn params(parent: FieldValue, context: &RequestContext) -> ResolveParams {
    ResolveParams {
        parent,
        args: Arc::new(Args::new()),
        context: context.clone(),
        info: Arc::new(ResolveInfo {
            field_name: "giraffe".into(),
            parent_type: "Query".into(),
            return_type: TypeExpr::named("Giraffe".to_string()),
        }),
    }
}

#[test]
fn test_first_registered_plugin_is_outermost() {
    let log: Log = Arc::default();
    let mut chain = PluginChain::new();
    chain
        .push(Arc::new(Marker { name: "p1", log: Arc::clone(&log) }))
        .unwrap();
    chain
        .push(Arc::new(Marker { name: "p2", log: Arc::clone(&log) }))
        .unwrap();

    let original = {
        let log = Arc::clone(&log);
        Resolver::sync(move |_| {
            log.lock().unwrap().push("resolve".into());
            Ok(FieldValue::value(json!({"name": "Gerald"})))
        })
    };
    let resolver = wrap_field_resolver(&chain, field("giraffe"), original, true);

    let context = RequestContext::new();
    let value = resolver
        .call(params(FieldValue::Null, &context))
        .into_ready()
        .unwrap()
        .unwrap();

    assert!(value.as_node().is_some());
    assert_eq!(
        *log.lock().unwrap(),
        vec!["p1:before", "p2:before", "resolve", "p2:after", "p1:after"]
    );
}

#[test]
fn test_request_data_shared_within_request() {
    let dedupe = Arc::new(Dedupe::default());
    let mut chain = PluginChain::new();
    chain.push(dedupe.clone()).unwrap();

    let resolver = wrap_field_resolver(
        &chain,
        field("giraffe"),
        Resolver::sync(|_| Ok(FieldValue::value(json!({})))),
        true,
    );

    let first = RequestContext::new();
    resolver.call(params(FieldValue::Null, &first));
    resolver.call(params(FieldValue::Null, &first));
    let second = RequestContext::new();
    resolver.call(params(FieldValue::Null, &second));

    assert_eq!(dedupe.created.load(Ordering::SeqCst), 2);
    let seen = first
        .plugin_data("dedupe")
        .and_then(|data| data.downcast_ref::<AtomicUsize>().map(|c| c.load(Ordering::SeqCst)));
    assert_eq!(seen, Some(2));
}

#[test]
fn test_reuse_skips_original_resolver() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut chain = PluginChain::new();
    chain.push(Arc::new(Dedupe::default())).unwrap();

    let original = {
        let calls = Arc::clone(&calls);
        Resolver::sync(move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(FieldValue::value(json!({"n": 1})))
        })
    };
    let root = wrap_field_resolver(
        &chain,
        field("giraffe"),
        Resolver::sync(|_| Ok(FieldValue::value(json!({})))),
        true,
    );
    let child = wrap_field_resolver(&chain, field("friend"), original, true);

    let context = RequestContext::new();
    let parent = root
        .call(params(FieldValue::Null, &context))
        .into_ready()
        .unwrap()
        .unwrap();

    child.call(params(parent.clone(), &context));
    child.call(params(parent.clone(), &context));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // A root parent has no node to cache on.
    child.call(params(FieldValue::Null, &context));
    child.call(params(FieldValue::Null, &context));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_failures_are_not_reused() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut chain = PluginChain::new();
    chain.push(Arc::new(Dedupe::default())).unwrap();

    let failing = {
        let calls = Arc::clone(&calls);
        Resolver::sync(move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(FieldError::new("boom"))
        })
    };
    let root = wrap_field_resolver(
        &chain,
        field("giraffe"),
        Resolver::sync(|_| Ok(FieldValue::value(json!({})))),
        true,
    );
    let child = wrap_field_resolver(&chain, field("friend"), failing, true);

    let context = RequestContext::new();
    let parent = root
        .call(params(FieldValue::Null, &context))
        .into_ready()
        .unwrap()
        .unwrap();
    assert!(child.call(params(parent.clone(), &context)).into_ready().unwrap().is_err());
    assert!(child.call(params(parent, &context)).into_ready().unwrap().is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_on_resolve_observes_async_failure() {
    let log: Log = Arc::default();
    let mut chain = PluginChain::new();
    chain
        .push(Arc::new(Outcome { log: Arc::clone(&log) }))
        .unwrap();

    let failing = Resolver::from_async(|_| async { Err(FieldError::new("unavailable")) });
    let resolver = wrap_field_resolver(&chain, field("giraffe"), failing, true);

    let context = RequestContext::new();
    let result = resolver.call(params(FieldValue::Null, &context)).await;

    assert_eq!(result.unwrap_err().message, "unavailable");
    assert_eq!(*log.lock().unwrap(), vec!["giraffe:failed"]);
}

#[test]
fn test_overwrite_resolve_replaces_original() {
    struct Override;

    impl Plugin for Override {
        fn name(&self) -> &str {
            "override"
        }

        fn before_resolve(&self, _params: &ResolveHookParams<'_>) -> ResolveHooks {
            ResolveHooks::new().overwrite_resolve(Resolver::sync(|_| Ok(FieldValue::value("mocked"))))
        }
    }

    let mut chain = PluginChain::new();
    chain.push(Arc::new(Override)).unwrap();
    let resolver = wrap_field_resolver(
        &chain,
        field("name"),
        Resolver::sync(|_| Ok(FieldValue::value("real"))),
        false,
    );

    let value = resolver
        .call(params(FieldValue::Null, &RequestContext::new()))
        .into_ready()
        .unwrap()
        .unwrap();
    assert_eq!(value.as_json(), Some(&json!("mocked")));
}
