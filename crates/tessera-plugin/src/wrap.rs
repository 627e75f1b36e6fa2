//! Resolver wrapping and value propagation.
//!
//! [`wrap_field_resolver`] builds the resolver an execution engine actually
//! calls for a field. It nests every plugin's `wrap_resolve` around the
//! original resolver and, around that, threads plugin data through the
//! result tree:
//!
//! 1. each plugin's request data is created on first use and shared by all
//!    fields of the request;
//! 2. when the parent is a value node and every plugin allows it, a result
//!    computed earlier for the same field and arguments is reused;
//! 3. the resolver runs against the raw parent; the first plugin returning
//!    `overwrite_resolve` replaces the original for this invocation, and the
//!    replacement is passed through every `wrap_resolve` hook again before
//!    it runs;
//! 4. non-leaf results are wrapped in [`ValueNode`]s, element by element for
//!    lists, carrying the data each plugin's `on_child` hook computed.
//!
//! Leaf results are returned as produced.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use tessera_core::{
    FieldResult, FieldValue, MaybeFuture, OutputFieldConfig, PluginData, ResolveParams,
    Resolver, ValueNode,
};

use crate::chain::PluginChain;
use crate::plugin::{OnChild, OnResolve, ResolveHookParams};

/// Wraps `resolver` for `field` with every plugin of `chain`.
///
/// `wrap_output` is false for fields returning leaf types, whose values are
/// never wrapped in nodes.
pub fn wrap_field_resolver(
    chain: &PluginChain,
    field: Arc<OutputFieldConfig>,
    resolver: Resolver,
    wrap_output: bool,
) -> Resolver {
    let wrapped = chain.wrap_resolve(resolver, &field);
    if chain.is_empty() {
        return wrapped;
    }

    let chain = chain.clone();
    Resolver::new(move |params| resolve_with_plugins(&chain, &field, &wrapped, params, wrap_output))
}

fn resolve_with_plugins(
    chain: &PluginChain,
    field: &OutputFieldConfig,
    resolver: &Resolver,
    params: ResolveParams,
    wrap_output: bool,
) -> MaybeFuture<FieldResult> {
    let parent_node = params.parent.as_node().cloned();
    let params = params.with_parent(params.parent.unwrap_node().clone());

    let request_data: Vec<Option<PluginData>> = chain
        .iter()
        .map(|plugin| {
            params
                .context
                .plugin_data_or_init(plugin.name(), || plugin.create_request_data(&params.context))
        })
        .collect();

    let hook_params = |index: usize, name: &str| ResolveHookParams {
        field,
        params: &params,
        request_data: request_data[index].as_ref(),
        parent_data: parent_node.as_ref().and_then(|node| node.data(name)),
    };

    let reusable = match &parent_node {
        Some(node)
            if chain
                .iter()
                .enumerate()
                .all(|(index, plugin)| plugin.allow_reuse(&hook_params(index, plugin.name()))) =>
        {
            let key = reuse_key(field, &params);
            if let Some(cached) = node.reusable_child(&key) {
                trace!(type_name = %field.parent_type, field = %field.name, "Reusing resolved child");
                return MaybeFuture::ready(Ok(cached));
            }
            Some((Arc::clone(node), key))
        }
        _ => None,
    };

    let mut overwrite = None;
    let mut on_resolve: Vec<OnResolve> = Vec::new();
    let mut on_child: Vec<(String, OnChild)> = Vec::new();
    for (index, plugin) in chain.iter().enumerate() {
        let hooks = plugin.before_resolve(&hook_params(index, plugin.name()));
        if overwrite.is_none() {
            overwrite = hooks.overwrite_resolve;
        }
        on_resolve.extend(hooks.on_resolve);
        if let Some(hook) = hooks.on_child {
            on_child.push((plugin.name().to_string(), hook));
        }
    }

    // Replacements are per invocation, so their wrapping is too.
    let resolver = match overwrite {
        Some(replacement) => chain.wrap_resolve(replacement, field),
        None => resolver.clone(),
    };
    resolver.call(params).map(move |result| {
        for hook in on_resolve.into_iter().rev() {
            hook(&result);
        }
        let result = result.map(|value| {
            if wrap_output {
                wrap_value(value, parent_node.as_ref(), &on_child, None)
            } else {
                value
            }
        });
        if let (Some((node, key)), Ok(value)) = (reusable, &result) {
            node.store_reusable_child(key, value.clone());
        }
        result
    })
}

/// Identifies an invocation of `field` on one parent.
fn reuse_key(field: &OutputFieldConfig, params: &ResolveParams) -> String {
    let args = serde_json::Value::Object((*params.args).clone());
    format!("{}({args})", field.name)
}

fn wrap_value(
    value: FieldValue,
    parent: Option<&Arc<ValueNode>>,
    on_child: &[(String, OnChild)],
    index: Option<usize>,
) -> FieldValue {
    match value {
        FieldValue::Null | FieldValue::Value(serde_json::Value::Null) => value,
        FieldValue::List(items) => FieldValue::List(
            items
                .into_iter()
                .enumerate()
                .map(|(i, item)| wrap_value(item, parent, on_child, Some(i)))
                .collect(),
        ),
        value => {
            let data: HashMap<String, PluginData> = on_child
                .iter()
                .filter_map(|(name, hook)| hook(&value, index).map(|data| (name.clone(), data)))
                .collect();
            let node = ValueNode::new(value, parent.cloned(), data);
            trace!(depth = node.depth(), "Created value node");
            FieldValue::Node(Arc::new(node))
        }
    }
}
