//! The plugin trait.
//!
//! Every hook has a pass-through default, so a plugin implements only what
//! it needs. Config hooks return `None` to drop the type, field, argument or
//! enum value they were handed.

use std::fmt;
use std::sync::Arc;

use tessera_core::{
    EnumValueConfig, FieldResult, FieldValue, InputFieldConfig, IsTypeOf, OutputFieldConfig,
    PluginData, RequestContext, ResolveParams, ResolveType, Resolver, Subscriber, TypeConfig,
    TypeGraph,
};

/// Observes the outcome of one field resolution, including failures.
pub type OnResolve = Box<dyn FnOnce(&FieldResult) + Send>;

/// Computes the data a child value node carries for one plugin. Receives the
/// child value and, for list fields, the index of the element.
pub type OnChild = Arc<dyn Fn(&FieldValue, Option<usize>) -> Option<PluginData> + Send + Sync>;

/// What a plugin sees right before a wrapped resolver runs.
pub struct ResolveHookParams<'a> {
    /// The field being resolved.
    pub field: &'a OutputFieldConfig,
    /// Resolver params; `parent` is the raw parent value.
    pub params: &'a ResolveParams,
    /// This plugin's request data.
    pub request_data: Option<&'a PluginData>,
    /// Data this plugin attached to the parent value node.
    pub parent_data: Option<&'a PluginData>,
}

impl fmt::Debug for ResolveHookParams<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveHookParams")
            .field("field", &self.field.name)
            .field("parent_type", &self.field.parent_type)
            .field("has_request_data", &self.request_data.is_some())
            .field("has_parent_data", &self.parent_data.is_some())
            .finish()
    }
}

/// Per-invocation callbacks returned by [`Plugin::before_resolve`].
#[derive(Default)]
pub struct ResolveHooks {
    /// Replaces the resolver for this invocation only.
    pub overwrite_resolve: Option<Resolver>,
    pub on_resolve: Option<OnResolve>,
    pub on_child: Option<OnChild>,
}

impl ResolveHooks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn overwrite_resolve(mut self, resolver: Resolver) -> Self {
        self.overwrite_resolve = Some(resolver);
        self
    }

    #[must_use]
    pub fn on_resolve<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&FieldResult) + Send + 'static,
    {
        self.on_resolve = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_child<F>(mut self, f: F) -> Self
    where
        F: Fn(&FieldValue, Option<usize>) -> Option<PluginData> + Send + Sync + 'static,
    {
        self.on_child = Some(Arc::new(f));
        self
    }

    /// Whether no callback is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.overwrite_resolve.is_none() && self.on_resolve.is_none() && self.on_child.is_none()
    }
}

impl fmt::Debug for ResolveHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveHooks")
            .field("overwrite_resolve", &self.overwrite_resolve.is_some())
            .field("on_resolve", &self.on_resolve.is_some())
            .field("on_child", &self.on_child.is_some())
            .finish()
    }
}

/// An extension taking part in schema construction and field evaluation.
///
/// Plugins in a chain compose innermost-last: for `[P1, P2, P3]` the config
/// hooks run as `P1(P2(P3(config)))` and `P1` is the outermost resolver
/// wrapper.
pub trait Plugin: Send + Sync {
    /// Unique name of the plugin. Request and node data are keyed by it.
    fn name(&self) -> &str;

    fn on_type_config(&self, config: TypeConfig) -> Option<TypeConfig> {
        Some(config)
    }

    fn on_output_field_config(&self, config: OutputFieldConfig) -> Option<OutputFieldConfig> {
        Some(config)
    }

    fn on_input_field_config(&self, config: InputFieldConfig) -> Option<InputFieldConfig> {
        Some(config)
    }

    fn on_enum_value_config(&self, value: EnumValueConfig) -> Option<EnumValueConfig> {
        Some(value)
    }

    /// Runs once before any config hook of a build.
    fn before_build(&self) {}

    /// Runs once on the finished graph.
    fn after_build(&self, graph: TypeGraph) -> TypeGraph {
        graph
    }

    /// Wraps a field's resolver.
    ///
    /// Called once per field when the graph is built. It is called again on
    /// every invocation whose `before_resolve` supplied an
    /// `overwrite_resolve`, since the replacement only exists for that
    /// invocation, so implementations should not do per-field setup here.
    fn wrap_resolve(&self, resolver: Resolver, _field: &OutputFieldConfig) -> Resolver {
        resolver
    }

    fn wrap_subscribe(
        &self,
        subscriber: Option<Subscriber>,
        _field: &OutputFieldConfig,
    ) -> Option<Subscriber> {
        subscriber
    }

    fn wrap_resolve_type(&self, resolve_type: ResolveType, _config: &TypeConfig) -> ResolveType {
        resolve_type
    }

    fn wrap_is_type_of(&self, is_type_of: Option<IsTypeOf>, _config: &TypeConfig) -> Option<IsTypeOf> {
        is_type_of
    }

    /// Creates this plugin's data for a new request. Called at most once per
    /// request, on the first field resolution.
    fn create_request_data(&self, _context: &RequestContext) -> Option<PluginData> {
        None
    }

    fn before_resolve(&self, _params: &ResolveHookParams<'_>) -> ResolveHooks {
        ResolveHooks::default()
    }

    /// Whether a result computed earlier for an equivalent invocation on the
    /// same parent may be returned instead of resolving again. Reuse happens
    /// only when every plugin in the chain agrees.
    fn allow_reuse(&self, _params: &ResolveHookParams<'_>) -> bool {
        false
    }
}

impl fmt::Debug for dyn Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin").field("name", &self.name()).finish()
    }
}
