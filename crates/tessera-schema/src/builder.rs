//! Registration façade and build entry point.

use std::sync::Arc;

use tracing::{debug, info, warn};

use tessera_core::{
    BUILTIN_SCALARS, EnumRef, InputFieldConfig, InputObjectRef, InterfaceRef, ObjectRef,
    OutputFieldConfig, Result, RootKind, RootRef, ScalarRef, SchemaError, TypeConfig, TypeGraph,
    TypeRef, UnionRef,
};
use tessera_plugin::{Plugin, PluginChain, PluginRegistry};

use crate::build::BuildContext;
use crate::config::BuildConfig;
use crate::field_table::{InputFieldsThunk, OutputFieldsThunk};
use crate::options::{
    EnumType, InputObjectType, InterfaceType, ObjectType, RootType, ScalarType, UnionType,
};
use crate::registry::TypeRegistry;

/// Collects type registrations and builds them into a [`TypeGraph`].
///
/// Registration order does not matter: fields may reference types that are
/// registered later, and fields may be added to types that are implemented
/// later through a forward reference.
///
/// # Example
///
/// ```ignore
/// let mut builder = SchemaBuilder::new();
/// let date = builder.scalar_type(ScalarType::new("Date"))?;
/// builder.query_type()?;
/// builder.query_fields(move || {
///     vec![OutputFieldConfig::new("today", TypeExpr::named(date)).resolve_with(today)]
/// })?;
/// let graph = builder.build(&BuildConfig::default())?;
/// ```
pub struct SchemaBuilder {
    registry: TypeRegistry,
    plugins: PluginChain,
    plugin_registry: Option<Arc<PluginRegistry>>,
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaBuilder {
    /// Creates a builder with the built-in scalars registered.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = TypeRegistry::new();
        for name in BUILTIN_SCALARS {
            registry.add_builtin(TypeConfig::scalar(name));
        }
        Self {
            registry,
            plugins: PluginChain::new(),
            plugin_registry: None,
        }
    }

    /// Resolves plugin names in [`BuildConfig::plugins`] against `registry`
    /// instead of the process-wide one.
    #[must_use]
    pub fn with_plugin_registry(mut self, registry: Arc<PluginRegistry>) -> Self {
        self.plugin_registry = Some(registry);
        self
    }

    /// Adds a plugin instance. Plugins added here run before the ones named
    /// in the build config.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::PluginRegistration`] if a plugin with the same
    /// name was already added.
    pub fn add_plugin(&mut self, plugin: impl Plugin + 'static) -> Result<()> {
        self.add_plugin_arc(Arc::new(plugin))
    }

    /// Adds a shared plugin instance.
    ///
    /// # Errors
    ///
    /// Same as [`SchemaBuilder::add_plugin`].
    pub fn add_plugin_arc(&mut self, plugin: Arc<dyn Plugin>) -> Result<()> {
        self.plugins.push(plugin)
    }

    /// The underlying reference registry.
    #[must_use]
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut TypeRegistry {
        &mut self.registry
    }

    /// Registers a raw config under its name and a fresh handle.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateType`] if the name is taken.
    pub fn register_type(&mut self, config: TypeConfig) -> Result<TypeRef> {
        let handle = self.registry.new_handle(Some(&config.name));
        self.registry.add_type_config(config, [handle.clone()])?;
        Ok(handle)
    }

    /// Allocates a reference to an object type implemented later with
    /// [`SchemaBuilder::implement_object`].
    pub fn object_ref(&mut self, name: &str) -> ObjectRef {
        ObjectRef::new(self.registry.new_handle(Some(name)))
    }

    /// Allocates a reference to an interface implemented later with
    /// [`SchemaBuilder::implement_interface`].
    pub fn interface_ref(&mut self, name: &str) -> InterfaceRef {
        InterfaceRef::new(self.registry.new_handle(Some(name)))
    }

    /// Registers an object type.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateType`] if the name is taken.
    pub fn object_type(&mut self, options: ObjectType) -> Result<ObjectRef> {
        let reference = self.object_ref(options.name());
        self.implement_object(&reference, options)?;
        Ok(reference)
    }

    /// Registers an object type and binds `reference` to it.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateType`] if the name is taken, or
    /// [`SchemaError::ReferenceRebound`] if `reference` is already bound.
    pub fn implement_object(&mut self, reference: &ObjectRef, options: ObjectType) -> Result<()> {
        let (config, fields) = options.into_parts();
        self.implement(reference.type_ref(), config, fields)
    }

    /// Registers an interface type.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateType`] if the name is taken.
    pub fn interface_type(&mut self, options: InterfaceType) -> Result<InterfaceRef> {
        let reference = self.interface_ref(options.name());
        self.implement_interface(&reference, options)?;
        Ok(reference)
    }

    /// Registers an interface type and binds `reference` to it.
    ///
    /// # Errors
    ///
    /// Same as [`SchemaBuilder::implement_object`].
    pub fn implement_interface(
        &mut self,
        reference: &InterfaceRef,
        options: InterfaceType,
    ) -> Result<()> {
        let (config, fields) = options.into_parts();
        self.implement(reference.type_ref(), config, fields)
    }

    /// Registers a union type.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateType`] if the name is taken.
    pub fn union_type(&mut self, options: UnionType) -> Result<UnionRef> {
        self.register_type(options.into_config()).map(UnionRef::new)
    }

    /// Registers an enum type.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateType`] if the name is taken, or
    /// [`SchemaError::DuplicateField`] if a value name was added twice.
    pub fn enum_type(&mut self, options: EnumType) -> Result<EnumRef> {
        let config = options.into_config()?;
        self.register_type(config).map(EnumRef::new)
    }

    /// Registers a scalar type.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateType`] if the name is taken, including
    /// the built-in scalar names.
    pub fn scalar_type(&mut self, options: ScalarType) -> Result<ScalarRef> {
        self.register_type(options.into_config()).map(ScalarRef::new)
    }

    /// Registers an input object type.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateType`] if the name is taken.
    pub fn input_type(&mut self, options: InputObjectType) -> Result<InputObjectRef> {
        let (config, fields) = options.into_parts();
        let reference = self.register_type(config)?;
        for thunk in fields {
            self.registry.add_input_fields(&reference, thunk)?;
        }
        Ok(InputObjectRef::new(reference))
    }

    /// Registers a root type.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateType`] if that root is already registered.
    pub fn root_type(&mut self, options: RootType) -> Result<RootRef> {
        debug!(root = ?options.kind(), "Registering root type");
        let (config, fields) = options.into_parts();
        let reference = self.register_type(config)?;
        for thunk in fields {
            self.registry.add_fields(&reference, thunk)?;
        }
        Ok(RootRef::new(reference))
    }

    /// Registers an empty Query root.
    ///
    /// # Errors
    ///
    /// Same as [`SchemaBuilder::root_type`].
    pub fn query_type(&mut self) -> Result<RootRef> {
        self.root_type(RootType::query())
    }

    /// Registers an empty Mutation root.
    ///
    /// # Errors
    ///
    /// Same as [`SchemaBuilder::root_type`].
    pub fn mutation_type(&mut self) -> Result<RootRef> {
        self.root_type(RootType::mutation())
    }

    /// Registers an empty Subscription root.
    ///
    /// # Errors
    ///
    /// Same as [`SchemaBuilder::root_type`].
    pub fn subscription_type(&mut self) -> Result<RootRef> {
        self.root_type(RootType::subscription())
    }

    /// Adds fields to the type `reference` is, or will be, bound to.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::KindMismatch`] if the type cannot own output
    /// fields and is already registered; otherwise the check happens when it
    /// gets registered.
    pub fn fields<F>(&mut self, reference: impl Into<TypeRef>, fields: F) -> Result<()>
    where
        F: FnOnce() -> Vec<OutputFieldConfig> + Send + 'static,
    {
        self.registry.add_fields(&reference.into(), Box::new(fields))
    }

    /// Adds one field to the type `reference` is, or will be, bound to.
    ///
    /// # Errors
    ///
    /// Same as [`SchemaBuilder::fields`].
    pub fn field(&mut self, reference: impl Into<TypeRef>, field: OutputFieldConfig) -> Result<()> {
        self.fields(reference, move || vec![field])
    }

    /// Adds fields to an object type.
    ///
    /// # Errors
    ///
    /// Same as [`SchemaBuilder::fields`].
    pub fn object_fields<F>(&mut self, reference: &ObjectRef, fields: F) -> Result<()>
    where
        F: FnOnce() -> Vec<OutputFieldConfig> + Send + 'static,
    {
        self.fields(reference, fields)
    }

    /// Adds fields to an interface type.
    ///
    /// # Errors
    ///
    /// Same as [`SchemaBuilder::fields`].
    pub fn interface_fields<F>(&mut self, reference: &InterfaceRef, fields: F) -> Result<()>
    where
        F: FnOnce() -> Vec<OutputFieldConfig> + Send + 'static,
    {
        self.fields(reference, fields)
    }

    /// Adds fields to the Query root. The root itself must be registered
    /// before the build.
    ///
    /// # Errors
    ///
    /// Same as [`SchemaBuilder::fields`].
    pub fn query_fields<F>(&mut self, fields: F) -> Result<()>
    where
        F: FnOnce() -> Vec<OutputFieldConfig> + Send + 'static,
    {
        self.fields(TypeRef::named(RootKind::Query.type_name()), fields)
    }

    /// Adds fields to the Mutation root.
    ///
    /// # Errors
    ///
    /// Same as [`SchemaBuilder::fields`].
    pub fn mutation_fields<F>(&mut self, fields: F) -> Result<()>
    where
        F: FnOnce() -> Vec<OutputFieldConfig> + Send + 'static,
    {
        self.fields(TypeRef::named(RootKind::Mutation.type_name()), fields)
    }

    /// Adds fields to the Subscription root.
    ///
    /// # Errors
    ///
    /// Same as [`SchemaBuilder::fields`].
    pub fn subscription_fields<F>(&mut self, fields: F) -> Result<()>
    where
        F: FnOnce() -> Vec<OutputFieldConfig> + Send + 'static,
    {
        self.fields(TypeRef::named(RootKind::Subscription.type_name()), fields)
    }

    /// Adds fields to an input object type.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::KindMismatch`] if the type is not an input object.
    pub fn input_fields<F>(&mut self, reference: impl Into<TypeRef>, fields: F) -> Result<()>
    where
        F: FnOnce() -> Vec<InputFieldConfig> + Send + 'static,
    {
        self.registry.add_input_fields(&reference.into(), Box::new(fields))
    }

    /// Makes `reference` an alias of the type named `name`, now or once that
    /// type is registered.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::ReferenceRebound`] if `reference` is bound to
    /// another type.
    pub fn alias(&mut self, reference: impl Into<TypeRef>, name: &str) -> Result<()> {
        self.registry.associate_deferred(reference.into(), name)
    }

    /// Builds the registered types into a graph.
    ///
    /// The registry is finalized first; every reference that was used but
    /// never bound is reported in one [`SchemaError::UnresolvedReferences`].
    ///
    /// # Errors
    ///
    /// Returns the first configuration error found. Nothing partial is
    /// returned.
    pub fn build(mut self, config: &BuildConfig) -> Result<TypeGraph> {
        config.validate().map_err(SchemaError::InvalidConfig)?;
        let chain = self.assemble_chain(config)?;
        debug!(plugins = ?chain.names(), "Starting type graph build");

        self.registry.finalize()?;
        let fields = self.registry.take_fields();
        let graph = BuildContext::new(&self.registry, &chain, config, fields).run()?;

        let mut graph = chain.after_build(graph);
        graph.rebuild_implementors();
        if config.sort_output {
            graph.sort();
        }

        info!(
            types = graph.len(),
            plugins = chain.len(),
            "Type graph build complete"
        );
        Ok(graph)
    }

    fn implement(
        &mut self,
        reference: &TypeRef,
        config: TypeConfig,
        fields: Vec<OutputFieldsThunk>,
    ) -> Result<()> {
        self.registry.add_type_config(config, [reference.clone()])?;
        for thunk in fields {
            self.registry.add_fields(reference, thunk)?;
        }
        Ok(())
    }

    fn assemble_chain(&self, config: &BuildConfig) -> Result<PluginChain> {
        let mut chain = self.plugins.clone();
        if config.plugins.is_empty() {
            return Ok(chain);
        }

        let registry = self
            .plugin_registry
            .as_deref()
            .unwrap_or_else(|| PluginRegistry::global());
        for plugin in registry.instantiate(&config.plugins)?.iter() {
            if !chain.contains(plugin.name()) {
                chain.push(Arc::clone(plugin))?;
            } else if config.allow_plugin_override {
                warn!(plugin = plugin.name(), "Configured plugin replaces builder plugin");
                chain.replace(Arc::clone(plugin));
            } else {
                return Err(SchemaError::PluginRegistration {
                    name: plugin.name().to_string(),
                });
            }
        }
        Ok(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::{TypeExpr, TypeKind};

    #[test]
    fn test_builtin_scalars_are_registered() {
        let builder = SchemaBuilder::new();
        for name in BUILTIN_SCALARS {
            assert_eq!(
                builder.registry().get(name).map(TypeConfig::kind),
                Some(TypeKind::Scalar)
            );
        }
    }

    #[test]
    fn test_builtin_scalar_names_are_reserved() {
        let mut builder = SchemaBuilder::new();
        let err = builder.scalar_type(ScalarType::new("String")).unwrap_err();
        assert_eq!(err, SchemaError::duplicate_type("String"));
    }

    #[test]
    fn test_forward_object_reference() {
        let mut builder = SchemaBuilder::new();
        let giraffe = builder.object_ref("Giraffe");
        builder
            .object_fields(&giraffe, || {
                vec![OutputFieldConfig::new("name", TypeExpr::named("String")).expose("name")]
            })
            .unwrap();
        assert_eq!(builder.registry().pending_count(), 1);

        builder
            .implement_object(&giraffe, ObjectType::new("Giraffe"))
            .unwrap();
        assert_eq!(builder.registry().pending_count(), 0);
        assert_eq!(builder.registry().name_of(giraffe.type_ref()), Some("Giraffe"));
    }

    #[test]
    fn test_invalid_config_fails_before_build() {
        let config = BuildConfig::default().with_plugin("a").with_plugin("a");
        let err = SchemaBuilder::new().build(&config).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }
}
