//! Ordered plugin chains and hook composition.
//!
//! Value hooks fold right to left and stop at the first plugin that drops
//! the value. Wrapping hooks nest: the last-registered plugin wraps the
//! original callable, the first-registered plugin wraps everything.

use std::sync::Arc;

use tracing::debug;

use tessera_core::{
    EnumValueConfig, InputFieldConfig, IsTypeOf, OutputFieldConfig, ResolveType, Resolver,
    SchemaError, Subscriber, TypeConfig, TypeGraph,
};

use crate::plugin::Plugin;

/// The plugins taking part in one build, in registration order.
#[derive(Clone, Default)]
pub struct PluginChain {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl PluginChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a plugin.
    ///
    /// # Errors
    ///
    /// Returns an error if a plugin with the same name is already in the chain.
    pub fn push(&mut self, plugin: Arc<dyn Plugin>) -> tessera_core::Result<()> {
        if self.contains(plugin.name()) {
            return Err(SchemaError::PluginRegistration {
                name: plugin.name().to_string(),
            });
        }
        self.plugins.push(plugin);
        Ok(())
    }

    /// Replaces the plugin of the same name, keeping its position. Returns
    /// false if no plugin of that name is in the chain.
    pub fn replace(&mut self, plugin: Arc<dyn Plugin>) -> bool {
        match self.plugins.iter_mut().find(|p| p.name() == plugin.name()) {
            Some(slot) => {
                *slot = plugin;
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.plugins.iter().any(|plugin| plugin.name() == name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Plugins in registration order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Arc<dyn Plugin>> {
        self.plugins.iter()
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|plugin| plugin.name()).collect()
    }

    pub fn on_type_config(&self, config: TypeConfig) -> Option<TypeConfig> {
        let mut current = config;
        for plugin in self.plugins.iter().rev() {
            let name = current.name.clone();
            match plugin.on_type_config(current) {
                Some(next) => current = next,
                None => {
                    debug!(plugin = plugin.name(), type_name = %name, "Plugin dropped type");
                    return None;
                }
            }
        }
        Some(current)
    }

    pub fn on_output_field_config(&self, config: OutputFieldConfig) -> Option<OutputFieldConfig> {
        let mut current = config;
        for plugin in self.plugins.iter().rev() {
            let (parent, name) = (current.parent_type.clone(), current.name.clone());
            match plugin.on_output_field_config(current) {
                Some(next) => current = next,
                None => {
                    debug!(plugin = plugin.name(), type_name = %parent, field = %name, "Plugin dropped field");
                    return None;
                }
            }
        }
        Some(current)
    }

    pub fn on_input_field_config(&self, config: InputFieldConfig) -> Option<InputFieldConfig> {
        let mut current = config;
        for plugin in self.plugins.iter().rev() {
            let (parent, name) = (current.parent_type.clone(), current.name.clone());
            match plugin.on_input_field_config(current) {
                Some(next) => current = next,
                None => {
                    debug!(plugin = plugin.name(), type_name = %parent, input = %name, "Plugin dropped input field");
                    return None;
                }
            }
        }
        Some(current)
    }

    pub fn on_enum_value_config(&self, value: EnumValueConfig) -> Option<EnumValueConfig> {
        let mut current = value;
        for plugin in self.plugins.iter().rev() {
            let (parent, name) = (current.parent_type.clone(), current.name.clone());
            match plugin.on_enum_value_config(current) {
                Some(next) => current = next,
                None => {
                    debug!(plugin = plugin.name(), type_name = %parent, value = %name, "Plugin dropped enum value");
                    return None;
                }
            }
        }
        Some(current)
    }

    /// Runs `before_build` of every plugin in registration order.
    pub fn before_build(&self) {
        for plugin in &self.plugins {
            plugin.before_build();
        }
    }

    pub fn after_build(&self, graph: TypeGraph) -> TypeGraph {
        self.plugins
            .iter()
            .rev()
            .fold(graph, |graph, plugin| plugin.after_build(graph))
    }

    pub fn wrap_resolve(&self, resolver: Resolver, field: &OutputFieldConfig) -> Resolver {
        self.plugins
            .iter()
            .rev()
            .fold(resolver, |resolver, plugin| plugin.wrap_resolve(resolver, field))
    }

    pub fn wrap_subscribe(
        &self,
        subscriber: Option<Subscriber>,
        field: &OutputFieldConfig,
    ) -> Option<Subscriber> {
        self.plugins
            .iter()
            .rev()
            .fold(subscriber, |subscriber, plugin| plugin.wrap_subscribe(subscriber, field))
    }

    pub fn wrap_resolve_type(&self, resolve_type: ResolveType, config: &TypeConfig) -> ResolveType {
        self.plugins
            .iter()
            .rev()
            .fold(resolve_type, |resolve_type, plugin| {
                plugin.wrap_resolve_type(resolve_type, config)
            })
    }

    pub fn wrap_is_type_of(
        &self,
        is_type_of: Option<IsTypeOf>,
        config: &TypeConfig,
    ) -> Option<IsTypeOf> {
        self.plugins
            .iter()
            .rev()
            .fold(is_type_of, |is_type_of, plugin| {
                plugin.wrap_is_type_of(is_type_of, config)
            })
    }
}

impl std::fmt::Debug for PluginChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
