//! Process-wide plugin registry.
//!
//! Maps plugin names to constructors. A build names the plugins it wants and
//! the registry instantiates a fresh chain for it. Uses DashMap so plugins
//! can be registered from any thread without blocking lookups.

use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, warn};

use tessera_core::SchemaError;

use crate::chain::PluginChain;
use crate::plugin::Plugin;

/// Creates a plugin instance for one build.
pub type PluginFactory = Arc<dyn Fn() -> Arc<dyn Plugin> + Send + Sync>;

static GLOBAL: OnceLock<PluginRegistry> = OnceLock::new();

/// Registry of plugin constructors by name.
#[derive(Default)]
pub struct PluginRegistry {
    factories: DashMap<String, PluginFactory>,
}

impl PluginRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            factories: DashMap::new(),
        }
    }

    /// The process-wide registry.
    pub fn global() -> &'static PluginRegistry {
        GLOBAL.get_or_init(PluginRegistry::new)
    }

    /// Registers a constructor under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::PluginRegistration`] if the name is taken and
    /// `allow_override` is false.
    pub fn register<F>(&self, name: impl Into<String>, factory: F, allow_override: bool) -> tessera_core::Result<()>
    where
        F: Fn() -> Arc<dyn Plugin> + Send + Sync + 'static,
    {
        let name = name.into();
        match self.factories.entry(name) {
            Entry::Occupied(mut entry) => {
                if !allow_override {
                    return Err(SchemaError::PluginRegistration {
                        name: entry.key().clone(),
                    });
                }
                warn!(plugin = %entry.key(), "Overriding registered plugin");
                entry.insert(Arc::new(factory));
            }
            Entry::Vacant(entry) => {
                debug!(plugin = %entry.key(), "Registered plugin");
                entry.insert(Arc::new(factory));
            }
        }
        Ok(())
    }

    /// Registers a plugin type constructed with `Default`.
    ///
    /// # Errors
    ///
    /// Same as [`PluginRegistry::register`].
    pub fn register_default<P>(&self, name: impl Into<String>, allow_override: bool) -> tessera_core::Result<()>
    where
        P: Plugin + Default + 'static,
    {
        self.register(name, || Arc::new(P::default()) as Arc<dyn Plugin>, allow_override)
    }

    /// Removes a constructor. Returns true if it was registered.
    pub fn unregister(&self, name: &str) -> bool {
        self.factories.remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .factories
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Instantiates the named plugins, in the given order, as a new chain.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownPlugin`] for a name with no constructor
    /// and [`SchemaError::PluginRegistration`] if a name is listed twice.
    pub fn instantiate<S: AsRef<str>>(&self, names: &[S]) -> tessera_core::Result<PluginChain> {
        let mut chain = PluginChain::new();
        for name in names {
            let name = name.as_ref();
            // Clone the factory out so no map guard is held while it runs.
            let factory = self
                .factories
                .get(name)
                .map(|entry| Arc::clone(entry.value()))
                .ok_or_else(|| SchemaError::UnknownPlugin {
                    name: name.to_string(),
                })?;
            if chain.contains(name) {
                return Err(SchemaError::PluginRegistration {
                    name: name.to_string(),
                });
            }
            chain.push(factory())?;
        }
        Ok(chain)
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.names())
            .finish()
    }
}
