//! Per-request context.
//!
//! A [`RequestContext`] is created once per executed operation and passed to
//! every resolver. Besides the application's own data it carries the bag of
//! plugin request data, which lives exactly as long as the context does.
//!
//! # Example
//!
//! ```ignore
//! use tessera_core::RequestContext;
//!
//! let context = RequestContext::builder()
//!     .with_data(current_user)
//!     .build();
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use crate::value::PluginData;

struct ContextInner {
    id: Uuid,
    data: Option<Arc<dyn Any + Send + Sync>>,
    /// Request data per plugin name. `None` records that the plugin was asked
    /// and has nothing to keep for this request.
    plugin_data: DashMap<String, Option<PluginData>>,
}

/// Execution context of one request.
///
/// Cloning is cheap; all clones share the same identity and plugin data.
#[derive(Clone)]
pub struct RequestContext {
    inner: Arc<ContextInner>,
}

impl RequestContext {
    /// Creates an empty context with a fresh request id.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a new builder for RequestContext.
    #[must_use]
    pub fn builder() -> RequestContextBuilder {
        RequestContextBuilder::default()
    }

    /// Request id for tracing and correlation.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Returns the application data if it is of type `T`.
    #[must_use]
    pub fn data<T: Any>(&self) -> Option<&T> {
        self.inner.data.as_deref().and_then(|data| data.downcast_ref::<T>())
    }

    /// Whether both handles refer to the same request.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Returns the request data stored for `plugin`, if it was initialized.
    #[must_use]
    pub fn plugin_data(&self, plugin: &str) -> Option<PluginData> {
        self.inner
            .plugin_data
            .get(plugin)
            .and_then(|entry| entry.value().clone())
    }

    /// Returns the request data for `plugin`, creating it with `init` on first use.
    ///
    /// `init` runs at most once per plugin per request, unless two callers race
    /// on the very first access, in which case the first stored value wins.
    pub fn plugin_data_or_init<F>(&self, plugin: &str, init: F) -> Option<PluginData>
    where
        F: FnOnce() -> Option<PluginData>,
    {
        if let Some(entry) = self.inner.plugin_data.get(plugin) {
            return entry.value().clone();
        }

        // `init` may read this context, so no map guard is held while it runs.
        let created = init();
        self.inner
            .plugin_data
            .entry(plugin.to_string())
            .or_insert(created)
            .value()
            .clone()
    }

    /// Whether request data for `plugin` has been initialized.
    #[must_use]
    pub fn has_plugin_data(&self, plugin: &str) -> bool {
        self.inner.plugin_data.contains_key(plugin)
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("id", &self.inner.id)
            .field("has_data", &self.inner.data.is_some())
            .field("plugins", &self.inner.plugin_data.len())
            .finish()
    }
}

/// Builder for constructing RequestContext.
#[derive(Default)]
pub struct RequestContextBuilder {
    id: Option<Uuid>,
    data: Option<Arc<dyn Any + Send + Sync>>,
}

impl RequestContextBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the request id. A random v4 id is used otherwise.
    #[must_use]
    pub fn with_request_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets the application data resolvers can read back with
    /// [`RequestContext::data`].
    #[must_use]
    pub fn with_data<T: Any + Send + Sync>(mut self, data: T) -> Self {
        self.data = Some(Arc::new(data));
        self
    }

    #[must_use]
    pub fn build(self) -> RequestContext {
        RequestContext {
            inner: Arc::new(ContextInner {
                id: self.id.unwrap_or_else(Uuid::new_v4),
                data: self.data,
                plugin_data: DashMap::new(),
            }),
        }
    }
}
