//! Lazily built schema holder.
//!
//! `LazySchema` defers building the type graph and converting it until the
//! schema is first needed, and rebuilds it after [`LazySchema::invalidate`].

use std::sync::Arc;

use async_graphql::dynamic::Schema;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use tessera_core::TypeGraph;

use crate::convert::to_dynamic_schema;
use crate::error::GraphQLAdapterError;

/// Produces a fresh type graph for every build.
pub type GraphFactory = Arc<dyn Fn() -> tessera_core::Result<TypeGraph> + Send + Sync>;

/// State of the lazy schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaState {
    /// Schema has not been built yet.
    Uninitialized,
    /// Schema is currently being built.
    Building,
    /// Schema is ready for use.
    Ready,
    /// Schema build failed.
    Failed,
}

/// Thread-safe lazy schema holder.
///
/// # Example
///
/// ```ignore
/// let lazy = LazySchema::new(|| {
///     let mut builder = SchemaBuilder::new();
///     register_types(&mut builder)?;
///     builder.build(&BuildConfig::default())
/// });
///
/// let schema = lazy.get_or_build().await?;
/// lazy.invalidate().await;
/// ```
pub struct LazySchema {
    schema: RwLock<Option<Arc<Schema>>>,

    /// Serializes builds.
    build_lock: Mutex<()>,

    state: RwLock<SchemaState>,

    factory: GraphFactory,

    /// Last build error message (for diagnostics).
    last_error: RwLock<Option<String>>,
}

impl LazySchema {
    /// Creates a lazy schema around a graph factory.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> tessera_core::Result<TypeGraph> + Send + Sync + 'static,
    {
        Self {
            schema: RwLock::new(None),
            build_lock: Mutex::new(()),
            state: RwLock::new(SchemaState::Uninitialized),
            factory: Arc::new(factory),
            last_error: RwLock::new(None),
        }
    }

    pub async fn state(&self) -> SchemaState {
        *self.state.read().await
    }

    /// Gets the schema, building it if necessary.
    ///
    /// # Errors
    ///
    /// Returns [`GraphQLAdapterError::SchemaInitializing`] if another build
    /// is in progress, or [`GraphQLAdapterError::SchemaBuildFailed`] if the
    /// build fails.
    pub async fn get_or_build(&self) -> Result<Arc<Schema>, GraphQLAdapterError> {
        if let Some(schema) = self.get().await {
            return Ok(schema);
        }
        if self.state().await == SchemaState::Building {
            return Err(GraphQLAdapterError::SchemaInitializing);
        }
        let Ok(_guard) = self.build_lock.try_lock() else {
            return Err(GraphQLAdapterError::SchemaInitializing);
        };
        if let Some(schema) = self.get().await {
            return Ok(schema);
        }
        self.build().await
    }

    /// Gets the schema, waiting for an in-progress build instead of failing.
    ///
    /// # Errors
    ///
    /// Returns [`GraphQLAdapterError::SchemaBuildFailed`] if the build fails,
    /// or failed before and was not invalidated since.
    pub async fn get_or_build_wait(&self) -> Result<Arc<Schema>, GraphQLAdapterError> {
        if let Some(schema) = self.get().await {
            return Ok(schema);
        }
        let _guard = self.build_lock.lock().await;
        if let Some(schema) = self.get().await {
            return Ok(schema);
        }
        if self.state().await == SchemaState::Failed
            && let Some(err) = self.last_error().await
        {
            return Err(GraphQLAdapterError::SchemaBuildFailed(err));
        }
        self.build().await
    }

    /// Gets the schema if it is already built.
    pub async fn get(&self) -> Option<Arc<Schema>> {
        self.schema.read().await.clone()
    }

    /// Drops the cached schema; the next access rebuilds it.
    pub async fn invalidate(&self) {
        let _guard = self.build_lock.lock().await;

        *self.schema.write().await = None;
        *self.state.write().await = SchemaState::Uninitialized;
        *self.last_error.write().await = None;

        info!("GraphQL schema invalidated - will rebuild on next request");
    }

    pub async fn last_error(&self) -> Option<String> {
        self.last_error.read().await.clone()
    }

    pub async fn is_ready(&self) -> bool {
        self.state().await == SchemaState::Ready
    }

    /// Builds and caches the schema. Callers hold `build_lock`.
    async fn build(&self) -> Result<Arc<Schema>, GraphQLAdapterError> {
        *self.state.write().await = SchemaState::Building;
        info!("Building GraphQL schema...");

        let result = (self.factory)()
            .map_err(GraphQLAdapterError::from)
            .and_then(|graph| to_dynamic_schema(Arc::new(graph)));
        match result {
            Ok(schema) => {
                let schema = Arc::new(schema);
                *self.schema.write().await = Some(Arc::clone(&schema));
                *self.state.write().await = SchemaState::Ready;
                *self.last_error.write().await = None;
                info!("GraphQL schema built successfully");
                Ok(schema)
            }
            Err(e) => {
                let error_msg = match e {
                    GraphQLAdapterError::SchemaBuildFailed(msg) => msg,
                    other => other.to_string(),
                };
                warn!(error = %error_msg, "Failed to build GraphQL schema");
                *self.state.write().await = SchemaState::Failed;
                *self.last_error.write().await = Some(error_msg.clone());
                Err(GraphQLAdapterError::SchemaBuildFailed(error_msg))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tessera_core::SchemaError;

    #[tokio::test]
    async fn test_failed_build_is_remembered() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let lazy = LazySchema::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(SchemaError::unresolved(["B"]))
        });
        assert_eq!(lazy.state().await, SchemaState::Uninitialized);

        let err = lazy.get_or_build().await.unwrap_err();
        assert_eq!(err.error_code(), "SCHEMA_BUILD_FAILED");
        assert_eq!(lazy.state().await, SchemaState::Failed);
        assert_eq!(
            lazy.last_error().await.as_deref(),
            Some("Unresolved type references: B")
        );

        // The wait variant reports the remembered failure without rebuilding.
        assert!(lazy.get_or_build_wait().await.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);

        lazy.invalidate().await;
        assert_eq!(lazy.state().await, SchemaState::Uninitialized);
        assert!(lazy.last_error().await.is_none());
    }

    #[tokio::test]
    async fn test_graph_without_query_root_fails() {
        let lazy = LazySchema::new(|| Ok(TypeGraph::new()));
        let err = lazy.get_or_build().await.unwrap_err();
        assert_eq!(
            err,
            GraphQLAdapterError::SchemaBuildFailed("Type graph has no Query root".into())
        );
        assert!(!lazy.is_ready().await);
    }
}
