//! # tessera-graphql
//!
//! Executes tessera type graphs with async-graphql.
//!
//! A built [`TypeGraph`](tessera_core::TypeGraph) is converted into an
//! `async_graphql::dynamic::Schema` whose resolvers call straight into the
//! plugin-wrapped tessera resolvers. Requests are executed with a
//! [`RequestContext`](tessera_core::RequestContext) attached, which is where
//! plugins keep their per-request data.
//!
//! ## Modules
//!
//! - [`convert`] - Type graph to dynamic schema conversion
//! - [`execute`] - Request and subscription execution
//! - [`lazy`] - Lazily built schema holder
//! - [`error`] - Adapter errors

pub mod convert;
pub mod error;
pub mod execute;
pub mod lazy;

pub use convert::{to_dynamic_schema, type_ref};
pub use error::GraphQLAdapterError;
pub use execute::{execute, subscribe};
pub use lazy::{GraphFactory, LazySchema, SchemaState};

/// Result type for adapter operations.
pub type Result<T> = std::result::Result<T, GraphQLAdapterError>;
