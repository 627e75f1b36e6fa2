//! # tessera-core
//!
//! Shared vocabulary of the tessera schema engine.
//!
//! This crate holds everything the registry, the plugin layer and execution
//! adapters agree on:
//!
//! - Type references and type expressions that may point at types which are
//!   not registered yet
//! - Type and field configs as captured at registration time
//! - The runtime value model: field values, value wrapper nodes and the
//!   per-request context with its plugin data bag
//! - Resolver, subscriber and discriminator callables that complete either
//!   synchronously or asynchronously
//! - The finished [`TypeGraph`] produced by a build
//!
//! ## Modules
//!
//! - [`error`] - Configuration and evaluation errors
//! - [`reference`] - Type references and type expressions
//! - [`types`] - Type configs
//! - [`field`] - Field configs
//! - [`runtime`] - Resolvers and deferred values
//! - [`value`] - Field values and value wrapper nodes
//! - [`context`] - Per-request context
//! - [`graph`] - The finished type graph

pub mod context;
pub mod error;
pub mod field;
pub mod graph;
pub mod reference;
pub mod runtime;
pub mod types;
pub mod value;

pub use context::{RequestContext, RequestContextBuilder};
pub use error::{FieldError, SchemaError};
pub use field::{InputFieldConfig, InputFieldKind, OutputFieldConfig};
pub use graph::{GraphEnumValue, GraphField, GraphInputField, GraphType, GraphTypeDetail, TypeGraph};
pub use reference::{
    EnumRef, InputObjectRef, InterfaceRef, ObjectRef, RefId, RootRef, ScalarRef, TypeExpr,
    TypeRef, UnionRef,
};
pub use runtime::{
    Args, EventStream, FieldResult, IsTypeOf, MaybeFuture, ResolveInfo, ResolveParams,
    ResolveType, Resolver, Subscriber,
};
pub use types::{
    BUILTIN_SCALARS, EnumValueConfig, Extensions, RootKind, TypeConfig, TypeDetail, TypeKind,
    is_builtin_scalar,
};
pub use value::{FieldValue, PluginData, ValueNode};

/// Result type for schema construction.
pub type Result<T> = std::result::Result<T, SchemaError>;
