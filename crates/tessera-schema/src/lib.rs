//! # tessera-schema
//!
//! Declarative schema construction for the tessera engine.
//!
//! Types are registered against a [`SchemaBuilder`] in any order. Fields are
//! declared as thunks and may reference types that do not exist yet; nothing
//! is resolved until [`SchemaBuilder::build`] runs, which:
//!
//! - Finalizes the [`TypeRegistry`], failing with one aggregate error for
//!   every reference that was never bound
//! - Runs each type config through the plugin chain exactly once
//! - Builds types phase by phase, merging interface fields into
//!   implementors and wrapping every resolver with the plugin chain
//! - Hands the finished graph to the `after_build` hooks
//!
//! ## Configuration
//!
//! ```toml
//! plugins = ["tracing"]
//! sort_output = true
//! ```
//!
//! ## Modules
//!
//! - [`builder`] - Registration façade and build entry point
//! - [`options`] - Kind-specific registration options
//! - [`registry`] - Reference registry with deferred resolution
//! - [`field_table`] - Deferred field declarations and merging
//! - [`build`] - Phased build orchestrator
//! - [`config`] - Build configuration

pub mod build;
pub mod builder;
pub mod config;
pub mod field_table;
pub mod options;
pub mod registry;

pub use build::BuildPhase;
pub use builder::SchemaBuilder;
pub use config::BuildConfig;
pub use field_table::{FieldTable, InputFieldsThunk, OutputFieldsThunk, inherit_fields};
pub use options::{
    EnumType, InputObjectType, InterfaceType, ObjectType, RootType, ScalarType, UnionType,
};
pub use registry::{Continuation, TypeRegistry};
