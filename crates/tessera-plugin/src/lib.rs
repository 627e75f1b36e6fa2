//! # tessera-plugin
//!
//! Extension pipeline of the tessera schema engine.
//!
//! A plugin observes, transforms or drops types and fields while a graph is
//! built, and wraps field evaluation at runtime. Plugins of one build form a
//! [`PluginChain`]:
//!
//! - Config hooks fold right to left: for `[P1, P2, P3]` a type config runs
//!   through `P1(P2(P3(config)))`, and any plugin returning `None` drops it
//! - Wrapping hooks nest the same way, so `P1` is the outermost wrapper
//! - [`wrap_field_resolver`] threads per-request and per-node plugin data
//!   through the result tree
//!
//! Plugins are registered by name in a [`PluginRegistry`], usually the
//! process-wide [`PluginRegistry::global`] one.
//!
//! ## Modules
//!
//! - [`plugin`] - The plugin trait and per-resolution hooks
//! - [`chain`] - Hook composition
//! - [`registry`] - Name to constructor registry
//! - [`wrap`] - Resolver wrapping and value propagation

pub mod chain;
pub mod plugin;
pub mod registry;
pub mod wrap;

pub use chain::PluginChain;
pub use plugin::{OnChild, OnResolve, Plugin, ResolveHookParams, ResolveHooks};
pub use registry::{PluginFactory, PluginRegistry};
pub use wrap::wrap_field_resolver;
