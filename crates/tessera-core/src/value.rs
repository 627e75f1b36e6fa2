//! Runtime values and value wrapper nodes.
//!
//! Resolvers return [`FieldValue`]s. The resolver-wrapping layer wraps every
//! non-leaf result in a [`ValueNode`], which keeps a back-reference to the
//! parent node and the plugin data each plugin decided the children should
//! see. Parents are shared (`Arc`) and never point at their children, so the
//! nodes form a tree that lives exactly as long as one result subtree.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

/// Opaque, plugin-owned data attached to a request or a value node.
pub type PluginData = Arc<dyn Any + Send + Sync>;

/// A value produced by a resolver.
#[derive(Clone, Default)]
pub enum FieldValue {
    #[default]
    Null,
    /// A JSON value; leaves are always JSON.
    Value(serde_json::Value),
    /// An arbitrary Rust value, for object-typed fields.
    Any(Arc<dyn Any + Send + Sync>),
    List(Vec<FieldValue>),
    /// A value annotated with its concrete object type.
    Typed {
        type_name: String,
        value: Box<FieldValue>,
    },
    /// A value wrapped by the resolver-wrapping layer.
    Node(Arc<ValueNode>),
}

impl FieldValue {
    /// Creates a JSON value.
    pub fn value(value: impl Into<serde_json::Value>) -> Self {
        Self::Value(value.into())
    }

    /// Creates a value holding an arbitrary Rust object.
    pub fn owned_any<T: Any + Send + Sync>(value: T) -> Self {
        Self::Any(Arc::new(value))
    }

    pub fn list(values: impl IntoIterator<Item = FieldValue>) -> Self {
        Self::List(values.into_iter().collect())
    }

    /// Brands this value with its concrete object type.
    #[must_use]
    pub fn with_type(self, type_name: impl Into<String>) -> Self {
        Self::Typed {
            type_name: type_name.into(),
            value: Box::new(self),
        }
    }

    /// Returns the raw value, looking through wrapper nodes and type brands.
    #[must_use]
    pub fn raw(&self) -> &FieldValue {
        match self {
            Self::Typed { value, .. } => value.raw(),
            Self::Node(node) => node.value().raw(),
            other => other,
        }
    }

    /// Returns the value without its wrapper node, keeping any type brand.
    #[must_use]
    pub fn unwrap_node(&self) -> &FieldValue {
        match self {
            Self::Node(node) => node.value().unwrap_node(),
            other => other,
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(
            self.raw(),
            Self::Null | Self::Value(serde_json::Value::Null)
        )
    }

    /// The concrete type brand, if one was attached when the value was produced.
    #[must_use]
    pub fn type_brand(&self) -> Option<&str> {
        match self {
            Self::Typed { type_name, .. } => Some(type_name),
            Self::Node(node) => node.value().type_brand(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self.raw() {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self.raw() {
            Self::Any(value) => value.downcast_ref::<T>(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self.raw() {
            Self::List(values) => Some(values),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_node(&self) -> Option<&Arc<ValueNode>> {
        match self {
            Self::Node(node) => Some(node),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        Self::Value(value)
    }
}

impl fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Any(_) => f.write_str("Any(..)"),
            Self::List(values) => f.debug_tuple("List").field(values).finish(),
            Self::Typed { type_name, value } => f
                .debug_struct("Typed")
                .field("type_name", type_name)
                .field("value", value)
                .finish(),
            Self::Node(node) => f.debug_tuple("Node").field(node).finish(),
        }
    }
}

/// A resolved value together with its parent node and per-plugin data.
pub struct ValueNode {
    value: FieldValue,
    parent: Option<Arc<ValueNode>>,
    data: HashMap<String, PluginData>,
    /// Child results plugins allowed to be reused, keyed by field invocation.
    reusable: DashMap<String, FieldValue>,
}

impl ValueNode {
    pub fn new(
        value: FieldValue,
        parent: Option<Arc<ValueNode>>,
        data: HashMap<String, PluginData>,
    ) -> Self {
        Self {
            value,
            parent,
            data,
            reusable: DashMap::new(),
        }
    }

    #[must_use]
    pub fn value(&self) -> &FieldValue {
        &self.value
    }

    #[must_use]
    pub fn parent(&self) -> Option<&Arc<ValueNode>> {
        self.parent.as_ref()
    }

    /// Data the named plugin attached to this node.
    #[must_use]
    pub fn data(&self, plugin: &str) -> Option<&PluginData> {
        self.data.get(plugin)
    }

    /// Number of ancestors above this node.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.parent.as_ref();
        while let Some(node) = current {
            depth += 1;
            current = node.parent.as_ref();
        }
        depth
    }

    pub fn reusable_child(&self, key: &str) -> Option<FieldValue> {
        self.reusable.get(key).map(|entry| entry.value().clone())
    }

    pub fn store_reusable_child(&self, key: impl Into<String>, value: FieldValue) {
        self.reusable.insert(key.into(), value);
    }
}

impl fmt::Debug for ValueNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut plugins: Vec<&str> = self.data.keys().map(String::as_str).collect();
        plugins.sort_unstable();
        f.debug_struct("ValueNode")
            .field("value", &self.value)
            .field("depth", &self.depth())
            .field("plugins", &plugins)
            .finish()
    }
}
