//! Type configs: the registered description of one named type.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::reference::TypeRef;
use crate::runtime::{IsTypeOf, ResolveType};

/// Plugin-attached data carried by types, fields and enum values.
pub type Extensions = serde_json::Map<String, serde_json::Value>;

/// Scalars every graph starts with.
pub const BUILTIN_SCALARS: [&str; 5] = ["String", "Int", "Float", "Boolean", "ID"];

#[must_use]
pub fn is_builtin_scalar(name: &str) -> bool {
    BUILTIN_SCALARS.contains(&name)
}

/// Kind of a named type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    Object,
    Interface,
    Union,
    Enum,
    Scalar,
    InputObject,
    Query,
    Mutation,
    Subscription,
}

impl TypeKind {
    /// Whether values of this kind may be returned by output fields.
    #[must_use]
    pub fn is_output(self) -> bool {
        !matches!(self, Self::InputObject)
    }

    /// Whether this kind may be used for arguments and input fields.
    #[must_use]
    pub fn is_input(self) -> bool {
        matches!(self, Self::Enum | Self::Scalar | Self::InputObject)
    }

    /// Leaf kinds have no fields and are never wrapped at evaluation time.
    #[must_use]
    pub fn is_leaf(self) -> bool {
        matches!(self, Self::Enum | Self::Scalar)
    }

    #[must_use]
    pub fn is_abstract(self) -> bool {
        matches!(self, Self::Interface | Self::Union)
    }

    #[must_use]
    pub fn is_root(self) -> bool {
        matches!(self, Self::Query | Self::Mutation | Self::Subscription)
    }

    /// Kinds that own an output field map.
    #[must_use]
    pub fn has_output_fields(self) -> bool {
        matches!(self, Self::Object | Self::Interface) || self.is_root()
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Object => "Object",
            Self::Interface => "Interface",
            Self::Union => "Union",
            Self::Enum => "Enum",
            Self::Scalar => "Scalar",
            Self::InputObject => "InputObject",
            Self::Query => "Query",
            Self::Mutation => "Mutation",
            Self::Subscription => "Subscription",
        };
        f.write_str(name)
    }
}

/// The three root operation types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RootKind {
    Query,
    Mutation,
    Subscription,
}

impl RootKind {
    /// The reserved type name of this root.
    #[must_use]
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Query => "Query",
            Self::Mutation => "Mutation",
            Self::Subscription => "Subscription",
        }
    }

    #[must_use]
    pub fn kind(self) -> TypeKind {
        match self {
            Self::Query => TypeKind::Query,
            Self::Mutation => TypeKind::Mutation,
            Self::Subscription => TypeKind::Subscription,
        }
    }
}

/// One value of an enum type.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumValueConfig {
    /// Public name of the value.
    pub name: String,
    /// Enum type owning this value.
    pub parent_type: String,
    /// Internal value resolvers produce and arguments carry.
    pub value: serde_json::Value,
    pub description: Option<String>,
    pub deprecation_reason: Option<String>,
    pub extensions: Extensions,
}

impl EnumValueConfig {
    /// Creates a value whose internal representation is its own name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            value: serde_json::Value::String(name.clone()),
            name,
            parent_type: String::new(),
            description: None,
            deprecation_reason: None,
            extensions: Extensions::new(),
        }
    }

    /// Sets the internal value.
    #[must_use]
    pub fn value(mut self, value: impl Into<serde_json::Value>) -> Self {
        self.value = value.into();
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn deprecation_reason(mut self, reason: impl Into<String>) -> Self {
        self.deprecation_reason = Some(reason.into());
        self
    }
}

/// Kind-specific part of a [`TypeConfig`].
#[derive(Debug, Clone)]
pub enum TypeDetail {
    Object {
        interfaces: Vec<TypeRef>,
        is_type_of: Option<IsTypeOf>,
    },
    Interface {
        interfaces: Vec<TypeRef>,
        resolve_type: Option<ResolveType>,
    },
    Union {
        members: Vec<TypeRef>,
        resolve_type: Option<ResolveType>,
    },
    Enum {
        values: IndexMap<String, EnumValueConfig>,
    },
    Scalar {
        specified_by_url: Option<String>,
    },
    InputObject,
    Root(RootKind),
}

/// Registered description of one named type.
///
/// The name is globally unique within one registry.
#[derive(Debug, Clone)]
pub struct TypeConfig {
    pub name: String,
    pub description: Option<String>,
    pub extensions: Extensions,
    pub detail: TypeDetail,
}

impl TypeConfig {
    fn with_detail(name: impl Into<String>, detail: TypeDetail) -> Self {
        Self {
            name: name.into(),
            description: None,
            extensions: Extensions::new(),
            detail,
        }
    }

    pub fn object(name: impl Into<String>) -> Self {
        Self::with_detail(
            name,
            TypeDetail::Object {
                interfaces: Vec::new(),
                is_type_of: None,
            },
        )
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self::with_detail(
            name,
            TypeDetail::Interface {
                interfaces: Vec::new(),
                resolve_type: None,
            },
        )
    }

    pub fn union(name: impl Into<String>, members: Vec<TypeRef>) -> Self {
        Self::with_detail(
            name,
            TypeDetail::Union {
                members,
                resolve_type: None,
            },
        )
    }

    /// Creates an enum config; each value's `parent_type` is set to `name`.
    pub fn enumeration(name: impl Into<String>, values: Vec<EnumValueConfig>) -> Self {
        let name = name.into();
        let values = values
            .into_iter()
            .map(|mut value| {
                value.parent_type.clone_from(&name);
                (value.name.clone(), value)
            })
            .collect();
        Self::with_detail(name, TypeDetail::Enum { values })
    }

    pub fn scalar(name: impl Into<String>) -> Self {
        Self::with_detail(
            name,
            TypeDetail::Scalar {
                specified_by_url: None,
            },
        )
    }

    pub fn input_object(name: impl Into<String>) -> Self {
        Self::with_detail(name, TypeDetail::InputObject)
    }

    /// Creates a root config under the reserved root name.
    #[must_use]
    pub fn root(kind: RootKind) -> Self {
        Self::with_detail(kind.type_name(), TypeDetail::Root(kind))
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn extension(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extensions.insert(key.into(), value.into());
        self
    }

    /// Returns the kind of this config.
    #[must_use]
    pub fn kind(&self) -> TypeKind {
        match &self.detail {
            TypeDetail::Object { .. } => TypeKind::Object,
            TypeDetail::Interface { .. } => TypeKind::Interface,
            TypeDetail::Union { .. } => TypeKind::Union,
            TypeDetail::Enum { .. } => TypeKind::Enum,
            TypeDetail::Scalar { .. } => TypeKind::Scalar,
            TypeDetail::InputObject => TypeKind::InputObject,
            TypeDetail::Root(root) => root.kind(),
        }
    }

    /// Interfaces implemented by an object or interface config.
    #[must_use]
    pub fn interfaces(&self) -> &[TypeRef] {
        match &self.detail {
            TypeDetail::Object { interfaces, .. } | TypeDetail::Interface { interfaces, .. } => {
                interfaces
            }
            _ => &[],
        }
    }
}
