//! The finished type graph.
//!
//! A [`TypeGraph`] is the output of one build: every surviving type with its
//! merged, plugin-processed and resolver-wrapped fields, the root types, and
//! the implementor index used for abstract type resolution. It is the whole
//! contract an execution engine needs.

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::trace;

use crate::context::RequestContext;
use crate::error::FieldError;
use crate::reference::TypeExpr;
use crate::runtime::{IsTypeOf, ResolveType, Resolver, Subscriber};
use crate::types::{Extensions, RootKind, TypeKind};
use crate::value::FieldValue;

/// A built argument or input-object field.
#[derive(Debug, Clone)]
pub struct GraphInputField {
    pub name: String,
    pub ty: TypeExpr<String>,
    pub default_value: Option<serde_json::Value>,
    pub description: Option<String>,
    pub deprecation_reason: Option<String>,
    pub extensions: Extensions,
}

/// A built output field.
#[derive(Debug, Clone)]
pub struct GraphField {
    pub name: String,
    pub parent_type: String,
    pub ty: TypeExpr<String>,
    /// Kind of the terminal type of `ty`.
    pub return_kind: TypeKind,
    pub args: IndexMap<String, GraphInputField>,
    pub description: Option<String>,
    pub deprecation_reason: Option<String>,
    /// The plugin-wrapped resolver. Interface fields may have none.
    pub resolver: Option<Resolver>,
    /// The plugin-wrapped subscriber of a subscription field.
    pub subscriber: Option<Subscriber>,
    pub extensions: Extensions,
}

/// A built enum value.
#[derive(Debug, Clone)]
pub struct GraphEnumValue {
    pub name: String,
    pub value: serde_json::Value,
    pub description: Option<String>,
    pub deprecation_reason: Option<String>,
    pub extensions: Extensions,
}

/// Kind-specific part of a [`GraphType`].
#[derive(Debug, Clone)]
pub enum GraphTypeDetail {
    Object {
        interfaces: Vec<String>,
        fields: IndexMap<String, GraphField>,
        is_type_of: Option<IsTypeOf>,
    },
    Interface {
        interfaces: Vec<String>,
        fields: IndexMap<String, GraphField>,
        resolve_type: Option<ResolveType>,
    },
    Union {
        members: Vec<String>,
        resolve_type: Option<ResolveType>,
    },
    Enum {
        values: IndexMap<String, GraphEnumValue>,
    },
    Scalar {
        specified_by_url: Option<String>,
    },
    InputObject {
        fields: IndexMap<String, GraphInputField>,
    },
    Root {
        kind: RootKind,
        fields: IndexMap<String, GraphField>,
    },
}

/// A built named type.
#[derive(Debug, Clone)]
pub struct GraphType {
    pub name: String,
    pub description: Option<String>,
    pub extensions: Extensions,
    pub detail: GraphTypeDetail,
}

impl GraphType {
    #[must_use]
    pub fn kind(&self) -> TypeKind {
        match &self.detail {
            GraphTypeDetail::Object { .. } => TypeKind::Object,
            GraphTypeDetail::Interface { .. } => TypeKind::Interface,
            GraphTypeDetail::Union { .. } => TypeKind::Union,
            GraphTypeDetail::Enum { .. } => TypeKind::Enum,
            GraphTypeDetail::Scalar { .. } => TypeKind::Scalar,
            GraphTypeDetail::InputObject { .. } => TypeKind::InputObject,
            GraphTypeDetail::Root { kind, .. } => kind.kind(),
        }
    }

    /// Output fields of an object, interface or root type.
    #[must_use]
    pub fn fields(&self) -> Option<&IndexMap<String, GraphField>> {
        match &self.detail {
            GraphTypeDetail::Object { fields, .. }
            | GraphTypeDetail::Interface { fields, .. }
            | GraphTypeDetail::Root { fields, .. } => Some(fields),
            _ => None,
        }
    }

    pub fn fields_mut(&mut self) -> Option<&mut IndexMap<String, GraphField>> {
        match &mut self.detail {
            GraphTypeDetail::Object { fields, .. }
            | GraphTypeDetail::Interface { fields, .. }
            | GraphTypeDetail::Root { fields, .. } => Some(fields),
            _ => None,
        }
    }

    /// Interfaces implemented by an object or interface type.
    #[must_use]
    pub fn interfaces(&self) -> &[String] {
        match &self.detail {
            GraphTypeDetail::Object { interfaces, .. }
            | GraphTypeDetail::Interface { interfaces, .. } => interfaces,
            _ => &[],
        }
    }

    fn sort(&mut self) {
        match &mut self.detail {
            GraphTypeDetail::Object { fields, .. }
            | GraphTypeDetail::Interface { fields, .. }
            | GraphTypeDetail::Root { fields, .. } => {
                fields.sort_keys();
                for field in fields.values_mut() {
                    field.args.sort_keys();
                }
            }
            GraphTypeDetail::Enum { values } => values.sort_keys(),
            GraphTypeDetail::InputObject { fields } => fields.sort_keys(),
            GraphTypeDetail::Union { .. } | GraphTypeDetail::Scalar { .. } => {}
        }
    }
}

/// The finished, queryable output of a build.
#[derive(Debug, Clone, Default)]
pub struct TypeGraph {
    types: IndexMap<String, GraphType>,
    roots: HashMap<RootKind, String>,
    /// Interface name -> object and interface types implementing it.
    implementors: HashMap<String, Vec<String>>,
    extensions: Extensions,
}

impl TypeGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a type. Root types are recorded as roots.
    pub fn insert_type(&mut self, ty: GraphType) {
        if let GraphTypeDetail::Root { kind, .. } = &ty.detail {
            self.roots.insert(*kind, ty.name.clone());
        }
        self.types.insert(ty.name.clone(), ty);
    }

    /// Removes a type, returning it if present.
    pub fn remove_type(&mut self, name: &str) -> Option<GraphType> {
        let removed = self.types.shift_remove(name)?;
        if let GraphTypeDetail::Root { kind, .. } = &removed.detail {
            self.roots.remove(kind);
        }
        Some(removed)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&GraphType> {
        self.types.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut GraphType> {
        self.types.get_mut(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// All types, in build order (or sorted order after [`TypeGraph::sort`]).
    pub fn types(&self) -> impl Iterator<Item = &GraphType> {
        self.types.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    #[must_use]
    pub fn root(&self, kind: RootKind) -> Option<&GraphType> {
        self.roots.get(&kind).and_then(|name| self.types.get(name))
    }

    #[must_use]
    pub fn query_type(&self) -> Option<&GraphType> {
        self.root(RootKind::Query)
    }

    #[must_use]
    pub fn mutation_type(&self) -> Option<&GraphType> {
        self.root(RootKind::Mutation)
    }

    #[must_use]
    pub fn subscription_type(&self) -> Option<&GraphType> {
        self.root(RootKind::Subscription)
    }

    /// Field map of the named type.
    ///
    /// Maps are fully merged by the time the graph is returned from a build,
    /// so lookups here never run field thunks.
    #[must_use]
    pub fn fields(&self, type_name: &str) -> Option<&IndexMap<String, GraphField>> {
        self.get(type_name).and_then(GraphType::fields)
    }

    #[must_use]
    pub fn field(&self, type_name: &str, field_name: &str) -> Option<&GraphField> {
        self.fields(type_name).and_then(|fields| fields.get(field_name))
    }

    /// Types implementing the named interface.
    #[must_use]
    pub fn implementors(&self, interface: &str) -> &[String] {
        self.implementors
            .get(interface)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Object types a value of the named abstract type may have at runtime.
    #[must_use]
    pub fn possible_types(&self, abstract_type: &str) -> Vec<&str> {
        match self.get(abstract_type).map(|ty| &ty.detail) {
            Some(GraphTypeDetail::Union { members, .. }) => {
                members.iter().map(String::as_str).collect()
            }
            Some(GraphTypeDetail::Interface { .. }) => self
                .implementors(abstract_type)
                .iter()
                .filter(|name| {
                    self.get(name)
                        .is_some_and(|ty| ty.kind() == TypeKind::Object)
                })
                .map(String::as_str)
                .collect(),
            _ => Vec::new(),
        }
    }

    #[must_use]
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Recomputes the implementor index from the declared interfaces.
    pub fn rebuild_implementors(&mut self) {
        let mut implementors: HashMap<String, Vec<String>> = HashMap::new();
        for ty in self.types.values() {
            for interface in ty.interfaces() {
                implementors
                    .entry(interface.clone())
                    .or_default()
                    .push(ty.name.clone());
            }
        }
        self.implementors = implementors;
    }

    /// Sorts types, fields, arguments, enum values and input fields by name.
    pub fn sort(&mut self) {
        self.types.sort_keys();
        for ty in self.types.values_mut() {
            ty.sort();
        }
        for names in self.implementors.values_mut() {
            names.sort();
        }
    }

    /// Determines the concrete object type of a value of an abstract type.
    ///
    /// A type brand carried by the value wins. Otherwise the type's
    /// discriminator is asked, and when it cannot decide, the `is_type_of`
    /// checks of the possible types are tried in order.
    ///
    /// # Errors
    ///
    /// Returns an error if no concrete type can be determined, or if the
    /// determined type is not a possible type of `abstract_type`.
    pub fn resolve_abstract_type(
        &self,
        abstract_type: &str,
        value: &FieldValue,
        context: &RequestContext,
    ) -> Result<String, FieldError> {
        let possible = self.possible_types(abstract_type);
        let check = |name: String| {
            if possible.contains(&name.as_str()) {
                Ok(name)
            } else {
                Err(FieldError::new(format!(
                    "Type {name} is not a possible type of {abstract_type}"
                )))
            }
        };

        if let Some(brand) = value.type_brand() {
            trace!(abstract_type, concrete_type = brand, "Resolved abstract type from brand");
            return check(brand.to_string());
        }

        let resolve_type = match self.get(abstract_type).map(|ty| &ty.detail) {
            Some(
                GraphTypeDetail::Interface { resolve_type, .. }
                | GraphTypeDetail::Union { resolve_type, .. },
            ) => resolve_type.as_ref(),
            _ => {
                return Err(FieldError::new(format!(
                    "{abstract_type} is not an abstract type"
                )));
            }
        };

        if let Some(name) = resolve_type.and_then(|resolve| resolve.call(value, context)) {
            return check(name);
        }

        for name in &possible {
            if let Some(GraphType {
                detail:
                    GraphTypeDetail::Object {
                        is_type_of: Some(is_type_of),
                        ..
                    },
                ..
            }) = self.get(name)
                && is_type_of.call(value, context)
            {
                return Ok((*name).to_string());
            }
        }

        Err(FieldError::new(format!(
            "Could not determine the concrete type of a value of {abstract_type}"
        )))
    }
}
