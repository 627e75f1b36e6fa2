//! Phased build of a type graph.
//!
//! A build first runs every registered type config through the plugin
//! chain, in phase order, and remembers the result; a type hook therefore
//! runs exactly once per type no matter how often the type is reached
//! later. Types are then built phase by phase:
//!
//! 1. enums and scalars
//! 2. input objects
//! 3. interfaces
//! 4. objects
//! 5. unions
//! 6. the Query, Mutation and Subscription roots
//!
//! Field maps are computed on demand and memoized per type, so an object can
//! pull in the merged fields of the interfaces it implements regardless of
//! registration order, and mutually recursive types never force an order.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, trace};

use tessera_core::{
    GraphEnumValue, GraphField, GraphInputField, GraphType, GraphTypeDetail, InputFieldConfig,
    OutputFieldConfig, ResolveType, Resolver, Result, SchemaError, TypeConfig, TypeDetail,
    TypeExpr, TypeGraph, TypeKind, TypeRef,
};
use tessera_plugin::{PluginChain, wrap_field_resolver};

use crate::config::BuildConfig;
use crate::field_table::{FieldTable, inherit_fields};
use crate::registry::TypeRegistry;

/// Build phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BuildPhase {
    LeafTypes,
    InputObjects,
    Interfaces,
    Objects,
    Unions,
    RootTypes,
}

impl BuildPhase {
    pub const ALL: [BuildPhase; 6] = [
        Self::LeafTypes,
        Self::InputObjects,
        Self::Interfaces,
        Self::Objects,
        Self::Unions,
        Self::RootTypes,
    ];

    /// Phase in which types of `kind` are built.
    #[must_use]
    pub fn of(kind: TypeKind) -> Self {
        match kind {
            TypeKind::Enum | TypeKind::Scalar => Self::LeafTypes,
            TypeKind::InputObject => Self::InputObjects,
            TypeKind::Interface => Self::Interfaces,
            TypeKind::Object => Self::Objects,
            TypeKind::Union => Self::Unions,
            TypeKind::Query | TypeKind::Mutation | TypeKind::Subscription => Self::RootTypes,
        }
    }
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LeafTypes => "leaf types",
            Self::InputObjects => "input objects",
            Self::Interfaces => "interfaces",
            Self::Objects => "objects",
            Self::Unions => "unions",
            Self::RootTypes => "root types",
        };
        f.write_str(name)
    }
}

/// Outcome of looking up a reference during a build.
enum Lookup {
    Found(String, TypeKind),
    Dropped(String),
    Missing,
}

/// Transient state of one build.
pub(crate) struct BuildContext<'a> {
    registry: &'a TypeRegistry,
    chain: &'a PluginChain,
    config: &'a BuildConfig,
    fields: FieldTable,
    /// Plugin-processed configs of the surviving types.
    types: IndexMap<String, TypeConfig>,
    /// Types dropped by a plugin, directly or by cascade.
    dropped: HashSet<String>,
    /// Merged, not yet plugin-processed output fields per type.
    merged_fields: HashMap<String, IndexMap<String, OutputFieldConfig>>,
    /// Types whose merged fields are being computed.
    merging: Vec<String>,
    unresolved: IndexSet<String>,
}

impl<'a> BuildContext<'a> {
    pub(crate) fn new(
        registry: &'a TypeRegistry,
        chain: &'a PluginChain,
        config: &'a BuildConfig,
        fields: FieldTable,
    ) -> Self {
        Self {
            registry,
            chain,
            config,
            fields,
            types: IndexMap::new(),
            dropped: HashSet::new(),
            merged_fields: HashMap::new(),
            merging: Vec::new(),
            unresolved: IndexSet::new(),
        }
    }

    /// Runs every phase and returns the graph, before `after_build` hooks.
    pub(crate) fn run(mut self) -> Result<TypeGraph> {
        self.chain.before_build();
        self.apply_type_hooks();
        self.cascade_drops();

        let mut graph = TypeGraph::new();
        for phase in BuildPhase::ALL {
            let names: Vec<String> = self
                .types
                .values()
                .filter(|config| BuildPhase::of(config.kind()) == phase)
                .map(|config| config.name.clone())
                .collect();
            debug!(phase = %phase, types = names.len(), "Building phase");
            for name in names {
                graph.insert_type(self.build_type(&name)?);
            }
        }

        if !self.unresolved.is_empty() {
            return Err(SchemaError::unresolved(self.unresolved));
        }

        *graph.extensions_mut() = self.config.extensions.clone();
        graph.rebuild_implementors();
        Ok(graph)
    }

    fn apply_type_hooks(&mut self) {
        for phase in BuildPhase::ALL {
            for config in self.registry.configs() {
                if BuildPhase::of(config.kind()) != phase {
                    continue;
                }
                let name = config.name.clone();
                match self.chain.on_type_config(config.clone()) {
                    Some(processed) => {
                        self.types.insert(name, processed);
                    }
                    None => {
                        self.dropped.insert(name);
                    }
                }
            }
        }
    }

    /// Drops unions all of whose members were dropped.
    fn cascade_drops(&mut self) {
        loop {
            let emptied: Vec<String> = self
                .types
                .values()
                .filter_map(|config| match &config.detail {
                    TypeDetail::Union { members, .. }
                        if !members.is_empty()
                            && members.iter().all(|member| {
                                self.registry
                                    .name_of(member)
                                    .is_some_and(|name| self.dropped.contains(name))
                            }) =>
                    {
                        Some(config.name.clone())
                    }
                    _ => None,
                })
                .collect();
            if emptied.is_empty() {
                return;
            }
            for name in emptied {
                debug!(type_name = %name, "Dropping union without remaining members");
                self.types.shift_remove(&name);
                self.dropped.insert(name);
            }
        }
    }

    fn lookup(&mut self, reference: &TypeRef) -> Lookup {
        let Some(name) = self.registry.name_of(reference) else {
            self.unresolved.insert(self.registry.describe(reference));
            return Lookup::Missing;
        };
        if self.dropped.contains(name) {
            return Lookup::Dropped(name.to_string());
        }
        match self.types.get(name) {
            Some(config) => Lookup::Found(name.to_string(), config.kind()),
            None => {
                self.unresolved.insert(name.to_string());
                Lookup::Missing
            }
        }
    }

    fn build_type(&mut self, name: &str) -> Result<GraphType> {
        let Some(config) = self.types.get(name).cloned() else {
            return Err(SchemaError::unresolved([name]));
        };
        trace!(type_name = name, kind = %config.kind(), "Building type");

        let detail = match &config.detail {
            TypeDetail::Enum { values } => GraphTypeDetail::Enum {
                values: values
                    .values()
                    .filter_map(|value| self.chain.on_enum_value_config(value.clone()))
                    .map(|value| {
                        let built = GraphEnumValue {
                            name: value.name.clone(),
                            value: value.value,
                            description: value.description,
                            deprecation_reason: value.deprecation_reason,
                            extensions: value.extensions,
                        };
                        (value.name, built)
                    })
                    .collect(),
            },
            TypeDetail::Scalar { specified_by_url } => GraphTypeDetail::Scalar {
                specified_by_url: specified_by_url.clone(),
            },
            TypeDetail::InputObject => {
                let mut fields = IndexMap::new();
                for (field_name, field) in self.fields.take_input(name)? {
                    let Some(field) = self.chain.on_input_field_config(field) else {
                        continue;
                    };
                    if let Some(built) = self.build_input_value(&field)? {
                        fields.insert(field_name, built);
                    }
                }
                GraphTypeDetail::InputObject { fields }
            }
            TypeDetail::Interface {
                interfaces,
                resolve_type,
            } => GraphTypeDetail::Interface {
                interfaces: self.resolve_interfaces(name, interfaces)?,
                fields: self.output_fields(name)?,
                resolve_type: Some(self.chain.wrap_resolve_type(
                    resolve_type.clone().unwrap_or_else(ResolveType::undecided),
                    &config,
                )),
            },
            TypeDetail::Object {
                interfaces,
                is_type_of,
            } => GraphTypeDetail::Object {
                interfaces: self.resolve_interfaces(name, interfaces)?,
                fields: self.output_fields(name)?,
                is_type_of: self.chain.wrap_is_type_of(is_type_of.clone(), &config),
            },
            TypeDetail::Union {
                members,
                resolve_type,
            } => GraphTypeDetail::Union {
                members: self.resolve_members(name, members)?,
                resolve_type: Some(self.chain.wrap_resolve_type(
                    resolve_type.clone().unwrap_or_else(ResolveType::undecided),
                    &config,
                )),
            },
            TypeDetail::Root(kind) => GraphTypeDetail::Root {
                kind: *kind,
                fields: self.output_fields(name)?,
            },
        };

        Ok(GraphType {
            name: config.name,
            description: config.description,
            extensions: config.extensions,
            detail,
        })
    }

    fn resolve_interfaces(&mut self, type_name: &str, references: &[TypeRef]) -> Result<Vec<String>> {
        let mut names = Vec::with_capacity(references.len());
        for reference in references {
            match self.lookup(reference) {
                Lookup::Found(name, TypeKind::Interface) => {
                    if name == type_name {
                        return Err(SchemaError::CyclicInheritance { type_name: name });
                    }
                    names.push(name);
                }
                Lookup::Found(_, kind) => {
                    return Err(SchemaError::kind_mismatch(
                        self.registry.describe(reference),
                        "an Interface",
                        kind,
                    ));
                }
                Lookup::Dropped(name) => {
                    debug!(type_name, interface = %name, "Pruned dropped interface");
                }
                Lookup::Missing => {}
            }
        }
        Ok(names)
    }

    fn resolve_members(&mut self, union_name: &str, references: &[TypeRef]) -> Result<Vec<String>> {
        let mut names = Vec::with_capacity(references.len());
        for reference in references {
            match self.lookup(reference) {
                Lookup::Found(name, TypeKind::Object) => names.push(name),
                Lookup::Found(_, kind) => {
                    return Err(SchemaError::kind_mismatch(
                        self.registry.describe(reference),
                        "an Object",
                        kind,
                    ));
                }
                Lookup::Dropped(name) => {
                    debug!(type_name = union_name, member = %name, "Pruned dropped union member");
                }
                Lookup::Missing => {}
            }
        }
        Ok(names)
    }

    /// Own fields of `type_name` merged with everything it inherits, memoized.
    fn merged_fields(&mut self, type_name: &str) -> Result<IndexMap<String, OutputFieldConfig>> {
        if let Some(fields) = self.merged_fields.get(type_name) {
            return Ok(fields.clone());
        }
        if self.merging.iter().any(|name| name == type_name) {
            return Err(SchemaError::CyclicInheritance {
                type_name: type_name.to_string(),
            });
        }
        let Some(config) = self.types.get(type_name).cloned() else {
            return Ok(IndexMap::new());
        };

        self.merging.push(type_name.to_string());
        let kind = config.kind();
        let own = self.fields.take_output(type_name, kind)?;
        let mut inherited = Vec::new();
        for interface in self.resolve_interfaces(type_name, config.interfaces())? {
            inherited.push(self.merged_fields(&interface)?);
        }
        let merged = inherit_fields(type_name, kind, own, inherited)?;
        self.merging.pop();

        self.merged_fields
            .insert(type_name.to_string(), merged.clone());
        Ok(merged)
    }

    fn output_fields(&mut self, type_name: &str) -> Result<IndexMap<String, GraphField>> {
        let mut built = IndexMap::new();
        for (name, field) in self.merged_fields(type_name)? {
            let Some(field) = self.chain.on_output_field_config(field) else {
                continue;
            };
            if let Some(field) = self.build_output_field(field)? {
                built.insert(name, field);
            }
        }
        Ok(built)
    }

    fn build_output_field(&mut self, mut field: OutputFieldConfig) -> Result<Option<GraphField>> {
        field.args = std::mem::take(&mut field.args)
            .into_iter()
            .filter_map(|(name, arg)| self.chain.on_input_field_config(arg).map(|arg| (name, arg)))
            .collect();

        let (type_name, return_kind) = match self.lookup(field.type_ref()) {
            Lookup::Found(name, kind) => (name, kind),
            Lookup::Dropped(name) => {
                debug!(type_name = %field.parent_type, field = %field.name, dropped = %name, "Pruned field returning dropped type");
                return Ok(None);
            }
            Lookup::Missing => return Ok(None),
        };
        if !return_kind.is_output() || return_kind.is_root() {
            return Err(SchemaError::kind_mismatch(
                self.registry.describe(field.type_ref()),
                "an output type",
                return_kind,
            ));
        }
        let ty = named_expr(&field.ty, &type_name);

        let mut args = IndexMap::new();
        for (name, arg) in &field.args {
            if let Some(built) = self.build_input_value(arg)? {
                args.insert(name.clone(), built);
            }
        }

        let subscriber = if field.parent_kind == TypeKind::Subscription {
            let wrapped = self.chain.wrap_subscribe(field.subscriber.clone(), &field);
            if wrapped.is_none() {
                return Err(SchemaError::missing_implementation(
                    &field.parent_type,
                    &field.name,
                    "subscriber",
                ));
            }
            wrapped
        } else {
            None
        };

        let resolver = match (&field.resolver, field.parent_kind) {
            (Some(resolver), _) => Some(resolver.clone()),
            (None, TypeKind::Subscription) => Some(Resolver::identity()),
            (None, TypeKind::Interface) => None,
            (None, _) if self.config.default_field_resolver => {
                Some(Resolver::property(field.name.clone()))
            }
            (None, _) => {
                return Err(SchemaError::missing_implementation(
                    &field.parent_type,
                    &field.name,
                    "resolver",
                ));
            }
        };
        let resolver = resolver.map(|resolver| {
            wrap_field_resolver(
                self.chain,
                Arc::new(field.clone()),
                resolver,
                !return_kind.is_leaf(),
            )
        });

        Ok(Some(GraphField {
            name: field.name,
            parent_type: field.parent_type,
            ty,
            return_kind,
            args,
            description: field.description,
            deprecation_reason: field.deprecation_reason,
            resolver,
            subscriber,
            extensions: field.extensions,
        }))
    }

    fn build_input_value(&mut self, field: &InputFieldConfig) -> Result<Option<GraphInputField>> {
        let type_name = match self.lookup(field.ty.named_type()) {
            Lookup::Found(name, kind) if kind.is_input() => name,
            Lookup::Found(_, kind) => {
                return Err(SchemaError::kind_mismatch(
                    self.registry.describe(field.ty.named_type()),
                    "an input type",
                    kind,
                ));
            }
            Lookup::Dropped(name) => {
                debug!(type_name = %field.parent_type, input = %field.name, dropped = %name, "Pruned input returning dropped type");
                return Ok(None);
            }
            Lookup::Missing => return Ok(None),
        };

        Ok(Some(GraphInputField {
            name: field.name.clone(),
            ty: named_expr(&field.ty, &type_name),
            default_value: field.default_value.clone(),
            description: field.description.clone(),
            deprecation_reason: field.deprecation_reason.clone(),
            extensions: field.extensions.clone(),
        }))
    }
}

/// Rewrites a type expression onto a resolved terminal name.
fn named_expr(ty: &TypeExpr, name: &str) -> TypeExpr<String> {
    match ty {
        TypeExpr::Named { nullable, .. } => TypeExpr::Named {
            reference: name.to_string(),
            nullable: *nullable,
        },
        TypeExpr::List { item, nullable } => TypeExpr::List {
            item: Box::new(named_expr(item, name)),
            nullable: *nullable,
        },
    }
}
