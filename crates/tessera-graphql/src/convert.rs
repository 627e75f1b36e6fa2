//! Conversion of a built [`TypeGraph`] into an executable dynamic schema.
//!
//! Every tessera resolver is bridged into an async-graphql field resolver.
//! Object-typed results travel between fields as the tessera
//! [`FieldValue`](tessera_core::FieldValue) itself, boxed with
//! `FieldValue::owned_any`, so child resolvers see exactly what their parent
//! returned, value wrapper nodes included. Leaf results are converted to
//! GraphQL values, and values of abstract types are tagged with the concrete
//! type found by [`TypeGraph::resolve_abstract_type`].

use std::sync::Arc;

use async_graphql::dynamic::{
    Enum, EnumItem, Field, FieldFuture, FieldValue, InputObject, InputValue, Interface,
    InterfaceField, Object, ResolverContext, Scalar, Schema, Subscription, SubscriptionField,
    SubscriptionFieldFuture, Type, TypeRef,
};
use async_graphql::{Name, Value};
use futures_util::StreamExt;
use indexmap::IndexMap;
use tracing::{debug, trace};

use tessera_core::{
    Args, FieldError, GraphField, GraphInputField, GraphType, GraphTypeDetail, RequestContext,
    ResolveInfo, ResolveParams, Resolver, RootKind, Subscriber, TypeExpr, TypeGraph,
    is_builtin_scalar,
};

use crate::error::GraphQLAdapterError;

type TesseraValue = tessera_core::FieldValue;

/// Converts a type graph into an async-graphql dynamic schema.
///
/// # Errors
///
/// Returns [`GraphQLAdapterError::MissingQueryRoot`] if the graph has no
/// Query root, or [`GraphQLAdapterError::SchemaBuildFailed`] if async-graphql
/// rejects the result.
pub fn to_dynamic_schema(graph: Arc<TypeGraph>) -> Result<Schema, GraphQLAdapterError> {
    let query = graph
        .query_type()
        .map(|ty| ty.name.clone())
        .ok_or(GraphQLAdapterError::MissingQueryRoot)?;
    let mutation = graph.mutation_type().map(|ty| ty.name.clone());
    let subscription = graph.subscription_type().map(|ty| ty.name.clone());

    let mut builder = Schema::build(&query, mutation.as_deref(), subscription.as_deref());
    let mut registered = 0usize;
    for ty in graph.types() {
        if let Some(converted) = convert_type(&graph, ty) {
            builder = builder.register(converted);
            registered += 1;
        }
    }

    let schema = builder
        .finish()
        .map_err(|e| GraphQLAdapterError::SchemaBuildFailed(e.to_string()))?;
    debug!(types = registered, "Converted type graph to GraphQL schema");
    Ok(schema)
}

fn convert_type(graph: &Arc<TypeGraph>, ty: &GraphType) -> Option<Type> {
    let converted: Type = match &ty.detail {
        GraphTypeDetail::Scalar { specified_by_url } => {
            if is_builtin_scalar(&ty.name) {
                return None;
            }
            let mut scalar = Scalar::new(ty.name.as_str());
            if let Some(description) = &ty.description {
                scalar = scalar.description(description.as_str());
            }
            if let Some(url) = specified_by_url {
                scalar = scalar.specified_by_url(url.as_str());
            }
            scalar.into()
        }
        GraphTypeDetail::Enum { values } => {
            let mut converted = Enum::new(ty.name.as_str());
            if let Some(description) = &ty.description {
                converted = converted.description(description.as_str());
            }
            for value in values.values() {
                let mut item = EnumItem::new(value.name.as_str());
                if let Some(description) = &value.description {
                    item = item.description(description.as_str());
                }
                if let Some(reason) = &value.deprecation_reason {
                    item = item.deprecation(Some(reason.as_str()));
                }
                converted = converted.item(item);
            }
            converted.into()
        }
        GraphTypeDetail::InputObject { fields } => {
            let mut input = InputObject::new(ty.name.as_str());
            if let Some(description) = &ty.description {
                input = input.description(description.as_str());
            }
            for field in fields.values() {
                input = input.field(input_value(field));
            }
            input.into()
        }
        GraphTypeDetail::Interface {
            interfaces, fields, ..
        } => {
            let mut interface = Interface::new(ty.name.as_str());
            if let Some(description) = &ty.description {
                interface = interface.description(description.as_str());
            }
            for name in interfaces {
                interface = interface.implement(name.as_str());
            }
            for field in fields.values() {
                interface = interface.field(interface_field(field));
            }
            interface.into()
        }
        GraphTypeDetail::Union { members, .. } => {
            let mut union = async_graphql::dynamic::Union::new(ty.name.as_str());
            if let Some(description) = &ty.description {
                union = union.description(description.as_str());
            }
            for member in members {
                union = union.possible_type(member.as_str());
            }
            union.into()
        }
        GraphTypeDetail::Object {
            interfaces, fields, ..
        } => {
            let mut object = Object::new(ty.name.as_str());
            if let Some(description) = &ty.description {
                object = object.description(description.as_str());
            }
            for name in interfaces {
                object = object.implement(name.as_str());
            }
            for field in fields.values() {
                object = object.field(output_field(graph, field));
            }
            object.into()
        }
        GraphTypeDetail::Root {
            kind: RootKind::Subscription,
            fields,
        } => {
            let mut subscription = Subscription::new(ty.name.as_str());
            if let Some(description) = &ty.description {
                subscription = subscription.description(description.as_str());
            }
            for field in fields.values() {
                subscription = subscription.field(subscription_field(graph, field));
            }
            subscription.into()
        }
        GraphTypeDetail::Root { fields, .. } => {
            let mut object = Object::new(ty.name.as_str());
            if let Some(description) = &ty.description {
                object = object.description(description.as_str());
            }
            for field in fields.values() {
                object = object.field(output_field(graph, field));
            }
            object.into()
        }
    };
    trace!(type_name = %ty.name, kind = %ty.kind(), "Converted type");
    Some(converted)
}

/// Converts a type expression into an async-graphql type reference.
#[must_use]
pub fn type_ref(ty: &TypeExpr<String>) -> TypeRef {
    let inner = match ty {
        TypeExpr::Named { reference, .. } => TypeRef::named(reference.as_str()),
        TypeExpr::List { item, .. } => TypeRef::List(Box::new(type_ref(item))),
    };
    if ty.is_nullable() {
        inner
    } else {
        TypeRef::NonNull(Box::new(inner))
    }
}

fn input_value(field: &GraphInputField) -> InputValue {
    let mut input = InputValue::new(field.name.as_str(), type_ref(&field.ty));
    if let Some(description) = &field.description {
        input = input.description(description.as_str());
    }
    if let Some(default) = field
        .default_value
        .clone()
        .and_then(|value| Value::from_json(value).ok())
    {
        input = input.default_value(default);
    }
    input
}

fn interface_field(field: &GraphField) -> InterfaceField {
    let mut converted = InterfaceField::new(field.name.as_str(), type_ref(&field.ty));
    if let Some(description) = &field.description {
        converted = converted.description(description.as_str());
    }
    if let Some(reason) = &field.deprecation_reason {
        converted = converted.deprecation(Some(reason.as_str()));
    }
    for arg in field.args.values() {
        converted = converted.argument(input_value(arg));
    }
    converted
}

fn output_field(graph: &Arc<TypeGraph>, field: &GraphField) -> Field {
    let binding = Arc::new(FieldBinding::new(graph, field));
    let mut converted = Field::new(field.name.as_str(), type_ref(&field.ty), move |ctx| {
        let binding = Arc::clone(&binding);
        let params = binding.params(&ctx);
        FieldFuture::new(async move {
            let params = params.map_err(GraphQLAdapterError::into_graphql_error)?;
            binding
                .resolve(params)
                .await
                .map_err(GraphQLAdapterError::into_graphql_error)
        })
    });
    if let Some(description) = &field.description {
        converted = converted.description(description.as_str());
    }
    if let Some(reason) = &field.deprecation_reason {
        converted = converted.deprecation(Some(reason.as_str()));
    }
    for arg in field.args.values() {
        converted = converted.argument(input_value(arg));
    }
    converted
}

fn subscription_field(graph: &Arc<TypeGraph>, field: &GraphField) -> SubscriptionField {
    let binding = Arc::new(FieldBinding::new(graph, field));
    let mut converted = SubscriptionField::new(field.name.as_str(), type_ref(&field.ty), move |ctx| {
        let binding = Arc::clone(&binding);
        let params = binding.params(&ctx);
        SubscriptionFieldFuture::new(async move {
            let params = params.map_err(GraphQLAdapterError::into_graphql_error)?;
            let events = binding
                .subscribe(params.clone())
                .await
                .map_err(GraphQLAdapterError::into_graphql_error)?;
            Ok(events.then(move |event| {
                let binding = Arc::clone(&binding);
                let params = params.clone();
                async move {
                    let event = event
                        .map_err(GraphQLAdapterError::Field)
                        .map_err(GraphQLAdapterError::into_graphql_error)?;
                    let value = binding
                        .resolve(params.with_parent(event))
                        .await
                        .map_err(GraphQLAdapterError::into_graphql_error)?;
                    Ok(value.unwrap_or(FieldValue::NULL))
                }
            }))
        })
    });
    if let Some(description) = &field.description {
        converted = converted.description(description.as_str());
    }
    if let Some(reason) = &field.deprecation_reason {
        converted = converted.deprecation(Some(reason.as_str()));
    }
    for arg in field.args.values() {
        converted = converted.argument(input_value(arg));
    }
    converted
}

/// Everything a bridged resolver needs about its field.
struct FieldBinding {
    graph: Arc<TypeGraph>,
    info: Arc<ResolveInfo>,
    args: IndexMap<String, GraphInputField>,
    resolver: Option<Resolver>,
    subscriber: Option<Subscriber>,
}

impl FieldBinding {
    fn new(graph: &Arc<TypeGraph>, field: &GraphField) -> Self {
        Self {
            graph: Arc::clone(graph),
            info: Arc::new(ResolveInfo {
                field_name: field.name.clone(),
                parent_type: field.parent_type.clone(),
                return_type: field.ty.clone(),
            }),
            args: field.args.clone(),
            resolver: field.resolver.clone(),
            subscriber: field.subscriber.clone(),
        }
    }

    /// Collects the request context, parent value and arguments of one call.
    fn params(&self, ctx: &ResolverContext<'_>) -> Result<ResolveParams, GraphQLAdapterError> {
        let context = ctx
            .ctx
            .data::<RequestContext>()
            .map_err(|_| GraphQLAdapterError::MissingRequestContext)?
            .clone();
        let parent = ctx
            .parent_value
            .try_downcast_ref::<TesseraValue>()
            .cloned()
            .unwrap_or_default();

        let mut args = Args::new();
        for (name, value) in ctx.args.as_index_map() {
            let json = value.clone().into_json()?;
            let json = match self.args.get(name.as_str()) {
                Some(arg) => coerce_input(&self.graph, &arg.ty, json),
                None => json,
            };
            args.insert(name.to_string(), json);
        }

        Ok(ResolveParams {
            parent,
            args: Arc::new(args),
            context,
            info: Arc::clone(&self.info),
        })
    }

    async fn resolve<'a>(&self, params: ResolveParams) -> Result<Option<FieldValue<'a>>, GraphQLAdapterError> {
        let context = params.context.clone();
        let value = match &self.resolver {
            Some(resolver) => resolver.call(params).await?,
            None => params.parent,
        };
        output_value(&self.graph, &self.info.return_type, value, &context)
    }

    async fn subscribe(
        &self,
        params: ResolveParams,
    ) -> Result<tessera_core::EventStream, GraphQLAdapterError> {
        let subscriber = self.subscriber.as_ref().ok_or_else(|| {
            GraphQLAdapterError::Field(FieldError::new(format!(
                "Field {}.{} has no subscriber",
                self.info.parent_type, self.info.field_name
            )))
        })?;
        Ok(subscriber.call(params).await?)
    }
}

/// Converts a resolver result into a GraphQL field value of type `ty`.
fn output_value<'a>(
    graph: &TypeGraph,
    ty: &TypeExpr<String>,
    value: TesseraValue,
    context: &RequestContext,
) -> Result<Option<FieldValue<'a>>, GraphQLAdapterError> {
    if value.is_null() {
        return Ok(None);
    }
    match ty {
        TypeExpr::List { item, .. } => {
            let items = value.as_list().ok_or_else(|| {
                GraphQLAdapterError::Serialization(format!("Expected a list for {ty}"))
            })?;
            let converted = items
                .iter()
                .map(|item_value| {
                    output_value(graph, item, item_value.clone(), context)
                        .map(|converted| converted.unwrap_or(FieldValue::NULL))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Some(FieldValue::list(converted)))
        }
        TypeExpr::Named { reference, .. } => {
            let Some(target) = graph.get(reference) else {
                return Err(GraphQLAdapterError::Serialization(format!(
                    "Unknown type {reference}"
                )));
            };
            let converted = match &target.detail {
                GraphTypeDetail::Scalar { .. } => {
                    let json = value.as_json().cloned().ok_or_else(|| {
                        GraphQLAdapterError::Serialization(format!(
                            "Value of scalar {reference} is not JSON"
                        ))
                    })?;
                    FieldValue::value(Value::from_json(json)?)
                }
                GraphTypeDetail::Enum { values } => {
                    let json = value.as_json();
                    let name = values
                        .values()
                        .find(|candidate| Some(&candidate.value) == json)
                        .map(|candidate| candidate.name.as_str())
                        .ok_or_else(|| {
                            GraphQLAdapterError::Serialization(format!(
                                "Value is not a member of enum {reference}"
                            ))
                        })?;
                    FieldValue::value(Value::Enum(Name::new(name)))
                }
                GraphTypeDetail::Interface { .. } | GraphTypeDetail::Union { .. } => {
                    let concrete = graph.resolve_abstract_type(reference, &value, context)?;
                    FieldValue::owned_any(value).with_type(concrete)
                }
                GraphTypeDetail::Object { .. } | GraphTypeDetail::Root { .. } => {
                    FieldValue::owned_any(value)
                }
                GraphTypeDetail::InputObject { .. } => {
                    return Err(GraphQLAdapterError::Serialization(format!(
                        "Input type {reference} cannot be returned"
                    )));
                }
            };
            Ok(Some(converted))
        }
    }
}

/// Maps enum names in an input value to the enum's internal values.
fn coerce_input(graph: &TypeGraph, ty: &TypeExpr<String>, value: serde_json::Value) -> serde_json::Value {
    match (ty, value) {
        (_, serde_json::Value::Null) => serde_json::Value::Null,
        (TypeExpr::List { item, .. }, serde_json::Value::Array(items)) => serde_json::Value::Array(
            items
                .into_iter()
                .map(|item_value| coerce_input(graph, item, item_value))
                .collect(),
        ),
        (TypeExpr::Named { reference, .. }, value) => {
            match (graph.get(reference).map(|target| &target.detail), value) {
                (Some(GraphTypeDetail::Enum { values }), serde_json::Value::String(name)) => {
                    match values.get(&name) {
                        Some(enum_value) => enum_value.value.clone(),
                        None => serde_json::Value::String(name),
                    }
                }
                (Some(GraphTypeDetail::InputObject { fields }), serde_json::Value::Object(map)) => {
                    serde_json::Value::Object(
                        map.into_iter()
                            .map(|(key, field_value)| {
                                let field_value = match fields.get(&key) {
                                    Some(field) => coerce_input(graph, &field.ty, field_value),
                                    None => field_value,
                                };
                                (key, field_value)
                            })
                            .collect(),
                    )
                }
                (_, value) => value,
            }
        }
        (_, value) => value,
    }
}
