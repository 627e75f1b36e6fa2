//! Runtime callables: resolvers, subscribers and type discriminators.
//!
//! Resolvers may complete synchronously or return a deferred value. Both
//! shapes are carried by [`MaybeFuture`], which only allocates a boxed future
//! when a resolver actually suspends.

use std::fmt;
use std::future::{Future, IntoFuture};
use std::sync::Arc;

use futures_util::future::{self, BoxFuture};
use futures_util::stream::BoxStream;

use crate::context::RequestContext;
use crate::error::FieldError;
use crate::reference::TypeExpr;
use crate::value::FieldValue;

/// Arguments passed to a field, by name.
pub type Args = serde_json::Map<String, serde_json::Value>;

/// Outcome of evaluating one field.
pub type FieldResult = Result<FieldValue, FieldError>;

/// Stream of subscription events.
pub type EventStream = BoxStream<'static, FieldResult>;

/// A value that is either available now or will be produced later.
pub enum MaybeFuture<T> {
    Ready(T),
    Pending(BoxFuture<'static, T>),
}

impl<T: Send + 'static> MaybeFuture<T> {
    /// Wraps an already available value.
    pub fn ready(value: T) -> Self {
        Self::Ready(value)
    }

    /// Wraps a deferred value.
    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self::Pending(Box::pin(future))
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Returns the value if it is available without awaiting.
    pub fn into_ready(self) -> Option<T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Pending(_) => None,
        }
    }

    /// Applies `f` to the value, synchronously when the value is ready.
    pub fn map<U, F>(self, f: F) -> MaybeFuture<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        match self {
            Self::Ready(value) => MaybeFuture::Ready(f(value)),
            Self::Pending(fut) => MaybeFuture::Pending(Box::pin(async move { f(fut.await) })),
        }
    }

    /// Chains another possibly deferred computation.
    pub fn then<U, F>(self, f: F) -> MaybeFuture<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> MaybeFuture<U> + Send + 'static,
    {
        match self {
            Self::Ready(value) => f(value),
            Self::Pending(fut) => MaybeFuture::Pending(Box::pin(async move { f(fut.await).await })),
        }
    }
}

impl<T: Send + 'static> IntoFuture for MaybeFuture<T> {
    type Output = T;
    type IntoFuture = BoxFuture<'static, T>;

    fn into_future(self) -> Self::IntoFuture {
        match self {
            Self::Ready(value) => Box::pin(future::ready(value)),
            Self::Pending(fut) => fut,
        }
    }
}

impl<T> From<T> for MaybeFuture<T> {
    fn from(value: T) -> Self {
        Self::Ready(value)
    }
}

impl<T> fmt::Debug for MaybeFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(_) => f.write_str("MaybeFuture::Ready"),
            Self::Pending(_) => f.write_str("MaybeFuture::Pending"),
        }
    }
}

/// Static information about the field being resolved.
#[derive(Debug, Clone)]
pub struct ResolveInfo {
    pub field_name: String,
    pub parent_type: String,
    pub return_type: TypeExpr<String>,
}

/// Everything a resolver receives.
#[derive(Debug, Clone)]
pub struct ResolveParams {
    /// The parent value. Wrapped resolvers see the raw parent.
    pub parent: FieldValue,
    pub args: Arc<Args>,
    pub context: RequestContext,
    pub info: Arc<ResolveInfo>,
}

impl ResolveParams {
    /// Looks up an argument by name.
    #[must_use]
    pub fn arg(&self, name: &str) -> Option<&serde_json::Value> {
        self.args.get(name)
    }

    /// Returns a copy of these params with a different parent.
    #[must_use]
    pub fn with_parent(&self, parent: FieldValue) -> Self {
        Self {
            parent,
            args: Arc::clone(&self.args),
            context: self.context.clone(),
            info: Arc::clone(&self.info),
        }
    }
}

type ResolveFn = dyn Fn(ResolveParams) -> MaybeFuture<FieldResult> + Send + Sync;

/// A field evaluation function.
#[derive(Clone)]
pub struct Resolver(Arc<ResolveFn>);

impl Resolver {
    /// Creates a resolver that may complete synchronously or asynchronously.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(ResolveParams) -> MaybeFuture<FieldResult> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Creates a resolver that always completes synchronously.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(ResolveParams) -> FieldResult + Send + Sync + 'static,
    {
        Self::new(move |params| MaybeFuture::Ready(f(params)))
    }

    /// Creates a resolver from an async function.
    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(ResolveParams) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FieldResult> + Send + 'static,
    {
        Self::new(move |params| MaybeFuture::pending(f(params)))
    }

    /// Reads `key` from a JSON-object parent; missing keys resolve to null.
    pub fn property(key: impl Into<String>) -> Self {
        let key = key.into();
        Self::sync(move |params| {
            let value = params
                .parent
                .as_json()
                .and_then(|parent| parent.get(&key))
                .cloned()
                .map(FieldValue::Value)
                .unwrap_or(FieldValue::Null);
            Ok(value)
        })
    }

    /// Returns the parent unchanged.
    #[must_use]
    pub fn identity() -> Self {
        Self::sync(|params| Ok(params.parent))
    }

    /// Invokes the resolver.
    pub fn call(&self, params: ResolveParams) -> MaybeFuture<FieldResult> {
        (self.0)(params)
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Resolver")
    }
}

type SubscribeFn = dyn Fn(ResolveParams) -> MaybeFuture<Result<EventStream, FieldError>> + Send + Sync;

/// Produces the event stream of a subscription field.
#[derive(Clone)]
pub struct Subscriber(Arc<SubscribeFn>);

impl Subscriber {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(ResolveParams) -> MaybeFuture<Result<EventStream, FieldError>> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(ResolveParams) -> Result<EventStream, FieldError> + Send + Sync + 'static,
    {
        Self::new(move |params| MaybeFuture::Ready(f(params)))
    }

    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(ResolveParams) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<EventStream, FieldError>> + Send + 'static,
    {
        Self::new(move |params| MaybeFuture::pending(f(params)))
    }

    pub fn call(&self, params: ResolveParams) -> MaybeFuture<Result<EventStream, FieldError>> {
        (self.0)(params)
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Subscriber")
    }
}

type ResolveTypeFn = dyn Fn(&FieldValue, &RequestContext) -> Option<String> + Send + Sync;

/// Discriminator of an interface or union: names the concrete object type
/// of a value, or `None` when it cannot tell.
#[derive(Clone)]
pub struct ResolveType(Arc<ResolveTypeFn>);

impl ResolveType {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&FieldValue, &RequestContext) -> Option<String> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// A discriminator that never decides, deferring to `is_type_of` checks.
    #[must_use]
    pub fn undecided() -> Self {
        Self::new(|_, _| None)
    }

    pub fn call(&self, value: &FieldValue, context: &RequestContext) -> Option<String> {
        (self.0)(value, context)
    }
}

impl fmt::Debug for ResolveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ResolveType")
    }
}

type IsTypeOfFn = dyn Fn(&FieldValue, &RequestContext) -> bool + Send + Sync;

/// Predicate telling whether a value belongs to an object type.
#[derive(Clone)]
pub struct IsTypeOf(Arc<IsTypeOfFn>);

impl IsTypeOf {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&FieldValue, &RequestContext) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, value: &FieldValue, context: &RequestContext) -> bool {
        (self.0)(value, context)
    }
}

impl fmt::Debug for IsTypeOf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IsTypeOf")
    }
}
