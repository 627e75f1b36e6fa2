//! Type references and type expressions.
//!
//! A [`TypeRef`] stands in for a type that may not be registered yet. It is
//! either a plain type name or an opaque handle allocated by the registry and
//! bound to a name later. Field types are written as [`TypeExpr`] trees that
//! terminate in a reference; once a graph is built the same trees are kept
//! with plain names (`TypeExpr<String>`).

use std::fmt;

/// Identifier of a registry-allocated reference handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RefId(u32);

impl RefId {
    /// Wraps a raw handle number.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw handle number.
    #[must_use]
    pub const fn as_raw(self) -> u32 {
        self.0
    }
}

/// A reference to a type that may not exist yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// Refers to whatever type is registered under this name.
    Named(String),
    /// Refers to whatever type this handle gets associated with.
    Handle(RefId),
}

impl TypeRef {
    /// Creates a name-based reference.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Returns the name for name-based references.
    #[must_use]
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Named(name) => Some(name),
            Self::Handle(_) => None,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::Handle(id) => write!(f, "<ref #{}>", id.0),
        }
    }
}

impl From<&str> for TypeRef {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

impl From<String> for TypeRef {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

impl From<&TypeRef> for TypeRef {
    fn from(reference: &TypeRef) -> Self {
        reference.clone()
    }
}

macro_rules! typed_ref {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(TypeRef);

        impl $name {
            /// Wraps an untyped reference.
            #[must_use]
            pub fn new(reference: TypeRef) -> Self {
                Self(reference)
            }

            /// Returns the underlying reference.
            #[must_use]
            pub fn type_ref(&self) -> &TypeRef {
                &self.0
            }
        }

        impl From<$name> for TypeRef {
            fn from(reference: $name) -> Self {
                reference.0
            }
        }

        impl From<&$name> for TypeRef {
            fn from(reference: &$name) -> Self {
                reference.0.clone()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

typed_ref!(
    /// Reference to an Object type.
    ObjectRef
);
typed_ref!(
    /// Reference to an Interface type.
    InterfaceRef
);
typed_ref!(
    /// Reference to a Union type.
    UnionRef
);
typed_ref!(
    /// Reference to an Enum type.
    EnumRef
);
typed_ref!(
    /// Reference to a Scalar type.
    ScalarRef
);
typed_ref!(
    /// Reference to an InputObject type.
    InputObjectRef
);
typed_ref!(
    /// Reference to one of the Query, Mutation or Subscription root types.
    RootRef
);

/// A possibly wrapped field type, terminating in a reference.
///
/// The constructors follow async-graphql's `TypeRef` helpers: `named` and
/// `list` are nullable, the `_nn` variants are non-null.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr<R = TypeRef> {
    Named { reference: R, nullable: bool },
    List { item: Box<TypeExpr<R>>, nullable: bool },
}

impl<R> TypeExpr<R> {
    /// Nullable named type.
    pub fn named(reference: impl Into<R>) -> Self {
        Self::Named {
            reference: reference.into(),
            nullable: true,
        }
    }

    /// Non-null named type.
    pub fn named_nn(reference: impl Into<R>) -> Self {
        Self::Named {
            reference: reference.into(),
            nullable: false,
        }
    }

    /// Nullable list of `item`.
    #[must_use]
    pub fn list(item: TypeExpr<R>) -> Self {
        Self::List {
            item: Box::new(item),
            nullable: true,
        }
    }

    /// Non-null list of `item`.
    #[must_use]
    pub fn list_nn(item: TypeExpr<R>) -> Self {
        Self::List {
            item: Box::new(item),
            nullable: false,
        }
    }

    #[must_use]
    pub fn is_nullable(&self) -> bool {
        match self {
            Self::Named { nullable, .. } | Self::List { nullable, .. } => *nullable,
        }
    }

    #[must_use]
    pub fn is_list(&self) -> bool {
        matches!(self, Self::List { .. })
    }

    /// Returns the terminal reference of this type expression.
    pub fn named_type(&self) -> &R {
        match self {
            Self::Named { reference, .. } => reference,
            Self::List { item, .. } => item.named_type(),
        }
    }

    /// Rebuilds the expression with a different terminal reference.
    pub fn try_map<S, E, F>(&self, mut f: F) -> Result<TypeExpr<S>, E>
    where
        F: FnMut(&R) -> Result<S, E>,
    {
        self.try_map_inner(&mut f)
    }

    fn try_map_inner<S, E, F>(&self, f: &mut F) -> Result<TypeExpr<S>, E>
    where
        F: FnMut(&R) -> Result<S, E>,
    {
        match self {
            Self::Named {
                reference,
                nullable,
            } => Ok(TypeExpr::Named {
                reference: f(reference)?,
                nullable: *nullable,
            }),
            Self::List { item, nullable } => Ok(TypeExpr::List {
                item: Box::new(item.try_map_inner(f)?),
                nullable: *nullable,
            }),
        }
    }
}

impl<R: fmt::Display> fmt::Display for TypeExpr<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named { reference, .. } => write!(f, "{reference}")?,
            Self::List { item, .. } => write!(f, "[{item}]")?,
        }
        if !self.is_nullable() {
            f.write_str("!")?;
        }
        Ok(())
    }
}
