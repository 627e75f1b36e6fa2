//! Error types for the GraphQL adapter.
//!
//! Errors raised while converting a type graph into an executable schema, or
//! while bridging a single field evaluation, are reported as
//! [`GraphQLAdapterError`]. Inside resolvers they are turned into
//! `async_graphql::Error`s carrying a `code` extension.

use std::fmt;

use async_graphql::ErrorExtensions;
use tessera_core::{FieldError, SchemaError};

/// Errors that can occur in the GraphQL adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphQLAdapterError {
    /// Schema is still being built - caller should retry.
    SchemaInitializing,

    /// Schema build failed.
    SchemaBuildFailed(String),

    /// The graph has no Query root.
    MissingQueryRoot,

    /// A request was executed without a [`tessera_core::RequestContext`].
    MissingRequestContext,

    /// A value could not be converted between JSON and GraphQL.
    Serialization(String),

    /// A resolver failed.
    Field(FieldError),
}

impl fmt::Display for GraphQLAdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SchemaInitializing => {
                write!(f, "GraphQL schema is initializing, please retry")
            }
            Self::SchemaBuildFailed(msg) => {
                write!(f, "Failed to build GraphQL schema: {msg}")
            }
            Self::MissingQueryRoot => {
                write!(f, "Type graph has no Query root")
            }
            Self::MissingRequestContext => {
                write!(f, "Request was executed without a request context")
            }
            Self::Serialization(msg) => {
                write!(f, "Serialization error: {msg}")
            }
            Self::Field(err) => {
                write!(f, "{}", err.message)
            }
        }
    }
}

impl std::error::Error for GraphQLAdapterError {}

impl GraphQLAdapterError {
    /// Returns the error code for GraphQL error extensions.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::SchemaInitializing => "SCHEMA_INITIALIZING",
            Self::SchemaBuildFailed(_) => "SCHEMA_BUILD_FAILED",
            Self::MissingQueryRoot => "MISSING_QUERY_ROOT",
            Self::MissingRequestContext => "MISSING_REQUEST_CONTEXT",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Field(_) => "FIELD_ERROR",
        }
    }

    /// Converts into an execution error. Resolver errors keep their own
    /// extensions; every other error gets a `code` extension.
    #[must_use]
    pub fn into_graphql_error(self) -> async_graphql::Error {
        match self {
            Self::Field(err) => {
                let mut converted = async_graphql::Error::new(err.message);
                for (key, value) in err.extensions {
                    if let Ok(value) = async_graphql::Value::from_json(value) {
                        converted = converted.extend_with(|_, ext| ext.set(key, value));
                    }
                }
                converted
            }
            other => {
                let code = other.error_code();
                async_graphql::Error::new(other.to_string()).extend_with(|_, ext| ext.set("code", code))
            }
        }
    }
}

impl From<SchemaError> for GraphQLAdapterError {
    fn from(err: SchemaError) -> Self {
        Self::SchemaBuildFailed(err.to_string())
    }
}

impl From<FieldError> for GraphQLAdapterError {
    fn from(err: FieldError) -> Self {
        Self::Field(err)
    }
}

impl From<serde_json::Error> for GraphQLAdapterError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            GraphQLAdapterError::SchemaInitializing.error_code(),
            "SCHEMA_INITIALIZING"
        );
        assert_eq!(
            GraphQLAdapterError::from(SchemaError::duplicate_type("Giraffe")).error_code(),
            "SCHEMA_BUILD_FAILED"
        );
    }

    #[test]
    fn test_display() {
        let err = GraphQLAdapterError::SchemaBuildFailed("no roots".into());
        assert_eq!(err.to_string(), "Failed to build GraphQL schema: no roots");
    }

    #[test]
    fn test_field_error_keeps_extensions() {
        let err = GraphQLAdapterError::Field(
            FieldError::new("boom").with_extension("code", "E_BOOM"),
        )
        .into_graphql_error();
        assert_eq!(err.message, "boom");
        let extensions = err.extensions.unwrap();
        assert_eq!(
            extensions.get("code"),
            Some(&async_graphql::Value::from("E_BOOM"))
        );
    }
}
