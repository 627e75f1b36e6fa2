//! Error types for schema construction and field evaluation.
//!
//! Configuration errors ([`SchemaError`]) are raised synchronously while
//! types are registered or while the graph is built. They never surface at
//! request time. Evaluation errors ([`FieldError`]) are produced by resolvers
//! and travel through the wrapping layer untouched.

use thiserror::Error;

use crate::types::{Extensions, TypeKind};

/// Errors raised while registering types or building a type graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("Duplicate type name: {name}")]
    DuplicateType { name: String },

    #[error("Unresolved type references: {}", references.join(", "))]
    UnresolvedReferences { references: Vec<String> },

    #[error("Field {field_name} is declared more than once on type {type_name}")]
    DuplicateField {
        type_name: String,
        field_name: String,
    },

    #[error("Type reference {reference} was expected to be {expected} but is {found}")]
    KindMismatch {
        reference: String,
        expected: String,
        found: TypeKind,
    },

    #[error("Field {type_name}.{field_name} has no {what}")]
    MissingImplementation {
        type_name: String,
        field_name: String,
        what: &'static str,
    },

    #[error("Plugin {name} is already registered")]
    PluginRegistration { name: String },

    #[error("Unknown plugin: {name}")]
    UnknownPlugin { name: String },

    #[error("Reference {reference} is already bound to {existing}, cannot bind it to {requested}")]
    ReferenceRebound {
        reference: String,
        existing: String,
        requested: String,
    },

    #[error("Type {type_name} inherits from itself")]
    CyclicInheritance { type_name: String },

    #[error("Type registry is frozen; no further registrations are accepted")]
    RegistryFrozen,

    #[error("Invalid build configuration: {0}")]
    InvalidConfig(String),
}

impl SchemaError {
    /// Create a new DuplicateType error
    pub fn duplicate_type(name: impl Into<String>) -> Self {
        Self::DuplicateType { name: name.into() }
    }

    /// Create a new UnresolvedReferences error
    pub fn unresolved<I, S>(references: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::UnresolvedReferences {
            references: references.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a new DuplicateField error
    pub fn duplicate_field(type_name: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self::DuplicateField {
            type_name: type_name.into(),
            field_name: field_name.into(),
        }
    }

    /// Create a new KindMismatch error
    pub fn kind_mismatch(
        reference: impl Into<String>,
        expected: impl Into<String>,
        found: TypeKind,
    ) -> Self {
        Self::KindMismatch {
            reference: reference.into(),
            expected: expected.into(),
            found,
        }
    }

    /// Create a new MissingImplementation error
    pub fn missing_implementation(
        type_name: impl Into<String>,
        field_name: impl Into<String>,
        what: &'static str,
    ) -> Self {
        Self::MissingImplementation {
            type_name: type_name.into(),
            field_name: field_name.into(),
            what,
        }
    }

    /// Returns a stable code for this error, suitable for logs and tests.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::DuplicateType { .. } => "DUPLICATE_TYPE",
            Self::UnresolvedReferences { .. } => "UNRESOLVED_REFERENCES",
            Self::DuplicateField { .. } => "DUPLICATE_FIELD",
            Self::KindMismatch { .. } => "KIND_MISMATCH",
            Self::MissingImplementation { .. } => "MISSING_IMPLEMENTATION",
            Self::PluginRegistration { .. } => "PLUGIN_REGISTRATION",
            Self::UnknownPlugin { .. } => "UNKNOWN_PLUGIN",
            Self::ReferenceRebound { .. } => "REFERENCE_REBOUND",
            Self::CyclicInheritance { .. } => "CYCLIC_INHERITANCE",
            Self::RegistryFrozen => "REGISTRY_FROZEN",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
        }
    }
}

/// An error produced while evaluating a field.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct FieldError {
    /// Human-readable message.
    pub message: String,

    /// Extra data attached to the error.
    pub extensions: Extensions,
}

impl FieldError {
    /// Creates a new field error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            extensions: Extensions::new(),
        }
    }

    /// Attaches an extension entry.
    #[must_use]
    pub fn with_extension(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extensions.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_message_names_every_reference() {
        let err = SchemaError::unresolved(["B", "C"]);
        assert_eq!(err.to_string(), "Unresolved type references: B, C");
        assert_eq!(err.error_code(), "UNRESOLVED_REFERENCES");
    }

    #[test]
    fn test_kind_mismatch_message() {
        let err = SchemaError::kind_mismatch("Date", "an Interface", TypeKind::Scalar);
        assert_eq!(
            err.to_string(),
            "Type reference Date was expected to be an Interface but is Scalar"
        );
    }

    #[test]
    fn test_field_error_extensions() {
        let err = FieldError::new("boom").with_extension("code", "E_BOOM");
        assert_eq!(err.to_string(), "boom");
        assert_eq!(err.extensions["code"], "E_BOOM");
    }
}
