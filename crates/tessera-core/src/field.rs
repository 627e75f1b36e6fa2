//! Field configs: output fields, arguments and input-object fields.
//!
//! Configs are contributed before their owning type is built. The owning
//! type's name and kind are filled in when the field table merges them, so
//! a config built by user code only needs a name and a type expression.

use indexmap::IndexMap;

use crate::reference::{TypeExpr, TypeRef};
use crate::runtime::{FieldResult, ResolveParams, Resolver, Subscriber};
use crate::types::{Extensions, TypeKind};

/// Where an input value is declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputFieldKind {
    /// An argument of the named output field.
    Argument { field_name: String },
    /// A field of an input object.
    InputObjectField,
}

/// An argument or an input-object field.
#[derive(Debug, Clone)]
pub struct InputFieldConfig {
    pub name: String,
    /// Type owning the field, or owning the output field for arguments.
    pub parent_type: String,
    pub kind: InputFieldKind,
    pub ty: TypeExpr,
    pub default_value: Option<serde_json::Value>,
    pub description: Option<String>,
    pub deprecation_reason: Option<String>,
    pub extensions: Extensions,
}

impl InputFieldConfig {
    /// Creates an input-object field. Use [`OutputFieldConfig::argument`] to
    /// attach it to an output field as an argument instead.
    pub fn new(name: impl Into<String>, ty: TypeExpr) -> Self {
        Self {
            name: name.into(),
            parent_type: String::new(),
            kind: InputFieldKind::InputObjectField,
            ty,
            default_value: None,
            description: None,
            deprecation_reason: None,
            extensions: Extensions::new(),
        }
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<serde_json::Value>) -> Self {
        self.default_value = Some(value.into());
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

    #[must_use]
    pub fn extension(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extensions.insert(key.into(), value.into());
        self
    }

    /// Whether this is an argument of an output field.
    #[must_use]
    pub fn is_argument(&self) -> bool {
        matches!(self.kind, InputFieldKind::Argument { .. })
    }
}

/// A field of an object, interface or root type.
#[derive(Debug, Clone)]
pub struct OutputFieldConfig {
    pub name: String,
    /// Type the field belongs to.
    pub parent_type: String,
    pub parent_kind: TypeKind,
    /// Type that originally declared the field. Differs from `parent_type`
    /// for fields inherited from an interface.
    pub declared_by: String,
    pub ty: TypeExpr,
    pub args: IndexMap<String, InputFieldConfig>,
    pub description: Option<String>,
    pub deprecation_reason: Option<String>,
    pub resolver: Option<Resolver>,
    pub subscriber: Option<Subscriber>,
    pub extensions: Extensions,
}

impl OutputFieldConfig {
    pub fn new(name: impl Into<String>, ty: TypeExpr) -> Self {
        Self {
            name: name.into(),
            parent_type: String::new(),
            parent_kind: TypeKind::Object,
            declared_by: String::new(),
            ty,
            args: IndexMap::new(),
            description: None,
            deprecation_reason: None,
            resolver: None,
            subscriber: None,
            extensions: Extensions::new(),
        }
    }

    /// Sets the resolver.
    #[must_use]
    pub fn resolve(mut self, resolver: Resolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Sets a synchronous resolver.
    #[must_use]
    pub fn resolve_with<F>(self, f: F) -> Self
    where
        F: Fn(ResolveParams) -> FieldResult + Send + Sync + 'static,
    {
        self.resolve(Resolver::sync(f))
    }

    /// Resolves the field by reading `key` from a JSON-object parent.
    #[must_use]
    pub fn expose(self, key: impl Into<String>) -> Self {
        self.resolve(Resolver::property(key))
    }

    /// Sets the subscriber of a subscription field.
    #[must_use]
    pub fn subscribe(mut self, subscriber: Subscriber) -> Self {
        self.subscriber = Some(subscriber);
        self
    }

    /// Adds an argument. Arguments keep declaration order; a later argument
    /// with the same name replaces the earlier one.
    #[must_use]
    pub fn argument(mut self, mut arg: InputFieldConfig) -> Self {
        arg.kind = InputFieldKind::Argument {
            field_name: self.name.clone(),
        };
        arg.parent_type.clone_from(&self.parent_type);
        self.args.insert(arg.name.clone(), arg);
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

    #[must_use]
    pub fn extension(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extensions.insert(key.into(), value.into());
        self
    }

    /// Terminal reference of the field type.
    #[must_use]
    pub fn type_ref(&self) -> &TypeRef {
        self.ty.named_type()
    }

    /// Moves the field onto `parent_type`, keeping `declared_by` if it was
    /// already set.
    #[must_use]
    pub fn retarget(mut self, parent_type: &str, parent_kind: TypeKind) -> Self {
        parent_type.clone_into(&mut self.parent_type);
        self.parent_kind = parent_kind;
        if self.declared_by.is_empty() {
            parent_type.clone_into(&mut self.declared_by);
        }
        for arg in self.args.values_mut() {
            parent_type.clone_into(&mut arg.parent_type);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argument_records_owning_field() {
        let field = OutputFieldConfig::new("events", TypeExpr::list(TypeExpr::named("Event")))
            .argument(InputFieldConfig::new("limit", TypeExpr::named("Int")).default_value(10));

        let limit = &field.args["limit"];
        assert!(limit.is_argument());
        assert_eq!(
            limit.kind,
            InputFieldKind::Argument {
                field_name: "events".into()
            }
        );
        assert_eq!(limit.default_value, Some(serde_json::json!(10)));
    }

    #[test]
    fn test_retarget_keeps_original_declaration() {
        let field = OutputFieldConfig::new("name", TypeExpr::named_nn("String"))
            .argument(InputFieldConfig::new("upper", TypeExpr::named("Boolean")))
            .retarget("Animal", TypeKind::Interface)
            .retarget("Giraffe", TypeKind::Object);

        assert_eq!(field.parent_type, "Giraffe");
        assert_eq!(field.parent_kind, TypeKind::Object);
        assert_eq!(field.declared_by, "Animal");
        assert_eq!(field.args["upper"].parent_type, "Giraffe");
    }

    #[test]
    fn test_expose_sets_resolver() {
        let field = OutputFieldConfig::new("name", TypeExpr::named("String")).expose("name");
        assert!(field.resolver.is_some());
        assert_eq!(field.type_ref(), &TypeRef::named("String"));
    }
}
