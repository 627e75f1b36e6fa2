//! Kind-specific registration options.
//!
//! Each option type collects what one `SchemaBuilder` registration call
//! needs: the type config itself plus any field declarations, which stay
//! deferred until the type is built.

use tessera_core::{
    EnumValueConfig, InputFieldConfig, IsTypeOf, OutputFieldConfig, ResolveType, Result, RootKind,
    SchemaError, TypeConfig, TypeDetail, TypeRef,
};

use crate::field_table::{InputFieldsThunk, OutputFieldsThunk};

macro_rules! common_options {
    () => {
        #[must_use]
        pub fn description(mut self, description: impl Into<String>) -> Self {
            self.config.description = Some(description.into());
            self
        }

        #[must_use]
        pub fn extension(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
            self.config.extensions.insert(key.into(), value.into());
            self
        }

        /// Name of the type being registered.
        #[must_use]
        pub fn name(&self) -> &str {
            &self.config.name
        }
    };
}

macro_rules! output_field_options {
    () => {
        /// Declares one field.
        #[must_use]
        pub fn field(mut self, field: OutputFieldConfig) -> Self {
            self.fields.push(Box::new(move || vec![field]));
            self
        }

        /// Declares fields lazily; `fields` runs when the type is built.
        #[must_use]
        pub fn fields<F>(mut self, fields: F) -> Self
        where
            F: FnOnce() -> Vec<OutputFieldConfig> + Send + 'static,
        {
            self.fields.push(Box::new(fields));
            self
        }
    };
}

/// Options for an object type.
pub struct ObjectType {
    config: TypeConfig,
    fields: Vec<OutputFieldsThunk>,
}

impl ObjectType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            config: TypeConfig::object(name),
            fields: Vec::new(),
        }
    }

    common_options!();
    output_field_options!();

    /// Implements an interface.
    #[must_use]
    pub fn implements(mut self, interface: impl Into<TypeRef>) -> Self {
        if let TypeDetail::Object { interfaces, .. } = &mut self.config.detail {
            interfaces.push(interface.into());
        }
        self
    }

    #[must_use]
    pub fn is_type_of(mut self, check: IsTypeOf) -> Self {
        if let TypeDetail::Object { is_type_of, .. } = &mut self.config.detail {
            *is_type_of = Some(check);
        }
        self
    }

    pub(crate) fn into_parts(self) -> (TypeConfig, Vec<OutputFieldsThunk>) {
        (self.config, self.fields)
    }
}

/// Options for an interface type.
pub struct InterfaceType {
    config: TypeConfig,
    fields: Vec<OutputFieldsThunk>,
}

impl InterfaceType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            config: TypeConfig::interface(name),
            fields: Vec::new(),
        }
    }

    common_options!();
    output_field_options!();

    /// Extends another interface.
    #[must_use]
    pub fn implements(mut self, interface: impl Into<TypeRef>) -> Self {
        if let TypeDetail::Interface { interfaces, .. } = &mut self.config.detail {
            interfaces.push(interface.into());
        }
        self
    }

    #[must_use]
    pub fn resolve_type(mut self, discriminator: ResolveType) -> Self {
        if let TypeDetail::Interface { resolve_type, .. } = &mut self.config.detail {
            *resolve_type = Some(discriminator);
        }
        self
    }

    pub(crate) fn into_parts(self) -> (TypeConfig, Vec<OutputFieldsThunk>) {
        (self.config, self.fields)
    }
}

/// Options for a union type.
pub struct UnionType {
    config: TypeConfig,
}

impl UnionType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            config: TypeConfig::union(name, Vec::new()),
        }
    }

    common_options!();

    #[must_use]
    pub fn member(mut self, member: impl Into<TypeRef>) -> Self {
        if let TypeDetail::Union { members, .. } = &mut self.config.detail {
            members.push(member.into());
        }
        self
    }

    #[must_use]
    pub fn resolve_type(mut self, discriminator: ResolveType) -> Self {
        if let TypeDetail::Union { resolve_type, .. } = &mut self.config.detail {
            *resolve_type = Some(discriminator);
        }
        self
    }

    pub(crate) fn into_config(self) -> TypeConfig {
        self.config
    }
}

/// Options for an enum type.
pub struct EnumType {
    config: TypeConfig,
    /// First value name added twice; reported at registration.
    duplicate: Option<String>,
}

impl EnumType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            config: TypeConfig::enumeration(name, Vec::new()),
            duplicate: None,
        }
    }

    common_options!();

    #[must_use]
    pub fn value(mut self, mut value: EnumValueConfig) -> Self {
        value.parent_type.clone_from(&self.config.name);
        if let TypeDetail::Enum { values } = &mut self.config.detail {
            if values.contains_key(&value.name) {
                self.duplicate.get_or_insert_with(|| value.name.clone());
            } else {
                values.insert(value.name.clone(), value);
            }
        }
        self
    }

    /// Adds values whose internal representation is their name.
    #[must_use]
    pub fn values<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names
            .into_iter()
            .fold(self, |options, name| options.value(EnumValueConfig::new(name)))
    }

    pub(crate) fn into_config(self) -> Result<TypeConfig> {
        match self.duplicate {
            Some(value) => Err(SchemaError::duplicate_field(self.config.name, value)),
            None => Ok(self.config),
        }
    }
}

/// Options for a scalar type.
pub struct ScalarType {
    config: TypeConfig,
}

impl ScalarType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            config: TypeConfig::scalar(name),
        }
    }

    common_options!();

    #[must_use]
    pub fn specified_by_url(mut self, url: impl Into<String>) -> Self {
        if let TypeDetail::Scalar { specified_by_url } = &mut self.config.detail {
            *specified_by_url = Some(url.into());
        }
        self
    }

    pub(crate) fn into_config(self) -> TypeConfig {
        self.config
    }
}

/// Options for an input object type.
pub struct InputObjectType {
    config: TypeConfig,
    fields: Vec<InputFieldsThunk>,
}

impl InputObjectType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            config: TypeConfig::input_object(name),
            fields: Vec::new(),
        }
    }

    common_options!();

    #[must_use]
    pub fn field(mut self, field: InputFieldConfig) -> Self {
        self.fields.push(Box::new(move || vec![field]));
        self
    }

    #[must_use]
    pub fn fields<F>(mut self, fields: F) -> Self
    where
        F: FnOnce() -> Vec<InputFieldConfig> + Send + 'static,
    {
        self.fields.push(Box::new(fields));
        self
    }

    pub(crate) fn into_parts(self) -> (TypeConfig, Vec<InputFieldsThunk>) {
        (self.config, self.fields)
    }
}

/// Options for the Query, Mutation or Subscription root type.
pub struct RootType {
    config: TypeConfig,
    fields: Vec<OutputFieldsThunk>,
}

impl RootType {
    #[must_use]
    pub fn new(kind: RootKind) -> Self {
        Self {
            config: TypeConfig::root(kind),
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn query() -> Self {
        Self::new(RootKind::Query)
    }

    #[must_use]
    pub fn mutation() -> Self {
        Self::new(RootKind::Mutation)
    }

    #[must_use]
    pub fn subscription() -> Self {
        Self::new(RootKind::Subscription)
    }

    common_options!();
    output_field_options!();

    pub(crate) fn kind(&self) -> RootKind {
        match self.config.detail {
            TypeDetail::Root(kind) => kind,
            _ => RootKind::Query,
        }
    }

    pub(crate) fn into_parts(self) -> (TypeConfig, Vec<OutputFieldsThunk>) {
        (self.config, self.fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::{TypeExpr, TypeKind};

    #[test]
    fn test_object_options_collect_fields_lazily() {
        let (config, fields) = ObjectType::new("Giraffe")
            .description("A tall animal")
            .implements("Animal")
            .field(OutputFieldConfig::new("name", TypeExpr::named("String")))
            .fields(|| vec![OutputFieldConfig::new("height", TypeExpr::named("Float"))])
            .into_parts();

        assert_eq!(config.kind(), TypeKind::Object);
        assert_eq!(config.description.as_deref(), Some("A tall animal"));
        assert_eq!(config.interfaces(), &[TypeRef::named("Animal")]);
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn test_enum_values_keep_order_and_parent() {
        let config = EnumType::new("Color")
            .values(["RED", "GREEN"])
            .value(EnumValueConfig::new("BLUE").value(3))
            .into_config()
            .unwrap();

        let TypeDetail::Enum { values } = &config.detail else {
            panic!("expected enum detail");
        };
        let names: Vec<&str> = values.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["RED", "GREEN", "BLUE"]);
        assert!(values.values().all(|value| value.parent_type == "Color"));
    }

    #[test]
    fn test_duplicate_enum_value_is_rejected() {
        let err = EnumType::new("Color")
            .value(EnumValueConfig::new("RED").value(1))
            .values(["GREEN", "RED"])
            .into_config()
            .unwrap_err();
        assert_eq!(err, SchemaError::duplicate_field("Color", "RED"));
    }

    #[test]
    fn test_root_options_use_reserved_names() {
        let root = RootType::subscription();
        assert_eq!(root.kind(), RootKind::Subscription);
        assert_eq!(root.name(), "Subscription");
    }
}
