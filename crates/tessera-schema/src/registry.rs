//! Reference registry with deferred resolution.
//!
//! The registry maps references to type names and owns every registered
//! [`TypeConfig`]. Lookups through a reference that is not bound yet are
//! parked as continuations and fire, in registration order, the moment the
//! reference gets bound. [`TypeRegistry::finalize`] freezes the registry and
//! fails with an aggregate error naming every reference still waiting.

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use tracing::{debug, trace};

use tessera_core::{RefId, Result, SchemaError, TypeConfig, TypeKind, TypeRef};

use crate::field_table::{FieldTable, InputFieldsThunk, OutputFieldsThunk};

/// Callback run once a reference is bound. Receives the bound type name.
pub type Continuation = Box<dyn FnOnce(&mut TypeRegistry, &str) -> Result<()> + Send>;

/// Name-to-config map with reference aliasing and deferred lookups.
#[derive(Default)]
pub struct TypeRegistry {
    configs: IndexMap<String, TypeConfig>,
    /// Reference -> bound type name, for handles and aliases.
    bindings: HashMap<TypeRef, String>,
    /// Display names of handles, used in error messages.
    handle_hints: HashMap<RefId, String>,
    next_handle: u32,
    pending: IndexMap<TypeRef, Vec<Continuation>>,
    fields: FieldTable,
    frozen: bool,
}

impl TypeRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh handle. `hint` names it in error messages until it
    /// is bound.
    pub fn new_handle(&mut self, hint: Option<&str>) -> TypeRef {
        let id = RefId::from_raw(self.next_handle);
        self.next_handle += 1;
        if let Some(hint) = hint {
            self.handle_hints.insert(id, hint.to_string());
        }
        TypeRef::Handle(id)
    }

    /// Registers `config` under its name and binds `aliases` to it.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateType`] if the name is taken, or any
    /// error raised by a continuation that fires because of this registration.
    pub fn add_type_config(
        &mut self,
        config: TypeConfig,
        aliases: impl IntoIterator<Item = TypeRef>,
    ) -> Result<()> {
        self.ensure_open()?;
        if self.configs.contains_key(&config.name) {
            return Err(SchemaError::duplicate_type(&config.name));
        }

        let name = config.name.clone();
        trace!(type_name = %name, kind = %config.kind(), "Registered type config");
        self.configs.insert(name.clone(), config);

        self.fire(&TypeRef::named(name.as_str()), &name)?;
        for alias in aliases {
            self.associate(alias, &name)?;
        }
        Ok(())
    }

    /// Binds `reference` to the registered type `name`.
    ///
    /// # Errors
    ///
    /// Fails if `name` is not registered, or if `reference` is already bound
    /// to another name.
    pub fn associate(&mut self, reference: TypeRef, name: &str) -> Result<()> {
        self.ensure_open()?;
        if !self.configs.contains_key(name) {
            return Err(SchemaError::unresolved([name]));
        }
        if let Some(existing) = self.name_of(&reference) {
            if existing == name {
                return Ok(());
            }
            return Err(SchemaError::ReferenceRebound {
                reference: self.describe(&reference),
                existing: existing.to_string(),
                requested: name.to_string(),
            });
        }

        trace!(reference = %self.describe(&reference), type_name = name, "Associated reference");
        self.bindings.insert(reference.clone(), name.to_string());
        self.fire(&reference, name)
    }

    /// Binds `reference` to `name` now, or as soon as `name` is registered.
    ///
    /// # Errors
    ///
    /// Same as [`TypeRegistry::associate`] when `name` is already registered.
    pub fn associate_deferred(&mut self, reference: TypeRef, name: &str) -> Result<()> {
        self.resolve(
            &TypeRef::named(name),
            Box::new(move |registry, name| registry.associate(reference, name)),
        )
    }

    /// Runs `continuation` with the bound name of `reference`, immediately if
    /// it is bound, otherwise once it gets bound.
    ///
    /// # Errors
    ///
    /// Returns the continuation's error when it runs immediately, or
    /// [`SchemaError::RegistryFrozen`] after [`TypeRegistry::finalize`].
    pub fn resolve(&mut self, reference: &TypeRef, continuation: Continuation) -> Result<()> {
        if let Some(name) = self.name_of(reference).map(str::to_string) {
            return continuation(self, &name);
        }
        self.ensure_open()?;
        trace!(reference = %self.describe(reference), "Deferred resolution");
        self.pending
            .entry(reference.clone())
            .or_default()
            .push(continuation);
        Ok(())
    }

    /// Contributes output fields to the type `reference` will be bound to.
    /// The thunk runs when the type is built.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::KindMismatch`] if the type cannot own output fields.
    pub fn add_fields(&mut self, reference: &TypeRef, thunk: OutputFieldsThunk) -> Result<()> {
        let display = self.describe(reference);
        self.resolve(
            reference,
            Box::new(move |registry, name| {
                let kind = registry.kind_of(name)?;
                if !kind.has_output_fields() {
                    return Err(SchemaError::kind_mismatch(display, "a type with fields", kind));
                }
                registry.fields.add_output(name, thunk);
                Ok(())
            }),
        )
    }

    /// Contributes fields to the input object `reference` will be bound to.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::KindMismatch`] if the type is not an input object.
    pub fn add_input_fields(&mut self, reference: &TypeRef, thunk: InputFieldsThunk) -> Result<()> {
        let display = self.describe(reference);
        self.resolve(
            reference,
            Box::new(move |registry, name| {
                let kind = registry.kind_of(name)?;
                if kind != TypeKind::InputObject {
                    return Err(SchemaError::kind_mismatch(display, "an InputObject", kind));
                }
                registry.fields.add_input(name, thunk);
                Ok(())
            }),
        )
    }

    /// Freezes the registry.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnresolvedReferences`] naming every reference
    /// that still has pending continuations.
    pub fn finalize(&mut self) -> Result<()> {
        self.frozen = true;
        debug!(
            types = self.configs.len(),
            bindings = self.bindings.len(),
            pending = self.pending.len(),
            "Finalized type registry"
        );
        if self.pending.is_empty() {
            return Ok(());
        }
        let references: Vec<String> = self
            .pending
            .keys()
            .map(|reference| self.describe(reference))
            .collect();
        Err(SchemaError::unresolved(references))
    }

    /// The name `reference` is bound to, if any.
    #[must_use]
    pub fn name_of(&self, reference: &TypeRef) -> Option<&str> {
        if let Some(name) = self.bindings.get(reference) {
            return Some(name);
        }
        match reference {
            TypeRef::Named(name) => self.configs.get_key_value(name).map(|(key, _)| key.as_str()),
            TypeRef::Handle(_) => None,
        }
    }

    /// Human-readable form of a reference for messages.
    #[must_use]
    pub fn describe(&self, reference: &TypeRef) -> String {
        match reference {
            TypeRef::Named(name) => name.clone(),
            TypeRef::Handle(id) => self
                .name_of(reference)
                .map(str::to_string)
                .or_else(|| self.handle_hints.get(id).cloned())
                .unwrap_or_else(|| reference.to_string()),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TypeConfig> {
        self.configs.get(name)
    }

    /// Config `reference` is bound to.
    #[must_use]
    pub fn get_by_ref(&self, reference: &TypeRef) -> Option<&TypeConfig> {
        self.name_of(reference).and_then(|name| self.configs.get(name))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.configs.contains_key(name)
    }

    /// Registered configs in registration order.
    pub fn configs(&self) -> impl Iterator<Item = &TypeConfig> {
        self.configs.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.configs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Number of references with parked continuations.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Registers a built-in type without firing continuations.
    pub(crate) fn add_builtin(&mut self, config: TypeConfig) {
        self.configs.insert(config.name.clone(), config);
    }

    /// Moves the accumulated field contributions out for a build.
    pub(crate) fn take_fields(&mut self) -> FieldTable {
        std::mem::take(&mut self.fields)
    }

    fn kind_of(&self, name: &str) -> Result<TypeKind> {
        self.configs
            .get(name)
            .map(TypeConfig::kind)
            .ok_or_else(|| SchemaError::unresolved([name]))
    }

    fn ensure_open(&self) -> Result<()> {
        if self.frozen {
            Err(SchemaError::RegistryFrozen)
        } else {
            Ok(())
        }
    }

    fn fire(&mut self, reference: &TypeRef, name: &str) -> Result<()> {
        let Some(continuations) = self.pending.shift_remove(reference) else {
            return Ok(());
        };
        trace!(type_name = name, count = continuations.len(), "Firing pending continuations");
        for continuation in continuations {
            continuation(self, name)?;
        }
        Ok(())
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.configs.keys().collect::<Vec<_>>())
            .field("bindings", &self.bindings.len())
            .field("pending", &self.pending.len())
            .field("frozen", &self.frozen)
            .finish()
    }
}
