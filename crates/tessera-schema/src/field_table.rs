//! Per-type accumulation and merging of field declarations.
//!
//! Fields arrive as thunks, possibly long before the owning type is
//! implemented. Thunks run once, when the type is built, in the order they
//! were contributed. Merging is strict: a name declared twice by the same
//! type is an error, and so is a name inherited from two unrelated
//! declarations unless the type declares the field itself.

use std::collections::HashMap;

use indexmap::IndexMap;
use indexmap::map::Entry;

use tessera_core::{
    InputFieldConfig, InputFieldKind, OutputFieldConfig, Result, SchemaError, TypeKind,
};

/// Deferred output field declarations.
pub type OutputFieldsThunk = Box<dyn FnOnce() -> Vec<OutputFieldConfig> + Send>;

/// Deferred input field declarations.
pub type InputFieldsThunk = Box<dyn FnOnce() -> Vec<InputFieldConfig> + Send>;

/// Ordered field contributions keyed by type name.
#[derive(Default)]
pub struct FieldTable {
    output: HashMap<String, Vec<OutputFieldsThunk>>,
    input: HashMap<String, Vec<InputFieldsThunk>>,
}

impl FieldTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_output(&mut self, type_name: &str, thunk: OutputFieldsThunk) {
        self.output
            .entry(type_name.to_string())
            .or_default()
            .push(thunk);
    }

    pub fn add_input(&mut self, type_name: &str, thunk: InputFieldsThunk) {
        self.input
            .entry(type_name.to_string())
            .or_default()
            .push(thunk);
    }

    /// Number of contributions for `type_name`.
    #[must_use]
    pub fn contributions(&self, type_name: &str) -> usize {
        self.output.get(type_name).map_or(0, Vec::len)
            + self.input.get(type_name).map_or(0, Vec::len)
    }

    /// Runs and merges the output field thunks of `type_name`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateField`] if a name is declared twice.
    pub fn take_output(
        &mut self,
        type_name: &str,
        kind: TypeKind,
    ) -> Result<IndexMap<String, OutputFieldConfig>> {
        let mut merged = IndexMap::new();
        for thunk in self.output.remove(type_name).unwrap_or_default() {
            for field in thunk() {
                let field = field.retarget(type_name, kind);
                match merged.entry(field.name.clone()) {
                    Entry::Occupied(_) => {
                        return Err(SchemaError::duplicate_field(type_name, field.name));
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(field);
                    }
                }
            }
        }
        Ok(merged)
    }

    /// Runs and merges the input field thunks of `type_name`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateField`] if a name is declared twice.
    pub fn take_input(&mut self, type_name: &str) -> Result<IndexMap<String, InputFieldConfig>> {
        let mut merged = IndexMap::new();
        for thunk in self.input.remove(type_name).unwrap_or_default() {
            for mut field in thunk() {
                type_name.clone_into(&mut field.parent_type);
                field.kind = InputFieldKind::InputObjectField;
                match merged.entry(field.name.clone()) {
                    Entry::Occupied(_) => {
                        return Err(SchemaError::duplicate_field(type_name, field.name));
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(field);
                    }
                }
            }
        }
        Ok(merged)
    }
}

/// Merges interface fields into a type's own fields.
///
/// Inherited fields come first, in interface order, retargeted onto
/// `type_name`. The type's own fields follow; an own field replaces an
/// inherited one of the same name in place. The same field reached through
/// several interfaces is kept once.
///
/// # Errors
///
/// Returns [`SchemaError::DuplicateField`] if two interfaces declare the
/// same name independently and the type does not declare it itself.
pub fn inherit_fields(
    type_name: &str,
    kind: TypeKind,
    own: IndexMap<String, OutputFieldConfig>,
    inherited: Vec<IndexMap<String, OutputFieldConfig>>,
) -> Result<IndexMap<String, OutputFieldConfig>> {
    let mut merged: IndexMap<String, OutputFieldConfig> = IndexMap::new();
    for fields in inherited {
        for (name, field) in fields {
            if let Some(existing) = merged.get(&name) {
                if existing.declared_by != field.declared_by && !own.contains_key(&name) {
                    return Err(SchemaError::duplicate_field(type_name, name));
                }
                continue;
            }
            merged.insert(name, field.retarget(type_name, kind));
        }
    }
    for (name, field) in own {
        merged.insert(name, field);
    }
    Ok(merged)
}
