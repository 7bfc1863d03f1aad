//! Form input validation.
//!
//! Guards in [`input_guards`] check single values; [`FieldErrors`] collects
//! the per-field failures of a whole form so the submit can be blocked and the
//! messages rendered next to their fields.

pub mod input_guards;

pub use input_guards::{
    ValidationError, ValidationResult, validate_date, validate_date_order, validate_email,
    validate_positive, validate_required,
};

use serde::{Serialize, Serializer, ser::SerializeMap};
use std::collections::BTreeMap;

/// Field-level errors of one form, keyed by the form's field enum.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldErrors<F: Ord>(BTreeMap<F, ValidationError>);

impl<F: Ord> Default for FieldErrors<F> {
    fn default() -> Self {
        Self(BTreeMap::new())
    }
}

impl<F: Ord + Copy + AsRef<str>> FieldErrors<F> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the first failure per field; later failures for the same field are ignored.
    pub fn check<T>(&mut self, field: F, result: ValidationResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                self.0.entry(field).or_insert(error);
                None
            }
        }
    }

    pub fn insert(&mut self, field: F, error: ValidationError) {
        self.0.insert(field, error);
    }

    pub fn clear(&mut self, field: F) {
        self.0.remove(&field);
    }

    pub fn get(&self, field: F) -> Option<&ValidationError> {
        self.0.get(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Display messages keyed by wire field name.
    pub fn messages(&self) -> BTreeMap<String, String> {
        self.0
            .iter()
            .map(|(field, error)| (field.as_ref().to_string(), error.to_string()))
            .collect()
    }
}

impl<F: Ord + Copy + AsRef<str>> Serialize for FieldErrors<F> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (field, error) in &self.0 {
            map.serialize_entry(field.as_ref(), &error.to_string())?;
        }
        map.end()
    }
}
