//! Field-level validation errors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Validation failures keyed by field name, serialized as
/// `{"field": ["message", ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a single failing field.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Merge only the fields of `other` that have no errors here yet.
    pub fn merge_new_fields(&mut self, other: ValidationErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_insert(messages);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn messages(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    /// `Ok(())` when nothing was recorded, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields: Vec<&str> = self.0.keys().map(String::as_str).collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

pub fn required(field: &str) -> String {
    format!("The {field} field is required.")
}

pub fn taken(field: &str) -> String {
    format!("The {field} has already been taken.")
}

pub fn invalid_selection(field: &str) -> String {
    format!("The selected {field} is invalid.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_messages_per_field() {
        let mut errors = ValidationErrors::new();
        assert!(errors.is_empty());

        errors.add("title", "first");
        errors.add("title", "second");
        errors.add("content", "third");

        assert_eq!(errors.messages("title"), ["first", "second"]);
        assert_eq!(errors.messages("content"), ["third"]);
        assert!(errors.messages("status").is_empty());
        assert!(errors.clone().into_result().is_err());
    }

    #[test]
    fn test_merge_new_fields_keeps_existing_messages() {
        let mut errors = ValidationErrors::single("tag_ids", "must be an array");
        let mut later = ValidationErrors::single("tag_ids", required("tag_ids"));
        later.add("title", required("title"));

        errors.merge_new_fields(later);

        assert_eq!(errors.messages("tag_ids"), ["must be an array"]);
        assert_eq!(errors.messages("title"), ["The title field is required."]);
    }

    #[test]
    fn test_serializes_as_field_map() {
        let mut errors = ValidationErrors::single("tag_ids", required("tag_ids"));
        errors.add("title", taken("title"));

        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "tag_ids": ["The tag_ids field is required."],
                "title": ["The title has already been taken."],
            })
        );
    }
}
