#![forbid(unsafe_code)]

//! Configuration for [`FormStore`](crate::store::FormStore).

use serde_json::{Map, Value};

/// Behaviour switches for the in-memory form store.
#[derive(Debug, Clone, PartialEq)]
pub struct FormConfig {
    /// Value tree the form starts from and resets back to.
    pub initial_values: Value,
    /// Run an array's validator after structural edits that request it.
    pub validate_on_array_change: bool,
    /// Run an array's validator after point writes inside the array.
    pub validate_on_value_change: bool,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            initial_values: Value::Object(Map::new()),
            validate_on_array_change: true,
            validate_on_value_change: false,
        }
    }
}

impl FormConfig {
    /// Set the initial value tree.
    #[must_use]
    pub fn with_initial_values(mut self, values: Value) -> Self {
        self.initial_values = values;
        self
    }

    /// Toggle validation after structural array edits.
    #[must_use]
    pub fn with_validate_on_array_change(mut self, enabled: bool) -> Self {
        self.validate_on_array_change = enabled;
        self
    }

    /// Toggle validation after point writes inside an array.
    #[must_use]
    pub fn with_validate_on_value_change(mut self, enabled: bool) -> Self {
        self.validate_on_value_change = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults() {
        let config = FormConfig::default();
        assert_eq!(config.initial_values, json!({}));
        assert!(config.validate_on_array_change);
        assert!(!config.validate_on_value_change);
    }

    #[test]
    fn builders_chain() {
        let config = FormConfig::default()
            .with_initial_values(json!({ "items": [1] }))
            .with_validate_on_array_change(false)
            .with_validate_on_value_change(true);
        assert_eq!(config.initial_values, json!({ "items": [1] }));
        assert!(!config.validate_on_array_change);
        assert!(config.validate_on_value_change);
    }
}
