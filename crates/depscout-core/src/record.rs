use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Fields every dependency record must carry, in wire order.
pub const RECORD_FIELDS: [&str; 5] = [
    "target_file_path",
    "internal_deps",
    "external_deps",
    "type_of_file",
    "name",
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("expected a JSON object, found {0}")]
    NotAnObject(&'static str),

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("field '{0}' must not be empty")]
    EmptyField(&'static str),

    #[error("field '{field}' has the wrong shape: {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },
}

/// Structured dependency metadata extracted for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DependencyRecord {
    /// Path of the analyzed file, relative to the workspace root.
    pub target_file_path: String,
    /// Files inside the workspace this file depends on (relative paths).
    pub internal_deps: Vec<String>,
    /// External libraries or packages this file depends on.
    pub external_deps: Vec<String>,
    /// Architectural role of the file, e.g. Component, Service, Module.
    pub type_of_file: String,
    /// Name of the primary unit defined by the file.
    pub name: String,
}

impl DependencyRecord {
    /// Build a record from an arbitrary JSON value.
    ///
    /// All five fields must be present; unknown fields are ignored. String
    /// fields must be non-empty after trimming. Dependency lists may be empty
    /// but every element must be a string.
    pub fn from_value(value: &JsonValue) -> Result<Self, RecordError> {
        let object = value
            .as_object()
            .ok_or_else(|| RecordError::NotAnObject(json_kind(value)))?;

        let text = |field: &'static str| -> Result<String, RecordError> {
            match object.get(field) {
                None | Some(JsonValue::Null) => Err(RecordError::MissingField(field)),
                Some(JsonValue::String(s)) => Ok(s.clone()),
                Some(other) => Err(RecordError::InvalidField {
                    field,
                    message: format!("expected string, found {}", json_kind(other)),
                }),
            }
        };

        let list = |field: &'static str| -> Result<Vec<String>, RecordError> {
            match object.get(field) {
                None | Some(JsonValue::Null) => Err(RecordError::MissingField(field)),
                Some(JsonValue::Array(items)) => items
                    .iter()
                    .map(|item| match item {
                        JsonValue::String(s) => Ok(s.clone()),
                        other => Err(RecordError::InvalidField {
                            field,
                            message: format!("expected string items, found {}", json_kind(other)),
                        }),
                    })
                    .collect(),
                Some(other) => Err(RecordError::InvalidField {
                    field,
                    message: format!("expected array, found {}", json_kind(other)),
                }),
            }
        };

        let record = Self {
            target_file_path: text("target_file_path")?,
            internal_deps: list("internal_deps")?,
            external_deps: list("external_deps")?,
            type_of_file: text("type_of_file")?,
            name: text("name")?,
        };
        record.validate()?;
        Ok(record)
    }

    /// Decode and validate a record from JSON text.
    pub fn from_json(text: &str) -> crate::Result<Self> {
        let value: JsonValue = serde_json::from_str(text)?;
        Ok(Self::from_value(&value)?)
    }

    /// Check the non-emptiness invariants on the scalar fields.
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.target_file_path.trim().is_empty() {
            return Err(RecordError::EmptyField("target_file_path"));
        }
        if self.type_of_file.trim().is_empty() {
            return Err(RecordError::EmptyField("type_of_file"));
        }
        if self.name.trim().is_empty() {
            return Err(RecordError::EmptyField("name"));
        }
        Ok(())
    }

    /// JSON schema describing the wire contract, suitable for strict
    /// structured-output binding.
    pub fn output_schema() -> JsonValue {
        let mut schema =
            serde_json::to_value(schemars::schema_for!(DependencyRecord)).unwrap_or_default();
        if let Some(object) = schema.as_object_mut() {
            object.remove("$schema");
            object.insert("additionalProperties".to_string(), JsonValue::Bool(false));
        }
        schema
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> JsonValue {
        json!({
            "target_file_path": "src/app/app.module.ts",
            "internal_deps": ["src/app/app-routing.module.ts", "src/app/app.component.ts"],
            "external_deps": ["@angular/core", "@angular/platform-browser"],
            "type_of_file": "Module",
            "name": "AppModule"
        })
    }

    #[test]
    fn test_from_value_accepts_complete_record() {
        let record = DependencyRecord::from_value(&sample()).unwrap();
        assert_eq!(record.name, "AppModule");
        assert_eq!(
            record.internal_deps,
            vec!["src/app/app-routing.module.ts", "src/app/app.component.ts"]
        );
    }

    #[test]
    fn test_from_value_ignores_extra_fields() {
        let mut value = sample();
        value["confidence"] = json!(0.9);
        assert!(DependencyRecord::from_value(&value).is_ok());
    }

    #[test]
    fn test_duplicates_and_order_are_preserved() {
        let mut value = sample();
        value["internal_deps"] = json!(["b.ts", "a.ts", "b.ts"]);
        let record = DependencyRecord::from_value(&value).unwrap();
        assert_eq!(record.internal_deps, vec!["b.ts", "a.ts", "b.ts"]);
    }

    #[test]
    fn test_missing_field_is_rejected() {
        for field in RECORD_FIELDS {
            let mut value = sample();
            value.as_object_mut().unwrap().remove(field);
            assert_eq!(
                DependencyRecord::from_value(&value),
                Err(RecordError::MissingField(field)),
                "field {field}"
            );
        }
    }

    #[test]
    fn test_empty_scalar_is_rejected() {
        let mut value = sample();
        value["type_of_file"] = json!("   ");
        assert_eq!(
            DependencyRecord::from_value(&value),
            Err(RecordError::EmptyField("type_of_file"))
        );
    }

    #[test]
    fn test_empty_dependency_lists_are_allowed() {
        let mut value = sample();
        value["internal_deps"] = json!([]);
        value["external_deps"] = json!([]);
        assert!(DependencyRecord::from_value(&value).is_ok());
    }

    #[test]
    fn test_wrong_shapes_are_rejected() {
        let mut value = sample();
        value["external_deps"] = json!("rxjs");
        assert!(matches!(
            DependencyRecord::from_value(&value),
            Err(RecordError::InvalidField { field: "external_deps", .. })
        ));

        assert_eq!(
            DependencyRecord::from_value(&json!(["not", "an", "object"])),
            Err(RecordError::NotAnObject("array"))
        );
    }

    #[test]
    fn test_from_json_separates_syntax_and_validation_errors() {
        let record = DependencyRecord::from_json(&sample().to_string()).unwrap();
        assert_eq!(record.type_of_file, "Module");

        assert!(matches!(
            DependencyRecord::from_json("{\"name\": AppModule"),
            Err(crate::DepScoutError::Serialization(_))
        ));
        assert!(matches!(
            DependencyRecord::from_json("{\"name\": \"AppModule\"}"),
            Err(crate::DepScoutError::Validation(RecordError::MissingField(_)))
        ));
    }

    #[test]
    fn test_output_schema_is_closed_and_requires_all_fields() {
        let schema = DependencyRecord::output_schema();
        assert_eq!(schema["additionalProperties"], json!(false));
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        for field in RECORD_FIELDS {
            assert!(required.contains(&field), "{field} should be required");
        }
    }
}
