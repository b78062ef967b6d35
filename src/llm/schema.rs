//! The strict JSON contract the LLM's response must satisfy (spec §4.F
//! item 7 / §6.4).

use once_cell::sync::Lazy;
use serde_json::{Value, json};

pub static GROUPS_RESPONSE_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "Generated Groups Response",
        "type": "object",
        "properties": {
            "groups": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "items": {
                            "type": "array",
                            "minItems": 4,
                            "maxItems": 4,
                            "items": {
                                "type": "object",
                                "properties": {
                                    "title": { "type": "string", "minLength": 1 },
                                    "year": { "type": ["integer", "null"] }
                                },
                                "required": ["title"]
                            }
                        },
                        "connection": { "type": "string", "minLength": 1 },
                        "connectionType": { "type": "string", "minLength": 1 },
                        "explanation": { "type": "string" }
                    },
                    "required": ["items", "connection", "connectionType"]
                }
            }
        },
        "required": ["groups"]
    })
});

/// Validates `instance` against `GROUPS_RESPONSE_SCHEMA`, returning the
/// validator's error messages when it doesn't conform.
pub fn validate_groups_response(instance: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::validator_for(&GROUPS_RESPONSE_SCHEMA)
        .expect("GROUPS_RESPONSE_SCHEMA is a valid static schema");
    let errors: Vec<String> = validator
        .iter_errors(instance)
        .map(|e| format!("{e} at {}", e.instance_path))
        .collect();
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_a_well_formed_response() {
        let instance = json!({
            "groups": [{
                "items": [
                    {"title": "A", "year": 2000},
                    {"title": "B", "year": null},
                    {"title": "C"},
                    {"title": "D", "year": 1999}
                ],
                "connection": "test connection",
                "connectionType": "thematic",
                "explanation": "why"
            }]
        });
        assert!(validate_groups_response(&instance).is_ok());
    }

    #[test]
    fn rejects_a_group_with_three_items() {
        let instance = json!({
            "groups": [{
                "items": [{"title": "A"}, {"title": "B"}, {"title": "C"}],
                "connection": "test",
                "connectionType": "thematic"
            }]
        });
        assert!(validate_groups_response(&instance).is_err());
    }
}
