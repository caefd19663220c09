//! Tool input schema reduction.

use serde_json::{Map, Value};

/// Keep `type`, `title`, `description`, `properties` (recursively), `required`
/// and `enum`; drop everything else.
pub fn convert_input_schema(schema: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();

    for key in ["type", "title", "description"] {
        match schema.get(key) {
            Some(Value::String(s)) if s.is_empty() => {}
            Some(Value::Null) | None => {}
            Some(value) => {
                out.insert(key.to_string(), value.clone());
            }
        }
    }

    if let Some(Value::Object(properties)) = schema.get("properties") {
        if !properties.is_empty() {
            let converted = properties
                .iter()
                .map(|(name, property)| {
                    let property = match property {
                        Value::Object(p) => convert_input_schema(p),
                        _ => Map::new(),
                    };
                    (name.clone(), Value::Object(property))
                })
                .collect();
            out.insert("properties".to_string(), Value::Object(converted));
        }
    }

    for key in ["required", "enum"] {
        if let Some(Value::Array(items)) = schema.get(key) {
            if !items.is_empty() {
                out.insert(key.to_string(), Value::Array(items.clone()));
            }
        }
    }

    out
}
