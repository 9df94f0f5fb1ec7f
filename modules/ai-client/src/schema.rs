use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Types that can be requested as a structured response from any provider.
///
/// Automatically implemented for any type that implements `JsonSchema + DeserializeOwned`.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    /// Generate a strict JSON schema for this type.
    ///
    /// Strict mode (OpenAI `json_schema`, Anthropic tool input) wants:
    /// 1. `additionalProperties: false` on all object schemas
    /// 2. ALL properties listed in `required`, even nullable ones
    /// 3. Fully inlined schemas (no `$ref` references)
    fn strict_schema() -> Value {
        let schema = schema_for!(Self);
        let mut value = serde_json::to_value(schema).unwrap_or_default();

        close_object_schemas(&mut value);
        inline_refs(&mut value);

        if let Value::Object(map) = &mut value {
            map.remove("definitions");
            map.remove("$schema");
        }

        value
    }

    fn schema_name() -> String {
        <Self as JsonSchema>::schema_name()
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

fn close_object_schemas(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if map.get("type") == Some(&Value::String("object".to_string())) {
                map.insert("additionalProperties".to_string(), Value::Bool(false));

                if let Some(Value::Object(props)) = map.get("properties") {
                    let all_keys: Vec<Value> =
                        props.keys().map(|k| Value::String(k.clone())).collect();
                    map.insert("required".to_string(), Value::Array(all_keys));
                }
            }

            for (_, v) in map.iter_mut() {
                close_object_schemas(v);
            }
        }
        Value::Array(arr) => {
            for item in arr.iter_mut() {
                close_object_schemas(item);
            }
        }
        _ => {}
    }
}

fn inline_refs(value: &mut Value) {
    let definitions = match value {
        Value::Object(map) => map.get("definitions").cloned(),
        _ => None,
    };

    if let Some(defs) = definitions {
        inline_refs_recursive(value, &defs);
    }
}

fn inline_refs_recursive(value: &mut Value, definitions: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(ref_path)) = map.get("$ref").cloned() {
                if let Some(type_name) = ref_path.strip_prefix("#/definitions/") {
                    if let Some(def) = definitions.get(type_name) {
                        *value = def.clone();
                        inline_refs_recursive(value, definitions);
                        return;
                    }
                }
            }

            // schemars wraps documented refs in a single-element allOf
            if let Some(Value::Array(all_of)) = map.get("allOf").cloned() {
                if let [only] = all_of.as_slice() {
                    *value = only.clone();
                    inline_refs_recursive(value, definitions);
                    return;
                }
            }

            for (_, v) in map.iter_mut() {
                inline_refs_recursive(v, definitions);
            }
        }
        Value::Array(arr) => {
            for item in arr.iter_mut() {
                inline_refs_recursive(item, definitions);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemars::JsonSchema;
    use serde::Deserialize;

    #[derive(Deserialize, JsonSchema)]
    struct SerpQuery {
        query: String,
        research_goal: String,
    }

    #[derive(Deserialize, JsonSchema)]
    struct SerpQueries {
        queries: Vec<SerpQuery>,
    }

    #[test]
    fn schema_is_an_object() {
        let schema = SerpQueries::strict_schema();
        assert!(schema.is_object());
        assert!(!schema.as_object().unwrap().contains_key("$schema"));
    }

    #[test]
    fn nullable_properties_are_still_required() {
        #[derive(Deserialize, JsonSchema)]
        struct Draft {
            title: Option<String>,
            report_markdown: String,
        }

        let schema = Draft::strict_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .expect("should have required array")
            .iter()
            .filter_map(|v| v.as_str())
            .collect();

        assert!(required.contains(&"title"));
        assert!(required.contains(&"report_markdown"));
        assert_eq!(schema["additionalProperties"], Value::Bool(false));
    }

    #[test]
    fn nested_items_are_inlined_and_closed() {
        let schema = SerpQueries::strict_schema();
        let obj = schema.as_object().unwrap();
        assert!(!obj.contains_key("definitions"));

        let items = &schema["properties"]["queries"]["items"];
        assert!(items.get("$ref").is_none());
        assert_eq!(items["type"], Value::String("object".to_string()));
        assert_eq!(items["additionalProperties"], Value::Bool(false));
    }
}
