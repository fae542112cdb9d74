use serde_json::{Map, Value};

/// Builds an RFC 7386 merge patch that turns `original` into `modified`.
pub fn create_merge_patch(original: &Value, modified: &Value) -> Value {
    match (original, modified) {
        (Value::Object(original), Value::Object(modified)) => {
            let mut patch = Map::new();

            for (key, original_value) in original {
                match modified.get(key) {
                    None => {
                        patch.insert(key.to_owned(), Value::Null);
                    }
                    Some(modified_value) if modified_value != original_value => {
                        patch.insert(
                            key.to_owned(),
                            create_merge_patch(original_value, modified_value),
                        );
                    }
                    Some(_) => {}
                }
            }

            for (key, modified_value) in modified {
                if !original.contains_key(key) {
                    patch.insert(key.to_owned(), modified_value.clone());
                }
            }

            Value::Object(patch)
        }
        _ => modified.clone(),
    }
}

pub fn is_empty_patch(patch: &Value) -> bool {
    matches!(patch, Value::Object(map) if map.is_empty())
}
