//! Layer merging for lane configuration
//!
//! - Tables merge key by key
//! - Lists replace (the asset list in a repo file is the whole list)
//! - Scalars override
//! - `null` in an overlay leaves the base value alone

use serde_json::Value;

/// Merge `overlay` onto `base`
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

/// Fold layers lowest precedence first
pub fn merge_layers(layers: Vec<Value>) -> Value {
    layers.into_iter().fold(Value::Null, |acc, layer| match acc {
        Value::Null => layer,
        acc => deep_merge(acc, layer),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_table_merge_keeps_untouched_keys() {
        let base = json!({"build": {"entry": "main.py", "icon": "assets/icon.ico"}});
        let overlay = json!({"build": {"entry": "app.py"}});

        let merged = deep_merge(base, overlay);
        assert_eq!(merged["build"]["entry"], "app.py");
        assert_eq!(merged["build"]["icon"], "assets/icon.ico");
    }

    #[test]
    fn test_asset_list_is_replaced() {
        let base = json!({"build": {"assets": ["assets", "core", "interface", "utils"]}});
        let overlay = json!({"build": {"assets": ["resources"]}});

        let merged = deep_merge(base, overlay);
        assert_eq!(merged["build"]["assets"], json!(["resources"]));
    }

    #[test]
    fn test_null_does_not_erase() {
        let merged = deep_merge(json!({"product": "Product"}), json!({"product": null}));
        assert_eq!(merged["product"], "Product");
    }

    #[test]
    fn test_layers_in_precedence_order() {
        let builtin = json!({"product": "Product", "vcs": {"remote": "origin"}});
        let repo = json!({"product": "DigTool", "vcs": {"remote": "upstream"}});
        let cli = json!({"vcs": {"remote": "mirror"}});

        let merged = merge_layers(vec![builtin, repo, cli]);
        assert_eq!(merged["product"], "DigTool");
        assert_eq!(merged["vcs"]["remote"], "mirror");
    }
}
