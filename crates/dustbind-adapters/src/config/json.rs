use std::sync::{Arc, RwLock};

use serde_json::{Map, Value};

use dustbind_core::application::ports::ConfigStore;

/// Configuration held as a JSON tree and addressed by dotted key paths.
///
/// `get("engines.dust")` returns the whole subtree; `set` creates
/// intermediate objects as needed. Clones share the same tree.
#[derive(Debug, Clone, Default)]
pub struct JsonConfig {
    root: Arc<RwLock<Value>>,
}

impl JsonConfig {
    pub fn new(root: Value) -> Self {
        Self {
            root: Arc::new(RwLock::new(root)),
        }
    }

    /// Store `value` at `key_path`, replacing non-object intermediates.
    pub fn set(&self, key_path: &str, value: Value) {
        let mut root = self.root.write().unwrap_or_else(|e| e.into_inner());
        let mut current = &mut *root;
        for segment in key_path.split('.') {
            if !current.is_object() {
                *current = Value::Object(Map::new());
            }
            let Value::Object(map) = current else {
                return;
            };
            current = map.entry(segment).or_insert(Value::Null);
        }
        *current = value;
    }
}

impl ConfigStore for JsonConfig {
    fn get(&self, key_path: &str) -> Option<Value> {
        let root = self.root.read().unwrap_or_else(|e| e.into_inner());
        key_path
            .split('.')
            .try_fold(&*root, |node, segment| node.get(segment))
            .filter(|value| !value.is_null())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dotted_paths_reach_nested_values() {
        let config = JsonConfig::new(json!({
            "engines": { "dust": { "cache": false } },
            "paths": { "public": "public" }
        }));

        assert_eq!(config.get("engines.dust"), Some(json!({ "cache": false })));
        assert_eq!(config.get("engines.dust.cache"), Some(json!(false)));
        assert_eq!(config.get("paths.public"), Some(json!("public")));
        assert_eq!(config.get("engines.handlebars"), None);
    }

    #[test]
    fn set_builds_intermediate_objects() {
        let config = JsonConfig::default();
        config.set("engines.dust.clientRender.enabled", json!(true));
        config.set("engines.dust.whitespace", json!(false));

        assert_eq!(
            config.get("engines.dust"),
            Some(json!({ "clientRender": { "enabled": true }, "whitespace": false }))
        );
    }
}
