//! Storage abstractions for the service layer
//!
//! `KeyValueStore` holds one database in memory; `PersistentStore` ties it
//! to a JSON file on disk. Both speak the `KeyValue` interface.
//!
//! The registry only needs `load`, `save` and `delete` and hands out typed
//! `Storage` snapshots that the HTTP layer serializes itself. `merge_all`,
//! `PersistentStore::to_json`, `PersistentStore::into_memory` and
//! `KeyValueStore::save_to` are library API for code that embeds these
//! stores directly.

pub mod kv_store;
pub mod persistent_store;

use serde_json::{Map, Value};

pub use kv_store::{KeyValue, KeyValueStore};
pub use persistent_store::PersistentStore;

/// Raw content of one database: a JSON object.
pub type Storage = Map<String, Value>;

/// Union of the content of several stores. Later stores win on key collisions.
pub fn merge_all(stores: &[&dyn KeyValue]) -> Storage {
    let mut merged = Storage::new();
    for store in stores {
        for key in store.keys() {
            if let Some(value) = store.select(&key) {
                merged.insert(key, value.clone());
            }
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_all_unions_and_later_wins() {
        let mut a = KeyValueStore::new();
        a.append("x".into(), json!(1));
        a.append("shared".into(), json!("a"));
        let mut b = PersistentStore::new("unused.json");
        b.append("y".into(), json!([true]));
        b.append("shared".into(), json!("b"));

        let merged = merge_all(&[&a, &b]);
        assert_eq!(Value::Object(merged), json!({"x": 1, "y": [true], "shared": "b"}));
        assert!(merge_all(&[]).is_empty());
    }
}
