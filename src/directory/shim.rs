//! Compatibility shim for the directory API's schema drift.
//!
//! The remote renamed its object-type discriminator over the years
//! (`objectType`, then `type`, then `object`, now `category`) and started
//! rejecting `users` text searches without a pagination block. [`transform`]
//! rewrites any outbound payload to the currently accepted schema so the rest
//! of the crate can be written against one schema version. The client applies
//! it exactly once per outbound POST.

use serde_json::{json, Map, Value};

/// Pagination block injected into `users` text searches that omit one.
pub const DEFAULT_PAGE_START: u64 = 0;
pub const DEFAULT_PAGE_SIZE: u64 = 25;

/// Legacy spellings of the `category` field, in promotion priority order.
const LEGACY_CATEGORY_KEYS: [&str; 3] = ["objectType", "type", "object"];

/// Returns a rewritten deep copy of `payload`; the original is untouched.
///
/// Rules, applied recursively to every object:
/// - the first legacy key present is renamed to `category`, unless a
///   `category` key already exists (pre-existing `category` always wins and
///   the remaining legacy keys are left alone);
/// - a user text search (`params.by == "text"`, `params.category == "user"`)
///   with a missing or null `pagination` gets the default block injected.
pub fn transform(payload: &Value) -> Value {
    let mut copy = payload.clone();
    rewrite(&mut copy);
    copy
}

fn rewrite(value: &mut Value) {
    match value {
        Value::Object(map) => {
            promote_category(map);
            for child in map.values_mut() {
                rewrite(child);
            }
            // Children first, so legacy keys inside `params` count as rewritten.
            if needs_default_pagination(map) {
                map.insert(
                    "pagination".to_string(),
                    json!({"startFrom": DEFAULT_PAGE_START, "perPage": DEFAULT_PAGE_SIZE}),
                );
            }
        }
        Value::Array(items) => {
            for item in items {
                rewrite(item);
            }
        }
        _ => {}
    }
}

fn promote_category(map: &mut Map<String, Value>) {
    for legacy in LEGACY_CATEGORY_KEYS {
        if map.contains_key("category") {
            return;
        }
        if let Some(v) = map.remove(legacy) {
            map.insert("category".to_string(), v);
        }
    }
}

fn needs_default_pagination(map: &Map<String, Value>) -> bool {
    let Some(params) = map.get("params").and_then(Value::as_object) else {
        return false;
    };
    let is_user_text_search = params.get("by").and_then(Value::as_str) == Some("text")
        && params.get("category").and_then(Value::as_str) == Some("user");
    is_user_text_search && map.get("pagination").map_or(true, Value::is_null)
}
