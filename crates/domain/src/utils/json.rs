//! JSON helpers

use serde_json::Value;

/// Shallow object merge: top-level keys of `patch` overwrite `base`.
///
/// If either side is not an object, `base` is replaced by `patch`.
pub fn merge_objects(base: &mut Value, patch: &Value) {
    match (base.as_object_mut(), patch.as_object()) {
        (Some(base), Some(patch)) => {
            for (key, value) in patch {
                base.insert(key.clone(), value.clone());
            }
        }
        _ => *base = patch.clone(),
    }
}
