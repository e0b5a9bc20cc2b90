//! Pre-validation fix-up for the YAML 1.1 `on` ambiguity.
//!
//! YAML 1.1 parsers read the bare word `on` as boolean `true`, so the trigger
//! field of a workflow can arrive keyed by `true` instead of `"on"`. The
//! validator would then report the trigger as missing.

use crate::model::fields;
use serde_yaml::{Mapping, Value};

/// Re-key a boolean `true` root key to the literal trigger field name.
///
/// Key order is preserved. If the document already has a literal `on` key,
/// the boolean key's value replaces it in the literal's position and the
/// boolean key is dropped. Non-mapping documents pass through.
pub fn normalize(document: Value) -> Value {
    let Value::Mapping(mut root) = document else {
        return document;
    };
    let boolean_key = Value::Bool(true);
    if !root.contains_key(&boolean_key) {
        return Value::Mapping(root);
    }

    if root.contains_key(fields::ON) {
        tracing::debug!("boolean trigger key overrides literal `on`");
        if let Some(value) = root.shift_remove(&boolean_key) {
            root.insert(Value::String(fields::ON.to_string()), value);
        }
        return Value::Mapping(root);
    }
    let mut out = Mapping::with_capacity(root.len());
    for (key, value) in root {
        if key == boolean_key {
            out.insert(Value::String(fields::ON.to_string()), value);
        } else {
            out.insert(key, value);
        }
    }
    Value::Mapping(out)
}
