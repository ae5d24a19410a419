//! # Drift Detection
//!
//! Decides whether a declared payload is already reflected in the observed remote value.
//!
//! Declared payloads only carry the fields the user set, while Keycloak returns
//! every field with server defaults. A payload is "in sync" when it is a JSON
//! subset of the observed value: every non-null declared field is present and
//! equal. Arrays must have the same length and each declared element must match
//! some observed element (Keycloak does not preserve order for URI lists).

use serde::Serialize;
use serde_json::Value;

/// True when `desired` is contained in `observed`
pub fn is_subset(desired: &Value, observed: &Value) -> bool {
    match (desired, observed) {
        (Value::Null, _) => true,
        (Value::Object(want), Value::Object(have)) => want
            .iter()
            .filter(|(_, v)| !v.is_null())
            .all(|(k, v)| have.get(k).is_some_and(|h| is_subset(v, h))),
        (Value::Array(want), Value::Array(have)) => {
            want.len() == have.len() && want.iter().all(|w| have.iter().any(|h| is_subset(w, h)))
        }
        (want, have) => want == have,
    }
}

/// True when `desired` carries a change that `observed` does not reflect
///
/// A value that cannot be serialized is always reported as drifted.
pub fn differs<T: Serialize + ?Sized>(desired: &T, observed: &T) -> bool {
    match (serde_json::to_value(desired), serde_json::to_value(observed)) {
        (Ok(desired), Ok(observed)) => !is_subset(&desired, &observed),
        _ => true,
    }
}
