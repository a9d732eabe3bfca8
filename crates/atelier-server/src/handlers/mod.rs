//! Route handlers, grouped by surface.
//!
//! Each module maps one URL prefix: [`meta`] for the unauthenticated
//! service routes, [`auth`] for sessions, [`admin`] and [`client`] for the
//! role-scoped surfaces, [`tasks`] for assigned work and timers. Handlers
//! guard their own roles and do their row shaping inside
//! [`crate::state::AppState::with_conn`] closures, so each request touches
//! the pool exactly once.

use serde::Serialize;
use serde_json::Value;

use crate::errors::ApiError;

pub mod admin;
pub mod auth;
pub mod client;
pub mod meta;
pub mod tasks;

/// Serialize `base` and attach extra fields to the resulting object.
///
/// Listing routes use this to decorate a row with derived data (counters,
/// joined summaries) without defining a one-off response struct per shape.
pub(crate) fn object_with<T: Serialize>(
    base: &T,
    extra: Vec<(&'static str, Value)>,
) -> Result<Value, ApiError> {
    let mut value = serde_json::to_value(base)?;
    if let Some(fields) = value.as_object_mut() {
        for (key, field) in extra {
            let _ = fields.insert(key.to_owned(), field);
        }
    }
    Ok(value)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Serialize)]
    struct Row {
        id: &'static str,
        name: &'static str,
    }

    #[test]
    fn object_with_attaches_fields() {
        let row = Row {
            id: "p-1",
            name: "Redesign",
        };
        let value = object_with(&row, vec![("tickets_count", json!(3))]).unwrap();
        assert_eq!(value["id"], "p-1");
        assert_eq!(value["name"], "Redesign");
        assert_eq!(value["tickets_count"], 3);
    }

    #[test]
    fn object_with_keeps_non_objects_unchanged() {
        let value = object_with(&"plain", vec![("ignored", json!(1))]).unwrap();
        assert_eq!(value, json!("plain"));
    }
}
