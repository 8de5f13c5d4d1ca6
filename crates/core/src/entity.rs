//! Entities are partial JSON records: whatever fields the API returned.

use serde_json::{Map, Value};

use crate::EntityId;

/// A (possibly partial) entity record keyed by field name.
pub type Entity = Map<String, Value>;

/// Returns the identifier stored under `"id"`, if any.
pub fn entity_id(entity: &Entity) -> Option<EntityId> {
    entity.get("id").and_then(EntityId::from_value)
}

/// Whether the entity carries an identifier (i.e. it already exists remotely).
pub fn has_id(entity: Option<&Entity>) -> bool {
    entity.and_then(entity_id).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entity(v: Value) -> Entity {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn missing_item_has_no_id() {
        assert!(!has_id(None));
    }

    #[test]
    fn item_without_id_field_has_no_id() {
        let e = entity(json!({"name": "Alice"}));
        assert!(!has_id(Some(&e)));
    }

    #[test]
    fn item_with_null_id_has_no_id() {
        let e = entity(json!({"id": null, "name": "Alice"}));
        assert!(!has_id(Some(&e)));
    }

    #[test]
    fn item_with_id_is_detected() {
        let e = entity(json!({"id": 7, "name": "Alice"}));
        assert_eq!(entity_id(&e), Some(EntityId::Number(7)));
        assert!(has_id(Some(&e)));
    }
}
