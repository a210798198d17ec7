// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 ACM S.L.

//! Conversion between entities and their stored JSON forms.
//!
//! Two shapes exist on the wire: the full record (`<kind>/<id>/data.json`,
//! every attribute plus `id` and lifecycle timestamps) and the index
//! projection (primary-key and filter attributes plus `id`). Sensitive
//! attribute values are sealed field-level in both, independently of the
//! whole-file encryption the store client applies.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::Error as _;
use serde_json::Value;

use super::entity::{Attributes, Entity, EntityKind};
use crate::store::{ContentHost, ContentStore, StoreError, StoreResult};

/// Timestamp format used for `_created`, `_updated` and `_deleted`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Codec for one entity kind over one store.
pub struct EntityCodec<'a, H> {
    store: &'a ContentStore<H>,
    kind: &'static EntityKind,
}

impl<'a, H: ContentHost> EntityCodec<'a, H> {
    pub fn new(store: &'a ContentStore<H>, kind: &'static EntityKind) -> Self {
        Self { store, kind }
    }

    /// Serialize the full record JSON for an entity.
    pub fn encode_record(&self, entity: &Entity) -> StoreResult<String> {
        let mut record = serde_json::Map::new();
        for &name in self.kind.attributes {
            let value = entity.attributes.get(name).cloned().unwrap_or(Value::Null);
            record.insert(name.to_string(), self.seal(name, value)?);
        }
        record.insert("id".to_string(), Value::String(entity.id.clone()));
        record.insert(
            "_created".to_string(),
            Value::String(format_timestamp(entity.created)),
        );
        if let Some(updated) = entity.updated {
            record.insert("_updated".to_string(), Value::String(format_timestamp(updated)));
        }
        if let Some(deleted) = entity.deleted {
            record.insert("_deleted".to_string(), Value::String(format_timestamp(deleted)));
        }
        Ok(Value::Object(record).to_string())
    }

    /// Parse a stored record back into an entity.
    pub fn decode_record(&self, content: &str, path: &str) -> StoreResult<Entity> {
        let record: serde_json::Map<String, Value> =
            serde_json::from_str(content).map_err(|source| StoreError::Decode {
                path: path.to_string(),
                source,
            })?;

        let id = record
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| decode_error(path, "record has no id"))?
            .to_string();
        let created = self.timestamp_field(&record, "_created", path)?.ok_or_else(
            || decode_error(path, "record has no _created timestamp"),
        )?;
        let updated = self.timestamp_field(&record, "_updated", path)?;
        let deleted = self.timestamp_field(&record, "_deleted", path)?;

        let mut attributes = Attributes::new();
        for &name in self.kind.attributes {
            if let Some(value) = record.get(name) {
                attributes.insert(name.to_string(), self.open(name, value.clone()));
            }
        }

        Ok(Entity {
            id,
            attributes,
            created,
            updated,
            deleted,
        })
    }

    /// Lightweight index projection for an entity: PK + filter attributes
    /// plus the id, in plaintext. Sealing happens exactly once, in
    /// [`encode_index`](Self::encode_index), mirroring the single open in
    /// [`decode_index`](Self::decode_index).
    pub fn projection(&self, entity: &Entity) -> Attributes {
        let mut entry = Attributes::new();
        for name in self.kind.projection_attributes() {
            entry.insert(
                name.to_string(),
                entity.attributes.get(name).cloned().unwrap_or(Value::Null),
            );
        }
        entry.insert("id".to_string(), Value::String(entity.id.clone()));
        entry
    }

    /// Parse the collection index, opening sealed values so callers can
    /// match against plaintext filters.
    pub fn decode_index(&self, content: &str, path: &str) -> StoreResult<Vec<Attributes>> {
        let entries: Vec<Attributes> =
            serde_json::from_str(content).map_err(|source| StoreError::Decode {
                path: path.to_string(),
                source,
            })?;

        Ok(entries
            .into_iter()
            .map(|entry| {
                entry
                    .into_iter()
                    .map(|(name, value)| {
                        let opened = self.open(&name, value);
                        (name, opened)
                    })
                    .collect()
            })
            .collect())
    }

    /// Serialize index entries, resealing sensitive values. Sealing is
    /// deterministic, so unchanged entries re-serialize byte-identically.
    pub fn encode_index(&self, entries: &[Attributes]) -> StoreResult<String> {
        let mut sealed = Vec::with_capacity(entries.len());
        for entry in entries {
            let mut out = Attributes::new();
            for (name, value) in entry {
                out.insert(name.clone(), self.seal(name, value.clone())?);
            }
            sealed.push(Value::Object(out));
        }
        Ok(Value::Array(sealed).to_string())
    }

    /// Seal one attribute value if the kind marks it sensitive.
    ///
    /// Only string values are sealed; nulls and non-strings pass through
    /// (there is nothing secret about a null and the sensitive sets only
    /// contain string-typed attributes).
    fn seal(&self, name: &str, value: Value) -> StoreResult<Value> {
        match value {
            Value::String(text) if self.kind.is_sensitive(name) => {
                Ok(Value::String(self.store.seal_value(&text)?))
            }
            other => Ok(other),
        }
    }

    fn open(&self, name: &str, value: Value) -> Value {
        match value {
            Value::String(text) if self.kind.is_sensitive(name) => {
                Value::String(self.store.open_value(&text))
            }
            other => other,
        }
    }

    fn timestamp_field(
        &self,
        record: &serde_json::Map<String, Value>,
        field: &str,
        path: &str,
    ) -> StoreResult<Option<DateTime<Utc>>> {
        match record.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(text)) => parse_timestamp(text)
                .map(Some)
                .map_err(|_| decode_error(path, &format!("invalid {field} timestamp: {text}"))),
            Some(_) => Err(decode_error(path, &format!("{field} is not a string"))),
        }
    }
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT).map(|naive| naive.and_utc())
}

fn decode_error(path: &str, message: &str) -> StoreError {
    StoreError::Decode {
        path: path.to_string(),
        source: serde_json::Error::custom(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::cipher::test_key;
    use crate::crypto::Cipher;
    use crate::store::MemoryHost;
    use serde_json::json;

    static CLIENTS: EntityKind = EntityKind {
        path: "clients",
        singular: "client",
        primary_key: &["email"],
        filter_attributes: &["email"],
        attributes: &["email", "address", "contact", "phone"],
        sensitive_attributes: &["email", "phone"],
    };

    fn store() -> ContentStore<MemoryHost> {
        ContentStore::new(MemoryHost::new(), Cipher::new(test_key()))
    }

    fn client_entity() -> Entity {
        let mut attrs = Attributes::new();
        attrs.insert("email".to_string(), json!("a@b.com"));
        attrs.insert("address".to_string(), json!("X"));
        attrs.insert("contact".to_string(), json!("Y"));
        attrs.insert("phone".to_string(), json!("1"));
        Entity::new(attrs)
    }

    #[test]
    fn record_round_trips_through_the_codec() {
        let store = store();
        let codec = EntityCodec::new(&store, &CLIENTS);
        let entity = client_entity();

        let json = codec.encode_record(&entity).unwrap();
        let decoded = codec.decode_record(&json, "clients/x/data.json").unwrap();

        assert_eq!(decoded.id, entity.id);
        assert_eq!(decoded.attributes, entity.attributes);
        // Second precision only in the stored format.
        assert_eq!(
            format_timestamp(decoded.created),
            format_timestamp(entity.created)
        );
        assert!(decoded.deleted.is_none());
    }

    #[test]
    fn sensitive_attributes_are_sealed_in_the_record() {
        let store = store();
        let codec = EntityCodec::new(&store, &CLIENTS);
        let entity = client_entity();

        let json = codec.encode_record(&entity).unwrap();
        let raw: serde_json::Map<String, Value> = serde_json::from_str(&json).unwrap();

        assert_ne!(raw["email"], json!("a@b.com"));
        assert_ne!(raw["phone"], json!("1"));
        // Non-sensitive attributes stay readable.
        assert_eq!(raw["address"], json!("X"));
        assert_eq!(raw["contact"], json!("Y"));
    }

    #[test]
    fn projection_carries_pk_filters_and_id_in_plaintext() {
        let store = store();
        let codec = EntityCodec::new(&store, &CLIENTS);
        let entity = client_entity();

        let entry = codec.projection(&entity);
        assert_eq!(entry.len(), 2); // email + id
        assert_eq!(entry["id"], json!(entity.id));
        // Plaintext here; encode_index owns the sealing.
        assert_eq!(entry["email"], json!("a@b.com"));
    }

    #[test]
    fn index_seals_exactly_once_per_round_trip() {
        let store = store();
        let codec = EntityCodec::new(&store, &CLIENTS);
        let entity = client_entity();

        let entry = codec.projection(&entity);
        let encoded = codec.encode_index(&[entry.clone()]).unwrap();

        // At rest the sensitive value is sealed.
        let raw: Vec<Attributes> = serde_json::from_str(&encoded).unwrap();
        assert_ne!(raw[0]["email"], json!("a@b.com"));

        // One decode recovers the plaintext projection.
        let decoded = codec.decode_index(&encoded, "clients/data.json").unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0], entry);

        // Decode-then-encode is stable: sealing is deterministic and never
        // stacks a second layer.
        assert_eq!(codec.encode_index(&decoded).unwrap(), encoded);
    }

    #[test]
    fn deleted_marker_survives_the_round_trip() {
        let store = store();
        let codec = EntityCodec::new(&store, &CLIENTS);
        let mut entity = client_entity();
        entity.mark_deleted(Utc::now());

        let json = codec.encode_record(&entity).unwrap();
        let decoded = codec.decode_record(&json, "clients/x/data.json").unwrap();
        assert!(decoded.is_deleted());
    }

    #[test]
    fn record_without_id_is_a_decode_error() {
        let store = store();
        let codec = EntityCodec::new(&store, &CLIENTS);
        let result = codec.decode_record(r#"{"email":"a@b.com"}"#, "clients/x/data.json");
        assert!(matches!(result, Err(StoreError::Decode { .. })));
    }

    #[test]
    fn timestamp_format_matches_the_stored_layout() {
        let ts = parse_timestamp("2026-08-28 12:34:56").unwrap();
        assert_eq!(format_timestamp(ts), "2026-08-28 12:34:56");
    }
}
