// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 ACM S.L.

//! Entity representation and per-kind metadata.

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::store::EntityPaths;

/// Attribute map of one entity: plain structured data, keyed by attribute
/// name. `Null` and "absent" are equivalent throughout the filter logic.
pub type Attributes = serde_json::Map<String, Value>;

/// Static metadata describing one entity kind.
///
/// Resolved at compile time per kind (see `repo::kinds`); the repository
/// adapter is parameterized by a reference to one of these instead of
/// per-call metadata arguments.
#[derive(Debug)]
pub struct EntityKind {
    /// Collection path segment in the repository (`clients`).
    pub path: &'static str,
    /// Singular name used in event-file names (`client`).
    pub singular: &'static str,
    /// Ordered attribute subset establishing business uniqueness.
    pub primary_key: &'static [&'static str],
    /// Additional lookup keys carried in the collection index.
    pub filter_attributes: &'static [&'static str],
    /// Full attribute set.
    pub attributes: &'static [&'static str],
    /// Attributes encrypted before persistence.
    pub sensitive_attributes: &'static [&'static str],
}

impl EntityKind {
    pub fn paths(&self) -> EntityPaths {
        EntityPaths::new(self.path)
    }

    pub fn is_sensitive(&self, attribute: &str) -> bool {
        self.sensitive_attributes.contains(&attribute)
    }

    /// Attribute names carried in an index projection: primary key first,
    /// then the remaining filter attributes.
    pub fn projection_attributes(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.primary_key.to_vec();
        for attr in self.filter_attributes {
            if !names.contains(attr) {
                names.push(attr);
            }
        }
        names
    }
}

/// One domain record: generated id, attribute map, lifecycle timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: String,
    pub attributes: Attributes,
    pub created: DateTime<Utc>,
    pub updated: Option<DateTime<Utc>>,
    pub deleted: Option<DateTime<Utc>>,
}

impl Entity {
    /// Create a fresh entity with a generated UUID and `_created` set to now.
    pub fn new(attributes: Attributes) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            attributes,
            created: Utc::now(),
            updated: None,
            deleted: None,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted.is_some()
    }

    /// Merge non-null requested attributes over the stored ones and stamp
    /// `_updated`. Null (or absent) request values leave the stored value
    /// untouched, so partial updates never erase attributes.
    pub fn apply_update(&mut self, updates: &Attributes, now: DateTime<Utc>) {
        for (name, value) in updates {
            if !value.is_null() {
                self.attributes.insert(name.clone(), value.clone());
            }
        }
        self.updated = Some(now);
    }

    /// Domain-level deletion: the record is kept, marked with `_deleted`.
    pub fn mark_deleted(&mut self, now: DateTime<Utc>) {
        self.deleted = Some(now);
    }
}
