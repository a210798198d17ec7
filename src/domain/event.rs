// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 ACM S.L.

//! Lifecycle events and their causal chain.
//!
//! Every repository operation is requested by an event and answered by an
//! event. A derived event's `previous_event_ids` is the parent's chain plus
//! the parent's own id, so the full causal history survives into the
//! append-only event log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entity::Attributes;

/// Lifecycle transitions recognized by the adapter.
///
/// Insert: `Requested -> Created | AlreadyExists | InvalidRequest`.
/// Update: `Requested -> Updated | InvalidRequest`.
/// Delete: `Requested -> Deleted | InvalidRequest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    NewEntityRequested,
    EntityCreated,
    EntityAlreadyExists,
    InvalidNewEntityRequest,
    UpdateEntityRequested,
    EntityUpdated,
    InvalidUpdateEntityRequest,
    DeleteEntityRequested,
    EntityDeleted,
    InvalidDeleteEntityRequest,
}

impl EventKind {
    /// Event-log file name for this kind, e.g. `new_client_requested`.
    pub fn file_name(&self, singular: &str) -> String {
        match self {
            Self::NewEntityRequested => format!("new_{singular}_requested"),
            Self::EntityCreated => format!("new_{singular}_created"),
            Self::EntityAlreadyExists => format!("{singular}_already_exists"),
            Self::InvalidNewEntityRequest => format!("invalid_new_{singular}_request"),
            Self::UpdateEntityRequested => format!("update_{singular}_requested"),
            Self::EntityUpdated => format!("{singular}_updated"),
            Self::InvalidUpdateEntityRequest => format!("invalid_update_{singular}_request"),
            Self::DeleteEntityRequested => format!("delete_{singular}_requested"),
            Self::EntityDeleted => format!("{singular}_deleted"),
            Self::InvalidDeleteEntityRequest => format!("invalid_delete_{singular}_request"),
        }
    }

    /// Whether this kind rejects the request that caused it.
    pub fn is_invalid_request(&self) -> bool {
        matches!(
            self,
            Self::InvalidNewEntityRequest
                | Self::InvalidUpdateEntityRequest
                | Self::InvalidDeleteEntityRequest
        )
    }
}

/// One lifecycle event, either inbound (a request) or an outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    pub id: String,
    pub kind: EventKind,
    /// Singular entity-kind name (`client`).
    pub entity_kind: String,
    /// Target entity id, when known.
    pub entity_id: Option<String>,
    /// Target primary key, for requests addressing an entity by PK.
    pub primary_key: Option<Attributes>,
    /// Attribute payload carried by the event.
    pub attributes: Attributes,
    /// Causal chain: ids of every ancestor event, oldest first.
    pub previous_event_ids: Vec<String>,
    pub occurred_at: DateTime<Utc>,
}

impl DomainEvent {
    /// Start a fresh chain with a request event.
    pub fn request(kind: EventKind, entity_kind: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            entity_kind: entity_kind.into(),
            entity_id: None,
            primary_key: None,
            attributes,
            previous_event_ids: Vec::new(),
            occurred_at: Utc::now(),
        }
    }

    pub fn with_entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn with_primary_key(mut self, primary_key: Attributes) -> Self {
        self.primary_key = Some(primary_key);
        self
    }

    /// Derive an outcome event from this one, carrying the chain forward.
    ///
    /// The chain is never reset: the derived event's `previous_event_ids` is
    /// this event's chain plus this event's id.
    pub fn derive(&self, kind: EventKind) -> Self {
        let mut chain = self.previous_event_ids.clone();
        chain.push(self.id.clone());
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            entity_kind: self.entity_kind.clone(),
            entity_id: self.entity_id.clone(),
            primary_key: self.primary_key.clone(),
            attributes: self.attributes.clone(),
            previous_event_ids: chain,
            occurred_at: Utc::now(),
        }
    }

    /// File name this event gets in the `_events/` log.
    pub fn file_name(&self) -> String {
        self.kind.file_name(&self.entity_kind)
    }

    pub fn to_json(&self) -> String {
        // DomainEvent has no map keys that can fail to serialize.
        serde_json::to_string(self).expect("event serialization is infallible")
    }
}

/// Wall-clock timestamp as a `seconds.microseconds` decimal string.
///
/// Lexical comparison of these strings resolves ordering ties down to
/// microsecond granularity; concurrent writers within the same microsecond
/// may still collide, which the event log tolerates.
pub fn epoch_timestamp(now: DateTime<Utc>) -> String {
    format!("{}.{:06}", now.timestamp(), now.timestamp_subsec_micros())
}
