// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 ACM S.L.

//! Generic repository adapter over the content store.
//!
//! One adapter instance serves one [`EntityKind`]. Mutations are driven by
//! lifecycle events: every operation builds a request event and answers with
//! a derived outcome event. Insert and update persist both to the entity's
//! append-only `_events/` log; delete persists only the deleted event, next
//! to its sentinel. Invalid requests are answered but never persisted, so a
//! rejected call leaves no trace in the repository.

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::{
    epoch_timestamp, Attributes, DomainEvent, Entity, EntityCodec, EntityKind, EventKind,
};
use crate::store::{ContentHost, ContentStore, EntityPaths, StoreError, StoreResult};

/// CRUD adapter binding one entity kind to the store.
pub struct EntityAdapter<'a, H> {
    store: &'a ContentStore<H>,
    kind: &'static EntityKind,
    codec: EntityCodec<'a, H>,
}

impl<'a, H: ContentHost> EntityAdapter<'a, H> {
    pub fn new(store: &'a ContentStore<H>, kind: &'static EntityKind) -> Self {
        Self {
            store,
            kind,
            codec: EntityCodec::new(store, kind),
        }
    }

    pub fn kind(&self) -> &'static EntityKind {
        self.kind
    }

    fn paths(&self) -> EntityPaths {
        self.kind.paths()
    }

    // ---- reads ---------------------------------------------------------

    /// Fetch one entity by id.
    ///
    /// Only absence of the record file (or an undecryptable record) reads as
    /// `None`; a record marked `_deleted` is returned as-is, deletion mark
    /// included, for the caller to interpret.
    pub async fn find_by_id(&self, id: &str) -> StoreResult<Option<Entity>> {
        let path = self.paths().record(id);
        let (content, _) = match self.store.get(&path).await {
            Ok(found) => found,
            Err(err) if err.is_absence() => return Ok(None),
            Err(err) => return Err(err),
        };
        Ok(Some(self.codec.decode_record(&content, &path)?))
    }

    /// Full decoded index for this kind, sealed values opened.
    ///
    /// Fails with [`StoreError::NotFound`] when the collection has never
    /// been written; empty-collection recovery belongs to the caller.
    pub async fn list(&self) -> StoreResult<Vec<Attributes>> {
        match self.read_index().await? {
            Some((entries, _)) => Ok(entries),
            None => Err(StoreError::NotFound(self.paths().index())),
        }
    }

    /// Entities whose index projection matches every given filter.
    ///
    /// A missing key is treated as null on both sides: an entry lacking a
    /// filter key matches only a null filter value, and a null filter value
    /// matches only entries where the key is null or absent.
    pub async fn find_by_attributes(&self, filters: &Attributes) -> StoreResult<Vec<Entity>> {
        let entries = match self.read_index().await? {
            Some((entries, _)) => entries,
            None => return Ok(Vec::new()),
        };
        let mut found = Vec::new();
        for entry in entries {
            if !matches_filters(&entry, filters) {
                continue;
            }
            let Some(id) = entry.get("id").and_then(Value::as_str) else {
                warn!(kind = self.kind.path, "index entry without id, skipping");
                continue;
            };
            if let Some(entity) = self.find_by_id(id).await? {
                found.push(entity);
            }
        }
        Ok(found)
    }

    /// First entity matching the kind's primary key, if any.
    pub async fn find_by_primary_key(&self, attributes: &Attributes) -> StoreResult<Option<Entity>> {
        let pk = self.primary_key_of(attributes);
        Ok(self.find_by_attributes(&pk).await?.into_iter().next())
    }

    // ---- mutations -----------------------------------------------------

    /// Insert a new entity from the given attributes.
    ///
    /// The index is read once; the duplicate-PK scan and the appended
    /// rewrite both run against that single read's version token, so a
    /// concurrent index commit in between surfaces as a
    /// [`StoreError::VersionConflict`] instead of a silent second entry.
    /// The index write precedes the record write.
    ///
    /// Answers `EntityCreated` on success, `EntityAlreadyExists` (pointing
    /// at the earlier entity) when the primary key is taken, and
    /// `InvalidNewEntityRequest` when a primary-key attribute is missing.
    pub async fn insert(&self, attributes: Attributes) -> StoreResult<DomainEvent> {
        let attributes = self.known_attributes(attributes);
        let request = DomainEvent::request(
            EventKind::NewEntityRequested,
            self.kind.singular,
            attributes.clone(),
        );

        if let Some(missing) = self.missing_primary_key(&attributes) {
            debug!(kind = self.kind.path, missing, "rejecting insert");
            return Ok(request.derive(EventKind::InvalidNewEntityRequest));
        }

        let pk = self.primary_key_of(&attributes);
        let index = self.read_index().await?;
        if let Some((entries, _)) = &index {
            if let Some(existing) = entries.iter().find(|entry| matches_filters(entry, &pk)) {
                let existing_id = existing
                    .get("id")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                let mut request = request;
                if let Some(id) = &existing_id {
                    request = request.with_entity_id(id.clone());
                }
                let outcome = request.derive(EventKind::EntityAlreadyExists);
                if let Some(id) = &existing_id {
                    self.append_event(id, &outcome).await?;
                }
                return Ok(outcome);
            }
        }

        let entity = Entity::new(attributes);
        let projection = self.codec.projection(&entity);
        let index_path = self.paths().index();
        let index_message = format!("index {} {}", self.kind.singular, entity.id);
        match index {
            Some((mut entries, token)) => {
                entries.push(projection);
                let content = self.codec.encode_index(&entries)?;
                self.store
                    .update(&index_path, &content, &index_message, &token)
                    .await?;
            }
            None => {
                let content = self.codec.encode_index(&[projection])?;
                self.store.create(&index_path, &content, &index_message).await?;
            }
        }

        let record = self.codec.encode_record(&entity)?;
        self.store
            .create(
                &self.paths().record(&entity.id),
                &record,
                &format!("create {} {}", self.kind.singular, entity.id),
            )
            .await?;

        let request = request.with_entity_id(entity.id.clone());
        let outcome = request.derive(EventKind::EntityCreated);
        self.append_event(&entity.id, &request).await?;
        self.append_event(&entity.id, &outcome).await?;
        Ok(outcome)
    }

    /// Apply a partial update to an existing entity.
    ///
    /// The target is located by id or, when no record exists under that id
    /// and the payload carries the full primary key, by primary key. Null
    /// and unknown attributes in the request are ignored; the index
    /// projection is not rewritten (projections carry immutable key
    /// attributes). Answers `InvalidUpdateEntityRequest` when no target is
    /// found or it is deleted.
    pub async fn update(&self, id: &str, attributes: Attributes) -> StoreResult<DomainEvent> {
        let attributes = self.known_attributes(attributes);
        let mut request = DomainEvent::request(
            EventKind::UpdateEntityRequested,
            self.kind.singular,
            attributes.clone(),
        )
        .with_entity_id(id);

        let mut path = self.paths().record(id);
        let (content, token) = match self.store.get(&path).await {
            Ok(found) => found,
            Err(err) if err.is_absence() => {
                match self.locate_by_payload_pk(&attributes).await? {
                    Some(target) => {
                        request = request
                            .with_entity_id(target.id.clone())
                            .with_primary_key(self.primary_key_of(&attributes));
                        path = self.paths().record(&target.id);
                        self.store.get(&path).await?
                    }
                    None => {
                        debug!(kind = self.kind.path, id, "rejecting update of absent entity");
                        return Ok(request.derive(EventKind::InvalidUpdateEntityRequest));
                    }
                }
            }
            Err(err) => return Err(err),
        };
        let mut entity = self.codec.decode_record(&content, &path)?;
        if entity.is_deleted() {
            return Ok(request.derive(EventKind::InvalidUpdateEntityRequest));
        }

        entity.apply_update(&attributes, Utc::now());
        let record = self.codec.encode_record(&entity)?;
        self.store
            .update(
                &path,
                &record,
                &format!("update {} {}", self.kind.singular, entity.id),
                &token,
            )
            .await?;

        let outcome = request.derive(EventKind::EntityUpdated);
        self.append_event(&entity.id, &request).await?;
        self.append_event(&entity.id, &outcome).await?;
        Ok(outcome)
    }

    /// Logically delete an entity by id.
    ///
    /// The record is stamped `_deleted` and kept, its projection leaves the
    /// index, and a `<kind>/<id>.deleted` sentinel is written. Answers
    /// `InvalidDeleteEntityRequest` when the entity is absent or already
    /// deleted.
    pub async fn delete(&self, id: &str) -> StoreResult<DomainEvent> {
        let request = DomainEvent::request(
            EventKind::DeleteEntityRequested,
            self.kind.singular,
            Attributes::new(),
        )
        .with_entity_id(id);
        self.delete_located(request, id).await
    }

    /// Logically delete the entity matching the kind's primary key.
    pub async fn delete_by_primary_key(&self, attributes: &Attributes) -> StoreResult<DomainEvent> {
        let pk = self.primary_key_of(attributes);
        let request = DomainEvent::request(
            EventKind::DeleteEntityRequested,
            self.kind.singular,
            Attributes::new(),
        )
        .with_primary_key(pk.clone());

        if self.missing_primary_key(&pk).is_some() {
            return Ok(request.derive(EventKind::InvalidDeleteEntityRequest));
        }
        match self.find_by_primary_key(attributes).await? {
            Some(target) => {
                let id = target.id.clone();
                self.delete_located(request.with_entity_id(id.clone()), &id).await
            }
            None => Ok(request.derive(EventKind::InvalidDeleteEntityRequest)),
        }
    }

    async fn delete_located(&self, request: DomainEvent, id: &str) -> StoreResult<DomainEvent> {
        let path = self.paths().record(id);
        let (content, token) = match self.store.get(&path).await {
            Ok(found) => found,
            Err(err) if err.is_absence() => {
                debug!(kind = self.kind.path, id, "rejecting delete of absent entity");
                return Ok(request.derive(EventKind::InvalidDeleteEntityRequest));
            }
            Err(err) => return Err(err),
        };
        let mut entity = self.codec.decode_record(&content, &path)?;
        if entity.is_deleted() {
            return Ok(request.derive(EventKind::InvalidDeleteEntityRequest));
        }

        entity.mark_deleted(Utc::now());
        let record = self.codec.encode_record(&entity)?;
        self.store
            .update(
                &path,
                &record,
                &format!("delete {} {id}", self.kind.singular),
                &token,
            )
            .await?;

        self.remove_from_index(id).await?;
        self.store
            .create(
                &self.paths().deleted_sentinel(id),
                "",
                &format!("mark {} {id} deleted", self.kind.singular),
            )
            .await?;

        let outcome = request.derive(EventKind::EntityDeleted);
        self.append_event(id, &outcome).await?;
        Ok(outcome)
    }

    // ---- internals -----------------------------------------------------

    /// Drop attributes the kind does not declare.
    fn known_attributes(&self, attributes: Attributes) -> Attributes {
        attributes
            .into_iter()
            .filter(|(name, _)| self.kind.attributes.contains(&name.as_str()))
            .collect()
    }

    /// First primary-key attribute that is missing or null, if any.
    fn missing_primary_key(&self, attributes: &Attributes) -> Option<&'static str> {
        self.kind
            .primary_key
            .iter()
            .copied()
            .find(|name| matches!(attributes.get(*name), None | Some(Value::Null)))
    }

    /// Primary-key subset of an attribute map.
    fn primary_key_of(&self, attributes: &Attributes) -> Attributes {
        let mut pk = Attributes::new();
        for &name in self.kind.primary_key {
            if let Some(value) = attributes.get(name) {
                pk.insert(name.to_string(), value.clone());
            }
        }
        pk
    }

    /// Resolve a payload's primary key to an entity, when the payload
    /// carries the full key. A partial key never widens into a lookup.
    async fn locate_by_payload_pk(&self, attributes: &Attributes) -> StoreResult<Option<Entity>> {
        if self.missing_primary_key(attributes).is_some() {
            return Ok(None);
        }
        self.find_by_primary_key(attributes).await
    }

    async fn read_index(&self) -> StoreResult<Option<(Vec<Attributes>, crate::store::VersionToken)>> {
        let path = self.paths().index();
        match self.store.get(&path).await {
            Ok((content, token)) => {
                let entries = self.codec.decode_index(&content, &path)?;
                Ok(Some((entries, token)))
            }
            Err(err) if err.is_absence() => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn remove_from_index(&self, id: &str) -> StoreResult<()> {
        let Some((mut entries, token)) = self.read_index().await? else {
            return Ok(());
        };
        let before = entries.len();
        entries.retain(|entry| entry.get("id").and_then(Value::as_str) != Some(id));
        if entries.len() == before {
            return Ok(());
        }
        let path = self.paths().index();
        let content = self.codec.encode_index(&entries)?;
        self.store
            .update(
                &path,
                &content,
                &format!("unindex {} {id}", self.kind.singular),
                &token,
            )
            .await?;
        Ok(())
    }

    /// Append one event to the entity's `_events/` log.
    async fn append_event(&self, id: &str, event: &DomainEvent) -> StoreResult<()> {
        let path = self.paths().event(
            id,
            &epoch_timestamp(event.occurred_at),
            &event.file_name(),
        );
        match self
            .store
            .create(&path, &event.to_json(), &format!("{} {}", event.file_name(), event.id))
            .await
        {
            Ok(_) => Ok(()),
            // Same-microsecond collision on the file name; the event is
            // informational, keep the operation's outcome.
            Err(StoreError::AlreadyExists(_)) => {
                warn!(path, "event file collision, skipping append");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}

/// Index matching with null widening on both sides: a missing key counts as
/// null, so `null == null` (and missing == null) matches, but a missing or
/// null entry value never matches a concrete filter value, and vice versa.
fn matches_filters(entry: &Attributes, filters: &Attributes) -> bool {
    filters
        .iter()
        .all(|(name, wanted)| entry.get(name).unwrap_or(&Value::Null) == wanted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::cipher::test_key;
    use crate::crypto::Cipher;
    use crate::repo::kinds;
    use crate::store::{MemoryHost, VersionToken};
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn store() -> ContentStore<MemoryHost> {
        ContentStore::new(MemoryHost::new(), Cipher::new(test_key()))
    }

    fn attrs(pairs: &[(&str, Value)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn client_attrs(email: &str) -> Attributes {
        attrs(&[
            ("email", json!(email)),
            ("address", json!("Calle Mayor 1")),
            ("contact", json!("Alex")),
            ("phone", json!("+34 600 000 000")),
        ])
    }

    #[tokio::test]
    async fn insert_then_find_by_id_returns_the_entity() {
        let store = store();
        let repo = EntityAdapter::new(&store, &kinds::CLIENTS);

        let created = repo.insert(client_attrs("a@b.com")).await.unwrap();
        assert_eq!(created.kind, EventKind::EntityCreated);
        let id = created.entity_id.clone().unwrap();

        let entity = repo.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(entity.attributes, created.attributes);
        assert!(entity.updated.is_none());
    }

    #[tokio::test]
    async fn created_event_chain_starts_at_the_request() {
        let store = store();
        let repo = EntityAdapter::new(&store, &kinds::CLIENTS);

        let created = repo.insert(client_attrs("a@b.com")).await.unwrap();
        // One ancestor: the request event.
        assert_eq!(created.previous_event_ids.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_primary_key_answers_already_exists() {
        let store = store();
        let repo = EntityAdapter::new(&store, &kinds::CLIENTS);

        let first = repo.insert(client_attrs("a@b.com")).await.unwrap();
        let second = repo.insert(client_attrs("a@b.com")).await.unwrap();

        assert_eq!(second.kind, EventKind::EntityAlreadyExists);
        assert_eq!(second.entity_id, first.entity_id);
        // The index still carries exactly one entry.
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn index_entries_read_back_as_plaintext() {
        let store = store();
        let repo = EntityAdapter::new(&store, &kinds::CLIENTS);

        repo.insert(client_attrs("a@b.com")).await.unwrap();

        // Sensitive index values are sealed at rest but open on read, so
        // lookups compare plaintext against plaintext.
        let entries = repo.list().await.unwrap();
        assert_eq!(entries[0]["email"], json!("a@b.com"));
    }

    #[tokio::test]
    async fn missing_primary_key_attribute_rejects_the_insert() {
        let store = store();
        let repo = EntityAdapter::new(&store, &kinds::CLIENTS);

        let outcome = repo
            .insert(attrs(&[("address", json!("nowhere"))]))
            .await
            .unwrap();

        assert_eq!(outcome.kind, EventKind::InvalidNewEntityRequest);
        assert!(store.host().paths().is_empty());
    }

    #[tokio::test]
    async fn unknown_attributes_are_dropped_on_insert() {
        let store = store();
        let repo = EntityAdapter::new(&store, &kinds::CLIENTS);

        let mut payload = client_attrs("a@b.com");
        payload.insert("shoe_size".to_string(), json!(43));
        let created = repo.insert(payload).await.unwrap();
        let id = created.entity_id.unwrap();

        let entity = repo.find_by_id(&id).await.unwrap().unwrap();
        assert!(entity.attribute("shoe_size").is_none());
    }

    #[tokio::test]
    async fn missing_index_key_matches_only_a_null_filter() {
        let store = store();
        let repo = EntityAdapter::new(&store, &kinds::LICENSES);

        let created = repo
            .insert(attrs(&[
                ("client_id", json!("c-1")),
                ("product_id", json!("p-1")),
                ("order_id", json!("o-1")),
            ]))
            .await
            .unwrap();
        let id = created.entity_id.unwrap();

        // Drop product_id from the stored projection to model an entry
        // written before that attribute joined the index.
        let path = kinds::LICENSES.paths().index();
        let (content, token) = store.get(&path).await.unwrap();
        let mut entries: Vec<Attributes> = serde_json::from_str(&content).unwrap();
        entries[0].remove("product_id");
        store
            .update(&path, &json!(entries).to_string(), "trim", &token)
            .await
            .unwrap();

        // Missing counts as null: a concrete filter value never matches it.
        let found = repo
            .find_by_attributes(&attrs(&[("product_id", json!("anything"))]))
            .await
            .unwrap();
        assert!(found.is_empty());

        // A null filter value matches the missing key.
        let found = repo
            .find_by_attributes(&attrs(&[("product_id", Value::Null)]))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, id);
    }

    #[tokio::test]
    async fn null_filter_does_not_match_concrete_values() {
        let store = store();
        let repo = EntityAdapter::new(&store, &kinds::CLIENTS);

        repo.insert(client_attrs("a@b.com")).await.unwrap();

        let found = repo
            .find_by_attributes(&attrs(&[("email", Value::Null)]))
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn update_merges_attributes_and_stamps_updated() {
        let store = store();
        let repo = EntityAdapter::new(&store, &kinds::CLIENTS);

        let created = repo.insert(client_attrs("a@b.com")).await.unwrap();
        let id = created.entity_id.unwrap();

        let outcome = repo
            .update(
                &id,
                attrs(&[("address", json!("Gran Via 2")), ("phone", Value::Null)]),
            )
            .await
            .unwrap();
        assert_eq!(outcome.kind, EventKind::EntityUpdated);

        let entity = repo.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(entity.attribute("address"), Some(&json!("Gran Via 2")));
        // Null request values never erase stored attributes.
        assert_eq!(entity.attribute("phone"), Some(&json!("+34 600 000 000")));
        assert!(entity.updated.is_some());
    }

    #[tokio::test]
    async fn update_leaves_index_projection_untouched() {
        let store = store();
        let repo = EntityAdapter::new(&store, &kinds::CLIENTS);

        let created = repo.insert(client_attrs("a@b.com")).await.unwrap();
        let id = created.entity_id.unwrap();

        let index_path = kinds::CLIENTS.paths().index();
        let (before, _) = store.get(&index_path).await.unwrap();

        repo.update(&id, attrs(&[("address", json!("Gran Via 2"))]))
            .await
            .unwrap();

        let (after, _) = store.get(&index_path).await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn update_of_absent_entity_leaves_no_trace() {
        let store = store();
        let repo = EntityAdapter::new(&store, &kinds::CLIENTS);

        let outcome = repo
            .update("no-such-id", attrs(&[("address", json!("x"))]))
            .await
            .unwrap();

        assert_eq!(outcome.kind, EventKind::InvalidUpdateEntityRequest);
        assert!(store.host().paths().is_empty());
    }

    #[tokio::test]
    async fn update_locates_the_target_by_primary_key() {
        let store = store();
        let repo = EntityAdapter::new(&store, &kinds::CLIENTS);

        let created = repo.insert(client_attrs("a@b.com")).await.unwrap();
        let id = created.entity_id.unwrap();

        // No record under the requested id, but the payload carries the
        // full primary key of an existing entity.
        let mut payload = client_attrs("a@b.com");
        payload.insert("address".to_string(), json!("Gran Via 2"));
        let outcome = repo.update("stale-or-unknown-id", payload).await.unwrap();

        assert_eq!(outcome.kind, EventKind::EntityUpdated);
        assert_eq!(outcome.entity_id.as_deref(), Some(id.as_str()));
        assert!(outcome.primary_key.is_some());

        let entity = repo.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(entity.attribute("address"), Some(&json!("Gran Via 2")));
    }

    #[tokio::test]
    async fn delete_removes_from_list_and_leaves_sentinel() {
        let store = store();
        let repo = EntityAdapter::new(&store, &kinds::CLIENTS);

        let created = repo.insert(client_attrs("a@b.com")).await.unwrap();
        let id = created.entity_id.unwrap();

        let outcome = repo.delete(&id).await.unwrap();
        assert_eq!(outcome.kind, EventKind::EntityDeleted);

        assert!(repo.list().await.unwrap().is_empty());
        assert!(store
            .host()
            .contains(&kinds::CLIENTS.paths().deleted_sentinel(&id)));
        // The record survives, stamped as deleted, and is still readable.
        let entity = repo.find_by_id(&id).await.unwrap().unwrap();
        assert!(entity.is_deleted());
        let deleted_event = store
            .host()
            .paths()
            .into_iter()
            .find(|p| p.contains("client_deleted"));
        assert!(deleted_event.is_some());
    }

    #[tokio::test]
    async fn double_delete_is_rejected() {
        let store = store();
        let repo = EntityAdapter::new(&store, &kinds::CLIENTS);

        let created = repo.insert(client_attrs("a@b.com")).await.unwrap();
        let id = created.entity_id.unwrap();

        repo.delete(&id).await.unwrap();
        let second = repo.delete(&id).await.unwrap();
        assert_eq!(second.kind, EventKind::InvalidDeleteEntityRequest);
    }

    #[tokio::test]
    async fn delete_by_primary_key_resolves_the_id() {
        let store = store();
        let repo = EntityAdapter::new(&store, &kinds::CLIENTS);

        let created = repo.insert(client_attrs("a@b.com")).await.unwrap();
        let id = created.entity_id.unwrap();

        let outcome = repo
            .delete_by_primary_key(&attrs(&[("email", json!("a@b.com"))]))
            .await
            .unwrap();

        assert_eq!(outcome.kind, EventKind::EntityDeleted);
        assert_eq!(outcome.entity_id.as_deref(), Some(id.as_str()));
        assert!(outcome.primary_key.is_some());
        assert!(store
            .host()
            .contains(&kinds::CLIENTS.paths().deleted_sentinel(&id)));
    }

    #[tokio::test]
    async fn find_by_attributes_filters_on_index_values() {
        let store = store();
        let repo = EntityAdapter::new(&store, &kinds::CLIENTS);

        repo.insert(client_attrs("a@b.com")).await.unwrap();
        repo.insert(client_attrs("c@d.com")).await.unwrap();

        let found = repo
            .find_by_attributes(&attrs(&[("email", json!("c@d.com"))]))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].attribute("email"), Some(&json!("c@d.com")));
    }

    #[tokio::test]
    async fn list_requires_an_existing_index() {
        let store = store();
        let repo = EntityAdapter::new(&store, &kinds::CLIENTS);

        let result = repo.list().await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn event_log_records_the_lifecycle() {
        let store = store();
        let repo = EntityAdapter::new(&store, &kinds::CLIENTS);

        let created = repo.insert(client_attrs("a@b.com")).await.unwrap();
        let id = created.entity_id.unwrap();
        repo.update(&id, attrs(&[("address", json!("x"))]))
            .await
            .unwrap();

        let events: Vec<String> = store
            .host()
            .paths()
            .into_iter()
            .filter(|p| p.contains("/_events/"))
            .collect();
        assert!(events.iter().any(|p| p.contains("new_client_requested")));
        assert!(events.iter().any(|p| p.contains("new_client_created")));
        assert!(events.iter().any(|p| p.contains("update_client_requested")));
        assert!(events.iter().any(|p| p.contains("client_updated")));
    }

    /// Host that lands a rival commit on one contested path right after the
    /// next read of it, so the reader's version token is stale by the time
    /// it writes.
    struct RacingHost {
        inner: MemoryHost,
        contested: &'static str,
        armed: AtomicBool,
    }

    impl RacingHost {
        fn new(contested: &'static str) -> Self {
            Self {
                inner: MemoryHost::new(),
                contested,
                armed: AtomicBool::new(false),
            }
        }
    }

    impl ContentHost for RacingHost {
        async fn get_raw(&self, path: &str) -> StoreResult<(Vec<u8>, VersionToken)> {
            let (content, token) = self.inner.get_raw(path).await?;
            if path == self.contested && self.armed.swap(false, Ordering::SeqCst) {
                self.inner
                    .update_raw(path, &content, "rival commit", &token)
                    .await?;
            }
            Ok((content, token))
        }

        async fn create_raw(
            &self,
            path: &str,
            content: &[u8],
            message: &str,
        ) -> StoreResult<VersionToken> {
            self.inner.create_raw(path, content, message).await
        }

        async fn update_raw(
            &self,
            path: &str,
            content: &[u8],
            message: &str,
            expected: &VersionToken,
        ) -> StoreResult<VersionToken> {
            self.inner.update_raw(path, content, message, expected).await
        }

        async fn delete_raw(
            &self,
            path: &str,
            message: &str,
            expected: &VersionToken,
        ) -> StoreResult<()> {
            self.inner.delete_raw(path, message, expected).await
        }
    }

    #[tokio::test]
    async fn concurrent_index_commit_fails_the_insert_with_a_conflict() {
        let store = ContentStore::new(RacingHost::new("clients/data.json"), Cipher::new(test_key()));
        let repo = EntityAdapter::new(&store, &kinds::CLIENTS);

        repo.insert(client_attrs("a@b.com")).await.unwrap();

        // A rival index commit lands between this insert's single index read
        // and its conditional rewrite.
        store.host().armed.store(true, Ordering::SeqCst);
        let result = repo.insert(client_attrs("b@c.com")).await;
        assert!(matches!(result, Err(StoreError::VersionConflict { .. })));

        // Nothing was half-written: the index still holds one entry and no
        // second record file exists.
        assert_eq!(repo.list().await.unwrap().len(), 1);
        let records = store
            .host()
            .inner
            .paths()
            .into_iter()
            .filter(|p| p.ends_with("/data.json") && p != "clients/data.json")
            .count();
        assert_eq!(records, 1);
    }
}
