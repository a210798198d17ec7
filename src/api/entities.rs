// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 ACM S.L.

//! Generic CRUD handlers shared by every entity collection.
//!
//! The collection is addressed by its path segment (`/v1/clients`,
//! `/v1/licenses`, ...); an unknown segment is a 404. Request and response
//! bodies are plain attribute maps, with `id`, `_created` and `_updated`
//! added on the way out.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

use crate::domain::codec::format_timestamp;
use crate::domain::{Attributes, Entity, EventKind};
use crate::error::ApiError;
use crate::repo::{EntityAdapter, EntityRepo};
use crate::state::AppState;
use crate::store::{ContentHost, StoreError};

fn adapter<'a, H: ContentHost>(
    state: &'a AppState<H>,
    kind_path: &str,
) -> Result<EntityAdapter<'a, H>, ApiError> {
    EntityRepo::new(&state.store)
        .for_path(kind_path)
        .ok_or_else(|| ApiError::not_found(format!("unknown collection: {kind_path}")))
}

/// Response shape for one entity: its attributes plus `id` and the
/// lifecycle timestamps.
fn entity_body(entity: &Entity) -> Value {
    let mut body = entity.attributes.clone();
    body.insert("id".to_string(), Value::String(entity.id.clone()));
    body.insert(
        "_created".to_string(),
        Value::String(format_timestamp(entity.created)),
    );
    if let Some(updated) = entity.updated {
        body.insert(
            "_updated".to_string(),
            Value::String(format_timestamp(updated)),
        );
    }
    Value::Object(body)
}

#[utoipa::path(
    get,
    path = "/v1/{kind}",
    params(("kind" = String, Path, description = "Collection name, e.g. clients")),
    tag = "Entities",
    responses(
        (status = 200, description = "Index projections of all live entities"),
        (status = 404, description = "Unknown collection")
    )
)]
pub async fn list_entities<H: ContentHost>(
    Path(kind): Path<String>,
    State(state): State<AppState<H>>,
) -> Result<Json<Vec<Attributes>>, ApiError> {
    let adapter = adapter(&state, &kind)?;
    // A collection nobody has written to yet has no index file; to HTTP
    // clients that is simply an empty collection.
    match adapter.list().await {
        Ok(entries) => Ok(Json(entries)),
        Err(StoreError::NotFound(_)) => Ok(Json(Vec::new())),
        Err(err) => Err(err.into()),
    }
}

#[utoipa::path(
    post,
    path = "/v1/{kind}",
    params(("kind" = String, Path, description = "Collection name")),
    request_body = Object,
    tag = "Entities",
    responses(
        (status = 201, description = "Entity created"),
        (status = 400, description = "Missing primary-key attribute"),
        (status = 409, description = "Primary key already taken")
    )
)]
pub async fn create_entity<H: ContentHost>(
    Path(kind): Path<String>,
    State(state): State<AppState<H>>,
    Json(attributes): Json<Attributes>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let adapter = adapter(&state, &kind)?;
    let outcome = adapter.insert(attributes).await?;
    match outcome.kind {
        EventKind::EntityCreated => {
            let id = outcome
                .entity_id
                .as_deref()
                .ok_or_else(|| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal error"))?;
            let entity = adapter
                .find_by_id(id)
                .await?
                .ok_or_else(|| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal error"))?;
            Ok((StatusCode::CREATED, Json(entity_body(&entity))))
        }
        EventKind::EntityAlreadyExists => Err(ApiError::conflict(format!(
            "{} already exists with id {}",
            adapter.kind().singular,
            outcome.entity_id.as_deref().unwrap_or("?"),
        ))),
        _ => Err(ApiError::bad_request(format!(
            "missing primary-key attribute; required: {}",
            adapter.kind().primary_key.join(", "),
        ))),
    }
}

#[utoipa::path(
    get,
    path = "/v1/{kind}/{id}",
    params(
        ("kind" = String, Path, description = "Collection name"),
        ("id" = String, Path, description = "Entity id")
    ),
    tag = "Entities",
    responses(
        (status = 200, description = "The entity"),
        (status = 404, description = "Unknown collection or entity")
    )
)]
pub async fn get_entity<H: ContentHost>(
    Path((kind, id)): Path<(String, String)>,
    State(state): State<AppState<H>>,
) -> Result<Json<Value>, ApiError> {
    let adapter = adapter(&state, &kind)?;
    let entity = adapter
        .find_by_id(&id)
        .await?
        .filter(|entity| !entity.is_deleted())
        .ok_or_else(|| ApiError::not_found(format!("no {} with id {id}", adapter.kind().singular)))?;
    Ok(Json(entity_body(&entity)))
}

#[utoipa::path(
    patch,
    path = "/v1/{kind}/{id}",
    params(
        ("kind" = String, Path, description = "Collection name"),
        ("id" = String, Path, description = "Entity id")
    ),
    request_body = Object,
    tag = "Entities",
    responses(
        (status = 200, description = "Updated entity"),
        (status = 404, description = "Unknown collection or entity"),
        (status = 409, description = "Concurrent modification")
    )
)]
pub async fn update_entity<H: ContentHost>(
    Path((kind, id)): Path<(String, String)>,
    State(state): State<AppState<H>>,
    Json(attributes): Json<Attributes>,
) -> Result<Json<Value>, ApiError> {
    let adapter = adapter(&state, &kind)?;
    let outcome = adapter.update(&id, attributes).await?;
    if outcome.kind.is_invalid_request() {
        return Err(ApiError::not_found(format!(
            "no {} with id {id}",
            adapter.kind().singular
        )));
    }
    // The repository may have located the target by primary key under a
    // different id than the one in the URL.
    let target = outcome.entity_id.as_deref().unwrap_or(&id);
    let entity = adapter
        .find_by_id(target)
        .await?
        .ok_or_else(|| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal error"))?;
    Ok(Json(entity_body(&entity)))
}

#[utoipa::path(
    delete,
    path = "/v1/{kind}/{id}",
    params(
        ("kind" = String, Path, description = "Collection name"),
        ("id" = String, Path, description = "Entity id")
    ),
    tag = "Entities",
    responses(
        (status = 204, description = "Entity deleted"),
        (status = 404, description = "Unknown collection or entity"),
        (status = 409, description = "Concurrent modification")
    )
)]
pub async fn delete_entity<H: ContentHost>(
    Path((kind, id)): Path<(String, String)>,
    State(state): State<AppState<H>>,
) -> Result<StatusCode, ApiError> {
    let adapter = adapter(&state, &kind)?;
    let outcome = adapter.delete(&id).await?;
    if outcome.kind.is_invalid_request() {
        return Err(ApiError::not_found(format!(
            "no {} with id {id}",
            adapter.kind().singular
        )));
    }
    Ok(StatusCode::NO_CONTENT)
}
