// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 ACM S.L.

use axum::{
    routing::get,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::state::AppState;
use crate::store::ContentHost;

pub mod entities;
pub mod health;

pub fn router<H: ContentHost + 'static>(state: AppState<H>) -> Router {
    let v1_routes = Router::new()
        .route(
            "/{kind}",
            get(entities::list_entities::<H>).post(entities::create_entity::<H>),
        )
        .route(
            "/{kind}/{id}",
            get(entities::get_entity::<H>)
                .patch(entities::update_entity::<H>)
                .delete(entities::delete_entity::<H>),
        )
        .with_state(state);

    Router::new()
        .nest("/v1", v1_routes)
        .route("/health", get(health::health))
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        entities::list_entities,
        entities::create_entity,
        entities::get_entity,
        entities::update_entity,
        entities::delete_entity,
        health::health
    ),
    components(schemas(health::HealthResponse)),
    tags(
        (name = "Entities", description = "CRUD over license-management collections"),
        (name = "Health", description = "Service liveness")
    )
)]
struct ApiDoc;
