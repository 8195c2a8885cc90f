pub mod rest;

use axum::{
    Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{any, get},
};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use std::sync::Arc;

use rest::ApiState;

/// Full HTTP surface: liveness root plus the REST API under `/rest`.
pub fn router(state: Arc<ApiState>) -> Router {
    let rest_router = Router::new()
        .route("/", get(root))
        .route("/notes", get(rest::list_notes).post(rest::create_note))
        .route("/notes/search", get(rest::search_notes))
        .route("/notes/count", get(rest::count_notes))
        .route(
            "/notes/{id}",
            get(rest::get_one_note)
                .put(rest::update_note)
                .delete(rest::delete_note),
        )
        .merge(
            SwaggerUi::new("/swagger-ui")
                .config(utoipa_swagger_ui::Config::new([
                    "/rest/api-doc/openapi.json",
                ]))
                .url("/api-doc/openapi.json", rest::ApiDoc::openapi()),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    Router::new()
        .route("/", any(root))
        .nest("/rest", rest_router)
}

async fn root() -> Response {
    (StatusCode::OK, "Hello world!").into_response()
}
