use std::sync::Arc;

use axum::{
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{handler::*, AppState};

pub fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health_checker_handler))
        .route("/todo/:id/createTodo", post(create_todo))
        .route("/todo/:id/getTodos", get(get_todos))
        .route("/todo/:id/updateTodo", put(update_todo))
        .route("/todo/:id/deleteTodo", delete(delete_todo))
        .route("/todo/:id/moveTodo", put(move_todo))
        .route("/user/userRegistration", post(user_registration))
        .route("/user/userLogin", post(user_login))
        .fallback(not_found)
        .with_state(app_state)
}

/// Router plus the CORS and request tracing layers used when serving
pub fn create_app(app_state: Arc<AppState>, cors_origin: &str) -> Router {
    let cors = match cors_origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new().allow_origin(origin),
        Err(_) => {
            tracing::warn!(origin = cors_origin, "ignoring unparseable CORS origin");
            CorsLayer::new()
        }
    }
    .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
    .allow_headers([ACCEPT, CONTENT_TYPE]);

    create_router(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
