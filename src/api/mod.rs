mod handlers;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::status::StatusEngine;

pub fn create_router(engine: StatusEngine) -> Router {
    let api = Router::new()
        // Projects
        .route("/projects", get(handlers::list_projects))
        .route("/projects", post(handlers::create_project))
        .route("/projects/{id}", get(handlers::get_project))
        .route("/projects/{id}", delete(handlers::delete_project))
        .route("/projects/{id}/features", get(handlers::list_project_features))
        // Features
        .route("/features", post(handlers::create_feature))
        .route("/features/{id}", get(handlers::get_feature))
        .route("/features/{id}", delete(handlers::delete_feature))
        .route("/features/{id}/tasks", get(handlers::list_feature_tasks))
        // Tasks
        .route("/tasks", post(handlers::create_task))
        .route("/tasks/{id}", get(handlers::get_task))
        .route("/tasks/{id}", delete(handlers::delete_task))
        .route("/tasks/{id}/dependencies", get(handlers::list_task_dependencies))
        // Dependencies
        .route("/dependencies", post(handlers::add_dependency))
        // Verification
        .route("/entities/{id}/verification", put(handlers::set_verification))
        .route("/entities/{id}/verification", get(handlers::get_verification))
        // Status transitions
        .route("/entities/{id}/status", post(handlers::transition_status))
        .route("/entities/{id}/status", get(handlers::get_status))
        // Health
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(engine)
}
