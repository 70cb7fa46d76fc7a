pub mod health;

use axum::{
    routing::{delete, get, patch, post},
    Router,
};

use crate::state::AppState;
use crate::wizard::handlers;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Wizard sessions
        .route("/api/v1/wizard/sessions", post(handlers::handle_start_session))
        .route(
            "/api/v1/wizard/sessions/:id",
            get(handlers::handle_get_session).delete(handlers::handle_delete_session),
        )
        .route(
            "/api/v1/wizard/sessions/:id/fields",
            patch(handlers::handle_edit_field),
        )
        .route(
            "/api/v1/wizard/sessions/:id/groups/:group",
            post(handlers::handle_append_entry),
        )
        .route(
            "/api/v1/wizard/sessions/:id/groups/:group/:entry_id",
            delete(handlers::handle_remove_entry),
        )
        .route("/api/v1/wizard/sessions/:id/next", post(handlers::handle_next))
        .route("/api/v1/wizard/sessions/:id/back", post(handlers::handle_back))
        .route(
            "/api/v1/wizard/sessions/:id/submit",
            post(handlers::handle_submit),
        )
        // Stored résumés
        .route("/api/v1/resumes", get(handlers::handle_list_resumes))
        .route("/api/v1/resumes/:id", delete(handlers::handle_delete_resume))
        .route("/api/v1/resumes/:id/pdf", get(handlers::handle_download_pdf))
        .with_state(state)
}
