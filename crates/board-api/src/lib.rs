pub mod error;
pub mod messages;
pub mod state;

use axum::{Router, routing::get};

pub use error::ApiError;
pub use state::{AppState, AppStateInner};

/// All `/api` routes with state applied; the server adds HTTP layers on top.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/ping", get(messages::ping))
        .route(
            "/api/messages",
            get(messages::list_messages).post(messages::create_message),
        )
        .route(
            "/api/messages/{id}",
            get(messages::get_message)
                .put(messages::update_message)
                .delete(messages::delete_message),
        )
        .with_state(state)
}
