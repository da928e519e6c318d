pub mod auth;
pub mod chat;
pub mod chatbots;
pub mod conversation;
pub mod error;
pub mod flash;
pub mod middleware;
pub mod pages;
pub mod uploads;

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

use botforge_db::Database;
use botforge_reply::ReplyGenerator;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub reply: ReplyGenerator,
}

/// The full route surface with identity resolution applied. The caller
/// wraps this in a session layer (and whatever tracing/middleware the
/// deployment wants).
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(chatbots::home))
        .route("/register", get(auth::register_form).post(auth::register))
        .route("/login", get(auth::login_form).post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/catalog", get(chatbots::catalog))
        .route("/profile", get(chatbots::profile))
        .route("/chatbot/new", get(chatbots::new_form).post(chatbots::create))
        .route(
            "/chatbot/{id}/edit",
            get(chatbots::edit_form).post(chatbots::update),
        )
        .route("/chatbot/{id}/delete", post(chatbots::delete))
        .route(
            "/chatbot/{id}/textfile/{fid}/delete",
            post(chatbots::delete_text_file),
        )
        .route("/chatbot/{id}/cssfile/delete", post(chatbots::delete_css_file))
        .route("/cb/{id}", get(chat::chat_page))
        .route("/cb/{id}/send_json", post(chat::send_json))
        .route("/cb/{id}/reset", post(chat::reset))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::resolve_identity,
        ))
        .with_state(state)
}
