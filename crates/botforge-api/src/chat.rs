use axum::{
    Extension, Json,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::{debug, error};

use botforge_reply::ReferenceFile;
use botforge_types::Turn;
use botforge_types::api::{OkResponse, SendMessageRequest, SendMessageResponse};

use crate::conversation::ConversationStore;
use crate::error::ApiError;
use crate::middleware::{Identity, is_authorized};
use crate::{AppState, flash, pages};

pub async fn chat_page(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(identity): Extension<Identity>,
    session: Session,
) -> Response {
    let Some(user) = identity.0 else {
        flash::set(&session, "Please log in first.").await;
        return Redirect::to("/login").into_response();
    };

    let bot = match state.db.get_chatbot(&id) {
        Ok(Some(bot)) if is_authorized(&user, &bot) => bot,
        Ok(_) => {
            flash::set(&session, "That chatbot is not available.").await;
            return Redirect::to("/catalog").into_response();
        }
        Err(e) => {
            error!("Chatbot lookup failed: {:#}", e);
            flash::set(&session, "Something went wrong, please try again.").await;
            return Redirect::to("/catalog").into_response();
        }
    };

    let css = state.db.get_css_file(&bot.id).unwrap_or_else(|e| {
        error!("Css lookup failed: {:#}", e);
        None
    });

    let convo = ConversationStore::new(session.clone());
    let history = match convo.history(&bot.id).await {
        Ok(history) => history,
        Err(e) => {
            debug!("History read failed, showing empty chat: {}", e);
            Vec::new()
        }
    };

    pages::chat(
        &user,
        &bot,
        &history,
        css.as_ref().map(|c| c.content.as_str()),
        flash::take(&session).await.as_deref(),
    )
    .into_response()
}

/// One message turn: append the user turn, generate a reply (remote if
/// configured, echo fallback otherwise), append the assistant turn, and
/// hand both back.
pub async fn send_json(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(identity): Extension<Identity>,
    session: Session,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, ApiError> {
    let user = identity.0.ok_or(ApiError::Unauthorized)?;

    let bot = state.db.get_chatbot(&id)?.ok_or(ApiError::NotFound)?;
    if !is_authorized(&user, &bot) {
        return Err(ApiError::Forbidden);
    }

    let message = req.message.trim();
    if message.is_empty() {
        return Err(ApiError::EmptyMessage);
    }

    let convo = ConversationStore::new(session);
    let user_turn = Turn::user(message);
    convo.append(&bot.id, user_turn.clone()).await?;
    let history = convo.history(&bot.id).await?;

    let reference_files: Vec<ReferenceFile> = state
        .db
        .list_text_files(&bot.id)?
        .into_iter()
        .map(|f| ReferenceFile {
            filename: f.filename,
            content: f.content,
        })
        .collect();

    let reply = state
        .reply
        .generate(
            bot.system_prompt.as_deref(),
            &reference_files,
            &history,
            message,
        )
        .await;

    let bot_turn = Turn::assistant(reply);
    convo.append(&bot.id, bot_turn.clone()).await?;

    Ok(Json(SendMessageResponse {
        ok: true,
        user: user_turn,
        bot: bot_turn,
    }))
}

pub async fn reset(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(identity): Extension<Identity>,
    session: Session,
) -> Result<Json<OkResponse>, ApiError> {
    let user = identity.0.ok_or(ApiError::Unauthorized)?;

    let bot = state.db.get_chatbot(&id)?.ok_or(ApiError::NotFound)?;
    if !is_authorized(&user, &bot) {
        return Err(ApiError::Forbidden);
    }

    ConversationStore::new(session).reset(&bot.id).await?;
    Ok(Json(OkResponse::ok()))
}
