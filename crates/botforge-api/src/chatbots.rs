use axum::{
    Extension,
    extract::{Multipart, Path, State},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::error;

use botforge_db::models::{ChatbotRow, UserRow};

use crate::middleware::{Identity, is_owner};
use crate::uploads::read_chatbot_form;
use crate::{AppState, flash, pages};

/// HTML routes report authentication problems as a redirect to the login
/// page, with a flash explaining why.
async fn require_user(identity: Identity, session: &Session) -> Result<UserRow, Response> {
    match identity.0 {
        Some(user) => Ok(user),
        None => {
            flash::set(session, "Please log in first.").await;
            Err(Redirect::to("/login").into_response())
        }
    }
}

/// Owner-only lookup for the management routes. Missing and foreign
/// chatbots get the same answer so ids cannot be probed.
async fn require_owned(
    state: &AppState,
    session: &Session,
    user: &UserRow,
    id: &str,
) -> Result<ChatbotRow, Response> {
    match state.db.get_chatbot(id) {
        Ok(Some(bot)) if is_owner(user, &bot) => Ok(bot),
        Ok(_) => {
            flash::set(session, "That chatbot is not available.").await;
            Err(Redirect::to("/catalog").into_response())
        }
        Err(e) => {
            error!("Chatbot lookup failed: {:#}", e);
            flash::set(session, "Something went wrong, please try again.").await;
            Err(Redirect::to("/catalog").into_response())
        }
    }
}

pub async fn home(Extension(identity): Extension<Identity>, session: Session) -> Response {
    let user = match require_user(identity, &session).await {
        Ok(user) => user,
        Err(redirect) => return redirect,
    };
    pages::home(&user, flash::take(&session).await.as_deref()).into_response()
}

pub async fn catalog(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    session: Session,
) -> Response {
    let user = match require_user(identity, &session).await {
        Ok(user) => user,
        Err(redirect) => return redirect,
    };

    let listed = if user.is_admin() {
        state.db.list_all_chatbots()
    } else {
        state.db.list_chatbots_for_user(&user.id)
    };

    let chatbots = match listed {
        Ok(chatbots) => chatbots,
        Err(e) => {
            error!("Catalog listing failed: {:#}", e);
            flash::set(&session, "Something went wrong, please try again.").await;
            Vec::new()
        }
    };

    pages::catalog(&user, &chatbots, flash::take(&session).await.as_deref()).into_response()
}

pub async fn profile(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    session: Session,
) -> Response {
    let user = match require_user(identity, &session).await {
        Ok(user) => user,
        Err(redirect) => return redirect,
    };

    let count = state.db.count_chatbots_for_user(&user.id).unwrap_or_else(|e| {
        error!("Chatbot count failed: {:#}", e);
        0
    });

    pages::profile(&user, count, flash::take(&session).await.as_deref()).into_response()
}

pub async fn new_form(Extension(identity): Extension<Identity>, session: Session) -> Response {
    let user = match require_user(identity, &session).await {
        Ok(user) => user,
        Err(redirect) => return redirect,
    };
    pages::chatbot_form(
        &user,
        flash::take(&session).await.as_deref(),
        "New chatbot",
        "/chatbot/new",
        None,
        &[],
        None,
    )
    .into_response()
}

pub async fn create(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    session: Session,
    multipart: Multipart,
) -> Response {
    let user = match require_user(identity, &session).await {
        Ok(user) => user,
        Err(redirect) => return redirect,
    };

    let form = match read_chatbot_form(multipart).await {
        Ok(form) => form,
        Err(e) => {
            error!("Chatbot form could not be read: {:#}", e);
            flash::set(&session, "The form could not be read.").await;
            return Redirect::to("/chatbot/new").into_response();
        }
    };

    match state.db.create_chatbot(
        &user.id,
        &form.name,
        &form.system_prompt,
        &form.welcome_message,
        &form.text_files,
        form.css_file.as_ref(),
    ) {
        Ok(_) => {
            flash::set(&session, "Chatbot created.").await;
            Redirect::to("/catalog").into_response()
        }
        Err(e) => {
            error!("Chatbot insert failed: {:#}", e);
            flash::set(&session, "Something went wrong, please try again.").await;
            Redirect::to("/chatbot/new").into_response()
        }
    }
}

pub async fn edit_form(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(identity): Extension<Identity>,
    session: Session,
) -> Response {
    let user = match require_user(identity, &session).await {
        Ok(user) => user,
        Err(redirect) => return redirect,
    };
    let bot = match require_owned(&state, &session, &user, &id).await {
        Ok(bot) => bot,
        Err(redirect) => return redirect,
    };

    let text_files = state.db.list_text_files(&bot.id).unwrap_or_else(|e| {
        error!("Text file listing failed: {:#}", e);
        Vec::new()
    });
    let css_file = state.db.get_css_file(&bot.id).unwrap_or_else(|e| {
        error!("Css lookup failed: {:#}", e);
        None
    });

    pages::chatbot_form(
        &user,
        flash::take(&session).await.as_deref(),
        "Edit chatbot",
        &format!("/chatbot/{}/edit", bot.id),
        Some(&bot),
        &text_files,
        css_file.as_ref(),
    )
    .into_response()
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(identity): Extension<Identity>,
    session: Session,
    multipart: Multipart,
) -> Response {
    let user = match require_user(identity, &session).await {
        Ok(user) => user,
        Err(redirect) => return redirect,
    };
    let bot = match require_owned(&state, &session, &user, &id).await {
        Ok(bot) => bot,
        Err(redirect) => return redirect,
    };
    let edit_url = format!("/chatbot/{}/edit", bot.id);

    let form = match read_chatbot_form(multipart).await {
        Ok(form) => form,
        Err(e) => {
            error!("Chatbot form could not be read: {:#}", e);
            flash::set(&session, "The form could not be read.").await;
            return Redirect::to(&edit_url).into_response();
        }
    };

    match state.db.update_chatbot(
        &bot.id,
        &form.name,
        &form.system_prompt,
        &form.welcome_message,
        &form.text_files,
        form.css_file.as_ref(),
    ) {
        Ok(()) => flash::set(&session, "Chatbot saved.").await,
        Err(e) => {
            error!("Chatbot update failed: {:#}", e);
            flash::set(&session, "Something went wrong, please try again.").await;
        }
    }
    Redirect::to(&edit_url).into_response()
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(identity): Extension<Identity>,
    session: Session,
) -> Response {
    let user = match require_user(identity, &session).await {
        Ok(user) => user,
        Err(redirect) => return redirect,
    };
    let bot = match require_owned(&state, &session, &user, &id).await {
        Ok(bot) => bot,
        Err(redirect) => return redirect,
    };

    match state.db.delete_chatbot(&bot.id) {
        Ok(_) => flash::set(&session, "Chatbot deleted.").await,
        Err(e) => {
            error!("Chatbot delete failed: {:#}", e);
            flash::set(&session, "Something went wrong, please try again.").await;
        }
    }
    Redirect::to("/catalog").into_response()
}

pub async fn delete_text_file(
    State(state): State<AppState>,
    Path((id, file_id)): Path<(String, String)>,
    Extension(identity): Extension<Identity>,
    session: Session,
) -> Response {
    let user = match require_user(identity, &session).await {
        Ok(user) => user,
        Err(redirect) => return redirect,
    };
    let bot = match require_owned(&state, &session, &user, &id).await {
        Ok(bot) => bot,
        Err(redirect) => return redirect,
    };

    match state.db.delete_text_file(&bot.id, &file_id) {
        Ok(true) => flash::set(&session, "File deleted.").await,
        Ok(false) => flash::set(&session, "That file is not available.").await,
        Err(e) => {
            error!("Text file delete failed: {:#}", e);
            flash::set(&session, "Something went wrong, please try again.").await;
        }
    }
    Redirect::to(&format!("/chatbot/{}/edit", bot.id)).into_response()
}

pub async fn delete_css_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(identity): Extension<Identity>,
    session: Session,
) -> Response {
    let user = match require_user(identity, &session).await {
        Ok(user) => user,
        Err(redirect) => return redirect,
    };
    let bot = match require_owned(&state, &session, &user, &id).await {
        Ok(bot) => bot,
        Err(redirect) => return redirect,
    };

    match state.db.delete_css_file(&bot.id) {
        Ok(_) => flash::set(&session, "Theme removed.").await,
        Err(e) => {
            error!("Css file delete failed: {:#}", e);
            flash::set(&session, "Something went wrong, please try again.").await;
        }
    }
    Redirect::to(&format!("/chatbot/{}/edit", bot.id)).into_response()
}
