use axum::{
    Form,
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{debug, error, info};

use botforge_credentials::{hash_password, verify_password};

use crate::middleware::SESSION_USER_KEY;
use crate::{AppState, flash, pages};

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub password: String,
    pub confirm: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

pub async fn register_form(session: Session) -> Html<String> {
    pages::register(flash::take(&session).await.as_deref())
}

pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Response {
    let username = form.username.trim().to_string();

    if username.is_empty() || form.password.is_empty() {
        flash::set(&session, "Username and password are required.").await;
        return Redirect::to("/register").into_response();
    }
    if form.password != form.confirm {
        flash::set(&session, "Passwords do not match.").await;
        return Redirect::to("/register").into_response();
    }

    match state.db.get_user_by_username(&username) {
        Ok(Some(_)) => {
            flash::set(&session, "That username is taken.").await;
            return Redirect::to("/register").into_response();
        }
        Ok(None) => {}
        Err(e) => {
            error!("User lookup failed during registration: {:#}", e);
            flash::set(&session, "Something went wrong, please try again.").await;
            return Redirect::to("/register").into_response();
        }
    }

    let (hash, salt) = hash_password(&form.password, None);
    match state.db.create_user(&username, &hash, &salt) {
        Ok(user) => {
            if let Err(e) = session.insert(SESSION_USER_KEY, user.id.clone()).await {
                error!("Session write failed after registration: {}", e);
                flash::set(&session, "Account created, please log in.").await;
                return Redirect::to("/login").into_response();
            }
            info!("New user registered: {}", user.username);
            Redirect::to("/catalog").into_response()
        }
        Err(e) => {
            // A concurrent register with the same name lands here via the
            // unique constraint.
            error!("User insert failed: {:#}", e);
            flash::set(&session, "That username is taken.").await;
            Redirect::to("/register").into_response()
        }
    }
}

pub async fn login_form(session: Session) -> Html<String> {
    pages::login(flash::take(&session).await.as_deref())
}

pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let user = match state.db.get_user_by_username(form.username.trim()) {
        Ok(Some(user)) => user,
        Ok(None) => return rejected(&session).await,
        Err(e) => {
            error!("User lookup failed during login: {:#}", e);
            return rejected(&session).await;
        }
    };

    let salt = user.salt.as_deref().unwrap_or("");
    if !verify_password(&user.password, salt, &form.password) {
        return rejected(&session).await;
    }

    if let Err(e) = session.insert(SESSION_USER_KEY, user.id.clone()).await {
        error!("Session write failed during login: {}", e);
        return rejected(&session).await;
    }

    info!("User logged in: {}", user.username);
    Redirect::to("/catalog").into_response()
}

/// The same answer for a bad username and a bad password.
async fn rejected(session: &Session) -> Response {
    flash::set(session, "Invalid username or password.").await;
    Redirect::to("/login").into_response()
}

pub async fn logout(session: Session) -> Redirect {
    if let Err(e) = session.flush().await {
        debug!("Session flush failed during logout: {}", e);
    }
    Redirect::to("/login")
}
