use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tower_sessions::Session;
use tracing::debug;

use botforge_db::models::{ChatbotRow, UserRow};

use crate::AppState;

/// Session key holding the authenticated user's id.
pub const SESSION_USER_KEY: &str = "user_id";

/// The resolved identity for the current request. `None` means the
/// request is unauthenticated; handlers decide whether that redirects
/// (HTML) or returns 401 (JSON).
#[derive(Clone)]
pub struct Identity(pub Option<UserRow>);

/// Runs before every request: read the user id from the session and look
/// the user up. Any failure along the way downgrades to unauthenticated
/// rather than erroring.
pub async fn resolve_identity(
    State(state): State<AppState>,
    session: Session,
    mut req: Request,
    next: Next,
) -> Response {
    let user = match session.get::<String>(SESSION_USER_KEY).await {
        Ok(Some(user_id)) => match state.db.get_user_by_id(&user_id) {
            Ok(user) => user,
            Err(e) => {
                debug!("Identity lookup failed, treating as anonymous: {}", e);
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            debug!("Session read failed, treating as anonymous: {}", e);
            None
        }
    };

    req.extensions_mut().insert(Identity(user));
    next.run(req).await
}

/// Read access: the admin account sees every chatbot, everyone else only
/// their own.
pub fn is_authorized(user: &UserRow, chatbot: &ChatbotRow) -> bool {
    user.is_admin() || is_owner(user, chatbot)
}

/// Write access: literal ownership only. Admin intentionally has no
/// override for edits, deletes, or file management.
pub fn is_owner(user: &UserRow, chatbot: &ChatbotRow) -> bool {
    chatbot.user_id.as_deref() == Some(user.id.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, username: &str) -> UserRow {
        UserRow {
            id: id.to_string(),
            username: username.to_string(),
            password: String::new(),
            salt: None,
            created_at: String::new(),
        }
    }

    fn chatbot(owner: Option<&str>) -> ChatbotRow {
        ChatbotRow {
            id: "bot00001".to_string(),
            user_id: owner.map(str::to_string),
            name: None,
            system_prompt: None,
            welcome_message: None,
            created_at: String::new(),
        }
    }

    #[test]
    fn owner_can_read_and_write() {
        let alice = user("u1", "alice");
        let bot = chatbot(Some("u1"));
        assert!(is_authorized(&alice, &bot));
        assert!(is_owner(&alice, &bot));
    }

    #[test]
    fn stranger_can_do_neither() {
        let mallory = user("u2", "mallory");
        let bot = chatbot(Some("u1"));
        assert!(!is_authorized(&mallory, &bot));
        assert!(!is_owner(&mallory, &bot));
    }

    #[test]
    fn admin_reads_everything_but_owns_nothing_extra() {
        let admin = user("u9", "admin");
        let bot = chatbot(Some("u1"));
        assert!(is_authorized(&admin, &bot));
        assert!(!is_owner(&admin, &bot));
    }

    #[test]
    fn orphaned_chatbot_has_no_owner() {
        let alice = user("u1", "alice");
        let bot = chatbot(None);
        assert!(!is_owner(&alice, &bot));
        assert!(!is_authorized(&alice, &bot));
    }
}
