use tower_sessions::Session;
use tracing::debug;

const FLASH_KEY: &str = "flash";

/// One-shot user-visible message carried through a redirect. A failure to
/// store or read one is never worth failing the request over.
pub async fn set(session: &Session, message: &str) {
    if let Err(e) = session.insert(FLASH_KEY, message.to_string()).await {
        debug!("Failed to store flash message: {}", e);
    }
}

pub async fn take(session: &Session) -> Option<String> {
    match session.remove::<String>(FLASH_KEY).await {
        Ok(flash) => flash,
        Err(e) => {
            debug!("Failed to read flash message: {}", e);
            None
        }
    }
}
