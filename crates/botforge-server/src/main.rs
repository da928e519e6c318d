use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use sha2::{Digest, Sha512};
use tower_http::trace::TraceLayer;
use tower_sessions::cookie::Key;
use tower_sessions::{MemoryStore, SessionManagerLayer};
use tracing::{info, warn};

use botforge_api::{AppStateInner, router};
use botforge_db::Database;
use botforge_reply::{RemoteReplyClient, ReplyGenerator};

const DEV_SESSION_SECRET: &str = "dev-secret-change-me";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "botforge=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let session_secret =
        std::env::var("BOTFORGE_SESSION_SECRET").unwrap_or_else(|_| DEV_SESSION_SECRET.into());
    if session_secret == DEV_SESSION_SECRET {
        warn!("Using the insecure default session secret; set BOTFORGE_SESSION_SECRET");
    }
    let db_path = std::env::var("BOTFORGE_DB_PATH").unwrap_or_else(|_| "botforge.db".into());
    let host = std::env::var("BOTFORGE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("BOTFORGE_PORT")
        .unwrap_or_else(|_| "5050".into())
        .parse()?;

    // Init database
    let db = Database::open(&PathBuf::from(&db_path))?;

    // Reply generation: remote when a key is configured, echo otherwise
    let reply = match std::env::var("BOTFORGE_OPENAI_API_KEY")
        .or_else(|_| std::env::var("OPENAI_API_KEY"))
    {
        Ok(api_key) => ReplyGenerator::with_remote(RemoteReplyClient::new(
            api_key,
            std::env::var("BOTFORGE_OPENAI_API_BASE").ok(),
            std::env::var("BOTFORGE_OPENAI_MODEL").ok(),
        )?),
        Err(_) => ReplyGenerator::unconfigured(),
    };
    if reply.has_remote() {
        info!("Remote reply service configured");
    } else {
        info!("No reply-service API key set, replies use the echo fallback");
    }

    let state = Arc::new(AppStateInner { db, reply });

    // Server-side sessions, cookie signed with a key stretched from the
    // configured secret.
    let signing_key = Key::from(Sha512::digest(session_secret.as_bytes()).as_slice());
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(false)
        .with_signed(signing_key);

    let app = router(state)
        .layer(session_layer)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Botforge listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
