use serde::{Deserialize, Serialize};
use time::Duration;
use tower_sessions::{Expiry, MemoryStore, Session, SessionManagerLayer};
use uuid::Uuid;

use crate::config::SessionConfig;

const SESSION_KEY: &str = "auth";

/// What the session remembers about the caller between requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    pub user_id: Uuid,
    pub token: String,
}

/// Cookie-backed session layer. Must wrap every route that reads or writes a session.
pub fn layer(cfg: &SessionConfig) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_secure(cfg.secure_cookie)
        .with_expiry(Expiry::OnInactivity(Duration::minutes(cfg.inactivity_minutes)))
}

pub async fn load(session: &Session) -> Result<Option<SessionData>, tower_sessions::session::Error> {
    session.get::<SessionData>(SESSION_KEY).await
}

/// Rotates the session id, then records the caller.
pub async fn store(session: &Session, data: &SessionData) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(SESSION_KEY, data).await
}

/// Drops the session record and expires the cookie.
pub async fn clear(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
