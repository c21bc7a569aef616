use axum::extract::FromRef;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tower_sessions::{Expiry, Session, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::error::{AppError, Result};
use crate::models::Role;

/// Session keys used in the application
pub const SESSION_KEY_AUTH: &str = "auth";
pub const SESSION_KEY_FLASH: &str = "flash";

/// Creates a session layer for Axum
pub async fn create_session_layer(
    pool: PgPool,
    secure: bool,
) -> std::result::Result<SessionManagerLayer<PostgresStore>, sqlx::Error> {
    let session_store = PostgresStore::new(pool);
    session_store.migrate().await?;

    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(secure)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::hours(24)));

    Ok(session_layer)
}

/// Who is logged in. Stored once at login and handed to workflows explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub role: Role,
    pub email: String,
    /// member_id or trainer_id; admins have no profile row
    pub profile_id: Option<i32>,
}

/// One-shot message shown on the next page render
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub success: bool,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

pub async fn set_flash(session: &Session, flash: Flash) -> Result<()> {
    session.insert(SESSION_KEY_FLASH, flash).await?;
    Ok(())
}

pub async fn take_flash(session: &Session) -> Result<Option<Flash>> {
    Ok(session.remove::<Flash>(SESSION_KEY_FLASH).await?)
}

/// Turns a form outcome into a flash message.
/// User mistakes become error flashes; anything else is returned as an error.
pub async fn flash_outcome<T>(
    session: &Session,
    outcome: Result<T>,
    on_success: impl FnOnce(T) -> String,
) -> Result<()> {
    let flash = match outcome {
        Ok(value) => Flash::success(on_success(value)),
        Err(AppError::Validation(msg)) | Err(AppError::Conflict(msg)) => Flash::error(msg),
        Err(AppError::NotFound(what)) => Flash::error(format!("Not found: {}", what)),
        Err(e) => return Err(e),
    };
    set_flash(session, flash).await
}

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: crate::config::Config,
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> PgPool {
        state.pool.clone()
    }
}
