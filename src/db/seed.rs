use secrecy::ExposeSecret;
use sqlx::PgPool;
use tracing::{info, instrument};

use crate::config::Config;
use crate::error::Result;
use crate::models::{LoginAccount, Role};
use crate::services::credentials::hash_password;

/// Upserts the administrator named in the configuration, if any
#[instrument(skip(pool, config))]
pub async fn seed_admin(pool: &PgPool, config: &Config) -> Result<()> {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        info!("No bootstrap admin configured");
        return Ok(());
    };

    let password_hash = hash_password(password.expose_secret())?;
    LoginAccount::upsert(pool, email, &password_hash, Role::Admin).await?;

    info!(email = %email, "Bootstrap admin ensured");

    Ok(())
}
