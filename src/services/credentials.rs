//! Login credentials: argon2 hashing and role-checked authentication.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use crate::models::{LoginAccount, Role};

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Stored password hash is malformed: {0}")]
    MalformedHash(String),

    #[error("Password must not be empty")]
    EmptyPassword,
}

pub fn hash_password(password: &str) -> Result<String, CredentialError> {
    if password.is_empty() {
        return Err(CredentialError::EmptyPassword);
    }

    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CredentialError::Hashing(e.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, CredentialError> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| CredentialError::MalformedHash(e.to_string()))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Checks an account against the role it is trying to sign in as
pub fn account_matches(
    account: &LoginAccount,
    password: &str,
    role: Role,
) -> Result<bool, CredentialError> {
    if account.category != role {
        return Ok(false);
    }
    verify_password(password, &account.password_hash)
}

/// Returns the account when email, password and role all match
#[instrument(skip(pool, password))]
pub async fn authenticate(
    pool: &PgPool,
    email: &str,
    password: &str,
    role: Role,
) -> crate::error::Result<Option<LoginAccount>> {
    let Some(account) = LoginAccount::find_by_email(pool, email).await? else {
        tracing::info!(role = %role, "Login rejected: unknown email");
        return Ok(None);
    };

    if account_matches(&account, password, role)? {
        Ok(Some(account))
    } else {
        tracing::info!(role = %role, "Login rejected: bad password or role");
        Ok(None)
    }
}
