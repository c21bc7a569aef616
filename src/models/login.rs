use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use std::fmt;

use super::types::InvalidValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Trainer,
    Admin,
}

impl Role {
    /// Value stored in the `login.category` column
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "Member",
            Role::Trainer => "Trainer",
            Role::Admin => "Admin",
        }
    }

    /// Path segment used in URLs
    pub fn slug(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Trainer => "trainer",
            Role::Admin => "admin",
        }
    }
}

impl TryFrom<String> for Role {
    type Error = InvalidValue;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "Member" => Ok(Role::Member),
            "Trainer" => Ok(Role::Trainer),
            "Admin" => Ok(Role::Admin),
            _ => Err(InvalidValue::new("login category", value)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct LoginAccount {
    pub email: String,
    pub password_hash: String,
    #[sqlx(try_from = "String")]
    pub category: Role,
}

impl LoginAccount {
    pub async fn create(
        conn: &mut PgConnection,
        email: &str,
        password_hash: &str,
        category: Role,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO login (email, password_hash, category) VALUES ($1, $2, $3)")
            .bind(email)
            .bind(password_hash)
            .bind(category.as_str())
            .execute(conn)
            .await?;

        Ok(())
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM login WHERE email = $1")
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    pub async fn email_exists(pool: &PgPool, email: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM login WHERE email = $1)")
            .bind(email)
            .fetch_one(pool)
            .await
    }

    pub async fn set_password_hash(
        pool: &PgPool,
        email: &str,
        password_hash: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE login SET password_hash = $2 WHERE email = $1")
            .bind(email)
            .bind(password_hash)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Creates or replaces an account; used for the bootstrap administrator
    pub async fn upsert(
        pool: &PgPool,
        email: &str,
        password_hash: &str,
        category: Role,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO login (email, password_hash, category)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO UPDATE
            SET password_hash = EXCLUDED.password_hash, category = EXCLUDED.category
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(category.as_str())
        .execute(pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_names() {
        for role in [Role::Member, Role::Trainer, Role::Admin] {
            assert_eq!(Role::try_from(role.as_str().to_string()).unwrap(), role);
        }
        assert_eq!(Role::Trainer.slug(), "trainer");
        assert!(Role::try_from("Owner".to_string()).is_err());
    }

    #[test]
    fn test_role_path_segment() {
        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, Role::Admin);
    }
}
