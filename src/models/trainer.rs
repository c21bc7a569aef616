use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};

use super::types::{parse_text, Gender, InvalidValue};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Trainer {
    pub trainer_id: i32,
    pub trainer_name: String,
    #[sqlx(try_from = "String")]
    pub gender: Gender,
    pub phone: String,
    pub email: String,
}

/// Trainer joined with their salary row, for the admin listing
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TrainerWithSalary {
    pub trainer_id: i32,
    pub trainer_name: String,
    #[sqlx(try_from = "String")]
    pub gender: Gender,
    pub phone: String,
    pub email: String,
    pub salary: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct CreateTrainerData {
    pub trainer_name: String,
    pub gender: Gender,
    pub phone: String,
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainerField {
    Name,
    Phone,
    Gender,
    Password,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrainerProfileUpdate {
    Name(String),
    Phone(String),
    Gender(Gender),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrainerUpdate {
    Profile(TrainerProfileUpdate),
    /// Plain text; hashed before it reaches the login table
    Password(String),
}

impl TrainerUpdate {
    pub fn parse(field: TrainerField, raw: &str) -> Result<Self, InvalidValue> {
        Ok(match field {
            TrainerField::Name => {
                TrainerUpdate::Profile(TrainerProfileUpdate::Name(parse_text("name", raw)?))
            }
            TrainerField::Phone => {
                TrainerUpdate::Profile(TrainerProfileUpdate::Phone(parse_text("phone", raw)?))
            }
            TrainerField::Gender => {
                TrainerUpdate::Profile(TrainerProfileUpdate::Gender(Gender::parse(raw)?))
            }
            TrainerField::Password => {
                if raw.is_empty() {
                    return Err(InvalidValue::new("password", ""));
                }
                TrainerUpdate::Password(raw.to_string())
            }
        })
    }
}

impl Trainer {
    pub async fn create(conn: &mut PgConnection, data: CreateTrainerData) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO trainer (trainer_name, gender, phone, email)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&data.trainer_name)
        .bind(data.gender.as_str())
        .bind(&data.phone)
        .bind(&data.email)
        .fetch_one(conn)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, trainer_id: i32) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM trainer WHERE trainer_id = $1")
            .bind(trainer_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM trainer WHERE email = $1")
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_with_salary(pool: &PgPool) -> Result<Vec<TrainerWithSalary>, sqlx::Error> {
        sqlx::query_as::<_, TrainerWithSalary>(
            r#"
            SELECT t.trainer_id, t.trainer_name, t.gender, t.phone, t.email, s.salary
            FROM trainer t
            LEFT JOIN salary s ON s.trainer_id = t.trainer_id
            ORDER BY t.trainer_id
            "#,
        )
        .fetch_all(pool)
        .await
    }

    pub async fn update_profile(
        pool: &PgPool,
        trainer_id: i32,
        update: TrainerProfileUpdate,
    ) -> Result<u64, sqlx::Error> {
        let query = match update {
            TrainerProfileUpdate::Name(name) => {
                sqlx::query("UPDATE trainer SET trainer_name = $2 WHERE trainer_id = $1")
                    .bind(trainer_id)
                    .bind(name)
            }
            TrainerProfileUpdate::Phone(phone) => {
                sqlx::query("UPDATE trainer SET phone = $2 WHERE trainer_id = $1")
                    .bind(trainer_id)
                    .bind(phone)
            }
            TrainerProfileUpdate::Gender(gender) => {
                sqlx::query("UPDATE trainer SET gender = $2 WHERE trainer_id = $1")
                    .bind(trainer_id)
                    .bind(gender.as_str())
            }
        };

        Ok(query.execute(pool).await?.rows_affected())
    }

    pub async fn insert_salary(
        conn: &mut PgConnection,
        trainer_id: i32,
        salary: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO salary (trainer_id, salary) VALUES ($1, $2)")
            .bind(trainer_id)
            .bind(salary)
            .execute(conn)
            .await?;

        Ok(())
    }

    /// Returns 0 when the trainer does not exist
    pub async fn set_salary(pool: &PgPool, trainer_id: i32, salary: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO salary (trainer_id, salary)
            SELECT trainer_id, $2 FROM trainer WHERE trainer_id = $1
            ON CONFLICT (trainer_id) DO UPDATE SET salary = EXCLUDED.salary
            "#,
        )
        .bind(trainer_id)
        .bind(salary)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Removes the trainer and their login. Members keep their record with no trainer.
    pub async fn delete(pool: &PgPool, trainer_id: i32) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let email: Option<String> =
            sqlx::query_scalar("DELETE FROM trainer WHERE trainer_id = $1 RETURNING email")
                .bind(trainer_id)
                .fetch_optional(&mut *tx)
                .await?;

        if let Some(email) = &email {
            sqlx::query("DELETE FROM login WHERE email = $1")
                .bind(email)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(email.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trainer_update_parse() {
        assert_eq!(
            TrainerUpdate::parse(TrainerField::Gender, "F").unwrap(),
            TrainerUpdate::Profile(TrainerProfileUpdate::Gender(Gender::F))
        );
        assert_eq!(
            TrainerUpdate::parse(TrainerField::Password, " spaced secret ").unwrap(),
            TrainerUpdate::Password(" spaced secret ".to_string())
        );
        assert!(TrainerUpdate::parse(TrainerField::Password, "").is_err());
        assert!(TrainerUpdate::parse(TrainerField::Name, "  ").is_err());
    }
}
