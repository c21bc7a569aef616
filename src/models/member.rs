use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use std::fmt;

use super::types::{bmi, parse_number, parse_optional_id, parse_text, Gender, InvalidValue};

/// Derived from payment recency; never a source of truth on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MembershipStatus {
    Active,
    Inactive,
}

impl MembershipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipStatus::Active => "Active",
            MembershipStatus::Inactive => "Inactive",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, MembershipStatus::Active)
    }

    pub fn parse(value: &str) -> Result<Self, InvalidValue> {
        match value.trim() {
            "Active" | "active" => Ok(MembershipStatus::Active),
            "Inactive" | "inactive" => Ok(MembershipStatus::Inactive),
            other => Err(InvalidValue::new("membership status", other)),
        }
    }
}

impl TryFrom<String> for MembershipStatus {
    type Error = InvalidValue;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl fmt::Display for MembershipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Member {
    pub member_id: i32,
    pub member_name: String,
    #[sqlx(try_from = "String")]
    pub gender: Gender,
    pub phone: String,
    pub email: String,
    pub scheme_id: Option<i32>,
    #[sqlx(try_from = "String")]
    pub membership_status: MembershipStatus,
    pub trainer_id: Option<i32>,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub bmi: f64,
    pub payment_id: Option<i32>, // Most recent payment
    pub age: i32,
    pub class_id: Option<i32>, // Upcoming class
}

#[derive(Debug, Clone)]
pub struct CreateMemberData {
    pub member_name: String,
    pub gender: Gender,
    pub phone: String,
    pub email: String,
    pub scheme_id: Option<i32>,
    pub trainer_id: Option<i32>,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub age: i32,
}

/// Columns an administrator may change on a member record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberField {
    Name,
    Gender,
    Phone,
    Email,
    Scheme,
    Trainer,
    Height,
    Weight,
    Age,
    Status,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberUpdate {
    Name(String),
    Gender(Gender),
    Phone(String),
    Email(String),
    Scheme(Option<i32>),
    Trainer(Option<i32>),
    Height(f64),
    Weight(f64),
    Age(i32),
    Status(MembershipStatus),
}

impl MemberUpdate {
    /// Interprets raw form input for the chosen field
    pub fn parse(field: MemberField, raw: &str) -> Result<Self, InvalidValue> {
        Ok(match field {
            MemberField::Name => MemberUpdate::Name(parse_text("name", raw)?),
            MemberField::Gender => MemberUpdate::Gender(Gender::parse(raw)?),
            MemberField::Phone => MemberUpdate::Phone(parse_text("phone", raw)?),
            MemberField::Email => MemberUpdate::Email(parse_text("email", raw)?),
            MemberField::Scheme => MemberUpdate::Scheme(parse_optional_id("scheme id", raw)?),
            MemberField::Trainer => MemberUpdate::Trainer(parse_optional_id("trainer id", raw)?),
            MemberField::Height => MemberUpdate::Height(parse_number("height", raw)?),
            MemberField::Weight => MemberUpdate::Weight(parse_number("weight", raw)?),
            MemberField::Age => MemberUpdate::Age(parse_number("age", raw)?),
            MemberField::Status => MemberUpdate::Status(MembershipStatus::parse(raw)?),
        })
    }
}

impl Member {
    /// Creates a new member record. New members start Inactive until their first payment.
    pub async fn create(conn: &mut PgConnection, data: CreateMemberData) -> Result<Self, sqlx::Error> {
        let member = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO member (
                member_name, gender, phone, email, scheme_id, trainer_id,
                height_cm, weight_kg, bmi, age, membership_status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(&data.member_name)
        .bind(data.gender.as_str())
        .bind(&data.phone)
        .bind(&data.email)
        .bind(data.scheme_id)
        .bind(data.trainer_id)
        .bind(data.height_cm)
        .bind(data.weight_kg)
        .bind(bmi(data.height_cm, data.weight_kg))
        .bind(data.age)
        .bind(MembershipStatus::Inactive.as_str())
        .fetch_one(conn)
        .await?;

        Ok(member)
    }

    pub async fn find_by_id(pool: &PgPool, member_id: i32) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM member WHERE member_id = $1")
            .bind(member_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM member WHERE email = $1")
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM member ORDER BY member_id")
            .fetch_all(pool)
            .await
    }

    /// Overwrites the cached status. Returns the number of rows touched (0 when the member is gone).
    pub async fn set_status(
        pool: &PgPool,
        member_id: i32,
        status: MembershipStatus,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE member SET membership_status = $2 WHERE member_id = $1")
            .bind(member_id)
            .bind(status.as_str())
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Points the member at their most recent payment
    pub async fn link_payment(
        pool: &PgPool,
        member_id: i32,
        payment_id: i32,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE member SET payment_id = $2 WHERE member_id = $1")
            .bind(member_id)
            .bind(payment_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Ids of every member coached by the trainer
    pub async fn ids_for_trainer(pool: &PgPool, trainer_id: i32) -> Result<Vec<i32>, sqlx::Error> {
        sqlx::query_scalar("SELECT member_id FROM member WHERE trainer_id = $1 ORDER BY member_id")
            .bind(trainer_id)
            .fetch_all(pool)
            .await
    }

    /// Sets the upcoming class for the listed members that still belong to the trainer
    pub async fn assign_class(
        conn: &mut PgConnection,
        trainer_id: i32,
        class_id: i32,
        member_ids: &[i32],
    ) -> Result<u64, sqlx::Error> {
        if member_ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            r#"
            UPDATE member SET class_id = $1
            WHERE trainer_id = $2 AND member_id = ANY($3)
            "#,
        )
        .bind(class_id)
        .bind(trainer_id)
        .bind(member_ids)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// Applies a single-field change. Returns the number of member rows touched.
    pub async fn apply_update(
        pool: &PgPool,
        member_id: i32,
        update: MemberUpdate,
    ) -> Result<u64, sqlx::Error> {
        let query = match update {
            MemberUpdate::Email(email) => return Self::change_email(pool, member_id, &email).await,
            MemberUpdate::Name(name) => {
                sqlx::query("UPDATE member SET member_name = $2 WHERE member_id = $1")
                    .bind(member_id)
                    .bind(name)
            }
            MemberUpdate::Gender(gender) => {
                sqlx::query("UPDATE member SET gender = $2 WHERE member_id = $1")
                    .bind(member_id)
                    .bind(gender.as_str())
            }
            MemberUpdate::Phone(phone) => {
                sqlx::query("UPDATE member SET phone = $2 WHERE member_id = $1")
                    .bind(member_id)
                    .bind(phone)
            }
            MemberUpdate::Scheme(scheme_id) => {
                sqlx::query("UPDATE member SET scheme_id = $2 WHERE member_id = $1")
                    .bind(member_id)
                    .bind(scheme_id)
            }
            MemberUpdate::Trainer(trainer_id) => {
                sqlx::query("UPDATE member SET trainer_id = $2 WHERE member_id = $1")
                    .bind(member_id)
                    .bind(trainer_id)
            }
            MemberUpdate::Height(height_cm) => sqlx::query(
                r#"
                UPDATE member
                SET height_cm = $2,
                    bmi = CASE WHEN $2 > 0 THEN weight_kg * 10000.0 / ($2 * $2) ELSE 0 END
                WHERE member_id = $1
                "#,
            )
            .bind(member_id)
            .bind(height_cm),
            MemberUpdate::Weight(weight_kg) => sqlx::query(
                r#"
                UPDATE member
                SET weight_kg = $2,
                    bmi = CASE WHEN height_cm > 0 THEN $2 * 10000.0 / (height_cm * height_cm) ELSE 0 END
                WHERE member_id = $1
                "#,
            )
            .bind(member_id)
            .bind(weight_kg),
            MemberUpdate::Age(age) => {
                sqlx::query("UPDATE member SET age = $2 WHERE member_id = $1")
                    .bind(member_id)
                    .bind(age)
            }
            // Raw write; accounts::override_status re-evaluates right after
            MemberUpdate::Status(status) => return Self::set_status(pool, member_id, status).await,
        };

        Ok(query.execute(pool).await?.rows_affected())
    }

    /// Renames the member and their login together
    async fn change_email(pool: &PgPool, member_id: i32, email: &str) -> Result<u64, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let old_email: Option<String> =
            sqlx::query_scalar("SELECT email FROM member WHERE member_id = $1 FOR UPDATE")
                .bind(member_id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(old_email) = old_email else {
            return Ok(0);
        };

        sqlx::query("UPDATE login SET email = $2 WHERE email = $1")
            .bind(&old_email)
            .bind(email)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("UPDATE member SET email = $2 WHERE member_id = $1")
            .bind(member_id)
            .bind(email)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected())
    }

    /// Removes the member (payments cascade) and revokes their login
    pub async fn delete(pool: &PgPool, member_id: i32) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let email: Option<String> =
            sqlx::query_scalar("DELETE FROM member WHERE member_id = $1 RETURNING email")
                .bind(member_id)
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
    fn test_status_parse_and_display() {
        assert_eq!(
            MembershipStatus::parse("Active").unwrap(),
            MembershipStatus::Active
        );
        assert_eq!(
            MembershipStatus::try_from("Inactive".to_string()).unwrap(),
            MembershipStatus::Inactive
        );
        assert!(MembershipStatus::parse("Paused").is_err());
        assert_eq!(MembershipStatus::Active.to_string(), "Active");
        assert!(MembershipStatus::Active.is_active());
        assert!(!MembershipStatus::Inactive.is_active());
    }

    #[test]
    fn test_member_update_parse() {
        assert_eq!(
            MemberUpdate::parse(MemberField::Name, " Asha ").unwrap(),
            MemberUpdate::Name("Asha".to_string())
        );
        assert_eq!(
            MemberUpdate::parse(MemberField::Height, "172.5").unwrap(),
            MemberUpdate::Height(172.5)
        );
        assert_eq!(
            MemberUpdate::parse(MemberField::Trainer, "").unwrap(),
            MemberUpdate::Trainer(None)
        );
        assert_eq!(
            MemberUpdate::parse(MemberField::Status, "Inactive").unwrap(),
            MemberUpdate::Status(MembershipStatus::Inactive)
        );
    }

    #[test]
    fn test_member_update_rejects_bad_input() {
        assert!(MemberUpdate::parse(MemberField::Age, "twenty").is_err());
        assert!(MemberUpdate::parse(MemberField::Gender, "Z").is_err());
        assert!(MemberUpdate::parse(MemberField::Email, "").is_err());
        // Column names never come from user input
        assert!(MemberUpdate::parse(MemberField::Status, "Active; DROP TABLE member").is_err());
    }

    #[test]
    fn test_member_field_from_form_value() {
        let field: MemberField = serde_json::from_str("\"height\"").unwrap();
        assert_eq!(field, MemberField::Height);
        assert!(serde_json::from_str::<MemberField>("\"bmi\"").is_err());
    }
}
