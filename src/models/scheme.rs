use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use super::types::{parse_number, parse_text, InvalidValue};

/// A subscription plan: duration in months and its fee
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Scheme {
    pub scheme_id: i32,
    pub scheme_name: String,
    pub duration_months: i32,
    pub fee: i64,
}

#[derive(Debug, Clone)]
pub struct CreateSchemeData {
    pub scheme_name: String,
    pub duration_months: i32,
    pub fee: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemeField {
    Name,
    DurationMonths,
    Fee,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SchemeUpdate {
    Name(String),
    DurationMonths(i32),
    Fee(i64),
}

impl SchemeUpdate {
    pub fn parse(field: SchemeField, raw: &str) -> Result<Self, InvalidValue> {
        Ok(match field {
            SchemeField::Name => SchemeUpdate::Name(parse_text("scheme name", raw)?),
            SchemeField::DurationMonths => {
                let months: i32 = parse_number("duration", raw)?;
                if months <= 0 {
                    return Err(InvalidValue::new("duration", raw));
                }
                SchemeUpdate::DurationMonths(months)
            }
            SchemeField::Fee => {
                let fee: i64 = parse_number("fee", raw)?;
                if fee < 0 {
                    return Err(InvalidValue::new("fee", raw));
                }
                SchemeUpdate::Fee(fee)
            }
        })
    }
}

impl Scheme {
    pub async fn create(pool: &PgPool, data: CreateSchemeData) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO membership_schemes (scheme_name, duration_months, fee)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(&data.scheme_name)
        .bind(data.duration_months)
        .bind(data.fee)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, scheme_id: i32) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM membership_schemes WHERE scheme_id = $1")
            .bind(scheme_id)
            .fetch_optional(pool)
            .await
    }

    /// Fee of the scheme the member is enrolled in, if any
    pub async fn fee_for_member(pool: &PgPool, member_id: i32) -> Result<Option<i64>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT s.fee FROM member m
            JOIN membership_schemes s ON s.scheme_id = m.scheme_id
            WHERE m.member_id = $1
            "#,
        )
        .bind(member_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM membership_schemes ORDER BY scheme_id")
            .fetch_all(pool)
            .await
    }

    pub async fn apply_update(
        pool: &PgPool,
        scheme_id: i32,
        update: SchemeUpdate,
    ) -> Result<u64, sqlx::Error> {
        let query = match update {
            SchemeUpdate::Name(name) => {
                sqlx::query("UPDATE membership_schemes SET scheme_name = $2 WHERE scheme_id = $1")
                    .bind(scheme_id)
                    .bind(name)
            }
            SchemeUpdate::DurationMonths(months) => sqlx::query(
                "UPDATE membership_schemes SET duration_months = $2 WHERE scheme_id = $1",
            )
            .bind(scheme_id)
            .bind(months),
            SchemeUpdate::Fee(fee) => {
                sqlx::query("UPDATE membership_schemes SET fee = $2 WHERE scheme_id = $1")
                    .bind(scheme_id)
                    .bind(fee)
            }
        };

        Ok(query.execute(pool).await?.rows_affected())
    }

    pub async fn delete(pool: &PgPool, scheme_id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM membership_schemes WHERE scheme_id = $1")
            .bind(scheme_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_update_parse() {
        assert_eq!(
            SchemeUpdate::parse(SchemeField::Fee, "2500").unwrap(),
            SchemeUpdate::Fee(2500)
        );
        assert_eq!(
            SchemeUpdate::parse(SchemeField::DurationMonths, "12").unwrap(),
            SchemeUpdate::DurationMonths(12)
        );
        assert!(SchemeUpdate::parse(SchemeField::DurationMonths, "0").is_err());
        assert!(SchemeUpdate::parse(SchemeField::Fee, "-1").is_err());
    }
}
