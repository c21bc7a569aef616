use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::fmt;

use super::types::InvalidValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    Cash,
    Card,
    #[serde(rename = "UPI")]
    Upi,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 3] = [PaymentMethod::Cash, PaymentMethod::Card, PaymentMethod::Upi];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::Card => "Card",
            PaymentMethod::Upi => "UPI",
        }
    }
}

impl TryFrom<String> for PaymentMethod {
    type Error = InvalidValue;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "Cash" => Ok(PaymentMethod::Cash),
            "Card" => Ok(PaymentMethod::Card),
            "UPI" => Ok(PaymentMethod::Upi),
            _ => Err(InvalidValue::new("payment method", value)),
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payments are append-only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub payment_id: i32,
    pub member_id: i32,
    pub amount: i64,
    pub payment_date: NaiveDate,
    #[sqlx(try_from = "String")]
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPayment {
    pub member_id: i32,
    pub amount: i64,
    pub payment_date: NaiveDate,
    pub payment_method: PaymentMethod,
}

impl Payment {
    pub async fn create(pool: &PgPool, data: &NewPayment) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO payment (member_id, amount, payment_date, payment_method)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(data.member_id)
        .bind(data.amount)
        .bind(data.payment_date)
        .bind(data.payment_method.as_str())
        .fetch_one(pool)
        .await
    }

    /// Most recent payment by date. Ties on the same day resolve to the latest insert.
    pub async fn find_latest_for_member(
        pool: &PgPool,
        member_id: i32,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM payment
            WHERE member_id = $1
            ORDER BY payment_date DESC, payment_id DESC
            LIMIT 1
            "#,
        )
        .bind(member_id)
        .fetch_optional(pool)
        .await
    }

    /// Payment history, newest first
    pub async fn list_for_member(pool: &PgPool, member_id: i32) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM payment
            WHERE member_id = $1
            ORDER BY payment_date DESC, payment_id DESC
            "#,
        )
        .bind(member_id)
        .fetch_all(pool)
        .await
    }
}
