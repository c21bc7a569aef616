use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Workout {
    pub workout_id: i32,
    pub equipment_id: i32,
    pub workout_name: String,
}

impl Workout {
    pub async fn create(
        pool: &PgPool,
        workout_name: &str,
        equipment_id: i32,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO workouts (equipment_id, workout_name)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(equipment_id)
        .bind(workout_name)
        .fetch_one(pool)
        .await
    }

    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM workouts ORDER BY workout_id")
            .fetch_all(pool)
            .await
    }

    /// Replaces both name and equipment, returns rows touched
    pub async fn update(
        pool: &PgPool,
        workout_id: i32,
        workout_name: &str,
        equipment_id: i32,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE workouts SET equipment_id = $2, workout_name = $3
            WHERE workout_id = $1
            "#,
        )
        .bind(workout_id)
        .bind(equipment_id)
        .bind(workout_name)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }
}
