use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GymClass {
    pub class_id: i32,
    pub trainer_id: i32,
    pub class_date: NaiveDate,
    pub workout_id: i32,
}

/// A class with its workout name resolved
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct ClassSummary {
    pub class_id: i32,
    pub class_date: NaiveDate,
    pub workout_name: String,
}

/// One workout of a class together with the equipment it uses
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct WorkoutPlan {
    pub workout_name: String,
    pub equipment_name: String,
}

impl GymClass {
    pub async fn create(
        conn: &mut PgConnection,
        trainer_id: i32,
        class_date: NaiveDate,
        workout_id: i32,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO classes (trainer_id, class_date, workout_id)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(trainer_id)
        .bind(class_date)
        .bind(workout_id)
        .fetch_one(conn)
        .await
    }
}

impl ClassSummary {
    pub async fn find_by_id(pool: &PgPool, class_id: i32) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT c.class_id, c.class_date, w.workout_name
            FROM classes c
            JOIN workouts w ON w.workout_id = c.workout_id
            WHERE c.class_id = $1
            "#,
        )
        .bind(class_id)
        .fetch_optional(pool)
        .await
    }

    /// Earliest class of the trainer on or after `today`
    pub async fn next_for_trainer(
        pool: &PgPool,
        trainer_id: i32,
        today: NaiveDate,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT c.class_id, c.class_date, w.workout_name
            FROM classes c
            JOIN workouts w ON w.workout_id = c.workout_id
            WHERE c.trainer_id = $1 AND c.class_date >= $2
            ORDER BY c.class_date ASC, c.class_id ASC
            LIMIT 1
            "#,
        )
        .bind(trainer_id)
        .bind(today)
        .fetch_optional(pool)
        .await
    }

    /// All classes of a trainer, newest first
    pub async fn list_for_trainer(pool: &PgPool, trainer_id: i32) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT c.class_id, c.class_date, w.workout_name
            FROM classes c
            JOIN workouts w ON w.workout_id = c.workout_id
            WHERE c.trainer_id = $1
            ORDER BY c.class_date DESC, c.class_id DESC
            "#,
        )
        .bind(trainer_id)
        .fetch_all(pool)
        .await
    }
}

impl WorkoutPlan {
    pub async fn for_class(pool: &PgPool, class_id: i32) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT w.workout_name, e.equipment_name
            FROM classes c
            JOIN workouts w ON w.workout_id = c.workout_id
            JOIN equipment e ON e.equipment_id = w.equipment_id
            WHERE c.class_id = $1
            "#,
        )
        .bind(class_id)
        .fetch_all(pool)
        .await
    }
}
