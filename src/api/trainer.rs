use askama::Template;
use axum::{
    extract::{Path, State},
    response::Redirect,
    routing::{get, post},
    Form, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tower_sessions::Session;

use crate::api::middleware::auth::{get_authenticated, profile_id};
use crate::api::middleware::session::{flash_outcome, take_flash, AppState, Flash};
use crate::error::{AppError, Result};
use crate::models::types::parse_text;
use crate::models::{ClassSummary, Equipment, Role, Trainer, Workout};
use crate::services::classes::{self, ScheduledClass};
use crate::services::membership_status::{PgMembershipStore, StatusError};

#[derive(Template)]
#[template(path = "trainer/dashboard.html")]
struct TrainerDashboardTemplate {
    trainer: Trainer,
    classes: Vec<ClassSummary>,
    workouts: Vec<Workout>,
    equipment: Vec<Equipment>,
    flash: Option<Flash>,
}

async fn dashboard(
    State(state): State<AppState>,
    session: Session,
) -> Result<TrainerDashboardTemplate> {
    let auth = get_authenticated(&session, Role::Trainer).await?;
    let trainer_id = profile_id(&auth)?;

    let trainer = Trainer::find_by_id(&state.pool, trainer_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("trainer {}", trainer_id)))?;

    Ok(TrainerDashboardTemplate {
        trainer,
        classes: ClassSummary::list_for_trainer(&state.pool, trainer_id).await?,
        workouts: Workout::list_all(&state.pool).await?,
        equipment: Equipment::list_all(&state.pool).await?,
        flash: take_flash(&session).await?,
    })
}

#[derive(Deserialize)]
struct ScheduleClassForm {
    class_date: NaiveDate,
    workout_id: i32,
}

async fn schedule_class(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ScheduleClassForm>,
) -> Result<Redirect> {
    let auth = get_authenticated(&session, Role::Trainer).await?;
    let trainer_id = profile_id(&auth)?;

    let store = PgMembershipStore::new(state.pool.clone());
    let today = chrono::Local::now().date_naive();

    let outcome = classes::schedule_class(
        &store,
        &state.config.policy,
        trainer_id,
        form.class_date,
        form.workout_id,
        today,
    )
    .await
    .map_err(|e| match e {
        StatusError::Store(e) => AppError::from_write(e),
        other => other.into(),
    });

    flash_outcome(&session, outcome, |scheduled: ScheduledClass| {
        format!(
            "Class scheduled for {}. {} member(s) updated.",
            scheduled.class.class_date, scheduled.members_assigned
        )
    })
    .await?;

    Ok(Redirect::to("/trainer"))
}

#[derive(Deserialize)]
struct WorkoutForm {
    workout_name: String,
    equipment_id: i32,
}

async fn add_workout(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<WorkoutForm>,
) -> Result<Redirect> {
    get_authenticated(&session, Role::Trainer).await?;

    let outcome: Result<Workout> = async {
        let name = parse_text("workout name", &form.workout_name)?;
        Workout::create(&state.pool, &name, form.equipment_id)
            .await
            .map_err(AppError::from_write)
    }
    .await;

    flash_outcome(&session, outcome, |workout| {
        format!("Workout '{}' added.", workout.workout_name)
    })
    .await?;

    Ok(Redirect::to("/trainer"))
}

async fn update_workout(
    State(state): State<AppState>,
    Path(workout_id): Path<i32>,
    session: Session,
    Form(form): Form<WorkoutForm>,
) -> Result<Redirect> {
    get_authenticated(&session, Role::Trainer).await?;

    let outcome: Result<()> = async {
        let name = parse_text("workout name", &form.workout_name)?;
        let touched = Workout::update(&state.pool, workout_id, &name, form.equipment_id)
            .await
            .map_err(AppError::from_write)?;
        if touched == 0 {
            return Err(AppError::NotFound(format!("workout {}", workout_id)));
        }
        Ok(())
    }
    .await;

    flash_outcome(&session, outcome, |_| "Workout updated.".to_string()).await?;

    Ok(Redirect::to("/trainer"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/trainer", get(dashboard))
        .route("/trainer/classes", post(schedule_class))
        .route("/trainer/workouts", post(add_workout))
        .route("/trainer/workouts/:id", post(update_workout))
}
