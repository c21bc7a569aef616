use askama::Template;
use axum::{
    extract::{Path, State},
    middleware,
    response::Redirect,
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::api::middleware::auth::require_admin;
use crate::api::middleware::session::{flash_outcome, take_flash, AppState, Flash};
use crate::error::{AppError, Result};
use crate::models::equipment::{EquipmentField, EquipmentUpdate};
use crate::models::member::{CreateMemberData, MemberField, MemberUpdate};
use crate::models::scheme::{CreateSchemeData, SchemeField, SchemeUpdate};
use crate::models::trainer::{CreateTrainerData, TrainerField, TrainerUpdate, TrainerWithSalary};
use crate::models::types::{parse_number, parse_optional_id, parse_text};
use crate::models::{Equipment, Gender, LoginAccount, Member, Scheme, Trainer};
use crate::services::accounts;
use crate::services::membership_status::PgMembershipStore;

const ADMIN_HOME: &str = "/admin";

#[derive(Template)]
#[template(path = "admin/dashboard.html")]
struct AdminDashboardTemplate {
    members: Vec<Member>,
    trainers: Vec<TrainerWithSalary>,
    equipment: Vec<Equipment>,
    schemes: Vec<Scheme>,
    flash: Option<Flash>,
}

async fn dashboard(
    State(state): State<AppState>,
    session: Session,
) -> Result<AdminDashboardTemplate> {
    Ok(AdminDashboardTemplate {
        members: Member::list_all(&state.pool).await?,
        trainers: Trainer::list_with_salary(&state.pool).await?,
        equipment: Equipment::list_all(&state.pool).await?,
        schemes: Scheme::list_all(&state.pool).await?,
        flash: take_flash(&session).await?,
    })
}

/// Field/value pair posted by every update form
#[derive(Deserialize)]
struct UpdateForm<F> {
    field: F,
    value: String,
}

fn not_found(kind: &str, id: i32) -> AppError {
    AppError::NotFound(format!("{} {}", kind, id))
}

async fn finish<T>(
    session: &Session,
    outcome: Result<T>,
    on_success: impl FnOnce(T) -> String,
) -> Result<Redirect> {
    flash_outcome(session, outcome, on_success).await?;
    Ok(Redirect::to(ADMIN_HOME))
}

// Members

#[derive(Deserialize)]
struct AddMemberForm {
    member_name: String,
    gender: String,
    phone: String,
    email: String,
    password: String,
    #[serde(default)]
    scheme_id: String,
    #[serde(default)]
    trainer_id: String,
    height_cm: String,
    weight_kg: String,
    age: String,
}

impl AddMemberForm {
    fn to_data(&self) -> Result<CreateMemberData> {
        Ok(CreateMemberData {
            member_name: parse_text("name", &self.member_name)?,
            gender: Gender::parse(&self.gender)?,
            phone: parse_text("phone", &self.phone)?,
            email: parse_text("email", &self.email)?,
            scheme_id: parse_optional_id("scheme id", &self.scheme_id)?,
            trainer_id: parse_optional_id("trainer id", &self.trainer_id)?,
            height_cm: parse_number("height", &self.height_cm)?,
            weight_kg: parse_number("weight", &self.weight_kg)?,
            age: parse_number("age", &self.age)?,
        })
    }
}

async fn add_member(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AddMemberForm>,
) -> Result<Redirect> {
    let outcome = match form.to_data() {
        Ok(data) => accounts::register_member(&state.pool, data, &form.password).await,
        Err(e) => Err(e),
    };

    finish(&session, outcome, |member| {
        format!("Member {} added with id {}.", member.member_name, member.member_id)
    })
    .await
}

/// Returns the flash message for a successful update
async fn apply_member_update(
    state: &AppState,
    member_id: i32,
    update: MemberUpdate,
) -> Result<String> {
    match update {
        MemberUpdate::Status(requested) => {
            let store = PgMembershipStore::new(state.pool.clone());
            let today = chrono::Local::now().date_naive();
            let evaluation = accounts::override_status(
                &store,
                &state.config.policy,
                member_id,
                requested,
                today,
            )
            .await?;

            return Ok(if evaluation.status == requested {
                format!("Member {} is {}.", member_id, evaluation.status)
            } else {
                format!(
                    "Member {} stays {} based on payment history.",
                    member_id, evaluation.status
                )
            });
        }
        MemberUpdate::Email(ref email) => {
            if LoginAccount::email_exists(&state.pool, email).await? {
                return Err(AppError::Conflict("Email already exists!".to_string()));
            }
        }
        _ => {}
    }

    let touched = Member::apply_update(&state.pool, member_id, update)
        .await
        .map_err(AppError::from_write)?;
    if touched == 0 {
        return Err(not_found("member", member_id));
    }
    Ok(format!("Member {} updated.", member_id))
}

async fn update_member(
    State(state): State<AppState>,
    Path(member_id): Path<i32>,
    session: Session,
    Form(form): Form<UpdateForm<MemberField>>,
) -> Result<Redirect> {
    let outcome = match MemberUpdate::parse(form.field, &form.value) {
        Ok(update) => apply_member_update(&state, member_id, update).await,
        Err(e) => Err(e.into()),
    };

    finish(&session, outcome, |message| message).await
}

async fn remove_member(
    State(state): State<AppState>,
    Path(member_id): Path<i32>,
    session: Session,
) -> Result<Redirect> {
    let outcome = match Member::delete(&state.pool, member_id).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(not_found("member", member_id)),
        Err(e) => Err(AppError::from_write(e)),
    };

    finish(&session, outcome, |_| format!("Member {} removed.", member_id)).await
}

// Trainers

#[derive(Deserialize)]
struct AddTrainerForm {
    trainer_name: String,
    gender: String,
    phone: String,
    email: String,
    password: String,
    salary: String,
}

impl AddTrainerForm {
    fn to_data(&self) -> Result<(CreateTrainerData, i64)> {
        let data = CreateTrainerData {
            trainer_name: parse_text("name", &self.trainer_name)?,
            gender: Gender::parse(&self.gender)?,
            phone: parse_text("phone", &self.phone)?,
            email: parse_text("email", &self.email)?,
        };
        Ok((data, parse_number("salary", &self.salary)?))
    }
}

async fn add_trainer(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AddTrainerForm>,
) -> Result<Redirect> {
    let outcome = match form.to_data() {
        Ok((data, salary)) => {
            accounts::register_trainer(&state.pool, data, &form.password, salary).await
        }
        Err(e) => Err(e),
    };

    finish(&session, outcome, |trainer| {
        format!("Trainer {} added with id {}.", trainer.trainer_name, trainer.trainer_id)
    })
    .await
}

async fn update_trainer(
    State(state): State<AppState>,
    Path(trainer_id): Path<i32>,
    session: Session,
    Form(form): Form<UpdateForm<TrainerField>>,
) -> Result<Redirect> {
    let outcome = match TrainerUpdate::parse(form.field, &form.value) {
        Ok(update) => accounts::update_trainer(&state.pool, trainer_id, update).await,
        Err(e) => Err(e.into()),
    };

    finish(&session, outcome, |_| format!("Trainer {} updated.", trainer_id)).await
}

#[derive(Deserialize)]
struct SalaryForm {
    salary: String,
}

async fn set_salary(state: &AppState, trainer_id: i32, raw: &str) -> Result<i64> {
    let salary: i64 = parse_number("salary", raw)?;
    if salary < 0 {
        return Err(AppError::Validation("Salary cannot be negative".to_string()));
    }
    if Trainer::set_salary(&state.pool, trainer_id, salary).await? == 0 {
        return Err(not_found("trainer", trainer_id));
    }
    Ok(salary)
}

async fn update_salary(
    State(state): State<AppState>,
    Path(trainer_id): Path<i32>,
    session: Session,
    Form(form): Form<SalaryForm>,
) -> Result<Redirect> {
    let outcome = set_salary(&state, trainer_id, &form.salary).await;

    finish(&session, outcome, |salary| {
        format!("Salary of trainer {} set to {}.", trainer_id, salary)
    })
    .await
}

async fn remove_trainer(
    State(state): State<AppState>,
    Path(trainer_id): Path<i32>,
    session: Session,
) -> Result<Redirect> {
    let outcome = match Trainer::delete(&state.pool, trainer_id).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(not_found("trainer", trainer_id)),
        Err(e) => Err(AppError::from_write(e)),
    };

    finish(&session, outcome, |_| format!("Trainer {} removed.", trainer_id)).await
}

// Equipment

#[derive(Deserialize)]
struct AddEquipmentForm {
    equipment_name: String,
    quantity: String,
}

async fn create_equipment(state: &AppState, form: &AddEquipmentForm) -> Result<Equipment> {
    let name = parse_text("equipment name", &form.equipment_name)?;
    // Same bounds as an update to the quantity field
    let EquipmentUpdate::Quantity(quantity) =
        EquipmentUpdate::parse(EquipmentField::Quantity, &form.quantity)?
    else {
        return Err(AppError::Validation("invalid quantity".to_string()));
    };
    Equipment::create(&state.pool, &name, quantity)
        .await
        .map_err(AppError::from_write)
}

async fn add_equipment(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AddEquipmentForm>,
) -> Result<Redirect> {
    let outcome = create_equipment(&state, &form).await;

    finish(&session, outcome, |equipment| {
        format!("Equipment '{}' added.", equipment.equipment_name)
    })
    .await
}

async fn update_equipment(
    State(state): State<AppState>,
    Path(equipment_id): Path<i32>,
    session: Session,
    Form(form): Form<UpdateForm<EquipmentField>>,
) -> Result<Redirect> {
    let outcome = match EquipmentUpdate::parse(form.field, &form.value) {
        Ok(update) => match Equipment::apply_update(&state.pool, equipment_id, update).await {
            Ok(0) => Err(not_found("equipment", equipment_id)),
            Ok(_) => Ok(()),
            Err(e) => Err(AppError::from_write(e)),
        },
        Err(e) => Err(e.into()),
    };

    finish(&session, outcome, |_| format!("Equipment {} updated.", equipment_id)).await
}

async fn remove_equipment(
    State(state): State<AppState>,
    Path(equipment_id): Path<i32>,
    session: Session,
) -> Result<Redirect> {
    let outcome = match Equipment::delete(&state.pool, equipment_id).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(not_found("equipment", equipment_id)),
        Err(e) => Err(AppError::from_write(e)),
    };

    finish(&session, outcome, |_| format!("Equipment {} removed.", equipment_id)).await
}

// Membership schemes

#[derive(Deserialize)]
struct AddSchemeForm {
    scheme_name: String,
    duration_months: String,
    fee: String,
}

impl AddSchemeForm {
    fn to_data(&self) -> Result<CreateSchemeData> {
        let duration_months = match SchemeUpdate::parse(SchemeField::DurationMonths, &self.duration_months)? {
            SchemeUpdate::DurationMonths(months) => months,
            _ => return Err(AppError::Validation("invalid duration".to_string())),
        };
        let fee = match SchemeUpdate::parse(SchemeField::Fee, &self.fee)? {
            SchemeUpdate::Fee(fee) => fee,
            _ => return Err(AppError::Validation("invalid fee".to_string())),
        };
        Ok(CreateSchemeData {
            scheme_name: parse_text("scheme name", &self.scheme_name)?,
            duration_months,
            fee,
        })
    }
}

async fn add_scheme(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AddSchemeForm>,
) -> Result<Redirect> {
    let outcome = match form.to_data() {
        Ok(data) => Scheme::create(&state.pool, data)
            .await
            .map_err(AppError::from_write),
        Err(e) => Err(e),
    };

    finish(&session, outcome, |scheme| {
        format!("Scheme '{}' added.", scheme.scheme_name)
    })
    .await
}

async fn update_scheme(
    State(state): State<AppState>,
    Path(scheme_id): Path<i32>,
    session: Session,
    Form(form): Form<UpdateForm<SchemeField>>,
) -> Result<Redirect> {
    let outcome = match SchemeUpdate::parse(form.field, &form.value) {
        Ok(update) => match Scheme::apply_update(&state.pool, scheme_id, update).await {
            Ok(0) => Err(not_found("scheme", scheme_id)),
            Ok(_) => Ok(()),
            Err(e) => Err(AppError::from_write(e)),
        },
        Err(e) => Err(e.into()),
    };

    finish(&session, outcome, |_| format!("Scheme {} updated.", scheme_id)).await
}

async fn remove_scheme(
    State(state): State<AppState>,
    Path(scheme_id): Path<i32>,
    session: Session,
) -> Result<Redirect> {
    let outcome = match Scheme::delete(&state.pool, scheme_id).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(not_found("scheme", scheme_id)),
        Err(e) => Err(AppError::from_write(e)),
    };

    finish(&session, outcome, |_| format!("Scheme {} removed.", scheme_id)).await
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin", get(dashboard))
        .route("/admin/members", post(add_member))
        .route("/admin/members/:id/update", post(update_member))
        .route("/admin/members/:id/delete", post(remove_member))
        .route("/admin/trainers", post(add_trainer))
        .route("/admin/trainers/:id/update", post(update_trainer))
        .route("/admin/trainers/:id/salary", post(update_salary))
        .route("/admin/trainers/:id/delete", post(remove_trainer))
        .route("/admin/equipment", post(add_equipment))
        .route("/admin/equipment/:id/update", post(update_equipment))
        .route("/admin/equipment/:id/delete", post(remove_equipment))
        .route("/admin/schemes", post(add_scheme))
        .route("/admin/schemes/:id/update", post(update_scheme))
        .route("/admin/schemes/:id/delete", post(remove_scheme))
        .route_layer(middleware::from_fn(require_admin))
}
