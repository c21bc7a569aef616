use askama::Template;
use axum::{extract::State, response::Redirect, routing::{get, post}, Form, Router};
use serde::Deserialize;
use tower_sessions::Session;

use crate::api::middleware::auth::{get_authenticated, profile_id};
use crate::api::middleware::session::{flash_outcome, take_flash, AppState, Flash};
use crate::error::{AppError, Result};
use crate::models::types::parse_number;
use crate::models::{Member, Payment, PaymentMethod, Role, Scheme, Trainer};
use crate::services::membership_status::{self, PgMembershipStore};
use crate::services::payments::{self, PaymentReceipt};
use crate::services::policy::PaymentRule;
use crate::services::portal::{self, Gated, ScheduleView};

#[derive(Template)]
#[template(path = "member/dashboard.html")]
struct MemberDashboardTemplate {
    member: Member,
    trainer: Option<Trainer>,
    scheme: Option<Scheme>,
    schedule: ScheduleView,
    payments: Vec<Payment>,
    /// Fixed amount to pay under the scheme-fee rule
    expected_amount: Option<i64>,
    minimum_amount: Option<i64>,
    methods: [PaymentMethod; 3],
    flash: Option<Flash>,
}

async fn dashboard(
    State(state): State<AppState>,
    session: Session,
) -> Result<MemberDashboardTemplate> {
    let auth = get_authenticated(&session, Role::Member).await?;
    let member_id = profile_id(&auth)?;

    let today = chrono::Local::now().date_naive();
    let store = PgMembershipStore::new(state.pool.clone());
    let policy = &state.config.policy;

    membership_status::evaluate(&store, policy, member_id, today).await?;

    // Reload so the rendered status is the one just written
    let member = Member::find_by_id(&state.pool, member_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("member {}", member_id)))?;

    let trainer = match member.trainer_id {
        Some(id) => Trainer::find_by_id(&state.pool, id).await?,
        None => None,
    };
    let scheme = match member.scheme_id {
        Some(id) => Scheme::find_by_id(&state.pool, id).await?,
        None => None,
    };

    let schedule = portal::schedule_view(&store, &member, today).await?;
    let payments = Payment::list_for_member(&state.pool, member_id).await?;
    let expected_amount = payments::expected_amount(&store, policy.payment_rule, member_id).await?;
    let minimum_amount = match policy.payment_rule {
        PaymentRule::Minimum(minimum) => Some(minimum),
        PaymentRule::SchemeFee => None,
    };

    Ok(MemberDashboardTemplate {
        member,
        trainer,
        scheme,
        schedule,
        payments,
        expected_amount,
        minimum_amount,
        methods: PaymentMethod::ALL,
        flash: take_flash(&session).await?,
    })
}

#[derive(Deserialize)]
struct PaymentForm {
    amount: String,
    method: PaymentMethod,
}

async fn make_payment(
    state: &AppState,
    member_id: i32,
    form: PaymentForm,
) -> Result<PaymentReceipt> {
    let amount: i64 = parse_number("amount", &form.amount)?;
    if amount <= 0 {
        return Err(AppError::Validation("Amount must be positive".to_string()));
    }

    let store = PgMembershipStore::new(state.pool.clone());
    let today = chrono::Local::now().date_naive();

    Ok(payments::submit_payment(
        &store,
        &state.config.policy,
        member_id,
        amount,
        form.method,
        today,
    )
    .await?)
}

async fn submit_payment(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<PaymentForm>,
) -> Result<Redirect> {
    let auth = get_authenticated(&session, Role::Member).await?;
    let member_id = profile_id(&auth)?;

    let outcome = make_payment(&state, member_id, form).await;
    flash_outcome(&session, outcome, |receipt| {
        format!(
            "Payment of {} received by {}. Membership is {}.",
            receipt.payment.amount, receipt.payment.payment_method, receipt.evaluation.status
        )
    })
    .await?;

    Ok(Redirect::to("/member"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/member", get(dashboard))
        .route("/member/payments", post(submit_payment))
}
