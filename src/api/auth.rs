use askama::Template;
use axum::{
    extract::{Path, State},
    response::Redirect,
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::api::middleware::session::{
    set_flash, take_flash, AppState, AuthSession, Flash, SESSION_KEY_AUTH,
};
use crate::error::{AppError, Result};
use crate::models::{LoginAccount, Member, Role, Trainer};
use crate::services::credentials;
use crate::services::membership_status::{self, PgMembershipStore};

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    flash: Option<Flash>,
}

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    role: Role,
    flash: Option<Flash>,
}

async fn index_page(session: Session) -> Result<IndexTemplate> {
    Ok(IndexTemplate {
        flash: take_flash(&session).await?,
    })
}

async fn login_page(Path(role): Path<Role>, session: Session) -> Result<LoginTemplate> {
    Ok(LoginTemplate {
        role,
        flash: take_flash(&session).await?,
    })
}

#[derive(Deserialize)]
struct LoginForm {
    email: String,
    password: String,
}

/// Resolves the profile row behind a login. Members are re-evaluated on the way in.
async fn profile_for(state: &AppState, account: &LoginAccount) -> Result<Option<i32>> {
    match account.category {
        Role::Member => {
            let member = Member::find_by_email(&state.pool, &account.email)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("member profile for {}", account.email)))?;

            let store = PgMembershipStore::new(state.pool.clone());
            let today = chrono::Local::now().date_naive();
            membership_status::evaluate(&store, &state.config.policy, member.member_id, today)
                .await?;

            Ok(Some(member.member_id))
        }
        Role::Trainer => {
            let trainer = Trainer::find_by_email(&state.pool, &account.email)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("trainer profile for {}", account.email)))?;
            Ok(Some(trainer.trainer_id))
        }
        Role::Admin => Ok(None),
    }
}

async fn login(
    State(state): State<AppState>,
    Path(role): Path<Role>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Redirect> {
    let email = form.email.trim();

    let Some(account) = credentials::authenticate(&state.pool, email, &form.password, role).await?
    else {
        set_flash(&session, Flash::error("Invalid credentials")).await?;
        return Ok(Redirect::to(&format!("/login/{}", role.slug())));
    };

    let profile_id = profile_for(&state, &account).await?;

    session.cycle_id().await?;
    session
        .insert(
            SESSION_KEY_AUTH,
            AuthSession {
                role,
                email: account.email.clone(),
                profile_id,
            },
        )
        .await?;

    tracing::info!(email = %account.email, role = %role, "Login successful");

    Ok(Redirect::to(&format!("/{}", role.slug())))
}

async fn logout(session: Session) -> Result<Redirect> {
    session.flush().await?;
    Ok(Redirect::to("/"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index_page))
        .route("/login/:role", get(login_page).post(login))
        .route("/logout", post(logout))
}
