use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::models::{
    member::CreateMemberData,
    trainer::{CreateTrainerData, TrainerUpdate},
    LoginAccount, Member, MembershipStatus, Role, Trainer,
};
use crate::services::credentials::hash_password;
use crate::services::membership_status::{self, MembershipStore, StatusError, StatusEvaluation};
use crate::services::policy::MembershipPolicy;

/// Creates the login and the member record together. The member starts Inactive.
#[instrument(skip(pool, data, password), fields(email = %data.email))]
pub async fn register_member(pool: &PgPool, data: CreateMemberData, password: &str) -> Result<Member> {
    if LoginAccount::email_exists(pool, &data.email).await? {
        return Err(AppError::Conflict("Email already exists!".to_string()));
    }

    let password_hash = hash_password(password)?;

    let mut tx = pool.begin().await?;
    LoginAccount::create(&mut tx, &data.email, &password_hash, Role::Member).await?;
    let member = Member::create(&mut tx, data).await?;
    tx.commit().await?;

    tracing::info!(member_id = member.member_id, "Member registered");

    Ok(member)
}

/// Creates login, trainer and salary rows in one transaction
#[instrument(skip(pool, data, password), fields(email = %data.email))]
pub async fn register_trainer(
    pool: &PgPool,
    data: CreateTrainerData,
    password: &str,
    salary: i64,
) -> Result<Trainer> {
    if salary < 0 {
        return Err(AppError::Validation("Salary cannot be negative".to_string()));
    }
    if LoginAccount::email_exists(pool, &data.email).await? {
        return Err(AppError::Conflict("Email already exists!".to_string()));
    }

    let password_hash = hash_password(password)?;

    let mut tx = pool.begin().await?;
    LoginAccount::create(&mut tx, &data.email, &password_hash, Role::Trainer).await?;
    let trainer = Trainer::create(&mut tx, data).await?;
    Trainer::insert_salary(&mut tx, trainer.trainer_id, salary).await?;
    tx.commit().await?;

    tracing::info!(trainer_id = trainer.trainer_id, "Trainer registered");

    Ok(trainer)
}

#[instrument(skip(pool, update))]
pub async fn update_trainer(pool: &PgPool, trainer_id: i32, update: TrainerUpdate) -> Result<()> {
    let touched = match update {
        TrainerUpdate::Profile(profile) => Trainer::update_profile(pool, trainer_id, profile).await?,
        TrainerUpdate::Password(password) => {
            let trainer = Trainer::find_by_id(pool, trainer_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("trainer {}", trainer_id)))?;
            let password_hash = hash_password(&password)?;
            LoginAccount::set_password_hash(pool, &trainer.email, &password_hash).await?
        }
    };

    if touched == 0 {
        return Err(AppError::NotFound(format!("trainer {}", trainer_id)));
    }

    tracing::info!(trainer_id, "Trainer updated");

    Ok(())
}

/// Writes a status chosen by an administrator, then re-evaluates at once so the
/// stored value still follows payment history. The returned evaluation is what sticks.
#[instrument(skip(store, policy))]
pub async fn override_status<S>(
    store: &S,
    policy: &MembershipPolicy,
    member_id: i32,
    requested: MembershipStatus,
    today: NaiveDate,
) -> std::result::Result<StatusEvaluation, StatusError>
where
    S: MembershipStore + ?Sized,
{
    if store.set_member_status(member_id, requested).await? == 0 {
        return Err(StatusError::NotFound(member_id));
    }

    let evaluation = membership_status::evaluate(store, policy, member_id, today).await?;
    if evaluation.status != requested {
        tracing::warn!(
            member_id,
            requested = %requested,
            status = %evaluation.status,
            "Manual status reverted by payment history"
        );
    }

    Ok(evaluation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::membership_status::testing::MemoryStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_manual_active_without_payment_reverts() {
        let store = MemoryStore::with_member(1, MembershipStatus::Inactive);

        let evaluation = override_status(
            &store,
            &MembershipPolicy::default(),
            1,
            MembershipStatus::Active,
            date(2024, 6, 1),
        )
        .await
        .unwrap();

        assert_eq!(evaluation.status, MembershipStatus::Inactive);
        assert_eq!(store.status_of(1), Some(MembershipStatus::Inactive));
    }

    #[tokio::test]
    async fn test_manual_inactive_with_recent_payment_reverts() {
        let store = MemoryStore::with_member(1, MembershipStatus::Active);
        store.add_payment(1, date(2024, 4, 2));

        let evaluation = override_status(
            &store,
            &MembershipPolicy::default(),
            1,
            MembershipStatus::Inactive,
            date(2024, 6, 1),
        )
        .await
        .unwrap();

        assert_eq!(evaluation.status, MembershipStatus::Active);
        assert_eq!(store.status_of(1), Some(MembershipStatus::Active));
        assert_eq!(*store.status_writes.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_override_unknown_member() {
        let store = MemoryStore::default();

        let result = override_status(
            &store,
            &MembershipPolicy::default(),
            42,
            MembershipStatus::Active,
            date(2024, 6, 1),
        )
        .await;

        assert!(matches!(result, Err(StatusError::NotFound(42))));
    }
}
