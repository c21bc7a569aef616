use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::instrument;

use crate::models::{GymClass, Member, MembershipStatus};
use crate::services::membership_status::{self, MembershipStore, PgMembershipStore, StatusError};
use crate::services::policy::{ClassAssignment, MembershipPolicy};

/// Store operations class scheduling needs beyond status evaluation
#[async_trait]
pub trait ClassStore: MembershipStore {
    async fn trainer_member_ids(&self, trainer_id: i32) -> Result<Vec<i32>, sqlx::Error>;

    /// Inserts the class and makes it the upcoming class of `member_ids`, atomically
    async fn create_class(
        &self,
        trainer_id: i32,
        class_date: NaiveDate,
        workout_id: i32,
        member_ids: &[i32],
    ) -> Result<ScheduledClass, sqlx::Error>;
}

#[async_trait]
impl ClassStore for PgMembershipStore {
    async fn trainer_member_ids(&self, trainer_id: i32) -> Result<Vec<i32>, sqlx::Error> {
        Member::ids_for_trainer(self.pool(), trainer_id).await
    }

    async fn create_class(
        &self,
        trainer_id: i32,
        class_date: NaiveDate,
        workout_id: i32,
        member_ids: &[i32],
    ) -> Result<ScheduledClass, sqlx::Error> {
        let mut tx = self.pool().begin().await?;

        let class = GymClass::create(&mut tx, trainer_id, class_date, workout_id).await?;
        let members_assigned =
            Member::assign_class(&mut tx, trainer_id, class.class_id, member_ids).await?;

        tx.commit().await?;

        Ok(ScheduledClass {
            class,
            members_assigned,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ScheduledClass {
    pub class: GymClass,
    /// Members whose upcoming class now points at this one
    pub members_assigned: u64,
}

/// Members that should receive the class. Active-only assignment evaluates
/// every candidate as of `today` rather than trusting the stored status.
async fn eligible_members<S>(
    store: &S,
    policy: &MembershipPolicy,
    candidates: Vec<i32>,
    today: NaiveDate,
) -> Result<Vec<i32>, StatusError>
where
    S: ClassStore + ?Sized,
{
    if policy.class_assignment == ClassAssignment::AllMembers {
        return Ok(candidates);
    }

    let mut eligible = Vec::with_capacity(candidates.len());
    for member_id in candidates {
        match membership_status::evaluate(store, policy, member_id, today).await {
            Ok(evaluation) if evaluation.status == MembershipStatus::Active => {
                eligible.push(member_id)
            }
            Ok(_) => {}
            // Removed between listing and evaluation
            Err(StatusError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
    }

    Ok(eligible)
}

/// Inserts a class and makes it the upcoming class of the trainer's eligible members
#[instrument(skip(store, policy))]
pub async fn schedule_class<S>(
    store: &S,
    policy: &MembershipPolicy,
    trainer_id: i32,
    class_date: NaiveDate,
    workout_id: i32,
    today: NaiveDate,
) -> Result<ScheduledClass, StatusError>
where
    S: ClassStore + ?Sized,
{
    let candidates = store.trainer_member_ids(trainer_id).await?;
    let eligible = eligible_members(store, policy, candidates, today).await?;

    let scheduled = store
        .create_class(trainer_id, class_date, workout_id, &eligible)
        .await?;

    tracing::info!(
        class_id = scheduled.class.class_id,
        trainer_id,
        members_assigned = scheduled.members_assigned,
        "Class scheduled"
    );

    Ok(scheduled)
}
