//! Member-facing views. Class and workout details are only looked up for active members.

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::instrument;

use crate::models::{ClassSummary, Member, MembershipStatus, WorkoutPlan};
use crate::services::membership_status::PgMembershipStore;

pub const INACTIVE_CLASS_MESSAGE: &str =
    "Your membership is inactive. Please make a payment to view classes.";
pub const INACTIVE_WORKOUT_MESSAGE: &str =
    "Your membership is inactive. Please make a payment to view workout plans.";

/// Class lookups behind the member dashboard
#[async_trait]
pub trait PortalStore: Send + Sync {
    async fn class_summary(&self, class_id: i32) -> Result<Option<ClassSummary>, sqlx::Error>;

    /// Earliest class of the trainer dated on or after `today`
    async fn next_class_for_trainer(
        &self,
        trainer_id: i32,
        today: NaiveDate,
    ) -> Result<Option<ClassSummary>, sqlx::Error>;

    async fn workout_plan(&self, class_id: i32) -> Result<Vec<WorkoutPlan>, sqlx::Error>;
}

#[async_trait]
impl PortalStore for PgMembershipStore {
    async fn class_summary(&self, class_id: i32) -> Result<Option<ClassSummary>, sqlx::Error> {
        ClassSummary::find_by_id(self.pool(), class_id).await
    }

    async fn next_class_for_trainer(
        &self,
        trainer_id: i32,
        today: NaiveDate,
    ) -> Result<Option<ClassSummary>, sqlx::Error> {
        ClassSummary::next_for_trainer(self.pool(), trainer_id, today).await
    }

    async fn workout_plan(&self, class_id: i32) -> Result<Vec<WorkoutPlan>, sqlx::Error> {
        WorkoutPlan::for_class(self.pool(), class_id).await
    }
}

/// Content hidden behind an active membership
#[derive(Debug, Clone, PartialEq)]
pub enum Gated<T> {
    Visible(T),
    Locked(&'static str),
}

/// Runs `load` only when the status allows it
pub async fn gate<T, F, Fut>(
    status: MembershipStatus,
    locked_message: &'static str,
    load: F,
) -> Result<Gated<T>, sqlx::Error>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T, sqlx::Error>>,
{
    if status.is_active() {
        Ok(Gated::Visible(load().await?))
    } else {
        Ok(Gated::Locked(locked_message))
    }
}

/// The member's assigned class, or else their trainer's next class from `today` on
async fn resolve_upcoming_class<S>(
    store: &S,
    member: &Member,
    today: NaiveDate,
) -> Result<Option<ClassSummary>, sqlx::Error>
where
    S: PortalStore + ?Sized,
{
    if let Some(class_id) = member.class_id {
        return store.class_summary(class_id).await;
    }
    match member.trainer_id {
        Some(trainer_id) => store.next_class_for_trainer(trainer_id, today).await,
        None => Ok(None),
    }
}

#[derive(Debug, Clone)]
pub struct ScheduleView {
    pub upcoming_class: Gated<Option<ClassSummary>>,
    pub workout_plan: Gated<Vec<WorkoutPlan>>,
}

/// Class and workout sections of the member dashboard.
/// `member` must carry a freshly evaluated status.
#[instrument(skip(store, member), fields(member_id = member.member_id))]
pub async fn schedule_view<S>(
    store: &S,
    member: &Member,
    today: NaiveDate,
) -> Result<ScheduleView, sqlx::Error>
where
    S: PortalStore + ?Sized,
{
    let status = member.membership_status;

    let upcoming_class = gate(status, INACTIVE_CLASS_MESSAGE, || {
        resolve_upcoming_class(store, member, today)
    })
    .await?;

    let workout_plan = gate(status, INACTIVE_WORKOUT_MESSAGE, || async {
        let class_id = match &upcoming_class {
            Gated::Visible(Some(class)) => class.class_id,
            _ => return Ok(Vec::new()),
        };
        store.workout_plan(class_id).await
    })
    .await?;

    Ok(ScheduleView {
        upcoming_class,
        workout_plan,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Gender;
    use crate::services::membership_status::testing::MemoryStore;

    #[async_trait]
    impl PortalStore for MemoryStore {
        async fn class_summary(&self, class_id: i32) -> Result<Option<ClassSummary>, sqlx::Error> {
            *self.class_queries.lock().unwrap() += 1;
            Ok(self
                .classes
                .lock()
                .unwrap()
                .iter()
                .find(|(class, _)| class.class_id == class_id)
                .map(|(class, name)| ClassSummary {
                    class_id: class.class_id,
                    class_date: class.class_date,
                    workout_name: name.clone(),
                }))
        }

        async fn next_class_for_trainer(
            &self,
            trainer_id: i32,
            today: NaiveDate,
        ) -> Result<Option<ClassSummary>, sqlx::Error> {
            *self.class_queries.lock().unwrap() += 1;
            Ok(self
                .classes
                .lock()
                .unwrap()
                .iter()
                .filter(|(class, _)| class.trainer_id == trainer_id && class.class_date >= today)
                .min_by_key(|(class, _)| (class.class_date, class.class_id))
                .map(|(class, name)| ClassSummary {
                    class_id: class.class_id,
                    class_date: class.class_date,
                    workout_name: name.clone(),
                }))
        }

        async fn workout_plan(&self, class_id: i32) -> Result<Vec<WorkoutPlan>, sqlx::Error> {
            *self.class_queries.lock().unwrap() += 1;
            Ok(self
                .workout_plans
                .lock()
                .unwrap()
                .get(&class_id)
                .cloned()
                .unwrap_or_default())
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn member(status: MembershipStatus, trainer_id: Option<i32>, class_id: Option<i32>) -> Member {
        Member {
            member_id: 1,
            member_name: "Asha".to_string(),
            gender: Gender::F,
            phone: "98765".to_string(),
            email: "asha@gym.test".to_string(),
            scheme_id: None,
            membership_status: status,
            trainer_id,
            height_cm: 160.0,
            weight_kg: 60.0,
            bmi: 23.4,
            payment_id: None,
            age: 29,
            class_id,
        }
    }

    fn plan(workout: &str, equipment: &str) -> WorkoutPlan {
        WorkoutPlan {
            workout_name: workout.to_string(),
            equipment_name: equipment.to_string(),
        }
    }

    #[tokio::test]
    async fn test_inactive_member_never_queries() {
        let store = MemoryStore::default();
        store.add_class(7, date(2024, 6, 3), "Spin");

        let view = schedule_view(
            &store,
            &member(MembershipStatus::Inactive, Some(7), None),
            date(2024, 6, 1),
        )
        .await
        .unwrap();

        assert_eq!(view.upcoming_class, Gated::Locked(INACTIVE_CLASS_MESSAGE));
        assert_eq!(view.workout_plan, Gated::Locked(INACTIVE_WORKOUT_MESSAGE));
        assert_eq!(*store.class_queries.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_assigned_class_wins_over_trainer_schedule() {
        let store = MemoryStore::default();
        let assigned = store.add_class(7, date(2024, 5, 20), "Rowing");
        let upcoming = store.add_class(7, date(2024, 6, 3), "Spin");
        store
            .workout_plans
            .lock()
            .unwrap()
            .insert(assigned, vec![plan("Rowing", "Rower")]);

        let view = schedule_view(
            &store,
            &member(MembershipStatus::Active, Some(7), Some(assigned)),
            date(2024, 6, 1),
        )
        .await
        .unwrap();

        match view.upcoming_class {
            Gated::Visible(Some(class)) => {
                assert_eq!(class.class_id, assigned);
                assert_ne!(class.class_id, upcoming);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(view.workout_plan, Gated::Visible(vec![plan("Rowing", "Rower")]));
    }

    #[tokio::test]
    async fn test_falls_back_to_next_trainer_class() {
        let store = MemoryStore::default();
        store.add_class(7, date(2024, 5, 20), "Rowing");
        let later = store.add_class(7, date(2024, 6, 10), "Yoga");
        let sooner = store.add_class(7, date(2024, 6, 1), "Spin");
        store.add_class(8, date(2024, 6, 2), "Boxing");

        let view = schedule_view(
            &store,
            &member(MembershipStatus::Active, Some(7), None),
            date(2024, 6, 1),
        )
        .await
        .unwrap();

        match view.upcoming_class {
            Gated::Visible(Some(class)) => {
                assert_eq!(class.class_id, sooner);
                assert_eq!(class.workout_name, "Spin");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_ne!(sooner, later);
    }

    #[tokio::test]
    async fn test_only_past_classes_means_none() {
        let store = MemoryStore::default();
        store.add_class(7, date(2024, 5, 20), "Rowing");

        let view = schedule_view(
            &store,
            &member(MembershipStatus::Active, Some(7), None),
            date(2024, 6, 1),
        )
        .await
        .unwrap();

        assert_eq!(view.upcoming_class, Gated::Visible(None));
        assert_eq!(view.workout_plan, Gated::Visible(Vec::new()));
    }

    #[tokio::test]
    async fn test_no_trainer_no_class() {
        let store = MemoryStore::default();

        let view = schedule_view(
            &store,
            &member(MembershipStatus::Active, None, None),
            date(2024, 6, 1),
        )
        .await
        .unwrap();

        assert_eq!(view.upcoming_class, Gated::Visible(None));
        assert_eq!(*store.class_queries.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_load_errors_propagate() {
        let result: Result<Gated<()>, _> =
            gate(MembershipStatus::Active, INACTIVE_CLASS_MESSAGE, || async {
                Err(sqlx::Error::RowNotFound)
            })
            .await;

        assert!(matches!(result, Err(sqlx::Error::RowNotFound)));
    }
}
