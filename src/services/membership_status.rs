use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use crate::models::{Member, MembershipStatus, Payment};
use crate::services::policy::MembershipPolicy;

#[derive(Error, Debug)]
pub enum StatusError {
    #[error("Member {0} not found")]
    NotFound(i32),

    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),
}

/// Narrow view of the store the evaluator reads from and writes to
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Payment with the greatest date for the member, if any
    async fn latest_payment(&self, member_id: i32) -> Result<Option<Payment>, sqlx::Error>;

    /// Overwrites the member's status, returning the number of rows written
    async fn set_member_status(
        &self,
        member_id: i32,
        status: MembershipStatus,
    ) -> Result<u64, sqlx::Error>;
}

/// PostgreSQL implementation of MembershipStore
#[derive(Clone)]
pub struct PgMembershipStore {
    pool: PgPool,
}

impl PgMembershipStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl MembershipStore for PgMembershipStore {
    async fn latest_payment(&self, member_id: i32) -> Result<Option<Payment>, sqlx::Error> {
        Payment::find_latest_for_member(&self.pool, member_id).await
    }

    async fn set_member_status(
        &self,
        member_id: i32,
        status: MembershipStatus,
    ) -> Result<u64, sqlx::Error> {
        Member::set_status(&self.pool, member_id, status).await
    }
}

/// Outcome of one evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusEvaluation {
    pub status: MembershipStatus,
    /// Date of the payment the decision was based on
    pub reference_date: Option<NaiveDate>,
}

/// Calendar-month distance, ignoring the day of month
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i32 {
    (to.year() - from.year()) * 12 + (to.month() as i32 - from.month() as i32)
}

pub fn status_for(
    last_payment: Option<NaiveDate>,
    as_of: NaiveDate,
    lapse_after_months: i32,
) -> MembershipStatus {
    match last_payment {
        Some(paid_on) if months_between(paid_on, as_of) <= lapse_after_months => {
            MembershipStatus::Active
        }
        _ => MembershipStatus::Inactive,
    }
}

/// Recomputes a member's status from their latest payment and persists it.
///
/// The write happens on every call, even when the status is unchanged.
/// Store failures are returned as-is; nothing is retried.
#[instrument(skip(store, policy))]
pub async fn evaluate<S>(
    store: &S,
    policy: &MembershipPolicy,
    member_id: i32,
    as_of: NaiveDate,
) -> Result<StatusEvaluation, StatusError>
where
    S: MembershipStore + ?Sized,
{
    let reference_date = store
        .latest_payment(member_id)
        .await?
        .map(|payment| payment.payment_date);

    let status = status_for(reference_date, as_of, policy.lapse_after_months);

    let written = store.set_member_status(member_id, status).await?;
    if written == 0 {
        return Err(StatusError::NotFound(member_id));
    }

    tracing::debug!(
        member_id,
        status = %status,
        reference_date = ?reference_date,
        "Membership status evaluated"
    );

    Ok(StatusEvaluation {
        status,
        reference_date,
    })
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::models::{GymClass, PaymentMethod, WorkoutPlan};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory store shared by the service tests
    #[derive(Default)]
    pub struct MemoryStore {
        pub statuses: Mutex<HashMap<i32, MembershipStatus>>,
        pub payments: Mutex<Vec<Payment>>,
        pub scheme_fees: Mutex<HashMap<i32, i64>>,
        pub linked_payments: Mutex<HashMap<i32, i32>>,
        pub fail_writes: bool,
        pub status_writes: Mutex<usize>,
        /// member_id -> trainer_id
        pub trainers: Mutex<HashMap<i32, i32>>,
        /// Classes with their workout name
        pub classes: Mutex<Vec<(GymClass, String)>>,
        /// member_id -> upcoming class_id
        pub class_assignments: Mutex<HashMap<i32, i32>>,
        pub workout_plans: Mutex<HashMap<i32, Vec<WorkoutPlan>>>,
        pub class_queries: Mutex<usize>,
    }

    impl MemoryStore {
        pub fn with_member(member_id: i32, status: MembershipStatus) -> Self {
            let store = Self::default();
            store.statuses.lock().unwrap().insert(member_id, status);
            store
        }

        pub fn add_payment(&self, member_id: i32, date: NaiveDate) {
            let mut payments = self.payments.lock().unwrap();
            let payment_id = payments.len() as i32 + 1;
            payments.push(Payment {
                payment_id,
                member_id,
                amount: 1000,
                payment_date: date,
                payment_method: PaymentMethod::Cash,
            });
        }

        pub fn status_of(&self, member_id: i32) -> Option<MembershipStatus> {
            self.statuses.lock().unwrap().get(&member_id).copied()
        }

        pub fn add_trainee(&self, member_id: i32, trainer_id: i32, status: MembershipStatus) {
            self.statuses.lock().unwrap().insert(member_id, status);
            self.trainers.lock().unwrap().insert(member_id, trainer_id);
        }

        pub fn add_class(&self, trainer_id: i32, class_date: NaiveDate, workout_name: &str) -> i32 {
            let mut classes = self.classes.lock().unwrap();
            let class_id = classes.len() as i32 + 1;
            classes.push((
                GymClass {
                    class_id,
                    trainer_id,
                    class_date,
                    workout_id: 1,
                },
                workout_name.to_string(),
            ));
            class_id
        }

        pub fn class_of(&self, member_id: i32) -> Option<i32> {
            self.class_assignments.lock().unwrap().get(&member_id).copied()
        }
    }

    #[async_trait]
    impl MembershipStore for MemoryStore {
        async fn latest_payment(&self, member_id: i32) -> Result<Option<Payment>, sqlx::Error> {
            Ok(self
                .payments
                .lock()
                .unwrap()
                .iter()
                .filter(|p| p.member_id == member_id)
                .max_by_key(|p| (p.payment_date, p.payment_id))
                .cloned())
        }

        async fn set_member_status(
            &self,
            member_id: i32,
            status: MembershipStatus,
        ) -> Result<u64, sqlx::Error> {
            if self.fail_writes {
                return Err(sqlx::Error::PoolTimedOut);
            }
            *self.status_writes.lock().unwrap() += 1;
            match self.statuses.lock().unwrap().get_mut(&member_id) {
                Some(current) => {
                    *current = status;
                    Ok(1)
                }
                None => Ok(0),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MemoryStore;
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_months_between_ignores_day() {
        assert_eq!(months_between(date(2024, 1, 31), date(2024, 2, 1)), 1);
        assert_eq!(months_between(date(2024, 1, 1), date(2024, 1, 31)), 0);
        assert_eq!(months_between(date(2023, 1, 1), date(2024, 6, 1)), 17);
        assert_eq!(months_between(date(2023, 11, 20), date(2024, 2, 3)), 3);
    }

    #[test]
    fn test_status_boundary() {
        let as_of = date(2024, 6, 10);
        assert_eq!(
            status_for(Some(date(2023, 3, 28)), as_of, 15),
            MembershipStatus::Active
        );
        assert_eq!(
            status_for(Some(date(2023, 2, 1)), as_of, 15),
            MembershipStatus::Inactive
        );
        assert_eq!(status_for(None, as_of, 15), MembershipStatus::Inactive);
    }

    #[tokio::test]
    async fn test_recent_payment_is_active() {
        let store = MemoryStore::with_member(1, MembershipStatus::Inactive);
        store.add_payment(1, date(2024, 1, 15));

        let result = evaluate(&store, &MembershipPolicy::default(), 1, date(2024, 6, 15))
            .await
            .unwrap();

        assert_eq!(result.status, MembershipStatus::Active);
        assert_eq!(result.reference_date, Some(date(2024, 1, 15)));
        assert_eq!(store.status_of(1), Some(MembershipStatus::Active));
    }

    #[tokio::test]
    async fn test_old_payment_lapses() {
        let store = MemoryStore::with_member(1, MembershipStatus::Active);
        store.add_payment(1, date(2023, 1, 1));

        let result = evaluate(&store, &MembershipPolicy::default(), 1, date(2024, 6, 1))
            .await
            .unwrap();

        assert_eq!(result.status, MembershipStatus::Inactive);
        assert_eq!(result.reference_date, Some(date(2023, 1, 1)));
        assert_eq!(store.status_of(1), Some(MembershipStatus::Inactive));
    }

    #[tokio::test]
    async fn test_no_payments_is_inactive() {
        let store = MemoryStore::with_member(3, MembershipStatus::Active);

        let result = evaluate(&store, &MembershipPolicy::default(), 3, date(2024, 6, 1))
            .await
            .unwrap();

        assert_eq!(result.status, MembershipStatus::Inactive);
        assert_eq!(result.reference_date, None);
        assert_eq!(store.status_of(3), Some(MembershipStatus::Inactive));
    }

    #[tokio::test]
    async fn test_month_end_to_month_start_counts_one_month() {
        let store = MemoryStore::with_member(4, MembershipStatus::Inactive);
        store.add_payment(4, date(2024, 1, 31));

        let result = evaluate(&store, &MembershipPolicy::default(), 4, date(2024, 2, 1))
            .await
            .unwrap();

        assert_eq!(result.status, MembershipStatus::Active);
    }

    #[tokio::test]
    async fn test_fifteen_months_active_sixteen_inactive() {
        let policy = MembershipPolicy::default();
        let as_of = date(2025, 4, 1);

        let store = MemoryStore::with_member(5, MembershipStatus::Inactive);
        store.add_payment(5, date(2024, 1, 31));
        let fifteen = evaluate(&store, &policy, 5, as_of).await.unwrap();
        assert_eq!(fifteen.status, MembershipStatus::Active);

        let store = MemoryStore::with_member(6, MembershipStatus::Active);
        store.add_payment(6, date(2023, 12, 1));
        let sixteen = evaluate(&store, &policy, 6, as_of).await.unwrap();
        assert_eq!(sixteen.status, MembershipStatus::Inactive);
    }

    #[tokio::test]
    async fn test_latest_payment_wins() {
        let store = MemoryStore::with_member(7, MembershipStatus::Inactive);
        store.add_payment(7, date(2024, 5, 1));
        store.add_payment(7, date(2020, 1, 1));

        let result = evaluate(&store, &MembershipPolicy::default(), 7, date(2024, 6, 1))
            .await
            .unwrap();

        assert_eq!(result.reference_date, Some(date(2024, 5, 1)));
        assert_eq!(result.status, MembershipStatus::Active);
    }

    #[tokio::test]
    async fn test_evaluation_is_idempotent() {
        let store = MemoryStore::with_member(8, MembershipStatus::Active);
        store.add_payment(8, date(2022, 1, 1));
        let policy = MembershipPolicy::default();

        let first = evaluate(&store, &policy, 8, date(2024, 6, 1)).await.unwrap();
        let after_first = store.status_of(8);
        let second = evaluate(&store, &policy, 8, date(2024, 6, 1)).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(after_first, store.status_of(8));
        // Both calls write, even though the second changes nothing
        assert_eq!(*store.status_writes.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_unknown_member_is_not_found() {
        let store = MemoryStore::default();

        let result = evaluate(&store, &MembershipPolicy::default(), 99, date(2024, 6, 1)).await;

        assert!(matches!(result, Err(StatusError::NotFound(99))));
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let store = MemoryStore {
            fail_writes: true,
            ..MemoryStore::with_member(1, MembershipStatus::Active)
        };
        store.add_payment(1, date(2024, 6, 1));

        let result = evaluate(&store, &MembershipPolicy::default(), 1, date(2024, 6, 2)).await;

        assert!(matches!(result, Err(StatusError::Store(_))));
        assert_eq!(store.status_of(1), Some(MembershipStatus::Active));
    }

    #[tokio::test]
    async fn test_custom_lapse_window() {
        let policy = MembershipPolicy {
            lapse_after_months: 1,
            ..MembershipPolicy::default()
        };
        let store = MemoryStore::with_member(2, MembershipStatus::Active);
        store.add_payment(2, date(2024, 1, 10));

        let result = evaluate(&store, &policy, 2, date(2024, 3, 1)).await.unwrap();

        assert_eq!(result.status, MembershipStatus::Inactive);
    }
}
