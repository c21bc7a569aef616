use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use tracing::instrument;

use crate::models::{payment::NewPayment, Member, Payment, PaymentMethod, Scheme};
use crate::services::membership_status::{
    self, MembershipStore, PgMembershipStore, StatusError, StatusEvaluation,
};
use crate::services::policy::{MembershipPolicy, PaymentRule};

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("No membership scheme assigned. Contact admin.")]
    NoScheme,

    #[error("Payment must equal the scheme fee of {expected} (got {got})")]
    AmountMismatch { expected: i64, got: i64 },

    #[error("Payment must be at least {minimum} (got {got})")]
    BelowMinimum { minimum: i64, got: i64 },

    #[error(transparent)]
    Status(#[from] StatusError),

    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),
}

/// Store operations the payment workflow needs beyond status evaluation
#[async_trait]
pub trait PaymentStore: MembershipStore {
    async fn scheme_fee(&self, member_id: i32) -> Result<Option<i64>, sqlx::Error>;

    async fn insert_payment(&self, payment: &NewPayment) -> Result<Payment, sqlx::Error>;

    async fn link_latest_payment(&self, member_id: i32, payment_id: i32) -> Result<u64, sqlx::Error>;
}

#[async_trait]
impl PaymentStore for PgMembershipStore {
    async fn scheme_fee(&self, member_id: i32) -> Result<Option<i64>, sqlx::Error> {
        Scheme::fee_for_member(self.pool(), member_id).await
    }

    async fn insert_payment(&self, payment: &NewPayment) -> Result<Payment, sqlx::Error> {
        Payment::create(self.pool(), payment).await
    }

    async fn link_latest_payment(&self, member_id: i32, payment_id: i32) -> Result<u64, sqlx::Error> {
        Member::link_payment(self.pool(), member_id, payment_id).await
    }
}

#[derive(Debug, Clone)]
pub struct PaymentReceipt {
    pub payment: Payment,
    pub evaluation: StatusEvaluation,
}

/// Amount the member is expected to pay, when the rule fixes one
pub async fn expected_amount<S>(
    store: &S,
    rule: PaymentRule,
    member_id: i32,
) -> Result<Option<i64>, sqlx::Error>
where
    S: PaymentStore + ?Sized,
{
    match rule {
        PaymentRule::SchemeFee => Ok(store.scheme_fee(member_id).await?.filter(|fee| *fee > 0)),
        PaymentRule::Minimum(_) => Ok(None),
    }
}

async fn validate_amount<S>(
    store: &S,
    rule: PaymentRule,
    member_id: i32,
    amount: i64,
) -> Result<(), PaymentError>
where
    S: PaymentStore + ?Sized,
{
    match rule {
        PaymentRule::SchemeFee => {
            let expected = expected_amount(store, rule, member_id)
                .await?
                .ok_or(PaymentError::NoScheme)?;
            if amount != expected {
                return Err(PaymentError::AmountMismatch {
                    expected,
                    got: amount,
                });
            }
        }
        PaymentRule::Minimum(minimum) => {
            if amount < minimum {
                return Err(PaymentError::BelowMinimum {
                    minimum,
                    got: amount,
                });
            }
        }
    }

    Ok(())
}

/// Records a payment and immediately re-evaluates the member's status
#[instrument(skip(store, policy))]
pub async fn submit_payment<S>(
    store: &S,
    policy: &MembershipPolicy,
    member_id: i32,
    amount: i64,
    method: PaymentMethod,
    today: NaiveDate,
) -> Result<PaymentReceipt, PaymentError>
where
    S: PaymentStore + ?Sized,
{
    validate_amount(store, policy.payment_rule, member_id, amount).await?;

    let payment = store
        .insert_payment(&NewPayment {
            member_id,
            amount,
            payment_date: today,
            payment_method: method,
        })
        .await?;

    if store.link_latest_payment(member_id, payment.payment_id).await? == 0 {
        return Err(StatusError::NotFound(member_id).into());
    }

    let evaluation = membership_status::evaluate(store, policy, member_id, today).await?;

    tracing::info!(
        member_id,
        payment_id = payment.payment_id,
        amount,
        status = %evaluation.status,
        "Payment recorded"
    );

    Ok(PaymentReceipt {
        payment,
        evaluation,
    })
}
