use serde::Deserialize;

/// Business rules that differ between gym deployments
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MembershipPolicy {
    /// A membership lapses once the last payment is strictly more than this many calendar months old
    pub lapse_after_months: i32,
    pub payment_rule: PaymentRule,
    pub class_assignment: ClassAssignment,
}

impl MembershipPolicy {
    pub const DEFAULT_LAPSE_MONTHS: i32 = 15;
}

impl Default for MembershipPolicy {
    fn default() -> Self {
        Self {
            lapse_after_months: Self::DEFAULT_LAPSE_MONTHS,
            payment_rule: PaymentRule::SchemeFee,
            class_assignment: ClassAssignment::ActiveMembersOnly,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum PaymentRule {
    /// Amount must equal the fee of the member's scheme
    SchemeFee,
    /// Any amount at or above the minimum
    Minimum(i64),
}

/// Which of a trainer's members receive a newly scheduled class.
/// Active-only assignment re-evaluates each member before deciding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ClassAssignment {
    ActiveMembersOnly,
    AllMembers,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = MembershipPolicy::default();
        assert_eq!(policy.lapse_after_months, 15);
        assert_eq!(policy.payment_rule, PaymentRule::SchemeFee);
        assert_eq!(policy.class_assignment, ClassAssignment::ActiveMembersOnly);
    }
}
