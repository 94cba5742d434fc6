//! Commission approval state machine.
//!
//! `pending -> approved -> paid`, or `pending -> rejected`. Transitions are computed
//! here as values and applied by the persistence layer with a compare-and-set on
//! the expected source status, so two racing reviewers cannot both succeed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    actor::{Actor, ActorRole},
    sale::{CommissionStatus, Sale, SaleId},
};
use crate::errors::{CommissionError, StateError};

/// Which roles may drive which transitions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalPolicy {
    pub reviewer_roles: Vec<ActorRole>,
    pub payout_roles: Vec<ActorRole>,
}

impl Default for ApprovalPolicy {
    fn default() -> Self {
        Self {
            reviewer_roles: vec![ActorRole::Admin, ActorRole::Finance],
            payout_roles: vec![ActorRole::Admin, ActorRole::Finance, ActorRole::PayoutService],
        }
    }
}

impl ApprovalPolicy {
    pub fn can_review(&self, actor: &Actor) -> bool {
        self.reviewer_roles.contains(&actor.role)
    }

    pub fn can_mark_paid(&self, actor: &Actor) -> bool {
        self.payout_roles.contains(&actor.role)
    }

    pub fn ensure_can_review(&self, actor: &Actor) -> Result<(), StateError> {
        if self.can_review(actor) {
            return Ok(());
        }
        Err(forbidden(actor, "review commissions"))
    }

    pub fn ensure_can_mark_paid(&self, actor: &Actor) -> Result<(), StateError> {
        if self.can_mark_paid(actor) {
            return Ok(());
        }
        Err(forbidden(actor, "mark commissions paid"))
    }
}

fn forbidden(actor: &Actor, action: &'static str) -> StateError {
    StateError::Forbidden { actor_id: actor.id.clone(), role: actor.role, action }
}

/// A validated status change, ready to persist with `from` as the expected status.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionTransition {
    pub sale_id: SaleId,
    pub from: CommissionStatus,
    pub to: CommissionStatus,
    pub actor_id: String,
    pub occurred_at: DateTime<Utc>,
    pub rejection_reason: Option<String>,
    pub payout_reference: Option<String>,
}

impl CommissionTransition {
    pub fn apply(&self, sale: &mut Sale) {
        sale.commission.commission_status = self.to;
        match self.to {
            CommissionStatus::Approved | CommissionStatus::Rejected => {
                sale.reviewed_by = Some(self.actor_id.clone());
                sale.reviewed_at = Some(self.occurred_at);
                sale.rejection_reason = self.rejection_reason.clone();
            }
            CommissionStatus::Paid => {
                sale.paid_at = Some(self.occurred_at);
                sale.payout_reference = self.payout_reference.clone();
            }
            CommissionStatus::Pending => {}
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ApprovalStateMachine {
    policy: ApprovalPolicy,
}

impl ApprovalStateMachine {
    pub fn new(policy: ApprovalPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ApprovalPolicy {
        &self.policy
    }

    pub fn approve(
        &self,
        sale: &Sale,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<CommissionTransition, CommissionError> {
        self.policy.ensure_can_review(actor)?;
        transition(sale, actor, CommissionStatus::Approved, now)
    }

    pub fn reject(
        &self,
        sale: &Sale,
        actor: &Actor,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<CommissionTransition, CommissionError> {
        self.policy.ensure_can_review(actor)?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(StateError::MissingReason(sale.id.clone()).into());
        }

        let mut transition = transition(sale, actor, CommissionStatus::Rejected, now)?;
        transition.rejection_reason = Some(reason.to_owned());
        Ok(transition)
    }

    pub fn mark_paid(
        &self,
        sale: &Sale,
        actor: &Actor,
        payout_reference: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<CommissionTransition, CommissionError> {
        self.policy.ensure_can_mark_paid(actor)?;
        let mut transition = transition(sale, actor, CommissionStatus::Paid, now)?;
        transition.payout_reference = payout_reference
            .map(str::trim)
            .filter(|reference| !reference.is_empty())
            .map(str::to_owned);
        Ok(transition)
    }
}

fn transition(
    sale: &Sale,
    actor: &Actor,
    to: CommissionStatus,
    now: DateTime<Utc>,
) -> Result<CommissionTransition, CommissionError> {
    sale.ensure_can_transition_to(to)?;
    Ok(CommissionTransition {
        sale_id: sale.id.clone(),
        from: sale.status(),
        to,
        actor_id: actor.id.clone(),
        occurred_at: now,
        rejection_reason: None,
        payout_reference: None,
    })
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    NotFound,
    InvalidTransition { from: CommissionStatus },
}

impl SkipReason {
    pub fn describe(&self) -> String {
        match self {
            Self::NotFound => "sale not found".to_owned(),
            Self::InvalidTransition { from } => format!("commission is {from}, not pending"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedSale {
    pub sale_id: SaleId,
    pub reason: SkipReason,
}

/// Per-id outcome of a bulk approval. Ids are reported in request order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkApprovalResult {
    pub approved: Vec<SaleId>,
    pub skipped: Vec<SkippedSale>,
}

impl BulkApprovalResult {
    pub fn approved_count(&self) -> usize {
        self.approved.len()
    }

    pub fn record_approved(&mut self, sale_id: SaleId) {
        self.approved.push(sale_id);
    }

    pub fn record_skipped(&mut self, sale_id: SaleId, reason: SkipReason) {
        self.skipped.push(SkippedSale { sale_id, reason });
    }

    /// Classifies a per-sale failure as a skip. Errors that are not about the
    /// individual sale are handed back to abort the batch.
    pub fn skip_or_abort(
        &mut self,
        sale_id: SaleId,
        error: CommissionError,
    ) -> Result<(), CommissionError> {
        match error {
            CommissionError::State(StateError::NotFound(_)) => {
                self.record_skipped(sale_id, SkipReason::NotFound);
                Ok(())
            }
            CommissionError::State(StateError::InvalidTransition { from, .. }) => {
                self.record_skipped(sale_id, SkipReason::InvalidTransition { from });
                Ok(())
            }
            other => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use super::{ApprovalPolicy, ApprovalStateMachine, BulkApprovalResult, SkipReason};
    use crate::domain::{
        actor::{Actor, ActorRole},
        partner::PartnerId,
        product::ProductId,
        sale::{CommissionBreakdown, CommissionStatus, RateSource, Sale, SaleDraft, SaleId},
        tier::Tier,
    };
    use crate::errors::{CommissionError, StateError};

    fn sale(status: CommissionStatus) -> Sale {
        let now = Utc::now();
        let draft = SaleDraft {
            partner_id: PartnerId("PTN-1".to_owned()),
            product_id: ProductId("P-1".to_owned()),
            quantity: 2,
            unit_price: Decimal::from(100),
            sale_date: now,
            customer_reference: None,
            notes: None,
            sales_channel: None,
            customer_segment: None,
        };
        let breakdown = CommissionBreakdown {
            total_amount: Decimal::from(200),
            commission_rate: Decimal::from(15),
            rate_source: RateSource::TierRate { tier: Tier::Gold },
            applied_rule_id: None,
            commission_amount: Decimal::from(30),
            spiff_bonus: Decimal::ZERO,
            total_commission: Decimal::from(30),
            commission_status: status,
        };
        Sale::from_draft(SaleId("S-1".to_owned()), draft, breakdown, "partner-portal", now)
    }

    fn finance() -> Actor {
        Actor::new("fin-1", ActorRole::Finance)
    }

    #[test]
    fn approve_pending_records_reviewer() {
        let machine = ApprovalStateMachine::default();
        let mut sale = sale(CommissionStatus::Pending);
        let now = Utc::now() + Duration::minutes(1);

        let transition = machine.approve(&sale, &finance(), now).expect("approve");
        assert_eq!(transition.from, CommissionStatus::Pending);
        assert_eq!(transition.to, CommissionStatus::Approved);

        transition.apply(&mut sale);
        assert_eq!(sale.status(), CommissionStatus::Approved);
        assert_eq!(sale.reviewed_by.as_deref(), Some("fin-1"));
        assert_eq!(sale.reviewed_at, Some(now));
    }

    #[test]
    fn terminal_states_cannot_be_approved() {
        let machine = ApprovalStateMachine::default();
        for status in [CommissionStatus::Rejected, CommissionStatus::Paid, CommissionStatus::Approved] {
            let error = machine.approve(&sale(status), &finance(), Utc::now()).expect_err("invalid");
            assert_eq!(
                error,
                CommissionError::State(StateError::InvalidTransition {
                    sale_id: SaleId("S-1".to_owned()),
                    from: status,
                    to: CommissionStatus::Approved,
                })
            );
        }
    }

    #[test]
    fn partner_role_is_forbidden_before_state_is_checked() {
        let machine = ApprovalStateMachine::default();
        let partner = Actor::new("ptn-user", ActorRole::Partner);
        let error = machine
            .approve(&sale(CommissionStatus::Paid), &partner, Utc::now())
            .expect_err("forbidden");
        assert_eq!(error.kind(), "forbidden");
    }

    #[test]
    fn reject_requires_reason_and_stores_it_trimmed() {
        let machine = ApprovalStateMachine::default();
        let mut sale = sale(CommissionStatus::Pending);

        let error = machine.reject(&sale, &finance(), "   ", Utc::now()).expect_err("reason");
        assert_eq!(error, CommissionError::State(StateError::MissingReason(SaleId("S-1".to_owned()))));

        let transition =
            machine.reject(&sale, &finance(), "  duplicate order ", Utc::now()).expect("reject");
        transition.apply(&mut sale);
        assert_eq!(sale.status(), CommissionStatus::Rejected);
        assert_eq!(sale.rejection_reason.as_deref(), Some("duplicate order"));
    }

    #[test]
    fn payout_service_marks_approved_sales_paid_only() {
        let machine = ApprovalStateMachine::default();
        let payout = Actor::new("payout-bot", ActorRole::PayoutService);

        assert!(machine.approve(&sale(CommissionStatus::Pending), &payout, Utc::now()).is_err());
        assert!(machine
            .mark_paid(&sale(CommissionStatus::Pending), &payout, None, Utc::now())
            .is_err());

        let mut sale = sale(CommissionStatus::Approved);
        let transition =
            machine.mark_paid(&sale, &payout, Some("WIRE-42"), Utc::now()).expect("paid");
        transition.apply(&mut sale);
        assert_eq!(sale.status(), CommissionStatus::Paid);
        assert_eq!(sale.payout_reference.as_deref(), Some("WIRE-42"));
        assert!(sale.paid_at.is_some());
    }

    #[test]
    fn custom_policy_can_narrow_reviewers() {
        let machine = ApprovalStateMachine::new(ApprovalPolicy {
            reviewer_roles: vec![ActorRole::Admin],
            payout_roles: vec![ActorRole::PayoutService],
        });
        assert!(machine.approve(&sale(CommissionStatus::Pending), &finance(), Utc::now()).is_err());
        assert!(machine
            .approve(&sale(CommissionStatus::Pending), &Actor::new("root", ActorRole::Admin), Utc::now())
            .is_ok());
    }

    #[test]
    fn bulk_result_skips_per_sale_failures_and_aborts_on_forbidden() {
        let mut result = BulkApprovalResult::default();
        result.record_approved(SaleId("S-1".to_owned()));
        result
            .skip_or_abort(
                SaleId("S-2".to_owned()),
                StateError::NotFound(SaleId("S-2".to_owned())).into(),
            )
            .expect("skip");
        result
            .skip_or_abort(
                SaleId("S-3".to_owned()),
                StateError::InvalidTransition {
                    sale_id: SaleId("S-3".to_owned()),
                    from: CommissionStatus::Paid,
                    to: CommissionStatus::Approved,
                }
                .into(),
            )
            .expect("skip");

        assert_eq!(result.approved_count(), 1);
        assert_eq!(result.skipped.len(), 2);
        assert_eq!(result.skipped[0].reason, SkipReason::NotFound);
        assert_eq!(
            result.skipped[1].reason.describe(),
            "commission is paid, not pending"
        );

        let aborted = result.skip_or_abort(
            SaleId("S-4".to_owned()),
            StateError::Forbidden {
                actor_id: "p".to_owned(),
                role: ActorRole::Partner,
                action: "review commissions",
            }
            .into(),
        );
        assert!(aborted.is_err());
        assert_eq!(result.skipped.len(), 2);
    }
}
