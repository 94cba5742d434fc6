//! Commission calculation.
//!
//! Turns a sale draft into a [`CommissionBreakdown`] from the partner tier, the
//! product's tier-commission table, and the eligibility rule matrix. Pure: the
//! caller supplies `now`.

pub mod rules;
pub mod spiff;

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::domain::{
    partner::Partner,
    product::Product,
    sale::{CommissionBreakdown, CommissionStatus, RateSource, SaleDraft},
};
use crate::errors::{CommissionError, EligibilityError, IntegrityError};

use self::{
    rules::{EligibilityRuleSet, RuleResolution},
    spiff::{NoSpiff, SpiffInput, SpiffPolicy},
};

/// Currency precision for every stored amount.
pub const CURRENCY_SCALE: u32 = 2;

/// Round half away from zero to cents. Amounts here are non-negative, so this is
/// round-half-up. The result always carries exactly two decimal places.
pub fn round_currency(amount: Decimal) -> Decimal {
    let mut rounded =
        amount.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(CURRENCY_SCALE);
    rounded
}

#[derive(Clone, Copy, Debug)]
pub struct CalculationInput<'a> {
    pub sale: &'a SaleDraft,
    pub partner: &'a Partner,
    pub product: &'a Product,
    pub rules: &'a EligibilityRuleSet,
    pub now: DateTime<Utc>,
}

pub trait CommissionEngine: Send + Sync {
    fn calculate(&self, input: CalculationInput<'_>) -> Result<CommissionBreakdown, CommissionError>;
}

pub struct DeterministicCommissionEngine<S = NoSpiff> {
    spiff_policy: S,
}

impl Default for DeterministicCommissionEngine<NoSpiff> {
    fn default() -> Self {
        Self::new(NoSpiff)
    }
}

impl<S> DeterministicCommissionEngine<S> {
    pub fn new(spiff_policy: S) -> Self {
        Self { spiff_policy }
    }

    pub fn spiff_policy(&self) -> &S {
        &self.spiff_policy
    }
}

impl<S> CommissionEngine for DeterministicCommissionEngine<S>
where
    S: SpiffPolicy,
{
    fn calculate(&self, input: CalculationInput<'_>) -> Result<CommissionBreakdown, CommissionError> {
        calculate_with_policy(input, &self.spiff_policy)
    }
}

pub fn calculate(input: CalculationInput<'_>) -> Result<CommissionBreakdown, CommissionError> {
    calculate_with_policy(input, &NoSpiff)
}

pub fn calculate_with_policy(
    input: CalculationInput<'_>,
    spiff_policy: &dyn SpiffPolicy,
) -> Result<CommissionBreakdown, CommissionError> {
    let CalculationInput { sale, partner, product, rules, now } = input;

    sale.validate()?;
    if !partner.is_commission_eligible() {
        return Err(EligibilityError::PartnerNotEligible {
            partner_id: partner.id.clone(),
            status: partner.status,
        }
        .into());
    }
    if !product.active {
        return Err(EligibilityError::ProductInactive { product_id: product.id.clone() }.into());
    }
    let tier_rate = product.tier_commissions.rate_for(partner.tier).ok_or_else(|| {
        IntegrityError::MissingTierRate { product_id: product.id.clone(), tier: partner.tier }
    })?;

    let total_amount = sale.total_amount();
    let context = sale.rule_context(&product.category);

    let (commission_rate, rate_source, applied_rule_id) = match rules.resolve(&context, now) {
        RuleResolution::NoMatch => (tier_rate, RateSource::TierRate { tier: partner.tier }, None),
        RuleResolution::Ineligible { rule_id } => {
            return Err(EligibilityError::CommissionIneligible { rule_id }.into());
        }
        RuleResolution::Eligible { rule_id, rate_override: Some(rate) } => {
            (rate, RateSource::RuleOverride { rule_id: rule_id.clone() }, Some(rule_id))
        }
        RuleResolution::Eligible { rule_id, rate_override: None } => {
            (tier_rate, RateSource::TierRate { tier: partner.tier }, Some(rule_id))
        }
    };

    let commission_amount = round_currency(total_amount * commission_rate / Decimal::ONE_HUNDRED);
    let spiff_bonus = round_currency(
        spiff_policy.spiff_bonus(&SpiffInput { sale, partner, total_amount }).max(Decimal::ZERO),
    );

    Ok(CommissionBreakdown {
        total_amount,
        commission_rate,
        rate_source,
        applied_rule_id,
        commission_amount,
        spiff_bonus,
        total_commission: commission_amount + spiff_bonus,
        commission_status: CommissionStatus::Pending,
    })
}
