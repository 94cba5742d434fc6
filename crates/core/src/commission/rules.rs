use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::rule::{EligibilityRule, EligibilityRuleId, RuleContext};

/// Outcome of resolving the rule matrix for one sale context.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleResolution {
    /// Nothing matched: commission is eligible at the tier rate.
    NoMatch,
    Eligible { rule_id: EligibilityRuleId, rate_override: Option<Decimal> },
    Ineligible { rule_id: EligibilityRuleId },
}

/// Append-only, insertion-ordered rule collection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EligibilityRuleSet {
    rules: Vec<EligibilityRule>,
}

impl EligibilityRuleSet {
    pub fn new(rules: Vec<EligibilityRule>) -> Self {
        Self { rules }
    }

    pub fn push(&mut self, rule: EligibilityRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[EligibilityRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules that match `context` and are in effect at `now`.
    pub fn candidates<'a>(
        &'a self,
        context: &'a RuleContext,
        now: DateTime<Utc>,
    ) -> impl Iterator<Item = &'a EligibilityRule> + 'a {
        self.rules.iter().filter(move |rule| rule.matches(context) && rule.is_effective_at(now))
    }

    /// The winning candidate: latest `effective_start`, then latest `created_at`,
    /// then greatest id, so the choice never depends on storage order.
    pub fn winning_rule(
        &self,
        context: &RuleContext,
        now: DateTime<Utc>,
    ) -> Option<&EligibilityRule> {
        self.rules
            .iter()
            .filter(|rule| rule.matches(context) && rule.is_effective_at(now))
            .max_by(|left, right| precedence(left, right))
    }

    pub fn resolve(&self, context: &RuleContext, now: DateTime<Utc>) -> RuleResolution {
        match self.winning_rule(context, now) {
            None => RuleResolution::NoMatch,
            Some(rule) if rule.eligible => RuleResolution::Eligible {
                rule_id: rule.id.clone(),
                rate_override: rule.commission_rate_override,
            },
            Some(rule) => RuleResolution::Ineligible { rule_id: rule.id.clone() },
        }
    }
}

impl FromIterator<EligibilityRule> for EligibilityRuleSet {
    fn from_iter<I: IntoIterator<Item = EligibilityRule>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

fn precedence(left: &EligibilityRule, right: &EligibilityRule) -> Ordering {
    left.effective_start
        .cmp(&right.effective_start)
        .then_with(|| left.created_at.cmp(&right.created_at))
        .then_with(|| left.id.cmp(&right.id))
}
