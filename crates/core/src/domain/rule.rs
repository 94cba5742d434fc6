use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EligibilityRuleId(pub String);

impl fmt::Display for EligibilityRuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The (product_type, sales_channel, customer_segment) key a sale resolves to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleContext {
    pub product_type: String,
    pub sales_channel: String,
    pub customer_segment: String,
}

impl RuleContext {
    pub const DEFAULT_CHANNEL: &'static str = "direct";
    pub const DEFAULT_SEGMENT: &'static str = "general";

    pub fn new(
        product_type: impl Into<String>,
        sales_channel: impl Into<String>,
        customer_segment: impl Into<String>,
    ) -> Self {
        Self {
            product_type: product_type.into(),
            sales_channel: sales_channel.into(),
            customer_segment: customer_segment.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityRule {
    pub id: EligibilityRuleId,
    pub product_type: String,
    pub sales_channel: String,
    pub customer_segment: String,
    pub eligible: bool,
    pub commission_rate_override: Option<Decimal>,
    pub effective_start: DateTime<Utc>,
    pub effective_end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl EligibilityRule {
    /// Exact key equality after trimming, ignoring ASCII case. No wildcards.
    pub fn matches(&self, context: &RuleContext) -> bool {
        key_eq(&self.product_type, &context.product_type)
            && key_eq(&self.sales_channel, &context.sales_channel)
            && key_eq(&self.customer_segment, &context.customer_segment)
    }

    pub fn is_effective_at(&self, now: DateTime<Utc>) -> bool {
        self.effective_start <= now && self.effective_end.map_or(true, |end| now < end)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityRuleDraft {
    pub product_type: String,
    pub sales_channel: String,
    pub customer_segment: String,
    pub eligible: bool,
    pub commission_rate_override: Option<Decimal>,
    pub effective_start: DateTime<Utc>,
    pub effective_end: Option<DateTime<Utc>>,
}

impl EligibilityRuleDraft {
    pub fn into_rule(
        self,
        id: EligibilityRuleId,
        now: DateTime<Utc>,
    ) -> Result<EligibilityRule, ValidationError> {
        let product_type = required_key("product_type", &self.product_type)?;
        let sales_channel = required_key("sales_channel", &self.sales_channel)?;
        let customer_segment = required_key("customer_segment", &self.customer_segment)?;

        if let Some(rate) = self.commission_rate_override {
            if rate < Decimal::ZERO {
                return Err(ValidationError::NegativeRateOverride { rate });
            }
        }
        if let Some(end) = self.effective_end {
            if end <= self.effective_start {
                return Err(ValidationError::EmptyRuleWindow);
            }
        }

        Ok(EligibilityRule {
            id,
            product_type,
            sales_channel,
            customer_segment,
            eligible: self.eligible,
            commission_rate_override: self.commission_rate_override,
            effective_start: self.effective_start,
            effective_end: self.effective_end,
            created_at: now,
        })
    }
}

fn required_key(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::BlankField { field });
    }
    Ok(trimmed.to_owned())
}

fn key_eq(left: &str, right: &str) -> bool {
    left.trim().eq_ignore_ascii_case(right.trim())
}
