use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::partner::PartnerId;
use crate::domain::product::ProductId;
use crate::domain::rule::{EligibilityRuleId, RuleContext};
use crate::domain::tier::Tier;
use crate::errors::{StateError, ValidationError};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SaleId(pub String);

impl fmt::Display for SaleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommissionStatus {
    Pending,
    Approved,
    Rejected,
    Paid,
}

impl CommissionStatus {
    pub const ALL: [CommissionStatus; 4] = [
        CommissionStatus::Pending,
        CommissionStatus::Approved,
        CommissionStatus::Rejected,
        CommissionStatus::Paid,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Paid => "paid",
        }
    }

    pub fn can_transition_to(self, next: CommissionStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved)
                | (Self::Pending, Self::Rejected)
                | (Self::Approved, Self::Paid)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Paid)
    }
}

impl fmt::Display for CommissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommissionStatus {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "paid" => Ok(Self::Paid),
            other => Err(ValidationError::UnsupportedValue {
                field: "commission_status",
                value: other.to_owned(),
            }),
        }
    }
}

/// Where the effective commission rate came from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RateSource {
    TierRate { tier: Tier },
    RuleOverride { rule_id: EligibilityRuleId },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionBreakdown {
    pub total_amount: Decimal,
    pub commission_rate: Decimal,
    pub rate_source: RateSource,
    /// The rule that decided eligibility, if any matched.
    pub applied_rule_id: Option<EligibilityRuleId>,
    pub commission_amount: Decimal,
    pub spiff_bonus: Decimal,
    pub total_commission: Decimal,
    pub commission_status: CommissionStatus,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleDraft {
    pub partner_id: PartnerId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub sale_date: DateTime<Utc>,
    pub customer_reference: Option<String>,
    pub notes: Option<String>,
    pub sales_channel: Option<String>,
    pub customer_segment: Option<String>,
}

impl SaleDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.quantity < 1 {
            return Err(ValidationError::NonPositiveQuantity { quantity: self.quantity });
        }
        if self.unit_price < Decimal::ZERO {
            return Err(ValidationError::NegativeUnitPrice { unit_price: self.unit_price });
        }
        Ok(())
    }

    pub fn total_amount(&self) -> Decimal {
        Decimal::from(self.quantity) * self.unit_price
    }

    /// Rule lookup key. Missing channel/segment fall back to the defaults.
    pub fn rule_context(&self, product_type: &str) -> RuleContext {
        RuleContext::new(
            product_type,
            non_blank(self.sales_channel.as_deref()).unwrap_or(RuleContext::DEFAULT_CHANNEL),
            non_blank(self.customer_segment.as_deref()).unwrap_or(RuleContext::DEFAULT_SEGMENT),
        )
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    pub id: SaleId,
    pub partner_id: PartnerId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub sale_date: DateTime<Utc>,
    pub customer_reference: Option<String>,
    pub notes: Option<String>,
    pub sales_channel: Option<String>,
    pub customer_segment: Option<String>,
    pub commission: CommissionBreakdown,
    pub rejection_reason: Option<String>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub payout_reference: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl Sale {
    pub fn from_draft(
        id: SaleId,
        draft: SaleDraft,
        commission: CommissionBreakdown,
        created_by: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            partner_id: draft.partner_id,
            product_id: draft.product_id,
            quantity: draft.quantity,
            unit_price: draft.unit_price,
            sale_date: draft.sale_date,
            customer_reference: draft.customer_reference,
            notes: draft.notes,
            sales_channel: draft.sales_channel,
            customer_segment: draft.customer_segment,
            commission,
            rejection_reason: None,
            reviewed_by: None,
            reviewed_at: None,
            paid_at: None,
            payout_reference: None,
            created_by: created_by.into(),
            created_at: now,
        }
    }

    pub fn status(&self) -> CommissionStatus {
        self.commission.commission_status
    }

    pub fn total_amount(&self) -> Decimal {
        self.commission.total_amount
    }

    pub fn total_commission(&self) -> Decimal {
        self.commission.total_commission
    }

    pub fn ensure_can_transition_to(&self, next: CommissionStatus) -> Result<(), StateError> {
        if self.status().can_transition_to(next) {
            return Ok(());
        }

        Err(StateError::InvalidTransition { sale_id: self.id.clone(), from: self.status(), to: next })
    }
}
