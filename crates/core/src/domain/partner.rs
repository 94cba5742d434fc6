use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::actor::{Actor, ActorRole};
use crate::domain::tier::Tier;
use crate::errors::{StateError, ValidationError};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartnerId(pub String);

impl fmt::Display for PartnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Onboarding status, owned by the onboarding workflow. Only `Approved` partners earn commission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartnerStatus {
    PendingReview,
    UnderReview,
    Approved,
    Rejected,
    MoreInfoNeeded,
}

impl PartnerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PendingReview => "pending_review",
            Self::UnderReview => "under_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::MoreInfoNeeded => "more_info_needed",
        }
    }
}

impl fmt::Display for PartnerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PartnerStatus {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending_review" => Ok(Self::PendingReview),
            "under_review" => Ok(Self::UnderReview),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "more_info_needed" => Ok(Self::MoreInfoNeeded),
            other => Err(ValidationError::UnsupportedValue {
                field: "partner_status",
                value: other.to_owned(),
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partner {
    pub id: PartnerId,
    pub company_name: String,
    pub contact_name: String,
    pub contact_email: String,
    pub tier: Tier,
    pub status: PartnerStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Partner {
    pub fn is_commission_eligible(&self) -> bool {
        self.status == PartnerStatus::Approved
    }

    /// Administrative tier change. Returns the previous tier. Past sales keep the rate
    /// they were calculated with.
    pub fn reassign_tier(
        &mut self,
        actor: &Actor,
        tier: Tier,
        now: DateTime<Utc>,
    ) -> Result<Tier, StateError> {
        if !matches!(actor.role, ActorRole::Admin | ActorRole::Finance) {
            return Err(StateError::Forbidden {
                actor_id: actor.id.clone(),
                role: actor.role,
                action: "reassign partner tiers",
            });
        }

        let previous = self.tier;
        self.tier = tier;
        self.updated_at = now;
        Ok(previous)
    }
}
