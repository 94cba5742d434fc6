use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Admin,
    Finance,
    PartnerManager,
    Partner,
    /// External payout collaborator reporting that funds have moved.
    PayoutService,
}

impl ActorRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Finance => "finance",
            Self::PartnerManager => "partner_manager",
            Self::Partner => "partner",
            Self::PayoutService => "payout_service",
        }
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActorRole {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "finance" => Ok(Self::Finance),
            "partner_manager" => Ok(Self::PartnerManager),
            "partner" => Ok(Self::Partner),
            "payout_service" => Ok(Self::PayoutService),
            other => Err(ValidationError::UnsupportedValue { field: "role", value: other.to_owned() }),
        }
    }
}

/// An already-authenticated caller. Identity resolution happens upstream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: ActorRole,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: ActorRole) -> Self {
        Self { id: id.into(), role }
    }
}
