use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::{
    actor::ActorRole,
    partner::{PartnerId, PartnerStatus},
    product::ProductId,
    rule::EligibilityRuleId,
    sale::{CommissionStatus, SaleId},
    tier::Tier,
};

/// Malformed or missing input. The caller can fix these by resubmitting.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("quantity must be at least 1, got {quantity}")]
    NonPositiveQuantity { quantity: u32 },
    #[error("unit price must not be negative, got {unit_price}")]
    NegativeUnitPrice { unit_price: Decimal },
    #[error("commission rate for tier `{tier}` must not be negative, got {rate}")]
    NegativeTierRate { tier: Tier, rate: Decimal },
    #[error("commission rate override must not be negative, got {rate}")]
    NegativeRateOverride { rate: Decimal },
    #[error("`{field}` must not be blank")]
    BlankField { field: &'static str },
    #[error("rule window is empty: effective_end must be after effective_start")]
    EmptyRuleWindow,
    #[error("unknown partner `{0}`")]
    UnknownPartner(PartnerId),
    #[error("unknown product `{0}`")]
    UnknownProduct(ProductId),
    #[error("unsupported value `{value}` for `{field}`")]
    UnsupportedValue { field: &'static str, value: String },
}

/// Business-rule rejections. Distinct from validation so callers can explain why
/// no commission was created.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EligibilityError {
    #[error("eligibility rule `{rule_id}` marks this sale context as not commission-eligible")]
    CommissionIneligible { rule_id: EligibilityRuleId },
    #[error("partner `{partner_id}` is not approved (status `{status}`)")]
    PartnerNotEligible { partner_id: PartnerId, status: PartnerStatus },
    #[error("product `{product_id}` is inactive")]
    ProductInactive { product_id: ProductId },
}

/// Data-consistency defects. These indicate corrupted reference data, not user error.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IntegrityError {
    #[error("product `{product_id}` has no usable commission rate for tier `{tier}`")]
    MissingTierRate { product_id: ProductId, tier: Tier },
}

/// Approval workflow misuse, or a race lost to a concurrent writer.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("sale `{sale_id}` cannot move from {from} to {to}")]
    InvalidTransition { sale_id: SaleId, from: CommissionStatus, to: CommissionStatus },
    #[error("sale `{0}` was not found")]
    NotFound(SaleId),
    #[error("actor `{actor_id}` with role `{role}` may not {action}")]
    Forbidden { actor_id: String, role: ActorRole, action: &'static str },
    #[error("rejecting sale `{0}` requires a non-empty reason")]
    MissingReason(SaleId),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CommissionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Eligibility(#[from] EligibilityError),
    #[error(transparent)]
    Integrity(#[from] IntegrityError),
    #[error(transparent)]
    State(#[from] StateError),
}

impl CommissionError {
    /// Stable, machine-readable name of the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Eligibility(EligibilityError::CommissionIneligible { .. }) => {
                "commission_ineligible"
            }
            Self::Eligibility(EligibilityError::PartnerNotEligible { .. }) => {
                "partner_not_eligible"
            }
            Self::Eligibility(EligibilityError::ProductInactive { .. }) => "product_inactive",
            Self::Integrity(IntegrityError::MissingTierRate { .. }) => "missing_tier_rate",
            Self::State(StateError::InvalidTransition { .. }) => "invalid_transition",
            Self::State(StateError::NotFound(_)) => "not_found",
            Self::State(StateError::Forbidden { .. }) => "forbidden",
            Self::State(StateError::MissingReason(_)) => "missing_reason",
        }
    }

    pub fn is_integrity(&self) -> bool {
        matches!(self, Self::Integrity(_))
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Commission(#[from] CommissionError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("unprocessable: {message}")]
    Unprocessable { message: String, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("forbidden: {message}")]
    Forbidden { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::Unprocessable { .. } => "No commission can be created for this sale.",
            Self::Conflict { .. } => {
                "The commission is no longer in a state that allows this action."
            }
            Self::NotFound { .. } => "The requested sale does not exist.",
            Self::Forbidden { .. } => "You are not allowed to perform this action.",
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::Unprocessable { correlation_id, .. }
            | Self::Conflict { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::Forbidden { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::Unprocessable { correlation_id: id, .. }
            | InterfaceError::Conflict { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::Forbidden { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::Commission(error) => {
                let message = error.to_string();
                match error {
                    CommissionError::Validation(_)
                    | CommissionError::State(StateError::MissingReason(_)) => {
                        Self::BadRequest { message, correlation_id }
                    }
                    CommissionError::Eligibility(_) => {
                        Self::Unprocessable { message, correlation_id }
                    }
                    CommissionError::State(StateError::InvalidTransition { .. }) => {
                        Self::Conflict { message, correlation_id }
                    }
                    CommissionError::State(StateError::NotFound(_)) => {
                        Self::NotFound { message, correlation_id }
                    }
                    CommissionError::State(StateError::Forbidden { .. }) => {
                        Self::Forbidden { message, correlation_id }
                    }
                    CommissionError::Integrity(_) => Self::Internal { message, correlation_id },
                }
            }
            ApplicationError::Persistence(message) => {
                Self::ServiceUnavailable { message, correlation_id }
            }
            ApplicationError::Configuration(message) => Self::Internal { message, correlation_id },
        }
    }
}
