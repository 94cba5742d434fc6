pub mod analytics;
pub mod approvals;
pub mod commission;
pub mod config;
pub mod domain;
pub mod errors;

pub use analytics::{AnalyticsSummary, PartnerSummary, ProductSummary, StatusCounts};
pub use approvals::{
    ApprovalPolicy, ApprovalStateMachine, BulkApprovalResult, CommissionTransition, SkipReason,
    SkippedSale,
};
pub use commission::{
    rules::{EligibilityRuleSet, RuleResolution},
    spiff::{CampaignSpiffPolicy, NoSpiff, SpiffCampaign, SpiffPolicy},
    CalculationInput, CommissionEngine, DeterministicCommissionEngine,
};
pub use domain::actor::{Actor, ActorRole};
pub use domain::partner::{Partner, PartnerId, PartnerStatus};
pub use domain::product::{Product, ProductDraft, ProductId, TierCommissions};
pub use domain::rule::{EligibilityRule, EligibilityRuleDraft, EligibilityRuleId, RuleContext};
pub use domain::sale::{CommissionBreakdown, CommissionStatus, RateSource, Sale, SaleDraft, SaleId};
pub use domain::tier::{Tier, TierProfile, TierRegistry};
pub use errors::{
    ApplicationError, CommissionError, EligibilityError, IntegrityError, InterfaceError,
    StateError, ValidationError,
};
