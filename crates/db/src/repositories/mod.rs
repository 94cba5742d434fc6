use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use commissions_core::approvals::CommissionTransition;
use commissions_core::domain::{
    partner::{Partner, PartnerId},
    product::{Product, ProductId},
    rule::EligibilityRule,
    sale::{CommissionStatus, Sale, SaleId},
};

pub mod memory;
pub mod partner;
pub mod product;
pub mod rule;
pub mod sale;

pub use memory::{
    InMemoryEligibilityRuleRepository, InMemoryPartnerRepository, InMemoryProductRepository,
    InMemorySaleRepository,
};
pub use partner::SqlPartnerRepository;
pub use product::SqlProductRepository;
pub use rule::SqlEligibilityRuleRepository;
pub use sale::SqlSaleRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("duplicate key: {0}")]
    Duplicate(String),
}

/// Narrows `list` on the sale repository. Empty filter lists everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SaleFilter {
    pub partner_id: Option<PartnerId>,
    pub status: Option<CommissionStatus>,
}

impl SaleFilter {
    pub fn matches(&self, sale: &Sale) -> bool {
        self.partner_id.as_ref().map_or(true, |partner_id| &sale.partner_id == partner_id)
            && self.status.map_or(true, |status| sale.status() == status)
    }
}

#[async_trait]
pub trait PartnerRepository: Send + Sync {
    async fn find_by_id(&self, id: &PartnerId) -> Result<Option<Partner>, RepositoryError>;
    async fn save(&self, partner: Partner) -> Result<(), RepositoryError>;
    async fn list(&self) -> Result<Vec<Partner>, RepositoryError>;
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError>;
    async fn save(&self, product: Product) -> Result<(), RepositoryError>;
    async fn list(&self) -> Result<Vec<Product>, RepositoryError>;
}

/// Append-only: rules are never updated or deleted.
#[async_trait]
pub trait EligibilityRuleRepository: Send + Sync {
    async fn insert(&self, rule: EligibilityRule) -> Result<(), RepositoryError>;
    /// All rules in creation order.
    async fn list(&self) -> Result<Vec<EligibilityRule>, RepositoryError>;
}

#[async_trait]
pub trait SaleRepository: Send + Sync {
    async fn insert(&self, sale: Sale) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: &SaleId) -> Result<Option<Sale>, RepositoryError>;
    /// Newest first.
    async fn list(&self, filter: &SaleFilter) -> Result<Vec<Sale>, RepositoryError>;
    /// Compare-and-set on `transition.from`. Returns `false` when the stored status
    /// no longer matches, i.e. a concurrent writer got there first.
    async fn apply_transition(
        &self,
        transition: &CommissionTransition,
    ) -> Result<bool, RepositoryError>;
}

pub(crate) fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("{column}: `{value}`: {error}")))
}

pub(crate) fn parse_optional_timestamp(
    column: &str,
    value: Option<String>,
) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    value.map(|value| parse_timestamp(column, &value)).transpose()
}

pub(crate) fn parse_decimal(column: &str, value: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(value)
        .map_err(|error| RepositoryError::Decode(format!("{column}: `{value}`: {error}")))
}

pub(crate) fn decode_error(error: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

pub(crate) fn insert_error(key: &str, error: sqlx::Error) -> RepositoryError {
    match &error {
        sqlx::Error::Database(database) if database.is_unique_violation() => {
            RepositoryError::Duplicate(key.to_string())
        }
        _ => RepositoryError::Database(error),
    }
}
