use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::tier::Tier;
use crate::errors::ValidationError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductId(pub String);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Commission percentage per partner tier. Every tier has an entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCommissions {
    pub bronze: Decimal,
    pub silver: Decimal,
    pub gold: Decimal,
    pub platinum: Decimal,
}

impl TierCommissions {
    pub fn new(
        bronze: Decimal,
        silver: Decimal,
        gold: Decimal,
        platinum: Decimal,
    ) -> Result<Self, ValidationError> {
        let rates = Self { bronze, silver, gold, platinum };
        rates.validate()?;
        Ok(rates)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for tier in Tier::ALL {
            let rate = self.raw(tier);
            if rate < Decimal::ZERO {
                return Err(ValidationError::NegativeTierRate { tier, rate });
            }
        }
        Ok(())
    }

    /// The usable rate for `tier`, or `None` when the stored value is not a valid percentage.
    pub fn rate_for(&self, tier: Tier) -> Option<Decimal> {
        let rate = self.raw(tier);
        (rate >= Decimal::ZERO).then_some(rate)
    }

    fn raw(&self, tier: Tier) -> Decimal {
        match tier {
            Tier::Bronze => self.bronze,
            Tier::Silver => self.silver,
            Tier::Gold => self.gold,
            Tier::Platinum => self.platinum,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    /// Doubles as the `product_type` key for eligibility rules.
    pub category: String,
    pub base_price: Decimal,
    pub tier_commissions: TierCommissions,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub sku: String,
    pub name: String,
    pub category: String,
    pub base_price: Decimal,
    pub tier_commissions: TierCommissions,
}

impl ProductDraft {
    pub fn into_product(
        self,
        id: ProductId,
        now: DateTime<Utc>,
    ) -> Result<Product, ValidationError> {
        if self.sku.trim().is_empty() {
            return Err(ValidationError::BlankField { field: "sku" });
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::BlankField { field: "name" });
        }
        if self.category.trim().is_empty() {
            return Err(ValidationError::BlankField { field: "category" });
        }
        if self.base_price < Decimal::ZERO {
            return Err(ValidationError::NegativeUnitPrice { unit_price: self.base_price });
        }
        self.tier_commissions.validate()?;

        Ok(Product {
            id,
            sku: self.sku.trim().to_owned(),
            name: self.name.trim().to_owned(),
            category: self.category.trim().to_owned(),
            base_price: self.base_price,
            tier_commissions: self.tier_commissions,
            active: true,
            created_at: now,
        })
    }
}
