use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::commission::round_currency;
use crate::domain::partner::{Partner, PartnerId};
use crate::domain::product::ProductId;
use crate::domain::sale::SaleDraft;
use crate::domain::tier::Tier;

#[derive(Clone, Copy, Debug)]
pub struct SpiffInput<'a> {
    pub sale: &'a SaleDraft,
    pub partner: &'a Partner,
    pub total_amount: Decimal,
}

/// Campaign bonus on top of standard commission. Implementations must not return a
/// negative amount; the engine clamps to zero regardless.
pub trait SpiffPolicy: Send + Sync {
    fn spiff_bonus(&self, input: &SpiffInput<'_>) -> Decimal;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoSpiff;

impl SpiffPolicy for NoSpiff {
    fn spiff_bonus(&self, _input: &SpiffInput<'_>) -> Decimal {
        Decimal::ZERO
    }
}

impl<F> SpiffPolicy for F
where
    F: Fn(&SpiffInput<'_>) -> Decimal + Send + Sync,
{
    fn spiff_bonus(&self, input: &SpiffInput<'_>) -> Decimal {
        self(input)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "targets", rename_all = "snake_case")]
pub enum SpiffAssignment {
    Tiers(Vec<Tier>),
    Partners(Vec<PartnerId>),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "amount", rename_all = "snake_case")]
pub enum SpiffIncentive {
    /// Flat amount per unit sold.
    Fixed(Decimal),
    /// Percentage of the sale's total amount.
    Percentage(Decimal),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpiffCampaign {
    pub id: String,
    pub name: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub target_products: Vec<ProductId>,
    pub assignment: SpiffAssignment,
    pub incentive: SpiffIncentive,
}

impl SpiffCampaign {
    fn applies_to(&self, input: &SpiffInput<'_>) -> bool {
        let sale = input.sale;
        let in_window = self.starts_at <= sale.sale_date && sale.sale_date <= self.ends_at;
        let targets_product = self.target_products.contains(&sale.product_id);
        let targets_partner = match &self.assignment {
            SpiffAssignment::Tiers(tiers) => tiers.contains(&input.partner.tier),
            SpiffAssignment::Partners(partners) => partners.contains(&input.partner.id),
        };

        in_window && targets_product && targets_partner
    }

    fn bonus(&self, input: &SpiffInput<'_>) -> Decimal {
        match self.incentive {
            SpiffIncentive::Fixed(per_unit) => per_unit * Decimal::from(input.sale.quantity),
            SpiffIncentive::Percentage(pct) => input.total_amount * pct / Decimal::ONE_HUNDRED,
        }
    }
}

/// Sums the bonus of every campaign whose window contains the sale date and whose
/// product and partner targeting both match.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CampaignSpiffPolicy {
    campaigns: Vec<SpiffCampaign>,
}

impl CampaignSpiffPolicy {
    pub fn new(campaigns: Vec<SpiffCampaign>) -> Self {
        Self { campaigns }
    }

    pub fn campaigns(&self) -> &[SpiffCampaign] {
        &self.campaigns
    }
}

impl SpiffPolicy for CampaignSpiffPolicy {
    fn spiff_bonus(&self, input: &SpiffInput<'_>) -> Decimal {
        let total: Decimal = self
            .campaigns
            .iter()
            .filter(|campaign| campaign.applies_to(input))
            .map(|campaign| campaign.bonus(input))
            .filter(|bonus| *bonus > Decimal::ZERO)
            .sum();
        round_currency(total)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::{
        CampaignSpiffPolicy, NoSpiff, SpiffAssignment, SpiffCampaign, SpiffIncentive, SpiffInput,
        SpiffPolicy,
    };
    use crate::domain::partner::{Partner, PartnerId, PartnerStatus};
    use crate::domain::product::ProductId;
    use crate::domain::sale::SaleDraft;
    use crate::domain::tier::Tier;

    fn partner(tier: Tier) -> Partner {
        let now = Utc::now();
        Partner {
            id: PartnerId("PTN-7".to_owned()),
            company_name: "Northwind".to_owned(),
            contact_name: "Ari".to_owned(),
            contact_email: "ari@northwind.test".to_owned(),
            tier,
            status: PartnerStatus::Approved,
            created_at: now,
            updated_at: now,
        }
    }

    fn sale() -> SaleDraft {
        SaleDraft {
            partner_id: PartnerId("PTN-7".to_owned()),
            product_id: ProductId("P-1".to_owned()),
            quantity: 4,
            unit_price: Decimal::from(250),
            sale_date: Utc.with_ymd_and_hms(2026, 5, 15, 9, 0, 0).unwrap(),
            customer_reference: None,
            notes: None,
            sales_channel: None,
            customer_segment: None,
        }
    }

    fn campaign(assignment: SpiffAssignment, incentive: SpiffIncentive) -> SpiffCampaign {
        let start = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
        SpiffCampaign {
            id: "SPF-1".to_owned(),
            name: "Spring push".to_owned(),
            starts_at: start,
            ends_at: start + Duration::days(30),
            target_products: vec![ProductId("P-1".to_owned())],
            assignment,
            incentive,
        }
    }

    #[test]
    fn no_spiff_is_zero() {
        let sale = sale();
        let partner = partner(Tier::Gold);
        let input = SpiffInput { sale: &sale, partner: &partner, total_amount: Decimal::from(1000) };
        assert_eq!(NoSpiff.spiff_bonus(&input), Decimal::ZERO);
    }

    #[test]
    fn fixed_and_percentage_campaigns_stack() {
        let policy = CampaignSpiffPolicy::new(vec![
            campaign(SpiffAssignment::Tiers(vec![Tier::Gold]), SpiffIncentive::Fixed(Decimal::from(5))),
            campaign(
                SpiffAssignment::Partners(vec![PartnerId("PTN-7".to_owned())]),
                SpiffIncentive::Percentage(Decimal::new(25, 1)),
            ),
        ]);
        let sale = sale();
        let partner = partner(Tier::Gold);
        let input = SpiffInput { sale: &sale, partner: &partner, total_amount: Decimal::from(1000) };

        // 4 units * 5 + 2.5% of 1000
        assert_eq!(policy.spiff_bonus(&input), Decimal::new(4500, 2));
    }

    #[test]
    fn campaign_requires_tier_product_and_window() {
        let policy = CampaignSpiffPolicy::new(vec![campaign(
            SpiffAssignment::Tiers(vec![Tier::Platinum]),
            SpiffIncentive::Fixed(Decimal::from(5)),
        )]);
        let mut sale = sale();
        let partner = partner(Tier::Gold);
        let input = SpiffInput { sale: &sale, partner: &partner, total_amount: Decimal::from(1000) };
        assert_eq!(policy.spiff_bonus(&input), Decimal::ZERO);

        let policy = CampaignSpiffPolicy::new(vec![campaign(
            SpiffAssignment::Tiers(vec![Tier::Gold]),
            SpiffIncentive::Fixed(Decimal::from(5)),
        )]);
        sale.sale_date = Utc.with_ymd_and_hms(2026, 7, 1, 0, 0, 0).unwrap();
        let input = SpiffInput { sale: &sale, partner: &partner, total_amount: Decimal::from(1000) };
        assert_eq!(policy.spiff_bonus(&input), Decimal::ZERO);
    }

    #[test]
    fn closures_act_as_policies() {
        let policy = |input: &SpiffInput<'_>| Decimal::from(input.sale.quantity);
        let sale = sale();
        let partner = partner(Tier::Bronze);
        let input = SpiffInput { sale: &sale, partner: &partner, total_amount: Decimal::ZERO };
        assert_eq!(policy.spiff_bonus(&input), Decimal::from(4));
    }
}
