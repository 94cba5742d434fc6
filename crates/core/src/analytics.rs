//! Read-only folds over recorded sales.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{
    partner::PartnerId,
    product::ProductId,
    sale::{CommissionStatus, Sale},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
    pub paid: u64,
}

impl StatusCounts {
    fn record(&mut self, status: CommissionStatus) {
        match status {
            CommissionStatus::Pending => self.pending += 1,
            CommissionStatus::Approved => self.approved += 1,
            CommissionStatus::Rejected => self.rejected += 1,
            CommissionStatus::Paid => self.paid += 1,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub total_sales: u64,
    pub total_sales_amount: Decimal,
    /// Sum of every commission regardless of status.
    pub total_commissions: Decimal,
    pub pending_commissions: Decimal,
    pub approved_commissions: Decimal,
    pub rejected_commissions: Decimal,
    pub paid_commissions: Decimal,
    pub status_counts: StatusCounts,
}

pub fn summarize<'a>(sales: impl IntoIterator<Item = &'a Sale>) -> AnalyticsSummary {
    sales.into_iter().fold(AnalyticsSummary::default(), |mut summary, sale| {
        let commission = sale.total_commission();
        summary.total_sales += 1;
        summary.total_sales_amount += sale.total_amount();
        summary.total_commissions += commission;
        match sale.status() {
            CommissionStatus::Pending => summary.pending_commissions += commission,
            CommissionStatus::Approved => summary.approved_commissions += commission,
            CommissionStatus::Rejected => summary.rejected_commissions += commission,
            CommissionStatus::Paid => summary.paid_commissions += commission,
        }
        summary.status_counts.record(sale.status());
        summary
    })
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerSummary {
    pub partner_id: PartnerId,
    pub sales_count: u64,
    pub revenue: Decimal,
    /// Commission across every sale of the partner, whatever its status.
    pub earned: Decimal,
    pub pending: Decimal,
    pub paid: Decimal,
}

pub fn summarize_partner<'a>(
    partner_id: &PartnerId,
    sales: impl IntoIterator<Item = &'a Sale>,
) -> PartnerSummary {
    let initial = PartnerSummary {
        partner_id: partner_id.clone(),
        sales_count: 0,
        revenue: Decimal::ZERO,
        earned: Decimal::ZERO,
        pending: Decimal::ZERO,
        paid: Decimal::ZERO,
    };

    sales.into_iter().filter(|sale| &sale.partner_id == partner_id).fold(
        initial,
        |mut summary, sale| {
            let commission = sale.total_commission();
            summary.sales_count += 1;
            summary.revenue += sale.total_amount();
            summary.earned += commission;
            match sale.status() {
                CommissionStatus::Pending => summary.pending += commission,
                CommissionStatus::Paid => summary.paid += commission,
                CommissionStatus::Approved | CommissionStatus::Rejected => {}
            }
            summary
        },
    )
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub product_id: ProductId,
    pub sales_count: u64,
    pub quantity_sold: u64,
    pub revenue: Decimal,
}

pub fn summarize_product<'a>(
    product_id: &ProductId,
    sales: impl IntoIterator<Item = &'a Sale>,
) -> ProductSummary {
    let initial = ProductSummary {
        product_id: product_id.clone(),
        sales_count: 0,
        quantity_sold: 0,
        revenue: Decimal::ZERO,
    };

    sales.into_iter().filter(|sale| &sale.product_id == product_id).fold(
        initial,
        |mut summary, sale| {
            summary.sales_count += 1;
            summary.quantity_sold += u64::from(sale.quantity);
            summary.revenue += sale.total_amount();
            summary
        },
    )
}
