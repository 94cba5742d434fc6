use rust_decimal::Decimal;
use serde::Serialize;

use commissions_core::domain::{partner::PartnerId, product::ProductId, tier::TierProfile};
use commissions_db::ServiceError;

use crate::commands::{run_with_service, CommandResult};

#[derive(Debug, Clone, Default)]
pub struct AnalyticsScope {
    pub partner_id: Option<String>,
    pub product_id: Option<String>,
}

/// Overall summary, or a single partner's or product's summary when scoped.
pub fn run(scope: AnalyticsScope) -> CommandResult {
    match scope {
        AnalyticsScope { partner_id: Some(partner_id), .. } => {
            let partner_id = PartnerId(partner_id);
            run_with_service("analytics", |service| async move {
                service.partner_summary(&partner_id).await
            })
        }
        AnalyticsScope { product_id: Some(product_id), .. } => {
            let product_id = ProductId(product_id);
            run_with_service("analytics", |service| async move {
                service.product_summary(&product_id).await
            })
        }
        AnalyticsScope { .. } => {
            run_with_service("analytics", |service| async move {
                service.get_analytics_overview().await
            })
        }
    }
}

#[derive(Debug, Serialize)]
struct TierReport {
    profiles: Vec<TierProfile>,
    volume: Option<Decimal>,
    tier_for_volume: Option<TierProfile>,
}

pub fn tiers(volume: Option<Decimal>) -> CommandResult {
    run_with_service("tiers", |service| async move {
        let tier_for_volume = volume.and_then(|volume| service.tier_for_volume(volume).cloned());
        Ok::<_, ServiceError>(TierReport {
            profiles: service.tier_profiles().to_vec(),
            volume,
            tier_for_volume,
        })
    })
}
