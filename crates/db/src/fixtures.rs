use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

const SEED_PARTNER_IDS: &[&str] = &["ptn-acme", "ptn-northwind", "ptn-globex", "ptn-initech"];

const SEED_PRODUCT_IDS: &[&str] = &["prd-sw-pro", "prd-hw-edge", "prd-svc-onboard"];

const SEED_RULE_IDS: &[&str] =
    &["rule-sw-reseller-enterprise", "rule-hw-marketplace-block", "rule-svc-direct-launch"];

/// Demo partners (one per tier, one still under review), products across three
/// categories, and a small rule matrix that exercises override, block, and expiry.
pub struct DemoSeedDataset;

impl DemoSeedDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_seed.sql");

    /// Loads the dataset. Existing rows with the same ids are left untouched.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        Ok(SeedResult {
            partners: SEED_PARTNER_IDS.len(),
            products: SEED_PRODUCT_IDS.len(),
            rules: SEED_RULE_IDS.len(),
        })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let checks = vec![
            ("partners", count_present(pool, "partner", SEED_PARTNER_IDS).await?),
            ("products", count_present(pool, "product", SEED_PRODUCT_IDS).await?),
            ("eligibility-rules", count_present(pool, "eligibility_rule", SEED_RULE_IDS).await?),
        ];
        let all_present = checks.iter().all(|(_, present)| *present);

        Ok(VerificationResult { all_present, checks })
    }
}

async fn count_present(
    pool: &DbPool,
    table: &'static str,
    ids: &[&str],
) -> Result<bool, RepositoryError> {
    let quoted = sql_array_from_ids(ids);
    let present: i64 =
        sqlx::query_scalar(&format!("SELECT COUNT(1) FROM {table} WHERE id IN {quoted}"))
            .fetch_one(pool)
            .await?;
    Ok(present == ids.len() as i64)
}

fn sql_array_from_ids(ids: &[&str]) -> String {
    let quoted = ids.iter().map(|id| format!("'{}'", id)).collect::<Vec<_>>().join(",");
    format!("({quoted})")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct SeedResult {
    pub partners: usize,
    pub products: usize,
    pub rules: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
