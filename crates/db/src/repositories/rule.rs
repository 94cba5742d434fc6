use sqlx::Row;

use commissions_core::domain::rule::{EligibilityRule, EligibilityRuleId};

use super::{
    decode_error, format_timestamp, insert_error, parse_decimal, parse_optional_timestamp,
    parse_timestamp, EligibilityRuleRepository, RepositoryError,
};
use crate::DbPool;

pub struct SqlEligibilityRuleRepository {
    pool: DbPool,
}

impl SqlEligibilityRuleRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_rule(row: &sqlx::sqlite::SqliteRow) -> Result<EligibilityRule, RepositoryError> {
    let eligible: i64 = row.try_get("eligible").map_err(decode_error)?;
    let rate_override: Option<String> =
        row.try_get("commission_rate_override").map_err(decode_error)?;
    let effective_start: String = row.try_get("effective_start").map_err(decode_error)?;
    let effective_end: Option<String> = row.try_get("effective_end").map_err(decode_error)?;
    let created_at: String = row.try_get("created_at").map_err(decode_error)?;

    Ok(EligibilityRule {
        id: EligibilityRuleId(row.try_get("id").map_err(decode_error)?),
        product_type: row.try_get("product_type").map_err(decode_error)?,
        sales_channel: row.try_get("sales_channel").map_err(decode_error)?,
        customer_segment: row.try_get("customer_segment").map_err(decode_error)?,
        eligible: eligible != 0,
        commission_rate_override: rate_override
            .map(|raw| parse_decimal("commission_rate_override", &raw))
            .transpose()?,
        effective_start: parse_timestamp("effective_start", &effective_start)?,
        effective_end: parse_optional_timestamp("effective_end", effective_end)?,
        created_at: parse_timestamp("created_at", &created_at)?,
    })
}

#[async_trait::async_trait]
impl EligibilityRuleRepository for SqlEligibilityRuleRepository {
    async fn insert(&self, rule: EligibilityRule) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO eligibility_rule (id, product_type, sales_channel, customer_segment,
                                           eligible, commission_rate_override,
                                           effective_start, effective_end, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&rule.id.0)
        .bind(&rule.product_type)
        .bind(&rule.sales_channel)
        .bind(&rule.customer_segment)
        .bind(i64::from(rule.eligible))
        .bind(rule.commission_rate_override.map(|rate| rate.to_string()))
        .bind(format_timestamp(rule.effective_start))
        .bind(rule.effective_end.map(format_timestamp))
        .bind(format_timestamp(rule.created_at))
        .execute(&self.pool)
        .await
        .map_err(|error| insert_error(&rule.id.0, error))?;

        Ok(())
    }

    async fn list(&self) -> Result<Vec<EligibilityRule>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, product_type, sales_channel, customer_segment, eligible,
                    commission_rate_override, effective_start, effective_end, created_at
             FROM eligibility_rule
             ORDER BY created_at ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_rule).collect()
    }
}
