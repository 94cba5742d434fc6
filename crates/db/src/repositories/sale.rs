use sqlx::{QueryBuilder, Row, Sqlite};

use commissions_core::approvals::CommissionTransition;
use commissions_core::domain::{
    partner::PartnerId,
    product::ProductId,
    rule::EligibilityRuleId,
    sale::{CommissionBreakdown, CommissionStatus, RateSource, Sale, SaleId},
};

use super::{
    decode_error, format_timestamp, insert_error, parse_decimal, parse_optional_timestamp,
    parse_timestamp, RepositoryError, SaleFilter, SaleRepository,
};
use crate::DbPool;

pub struct SqlSaleRepository {
    pool: DbPool,
}

impl SqlSaleRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const SELECT_SALE: &str = "SELECT id, partner_id, product_id, quantity, unit_price, sale_date,
        customer_reference, notes, sales_channel, customer_segment, total_amount,
        commission_rate, rate_source_json, applied_rule_id, commission_amount, spiff_bonus,
        total_commission, commission_status, rejection_reason, reviewed_by, reviewed_at,
        paid_at, payout_reference, created_by, created_at
 FROM sale";

fn decimal_column(
    row: &sqlx::sqlite::SqliteRow,
    column: &str,
) -> Result<rust_decimal::Decimal, RepositoryError> {
    let raw: String = row.try_get(column).map_err(decode_error)?;
    parse_decimal(column, &raw)
}

fn row_to_sale(row: &sqlx::sqlite::SqliteRow) -> Result<Sale, RepositoryError> {
    let quantity: i64 = row.try_get("quantity").map_err(decode_error)?;
    let rate_source_json: String = row.try_get("rate_source_json").map_err(decode_error)?;
    let applied_rule_id: Option<String> = row.try_get("applied_rule_id").map_err(decode_error)?;
    let status: String = row.try_get("commission_status").map_err(decode_error)?;
    let sale_date: String = row.try_get("sale_date").map_err(decode_error)?;
    let created_at: String = row.try_get("created_at").map_err(decode_error)?;

    let commission = CommissionBreakdown {
        total_amount: decimal_column(row, "total_amount")?,
        commission_rate: decimal_column(row, "commission_rate")?,
        rate_source: serde_json::from_str::<RateSource>(&rate_source_json)
            .map_err(|error| RepositoryError::Decode(format!("rate_source_json: {error}")))?,
        applied_rule_id: applied_rule_id.map(EligibilityRuleId),
        commission_amount: decimal_column(row, "commission_amount")?,
        spiff_bonus: decimal_column(row, "spiff_bonus")?,
        total_commission: decimal_column(row, "total_commission")?,
        commission_status: status.parse::<CommissionStatus>().map_err(decode_error)?,
    };

    Ok(Sale {
        id: SaleId(row.try_get("id").map_err(decode_error)?),
        partner_id: PartnerId(row.try_get("partner_id").map_err(decode_error)?),
        product_id: ProductId(row.try_get("product_id").map_err(decode_error)?),
        quantity: u32::try_from(quantity)
            .map_err(|_| RepositoryError::Decode(format!("quantity out of range: {quantity}")))?,
        unit_price: decimal_column(row, "unit_price")?,
        sale_date: parse_timestamp("sale_date", &sale_date)?,
        customer_reference: row.try_get("customer_reference").map_err(decode_error)?,
        notes: row.try_get("notes").map_err(decode_error)?,
        sales_channel: row.try_get("sales_channel").map_err(decode_error)?,
        customer_segment: row.try_get("customer_segment").map_err(decode_error)?,
        commission,
        rejection_reason: row.try_get("rejection_reason").map_err(decode_error)?,
        reviewed_by: row.try_get("reviewed_by").map_err(decode_error)?,
        reviewed_at: parse_optional_timestamp(
            "reviewed_at",
            row.try_get("reviewed_at").map_err(decode_error)?,
        )?,
        paid_at: parse_optional_timestamp("paid_at", row.try_get("paid_at").map_err(decode_error)?)?,
        payout_reference: row.try_get("payout_reference").map_err(decode_error)?,
        created_by: row.try_get("created_by").map_err(decode_error)?,
        created_at: parse_timestamp("created_at", &created_at)?,
    })
}

#[async_trait::async_trait]
impl SaleRepository for SqlSaleRepository {
    async fn insert(&self, sale: Sale) -> Result<(), RepositoryError> {
        let commission = &sale.commission;
        let rate_source_json = serde_json::to_string(&commission.rate_source)
            .map_err(|error| RepositoryError::Decode(format!("rate_source_json: {error}")))?;

        sqlx::query(
            "INSERT INTO sale (id, partner_id, product_id, quantity, unit_price, sale_date,
                               customer_reference, notes, sales_channel, customer_segment,
                               total_amount, commission_rate, rate_source_json, applied_rule_id,
                               commission_amount, spiff_bonus, total_commission,
                               commission_status, rejection_reason, reviewed_by, reviewed_at,
                               paid_at, payout_reference, created_by, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&sale.id.0)
        .bind(&sale.partner_id.0)
        .bind(&sale.product_id.0)
        .bind(i64::from(sale.quantity))
        .bind(sale.unit_price.to_string())
        .bind(format_timestamp(sale.sale_date))
        .bind(&sale.customer_reference)
        .bind(&sale.notes)
        .bind(&sale.sales_channel)
        .bind(&sale.customer_segment)
        .bind(commission.total_amount.to_string())
        .bind(commission.commission_rate.to_string())
        .bind(rate_source_json)
        .bind(commission.applied_rule_id.as_ref().map(|rule_id| rule_id.0.clone()))
        .bind(commission.commission_amount.to_string())
        .bind(commission.spiff_bonus.to_string())
        .bind(commission.total_commission.to_string())
        .bind(commission.commission_status.as_str())
        .bind(&sale.rejection_reason)
        .bind(&sale.reviewed_by)
        .bind(sale.reviewed_at.map(format_timestamp))
        .bind(sale.paid_at.map(format_timestamp))
        .bind(&sale.payout_reference)
        .bind(&sale.created_by)
        .bind(format_timestamp(sale.created_at))
        .execute(&self.pool)
        .await
        .map_err(|error| insert_error(&sale.id.0, error))?;

        Ok(())
    }

    async fn find_by_id(&self, id: &SaleId) -> Result<Option<Sale>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_SALE} WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_sale).transpose()
    }

    async fn list(&self, filter: &SaleFilter) -> Result<Vec<Sale>, RepositoryError> {
        let mut query = QueryBuilder::<Sqlite>::new(SELECT_SALE);
        query.push(" WHERE 1 = 1");
        if let Some(partner_id) = &filter.partner_id {
            query.push(" AND partner_id = ").push_bind(partner_id.0.clone());
        }
        if let Some(status) = filter.status {
            query.push(" AND commission_status = ").push_bind(status.as_str());
        }
        query.push(" ORDER BY created_at DESC, id DESC");

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_sale).collect()
    }

    async fn apply_transition(
        &self,
        transition: &CommissionTransition,
    ) -> Result<bool, RepositoryError> {
        let occurred_at = format_timestamp(transition.occurred_at);
        let result = match transition.to {
            CommissionStatus::Paid => {
                sqlx::query(
                    "UPDATE sale SET commission_status = ?, paid_at = ?, payout_reference = ?
                     WHERE id = ? AND commission_status = ?",
                )
                .bind(transition.to.as_str())
                .bind(&occurred_at)
                .bind(&transition.payout_reference)
                .bind(&transition.sale_id.0)
                .bind(transition.from.as_str())
                .execute(&self.pool)
                .await?
            }
            _ => {
                sqlx::query(
                    "UPDATE sale SET commission_status = ?, reviewed_by = ?, reviewed_at = ?,
                                     rejection_reason = ?
                     WHERE id = ? AND commission_status = ?",
                )
                .bind(transition.to.as_str())
                .bind(&transition.actor_id)
                .bind(&occurred_at)
                .bind(&transition.rejection_reason)
                .bind(&transition.sale_id.0)
                .bind(transition.from.as_str())
                .execute(&self.pool)
                .await?
            }
        };

        Ok(result.rows_affected() == 1)
    }
}
