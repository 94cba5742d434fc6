use sqlx::Row;

use commissions_core::domain::product::{Product, ProductId, TierCommissions};

use super::{
    decode_error, format_timestamp, insert_error, parse_decimal, parse_timestamp,
    ProductRepository, RepositoryError,
};
use crate::DbPool;

pub struct SqlProductRepository {
    pool: DbPool,
}

impl SqlProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const SELECT_PRODUCT: &str = "SELECT id, sku, name, category, base_price, rate_bronze, rate_silver,
        rate_gold, rate_platinum, active, created_at
 FROM product";

fn decimal_column(row: &sqlx::sqlite::SqliteRow, column: &str) -> Result<rust_decimal::Decimal, RepositoryError> {
    let raw: String = row.try_get(column).map_err(decode_error)?;
    parse_decimal(column, &raw)
}

// Tier rates are read back as stored, even if negative, so the engine can flag them.
fn row_to_product(row: &sqlx::sqlite::SqliteRow) -> Result<Product, RepositoryError> {
    let created_at: String = row.try_get("created_at").map_err(decode_error)?;
    let active: i64 = row.try_get("active").map_err(decode_error)?;

    Ok(Product {
        id: ProductId(row.try_get("id").map_err(decode_error)?),
        sku: row.try_get("sku").map_err(decode_error)?,
        name: row.try_get("name").map_err(decode_error)?,
        category: row.try_get("category").map_err(decode_error)?,
        base_price: decimal_column(row, "base_price")?,
        tier_commissions: TierCommissions {
            bronze: decimal_column(row, "rate_bronze")?,
            silver: decimal_column(row, "rate_silver")?,
            gold: decimal_column(row, "rate_gold")?,
            platinum: decimal_column(row, "rate_platinum")?,
        },
        active: active != 0,
        created_at: parse_timestamp("created_at", &created_at)?,
    })
}

#[async_trait::async_trait]
impl ProductRepository for SqlProductRepository {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_PRODUCT} WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_product).transpose()
    }

    async fn save(&self, product: Product) -> Result<(), RepositoryError> {
        let rates = product.tier_commissions;
        sqlx::query(
            "INSERT INTO product (id, sku, name, category, base_price, rate_bronze, rate_silver,
                                  rate_gold, rate_platinum, active, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 category = excluded.category,
                 base_price = excluded.base_price,
                 rate_bronze = excluded.rate_bronze,
                 rate_silver = excluded.rate_silver,
                 rate_gold = excluded.rate_gold,
                 rate_platinum = excluded.rate_platinum,
                 active = excluded.active",
        )
        .bind(&product.id.0)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.base_price.to_string())
        .bind(rates.bronze.to_string())
        .bind(rates.silver.to_string())
        .bind(rates.gold.to_string())
        .bind(rates.platinum.to_string())
        .bind(i64::from(product.active))
        .bind(format_timestamp(product.created_at))
        .execute(&self.pool)
        .await
        .map_err(|error| insert_error(&product.sku, error))?;

        Ok(())
    }

    async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query(&format!("{SELECT_PRODUCT} ORDER BY sku ASC"))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_product).collect()
    }
}
