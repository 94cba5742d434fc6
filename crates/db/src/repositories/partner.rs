use sqlx::Row;

use commissions_core::domain::partner::{Partner, PartnerId, PartnerStatus};
use commissions_core::domain::tier::Tier;

use super::{decode_error, format_timestamp, parse_timestamp, PartnerRepository, RepositoryError};
use crate::DbPool;

pub struct SqlPartnerRepository {
    pool: DbPool,
}

impl SqlPartnerRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const SELECT_PARTNER: &str = "SELECT id, company_name, contact_name, contact_email, tier, status,
        created_at, updated_at
 FROM partner";

fn row_to_partner(row: &sqlx::sqlite::SqliteRow) -> Result<Partner, RepositoryError> {
    let tier: String = row.try_get("tier").map_err(decode_error)?;
    let status: String = row.try_get("status").map_err(decode_error)?;
    let created_at: String = row.try_get("created_at").map_err(decode_error)?;
    let updated_at: String = row.try_get("updated_at").map_err(decode_error)?;

    Ok(Partner {
        id: PartnerId(row.try_get("id").map_err(decode_error)?),
        company_name: row.try_get("company_name").map_err(decode_error)?,
        contact_name: row.try_get("contact_name").map_err(decode_error)?,
        contact_email: row.try_get("contact_email").map_err(decode_error)?,
        tier: tier.parse::<Tier>().map_err(decode_error)?,
        status: status.parse::<PartnerStatus>().map_err(decode_error)?,
        created_at: parse_timestamp("created_at", &created_at)?,
        updated_at: parse_timestamp("updated_at", &updated_at)?,
    })
}

#[async_trait::async_trait]
impl PartnerRepository for SqlPartnerRepository {
    async fn find_by_id(&self, id: &PartnerId) -> Result<Option<Partner>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_PARTNER} WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_partner).transpose()
    }

    async fn save(&self, partner: Partner) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO partner (id, company_name, contact_name, contact_email, tier, status,
                                  created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 company_name = excluded.company_name,
                 contact_name = excluded.contact_name,
                 contact_email = excluded.contact_email,
                 tier = excluded.tier,
                 status = excluded.status,
                 updated_at = excluded.updated_at",
        )
        .bind(&partner.id.0)
        .bind(&partner.company_name)
        .bind(&partner.contact_name)
        .bind(&partner.contact_email)
        .bind(partner.tier.as_str())
        .bind(partner.status.as_str())
        .bind(format_timestamp(partner.created_at))
        .bind(format_timestamp(partner.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self) -> Result<Vec<Partner>, RepositoryError> {
        let rows = sqlx::query(&format!("{SELECT_PARTNER} ORDER BY company_name ASC, id ASC"))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_partner).collect()
    }
}
