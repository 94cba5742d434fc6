use chrono::{DateTime, Utc};
use clap::Args;
use rust_decimal::Decimal;

use commissions_core::domain::{
    partner::PartnerId,
    product::ProductId,
    sale::{CommissionStatus, SaleDraft},
};
use commissions_db::SaleFilter;

use crate::commands::{parse_actor, run_with_service, CommandResult};

#[derive(Debug, Clone, Args)]
pub struct RecordSaleArgs {
    #[arg(long = "partner", help = "Partner id the sale is attributed to")]
    pub partner_id: String,
    #[arg(long = "product", help = "Product id that was sold")]
    pub product_id: String,
    #[arg(long)]
    pub quantity: u32,
    #[arg(long)]
    pub unit_price: Decimal,
    #[arg(long, help = "RFC 3339 sale date; defaults to now")]
    pub sale_date: Option<DateTime<Utc>>,
    #[arg(long)]
    pub customer_reference: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
    #[arg(long = "channel", help = "Sales channel; `direct` when omitted")]
    pub sales_channel: Option<String>,
    #[arg(long = "segment", help = "Customer segment; `general` when omitted")]
    pub customer_segment: Option<String>,
    #[arg(long = "actor", default_value = "cli")]
    pub actor_id: String,
    #[arg(long, default_value = "partner_manager")]
    pub role: String,
}

pub fn record(args: RecordSaleArgs) -> CommandResult {
    const COMMAND: &str = "record-sale";

    let actor = match parse_actor(COMMAND, &args.actor_id, &args.role) {
        Ok(actor) => actor,
        Err(result) => return result,
    };
    let draft = SaleDraft {
        partner_id: PartnerId(args.partner_id),
        product_id: ProductId(args.product_id),
        quantity: args.quantity,
        unit_price: args.unit_price,
        sale_date: args.sale_date.unwrap_or_else(Utc::now),
        customer_reference: args.customer_reference,
        notes: args.notes,
        sales_channel: args.sales_channel,
        customer_segment: args.customer_segment,
    };

    run_with_service(COMMAND, |service| async move { service.record_sale(draft, &actor).await })
}

#[derive(Debug, Clone, Default, Args)]
pub struct ListSalesArgs {
    #[arg(long = "partner")]
    pub partner_id: Option<String>,
    #[arg(long)]
    pub status: Option<CommissionStatus>,
}

pub fn list(args: ListSalesArgs) -> CommandResult {
    let filter = SaleFilter { partner_id: args.partner_id.map(PartnerId), status: args.status };
    run_with_service("sales", |service| async move { service.list_sales(&filter).await })
}
