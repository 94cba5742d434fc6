use chrono::{DateTime, Utc};
use clap::Args;
use rust_decimal::Decimal;

use commissions_core::domain::rule::EligibilityRuleDraft;

use crate::commands::{run_with_service, CommandResult};

#[derive(Debug, Clone, Args)]
pub struct CreateRuleArgs {
    #[arg(long, help = "Product category the rule applies to")]
    pub product_type: String,
    #[arg(long = "channel")]
    pub sales_channel: String,
    #[arg(long = "segment")]
    pub customer_segment: String,
    #[arg(long, help = "Mark matching sales as not commission-eligible")]
    pub ineligible: bool,
    #[arg(long, help = "Percentage that replaces the tier rate for matching sales")]
    pub rate_override: Option<Decimal>,
    #[arg(long, help = "RFC 3339 start of the rule window; defaults to now")]
    pub effective_start: Option<DateTime<Utc>>,
    #[arg(long, help = "RFC 3339 exclusive end of the rule window")]
    pub effective_end: Option<DateTime<Utc>>,
}

pub fn list() -> CommandResult {
    run_with_service("rules list", |service| async move { service.list_eligibility_rules().await })
}

pub fn create(args: CreateRuleArgs) -> CommandResult {
    let draft = EligibilityRuleDraft {
        product_type: args.product_type,
        sales_channel: args.sales_channel,
        customer_segment: args.customer_segment,
        eligible: !args.ineligible,
        commission_rate_override: args.rate_override,
        effective_start: args.effective_start.unwrap_or_else(Utc::now),
        effective_end: args.effective_end,
    };

    run_with_service("rules create", |service| async move {
        service.create_eligibility_rule(draft).await
    })
}
