pub mod commands;
pub mod logging;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::process::ExitCode;

use commands::{
    analytics::AnalyticsScope,
    review::ReviewerArgs,
    rules::CreateRuleArgs,
    sale::{ListSalesArgs, RecordSaleArgs},
    CommandResult,
};

#[derive(Debug, Parser)]
#[command(
    name = "commissions",
    about = "Partner commissions operator CLI",
    long_about = "Record partner sales, review and pay out commissions, manage eligibility rules, and inspect runtime readiness.",
    after_help = "Examples:\n  commissions doctor --json\n  commissions record-sale --partner ptn-acme --product prd-sw-pro --quantity 2 --unit-price 1200\n  commissions approve --sale sale-123 --actor fin-1 --role finance"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the demo partners, products, and eligibility rules (idempotent)")]
    Seed,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, DB connectivity, and schema status")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Record a sale and calculate its pending commission")]
    RecordSale(RecordSaleArgs),
    #[command(about = "List recorded sales, newest first")]
    Sales(ListSalesArgs),
    #[command(about = "Approve a pending commission")]
    Approve {
        #[arg(long = "sale")]
        sale_id: String,
        #[command(flatten)]
        reviewer: ReviewerArgs,
    },
    #[command(about = "Reject a pending commission with a reason")]
    Reject {
        #[arg(long = "sale")]
        sale_id: String,
        #[arg(long)]
        reason: String,
        #[command(flatten)]
        reviewer: ReviewerArgs,
    },
    #[command(about = "Approve many pending commissions; non-pending and unknown ids are skipped")]
    BulkApprove {
        #[arg(long = "sales", value_delimiter = ',', required = true)]
        sale_ids: Vec<String>,
        #[command(flatten)]
        reviewer: ReviewerArgs,
    },
    #[command(about = "Mark an approved commission as paid")]
    MarkPaid {
        #[arg(long = "sale")]
        sale_id: String,
        #[arg(long)]
        payout_reference: Option<String>,
        #[command(flatten)]
        reviewer: ReviewerArgs,
    },
    #[command(subcommand, about = "List or create eligibility rules")]
    Rules(RulesCommand),
    #[command(about = "Summarize sales and commissions, optionally for one partner or product")]
    Analytics {
        #[arg(long = "partner", conflicts_with = "product_id")]
        partner_id: Option<String>,
        #[arg(long = "product")]
        product_id: Option<String>,
    },
    #[command(about = "Show partner tiers and the tier matching an annual volume")]
    Tiers {
        #[arg(long)]
        volume: Option<Decimal>,
    },
}

#[derive(Debug, Subcommand)]
enum RulesCommand {
    #[command(about = "List all eligibility rules in creation order")]
    List,
    #[command(about = "Append a new eligibility rule")]
    Create(CreateRuleArgs),
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    logging::init_from_env();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => CommandResult { exit_code: 0, output: commands::config::run() },
        Command::Doctor { json } => {
            CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::RecordSale(args) => commands::sale::record(args),
        Command::Sales(args) => commands::sale::list(args),
        Command::Approve { sale_id, reviewer } => commands::review::approve(sale_id, reviewer),
        Command::Reject { sale_id, reason, reviewer } => {
            commands::review::reject(sale_id, reason, reviewer)
        }
        Command::BulkApprove { sale_ids, reviewer } => {
            commands::review::bulk_approve(sale_ids, reviewer)
        }
        Command::MarkPaid { sale_id, payout_reference, reviewer } => {
            commands::review::mark_paid(sale_id, payout_reference, reviewer)
        }
        Command::Rules(RulesCommand::List) => commands::rules::list(),
        Command::Rules(RulesCommand::Create(args)) => commands::rules::create(args),
        Command::Analytics { partner_id, product_id } => {
            commands::analytics::run(AnalyticsScope { partner_id, product_id })
        }
        Command::Tiers { volume } => commands::analytics::tiers(volume),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::{Cli, Command, RulesCommand};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn bulk_approve_splits_comma_separated_ids() {
        let cli = Cli::parse_from([
            "commissions",
            "bulk-approve",
            "--sales",
            "sale-a,sale-b",
            "--actor",
            "fin-1",
            "--role",
            "finance",
        ]);
        match cli.command {
            Command::BulkApprove { sale_ids, reviewer } => {
                assert_eq!(sale_ids, vec!["sale-a".to_string(), "sale-b".to_string()]);
                assert_eq!(reviewer.role, "finance");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rules_create_defaults_to_eligible() {
        let cli = Cli::parse_from([
            "commissions",
            "rules",
            "create",
            "--product-type",
            "software",
            "--channel",
            "reseller",
            "--segment",
            "enterprise",
            "--rate-override",
            "18",
        ]);
        match cli.command {
            Command::Rules(RulesCommand::Create(args)) => {
                assert!(!args.ineligible);
                assert_eq!(args.rate_override.map(|rate| rate.to_string()), Some("18".into()));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
