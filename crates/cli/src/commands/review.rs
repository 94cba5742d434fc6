use clap::Args;

use commissions_core::domain::sale::SaleId;

use crate::commands::{parse_actor, run_with_service, CommandResult};

#[derive(Debug, Clone, Args)]
pub struct ReviewerArgs {
    #[arg(long = "actor", help = "Id of the reviewing user")]
    pub actor_id: String,
    #[arg(long, help = "admin | finance | partner_manager | partner | payout_service")]
    pub role: String,
}

pub fn approve(sale_id: String, reviewer: ReviewerArgs) -> CommandResult {
    const COMMAND: &str = "approve";
    let actor = match parse_actor(COMMAND, &reviewer.actor_id, &reviewer.role) {
        Ok(actor) => actor,
        Err(result) => return result,
    };
    let sale_id = SaleId(sale_id);

    run_with_service(COMMAND, |service| async move {
        service.approve_commission(&sale_id, &actor).await
    })
}

pub fn reject(sale_id: String, reason: String, reviewer: ReviewerArgs) -> CommandResult {
    const COMMAND: &str = "reject";
    let actor = match parse_actor(COMMAND, &reviewer.actor_id, &reviewer.role) {
        Ok(actor) => actor,
        Err(result) => return result,
    };
    let sale_id = SaleId(sale_id);

    run_with_service(COMMAND, |service| async move {
        service.reject_commission(&sale_id, &actor, &reason).await
    })
}

pub fn bulk_approve(sale_ids: Vec<String>, reviewer: ReviewerArgs) -> CommandResult {
    const COMMAND: &str = "bulk-approve";
    let actor = match parse_actor(COMMAND, &reviewer.actor_id, &reviewer.role) {
        Ok(actor) => actor,
        Err(result) => return result,
    };
    let sale_ids: Vec<SaleId> = sale_ids.into_iter().map(SaleId).collect();

    run_with_service(COMMAND, |service| async move {
        service.bulk_approve_commissions(&sale_ids, &actor).await
    })
}

pub fn mark_paid(
    sale_id: String,
    payout_reference: Option<String>,
    reviewer: ReviewerArgs,
) -> CommandResult {
    const COMMAND: &str = "mark-paid";
    let actor = match parse_actor(COMMAND, &reviewer.actor_id, &reviewer.role) {
        Ok(actor) => actor,
        Err(result) => return result,
    };
    let sale_id = SaleId(sale_id);

    run_with_service(COMMAND, |service| async move {
        service.mark_commission_paid(&sale_id, &actor, payout_reference.as_deref()).await
    })
}
