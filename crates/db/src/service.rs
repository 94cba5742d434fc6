//! Async application surface over the pure commission core.
//!
//! Loads what the engine and state machine need from the repositories, threads the
//! clock through, persists outcomes with compare-and-set, and logs each boundary
//! event.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use commissions_core::analytics::{
    summarize, summarize_partner, summarize_product, AnalyticsSummary, PartnerSummary,
    ProductSummary,
};
use commissions_core::approvals::{ApprovalStateMachine, BulkApprovalResult, CommissionTransition};
use commissions_core::commission::{
    rules::EligibilityRuleSet, CalculationInput, CommissionEngine, DeterministicCommissionEngine,
};
use commissions_core::config::CommissionsConfig;
use commissions_core::domain::{
    actor::Actor,
    partner::{Partner, PartnerId},
    product::{Product, ProductDraft, ProductId},
    rule::{EligibilityRule, EligibilityRuleDraft, EligibilityRuleId},
    sale::{CommissionBreakdown, Sale, SaleDraft, SaleId},
    tier::{Tier, TierProfile, TierRegistry},
};
use commissions_core::errors::{
    ApplicationError, CommissionError, EligibilityError, IntegrityError, StateError,
    ValidationError,
};

use crate::repositories::{
    EligibilityRuleRepository, InMemoryEligibilityRuleRepository, InMemoryPartnerRepository,
    InMemoryProductRepository, InMemorySaleRepository, PartnerRepository, ProductRepository,
    RepositoryError, SaleFilter, SaleRepository, SqlEligibilityRuleRepository,
    SqlPartnerRepository, SqlProductRepository, SqlSaleRepository,
};
use crate::DbPool;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Commission(#[from] CommissionError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Commission(error) => error.kind(),
            Self::Repository(RepositoryError::Duplicate(_)) => "duplicate",
            Self::Repository(_) => "persistence_error",
        }
    }

    pub fn into_application(self) -> ApplicationError {
        match self {
            Self::Commission(error) => ApplicationError::Commission(error),
            Self::Repository(error) => ApplicationError::Persistence(error.to_string()),
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(error: ValidationError) -> Self {
        Self::Commission(error.into())
    }
}

impl From<EligibilityError> for ServiceError {
    fn from(error: EligibilityError) -> Self {
        Self::Commission(error.into())
    }
}

impl From<IntegrityError> for ServiceError {
    fn from(error: IntegrityError) -> Self {
        Self::Commission(error.into())
    }
}

impl From<StateError> for ServiceError {
    fn from(error: StateError) -> Self {
        Self::Commission(error.into())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RecordedSale {
    pub sale: Sale,
    pub breakdown: CommissionBreakdown,
}

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Clone)]
pub struct Repositories {
    pub partners: Arc<dyn PartnerRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub rules: Arc<dyn EligibilityRuleRepository>,
    pub sales: Arc<dyn SaleRepository>,
}

impl Repositories {
    pub fn sqlite(pool: DbPool) -> Self {
        Self {
            partners: Arc::new(SqlPartnerRepository::new(pool.clone())),
            products: Arc::new(SqlProductRepository::new(pool.clone())),
            rules: Arc::new(SqlEligibilityRuleRepository::new(pool.clone())),
            sales: Arc::new(SqlSaleRepository::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            partners: Arc::new(InMemoryPartnerRepository::default()),
            products: Arc::new(InMemoryProductRepository::default()),
            rules: Arc::new(InMemoryEligibilityRuleRepository::default()),
            sales: Arc::new(InMemorySaleRepository::default()),
        }
    }
}

#[derive(Clone)]
pub struct CommissionService {
    repositories: Repositories,
    engine: Arc<dyn CommissionEngine>,
    approvals: ApprovalStateMachine,
    tiers: TierRegistry,
    clock: Clock,
}

impl CommissionService {
    pub fn new(repositories: Repositories) -> Self {
        Self {
            repositories,
            engine: Arc::new(DeterministicCommissionEngine::default()),
            approvals: ApprovalStateMachine::default(),
            tiers: TierRegistry::standard(),
            clock: Arc::new(Utc::now),
        }
    }

    /// Applies the `[commissions]` config section: reviewer/payout roles and spiffs.
    pub fn from_config(repositories: Repositories, config: &CommissionsConfig) -> Self {
        let service = Self::new(repositories)
            .with_approvals(ApprovalStateMachine::new(config.approval_policy()));
        match config.spiff_policy() {
            Some(policy) => service.with_engine(Arc::new(DeterministicCommissionEngine::new(policy))),
            None => service,
        }
    }

    pub fn with_engine(mut self, engine: Arc<dyn CommissionEngine>) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_approvals(mut self, approvals: ApprovalStateMachine) -> Self {
        self.approvals = approvals;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn repositories(&self) -> &Repositories {
        &self.repositories
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    pub async fn record_sale(
        &self,
        draft: SaleDraft,
        actor: &Actor,
    ) -> Result<RecordedSale, ServiceError> {
        draft.validate()?;

        let partner = self
            .repositories
            .partners
            .find_by_id(&draft.partner_id)
            .await?
            .ok_or_else(|| ValidationError::UnknownPartner(draft.partner_id.clone()))?;
        let product = self
            .repositories
            .products
            .find_by_id(&draft.product_id)
            .await?
            .ok_or_else(|| ValidationError::UnknownProduct(draft.product_id.clone()))?;
        let rules: EligibilityRuleSet = self.repositories.rules.list().await?.into_iter().collect();

        let now = self.now();
        let breakdown = self
            .engine
            .calculate(CalculationInput {
                sale: &draft,
                partner: &partner,
                product: &product,
                rules: &rules,
                now,
            })
            .map_err(|error| {
                log_calculation_failure(&draft, &error);
                error
            })?;

        let sale_id = SaleId(format!("sale-{}", Uuid::new_v4().simple()));
        let sale = Sale::from_draft(sale_id, draft, breakdown.clone(), actor.id.clone(), now);
        self.repositories.sales.insert(sale.clone()).await?;

        info!(
            event_name = "commission.sale.recorded",
            sale_id = %sale.id,
            partner_id = %sale.partner_id,
            product_id = %sale.product_id,
            actor_id = %actor.id,
            total_amount = %breakdown.total_amount,
            commission_rate = %breakdown.commission_rate,
            total_commission = %breakdown.total_commission,
            "sale recorded with pending commission"
        );

        Ok(RecordedSale { sale, breakdown })
    }

    pub async fn approve_commission(
        &self,
        sale_id: &SaleId,
        actor: &Actor,
    ) -> Result<Sale, ServiceError> {
        self.approvals.policy().ensure_can_review(actor).map_err(|error| {
            log_forbidden(actor, "approve", &error);
            error
        })?;

        let sale = self.load_sale(sale_id).await?;
        let transition = self.approvals.approve(&sale, actor, self.now())?;
        let sale = self.commit(sale, transition).await?;

        info!(
            event_name = "commission.approved",
            sale_id = %sale.id,
            actor_id = %actor.id,
            total_commission = %sale.total_commission(),
            "commission approved"
        );
        Ok(sale)
    }

    pub async fn reject_commission(
        &self,
        sale_id: &SaleId,
        actor: &Actor,
        reason: &str,
    ) -> Result<Sale, ServiceError> {
        self.approvals.policy().ensure_can_review(actor).map_err(|error| {
            log_forbidden(actor, "reject", &error);
            error
        })?;

        let sale = self.load_sale(sale_id).await?;
        let transition = self.approvals.reject(&sale, actor, reason, self.now())?;
        let sale = self.commit(sale, transition).await?;

        info!(
            event_name = "commission.rejected",
            sale_id = %sale.id,
            actor_id = %actor.id,
            reason = sale.rejection_reason.as_deref().unwrap_or_default(),
            "commission rejected"
        );
        Ok(sale)
    }

    /// Approves each pending id independently. Unknown and non-pending ids are
    /// reported as skipped; an actor without review rights fails the whole call
    /// before any id is touched.
    pub async fn bulk_approve_commissions(
        &self,
        sale_ids: &[SaleId],
        actor: &Actor,
    ) -> Result<BulkApprovalResult, ServiceError> {
        self.approvals.policy().ensure_can_review(actor).map_err(|error| {
            log_forbidden(actor, "bulk_approve", &error);
            error
        })?;

        let mut result = BulkApprovalResult::default();
        for sale_id in sale_ids {
            match self.approve_one(sale_id, actor).await {
                Ok(()) => result.record_approved(sale_id.clone()),
                Err(ServiceError::Commission(error)) => {
                    result.skip_or_abort(sale_id.clone(), error)?;
                }
                Err(other) => return Err(other),
            }
        }

        info!(
            event_name = "commission.bulk_approved",
            actor_id = %actor.id,
            requested = sale_ids.len(),
            approved = result.approved.len(),
            skipped = result.skipped.len(),
            "bulk approval finished"
        );
        Ok(result)
    }

    async fn approve_one(&self, sale_id: &SaleId, actor: &Actor) -> Result<(), ServiceError> {
        let sale = self.load_sale(sale_id).await?;
        let transition = self.approvals.approve(&sale, actor, self.now())?;
        self.commit(sale, transition).await?;
        Ok(())
    }

    /// Called once the payout collaborator reports funds have moved.
    pub async fn mark_commission_paid(
        &self,
        sale_id: &SaleId,
        actor: &Actor,
        payout_reference: Option<&str>,
    ) -> Result<Sale, ServiceError> {
        self.approvals.policy().ensure_can_mark_paid(actor).map_err(|error| {
            log_forbidden(actor, "mark_paid", &error);
            error
        })?;

        let sale = self.load_sale(sale_id).await?;
        let transition = self.approvals.mark_paid(&sale, actor, payout_reference, self.now())?;
        let sale = self.commit(sale, transition).await?;

        info!(
            event_name = "commission.paid",
            sale_id = %sale.id,
            actor_id = %actor.id,
            payout_reference = sale.payout_reference.as_deref().unwrap_or_default(),
            total_commission = %sale.total_commission(),
            "commission marked paid"
        );
        Ok(sale)
    }

    pub async fn get_analytics_overview(&self) -> Result<AnalyticsSummary, ServiceError> {
        let sales = self.repositories.sales.list(&SaleFilter::default()).await?;
        Ok(summarize(&sales))
    }

    pub async fn partner_summary(
        &self,
        partner_id: &PartnerId,
    ) -> Result<PartnerSummary, ServiceError> {
        let filter = SaleFilter { partner_id: Some(partner_id.clone()), status: None };
        let sales = self.repositories.sales.list(&filter).await?;
        Ok(summarize_partner(partner_id, &sales))
    }

    pub async fn product_summary(
        &self,
        product_id: &ProductId,
    ) -> Result<ProductSummary, ServiceError> {
        let sales = self.repositories.sales.list(&SaleFilter::default()).await?;
        Ok(summarize_product(product_id, &sales))
    }

    pub async fn list_sales(&self, filter: &SaleFilter) -> Result<Vec<Sale>, ServiceError> {
        Ok(self.repositories.sales.list(filter).await?)
    }

    pub async fn list_eligibility_rules(&self) -> Result<Vec<EligibilityRule>, ServiceError> {
        Ok(self.repositories.rules.list().await?)
    }

    pub async fn create_eligibility_rule(
        &self,
        draft: EligibilityRuleDraft,
    ) -> Result<EligibilityRule, ServiceError> {
        let rule_id = EligibilityRuleId(format!("rule-{}", Uuid::new_v4().simple()));
        let rule = draft.into_rule(rule_id, self.now())?;
        self.repositories.rules.insert(rule.clone()).await?;

        info!(
            event_name = "commission.rule.created",
            rule_id = %rule.id,
            product_type = %rule.product_type,
            sales_channel = %rule.sales_channel,
            customer_segment = %rule.customer_segment,
            eligible = rule.eligible,
            "eligibility rule created"
        );
        Ok(rule)
    }

    pub async fn create_product(&self, draft: ProductDraft) -> Result<Product, ServiceError> {
        let product_id = ProductId(format!("prd-{}", Uuid::new_v4().simple()));
        let product = draft.into_product(product_id, self.now())?;
        self.repositories.products.save(product.clone()).await?;

        info!(
            event_name = "commission.product.created",
            product_id = %product.id,
            sku = %product.sku,
            category = %product.category,
            "product created"
        );
        Ok(product)
    }

    pub async fn reassign_partner_tier(
        &self,
        partner_id: &PartnerId,
        tier: Tier,
        actor: &Actor,
    ) -> Result<Partner, ServiceError> {
        let mut partner = self
            .repositories
            .partners
            .find_by_id(partner_id)
            .await?
            .ok_or_else(|| ValidationError::UnknownPartner(partner_id.clone()))?;

        let previous = partner.reassign_tier(actor, tier, self.now()).map_err(|error| {
            log_forbidden(actor, "reassign_tier", &error);
            error
        })?;
        self.repositories.partners.save(partner.clone()).await?;

        info!(
            event_name = "commission.partner.tier_reassigned",
            partner_id = %partner.id,
            actor_id = %actor.id,
            previous_tier = %previous,
            tier = %partner.tier,
            "partner tier reassigned"
        );
        Ok(partner)
    }

    pub fn tier_profiles(&self) -> &[TierProfile] {
        self.tiers.profiles()
    }

    pub fn tier_for_volume(&self, annual_volume: Decimal) -> Option<&TierProfile> {
        self.tiers.tier_for_volume(annual_volume).and_then(|tier| self.tiers.profile(tier))
    }

    async fn load_sale(&self, sale_id: &SaleId) -> Result<Sale, ServiceError> {
        self.repositories
            .sales
            .find_by_id(sale_id)
            .await?
            .ok_or_else(|| StateError::NotFound(sale_id.clone()).into())
    }

    /// Persists `transition` with a compare-and-set. A lost race reports the status
    /// the winner left behind.
    async fn commit(
        &self,
        mut sale: Sale,
        transition: CommissionTransition,
    ) -> Result<Sale, ServiceError> {
        if self.repositories.sales.apply_transition(&transition).await? {
            transition.apply(&mut sale);
            return Ok(sale);
        }

        let current = self
            .repositories
            .sales
            .find_by_id(&transition.sale_id)
            .await?
            .map(|stored| stored.status())
            .unwrap_or(transition.from);
        warn!(
            event_name = "commission.transition.conflict",
            sale_id = %transition.sale_id,
            expected = %transition.from,
            current = %current,
            requested = %transition.to,
            "concurrent status change detected"
        );

        Err(StateError::InvalidTransition {
            sale_id: transition.sale_id,
            from: current,
            to: transition.to,
        }
        .into())
    }
}

fn log_calculation_failure(draft: &SaleDraft, failure: &CommissionError) {
    if failure.is_integrity() {
        error!(
            event_name = "commission.integrity_error",
            partner_id = %draft.partner_id,
            product_id = %draft.product_id,
            error_kind = failure.kind(),
            error = %failure,
            "reference data is inconsistent"
        );
    } else {
        warn!(
            event_name = "commission.sale.rejected",
            partner_id = %draft.partner_id,
            product_id = %draft.product_id,
            error_kind = failure.kind(),
            error = %failure,
            "no commission created for sale"
        );
    }
}

fn log_forbidden(actor: &Actor, action: &'static str, failure: &StateError) {
    warn!(
        event_name = "commission.forbidden",
        actor_id = %actor.id,
        role = %actor.role,
        action,
        error = %failure,
        "actor lacks permission"
    );
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rust_decimal::Decimal;

    use commissions_core::approvals::{ApprovalStateMachine, CommissionTransition, SkipReason};
    use commissions_core::commission::spiff::{
        SpiffAssignment, SpiffCampaign, SpiffIncentive,
    };
    use commissions_core::config::AppConfig;
    use commissions_core::errors::{CommissionError, StateError};
    use commissions_core::domain::{
        actor::{Actor, ActorRole},
        partner::{Partner, PartnerId, PartnerStatus},
        product::{Product, ProductDraft, ProductId, TierCommissions},
        rule::EligibilityRuleDraft,
        sale::{CommissionStatus, RateSource, Sale, SaleDraft, SaleId},
        tier::Tier,
    };

    use super::{CommissionService, Repositories, ServiceError};
    use crate::repositories::{
        InMemorySaleRepository, PartnerRepository, ProductRepository, RepositoryError,
        SaleFilter, SaleRepository,
    };
    use crate::{connect_with_settings, migrations};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
    }

    fn finance() -> Actor {
        Actor::new("fin-1", ActorRole::Finance)
    }

    fn partner_user() -> Actor {
        Actor::new("ptn-user", ActorRole::Partner)
    }

    async fn seeded(repositories: Repositories) -> CommissionService {
        let created = now() - Duration::days(30);
        repositories
            .partners
            .save(Partner {
                id: PartnerId("PTN-1".to_string()),
                company_name: "Acme Resellers".to_string(),
                contact_name: "Sam Lee".to_string(),
                contact_email: "sam@acme.test".to_string(),
                tier: Tier::Gold,
                status: PartnerStatus::Approved,
                created_at: created,
                updated_at: created,
            })
            .await
            .expect("partner");
        repositories
            .products
            .save(Product {
                id: ProductId("P-1".to_string()),
                sku: "SW-PRO".to_string(),
                name: "Pro Suite".to_string(),
                category: "software".to_string(),
                base_price: Decimal::from(100),
                tier_commissions: TierCommissions {
                    bronze: Decimal::from(10),
                    silver: Decimal::from(12),
                    gold: Decimal::from(15),
                    platinum: Decimal::from(20),
                },
                active: true,
                created_at: created,
            })
            .await
            .expect("product");

        CommissionService::new(repositories).with_clock(Arc::new(now))
    }

    fn draft(quantity: u32) -> SaleDraft {
        SaleDraft {
            partner_id: PartnerId("PTN-1".to_string()),
            product_id: ProductId("P-1".to_string()),
            quantity,
            unit_price: Decimal::from(100),
            sale_date: now(),
            customer_reference: Some("PO-1".to_string()),
            notes: None,
            sales_channel: Some("reseller".to_string()),
            customer_segment: Some("enterprise".to_string()),
        }
    }

    /// Lets a queued rival transition land right before each write it sees,
    /// so the caller's compare-and-set always loses.
    #[derive(Default)]
    struct RacingSales {
        inner: InMemorySaleRepository,
        rival: std::sync::Mutex<Option<CommissionTransition>>,
    }

    #[async_trait::async_trait]
    impl SaleRepository for RacingSales {
        async fn insert(&self, sale: Sale) -> Result<(), RepositoryError> {
            self.inner.insert(sale).await
        }

        async fn find_by_id(&self, id: &SaleId) -> Result<Option<Sale>, RepositoryError> {
            self.inner.find_by_id(id).await
        }

        async fn list(&self, filter: &SaleFilter) -> Result<Vec<Sale>, RepositoryError> {
            self.inner.list(filter).await
        }

        async fn apply_transition(
            &self,
            transition: &CommissionTransition,
        ) -> Result<bool, RepositoryError> {
            let rival = self.rival.lock().expect("rival lock").take();
            if let Some(rival) = rival {
                assert!(self.inner.apply_transition(&rival).await?, "rival write should land");
            }
            self.inner.apply_transition(transition).await
        }
    }

    fn rule_draft(eligible: bool, rate: Option<Decimal>, start: DateTime<Utc>) -> EligibilityRuleDraft {
        EligibilityRuleDraft {
            product_type: "Software".to_string(),
            sales_channel: " reseller ".to_string(),
            customer_segment: "enterprise".to_string(),
            eligible,
            commission_rate_override: rate,
            effective_start: start,
            effective_end: None,
        }
    }

    #[tokio::test]
    async fn record_sale_persists_pending_commission() {
        let service = seeded(Repositories::in_memory()).await;

        let recorded = service.record_sale(draft(2), &partner_user()).await.expect("record");
        assert_eq!(recorded.breakdown.total_amount, Decimal::from(200));
        assert_eq!(recorded.breakdown.commission_amount.to_string(), "30.00");
        assert_eq!(recorded.sale.status(), CommissionStatus::Pending);
        assert_eq!(recorded.sale.created_by, "ptn-user");

        let listed = service.list_sales(&SaleFilter::default()).await.expect("list");
        assert_eq!(listed, vec![recorded.sale]);
    }

    #[tokio::test]
    async fn unknown_partner_and_product_are_validation_errors() {
        let service = seeded(Repositories::in_memory()).await;

        let mut unknown_partner = draft(1);
        unknown_partner.partner_id = PartnerId("PTN-404".to_string());
        let error = service.record_sale(unknown_partner, &partner_user()).await.expect_err("partner");
        assert_eq!(error.kind(), "validation_error");

        let mut unknown_product = draft(1);
        unknown_product.product_id = ProductId("P-404".to_string());
        let error = service.record_sale(unknown_product, &partner_user()).await.expect_err("product");
        assert_eq!(error.kind(), "validation_error");

        let error = service.record_sale(draft(0), &partner_user()).await.expect_err("quantity");
        assert_eq!(error.kind(), "validation_error");
        assert!(service.list_sales(&SaleFilter::default()).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn rules_created_through_service_drive_calculation() {
        let service = seeded(Repositories::in_memory()).await;

        service
            .create_eligibility_rule(rule_draft(true, Some(Decimal::from(20)), now() - Duration::days(10)))
            .await
            .expect("override rule");
        let recorded = service.record_sale(draft(2), &partner_user()).await.expect("record");
        assert_eq!(recorded.breakdown.commission_amount, Decimal::from(40));
        assert!(matches!(recorded.breakdown.rate_source, RateSource::RuleOverride { .. }));

        service
            .create_eligibility_rule(rule_draft(false, None, now() - Duration::days(1)))
            .await
            .expect("block rule");
        let error = service.record_sale(draft(2), &partner_user()).await.expect_err("blocked");
        assert_eq!(error.kind(), "commission_ineligible");

        assert_eq!(service.list_eligibility_rules().await.expect("rules").len(), 2);
    }

    #[tokio::test]
    async fn invalid_rule_is_rejected() {
        let service = seeded(Repositories::in_memory()).await;
        let mut blank = rule_draft(true, None, now());
        blank.sales_channel = "   ".to_string();
        let error = service.create_eligibility_rule(blank).await.expect_err("blank key");
        assert_eq!(error.kind(), "validation_error");
        assert!(service.list_eligibility_rules().await.expect("rules").is_empty());
    }

    #[tokio::test]
    async fn losing_reviewer_sees_the_winning_status() {
        let sales = Arc::new(RacingSales::default());
        let mut repositories = Repositories::in_memory();
        repositories.sales = Arc::clone(&sales) as Arc<dyn SaleRepository>;
        let service = seeded(repositories).await;
        let sale = service.record_sale(draft(1), &partner_user()).await.expect("record").sale;

        let rejection = ApprovalStateMachine::default()
            .reject(&sale, &Actor::new("admin-1", ActorRole::Admin), "duplicate order", now())
            .expect("reject");
        *sales.rival.lock().expect("rival lock") = Some(rejection);

        let error = service.approve_commission(&sale.id, &finance()).await.expect_err("lost race");
        assert_eq!(error.kind(), "invalid_transition");
        match error {
            ServiceError::Commission(CommissionError::State(StateError::InvalidTransition {
                sale_id,
                from,
                to,
            })) => {
                assert_eq!(sale_id, sale.id);
                assert_eq!(from, CommissionStatus::Rejected);
                assert_eq!(to, CommissionStatus::Approved);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let stored = service.list_sales(&SaleFilter::default()).await.expect("list");
        assert_eq!(stored[0].status(), CommissionStatus::Rejected);
        assert_eq!(stored[0].rejection_reason.as_deref(), Some("duplicate order"));
    }

    #[tokio::test]
    async fn concurrent_approve_and_reject_have_one_winner() {
        let service = seeded(Repositories::in_memory()).await;
        let sale = service.record_sale(draft(1), &partner_user()).await.expect("record").sale;

        let approve = {
            let service = service.clone();
            let sale_id = sale.id.clone();
            tokio::spawn(async move { service.approve_commission(&sale_id, &finance()).await })
        };
        let reject = {
            let service = service.clone();
            let sale_id = sale.id.clone();
            tokio::spawn(async move {
                service.reject_commission(&sale_id, &finance(), "wrong partner").await
            })
        };

        let outcomes = [approve.await.expect("join"), reject.await.expect("join")];
        assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
        let loser = outcomes.iter().find_map(|outcome| outcome.as_ref().err()).expect("one loser");
        assert_eq!(loser.kind(), "invalid_transition");
    }

    #[tokio::test]
    async fn approve_twice_and_approve_then_reject_are_invalid() {
        let service = seeded(Repositories::in_memory()).await;
        let sale = service.record_sale(draft(1), &partner_user()).await.expect("record").sale;

        let approved = service.approve_commission(&sale.id, &finance()).await.expect("approve");
        assert_eq!(approved.status(), CommissionStatus::Approved);
        assert_eq!(approved.reviewed_by.as_deref(), Some("fin-1"));

        let again = service.approve_commission(&sale.id, &finance()).await.expect_err("twice");
        assert_eq!(again.kind(), "invalid_transition");
        let reject = service
            .reject_commission(&sale.id, &finance(), "changed mind")
            .await
            .expect_err("reject after approve");
        assert_eq!(reject.kind(), "invalid_transition");
    }

    #[tokio::test]
    async fn reject_requires_reason_and_reviewer_role() {
        let service = seeded(Repositories::in_memory()).await;
        let sale = service.record_sale(draft(1), &partner_user()).await.expect("record").sale;

        let blank = service.reject_commission(&sale.id, &finance(), "  ").await.expect_err("blank");
        assert_eq!(blank.kind(), "missing_reason");

        let forbidden = service
            .reject_commission(&sale.id, &partner_user(), "nope")
            .await
            .expect_err("partner cannot review");
        assert_eq!(forbidden.kind(), "forbidden");

        let rejected = service
            .reject_commission(&sale.id, &finance(), "duplicate order")
            .await
            .expect("reject");
        assert_eq!(rejected.rejection_reason.as_deref(), Some("duplicate order"));
    }

    #[tokio::test]
    async fn missing_sale_is_not_found() {
        let service = seeded(Repositories::in_memory()).await;
        let error = service
            .approve_commission(&SaleId("sale-missing".to_string()), &finance())
            .await
            .expect_err("missing");
        assert_eq!(error.kind(), "not_found");
    }

    #[tokio::test]
    async fn bulk_approve_skips_non_pending_and_unknown_ids() {
        let service = seeded(Repositories::in_memory()).await;
        let pending = service.record_sale(draft(1), &partner_user()).await.expect("a").sale;
        let approved = service.record_sale(draft(2), &partner_user()).await.expect("b").sale;
        service.approve_commission(&approved.id, &finance()).await.expect("pre-approve");
        let missing = SaleId("sale-missing".to_string());

        let result = service
            .bulk_approve_commissions(
                &[pending.id.clone(), approved.id.clone(), missing.clone()],
                &finance(),
            )
            .await
            .expect("bulk");

        assert_eq!(result.approved, vec![pending.id]);
        assert_eq!(result.skipped.len(), 2);
        assert_eq!(result.skipped[0].sale_id, approved.id);
        assert_eq!(
            result.skipped[0].reason,
            SkipReason::InvalidTransition { from: CommissionStatus::Approved }
        );
        assert_eq!(result.skipped[1].sale_id, missing);
        assert_eq!(result.skipped[1].reason, SkipReason::NotFound);
    }

    #[tokio::test]
    async fn bulk_approve_by_forbidden_actor_touches_nothing() {
        let service = seeded(Repositories::in_memory()).await;
        let sale = service.record_sale(draft(1), &partner_user()).await.expect("record").sale;

        let error = service
            .bulk_approve_commissions(&[sale.id.clone()], &partner_user())
            .await
            .expect_err("forbidden");
        assert!(matches!(error, ServiceError::Commission(_)));
        assert_eq!(error.kind(), "forbidden");

        let stored = service
            .list_sales(&SaleFilter { partner_id: None, status: Some(CommissionStatus::Pending) })
            .await
            .expect("list");
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn paid_flow_updates_analytics() {
        let service = seeded(Repositories::in_memory()).await;
        let first = service.record_sale(draft(2), &partner_user()).await.expect("first").sale;
        service.record_sale(draft(1), &partner_user()).await.expect("second");

        let before_payout = service.get_analytics_overview().await.expect("overview");
        assert_eq!(before_payout.total_sales, 2);

        let premature = service
            .mark_commission_paid(&first.id, &finance(), Some("ACH-1"))
            .await
            .expect_err("not approved yet");
        assert_eq!(premature.kind(), "invalid_transition");

        service.approve_commission(&first.id, &finance()).await.expect("approve");
        let payout = Actor::new("payout-bot", ActorRole::PayoutService);
        let paid = service
            .mark_commission_paid(&first.id, &payout, Some("ACH-1"))
            .await
            .expect("paid");
        assert_eq!(paid.status(), CommissionStatus::Paid);

        let overview = service.get_analytics_overview().await.expect("overview");
        assert_eq!(overview.total_sales_amount, Decimal::from(300));
        assert_eq!(overview.total_commissions, Decimal::from(45));
        assert_eq!(overview.paid_commissions, Decimal::from(30));
        assert_eq!(overview.pending_commissions, Decimal::from(15));

        let partner = service.partner_summary(&PartnerId("PTN-1".to_string())).await.expect("partner");
        assert_eq!(partner.sales_count, 2);
        assert_eq!(partner.paid, Decimal::from(30));

        let product = service.product_summary(&ProductId("P-1".to_string())).await.expect("product");
        assert_eq!(product.quantity_sold, 3);
    }

    #[tokio::test]
    async fn tier_reassignment_changes_future_rates_only() {
        let service = seeded(Repositories::in_memory()).await;
        let before = service.record_sale(draft(2), &partner_user()).await.expect("before");

        let forbidden = service
            .reassign_partner_tier(&PartnerId("PTN-1".to_string()), Tier::Platinum, &partner_user())
            .await
            .expect_err("partner cannot reassign");
        assert_eq!(forbidden.kind(), "forbidden");

        let admin = Actor::new("admin-1", ActorRole::Admin);
        let partner = service
            .reassign_partner_tier(&PartnerId("PTN-1".to_string()), Tier::Platinum, &admin)
            .await
            .expect("reassign");
        assert_eq!(partner.tier, Tier::Platinum);

        let after = service.record_sale(draft(2), &partner_user()).await.expect("after");
        assert_eq!(after.breakdown.commission_amount, Decimal::from(40));

        let stored = service
            .list_sales(&SaleFilter::default())
            .await
            .expect("list")
            .into_iter()
            .find(|sale| sale.id == before.sale.id)
            .expect("first sale");
        assert_eq!(stored.commission.commission_amount, Decimal::from(30));
    }

    #[tokio::test]
    async fn product_creation_validates_rates() {
        let service = seeded(Repositories::in_memory()).await;
        let mut draft = ProductDraft {
            sku: "HW-EDGE".to_string(),
            name: "Edge Appliance".to_string(),
            category: "hardware".to_string(),
            base_price: Decimal::from(3400),
            tier_commissions: TierCommissions {
                bronze: Decimal::from(4),
                silver: Decimal::from(5),
                gold: Decimal::from(-6),
                platinum: Decimal::from(8),
            },
        };
        let error = service.create_product(draft.clone()).await.expect_err("negative rate");
        assert_eq!(error.kind(), "validation_error");

        draft.tier_commissions.gold = Decimal::from(6);
        let product = service.create_product(draft).await.expect("create");
        assert!(product.active);
    }

    #[tokio::test]
    async fn config_enables_spiffs_and_reviewer_roles() {
        let mut config = AppConfig::default().commissions;
        config.reviewer_roles = vec![ActorRole::Admin];
        config.spiff_enabled = true;
        config.spiff_campaigns = vec![SpiffCampaign {
            id: "SPF-1".to_string(),
            name: "Summer".to_string(),
            starts_at: now() - Duration::days(5),
            ends_at: now() + Duration::days(5),
            target_products: vec![ProductId("P-1".to_string())],
            assignment: SpiffAssignment::Tiers(vec![Tier::Gold]),
            incentive: SpiffIncentive::Fixed(Decimal::new(250, 2)),
        }];

        let base = seeded(Repositories::in_memory()).await;
        let service = CommissionService::from_config(base.repositories().clone(), &config)
            .with_clock(Arc::new(now));

        let recorded = service.record_sale(draft(2), &partner_user()).await.expect("record");
        assert_eq!(recorded.breakdown.spiff_bonus, Decimal::from(5));
        assert_eq!(recorded.breakdown.total_commission, Decimal::from(35));

        let error = service
            .approve_commission(&recorded.sale.id, &finance())
            .await
            .expect_err("finance no longer reviews");
        assert_eq!(error.kind(), "forbidden");
    }

    #[tokio::test]
    async fn sqlite_backed_service_round_trip() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let service = seeded(Repositories::sqlite(pool)).await;

        let sale = service.record_sale(draft(2), &partner_user()).await.expect("record").sale;
        let approved = service.approve_commission(&sale.id, &finance()).await.expect("approve");
        assert_eq!(approved.status(), CommissionStatus::Approved);

        let again = service.approve_commission(&sale.id, &finance()).await.expect_err("twice");
        assert_eq!(again.kind(), "invalid_transition");

        let overview = service.get_analytics_overview().await.expect("overview");
        assert_eq!(overview.approved_commissions.to_string(), "30.00");
    }

    #[test]
    fn tier_lookup_by_volume_returns_profile() {
        let service = CommissionService::new(Repositories::in_memory());
        assert_eq!(service.tier_profiles().len(), 4);
        assert!(service.tier_for_volume(Decimal::from(-1)).is_none());
        assert!(service.tier_for_volume(Decimal::ZERO).is_some());
    }
}
