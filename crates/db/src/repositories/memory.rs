use std::collections::HashMap;

use tokio::sync::RwLock;

use commissions_core::approvals::CommissionTransition;
use commissions_core::domain::partner::{Partner, PartnerId};
use commissions_core::domain::product::{Product, ProductId};
use commissions_core::domain::rule::EligibilityRule;
use commissions_core::domain::sale::{Sale, SaleId};

use super::{
    EligibilityRuleRepository, PartnerRepository, ProductRepository, RepositoryError, SaleFilter,
    SaleRepository,
};

#[derive(Default)]
pub struct InMemoryPartnerRepository {
    partners: RwLock<HashMap<String, Partner>>,
}

#[async_trait::async_trait]
impl PartnerRepository for InMemoryPartnerRepository {
    async fn find_by_id(&self, id: &PartnerId) -> Result<Option<Partner>, RepositoryError> {
        let partners = self.partners.read().await;
        Ok(partners.get(&id.0).cloned())
    }

    async fn save(&self, partner: Partner) -> Result<(), RepositoryError> {
        let mut partners = self.partners.write().await;
        partners.insert(partner.id.0.clone(), partner);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Partner>, RepositoryError> {
        let partners = self.partners.read().await;
        let mut listed: Vec<Partner> = partners.values().cloned().collect();
        listed.sort_by(|left, right| {
            left.company_name.cmp(&right.company_name).then_with(|| left.id.0.cmp(&right.id.0))
        });
        Ok(listed)
    }
}

#[derive(Default)]
pub struct InMemoryProductRepository {
    products: RwLock<HashMap<String, Product>>,
}

#[async_trait::async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products.get(&id.0).cloned())
    }

    async fn save(&self, mut product: Product) -> Result<(), RepositoryError> {
        let mut products = self.products.write().await;
        if let Some(stored) = products.get(&product.id.0) {
            product.sku = stored.sku.clone();
            product.created_at = stored.created_at;
        }
        let sku_taken =
            products.values().any(|other| other.sku == product.sku && other.id != product.id);
        if sku_taken {
            return Err(RepositoryError::Duplicate(product.sku));
        }
        products.insert(product.id.0.clone(), product);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let products = self.products.read().await;
        let mut listed: Vec<Product> = products.values().cloned().collect();
        listed.sort_by(|left, right| left.sku.cmp(&right.sku));
        Ok(listed)
    }
}

#[derive(Default)]
pub struct InMemoryEligibilityRuleRepository {
    rules: RwLock<Vec<EligibilityRule>>,
}

#[async_trait::async_trait]
impl EligibilityRuleRepository for InMemoryEligibilityRuleRepository {
    async fn insert(&self, rule: EligibilityRule) -> Result<(), RepositoryError> {
        let mut rules = self.rules.write().await;
        if rules.iter().any(|existing| existing.id == rule.id) {
            return Err(RepositoryError::Duplicate(rule.id.0));
        }
        rules.push(rule);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<EligibilityRule>, RepositoryError> {
        let rules = self.rules.read().await;
        let mut listed = rules.clone();
        listed.sort_by(|left, right| {
            left.created_at.cmp(&right.created_at).then_with(|| left.id.cmp(&right.id))
        });
        Ok(listed)
    }
}

#[derive(Default)]
pub struct InMemorySaleRepository {
    sales: RwLock<HashMap<String, Sale>>,
}

#[async_trait::async_trait]
impl SaleRepository for InMemorySaleRepository {
    async fn insert(&self, sale: Sale) -> Result<(), RepositoryError> {
        let mut sales = self.sales.write().await;
        if sales.contains_key(&sale.id.0) {
            return Err(RepositoryError::Duplicate(sale.id.0));
        }
        sales.insert(sale.id.0.clone(), sale);
        Ok(())
    }

    async fn find_by_id(&self, id: &SaleId) -> Result<Option<Sale>, RepositoryError> {
        let sales = self.sales.read().await;
        Ok(sales.get(&id.0).cloned())
    }

    async fn list(&self, filter: &SaleFilter) -> Result<Vec<Sale>, RepositoryError> {
        let sales = self.sales.read().await;
        let mut listed: Vec<Sale> = sales.values().filter(|sale| filter.matches(sale)).cloned().collect();
        listed.sort_by(|left, right| {
            right.created_at.cmp(&left.created_at).then_with(|| right.id.0.cmp(&left.id.0))
        });
        Ok(listed)
    }

    async fn apply_transition(
        &self,
        transition: &CommissionTransition,
    ) -> Result<bool, RepositoryError> {
        let mut sales = self.sales.write().await;
        match sales.get_mut(&transition.sale_id.0) {
            Some(sale) if sale.status() == transition.from => {
                transition.apply(sale);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
