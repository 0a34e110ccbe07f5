use crate::domain::model::{Contract, Opportunity, RenewalLikelihood, ServiceLineItem};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

#[async_trait]
pub trait ContractReader: Send + Sync {
    /// 找不到合約時回傳 `RenewalError::NotFound`
    async fn get_contract_by_id(&self, tenant: &str, contract_id: &str) -> Result<Contract>;
}

#[async_trait]
pub trait OpportunityReader: Send + Sync {
    async fn get_active_renewal_opportunity_for_contract(
        &self,
        tenant: &str,
        contract_id: &str,
    ) -> Result<Option<Opportunity>>;
}

#[async_trait]
pub trait ServiceLineItemReader: Send + Sync {
    async fn get_all_for_contract(
        &self,
        tenant: &str,
        contract_id: &str,
    ) -> Result<Vec<ServiceLineItem>>;
}

/// 外部商機服務。相同的目標狀態重複呼叫必須是安全的。
#[async_trait]
pub trait OpportunityWriter: Send + Sync {
    async fn create_renewal_opportunity(&self, tenant: &str, contract_id: &str) -> Result<()>;

    async fn close_loose_opportunity(&self, tenant: &str, opportunity_id: &str) -> Result<()>;

    async fn update_renewal_opportunity_next_cycle_date(
        &self,
        tenant: &str,
        opportunity_id: &str,
        renewed_at: Option<DateTime<Utc>>,
    ) -> Result<()>;

    async fn update_renewal_likelihood(
        &self,
        tenant: &str,
        opportunity_id: &str,
        likelihood: RenewalLikelihood,
    ) -> Result<()>;

    async fn update_opportunity_amounts(
        &self,
        tenant: &str,
        opportunity_id: &str,
        amount: Decimal,
        max_amount: Decimal,
    ) -> Result<()>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 固定時間，用於測試與 `--now` 覆寫
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
