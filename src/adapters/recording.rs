use crate::domain::model::RenewalLikelihood;
use crate::domain::ports::OpportunityWriter;
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// 對商機服務發出的一次呼叫
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OpportunityCommand {
    #[serde(rename_all = "camelCase")]
    CreateRenewalOpportunity { tenant: String, contract_id: String },
    #[serde(rename_all = "camelCase")]
    CloseLooseOpportunity {
        tenant: String,
        opportunity_id: String,
    },
    #[serde(rename_all = "camelCase")]
    UpdateNextCycleDate {
        tenant: String,
        opportunity_id: String,
        renewed_at: Option<DateTime<Utc>>,
    },
    #[serde(rename_all = "camelCase")]
    UpdateRenewalLikelihood {
        tenant: String,
        opportunity_id: String,
        likelihood: RenewalLikelihood,
    },
    #[serde(rename_all = "camelCase")]
    UpdateAmounts {
        tenant: String,
        opportunity_id: String,
        amount: Decimal,
        max_amount: Decimal,
    },
}

/// Keeps every command in memory instead of sending it. Backs `--dry-run`.
#[derive(Debug, Clone, Default)]
pub struct RecordingOpportunityWriter {
    commands: Arc<Mutex<Vec<OpportunityCommand>>>,
}

impl RecordingOpportunityWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<OpportunityCommand> {
        self.log().clone()
    }

    /// 鎖被毒化時照樣取回已記錄的指令
    fn log(&self) -> MutexGuard<'_, Vec<OpportunityCommand>> {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, command: OpportunityCommand) -> Result<()> {
        tracing::debug!("Recorded {:?}", command);
        self.log().push(command);
        Ok(())
    }
}

#[async_trait]
impl OpportunityWriter for RecordingOpportunityWriter {
    async fn create_renewal_opportunity(&self, tenant: &str, contract_id: &str) -> Result<()> {
        self.record(OpportunityCommand::CreateRenewalOpportunity {
            tenant: tenant.to_string(),
            contract_id: contract_id.to_string(),
        })
    }

    async fn close_loose_opportunity(&self, tenant: &str, opportunity_id: &str) -> Result<()> {
        self.record(OpportunityCommand::CloseLooseOpportunity {
            tenant: tenant.to_string(),
            opportunity_id: opportunity_id.to_string(),
        })
    }

    async fn update_renewal_opportunity_next_cycle_date(
        &self,
        tenant: &str,
        opportunity_id: &str,
        renewed_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.record(OpportunityCommand::UpdateNextCycleDate {
            tenant: tenant.to_string(),
            opportunity_id: opportunity_id.to_string(),
            renewed_at,
        })
    }

    async fn update_renewal_likelihood(
        &self,
        tenant: &str,
        opportunity_id: &str,
        likelihood: RenewalLikelihood,
    ) -> Result<()> {
        self.record(OpportunityCommand::UpdateRenewalLikelihood {
            tenant: tenant.to_string(),
            opportunity_id: opportunity_id.to_string(),
            likelihood,
        })
    }

    async fn update_opportunity_amounts(
        &self,
        tenant: &str,
        opportunity_id: &str,
        amount: Decimal,
        max_amount: Decimal,
    ) -> Result<()> {
        self.record(OpportunityCommand::UpdateAmounts {
            tenant: tenant.to_string(),
            opportunity_id: opportunity_id.to_string(),
            amount,
            max_amount,
        })
    }
}
