use crate::domain::model::{Contract, Opportunity, ServiceLineItem};
use crate::domain::ports::{ContractReader, OpportunityReader, ServiceLineItemReader};
use crate::utils::error::{RenewalError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantSnapshot {
    #[serde(default)]
    pub contracts: Vec<Contract>,
    #[serde(default)]
    pub opportunities: Vec<Opportunity>,
    #[serde(default)]
    pub service_line_items: Vec<ServiceLineItem>,
}

/// 從 JSON 快照讀取合約資料，實作所有讀取端口
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotStore {
    #[serde(default)]
    tenants: HashMap<String, TenantSnapshot>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        let store = Self::from_json_str(&content)?;
        tracing::debug!(
            "Loaded snapshot from {} ({} tenants)",
            path.as_ref().display(),
            store.tenants.len()
        );
        Ok(store)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn insert_tenant(&mut self, tenant: impl Into<String>, snapshot: TenantSnapshot) {
        self.tenants.insert(tenant.into(), snapshot);
    }

    fn tenant(&self, tenant: &str) -> Option<&TenantSnapshot> {
        self.tenants.get(tenant)
    }
}

#[async_trait]
impl ContractReader for SnapshotStore {
    async fn get_contract_by_id(&self, tenant: &str, contract_id: &str) -> Result<Contract> {
        self.tenant(tenant)
            .and_then(|snapshot| snapshot.contracts.iter().find(|c| c.id == contract_id))
            .cloned()
            .ok_or_else(|| RenewalError::not_found("contract", contract_id))
    }
}

#[async_trait]
impl OpportunityReader for SnapshotStore {
    async fn get_active_renewal_opportunity_for_contract(
        &self,
        tenant: &str,
        contract_id: &str,
    ) -> Result<Option<Opportunity>> {
        Ok(self.tenant(tenant).and_then(|snapshot| {
            snapshot
                .opportunities
                .iter()
                .find(|o| o.contract_id == contract_id)
                .cloned()
        }))
    }
}

#[async_trait]
impl ServiceLineItemReader for SnapshotStore {
    async fn get_all_for_contract(
        &self,
        tenant: &str,
        contract_id: &str,
    ) -> Result<Vec<ServiceLineItem>> {
        Ok(self
            .tenant(tenant)
            .map(|snapshot| {
                snapshot
                    .service_line_items
                    .iter()
                    .filter(|item| item.contract_id == contract_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
