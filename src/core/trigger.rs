use serde::{Deserialize, Serialize};

/// Which part of the renewal opportunity to recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum RenewalOperation {
    NextCycleDateAndArr,
    NextCycleDate,
    Arr,
    Likelihood,
}

impl RenewalOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NextCycleDateAndArr => "next-cycle-date-and-arr",
            Self::NextCycleDate => "next-cycle-date",
            Self::Arr => "arr",
            Self::Likelihood => "likelihood",
        }
    }
}

/// 觸發重新計算的上游事件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RenewalTrigger {
    ContractCreated,
    ContractUpdated,
    RenewalOpportunityCreated,
    NextCycleDateUpdated,
    RenewalLikelihoodChanged,
    ServiceLineItemCreated,
    ServiceLineItemUpdated,
    ServiceLineItemClosed,
    ServiceLineItemDeleted,
}

impl RenewalTrigger {
    pub fn operation(&self) -> RenewalOperation {
        match self {
            Self::ContractCreated | Self::ContractUpdated | Self::RenewalOpportunityCreated => {
                RenewalOperation::NextCycleDateAndArr
            }
            // 新的續約日可能讓可能性翻轉
            Self::NextCycleDateUpdated => RenewalOperation::Likelihood,
            Self::RenewalLikelihoodChanged
            | Self::ServiceLineItemCreated
            | Self::ServiceLineItemUpdated
            | Self::ServiceLineItemClosed
            | Self::ServiceLineItemDeleted => RenewalOperation::Arr,
        }
    }
}

/// A single trigger message as delivered by the event consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewalEvent {
    pub tenant: String,
    pub contract_id: String,
    pub trigger: RenewalTrigger,
}
