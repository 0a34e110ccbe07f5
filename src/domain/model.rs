use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// 金額一律四捨五入到小數點後兩位
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RenewalCycle {
    #[default]
    None,
    Monthly,
    Quarterly,
    Annually,
    #[serde(other)]
    Other,
}

impl RenewalCycle {
    pub fn is_frequency_based(&self) -> bool {
        matches!(self, Self::Monthly | Self::Quarterly | Self::Annually)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BilledType {
    None,
    Monthly,
    Quarterly,
    Annually,
    Once,
    Usage,
    #[serde(other)]
    Other,
}

impl BilledType {
    /// 一年內的計費次數；一次性或用量計費不計入 ARR
    pub fn periods_per_year(&self) -> Option<u32> {
        match self {
            Self::Monthly => Some(12),
            Self::Quarterly => Some(4),
            Self::Annually => Some(1),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RenewalLikelihood {
    High,
    Medium,
    Low,
    Zero,
    #[serde(other)]
    Other,
}

impl RenewalLikelihood {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
            Self::Zero => "ZERO",
            Self::Other => "OTHER",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub id: String,
    #[serde(default)]
    pub service_started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub renewal_cycle: RenewalCycle,
    #[serde(default)]
    pub renewal_periods: Option<i64>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
}

impl Contract {
    pub fn is_ended(&self, now: DateTime<Utc>) -> bool {
        self.ended_at.map(|ended_at| ended_at <= now).unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceLineItem {
    pub id: String,
    pub contract_id: String,
    pub price: Decimal,
    pub quantity: i64,
    pub billed: BilledType,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
}

impl ServiceLineItem {
    pub fn is_ended(&self, now: DateTime<Utc>) -> bool {
        self.ended_at.map(|ended_at| ended_at <= now).unwrap_or(false)
    }
}

/// 續約商機 (renewal opportunity)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Opportunity {
    pub id: String,
    pub contract_id: String,
    #[serde(default)]
    pub renewal_likelihood: Option<RenewalLikelihood>,
    #[serde(default)]
    pub renewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub amount: Decimal,
    #[serde(default)]
    pub max_amount: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_money_half_up() {
        assert_eq!(round_money(dec!(10.005)), dec!(10.01));
        assert_eq!(round_money(dec!(10.004)), dec!(10.00));
        assert_eq!(round_money(dec!(2900)), dec!(2900.00));
    }

    #[test]
    fn test_unknown_enum_values_deserialize_to_other() {
        let cycle: RenewalCycle = serde_json::from_str("\"BIENNIALLY\"").unwrap();
        let likelihood: RenewalLikelihood = serde_json::from_str("\"MAYBE\"").unwrap();
        let billed: BilledType = serde_json::from_str("\"WEEKLY\"").unwrap();

        assert_eq!(cycle, RenewalCycle::Other);
        assert!(!cycle.is_frequency_based());
        assert_eq!(likelihood, RenewalLikelihood::Other);
        assert_eq!(billed.periods_per_year(), None);
    }

    #[test]
    fn test_contract_deserializes_from_camel_case() {
        let contract: Contract = serde_json::from_value(serde_json::json!({
            "id": "c-1",
            "serviceStartedAt": "2023-01-15T00:00:00Z",
            "renewalCycle": "ANNUALLY",
            "renewalPeriods": 2
        }))
        .unwrap();

        assert_eq!(contract.renewal_cycle, RenewalCycle::Annually);
        assert_eq!(contract.renewal_periods, Some(2));
        assert_eq!(
            contract.service_started_at,
            Some(Utc.with_ymd_and_hms(2023, 1, 15, 0, 0, 0).unwrap())
        );
        assert!(contract.ended_at.is_none());
    }

    #[test]
    fn test_is_ended_compares_with_now() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let mut contract = Contract {
            id: "c-1".to_string(),
            service_started_at: None,
            renewal_cycle: RenewalCycle::Monthly,
            renewal_periods: None,
            ended_at: None,
        };
        assert!(!contract.is_ended(now));

        contract.ended_at = Some(Utc.with_ymd_and_hms(2024, 5, 31, 0, 0, 0).unwrap());
        assert!(contract.is_ended(now));

        contract.ended_at = Some(Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap());
        assert!(!contract.is_ended(now));
    }
}
