use crate::domain::model::{round_money, RenewalLikelihood};
use crate::utils::error::{RenewalError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// 續約可能性權重。未設定或無法辨識的值視為 High (1.0)。
pub fn likelihood_factor(likelihood: Option<RenewalLikelihood>) -> Decimal {
    match likelihood {
        Some(RenewalLikelihood::High) => Decimal::ONE,
        Some(RenewalLikelihood::Medium) => Decimal::new(5, 1),
        Some(RenewalLikelihood::Low) => Decimal::new(25, 2),
        Some(RenewalLikelihood::Zero) => Decimal::ZERO,
        Some(RenewalLikelihood::Other) | None => Decimal::ONE,
    }
}

pub fn adjust_by_likelihood(
    max_arr: Decimal,
    likelihood: Option<RenewalLikelihood>,
) -> Result<Decimal> {
    max_arr
        .checked_mul(likelihood_factor(likelihood))
        .map(round_money)
        .ok_or_else(|| RenewalError::overflow("likelihood-adjusted ARR"))
}

/// Decide whether the renewal likelihood must flip after a contract change.
///
/// Returns `None` when the current likelihood stays as it is.
pub fn decide_likelihood_transition(
    contract_ended_at: Option<DateTime<Utc>>,
    current: Option<RenewalLikelihood>,
    renewed_at: Option<DateTime<Utc>>,
) -> Option<RenewalLikelihood> {
    let renewed_at = renewed_at?;
    let is_zero = current == Some(RenewalLikelihood::Zero);

    match contract_ended_at {
        // 合約在續約日之前結束，續約不會發生
        Some(ended_at) if !is_zero && ended_at < renewed_at => Some(RenewalLikelihood::Zero),
        // 合約取消結束日或延長超過續約日，重新開啟
        None if is_zero => Some(RenewalLikelihood::Medium),
        Some(ended_at) if is_zero && ended_at > renewed_at => Some(RenewalLikelihood::Medium),
        _ => None,
    }
}
