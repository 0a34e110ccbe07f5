use crate::domain::model::{round_money, Contract, ServiceLineItem};
use crate::utils::error::{RenewalError, Result};
use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;

/// ARR 計算結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrCalculation {
    /// 所有有效項目的年化總額
    pub annualized: Decimal,
    /// 依合約結束日比例調整後的金額，即寫回商機的 max amount
    pub max_arr: Decimal,
    /// 合約剩餘月數；沒有結束日時為 `None`
    pub months_remaining: Option<u32>,
}

/// Yearly value of one line item. Items with a negative price or quantity
/// contribute nothing.
pub fn annualized_price(item: &ServiceLineItem) -> Result<Decimal> {
    let Some(periods) = item.billed.periods_per_year() else {
        return Ok(Decimal::ZERO);
    };

    if item.price.is_sign_negative() || item.quantity < 0 {
        tracing::warn!(
            "Service line item {} has negative price {} or quantity {}, excluded from ARR",
            item.id,
            item.price,
            item.quantity
        );
        return Ok(Decimal::ZERO);
    }

    item.price
        .checked_mul(Decimal::from(item.quantity))
        .and_then(|total| total.checked_mul(Decimal::from(periods)))
        .ok_or_else(|| RenewalError::overflow(format!("annualized price of {}", item.id)))
}

/// Sum of annualized prices for items that have not ended yet.
pub fn annualized_total(items: &[ServiceLineItem], now: DateTime<Utc>) -> Result<Decimal> {
    let mut total = Decimal::ZERO;
    for item in items {
        if item.is_ended(now) {
            tracing::debug!("Service line item {} ended, excluded from ARR", item.id);
            continue;
        }
        let annual = annualized_price(item)?;
        tracing::debug!("Service line item {} adds ARR {}", item.id, annual);
        total = total
            .checked_add(annual)
            .ok_or_else(|| RenewalError::overflow("ARR total"))?;
    }
    Ok(total)
}

/// Whole calendar months from `start` until `end`, never negative.
pub fn months_until_contract_end(start: DateTime<Utc>, end: DateTime<Utc>) -> u32 {
    let year_diff = end.year() - start.year();
    let month_diff = end.month() as i32 - start.month() as i32;
    let mut total_months = year_diff * 12 + month_diff;

    if end.day() < start.day() {
        total_months -= 1;
    }

    total_months.max(0) as u32
}

pub fn prorate_arr(arr: Decimal, months_remaining: u32) -> Result<Decimal> {
    if months_remaining >= 12 {
        return Ok(arr);
    }
    let monthly_rate = arr / Decimal::from(12);
    monthly_rate
        .checked_mul(Decimal::from(months_remaining))
        .map(round_money)
        .ok_or_else(|| RenewalError::overflow("prorated ARR"))
}

/// Maximum ARR for a contract that has not ended.
///
/// Callers skip ended contracts entirely; an `ended_at` in the future
/// prorates the annualized total by the whole months left.
pub fn calculate_max_arr(
    contract: &Contract,
    items: &[ServiceLineItem],
    now: DateTime<Utc>,
) -> Result<ArrCalculation> {
    let annualized = annualized_total(items, now)?;

    let (max_arr, months_remaining) = match contract.ended_at {
        Some(ended_at) => {
            let months = months_until_contract_end(now, ended_at);
            tracing::debug!(
                "ARR prorated with contract end date {} ({} months remaining)",
                ended_at,
                months
            );
            (prorate_arr(annualized, months)?, Some(months))
        }
        None => (annualized, None),
    };

    Ok(ArrCalculation {
        annualized: round_money(annualized),
        max_arr: round_money(max_arr),
        months_remaining,
    })
}
