use crate::domain::model::RenewalCycle;
use chrono::{DateTime, Months, Utc};

/// 迭代上限；正常的續約週期遠遠不會達到
pub const MAX_CYCLE_ITERATIONS: u32 = 10_000;

/// Length of one renewal cycle in calendar months, or `None` when the
/// contract does not renew on a frequency.
pub fn cycle_increment_months(cycle: RenewalCycle, renewal_periods: Option<i64>) -> Option<u32> {
    match cycle {
        RenewalCycle::Monthly => Some(1),
        RenewalCycle::Quarterly => Some(3),
        RenewalCycle::Annually => {
            let years = renewal_periods.unwrap_or(1);
            if years <= 0 {
                return None;
            }
            u32::try_from(years).ok()?.checked_mul(12)
        }
        RenewalCycle::None | RenewalCycle::Other => None,
    }
}

/// First renewal date strictly after `now`, counted in whole cycles from
/// `service_started_at`.
///
/// The k-th candidate is `start + k * cycle` rather than the previous
/// candidate plus one cycle, so a contract started on the 31st renews on
/// the last day of short months and returns to the 31st afterwards.
pub fn next_cycle_date(
    service_started_at: Option<DateTime<Utc>>,
    renewal_cycle: RenewalCycle,
    renewal_periods: Option<i64>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let start = service_started_at?;
    let step = cycle_increment_months(renewal_cycle, renewal_periods)?;

    let mut previous = start;
    for k in 1..=MAX_CYCLE_ITERATIONS {
        let candidate = start.checked_add_months(Months::new(step.checked_mul(k)?))?;
        if candidate <= previous {
            tracing::warn!(
                "Renewal cycle {:?} did not advance past {}; giving up",
                renewal_cycle,
                previous
            );
            return None;
        }
        if candidate > now {
            return Some(candidate);
        }
        previous = candidate;
    }

    tracing::warn!(
        "No renewal date after {} within {} cycles of {}",
        now,
        MAX_CYCLE_ITERATIONS,
        start
    );
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_monthly_cycle_lands_on_service_start_day() {
        let next = next_cycle_date(
            Some(utc(2023, 1, 15)),
            RenewalCycle::Monthly,
            None,
            utc(2024, 6, 1),
        );
        assert_eq!(next, Some(utc(2024, 6, 15)));
    }

    #[test]
    fn test_quarterly_cycle() {
        let next = next_cycle_date(
            Some(utc(2023, 1, 15)),
            RenewalCycle::Quarterly,
            None,
            utc(2024, 6, 1),
        );
        assert_eq!(next, Some(utc(2024, 7, 15)));
    }

    #[test]
    fn test_annual_cycle_defaults_to_one_year() {
        let next = next_cycle_date(
            Some(utc(2021, 3, 1)),
            RenewalCycle::Annually,
            None,
            utc(2024, 6, 1),
        );
        assert_eq!(next, Some(utc(2025, 3, 1)));
    }

    #[test]
    fn test_annual_cycle_with_multi_year_periods() {
        let next = next_cycle_date(
            Some(utc(2021, 3, 1)),
            RenewalCycle::Annually,
            Some(2),
            utc(2024, 6, 1),
        );
        assert_eq!(next, Some(utc(2025, 3, 1)));

        let next = next_cycle_date(
            Some(utc(2021, 3, 1)),
            RenewalCycle::Annually,
            Some(3),
            utc(2024, 6, 1),
        );
        assert_eq!(next, Some(utc(2027, 3, 1)));
    }

    #[test]
    fn test_result_is_strictly_after_now() {
        // now 剛好落在週期日
        let next = next_cycle_date(
            Some(utc(2024, 5, 15)),
            RenewalCycle::Monthly,
            None,
            utc(2024, 6, 15),
        );
        assert_eq!(next, Some(utc(2024, 7, 15)));
    }

    #[test]
    fn test_future_service_start_returns_first_cycle() {
        let next = next_cycle_date(
            Some(utc(2024, 9, 1)),
            RenewalCycle::Monthly,
            None,
            utc(2024, 6, 1),
        );
        assert_eq!(next, Some(utc(2024, 10, 1)));
    }

    #[test]
    fn test_month_end_start_does_not_drift() {
        let start = Some(utc(2024, 1, 31));
        assert_eq!(
            next_cycle_date(start, RenewalCycle::Monthly, None, utc(2024, 2, 10)),
            Some(utc(2024, 2, 29))
        );
        assert_eq!(
            next_cycle_date(start, RenewalCycle::Monthly, None, utc(2024, 3, 5)),
            Some(utc(2024, 3, 31))
        );
    }

    #[test]
    fn test_missing_start_or_non_frequency_cycle_yields_none() {
        let now = utc(2024, 6, 1);
        assert_eq!(next_cycle_date(None, RenewalCycle::Monthly, None, now), None);
        assert_eq!(
            next_cycle_date(Some(utc(2023, 1, 1)), RenewalCycle::None, None, now),
            None
        );
        assert_eq!(
            next_cycle_date(Some(utc(2023, 1, 1)), RenewalCycle::Other, None, now),
            None
        );
    }

    #[test]
    fn test_non_positive_periods_yield_none() {
        let now = utc(2024, 6, 1);
        let start = Some(utc(2023, 1, 1));
        assert_eq!(next_cycle_date(start, RenewalCycle::Annually, Some(0), now), None);
        assert_eq!(next_cycle_date(start, RenewalCycle::Annually, Some(-1), now), None);
    }

    #[test]
    fn test_iteration_cap_stops_very_old_starts() {
        let next = next_cycle_date(
            Some(utc(1000, 1, 1)),
            RenewalCycle::Monthly,
            None,
            utc(2024, 6, 1),
        );
        assert_eq!(next, None);
    }

    #[test]
    fn test_next_date_is_within_one_cycle_of_now() {
        let now = utc(2024, 6, 1);
        let starts = [utc(2020, 2, 29), utc(2022, 12, 31), utc(2023, 6, 1), utc(2024, 5, 31)];
        let cycles = [
            (RenewalCycle::Monthly, None, 1),
            (RenewalCycle::Quarterly, None, 3),
            (RenewalCycle::Annually, None, 12),
            (RenewalCycle::Annually, Some(2), 24),
        ];

        for start in starts {
            for (cycle, periods, months) in cycles {
                let next = next_cycle_date(Some(start), cycle, periods, now).unwrap();
                assert!(next > now, "{:?} from {} gave {}", cycle, start, next);
                let one_cycle_before = next.checked_sub_months(Months::new(months)).unwrap();
                assert!(one_cycle_before <= now || one_cycle_before <= start);
            }
        }
    }
}
