use super::student::{Month, StudentRecord};
use rust_decimal::{Decimal, RoundingStrategy};

/// Payment-status breakdown for a student as of a given month.
///
/// Always derived on demand from the ledger record, never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct DebtSummary {
    pub monthly_fee: Decimal,
    pub pending_months: Vec<Month>,
    pub total_owed: Decimal,
    pub up_to_date: bool,
}

/// Computes the current debt for `student`.
///
/// `current_month` is 1-based (enero = 1) and injected so callers and tests
/// control time. A month is pending iff it is at or before `current_month`
/// and its indicator cell is blank. The total is fee × pending count,
/// rounded to 2 decimals half-away-from-zero.
pub fn compute_debt(student: &StudentRecord, current_month: u32) -> DebtSummary {
    let pending_months: Vec<Month> = Month::ALL
        .into_iter()
        .filter(|m| m.number() <= current_month)
        .filter(|m| !student.is_paid(*m))
        .collect();

    let total_owed = (student.monthly_fee * Decimal::from(pending_months.len() as u32))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

    DebtSummary {
        monthly_fee: student.monthly_fee,
        up_to_date: pending_months.is_empty(),
        total_owed,
        pending_months,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn student_paid_through(paid_until: u32, fee: Decimal) -> StudentRecord {
        let months = Month::ALL
            .into_iter()
            .map(|m| {
                let cell = if m.number() <= paid_until { "✓" } else { "" };
                (m, cell.to_string())
            })
            .collect::<BTreeMap<_, _>>();
        StudentRecord {
            id: "0801199901234".to_string(),
            name: "Ana".to_string(),
            grade: "7-A".to_string(),
            monthly_fee: fee,
            months,
            raw_fee: fee.to_string(),
        }
    }

    #[test]
    fn test_debt_counts_blank_months_up_to_current() {
        let student = student_paid_through(3, dec!(1200));
        let debt = compute_debt(&student, 6);
        assert_eq!(debt.pending_months.len(), 3);
        assert_eq!(debt.total_owed, dec!(3600.00));
        assert!(!debt.up_to_date);
    }

    #[test]
    fn test_debt_up_to_date() {
        let student = student_paid_through(6, dec!(1200));
        let debt = compute_debt(&student, 6);
        assert!(debt.up_to_date);
        assert_eq!(debt.total_owed, Decimal::ZERO);
        assert!(debt.pending_months.is_empty());
    }

    #[test]
    fn test_debt_is_pure() {
        let student = student_paid_through(2, dec!(750.25));
        let first = compute_debt(&student, 8);
        let second = compute_debt(&student, 8);
        assert_eq!(first, second);
    }

    #[test]
    fn test_pending_count_monotonic_in_current_month() {
        let student = student_paid_through(4, dec!(500));
        let mut previous = 0;
        for month in 1..=12 {
            let pending = compute_debt(&student, month).pending_months.len();
            assert!(pending >= previous);
            previous = pending;
        }
    }

    #[test]
    fn test_total_rounds_to_two_decimals() {
        let student = student_paid_through(0, dec!(333.335));
        let debt = compute_debt(&student, 1);
        assert_eq!(debt.total_owed, dec!(333.34));
    }
}
