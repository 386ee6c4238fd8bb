use crate::model::budget::{BudgetSummary, PrizeRedemption};
use crate::model::payroll::Period;
use crate::service::payroll_calc::round_cents;

pub fn summarize(period: Period, allocated: f64, redemptions: &[PrizeRedemption]) -> BudgetSummary {
    let counted: Vec<&PrizeRedemption> = redemptions
        .iter()
        .filter(|r| r.status != "rejected")
        .collect();
    let spent = round_cents(counted.iter().map(|r| r.cost).sum());
    let remaining = round_cents(allocated - spent);

    BudgetSummary {
        period: period.to_string(),
        allocated,
        spent,
        remaining,
        overspent: remaining < 0.0,
        redemptions: counted.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn redemption(id: u64, cost: f64, status: &str) -> PrizeRedemption {
        PrizeRedemption {
            id,
            employee_id: 1,
            prize_id: 1,
            cost,
            status: status.into(),
        }
    }

    #[test]
    fn rejected_redemptions_do_not_spend() {
        let march = Period::new(2026, 3).unwrap();
        let s = summarize(
            march,
            1000.0,
            &[
                redemption(1, 250.5, "delivered"),
                redemption(2, 100.0, "pending"),
                redemption(3, 999.0, "rejected"),
            ],
        );

        assert_eq!(s.spent, 350.5);
        assert_eq!(s.remaining, 649.5);
        assert_eq!(s.redemptions, 2);
        assert!(!s.overspent);
    }

    #[test]
    fn flags_overspending() {
        let s = summarize(Period::new(2026, 3).unwrap(), 100.0, &[redemption(1, 150.0, "delivered")]);
        assert_eq!(s.remaining, -50.0);
        assert!(s.overspent);
    }
}
