use crate::config::PayrollRates;
use crate::model::payroll::{Concept, PayrollLine, Period};
use chrono::{Datelike, NaiveDate};

pub fn round_cents(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Completed years between hire and the last day of the period.
pub fn seniority_years(hire_date: NaiveDate, period: Period) -> u32 {
    completed_years(hire_date, period.last_day())
}

pub fn completed_years(from: NaiveDate, at: NaiveDate) -> u32 {
    if at < from {
        return 0;
    }
    let mut years = at.year() - from.year();
    if (at.month(), at.day()) < (from.month(), from.day()) {
        years -= 1;
    }
    years.max(0) as u32
}

#[derive(Debug, Clone, Copy)]
pub struct SalaryInput {
    pub base_salary: f64,
    pub years: u32,
    pub health_insurance_rate: f64,
    pub union_rate: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComputedPayroll {
    pub earnings: Vec<PayrollLine>,
    pub deductions: Vec<PayrollLine>,
    pub gross: f64,
    pub total_deductions: f64,
    pub net: f64,
}

fn line(concept: Concept, rate: Option<f64>, amount: f64) -> PayrollLine {
    PayrollLine {
        concept,
        rate,
        amount: round_cents(amount),
    }
}

/// Flat-rate liquidation of one employee for one month.
///
/// Earnings are base salary, seniority (`years * base * step`) and
/// presentismo (`base * rate`). Every deduction is a rate over gross.
pub fn compute(input: SalaryInput, rates: &PayrollRates) -> ComputedPayroll {
    let base = input.base_salary;

    let earnings = vec![
        line(Concept::BaseSalary, None, base),
        line(
            Concept::Seniority,
            Some(rates.seniority_step),
            input.years as f64 * base * rates.seniority_step,
        ),
        line(Concept::Presentismo, Some(rates.presentismo), base * rates.presentismo),
    ];
    let gross = round_cents(earnings.iter().map(|l| l.amount).sum());

    let deductions: Vec<PayrollLine> = [
        (Concept::Pension, rates.pension),
        (Concept::Law19032, rates.law_19032),
        (Concept::HealthInsurance, input.health_insurance_rate),
        (Concept::Union, input.union_rate),
    ]
    .into_iter()
    .filter(|(_, rate)| *rate > 0.0)
    .map(|(concept, rate)| line(concept, Some(rate), gross * rate))
    .collect();
    let total_deductions = round_cents(deductions.iter().map(|l| l.amount).sum());

    ComputedPayroll {
        earnings,
        deductions,
        gross,
        total_deductions,
        net: round_cents(gross - total_deductions),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amount(lines: &[PayrollLine], concept: Concept) -> Option<f64> {
        lines.iter().find(|l| l.concept == concept).map(|l| l.amount)
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn reference_example() {
        let out = compute(
            SalaryInput {
                base_salary: 100_000.0,
                years: 2,
                health_insurance_rate: 0.0,
                union_rate: 0.0,
            },
            &PayrollRates::default(),
        );

        assert_eq!(amount(&out.earnings, Concept::Seniority), Some(2000.0));
        assert_eq!(amount(&out.earnings, Concept::Presentismo), Some(10000.0));
        assert_eq!(out.gross, 112_000.0);
        assert_eq!(amount(&out.deductions, Concept::Pension), Some(12320.0));
        assert_eq!(amount(&out.deductions, Concept::Law19032), Some(3360.0));
        assert_eq!(amount(&out.deductions, Concept::HealthInsurance), None);
        assert_eq!(out.total_deductions, 15680.0);
        assert_eq!(out.net, 96320.0);
    }

    #[test]
    fn net_is_gross_minus_rated_deductions() {
        let rates = PayrollRates::default();
        for base in [1.0, 850.5, 100_000.0, 1_234_567.89] {
            for years in [0, 1, 7, 35] {
                let (hi, un) = (0.03, 0.025);
                let out = compute(
                    SalaryInput {
                        base_salary: base,
                        years,
                        health_insurance_rate: hi,
                        union_rate: un,
                    },
                    &rates,
                );
                let rate_sum = rates.pension + rates.law_19032 + hi + un;
                let expected = out.gross - rate_sum * out.gross;
                assert!(
                    (out.net - expected).abs() < 0.05,
                    "base={base} years={years} net={} expected={expected}",
                    out.net
                );
                assert_eq!(out.deductions.len(), 4);
            }
        }
    }

    #[test]
    fn seniority_counts_completed_years_at_period_end() {
        let march = Period::new(2026, 3).unwrap();
        assert_eq!(seniority_years(d(2024, 3, 31), march), 2);
        assert_eq!(seniority_years(d(2024, 4, 1), march), 1);
        assert_eq!(seniority_years(d(2026, 3, 15), march), 0);
        assert_eq!(seniority_years(d(2027, 1, 1), march), 0);
    }
}
