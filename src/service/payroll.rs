use crate::config::PayrollRates;
use crate::error::{AppError, AppResult};
use crate::model::payroll::{LiquidationSummary, NewPayrollReceipt, Period, SkippedEmployee};
use crate::repo::PayrollRepo;
use crate::service::payroll_calc::{SalaryInput, compute, round_cents, seniority_years};
use tracing::instrument;

/// Runs the liquidation of `period`: one receipt per active employee.
///
/// Employees that already have a receipt for the period are left untouched,
/// so re-running a period only fills in the missing ones.
#[instrument(name = "liquidation", skip_all, fields(period = %period))]
pub async fn process_period(
    repo: &dyn PayrollRepo,
    rates: &PayrollRates,
    period: Period,
) -> AppResult<LiquidationSummary> {
    let employees = repo.active_employees().await?;
    tracing::info!(count = employees.len(), "Processing liquidation");

    let mut summary = LiquidationSummary {
        period,
        processed: 0,
        skipped: Vec::new(),
        total_net: 0.0,
    };

    for employee in employees {
        let skip = |reason: &str| SkippedEmployee {
            employee_id: employee.id,
            reason: reason.to_string(),
        };

        if employee.hire_date > period.last_day() {
            summary.skipped.push(skip("hired after the period"));
            continue;
        }
        if employee.base_salary <= 0.0 {
            tracing::warn!(employee_id = employee.id, "Skipping employee without base salary");
            summary.skipped.push(skip("base salary must be positive"));
            continue;
        }
        if repo.receipt_exists(employee.id, period).await? {
            summary.skipped.push(skip("receipt already exists"));
            continue;
        }

        let computed = compute(
            SalaryInput {
                base_salary: employee.base_salary,
                years: seniority_years(employee.hire_date, period),
                health_insurance_rate: employee.health_insurance_rate,
                union_rate: employee.union_rate,
            },
            rates,
        );

        let inserted = repo
            .insert_receipt(NewPayrollReceipt {
                employee_id: employee.id,
                period,
                earnings: computed.earnings,
                deductions: computed.deductions,
                gross: computed.gross,
                total_deductions: computed.total_deductions,
                net: computed.net,
            })
            .await;

        match inserted {
            Ok(receipt) => {
                tracing::debug!(employee_id = employee.id, net = receipt.net, "Receipt created");
                summary.processed += 1;
                summary.total_net += receipt.net;
            }
            // Another run inserted it first.
            Err(AppError::Conflict(_)) => summary.skipped.push(skip("receipt already exists")),
            Err(e) => return Err(e),
        }
    }

    summary.total_net = round_cents(summary.total_net);
    tracing::info!(
        processed = summary.processed,
        skipped = summary.skipped.len(),
        total_net = summary.total_net,
        "Liquidation finished"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::ReceiptFilter;
    use crate::repo::memory::{MemoryStore, employee};
    use chrono::NaiveDate;

    fn march() -> Period {
        Period::new(2026, 3).unwrap()
    }

    #[actix_web::test]
    async fn one_receipt_per_active_employee() {
        let mut inactive = employee(3, "Raúl", "Sosa", 90_000.0);
        inactive.status = "inactive".into();
        let store = MemoryStore::with_employees(vec![
            employee(1, "Lucía", "Gómez", 100_000.0),
            employee(2, "Marcos", "Ruiz", 80_000.0),
            inactive,
        ]);

        let summary = process_period(&store, &PayrollRates::default(), march()).await.unwrap();

        assert_eq!(summary.processed, 2);
        assert!(summary.skipped.is_empty());
        let (receipts, total) = store.list_receipts(&ReceiptFilter { limit: 10, ..Default::default() }).await.unwrap();
        assert_eq!(total, 2);
        assert!(receipts.iter().all(|r| r.period == march()));
        let sum: f64 = receipts.iter().map(|r| r.net).sum();
        assert!((summary.total_net - sum).abs() < 0.01);
    }

    #[actix_web::test]
    async fn rerun_skips_existing_receipts() {
        let store = MemoryStore::with_employees(vec![employee(1, "Lucía", "Gómez", 100_000.0)]);

        process_period(&store, &PayrollRates::default(), march()).await.unwrap();
        let second = process_period(&store, &PayrollRates::default(), march()).await.unwrap();

        assert_eq!(second.processed, 0);
        assert_eq!(second.skipped.len(), 1);
        assert_eq!(second.skipped[0].reason, "receipt already exists");
        assert_eq!(store.receipts.lock().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn receipt_uses_seniority_at_period_end() {
        let mut e = employee(1, "Lucía", "Gómez", 100_000.0);
        e.hire_date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        e.health_insurance_rate = 0.0;
        e.union_rate = 0.0;
        let store = MemoryStore::with_employees(vec![e]);

        process_period(&store, &PayrollRates::default(), march()).await.unwrap();

        let receipt = store.get_receipt(1).await.unwrap().unwrap();
        assert_eq!(receipt.gross, 112_000.0);
        assert_eq!(receipt.net, 96_320.0);
    }

    #[actix_web::test]
    async fn skips_unpaid_and_future_hires() {
        let mut future = employee(2, "Marcos", "Ruiz", 80_000.0);
        future.hire_date = NaiveDate::from_ymd_opt(2026, 4, 1).unwrap();
        let store = MemoryStore::with_employees(vec![employee(1, "Lucía", "Gómez", 0.0), future]);

        let summary = process_period(&store, &PayrollRates::default(), march()).await.unwrap();

        assert_eq!(summary.processed, 0);
        assert_eq!(summary.skipped.len(), 2);
    }
}
