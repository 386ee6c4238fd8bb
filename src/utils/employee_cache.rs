use crate::model::employee::EmployeeSummary;
use anyhow::Result;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::time::Duration;

/// Active employees as shown on the kiosk, keyed by employee id.
static EMPLOYEE_CACHE: Lazy<Cache<u64, EmployeeSummary>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(50_000)
        .time_to_live(Duration::from_secs(3600))
        .build()
});

pub async fn get(employee_id: u64) -> Option<EmployeeSummary> {
    EMPLOYEE_CACHE.get(&employee_id).await
}

pub async fn put(summary: EmployeeSummary) {
    EMPLOYEE_CACHE.insert(summary.id, summary).await;
}

/// Drop an employee after an update, deactivation or delete.
pub async fn invalidate(employee_id: u64) {
    EMPLOYEE_CACHE.invalidate(&employee_id).await;
}

async fn batch_put(batch: &[EmployeeSummary]) {
    let futures: Vec<_> = batch
        .iter()
        .map(|s| EMPLOYEE_CACHE.insert(s.id, s.clone()))
        .collect();

    futures::future::join_all(futures).await;
}

/// Stream active employees into the cache in batches.
pub async fn warmup_employee_cache(pool: &MySqlPool, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, EmployeeSummary>(
        r#"
        SELECT id, employee_code, CONCAT(first_name, ' ', last_name) AS full_name
        FROM employees
        WHERE status = 'active'
        "#,
    )
    .fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        batch.push(row?);
        total += 1;

        if batch.len() >= batch_size {
            batch_put(&batch).await;
            batch.clear();
        }
    }

    if !batch.is_empty() {
        batch_put(&batch).await;
    }

    tracing::info!(total, "Employee cache warmup complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn put_get_invalidate() {
        let summary = EmployeeSummary {
            id: 900_001,
            employee_code: "EMP-X".into(),
            full_name: "Ana Paz".into(),
        };

        put(summary.clone()).await;
        assert_eq!(get(900_001).await, Some(summary));

        invalidate(900_001).await;
        assert_eq!(get(900_001).await, None);
    }
}
