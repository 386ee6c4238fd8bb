use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
pub struct PrizeRedemption {
    #[schema(example = 3)]
    pub id: u64,
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = 12)]
    pub prize_id: u64,
    #[schema(example = 15000.0)]
    pub cost: f64,
    #[schema(example = "delivered")]
    pub status: String,
}

/// Presupuesto of one month against what was redeemed.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BudgetSummary {
    #[schema(example = "2026-03")]
    pub period: String,
    #[schema(example = 500000.0)]
    pub allocated: f64,
    #[schema(example = 120000.0)]
    pub spent: f64,
    #[schema(example = 380000.0)]
    pub remaining: f64,
    #[schema(example = false)]
    pub overspent: bool,
    #[schema(example = 8)]
    pub redemptions: usize,
}
