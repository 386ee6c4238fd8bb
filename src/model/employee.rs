use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "employee_code": "EMP-001",
        "document_number": "30111222",
        "first_name": "Lucía",
        "last_name": "Gómez",
        "email": "lucia.gomez@company.com",
        "branch_id": 2,
        "hire_date": "2022-03-01",
        "base_salary": 100000.0,
        "health_insurance_rate": 0.03,
        "union_rate": 0.02,
        "status": "active"
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "EMP-001")]
    pub employee_code: String,

    #[schema(example = "30111222")]
    pub document_number: String,

    #[schema(example = "Lucía")]
    pub first_name: String,

    #[schema(example = "Gómez")]
    pub last_name: String,

    #[schema(example = "lucia.gomez@company.com")]
    pub email: String,

    #[schema(example = 2)]
    pub branch_id: Option<u64>,

    #[schema(
        example = "2022-03-01",
        value_type = String,
        format = "date"
    )]
    pub hire_date: NaiveDate,

    #[schema(example = 100000.0)]
    pub base_salary: f64,

    /// Obra social contribution, fraction of gross
    #[schema(example = 0.03)]
    pub health_insurance_rate: f64,

    /// Union (sindicato) contribution, fraction of gross
    #[schema(example = 0.02)]
    pub union_rate: f64,

    #[schema(example = "active")]
    pub status: String,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_active(&self) -> bool {
        self.status == "active"
    }
}

/// The slice of an employee a kiosk is allowed to show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct EmployeeSummary {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "EMP-001")]
    pub employee_code: String,
    #[schema(example = "Lucía Gómez")]
    pub full_name: String,
}

impl From<&Employee> for EmployeeSummary {
    fn from(e: &Employee) -> Self {
        Self {
            id: e.id,
            employee_code: e.employee_code.clone(),
            full_name: e.full_name(),
        }
    }
}
