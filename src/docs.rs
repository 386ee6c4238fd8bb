use crate::api::attendance::{ClockRequest, ReportQuery, ReportResponse};
use crate::api::budget::AllocateBudget;
use crate::api::employee::{CreateEmployee, EmployeeListResponse, EmployeeQuery, ReassignBranch};
use crate::api::kiosk::{KioskCapture, PinEntry, PinResponse, SelectEmployee};
use crate::api::payroll::{LiquidationRequest, PaginatedReceiptResponse, ReceiptQuery};
use crate::api::pin::ResetPin;
use crate::api::vacation::{CreateVacation, VacationFilter, VacationListResponse};
use crate::auth::handlers::LoginResponse;
use crate::model::attendance::{AttendanceEvent, CaptureMethod, DayGroup, EventKind, EventStatus};
use crate::model::budget::BudgetSummary;
use crate::model::employee::{Employee, EmployeeSummary};
use crate::model::payroll::{Concept, LiquidationSummary, PayrollLine, PayrollReceipt, SkippedEmployee};
use crate::model::vacation::{VacationBalance, VacationRequest};
use crate::models::{LoginReqDto, UserReq};
use crate::service::kiosk::{KioskSession, KioskStep};
use crate::service::pin_policy::PinOutcome;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Workforce API",
        version = "1.0.0",
        description = r#"
## Workforce management

Back office for a workforce with kiosk and self-service clock-in.

### 🔹 Key Features
- **Attendance**
  - Clock-in by PIN kiosk, face capture or self-service
  - Hours per day, face captures below the confidence threshold go to review
- **PIN kiosk**
  - Search, PIN, photo, done; repeated wrong PINs lock the credential for a while
- **Payroll**
  - Monthly liquidation, one receipt per employee and period, safe to re-run
- **Vacations**
  - Statutory days by seniority, balances, approval
- **Budgets**
  - Monthly prize budget against redemptions
- **Employees**
  - Profiles and batched branch reassignment

### 🔐 Security
Endpoints under `/api` need a **JWT Bearer** access token. What a token may do
is decided by its role's capabilities.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::auth::handlers::register,

        crate::api::attendance::clock,
        crate::api::attendance::report,
        crate::api::attendance::pending,
        crate::api::attendance::approve,
        crate::api::attendance::reject,

        crate::api::kiosk::open_session,
        crate::api::kiosk::get_session,
        crate::api::kiosk::close_session,
        crate::api::kiosk::search_employees,
        crate::api::kiosk::select_employee,
        crate::api::kiosk::enter_pin,
        crate::api::kiosk::capture,

        crate::api::pin::reset_pin,
        crate::api::pin::unlock_pin,

        crate::api::payroll::run_liquidation,
        crate::api::payroll::list_receipts,
        crate::api::payroll::get_receipt,

        crate::api::employee::create_employee,
        crate::api::employee::get_employee,
        crate::api::employee::list_employees,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,
        crate::api::employee::reassign_branch,

        crate::api::vacation::create_vacation,
        crate::api::vacation::vacation_list,
        crate::api::vacation::get_vacation,
        crate::api::vacation::approve_vacation,
        crate::api::vacation::reject_vacation,
        crate::api::vacation::vacation_balance,

        crate::api::budget::budget_summary,
        crate::api::budget::allocate_budget
    ),
    components(
        schemas(
            UserReq,
            LoginReqDto,
            LoginResponse,
            ClockRequest,
            ReportQuery,
            ReportResponse,
            AttendanceEvent,
            EventKind,
            CaptureMethod,
            EventStatus,
            DayGroup,
            KioskSession,
            KioskStep,
            KioskCapture,
            SelectEmployee,
            PinEntry,
            PinResponse,
            PinOutcome,
            ResetPin,
            LiquidationRequest,
            LiquidationSummary,
            SkippedEmployee,
            PayrollReceipt,
            PayrollLine,
            Concept,
            ReceiptQuery,
            PaginatedReceiptResponse,
            CreateEmployee,
            EmployeeQuery,
            Employee,
            EmployeeSummary,
            EmployeeListResponse,
            ReassignBranch,
            CreateVacation,
            VacationFilter,
            VacationRequest,
            VacationBalance,
            VacationListResponse,
            AllocateBudget,
            BudgetSummary
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login, token refresh and user accounts"),
        (name = "Attendance", description = "Clock-in events, reports and face review"),
        (name = "Kiosk", description = "PIN kiosk sessions"),
        (name = "PIN", description = "Kiosk PIN administration"),
        (name = "Payroll", description = "Liquidations and receipts"),
        (name = "Employee", description = "Employee management APIs"),
        (name = "Vacation", description = "Vacation requests and balances"),
        (name = "Budget", description = "Monthly prize budgets"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_bearer_scheme_and_kiosk_paths() {
        let doc = ApiDoc::openapi();
        let json = serde_json::to_value(&doc).unwrap();

        assert!(json["components"]["securitySchemes"]["bearer_auth"].is_object());
        assert!(json["paths"]["/api/kiosk/sessions/{session_id}/pin"].is_object());
        assert!(json["paths"]["/api/payroll/liquidations"]["post"].is_object());
    }
}
