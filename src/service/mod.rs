pub mod attendance;
pub mod budget;
pub mod day_groups;
pub mod kiosk;
pub mod payroll;
pub mod payroll_calc;
pub mod photo;
pub mod pin_policy;
pub mod vacation;
