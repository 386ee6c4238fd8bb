pub mod attendance;
pub mod budget;
pub mod employee;
pub mod kiosk;
pub mod payroll;
pub mod pin;
pub mod vacation;
