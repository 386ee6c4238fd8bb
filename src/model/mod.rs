pub mod attendance;
pub mod budget;
pub mod employee;
pub mod payroll;
pub mod pin;
pub mod role;
pub mod vacation;
