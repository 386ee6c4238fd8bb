use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Admin = 1,
    Hr = 2,
    Employee = 3,
    /// Attendance kiosk device account
    Kiosk = 4,
    Supervisor = 5,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Hr),
            3 => Some(Role::Employee),
            4 => Some(Role::Kiosk),
            5 => Some(Role::Supervisor),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn capabilities(self) -> Capabilities {
        ROLE_CAPABILITIES
            .iter()
            .find(|(role, _)| *role == self)
            .map(|(_, caps)| Capabilities::of(caps))
            .unwrap_or_default()
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Capability {
    ClockSelf,
    OperateKiosk,
    ViewAttendance,
    ApproveAttendance,
    ManagePins,
    ManageEmployees,
    RunPayroll,
    ViewPayroll,
    RequestVacation,
    ApproveVacations,
    ManageBudgets,
    ManageUsers,
}

use Capability::*;

/// Single source of truth for what each role may do.
const ROLE_CAPABILITIES: &[(Role, &[Capability])] = &[
    (
        Role::Admin,
        &[
            ClockSelf,
            ViewAttendance,
            ApproveAttendance,
            ManagePins,
            ManageEmployees,
            RunPayroll,
            ViewPayroll,
            RequestVacation,
            ApproveVacations,
            ManageBudgets,
            ManageUsers,
        ],
    ),
    (
        Role::Hr,
        &[
            ClockSelf,
            ViewAttendance,
            ApproveAttendance,
            ManagePins,
            ManageEmployees,
            RunPayroll,
            ViewPayroll,
            RequestVacation,
            ApproveVacations,
        ],
    ),
    (
        Role::Supervisor,
        &[ClockSelf, ViewAttendance, ApproveAttendance, RequestVacation, ApproveVacations],
    ),
    (Role::Employee, &[ClockSelf, RequestVacation]),
    (Role::Kiosk, &[OperateKiosk]),
];

/// Bit set of capabilities, resolved once per authenticated request.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Capabilities(u32);

impl Capabilities {
    fn of(caps: &[Capability]) -> Self {
        Self(caps.iter().fold(0, |acc, c| acc | (1 << *c as u32)))
    }

    pub fn contains(self, cap: Capability) -> bool {
        self.0 & (1 << cap as u32) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_can_do_everything_hr_can() {
        let admin = Role::Admin.capabilities();
        for cap in [ManageEmployees, RunPayroll, ManagePins, ApproveAttendance] {
            assert!(admin.contains(cap));
            assert!(Role::Hr.capabilities().contains(cap));
        }
        assert!(admin.contains(ManageBudgets));
        assert!(!Role::Hr.capabilities().contains(ManageBudgets));
    }

    #[test]
    fn kiosk_only_operates_kiosk() {
        let kiosk = Role::Kiosk.capabilities();
        assert!(kiosk.contains(OperateKiosk));
        assert!(!kiosk.contains(ClockSelf));
        assert!(!kiosk.contains(ViewPayroll));
    }

    #[test]
    fn role_ids_round_trip() {
        for role in [Role::Admin, Role::Hr, Role::Employee, Role::Kiosk, Role::Supervisor] {
            assert_eq!(Role::from_id(role.id()), Some(role));
        }
        assert_eq!(Role::from_id(9), None);
        assert_eq!("hr".parse::<Role>().ok(), Some(Role::Hr));
    }
}
