//! Employee directory contract.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use leavewise_shared::EmployeeId;

use crate::error::LeaveError;

/// Employee role in the organization hierarchy.
///
/// Roles are ordered from lowest to highest privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmployeeRole {
    /// Regular employee.
    Staff = 0,
    /// Line manager; approves direct reports.
    Manager = 1,
    /// Human resources; receives escalations and adjusts balances.
    Hr = 2,
    /// Administrator.
    Admin = 3,
    /// System administrator.
    SysAdmin = 4,
}

impl EmployeeRole {
    /// Returns the string representation of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Staff => "staff",
            Self::Manager => "manager",
            Self::Hr => "hr",
            Self::Admin => "admin",
            Self::SysAdmin => "sysadmin",
        }
    }

    /// HR and above handle escalated requests and ledger overrides.
    #[must_use]
    pub fn is_hr_or_above(&self) -> bool {
        *self >= Self::Hr
    }
}

/// Directory record of an employee.
///
/// The manager is referenced by id only; chains are walked one lookup at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeProfile {
    /// Employee id.
    pub id: EmployeeId,
    /// Display name.
    pub name: String,
    /// Contact address for notifications.
    pub email: String,
    /// Role in the organization.
    pub role: EmployeeRole,
    /// Direct manager, if any.
    pub manager_id: Option<EmployeeId>,
    /// First day of service.
    pub joined_date: NaiveDate,
    /// False while on probation.
    pub is_confirmed: bool,
    /// Holiday region.
    pub region: Option<String>,
}

impl EmployeeProfile {
    /// Creates a confirmed staff member with no manager.
    #[must_use]
    pub fn new(name: impl Into<String>, joined_date: NaiveDate) -> Self {
        let name = name.into();
        Self {
            id: EmployeeId::new(),
            email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
            name,
            role: EmployeeRole::Staff,
            manager_id: None,
            joined_date,
            is_confirmed: true,
            region: None,
        }
    }

    /// Sets the direct manager.
    #[must_use]
    pub fn reporting_to(mut self, manager: EmployeeId) -> Self {
        self.manager_id = Some(manager);
        self
    }

    /// Sets the role.
    #[must_use]
    pub fn with_role(mut self, role: EmployeeRole) -> Self {
        self.role = role;
        self
    }

    /// Marks the employee as still on probation.
    #[must_use]
    pub fn on_probation(mut self) -> Self {
        self.is_confirmed = false;
        self
    }

    /// Sets the holiday region.
    #[must_use]
    pub fn in_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// The authenticated principal for this employee.
    #[must_use]
    pub fn as_actor(&self) -> ActorContext {
        ActorContext {
            employee_id: self.id,
            role: self.role,
        }
    }
}

/// Authenticated principal performing an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorContext {
    /// Acting employee.
    pub employee_id: EmployeeId,
    /// Role of the acting employee.
    pub role: EmployeeRole,
}

/// Supplies employee records for authorization and entitlement decisions.
pub trait IdentityProvider: Send + Sync {
    /// Looks up an employee.
    fn employee(&self, id: EmployeeId) -> Result<EmployeeProfile, LeaveError>;

    /// Lists the direct reports of a manager.
    fn direct_reports(&self, manager: EmployeeId) -> Vec<EmployeeId>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_ordering() {
        assert!(EmployeeRole::Staff < EmployeeRole::Manager);
        assert!(EmployeeRole::Manager < EmployeeRole::Hr);
        assert!(EmployeeRole::Hr.is_hr_or_above());
        assert!(EmployeeRole::SysAdmin.is_hr_or_above());
        assert!(!EmployeeRole::Manager.is_hr_or_above());
    }

    #[test]
    fn test_role_as_str() {
        assert_eq!(EmployeeRole::Hr.as_str(), "hr");
        assert_eq!(EmployeeRole::Admin.as_str(), "admin");
    }

    #[test]
    fn test_profile_builders() {
        let manager = EmployeeProfile::new("Mei Lin", NaiveDate::from_ymd_opt(2019, 4, 1).unwrap())
            .with_role(EmployeeRole::Manager);
        let staff = EmployeeProfile::new("Arif Rahman", NaiveDate::from_ymd_opt(2024, 9, 2).unwrap())
            .reporting_to(manager.id)
            .on_probation()
            .in_region("selangor");

        assert_eq!(staff.manager_id, Some(manager.id));
        assert!(!staff.is_confirmed);
        assert_eq!(staff.email, "arif.rahman@example.com");
        assert_eq!(staff.as_actor().role, EmployeeRole::Staff);
    }
}
