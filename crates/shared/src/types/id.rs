//! Typed IDs for type-safe entity references.
//!
//! Using typed IDs prevents accidentally passing an `EmployeeId` where a
//! `LeaveRequestId` is expected. A manager is referenced by `EmployeeId`, never
//! by an embedded record, so reporting chains are resolved one hop at a time.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Creates a new random ID using UUID v7 (time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

typed_id!(EmployeeId, "Unique identifier for an employee.");
typed_id!(LeaveRequestId, "Unique identifier for a leave request.");
typed_id!(
    ChronologyEntryId,
    "Unique identifier for a chronology entry on a leave request."
);
typed_id!(AuditRecordId, "Unique identifier for an administrative audit record.");
typed_id!(HolidayId, "Unique identifier for a public holiday.");

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_typed_id_from_uuid_roundtrips_inner() {
        let uuid = Uuid::new_v4();
        let id = EmployeeId::from_uuid(uuid);
        assert_eq!(id.into_inner(), uuid);
    }

    #[test]
    fn test_typed_ids_are_unique() {
        assert_ne!(LeaveRequestId::new(), LeaveRequestId::new());
    }

    #[test]
    fn test_typed_id_parse() {
        let uuid = Uuid::new_v4();
        let id = EmployeeId::from_str(&uuid.to_string()).unwrap();
        assert_eq!(id.0, uuid);
        assert!(EmployeeId::from_str("not-a-uuid").is_err());
    }
}
