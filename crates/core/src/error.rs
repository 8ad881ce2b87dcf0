//! Leave lifecycle error types.
//!
//! Every validation and authorization failure is detected before any state is
//! mutated, so receiving one of these errors means nothing was committed.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use leavewise_shared::{EmployeeId, LeaveRequestId};

use crate::entitlement::LeaveType;
use crate::lifecycle::LeaveStatus;

/// Errors that can occur during leave lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LeaveError {
    // ========== Validation Errors ==========
    /// Start date is after end date.
    #[error("Invalid date range: {start} is after {end}")]
    InvalidDateRange {
        /// Requested start date.
        start: NaiveDate,
        /// Requested end date.
        end: NaiveDate,
    },

    /// Unconfirmed employees may only request sick leave.
    #[error("Employee is on probation and cannot apply for {leave_type} leave")]
    ProbationRestriction {
        /// The requested leave type.
        leave_type: LeaveType,
    },

    /// Start date lies before yesterday for a non-emergency type.
    #[error("Cannot apply for leave starting in the past ({start})")]
    PastDateNotAllowed {
        /// Requested start date.
        start: NaiveDate,
    },

    /// The leave type is disabled by policy.
    #[error("Leave type {0} is not active")]
    LeaveTypeInactive(LeaveType),

    /// The leave type requires a supporting document.
    #[error("An attachment is required for {0} leave")]
    AttachmentRequired(LeaveType),

    /// Catch-all leave categories need a sub-type tag.
    #[error("A sub-type is required for {0} leave")]
    SubTypeRequired(LeaveType),

    /// Request does not respect the minimum advance notice.
    #[error("Leave must be requested at least {required_days} days in advance")]
    InsufficientNotice {
        /// Minimum notice in days.
        required_days: u32,
    },

    /// Request exceeds the per-application maximum.
    #[error("Requested {requested} days exceeds the maximum of {max} days per application")]
    ExceedsMaxDuration {
        /// Policy maximum.
        max: Decimal,
        /// Chargeable duration of the request.
        requested: Decimal,
    },

    /// Half-day portions only apply to single-day requests.
    #[error("Half-day leave must start and end on the same day")]
    HalfDayRequiresSingleDay,

    /// A reason is mandatory for this action.
    #[error("A reason is required")]
    ReasonRequired,

    /// Comments cannot be blank.
    #[error("Comment cannot be empty")]
    CommentRequired,

    /// Day amounts cannot be negative.
    #[error("Amount cannot be negative: {0}")]
    NegativeAmount(Decimal),

    // ========== Balance Errors ==========
    /// Approving or submitting would overdraw the ledger row.
    #[error("Insufficient balance. Available: {available}, Requested: {requested}")]
    InsufficientBalance {
        /// Available days on the ledger row.
        available: Decimal,
        /// Days requested.
        requested: Decimal,
    },

    // ========== State Errors ==========
    /// The request's current status does not allow the action.
    #[error("Cannot {action} a request that is {from}")]
    InvalidTransition {
        /// The current status.
        from: LeaveStatus,
        /// The attempted action.
        action: &'static str,
    },

    /// The actor may not perform the action on this request.
    #[error("Employee {actor} is not authorized to {action} this request")]
    NotAuthorized {
        /// The acting employee.
        actor: EmployeeId,
        /// The attempted action.
        action: &'static str,
    },

    // ========== Lookup Errors ==========
    /// A referenced entity does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of entity.
        entity: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    /// No policy row exists for the leave type.
    #[error("No entitlement configuration for {0} leave")]
    ConfigurationMissing(LeaveType),
}

impl LeaveError {
    /// Create a leave request not found error.
    #[must_use]
    pub fn request_not_found(id: LeaveRequestId) -> Self {
        Self::NotFound {
            entity: "Leave request",
            id: id.to_string(),
        }
    }

    /// Create an employee not found error.
    #[must_use]
    pub fn employee_not_found(id: EmployeeId) -> Self {
        Self::NotFound {
            entity: "Employee",
            id: id.to_string(),
        }
    }

    /// Returns true for errors raised by request validation.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        self.status_code() == 400
    }

    /// Returns true if the request's state changed underneath the caller.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.status_code() == 409
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidDateRange { .. }
            | Self::PastDateNotAllowed { .. }
            | Self::LeaveTypeInactive(_)
            | Self::AttachmentRequired(_)
            | Self::SubTypeRequired(_)
            | Self::InsufficientNotice { .. }
            | Self::ExceedsMaxDuration { .. }
            | Self::HalfDayRequiresSingleDay
            | Self::ReasonRequired
            | Self::CommentRequired
            | Self::NegativeAmount(_) => 400,

            Self::NotAuthorized { .. } => 403,

            Self::NotFound { .. } | Self::ConfigurationMissing(_) => 404,

            Self::InvalidTransition { .. } => 409,

            Self::ProbationRestriction { .. } | Self::InsufficientBalance { .. } => 422,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidDateRange { .. } => "INVALID_DATE_RANGE",
            Self::ProbationRestriction { .. } => "PROBATION_RESTRICTION",
            Self::PastDateNotAllowed { .. } => "PAST_DATE_NOT_ALLOWED",
            Self::LeaveTypeInactive(_) => "LEAVE_TYPE_INACTIVE",
            Self::AttachmentRequired(_) => "ATTACHMENT_REQUIRED",
            Self::SubTypeRequired(_) => "SUB_TYPE_REQUIRED",
            Self::InsufficientNotice { .. } => "INSUFFICIENT_NOTICE",
            Self::ExceedsMaxDuration { .. } => "EXCEEDS_MAX_DURATION",
            Self::HalfDayRequiresSingleDay => "HALF_DAY_REQUIRES_SINGLE_DAY",
            Self::ReasonRequired => "REASON_REQUIRED",
            Self::CommentRequired => "COMMENT_REQUIRED",
            Self::NegativeAmount(_) => "NEGATIVE_AMOUNT",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::NotAuthorized { .. } => "NOT_AUTHORIZED",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::ConfigurationMissing(_) => "CONFIGURATION_MISSING",
        }
    }
}
