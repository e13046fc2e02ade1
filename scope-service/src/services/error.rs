use service_core::error::AppError;
use thiserror::Error;

use crate::models::TargetKind;

/// Machine-readable reason carried by every access denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForbiddenReason {
    /// The role holds no entitlement for the (resource, action) pair.
    RoleNotEntitled,
    /// A student may only reach their own record.
    SelfOnly,
    /// The target lies outside the caller's resolved scope.
    ScopeNotSatisfied,
}

impl ForbiddenReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForbiddenReason::RoleNotEntitled => "role-not-entitled",
            ForbiddenReason::SelfOnly => "self-only",
            ForbiddenReason::ScopeNotSatisfied => "scope-not-satisfied",
        }
    }
}

impl std::fmt::Display for ForbiddenReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum AccessError {
    #[error("User {0} not found")]
    UserNotFound(i64),

    #[error("Unknown role code {0}")]
    UnknownRole(i32),

    #[error("Forbidden: {0}")]
    Forbidden(ForbiddenReason),

    #[error("{kind} {id} not found")]
    NotFound { kind: TargetKind, id: i64 },

    #[error("Directory unavailable: {0}")]
    DirectoryUnavailable(anyhow::Error),
}

impl AccessError {
    pub fn forbidden_reason(&self) -> Option<ForbiddenReason> {
        match self {
            AccessError::Forbidden(reason) => Some(*reason),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for AccessError {
    fn from(err: sqlx::Error) -> Self {
        AccessError::DirectoryUnavailable(anyhow::Error::new(err))
    }
}

impl From<AccessError> for AppError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::UserNotFound(_) => AppError::Unauthorized(anyhow::anyhow!("User not found")),
            AccessError::UnknownRole(code) => {
                AppError::InternalError(anyhow::anyhow!("Unknown role code {}", code))
            }
            AccessError::Forbidden(reason) => AppError::Forbidden(anyhow::anyhow!(reason.as_str())),
            AccessError::NotFound { kind, id } => {
                AppError::NotFound(anyhow::anyhow!("{} {} not found", kind, id))
            }
            AccessError::DirectoryUnavailable(e) => AppError::ServiceUnavailable(e),
        }
    }
}
