use crate::gateway::{GatewayError, GatewayResult, IamErrorCode};
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;
use thiserror::Error;
use tracing::error;

pub const S3_ACCOUNT_NOT_FOUND: &str = "s3_account_not_found";
pub const IAM_USER_NOT_FOUND: &str = "iam_user_not_found";
pub const S3_MSG_REMOTE_ERROR: &str = "s3_remote_error";
pub const INVALID_REQUEST: &str = "invalid_request";
pub const COMPENSATION_FAILED: &str = "compensation_failed";
pub const IAM_UNAVAILABLE: &str = "iam_unavailable";

/// Kind of named entity a lookup addressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Account,
    User,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Account => f.write_str("account"),
            Self::User => f.write_str("IAM user"),
        }
    }
}

/// Errors raised by the account and user orchestrators
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("The {entity} {name} is not found")]
    NotFound { entity: EntityKind, name: String },

    #[error("IAM API error: {message}")]
    RemoteIam { code: IamErrorCode, message: String },

    #[error("Invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("{original} (rollback failed: {cleanup})")]
    Compensation {
        original: Box<ServiceError>,
        cleanup: Box<ServiceError>,
    },

    #[error("IAM endpoint unavailable: {message}")]
    Transport { message: String },
}

/// Wire-ready rendition of a `ServiceError`
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error_code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ServiceError {
    pub fn account_not_found(name: impl Into<String>) -> Self {
        Self::NotFound {
            entity: EntityKind::Account,
            name: name.into(),
        }
    }

    pub fn user_not_found(name: impl Into<String>) -> Self {
        Self::NotFound {
            entity: EntityKind::User,
            name: name.into(),
        }
    }

    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Fold the result of a rollback step into the error that triggered it.
    /// A successful rollback leaves the original error untouched.
    pub fn after_rollback(self, cleanup: GatewayResult<()>) -> Self {
        match cleanup {
            Ok(()) => self,
            Err(cleanup) => {
                error!("Rollback failed; original failure was: {}", self);
                Self::Compensation {
                    original: Box::new(self),
                    cleanup: Box::new(cleanup.into()),
                }
            }
        }
    }

    /// Stable code callers can match on without parsing messages
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound {
                entity: EntityKind::Account,
                ..
            } => S3_ACCOUNT_NOT_FOUND,
            Self::NotFound {
                entity: EntityKind::User,
                ..
            } => IAM_USER_NOT_FOUND,
            Self::RemoteIam { .. } => S3_MSG_REMOTE_ERROR,
            Self::Validation { .. } => INVALID_REQUEST,
            Self::Compensation { .. } => COMPENSATION_FAILED,
            Self::Transport { .. } => IAM_UNAVAILABLE,
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        let details = match self {
            Self::NotFound { name, .. } => Some(json!({ "name": name })),
            Self::RemoteIam { code, message } => Some(json!({
                "s3_error_id": code.as_str(),
                "s3_error_message": message,
            })),
            Self::Validation { field, .. } => Some(json!({ "field": field })),
            Self::Compensation { original, cleanup } => Some(json!({
                "original": original.to_body(),
                "cleanup": cleanup.to_body(),
            })),
            Self::Transport { .. } => None,
        };
        ErrorBody {
            error_code: self.code(),
            message: self.to_string(),
            details,
        }
    }
}

impl From<GatewayError> for ServiceError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Remote(err) => Self::RemoteIam {
                code: err.error_code,
                message: err.error_message,
            },
            GatewayError::Transport { message } | GatewayError::Protocol { message } => {
                Self::Transport { message }
            }
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
