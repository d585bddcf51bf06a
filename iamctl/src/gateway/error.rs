use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error codes returned by the IAM endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IamErrorCode {
    NoSuchEntity,
    EntityAlreadyExists,
    InvalidAccessKeyId,
    SignatureDoesNotMatch,
    ExpiredCredential,
    AccessDenied,
    InvalidParameterValue,
    PasswordPolicyViolation,
    MaxAccountLimitExceeded,
    DeleteConflict,
    Other(String),
}

impl IamErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            Self::NoSuchEntity => "NoSuchEntity",
            Self::EntityAlreadyExists => "EntityAlreadyExists",
            Self::InvalidAccessKeyId => "InvalidAccessKeyId",
            Self::SignatureDoesNotMatch => "SignatureDoesNotMatch",
            Self::ExpiredCredential => "ExpiredCredential",
            Self::AccessDenied => "AccessDenied",
            Self::InvalidParameterValue => "InvalidParameterValue",
            Self::PasswordPolicyViolation => "PasswordPolicyVoilation",
            Self::MaxAccountLimitExceeded => "MaxAccountLimitExceeded",
            Self::DeleteConflict => "DeleteConflict",
            Self::Other(code) => code,
        }
    }
}

impl FromStr for IamErrorCode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "NoSuchEntity" => Self::NoSuchEntity,
            "EntityAlreadyExists" => Self::EntityAlreadyExists,
            "InvalidAccessKeyId" => Self::InvalidAccessKeyId,
            "SignatureDoesNotMatch" => Self::SignatureDoesNotMatch,
            "ExpiredCredential" => Self::ExpiredCredential,
            "AccessDenied" => Self::AccessDenied,
            "InvalidParameterValue" => Self::InvalidParameterValue,
            // The endpoint spells it both ways
            "PasswordPolicyVoilation" | "PasswordPolicyViolation" => Self::PasswordPolicyViolation,
            "MaxAccountLimitExceeded" => Self::MaxAccountLimitExceeded,
            "DeleteConflict" => Self::DeleteConflict,
            other => Self::Other(other.to_string()),
        })
    }
}

impl fmt::Display for IamErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured error document returned by the IAM endpoint
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{error_code}: {error_message}")]
pub struct IamError {
    pub error_code: IamErrorCode,
    pub error_message: String,
}

impl IamError {
    pub fn new(error_code: IamErrorCode, error_message: impl Into<String>) -> Self {
        Self {
            error_code,
            error_message: error_message.into(),
        }
    }

    pub fn is(&self, code: &IamErrorCode) -> bool {
        &self.error_code == code
    }
}

/// Outcome of a failed gateway call
#[derive(Error, Debug, Clone)]
pub enum GatewayError {
    /// The endpoint answered with an IAM error document
    #[error("IAM error {0}")]
    Remote(IamError),

    /// The endpoint could not be reached or timed out
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// The endpoint answered something we could not decode
    #[error("Protocol error: {message}")]
    Protocol { message: String },
}

impl GatewayError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// The remote error document, if this is one
    pub fn remote(&self) -> Option<&IamError> {
        match self {
            Self::Remote(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_remote(&self, code: &IamErrorCode) -> bool {
        self.remote().is_some_and(|err| err.is(code))
    }
}

impl From<IamError> for GatewayError {
    fn from(err: IamError) -> Self {
        Self::Remote(err)
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
