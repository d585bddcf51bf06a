use super::error::{ServiceError, ServiceResult};
use regex::Regex;
use std::sync::LazyLock;

static ACCOUNT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("valid account name regex"));
static USER_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_+=,.@-]{1,64}$").expect("valid user name regex"));
static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex")
});

pub fn account_name(value: &str) -> ServiceResult<()> {
    if value.is_empty() {
        return Err(ServiceError::validation("account_name", "must not be empty"));
    }
    if !ACCOUNT_NAME.is_match(value) {
        return Err(ServiceError::validation(
            "account_name",
            "must be 1-64 characters of letters, digits, '_' or '-'",
        ));
    }
    Ok(())
}

pub fn account_email(value: &str) -> ServiceResult<()> {
    if value.is_empty() {
        return Err(ServiceError::validation("account_email", "must not be empty"));
    }
    if !EMAIL.is_match(value) {
        return Err(ServiceError::validation(
            "account_email",
            "must be an email address",
        ));
    }
    Ok(())
}

/// Only emptiness is checked here; the password policy lives on the IAM side
pub fn password(value: &str) -> ServiceResult<()> {
    if value.is_empty() {
        return Err(ServiceError::validation("password", "must not be empty"));
    }
    Ok(())
}

pub fn user_name(value: &str) -> ServiceResult<()> {
    if !USER_NAME.is_match(value) {
        return Err(ServiceError::validation(
            "user_name",
            "must be 1-64 characters of letters, digits or _+=,.@-",
        ));
    }
    Ok(())
}

pub fn user_path(value: &str) -> ServiceResult<()> {
    if !value.starts_with('/') || !value.ends_with('/') {
        return Err(ServiceError::validation(
            "path",
            "must begin and end with '/'",
        ));
    }
    Ok(())
}

pub fn page_limit(value: Option<u32>) -> ServiceResult<()> {
    match value {
        Some(0) => Err(ServiceError::validation("page_limit", "must be at least 1")),
        _ => Ok(()),
    }
}
