use super::credentials::CredentialContext;
use serde::{Deserialize, Serialize};

/// Control-plane administrator session with cross-account visibility
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperatorSession {
    /// Operator login, only used for logging
    pub user_id: Option<String>,
}

/// Session authenticated as a single storage account
#[derive(Clone, Serialize, Deserialize)]
pub struct TenantSession {
    /// Name of the account this session is scoped to
    pub user_id: String,
    pub access_key: String,
    pub secret_key: String,
    pub session_token: Option<String>,
}

impl std::fmt::Debug for TenantSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantSession")
            .field("user_id", &self.user_id)
            .field("access_key", &self.access_key)
            .finish_non_exhaustive()
    }
}

/// Session supplied by the front end; read-only to the orchestrators
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Session {
    Operator(OperatorSession),
    Tenant(TenantSession),
}

impl Session {
    pub fn operator() -> Self {
        Self::Operator(OperatorSession::default())
    }

    pub fn tenant(
        user_id: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self::Tenant(TenantSession {
            user_id: user_id.into(),
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            session_token,
        })
    }

    /// The context a call authenticated "as the caller" must use.
    /// Operator sessions carry no storage credentials.
    pub fn caller_context(&self) -> Option<CredentialContext> {
        match self {
            Self::Operator(_) => None,
            Self::Tenant(tenant) => Some(CredentialContext::caller(
                tenant.access_key.clone(),
                tenant.secret_key.clone(),
                tenant.session_token.clone(),
            )),
        }
    }

    pub fn principal(&self) -> &str {
        match self {
            Self::Operator(op) => op.user_id.as_deref().unwrap_or("operator"),
            Self::Tenant(tenant) => &tenant.user_id,
        }
    }
}
