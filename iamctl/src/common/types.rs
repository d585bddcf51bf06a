use serde::{Deserialize, Serialize};

/// Storage account as reported by the IAM endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub account_name: String,
    pub account_email: String,
    pub account_id: Option<String>,
    pub canonical_id: Option<String>,
}

/// Freshly created account together with its root key pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub account: Account,
    pub keys: AccessKeyPair,
}

/// Access key id plus secret, as minted by the IAM endpoint
#[derive(Clone, PartialEq, Eq)]
pub struct AccessKeyPair {
    pub access_key_id: String,
    pub secret_key_id: String,
}

impl std::fmt::Debug for AccessKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessKeyPair")
            .field("access_key_id", &self.access_key_id)
            .finish_non_exhaustive()
    }
}

/// One page of `ListAccounts`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountPage {
    pub iam_accounts: Vec<Account>,
    pub is_truncated: bool,
    pub marker: Option<String>,
}

/// Password login attached to an account or user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginProfile {
    pub name: String,
    pub password_reset_required: bool,
}

/// IAM user living inside an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IamUser {
    pub user_name: String,
    pub user_id: Option<String>,
    pub arn: Option<String>,
    pub path: String,
}

/// Short-lived credentials issued for an account login
#[derive(Clone, PartialEq, Eq)]
pub struct TempCredentials {
    pub access_key: String,
    pub secret_key: String,
    pub session_token: Option<String>,
}

impl std::fmt::Debug for TempCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TempCredentials")
            .field("access_key", &self.access_key)
            .finish_non_exhaustive()
    }
}
