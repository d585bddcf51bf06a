use super::error::{ServiceError, ServiceResult};
use super::validation;
use crate::common::{Account, CredentialContext, Session};
use crate::gateway::{GatewayFactory, IamErrorCode, IamGateway};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub const ACCOUNT_DELETED: &str = "Account Deleted Successfully.";

/// Result of provisioning; the only place a secret key is ever surfaced
#[derive(Debug, Clone, Serialize)]
pub struct CreatedAccount {
    pub account_name: String,
    pub account_email: String,
    pub access_key: String,
    pub secret_key: String,
}

/// Listing entry; credentials never appear here
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountSummary {
    pub account_name: String,
    pub account_email: String,
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        Self {
            account_name: account.account_name.clone(),
            account_email: account.account_email.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountListing {
    pub s3_accounts: Vec<AccountSummary>,
    #[serde(rename = "continue", skip_serializing_if = "Option::is_none")]
    pub continue_marker: Option<String>,
}

/// `access_key`/`secret_key` are present only when the key pair was reset
#[derive(Debug, Clone, Serialize)]
pub struct PatchedAccount {
    pub account_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeletedAccount {
    pub message: String,
}

/// Account lifecycle orchestration on top of the IAM gateway.
///
/// Holds no state between calls besides the root handle; every operation is
/// a short sequential run of gateway calls. Without root credentials only the
/// caller-authenticated operations are available.
pub struct AccountService {
    factory: Arc<dyn GatewayFactory>,
    root: Option<Box<dyn IamGateway>>,
}

impl AccountService {
    pub fn new(factory: Arc<dyn GatewayFactory>, root_context: Option<CredentialContext>) -> Self {
        let root = root_context.map(|context| factory.scoped(context));
        Self { factory, root }
    }

    fn root(&self) -> ServiceResult<&dyn IamGateway> {
        self.root.as_deref().ok_or_else(|| {
            ServiceError::validation("root", "this operation needs root credentials")
        })
    }

    /// Create an account and attach its login profile.
    ///
    /// The profile is created with the new account's own keys. If that step
    /// fails for any reason the account is deleted again, so the caller sees
    /// either a fully provisioned account or nothing.
    #[instrument(skip(self, password))]
    pub async fn create_account(
        &self,
        account_name: &str,
        account_email: &str,
        password: &str,
    ) -> ServiceResult<CreatedAccount> {
        validation::account_name(account_name)?;
        validation::account_email(account_email)?;
        validation::password(password)?;

        debug!("Creating s3 account {}", account_name);
        let created = self
            .root()?
            .create_account(account_name, account_email)
            .await
            .map_err(ServiceError::from)?;

        let account_client = self.factory.scoped(CredentialContext::caller(
            created.keys.access_key_id.clone(),
            created.keys.secret_key_id.clone(),
            None,
        ));

        debug!("Creating login profile for account {}", account_name);
        if let Err(err) = account_client
            .create_account_login_profile(&created.account.account_name, password)
            .await
        {
            let original = ServiceError::from(err);
            warn!(
                "Login profile creation failed for {}: {}; removing the account",
                account_name, original
            );
            // An account that is already gone needs no cleanup
            let cleanup = match account_client
                .delete_account(&created.account.account_name)
                .await
            {
                Err(err) if err.is_remote(&IamErrorCode::NoSuchEntity) => Ok(()),
                other => other,
            };
            return Err(original.after_rollback(cleanup));
        }

        info!("Account {} created", account_name);
        Ok(CreatedAccount {
            account_name: created.account.account_name,
            account_email: created.account.account_email,
            access_key: created.keys.access_key_id,
            secret_key: created.keys.secret_key_id,
        })
    }

    #[instrument(skip(self))]
    pub async fn get_account(&self, account_name: &str) -> ServiceResult<Account> {
        validation::account_name(account_name)?;
        match self.root()?.get_account(account_name).await {
            Ok(account) => Ok(account),
            Err(err) if err.is_remote(&IamErrorCode::NoSuchEntity) => {
                Err(ServiceError::account_not_found(account_name))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// List accounts visible to `session`.
    ///
    /// Operators (or internal callers passing `demand_all_accounts`) see the
    /// whole page. A tenant sees at most its own account. Once the tenant's
    /// account has been found the continuation marker is dropped, since no
    /// later page can contain it.
    #[instrument(skip(self, session), fields(principal = %session.principal()))]
    pub async fn list_accounts(
        &self,
        session: &Session,
        continue_marker: Option<&str>,
        page_limit: Option<u32>,
        demand_all_accounts: bool,
    ) -> ServiceResult<AccountListing> {
        validation::page_limit(page_limit)?;
        debug!(
            "Listing accounts. continue_marker: {:?}, page_limit: {:?}",
            continue_marker, page_limit
        );
        let page = self
            .root()?
            .list_accounts(page_limit, continue_marker)
            .await
            .map_err(ServiceError::from)?;

        let (s3_accounts, conclusive) = match session {
            _ if demand_all_accounts => (Self::summaries(&page.iam_accounts), false),
            Session::Operator(_) => (Self::summaries(&page.iam_accounts), false),
            Session::Tenant(tenant) => {
                let own: Vec<AccountSummary> = page
                    .iam_accounts
                    .iter()
                    .find(|account| account.account_name == tenant.user_id)
                    .map(AccountSummary::from)
                    .into_iter()
                    .collect();
                let found = !own.is_empty();
                (own, found)
            }
        };

        let continue_marker = if page.is_truncated && !conclusive {
            page.marker
        } else {
            None
        };
        debug!(
            "Listed {} account(s), continue: {:?}",
            s3_accounts.len(),
            continue_marker
        );
        Ok(AccountListing {
            s3_accounts,
            continue_marker,
        })
    }

    /// Reset the key pair and/or set the password of an account.
    ///
    /// After a reset every later call in this operation runs under the new
    /// keys. Without a reset the password change is authenticated as the
    /// calling account, never as root.
    #[instrument(skip(self, session, password), fields(principal = %session.principal()))]
    pub async fn patch_account(
        &self,
        session: &Session,
        account_name: &str,
        password: Option<&str>,
        reset_access_key: bool,
    ) -> ServiceResult<PatchedAccount> {
        validation::account_name(account_name)?;
        if let Some(password) = password {
            validation::password(password)?;
        }

        let mut response = PatchedAccount {
            account_name: account_name.to_string(),
            access_key: None,
            secret_key: None,
        };
        if !reset_access_key && password.is_none() {
            debug!("Nothing to patch for account {}", account_name);
            return Ok(response);
        }

        let context = if reset_access_key {
            let keys = match self.root()?.reset_account_access_key(account_name).await {
                Ok(keys) => keys,
                Err(err) if err.is_remote(&IamErrorCode::NoSuchEntity) => {
                    return Err(ServiceError::account_not_found(account_name))
                }
                Err(err) => return Err(err.into()),
            };
            info!("Access key reset for account {}", account_name);
            let context = CredentialContext::caller(
                keys.access_key_id.clone(),
                keys.secret_key_id.clone(),
                None,
            );
            response.access_key = Some(keys.access_key_id);
            response.secret_key = Some(keys.secret_key_id);
            context
        } else {
            Self::caller_context(session)?
        };

        if let Some(password) = password {
            let client = self.factory.scoped(context);
            match client
                .create_account_login_profile(account_name, password)
                .await
            {
                Ok(_) => debug!("Login profile created for account {}", account_name),
                Err(err) if err.is_remote(&IamErrorCode::EntityAlreadyExists) => {
                    debug!("Updating login profile for account {}", account_name);
                    client
                        .update_account_login_profile(account_name, password)
                        .await
                        .map_err(ServiceError::from)?;
                }
                Err(err) => return Err(err.into()),
            }
        }

        Ok(response)
    }

    /// Delete an account using the caller's own credentials
    #[instrument(skip(self, session), fields(principal = %session.principal()))]
    pub async fn delete_account(
        &self,
        session: &Session,
        account_name: &str,
    ) -> ServiceResult<DeletedAccount> {
        validation::account_name(account_name)?;
        let client = self.factory.scoped(Self::caller_context(session)?);

        match client.delete_account(account_name).await {
            Ok(()) => {
                info!("Account {} deleted", account_name);
                Ok(DeletedAccount {
                    message: ACCOUNT_DELETED.to_string(),
                })
            }
            Err(err) if err.is_remote(&IamErrorCode::NoSuchEntity) => {
                Err(ServiceError::account_not_found(account_name))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn caller_context(session: &Session) -> ServiceResult<CredentialContext> {
        session.caller_context().ok_or_else(|| {
            ServiceError::validation(
                "session",
                "this operation must be performed with the account's own credentials",
            )
        })
    }

    fn summaries(accounts: &[Account]) -> Vec<AccountSummary> {
        accounts.iter().map(AccountSummary::from).collect()
    }
}
