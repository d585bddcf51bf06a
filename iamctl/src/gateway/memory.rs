//! In-memory IAM endpoint used by the orchestrator tests.
//!
//! It enforces the same authority rules the real endpoint does: account
//! administration needs root keys, account-scoped calls need root or the
//! account's current keys, and user calls run under temporary credentials.

use super::error::{GatewayError, GatewayResult, IamError, IamErrorCode};
use super::{GatewayFactory, IamGateway};
use crate::common::{
    AccessKeyPair, Account, AccountPage, CredentialContext, IamUser, LoginProfile, NewAccount,
    TempCredentials,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};

pub const ROOT_ACCESS_KEY: &str = "AKROOT";
pub const ROOT_SECRET_KEY: &str = "root-secret";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub op: &'static str,
    pub name: String,
    pub access_key: String,
}

struct StoredAccount {
    email: String,
    keys: AccessKeyPair,
    password: Option<String>,
}

#[derive(Default)]
struct State {
    accounts: BTreeMap<String, StoredAccount>,
    users: BTreeMap<(String, String), (IamUser, Option<String>)>,
    temp_keys: HashMap<String, String>,
    calls: Vec<Call>,
    failures: HashMap<&'static str, VecDeque<GatewayError>>,
    key_seq: u32,
    page_size: Option<usize>,
}

enum Principal {
    Root,
    Account(String),
}

impl State {
    fn next_keys(&mut self, prefix: &str) -> AccessKeyPair {
        self.key_seq += 1;
        AccessKeyPair {
            access_key_id: format!("{}{:04}", prefix, self.key_seq),
            secret_key_id: format!("secret-{:04}", self.key_seq),
        }
    }

    fn principal(&self, context: &CredentialContext) -> GatewayResult<Principal> {
        if context.access_key() == ROOT_ACCESS_KEY {
            return Ok(Principal::Root);
        }
        if let Some(account) = self.temp_keys.get(context.access_key()) {
            return Ok(Principal::Account(account.clone()));
        }
        self.accounts
            .iter()
            .find(|(_, stored)| stored.keys.access_key_id == context.access_key())
            .map(|(name, _)| Principal::Account(name.clone()))
            .ok_or_else(|| {
                IamError::new(
                    IamErrorCode::InvalidAccessKeyId,
                    "The access key Id you provided does not exist in our records.",
                )
                .into()
            })
    }

    fn require_root(&self, context: &CredentialContext) -> GatewayResult<()> {
        match self.principal(context)? {
            Principal::Root => Ok(()),
            Principal::Account(_) => Err(access_denied()),
        }
    }

    /// Root, or the named account acting on itself
    fn require_account(&self, context: &CredentialContext, name: &str) -> GatewayResult<()> {
        match self.principal(context)? {
            Principal::Root => Ok(()),
            Principal::Account(owner) if owner == name => Ok(()),
            Principal::Account(_) => Err(access_denied()),
        }
    }

    fn account_of(&self, context: &CredentialContext) -> GatewayResult<String> {
        match self.principal(context)? {
            Principal::Account(name) => Ok(name),
            Principal::Root => Err(access_denied()),
        }
    }
}

fn access_denied() -> GatewayError {
    IamError::new(IamErrorCode::AccessDenied, "Access denied.").into()
}

fn no_such_entity(name: &str) -> GatewayError {
    IamError::new(
        IamErrorCode::NoSuchEntity,
        format!("The entity {} does not exist.", name),
    )
    .into()
}

fn already_exists(name: &str) -> GatewayError {
    IamError::new(
        IamErrorCode::EntityAlreadyExists,
        format!("The entity {} already exists.", name),
    )
    .into()
}

/// Shared fake IAM endpoint; clones see the same state
#[derive(Clone, Default)]
pub struct MemoryIam {
    state: Arc<Mutex<State>>,
}

impl MemoryIam {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root_context() -> CredentialContext {
        CredentialContext::root(ROOT_ACCESS_KEY, ROOT_SECRET_KEY)
    }

    pub fn seed_account(&self, name: &str, email: &str, password: Option<&str>) -> AccessKeyPair {
        let mut state = self.state.lock().unwrap();
        let keys = state.next_keys("AKACC");
        state.accounts.insert(
            name.to_string(),
            StoredAccount {
                email: email.to_string(),
                keys: keys.clone(),
                password: password.map(str::to_string),
            },
        );
        keys
    }

    /// Make the next call to `op` fail with `err`
    pub fn fail_next(&self, op: &'static str, err: impl Into<GatewayError>) {
        let mut state = self.state.lock().unwrap();
        state.failures.entry(op).or_default().push_back(err.into());
    }

    pub fn set_page_size(&self, size: usize) {
        self.state.lock().unwrap().page_size = Some(size);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn calls_to(&self, op: &str) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.op == op).collect()
    }

    pub fn account_exists(&self, name: &str) -> bool {
        self.state.lock().unwrap().accounts.contains_key(name)
    }

    pub fn account_password(&self, name: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state.accounts.get(name).and_then(|a| a.password.clone())
    }

    pub fn account_keys(&self, name: &str) -> Option<AccessKeyPair> {
        let state = self.state.lock().unwrap();
        state.accounts.get(name).map(|a| a.keys.clone())
    }

    pub fn user_exists(&self, account: &str, user: &str) -> bool {
        let state = self.state.lock().unwrap();
        state
            .users
            .contains_key(&(account.to_string(), user.to_string()))
    }

    pub fn user_password(&self, account: &str, user: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state
            .users
            .get(&(account.to_string(), user.to_string()))
            .and_then(|(_, password)| password.clone())
    }
}

impl GatewayFactory for MemoryIam {
    fn scoped(&self, context: CredentialContext) -> Box<dyn IamGateway> {
        Box::new(MemoryGateway {
            iam: self.clone(),
            context,
        })
    }
}

pub struct MemoryGateway {
    iam: MemoryIam,
    context: CredentialContext,
}

impl MemoryGateway {
    /// Record the call and pop an injected failure, if any
    fn enter(&self, op: &'static str, name: &str) -> GatewayResult<std::sync::MutexGuard<'_, State>> {
        let mut state = self.iam.state.lock().unwrap();
        state.calls.push(Call {
            op,
            name: name.to_string(),
            access_key: self.context.access_key().to_string(),
        });
        if let Some(err) = state.failures.get_mut(op).and_then(VecDeque::pop_front) {
            return Err(err);
        }
        Ok(state)
    }
}

#[async_trait]
impl IamGateway for MemoryGateway {
    async fn create_account(&self, name: &str, email: &str) -> GatewayResult<NewAccount> {
        let mut state = self.enter("create_account", name)?;
        state.require_root(&self.context)?;
        if state.accounts.contains_key(name) {
            return Err(already_exists(name));
        }
        let keys = state.next_keys("AKACC");
        state.accounts.insert(
            name.to_string(),
            StoredAccount {
                email: email.to_string(),
                keys: keys.clone(),
                password: None,
            },
        );
        Ok(NewAccount {
            account: Account {
                account_name: name.to_string(),
                account_email: email.to_string(),
                account_id: Some(format!("{:012}", state.key_seq)),
                canonical_id: None,
            },
            keys,
        })
    }

    async fn get_account(&self, name: &str) -> GatewayResult<Account> {
        let state = self.enter("get_account", name)?;
        state.require_root(&self.context)?;
        state
            .accounts
            .get(name)
            .map(|stored| Account {
                account_name: name.to_string(),
                account_email: stored.email.clone(),
                account_id: None,
                canonical_id: None,
            })
            .ok_or_else(|| no_such_entity(name))
    }

    async fn list_accounts(
        &self,
        max_items: Option<u32>,
        marker: Option<&str>,
    ) -> GatewayResult<AccountPage> {
        let state = self.enter("list_accounts", marker.unwrap_or_default())?;
        state.require_root(&self.context)?;
        let limit = match (max_items, state.page_size) {
            (Some(max), Some(size)) => (max as usize).min(size),
            (Some(max), None) => max as usize,
            (None, Some(size)) => size,
            (None, None) => usize::MAX,
        };
        let remaining: Vec<Account> = state
            .accounts
            .iter()
            .filter(|(name, _)| marker.map_or(true, |m| name.as_str() > m))
            .map(|(name, stored)| Account {
                account_name: name.clone(),
                account_email: stored.email.clone(),
                account_id: None,
                canonical_id: None,
            })
            .collect();
        let is_truncated = remaining.len() > limit;
        let iam_accounts: Vec<Account> = remaining.into_iter().take(limit).collect();
        let marker = if is_truncated {
            iam_accounts.last().map(|a| a.account_name.clone())
        } else {
            None
        };
        Ok(AccountPage {
            iam_accounts,
            is_truncated,
            marker,
        })
    }

    async fn reset_account_access_key(&self, name: &str) -> GatewayResult<AccessKeyPair> {
        let mut state = self.enter("reset_account_access_key", name)?;
        state.require_root(&self.context)?;
        if !state.accounts.contains_key(name) {
            return Err(no_such_entity(name));
        }
        let keys = state.next_keys("AKACC");
        if let Some(stored) = state.accounts.get_mut(name) {
            stored.keys = keys.clone();
        }
        Ok(keys)
    }

    async fn delete_account(&self, name: &str) -> GatewayResult<()> {
        let mut state = self.enter("delete_account", name)?;
        if !state.accounts.contains_key(name) {
            return Err(no_such_entity(name));
        }
        state.require_account(&self.context, name)?;
        state.accounts.remove(name);
        state.users.retain(|(account, _), _| account != name);
        Ok(())
    }

    async fn create_account_login_profile(
        &self,
        name: &str,
        password: &str,
    ) -> GatewayResult<LoginProfile> {
        let mut state = self.enter("create_account_login_profile", name)?;
        state.require_account(&self.context, name)?;
        let stored = state.accounts.get_mut(name).ok_or_else(|| no_such_entity(name))?;
        if stored.password.is_some() {
            return Err(already_exists(name));
        }
        stored.password = Some(password.to_string());
        Ok(LoginProfile {
            name: name.to_string(),
            password_reset_required: false,
        })
    }

    async fn update_account_login_profile(
        &self,
        name: &str,
        password: &str,
    ) -> GatewayResult<LoginProfile> {
        let mut state = self.enter("update_account_login_profile", name)?;
        state.require_account(&self.context, name)?;
        let stored = state.accounts.get_mut(name).ok_or_else(|| no_such_entity(name))?;
        if stored.password.is_none() {
            return Err(no_such_entity(name));
        }
        stored.password = Some(password.to_string());
        Ok(LoginProfile {
            name: name.to_string(),
            password_reset_required: false,
        })
    }

    async fn create_user(&self, name: &str, path: &str) -> GatewayResult<IamUser> {
        let mut state = self.enter("create_user", name)?;
        let account = state.account_of(&self.context)?;
        let key = (account.clone(), name.to_string());
        if state.users.contains_key(&key) {
            return Err(already_exists(name));
        }
        let user = IamUser {
            user_name: name.to_string(),
            user_id: Some(format!("AIDA{:04}", state.users.len() + 1)),
            arn: Some(format!("arn:aws:iam::{}:user{}{}", account, path, name)),
            path: path.to_string(),
        };
        state.users.insert(key, (user.clone(), None));
        Ok(user)
    }

    async fn delete_user(&self, name: &str) -> GatewayResult<()> {
        let mut state = self.enter("delete_user", name)?;
        let account = state.account_of(&self.context)?;
        state
            .users
            .remove(&(account, name.to_string()))
            .map(|_| ())
            .ok_or_else(|| no_such_entity(name))
    }

    async fn create_user_login_profile(
        &self,
        name: &str,
        password: &str,
        require_reset: bool,
    ) -> GatewayResult<LoginProfile> {
        let mut state = self.enter("create_user_login_profile", name)?;
        let account = state.account_of(&self.context)?;
        let (_, stored) = state
            .users
            .get_mut(&(account, name.to_string()))
            .ok_or_else(|| no_such_entity(name))?;
        if stored.is_some() {
            return Err(already_exists(name));
        }
        *stored = Some(password.to_string());
        Ok(LoginProfile {
            name: name.to_string(),
            password_reset_required: require_reset,
        })
    }

    async fn get_temp_credentials(
        &self,
        account_name: &str,
        password: &str,
    ) -> GatewayResult<TempCredentials> {
        let mut state = self.enter("get_temp_credentials", account_name)?;
        let matches = state
            .accounts
            .get(account_name)
            .and_then(|a| a.password.as_deref())
            .is_some_and(|p| p == password);
        if !matches {
            return Err(IamError::new(
                IamErrorCode::Other("InvalidCredentials".to_string()),
                "Invalid account name or password.",
            )
            .into());
        }
        let keys = state.next_keys("ASIA");
        state
            .temp_keys
            .insert(keys.access_key_id.clone(), account_name.to_string());
        Ok(TempCredentials {
            access_key: keys.access_key_id,
            secret_key: keys.secret_key_id,
            session_token: Some(format!("token-{:04}", state.key_seq)),
        })
    }
}
