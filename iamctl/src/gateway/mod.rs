use crate::common::{
    AccessKeyPair, Account, AccountPage, CredentialContext, IamUser, LoginProfile, NewAccount,
    TempCredentials,
};
use async_trait::async_trait;

mod error;
mod http;
#[cfg(test)]
pub mod memory;
mod signing;
mod xml;

pub use error::{GatewayError, GatewayResult, IamError, IamErrorCode};
pub use http::HttpGatewayFactory;

/// Client for the storage platform's IAM API, bound to one credential context
#[async_trait]
pub trait IamGateway: Send + Sync {
    async fn create_account(&self, name: &str, email: &str) -> GatewayResult<NewAccount>;

    async fn get_account(&self, name: &str) -> GatewayResult<Account>;

    async fn list_accounts(
        &self,
        max_items: Option<u32>,
        marker: Option<&str>,
    ) -> GatewayResult<AccountPage>;

    async fn reset_account_access_key(&self, name: &str) -> GatewayResult<AccessKeyPair>;

    /// Scoped by the handle's own credentials
    async fn delete_account(&self, name: &str) -> GatewayResult<()>;

    async fn create_account_login_profile(
        &self,
        name: &str,
        password: &str,
    ) -> GatewayResult<LoginProfile>;

    async fn update_account_login_profile(
        &self,
        name: &str,
        password: &str,
    ) -> GatewayResult<LoginProfile>;

    async fn create_user(&self, name: &str, path: &str) -> GatewayResult<IamUser>;

    async fn delete_user(&self, name: &str) -> GatewayResult<()>;

    async fn create_user_login_profile(
        &self,
        name: &str,
        password: &str,
        require_reset: bool,
    ) -> GatewayResult<LoginProfile>;

    /// Exchange an account login for short-lived credentials
    async fn get_temp_credentials(
        &self,
        account_name: &str,
        password: &str,
    ) -> GatewayResult<TempCredentials>;
}

/// Builds gateway handles scoped to a credential context
pub trait GatewayFactory: Send + Sync {
    fn scoped(&self, context: CredentialContext) -> Box<dyn IamGateway>;
}
