use super::error::{ServiceError, ServiceResult};
use super::validation;
use crate::common::{CredentialContext, IamUser};
use crate::gateway::{GatewayFactory, IamErrorCode, IamGateway};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub const USER_CREATED: &str = "User Created Successfully.";
pub const DEFAULT_USER_PATH: &str = "/";

/// Account login the user orchestrator exchanges for temporary credentials
#[derive(Clone)]
pub struct AccountLogin {
    pub account_name: String,
    pub password: String,
}

impl std::fmt::Debug for AccountLogin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountLogin")
            .field("account_name", &self.account_name)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedUser {
    pub user_name: String,
    pub user_id: Option<String>,
    pub arn: Option<String>,
    pub path: String,
    pub message: String,
}

impl From<IamUser> for CreatedUser {
    fn from(user: IamUser) -> Self {
        Self {
            user_name: user.user_name,
            user_id: user.user_id,
            arn: user.arn,
            path: user.path,
            message: USER_CREATED.to_string(),
        }
    }
}

/// IAM user lifecycle inside the configured account
pub struct UserService {
    factory: Arc<dyn GatewayFactory>,
    root: Box<dyn IamGateway>,
    login: AccountLogin,
}

impl UserService {
    pub fn new(
        factory: Arc<dyn GatewayFactory>,
        root_context: CredentialContext,
        login: AccountLogin,
    ) -> Self {
        let root = factory.scoped(root_context);
        Self {
            factory,
            root,
            login,
        }
    }

    /// Temporary credentials for the configured account
    async fn account_context(&self) -> ServiceResult<CredentialContext> {
        let creds = self
            .root
            .get_temp_credentials(&self.login.account_name, &self.login.password)
            .await
            .map_err(ServiceError::from)?;
        Ok(CredentialContext::caller(
            creds.access_key,
            creds.secret_key,
            creds.session_token,
        ))
    }

    /// Create a user and its login profile. A user whose profile could not
    /// be created is deleted again before the profile error is returned.
    #[instrument(skip(self, password), fields(account = %self.login.account_name))]
    pub async fn create_user(
        &self,
        user_name: &str,
        password: &str,
        path: Option<&str>,
        require_reset: bool,
    ) -> ServiceResult<CreatedUser> {
        let path = path.unwrap_or(DEFAULT_USER_PATH);
        validation::user_name(user_name)?;
        validation::password(password)?;
        validation::user_path(path)?;

        let client = self.factory.scoped(self.account_context().await?);

        debug!("Creating IAM user {}", user_name);
        let user = client
            .create_user(user_name, path)
            .await
            .map_err(ServiceError::from)?;

        debug!("Creating login profile for IAM user {}", user_name);
        if let Err(err) = client
            .create_user_login_profile(&user.user_name, password, require_reset)
            .await
        {
            let original = if err.is_remote(&IamErrorCode::NoSuchEntity) {
                ServiceError::user_not_found(&user.user_name)
            } else {
                ServiceError::from(err)
            };
            warn!(
                "Login profile creation failed for user {}: {}; removing the user",
                user_name, original
            );
            // A user that is already gone needs no cleanup
            let cleanup = match client.delete_user(&user.user_name).await {
                Err(err) if err.is_remote(&IamErrorCode::NoSuchEntity) => Ok(()),
                other => other,
            };
            return Err(original.after_rollback(cleanup));
        }

        info!("IAM user {} created", user_name);
        Ok(user.into())
    }
}
