use clap::{Args, Parser, Subcommand};

#[derive(Subcommand, Debug, Clone)]
pub enum AccountCommand {
    /// Create an account and its login profile
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "IAMCTL_ACCOUNT_PASSWORD")]
        password: String,
    },
    /// Show one account
    Get {
        #[arg(long)]
        name: String,
    },
    /// List accounts visible to the session
    List {
        /// Marker returned as `continue` by a previous page
        #[arg(long)]
        marker: Option<String>,
        /// Maximum number of accounts per page
        #[arg(long)]
        limit: Option<u32>,
        /// Return every account regardless of the session
        #[arg(long)]
        all: bool,
    },
    /// Reset the access key and/or set the password
    Patch {
        #[arg(long)]
        name: String,
        /// New password; never read from the environment
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        reset_access_key: bool,
    },
    /// Delete an account with the session's own credentials
    Delete {
        #[arg(long)]
        name: String,
    },
}

impl AccountCommand {
    /// Whether the command calls the endpoint with root credentials
    pub fn needs_root(&self) -> bool {
        match self {
            Self::Create { .. } | Self::Get { .. } | Self::List { .. } => true,
            Self::Patch {
                reset_access_key, ..
            } => *reset_access_key,
            Self::Delete { .. } => false,
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum UserCommand {
    /// Create an IAM user and its login profile
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, env = "IAMCTL_USER_PASSWORD")]
        password: String,
        #[arg(long, default_value = "/")]
        path: String,
        /// Force a password change on first login
        #[arg(long)]
        require_reset: bool,
    },
}

/// Credentials of the tenant the command runs as; absent means operator
#[derive(Args, Debug, Clone, Default)]
pub struct TenantArgs {
    /// Account name the session is scoped to
    #[arg(long, env = "IAMCTL_TENANT_USER", global = true)]
    pub tenant_user: Option<String>,

    #[arg(long, env = "IAMCTL_TENANT_ACCESS_KEY", global = true)]
    pub tenant_access_key: Option<String>,

    #[arg(long, env = "IAMCTL_TENANT_SECRET_KEY", global = true, hide_env_values = true)]
    pub tenant_secret_key: Option<String>,

    #[arg(long, env = "IAMCTL_TENANT_SESSION_TOKEN", global = true, hide_env_values = true)]
    pub tenant_session_token: Option<String>,
}

/// Connection overrides applied on top of the config file
#[derive(Args, Debug, Clone, Default)]
pub struct EndpointArgs {
    /// IAM endpoint host
    #[arg(long, env = "IAMCTL_HOST", global = true)]
    pub host: Option<String>,

    /// IAM endpoint port
    #[arg(long, env = "IAMCTL_PORT", global = true)]
    pub port: Option<u16>,

    /// Root access key
    #[arg(long, env = "IAMCTL_ROOT_ACCESS_KEY", global = true)]
    pub root_access_key: Option<String>,

    /// Root secret key
    #[arg(long, env = "IAMCTL_ROOT_SECRET_KEY", global = true, hide_env_values = true)]
    pub root_secret_key: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct AccountArgs {
    #[command(subcommand)]
    pub command: AccountCommand,
}

#[derive(Parser, Debug, Clone)]
pub struct UserArgs {
    #[command(subcommand)]
    pub command: UserCommand,
}
