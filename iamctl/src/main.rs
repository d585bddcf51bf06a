use anyhow::{anyhow, Result};
use aws_credential_types::provider::ProvideCredentials;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error, info, Level};

mod commands;
mod common;
mod gateway;
mod service;

use commands::{AccountArgs, AccountCommand, EndpointArgs, TenantArgs, UserArgs, UserCommand};
use common::config::{IamConfig, RootCredentialsConfig};
use common::{CredentialContext, Session};
use gateway::{GatewayFactory, HttpGatewayFactory};
use service::{AccountLogin, AccountService, ServiceResult, UserService};

#[derive(Parser)]
#[command(
    name = "iamctl",
    about = "Account and IAM user management for S3-compatible object storage",
    version = env!("CARGO_PKG_VERSION"),
    author = "ktruck"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the YAML configuration file
    #[arg(short, long, global = true, env = "IAMCTL_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(flatten)]
    endpoint: EndpointArgs,

    #[command(flatten)]
    tenant: TenantArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage storage accounts
    Account(AccountArgs),
    /// Manage IAM users of the service account
    User(UserArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => IamConfig::from_file(path)?,
        None => IamConfig::default(),
    };
    apply_overrides(&mut config, &cli.endpoint);

    // Initialize logging; stdout is reserved for command output
    let log_level = if cli.verbose {
        "debug".to_string()
    } else {
        cli.log_level
            .clone()
            .unwrap_or_else(|| config.logging.level.clone())
    };
    let level = Level::from_str(&log_level).map_err(|_| anyhow!("invalid log level {}", log_level))?;
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    info!("IAM endpoint: {}", config.endpoint.base_url());
    let factory: Arc<dyn GatewayFactory> = Arc::new(HttpGatewayFactory::new(&config));

    match cli.command {
        Commands::Account(args) => {
            let session = session_from(&cli.tenant)?;
            debug!("Running as {}", session.principal());
            let root = if args.command.needs_root() {
                Some(root_context(&config).await?)
            } else {
                None
            };
            let accounts = AccountService::new(factory, root);
            match args.command {
                AccountCommand::Create {
                    name,
                    email,
                    password,
                } => emit(accounts.create_account(&name, &email, &password).await),
                AccountCommand::Get { name } => emit(accounts.get_account(&name).await),
                AccountCommand::List { marker, limit, all } => emit(
                    accounts
                        .list_accounts(&session, marker.as_deref(), limit, all)
                        .await,
                ),
                AccountCommand::Patch {
                    name,
                    password,
                    reset_access_key,
                } => emit(
                    accounts
                        .patch_account(&session, &name, password.as_deref(), reset_access_key)
                        .await,
                ),
                AccountCommand::Delete { name } => {
                    emit(accounts.delete_account(&session, &name).await)
                }
            }
        }
        Commands::User(args) => {
            let login = config
                .service_account
                .as_ref()
                .map(|sa| AccountLogin {
                    account_name: sa.account_name.clone(),
                    password: sa.password.clone(),
                })
                .ok_or_else(|| anyhow!("user commands need `service_account` in the config"))?;
            let users = UserService::new(factory, root_context(&config).await?, login);
            match args.command {
                UserCommand::Create {
                    name,
                    password,
                    path,
                    require_reset,
                } => emit(
                    users
                        .create_user(&name, &password, Some(&path), require_reset)
                        .await,
                ),
            }
        }
    }
}

fn apply_overrides(config: &mut IamConfig, args: &EndpointArgs) {
    if let Some(host) = &args.host {
        config.endpoint.host = host.clone();
    }
    if let Some(port) = args.port {
        config.endpoint.port = port;
    }
    if let (Some(access_key), Some(secret_key)) = (&args.root_access_key, &args.root_secret_key) {
        config.root = Some(RootCredentialsConfig {
            access_key: access_key.clone(),
            secret_key: secret_key.clone(),
        });
    }
}

/// Root keys from the config, falling back to the default AWS credential chain
async fn root_context(config: &IamConfig) -> Result<CredentialContext> {
    if let Some(root) = &config.root {
        return Ok(CredentialContext::root(
            root.access_key.clone(),
            root.secret_key.clone(),
        ));
    }

    debug!("No root credentials configured, using the default credential chain");
    let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .load()
        .await;
    let creds = sdk_config
        .credentials_provider()
        .ok_or_else(|| anyhow!("No root credentials configured and no AWS credentials provider available"))?
        .provide_credentials()
        .await?;
    Ok(CredentialContext::root_from(&creds))
}

fn session_from(args: &TenantArgs) -> Result<Session> {
    let Some(user) = &args.tenant_user else {
        return Ok(Session::operator());
    };
    let access_key = args
        .tenant_access_key
        .clone()
        .ok_or_else(|| anyhow!("--tenant-access-key is required with --tenant-user"))?;
    let secret_key = args
        .tenant_secret_key
        .clone()
        .ok_or_else(|| anyhow!("--tenant-secret-key is required with --tenant-user"))?;
    Ok(Session::tenant(
        user.clone(),
        access_key,
        secret_key,
        args.tenant_session_token.clone(),
    ))
}

/// Print a result as JSON; failures go to stderr with a non-zero exit
fn emit<T: Serialize>(outcome: ServiceResult<T>) -> Result<()> {
    match outcome {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        Err(err) => {
            error!("{}", err);
            eprintln!("{}", serde_json::to_string_pretty(&err.to_body())?);
            std::process::exit(1);
        }
    }
}
