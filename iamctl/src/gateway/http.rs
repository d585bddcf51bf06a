use super::error::{GatewayError, GatewayResult, IamError, IamErrorCode};
use super::{signing, xml, GatewayFactory, IamGateway};
use crate::common::config::{EndpointConfig, IamConfig, RetryConfig};
use crate::common::{
    AccessKeyPair, Account, AccountPage, CredentialContext, IamUser, LoginProfile, NewAccount,
    TempCredentials,
};
use async_trait::async_trait;
use chrono::Utc;
use hyper::client::HttpConnector;
use hyper::{Body, Client, Method, Request, Uri};
use hyper_tls::HttpsConnector;
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;
use tokio::time::{sleep, timeout};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

const API_VERSION: &str = "2010-05-08";

type HttpClient = Client<HttpsConnector<HttpConnector>>;

/// Builds `HttpIamGateway` handles sharing one connection pool
#[derive(Clone)]
pub struct HttpGatewayFactory {
    http_client: HttpClient,
    endpoint: Arc<EndpointConfig>,
    retry: Arc<RetryConfig>,
}

impl HttpGatewayFactory {
    pub fn new(config: &IamConfig) -> Self {
        let https = HttpsConnector::new();
        let http_client = Client::builder().build::<_, Body>(https);
        Self {
            http_client,
            endpoint: Arc::new(config.endpoint.clone()),
            retry: Arc::new(config.retry.clone()),
        }
    }
}

impl GatewayFactory for HttpGatewayFactory {
    fn scoped(&self, context: CredentialContext) -> Box<dyn IamGateway> {
        Box::new(HttpIamGateway {
            http_client: self.http_client.clone(),
            endpoint: self.endpoint.clone(),
            retry: self.retry.clone(),
            context,
        })
    }
}

/// IAM Query API client signing every call with its own context
pub struct HttpIamGateway {
    http_client: HttpClient,
    endpoint: Arc<EndpointConfig>,
    retry: Arc<RetryConfig>,
    context: CredentialContext,
}

/// Actions the endpoint can safely receive twice
const REPEATABLE_ACTIONS: &[&str] = &["ListAccounts", "GetTempAuthCredentials"];

/// A failed attempt, split by whether the request may have reached the endpoint
enum AttemptError {
    /// No connection was established; nothing was sent
    NotSent(GatewayError),
    /// The request went out; the endpoint may have acted on it
    Sent(GatewayError),
}

impl AttemptError {
    fn retryable(&self, repeatable: bool) -> bool {
        match self {
            Self::NotSent(GatewayError::Transport { .. }) => true,
            Self::Sent(GatewayError::Transport { .. }) => repeatable,
            _ => false,
        }
    }

    fn into_inner(self) -> GatewayError {
        match self {
            Self::NotSent(err) | Self::Sent(err) => err,
        }
    }
}

impl HttpIamGateway {
    /// Issue one action, retrying transport faults per the retry policy.
    /// IAM error documents are returned as-is and never retried. Actions that
    /// change state are only re-sent when the previous attempt never connected.
    #[instrument(skip(self, params), fields(request_id = %Uuid::new_v4(), access_key = %self.context.access_key(), scope = ?self.context.scope()))]
    async fn call(&self, action: &str, params: Vec<(&str, String)>) -> GatewayResult<String> {
        let mut form: Vec<(String, String)> = vec![
            ("Action".to_string(), action.to_string()),
            ("Version".to_string(), API_VERSION.to_string()),
        ];
        form.extend(params.into_iter().map(|(k, v)| (k.to_string(), v)));
        let body = signing::form_body(&form);

        let repeatable = REPEATABLE_ACTIONS.contains(&action);
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.send_once(&body).await {
                Ok(doc) => return Ok(doc),
                Err(err) if attempt < max_attempts && err.retryable(repeatable) => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        "{} attempt {}/{} failed: {}; retrying in {:?}",
                        action,
                        attempt,
                        max_attempts,
                        err.into_inner(),
                        delay
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err.into_inner()),
            }
        }
    }

    async fn send_once(&self, body: &str) -> Result<String, AttemptError> {
        let host = self.endpoint.authority();
        let signed = signing::sign_post(
            &self.context,
            &self.endpoint.region,
            &host,
            body,
            Utc::now(),
        )
        .map_err(AttemptError::NotSent)?;

        let uri = Uri::from_str(&self.endpoint.base_url()).map_err(|e| {
            AttemptError::NotSent(GatewayError::protocol(format!(
                "invalid IAM endpoint: {}",
                e
            )))
        })?;
        let mut request_builder = Request::builder().method(Method::POST).uri(uri);
        for (name, value) in &signed.headers {
            request_builder = request_builder.header(name.as_str(), value.as_str());
        }
        let request = request_builder
            .body(Body::from(body.to_string()))
            .map_err(|e| {
                AttemptError::NotSent(GatewayError::protocol(format!(
                    "failed to build request: {}",
                    e
                )))
            })?;

        let response = match timeout(self.endpoint.timeout(), self.http_client.request(request)).await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) if e.is_connect() => {
                return Err(AttemptError::NotSent(GatewayError::transport(e.to_string())))
            }
            Ok(Err(e)) => return Err(AttemptError::Sent(GatewayError::transport(e.to_string()))),
            Err(_) => {
                return Err(AttemptError::Sent(GatewayError::transport(format!(
                    "no response within {}s",
                    self.endpoint.request_timeout
                ))))
            }
        };

        let status = response.status();
        let bytes = hyper::body::to_bytes(response.into_body())
            .await
            .map_err(|e| AttemptError::Sent(GatewayError::transport(e.to_string())))?;
        let text = String::from_utf8_lossy(&bytes).to_string();

        if status.is_success() {
            debug!("IAM call succeeded with status {}", status);
            return Ok(text);
        }
        if let Some(err) = xml::error(&text) {
            debug!("IAM call returned {}: {}", status, err);
            return Err(AttemptError::Sent(GatewayError::Remote(err)));
        }
        // A bare 5xx usually comes from a proxy in front of the endpoint
        let err = if status.is_server_error() {
            GatewayError::transport(format!("IAM endpoint returned {}", status))
        } else {
            GatewayError::protocol(format!(
                "IAM endpoint returned {} without an error document",
                status
            ))
        };
        Err(AttemptError::Sent(err))
    }
}

fn required(xml: &str, tag: &str) -> GatewayResult<String> {
    xml::field(xml, tag)
        .ok_or_else(|| GatewayError::protocol(format!("response is missing <{}>", tag)))
}

/// The endpoint names the secret differently depending on the action
fn secret_of(xml: &str) -> GatewayResult<String> {
    ["SecretKey", "RootSecretKeyId", "SecretAccessKey"]
        .iter()
        .find_map(|tag| xml::field(xml, tag))
        .ok_or_else(|| GatewayError::protocol("response is missing the secret key"))
}

fn account_from(member: &str) -> GatewayResult<Account> {
    Ok(Account {
        account_name: required(member, "AccountName")?,
        account_email: xml::field(member, "Email").unwrap_or_default(),
        account_id: xml::field(member, "AccountId"),
        canonical_id: xml::field(member, "CanonicalId"),
    })
}

fn profile_from(doc: &str, name: &str) -> LoginProfile {
    LoginProfile {
        name: xml::field(doc, "AccountName")
            .or_else(|| xml::field(doc, "UserName"))
            .unwrap_or_else(|| name.to_string()),
        password_reset_required: xml::flag(doc, "PasswordResetRequired"),
    }
}

#[async_trait]
impl IamGateway for HttpIamGateway {
    async fn create_account(&self, name: &str, email: &str) -> GatewayResult<NewAccount> {
        let doc = self
            .call(
                "CreateAccount",
                vec![("AccountName", name.to_string()), ("Email", email.to_string())],
            )
            .await?;
        let mut account = account_from(&doc)?;
        if account.account_email.is_empty() {
            account.account_email = email.to_string();
        }
        let keys = AccessKeyPair {
            access_key_id: required(&doc, "AccessKeyId")?,
            secret_key_id: secret_of(&doc)?,
        };
        Ok(NewAccount { account, keys })
    }

    async fn get_account(&self, name: &str) -> GatewayResult<Account> {
        // No single-account read exists, so walk the listing
        let mut marker: Option<String> = None;
        let mut seen: HashSet<String> = HashSet::new();
        loop {
            let page = self.list_accounts(None, marker.as_deref()).await?;
            let mut advanced = false;
            for account in page.iam_accounts {
                if account.account_name == name {
                    return Ok(account);
                }
                advanced |= seen.insert(account.account_name);
            }
            match page.marker {
                Some(next) if page.is_truncated => {
                    // Endpoints that ignore Marker hand back the same page forever
                    if !advanced || marker.as_deref() == Some(next.as_str()) {
                        return Err(GatewayError::protocol(format!(
                            "ListAccounts did not advance past marker {}",
                            next
                        )));
                    }
                    marker = Some(next);
                }
                _ => break,
            }
        }
        Err(IamError::new(
            IamErrorCode::NoSuchEntity,
            format!("The account {} does not exist.", name),
        )
        .into())
    }

    async fn list_accounts(
        &self,
        max_items: Option<u32>,
        marker: Option<&str>,
    ) -> GatewayResult<AccountPage> {
        let mut params = Vec::new();
        if let Some(max_items) = max_items {
            params.push(("MaxItems", max_items.to_string()));
        }
        if let Some(marker) = marker {
            params.push(("Marker", marker.to_string()));
        }
        let doc = self.call("ListAccounts", params).await?;
        let iam_accounts = xml::blocks(&doc, "member")
            .into_iter()
            .map(account_from)
            .collect::<GatewayResult<Vec<_>>>()?;
        Ok(AccountPage {
            iam_accounts,
            is_truncated: xml::flag(&doc, "IsTruncated"),
            marker: xml::field(&doc, "Marker").filter(|m| !m.is_empty()),
        })
    }

    async fn reset_account_access_key(&self, name: &str) -> GatewayResult<AccessKeyPair> {
        let doc = self
            .call("ResetAccountAccessKey", vec![("AccountName", name.to_string())])
            .await?;
        Ok(AccessKeyPair {
            access_key_id: required(&doc, "AccessKeyId")?,
            secret_key_id: secret_of(&doc)?,
        })
    }

    async fn delete_account(&self, name: &str) -> GatewayResult<()> {
        self.call("DeleteAccount", vec![("AccountName", name.to_string())])
            .await?;
        Ok(())
    }

    async fn create_account_login_profile(
        &self,
        name: &str,
        password: &str,
    ) -> GatewayResult<LoginProfile> {
        let doc = self
            .call(
                "CreateAccountLoginProfile",
                vec![
                    ("AccountName", name.to_string()),
                    ("Password", password.to_string()),
                    ("PasswordResetRequired", "false".to_string()),
                ],
            )
            .await?;
        Ok(profile_from(&doc, name))
    }

    async fn update_account_login_profile(
        &self,
        name: &str,
        password: &str,
    ) -> GatewayResult<LoginProfile> {
        let doc = self
            .call(
                "UpdateAccountLoginProfile",
                vec![
                    ("AccountName", name.to_string()),
                    ("Password", password.to_string()),
                    ("PasswordResetRequired", "false".to_string()),
                ],
            )
            .await?;
        Ok(profile_from(&doc, name))
    }

    async fn create_user(&self, name: &str, path: &str) -> GatewayResult<IamUser> {
        let doc = self
            .call(
                "CreateUser",
                vec![("UserName", name.to_string()), ("Path", path.to_string())],
            )
            .await?;
        Ok(IamUser {
            user_name: xml::field(&doc, "UserName").unwrap_or_else(|| name.to_string()),
            user_id: xml::field(&doc, "UserId"),
            arn: xml::field(&doc, "Arn"),
            path: xml::field(&doc, "Path").unwrap_or_else(|| path.to_string()),
        })
    }

    async fn delete_user(&self, name: &str) -> GatewayResult<()> {
        self.call("DeleteUser", vec![("UserName", name.to_string())])
            .await?;
        Ok(())
    }

    async fn create_user_login_profile(
        &self,
        name: &str,
        password: &str,
        require_reset: bool,
    ) -> GatewayResult<LoginProfile> {
        let doc = self
            .call(
                "CreateLoginProfile",
                vec![
                    ("UserName", name.to_string()),
                    ("Password", password.to_string()),
                    ("PasswordResetRequired", require_reset.to_string()),
                ],
            )
            .await?;
        Ok(profile_from(&doc, name))
    }

    async fn get_temp_credentials(
        &self,
        account_name: &str,
        password: &str,
    ) -> GatewayResult<TempCredentials> {
        let doc = self
            .call(
                "GetTempAuthCredentials",
                vec![
                    ("AccountName", account_name.to_string()),
                    ("Password", password.to_string()),
                ],
            )
            .await?;
        Ok(TempCredentials {
            access_key: required(&doc, "AccessKeyId")?,
            secret_key: secret_of(&doc)?,
            session_token: xml::field(&doc, "SessionToken"),
        })
    }
}
