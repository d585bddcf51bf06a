use aws_credential_types::Credentials;
use std::fmt;

const ROOT_PROVIDER: &str = "iamctl-root";
const CALLER_PROVIDER: &str = "iamctl-caller";

/// Whose authority a context carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextScope {
    /// Trusted orchestrator identity, never handed back to callers
    Root,
    /// An account or user acting on its own resources
    Caller,
}

/// Immutable access key / secret key / session token bundle used to scope
/// a gateway handle to one identity.
#[derive(Clone)]
pub struct CredentialContext {
    credentials: Credentials,
    scope: ContextScope,
}

impl CredentialContext {
    pub fn root(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            credentials: Credentials::new(
                access_key,
                secret_key,
                None,
                None,
                ROOT_PROVIDER,
            ),
            scope: ContextScope::Root,
        }
    }

    pub fn caller(
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            credentials: Credentials::new(
                access_key,
                secret_key,
                session_token,
                None,
                CALLER_PROVIDER,
            ),
            scope: ContextScope::Caller,
        }
    }

    /// Root context from credentials resolved by the AWS default chain
    pub fn root_from(credentials: &Credentials) -> Self {
        Self::root(
            credentials.access_key_id(),
            credentials.secret_access_key(),
        )
    }

    pub fn access_key(&self) -> &str {
        self.credentials.access_key_id()
    }

    pub fn secret_key(&self) -> &str {
        self.credentials.secret_access_key()
    }

    pub fn session_token(&self) -> Option<&str> {
        self.credentials.session_token()
    }

    pub fn scope(&self) -> ContextScope {
        self.scope
    }
}

impl fmt::Debug for CredentialContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialContext")
            .field("access_key", &self.access_key())
            .field("secret_key", &"** redacted **")
            .field(
                "session_token",
                &self.session_token().map(|_| "** redacted **"),
            )
            .field("scope", &self.scope)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_and_caller_scopes() {
        let root = CredentialContext::root("AKROOT", "root-secret");
        assert_eq!(root.scope(), ContextScope::Root);
        assert_eq!(root.session_token(), None);

        let caller = CredentialContext::caller("AKCALLER", "caller-secret", Some("tok".into()));
        assert_eq!(caller.scope(), ContextScope::Caller);
        assert_eq!(caller.access_key(), "AKCALLER");
        assert_eq!(caller.secret_key(), "caller-secret");
        assert_eq!(caller.session_token(), Some("tok"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let ctx = CredentialContext::caller("AKCALLER", "caller-secret", Some("tok-123".into()));
        let rendered = format!("{:?}", ctx);
        assert!(rendered.contains("AKCALLER"));
        assert!(!rendered.contains("caller-secret"));
        assert!(!rendered.contains("tok-123"));
    }
}
