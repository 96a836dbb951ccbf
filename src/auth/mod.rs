use anyhow::Result;
use async_trait::async_trait;
use std::fmt;

pub mod error;
pub mod external;
pub mod hash;
pub mod identity;
pub mod record;
pub mod sql;

pub use error::AuthError;
pub use external::ExternalDatabaseProvider;
pub use hash::HashAlgorithm;
pub use identity::{IdentityUpdate, LocalIdentity};
pub use record::ExternalRecord;
pub use sql::{CredentialStore, SqlCredentialStore};

/// Username and password as submitted on a login form. Either may be missing.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct PasswordRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl PasswordRequest {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
        }
    }
}

impl fmt::Debug for PasswordRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordRequest")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// One piece of input handed to the providers for a single attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticationRequest {
    Password(PasswordRequest),
    /// Any other kind of request (tokens, OAuth callbacks, ...).
    Other { kind: String },
}

impl AuthenticationRequest {
    /// First password request in `reqs`, if any.
    pub fn find_password(reqs: &[AuthenticationRequest]) -> Option<&PasswordRequest> {
        reqs.iter().find_map(|req| match req {
            AuthenticationRequest::Password(password) => Some(password),
            AuthenticationRequest::Other { .. } => None,
        })
    }
}

/// What a primary provider tells the chain.
///
/// `Abstain` lets the next provider try. Every other variant ends the walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthResponse {
    /// The user is authenticated. `record` is the provider's per-attempt
    /// state, handed back to it for post-authentication.
    Pass {
        username: String,
        record: Option<ExternalRecord>,
    },
    Fail { message: String },
    Abstain,
    /// More input is needed from the user before a decision can be made.
    Ui { message: String },
    Redirect { target: String },
}

impl AuthResponse {
    pub fn pass(username: &str, record: Option<ExternalRecord>) -> Self {
        AuthResponse::Pass { username: username.to_string(), record }
    }

    pub fn is_abstain(&self) -> bool {
        matches!(self, AuthResponse::Abstain)
    }
}

impl fmt::Display for AuthResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthResponse::Pass { username, .. } => write!(f, "PASS {}", username),
            AuthResponse::Fail { message } => write!(f, "FAIL {}", message),
            AuthResponse::Abstain => write!(f, "ABSTAIN"),
            AuthResponse::Ui { message } => write!(f, "UI {}", message),
            AuthResponse::Redirect { target } => write!(f, "REDIRECT {}", target),
        }
    }
}

/// Answer to "may this credential change go ahead?".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeStatus {
    Allowed,
    /// Allowed, but this provider will not act on it.
    Ignored,
    Denied { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountCreationType {
    Create,
    Link,
    None,
}

#[async_trait]
pub trait PrimaryAuthenticationProvider: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Decide on a login attempt.
    /// Returns Err only for faults that must not be mistaken for an outcome.
    async fn begin_primary_authentication(
        &self,
        reqs: &[AuthenticationRequest],
    ) -> Result<AuthResponse>;

    /// Runs after the chain has settled, once the local identity exists.
    fn post_authentication(
        &self,
        identity: &mut dyn IdentityUpdate,
        response: &AuthResponse,
    ) -> Result<()>;

    async fn test_user_exists(&self, username: &str) -> Result<bool>;

    fn provider_allows_authentication_data_change(
        &self,
        req: &AuthenticationRequest,
        check_data: bool,
    ) -> Result<ChangeStatus>;

    async fn provider_change_authentication_data(&self, req: &AuthenticationRequest) -> Result<()>;

    fn account_creation_type(&self) -> AccountCreationType;

    async fn begin_primary_account_creation(
        &self,
        username: &str,
        creator: &str,
        reqs: &[AuthenticationRequest],
    ) -> Result<AuthResponse>;
}
