use super::identity::reconcile;
use super::{
    AccountCreationType, AuthError, AuthResponse, AuthenticationRequest, ChangeStatus,
    CredentialStore, HashAlgorithm, IdentityUpdate, PrimaryAuthenticationProvider,
    SqlCredentialStore,
};
use crate::config::{Config, FieldMapping};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Primary provider that checks passwords against an external user table
/// and mirrors name and email onto the local account after a login.
///
/// It only ever passes or abstains. A wrong password abstains so later
/// providers can still try the same credentials.
pub struct ExternalDatabaseProvider {
    store: Arc<dyn CredentialStore>,
    fields: FieldMapping,
    hash: HashAlgorithm,
}

impl ExternalDatabaseProvider {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        fields: FieldMapping,
        hash: HashAlgorithm,
    ) -> Result<Self> {
        fields.validate()?;
        Ok(Self { store, fields, hash })
    }

    pub async fn from_config(config: &Config) -> Result<Self> {
        let store = SqlCredentialStore::connect(&config.database, &config.fields).await?;
        info!(
            "External database provider ready ({:?}, hash {})",
            config.database.backend, config.hash
        );
        Self::new(Arc::new(store), config.fields.clone(), config.hash)
    }
}

#[async_trait]
impl PrimaryAuthenticationProvider for ExternalDatabaseProvider {
    fn name(&self) -> &str {
        "external-database"
    }

    async fn begin_primary_authentication(
        &self,
        reqs: &[AuthenticationRequest],
    ) -> Result<AuthResponse> {
        let Some(req) = AuthenticationRequest::find_password(reqs) else {
            return Ok(AuthResponse::Abstain);
        };

        let (Some(username), Some(password)) = (&req.username, &req.password) else {
            return Ok(AuthResponse::Abstain);
        };

        let Some(record) = self.store.find_by_login(username).await? else {
            return Ok(AuthResponse::Abstain);
        };

        let stored = record.text(&self.fields.user_password)?;
        if self.hash.verify(password, stored) {
            debug!("Password accepted for '{}'", username);
            Ok(AuthResponse::pass(username, Some(record)))
        } else {
            debug!("Password mismatch for '{}'", username);
            Ok(AuthResponse::Abstain)
        }
    }

    fn post_authentication(
        &self,
        identity: &mut dyn IdentityUpdate,
        response: &AuthResponse,
    ) -> Result<()> {
        match response {
            AuthResponse::Pass { record: Some(record), .. } => {
                reconcile(identity, record, &self.fields)
            }
            AuthResponse::Pass { record: None, .. }
            | AuthResponse::Fail { .. }
            | AuthResponse::Abstain
            | AuthResponse::Ui { .. }
            | AuthResponse::Redirect { .. } => Ok(()),
        }
    }

    async fn test_user_exists(&self, _username: &str) -> Result<bool> {
        Err(AuthError::Unsupported { operation: "user existence testing" }.into())
    }

    fn provider_allows_authentication_data_change(
        &self,
        _req: &AuthenticationRequest,
        _check_data: bool,
    ) -> Result<ChangeStatus> {
        Ok(ChangeStatus::Ignored)
    }

    async fn provider_change_authentication_data(
        &self,
        _req: &AuthenticationRequest,
    ) -> Result<()> {
        Ok(())
    }

    fn account_creation_type(&self) -> AccountCreationType {
        AccountCreationType::None
    }

    async fn begin_primary_account_creation(
        &self,
        _username: &str,
        _creator: &str,
        _reqs: &[AuthenticationRequest],
    ) -> Result<AuthResponse> {
        Err(AuthError::Unsupported { operation: "account creation" }.into())
    }
}
