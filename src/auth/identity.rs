use super::ExternalRecord;
use crate::config::FieldMapping;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

/// The only writes this crate makes to a local account.
pub trait IdentityUpdate: Send {
    fn set_real_name(&mut self, real_name: &str);
    fn set_email(&mut self, email: &str);
    fn set_email_authenticated(&mut self, at: DateTime<Utc>);
    fn save_settings(&mut self) -> Result<()>;
}

/// In-memory local account, used by the CLI and in tests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LocalIdentity {
    pub username: String,
    pub real_name: String,
    pub email: String,
    pub email_authenticated: Option<DateTime<Utc>>,
    /// Number of committed saves.
    pub saves: u32,
}

impl LocalIdentity {
    pub fn new(username: &str) -> Self {
        Self { username: username.to_string(), ..Self::default() }
    }
}

impl IdentityUpdate for LocalIdentity {
    fn set_real_name(&mut self, real_name: &str) {
        self.real_name = real_name.to_string();
    }

    fn set_email(&mut self, email: &str) {
        self.email = email.to_string();
    }

    fn set_email_authenticated(&mut self, at: DateTime<Utc>) {
        self.email_authenticated = Some(at);
    }

    fn save_settings(&mut self) -> Result<()> {
        self.saves += 1;
        Ok(())
    }
}

/// Copy name and email from the external record onto `identity` and commit.
pub fn reconcile(
    identity: &mut dyn IdentityUpdate,
    record: &ExternalRecord,
    mapping: &FieldMapping,
) -> Result<()> {
    reconcile_at(identity, record, mapping, Utc::now())
}

/// Same as [`reconcile`], with the email authentication time supplied.
///
/// Both columns are read before anything is written, so a mapping fault
/// leaves the identity untouched.
pub fn reconcile_at(
    identity: &mut dyn IdentityUpdate,
    record: &ExternalRecord,
    mapping: &FieldMapping,
    at: DateTime<Utc>,
) -> Result<()> {
    let real_name = record.text(&mapping.user_real_name)?;
    let email = record.text(&mapping.user_email)?;

    identity.set_real_name(real_name);
    identity.set_email(email);
    identity.set_email_authenticated(at);
    identity.save_settings()?;

    debug!("Reconciled local profile from external record");
    Ok(())
}
