use super::AuthError;
use std::collections::BTreeMap;
use std::fmt;

/// One row fetched from the external user table, keyed by column name.
///
/// Lives only for a single authentication attempt. It holds the stored
/// credential digest, so `Debug` shows column names and never values.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ExternalRecord {
    columns: BTreeMap<String, Option<String>>,
}

impl ExternalRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, value: impl Into<String>) -> Self {
        self.insert(column, Some(value.into()));
        self
    }

    pub fn insert(&mut self, column: &str, value: Option<String>) {
        self.columns.insert(column.to_string(), value);
    }

    /// Value of `column`, with SQL NULL read as the empty string.
    pub fn text(&self, column: &str) -> Result<&str, AuthError> {
        match self.columns.get(column) {
            Some(value) => Ok(value.as_deref().unwrap_or("")),
            None => Err(AuthError::MissingColumn { column: column.to_string() }),
        }
    }
}

impl FromIterator<(String, Option<String>)> for ExternalRecord {
    fn from_iter<I: IntoIterator<Item = (String, Option<String>)>>(iter: I) -> Self {
        Self { columns: iter.into_iter().collect() }
    }
}

impl fmt::Debug for ExternalRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalRecord")
            .field("columns", &self.columns.keys().collect::<Vec<_>>())
            .finish()
    }
}
