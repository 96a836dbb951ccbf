use super::ExternalRecord;
use crate::config::{DatabaseBackend, DatabaseConfig, FieldMapping};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlRow};
use sqlx::postgres::{PgConnectOptions, PgPool, PgRow};
use sqlx::{Column, Row};
use tracing::debug;

/// Looks up the external record for a login name.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// At most one record. Errors are infrastructure faults, not misses.
    async fn find_by_login(&self, login: &str) -> Result<Option<ExternalRecord>>;
}

pub enum DatabasePool {
    MySql(MySqlPool),
    Postgres(PgPool),
}

pub struct SqlCredentialStore {
    pool: DatabasePool,
    query: String,
}

impl SqlCredentialStore {
    pub async fn connect(database: &DatabaseConfig, fields: &FieldMapping) -> Result<Self> {
        let pool = match database.backend {
            DatabaseBackend::MySql => {
                let mut options = MySqlConnectOptions::new()
                    .host(&database.host)
                    .username(&database.user)
                    .password(&database.password)
                    .database(&database.database);
                if let Some(port) = database.port {
                    options = options.port(port);
                }
                let pool = MySqlPool::connect_with(options)
                    .await
                    .map_err(|e| anyhow!("Failed to connect to MySQL database: {}", e))?;
                DatabasePool::MySql(pool)
            }
            DatabaseBackend::Postgres => {
                let mut options = PgConnectOptions::new()
                    .host(&database.host)
                    .username(&database.user)
                    .password(&database.password)
                    .database(&database.database);
                if let Some(port) = database.port {
                    options = options.port(port);
                }
                let pool = PgPool::connect_with(options)
                    .await
                    .map_err(|e| anyhow!("Failed to connect to Postgres database: {}", e))?;
                DatabasePool::Postgres(pool)
            }
        };

        Ok(Self {
            query: lookup_query(database.backend, &database.table_prefix, fields),
            pool,
        })
    }
}

/// `SELECT *` on the user table, filtered by the login column.
///
/// Identifiers come from validated configuration; the login is always bound.
pub fn lookup_query(
    backend: DatabaseBackend,
    table_prefix: &str,
    fields: &FieldMapping,
) -> String {
    let table = format!("{}{}", table_prefix, fields.table);
    match backend {
        DatabaseBackend::MySql => format!(
            "SELECT * FROM `{}` WHERE `{}` = ? LIMIT 1",
            table, fields.user_login
        ),
        DatabaseBackend::Postgres => format!(
            "SELECT * FROM \"{}\" WHERE \"{}\" = $1 LIMIT 1",
            table, fields.user_login
        ),
    }
}

#[async_trait]
impl CredentialStore for SqlCredentialStore {
    async fn find_by_login(&self, login: &str) -> Result<Option<ExternalRecord>> {
        let record = match &self.pool {
            DatabasePool::MySql(pool) => sqlx::query(&self.query)
                .bind(login)
                .fetch_optional(pool)
                .await
                .context("External user lookup failed")?
                .map(|row| mysql_record(&row)),
            DatabasePool::Postgres(pool) => sqlx::query(&self.query)
                .bind(login)
                .fetch_optional(pool)
                .await
                .context("External user lookup failed")?
                .map(|row| pg_record(&row)),
        };

        if record.is_none() {
            debug!("User '{}' not found in external database", login);
        }
        Ok(record)
    }
}

/// One way of reading a column. `None` means this type cannot decode it,
/// `Some(None)` is a decoded SQL NULL.
type DecodeAttempt<'a> = Box<dyn FnOnce() -> Option<Option<String>> + 'a>;

/// Runs attempts in order and stops at the first that decodes.
fn first_decoded<'a>(attempts: impl IntoIterator<Item = DecodeAttempt<'a>>) -> Option<String> {
    attempts.into_iter().find_map(|attempt| attempt()).flatten()
}

/// Renders a column as text using the first listed type that decodes it,
/// falling back to raw bytes. SQL NULL, and columns nothing can read, come
/// back as `None`.
macro_rules! first_decodable {
    ($row:expr, $index:expr, [$($ty:ty),+ $(,)?]) => {
        first_decoded([
            $(Box::new(|| {
                $row.try_get::<Option<$ty>, _>($index)
                    .ok()
                    .map(|value| value.map(|v| v.to_string()))
            }) as DecodeAttempt<'_>,)+
            Box::new(|| {
                $row.try_get::<Option<Vec<u8>>, _>($index)
                    .ok()
                    .map(|value| value.map(|v| String::from_utf8_lossy(&v).into_owned()))
            }) as DecodeAttempt<'_>,
        ])
    };
}

fn mysql_record(row: &MySqlRow) -> ExternalRecord {
    row.columns()
        .iter()
        .map(|column| {
            let index = column.ordinal();
            let value = first_decodable!(row, index, [
                String,
                i64,
                u64,
                f64,
                f32,
                chrono::NaiveDateTime,
                chrono::DateTime<chrono::Utc>,
                chrono::NaiveDate,
            ]);
            (column.name().to_string(), value)
        })
        .collect()
}

fn pg_record(row: &PgRow) -> ExternalRecord {
    row.columns()
        .iter()
        .map(|column| {
            let index = column.ordinal();
            let value = first_decodable!(row, index, [
                String,
                i64,
                i32,
                i16,
                f64,
                f32,
                bool,
                chrono::NaiveDateTime,
                chrono::DateTime<chrono::Utc>,
                chrono::NaiveDate,
            ]);
            (column.name().to_string(), value)
        })
        .collect()
}
