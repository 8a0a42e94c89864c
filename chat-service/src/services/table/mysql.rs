//! MySQL-backed table source.

use super::{DataSourceError, TableSource};
use crate::config::DatabaseConfig;
use crate::models::{ColumnDescriptor, SampleRow, TableContext};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use secrecy::ExposeSecret;
use serde_json::{Number, Value};
use sqlx::mysql::types::MySqlTime;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{Column, Connection, Row, TypeInfo, ValueRef};
use tracing::{debug, info, instrument, warn};

/// Columns of the target table in declaration order. Text columns are cast
/// so they decode as strings on servers that report them as binary.
const DESCRIBE_SQL: &str = r#"
    SELECT CAST(COLUMN_NAME AS CHAR) AS name,
           CAST(COLUMN_TYPE AS CHAR) AS column_type,
           CAST(IS_NULLABLE AS CHAR) AS is_nullable,
           CAST(COLUMN_KEY AS CHAR) AS column_key,
           CAST(COLUMN_DEFAULT AS CHAR) AS column_default,
           CAST(EXTRA AS CHAR) AS extra
    FROM information_schema.COLUMNS
    WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?
    ORDER BY ORDINAL_POSITION
"#;

#[derive(Debug, sqlx::FromRow)]
struct ColumnRow {
    name: String,
    column_type: String,
    is_nullable: String,
    column_key: Option<String>,
    column_default: Option<String>,
    extra: Option<String>,
}

impl From<ColumnRow> for ColumnDescriptor {
    fn from(row: ColumnRow) -> Self {
        ColumnDescriptor {
            name: row.name,
            column_type: row.column_type,
            nullable: row.is_nullable.eq_ignore_ascii_case("YES"),
            key: row.column_key.unwrap_or_default(),
            default: row.column_default,
            extra: row.extra.unwrap_or_default(),
        }
    }
}

/// Reads schema and sample rows from a MySQL table.
///
/// Every call opens its own connection and closes it before returning. A
/// failed connect is reported as is, without a second attempt.
#[derive(Clone)]
pub struct MySqlTableSource {
    options: MySqlConnectOptions,
    table: String,
    sample_limit: u32,
}

impl MySqlTableSource {
    #[instrument(skip(config), fields(host = %config.host, database = %config.name, table = %config.table))]
    pub fn new(config: &DatabaseConfig) -> Self {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(config.password.expose_secret())
            .database(&config.name);

        info!("MySQL table source configured");

        Self::with_options(options, config.table.clone(), config.sample_limit)
    }

    pub fn with_options(options: MySqlConnectOptions, table: String, sample_limit: u32) -> Self {
        Self {
            options,
            table,
            sample_limit,
        }
    }

    async fn connect(&self) -> Result<MySqlConnection, DataSourceError> {
        MySqlConnection::connect_with(&self.options)
            .await
            .map_err(DataSourceError::Connection)
    }

    async fn read_context(&self, conn: &mut MySqlConnection) -> Result<TableContext, DataSourceError> {
        let columns: Vec<ColumnDescriptor> = sqlx::query_as::<_, ColumnRow>(DESCRIBE_SQL)
            .bind(&self.table)
            .fetch_all(&mut *conn)
            .await
            .map_err(|source| DataSourceError::Describe {
                table: self.table.clone(),
                source,
            })?
            .into_iter()
            .map(ColumnDescriptor::from)
            .collect();

        if columns.is_empty() {
            return Err(DataSourceError::TableNotFound(self.table.clone()));
        }

        // Table name is validated as a plain identifier when configuration loads.
        let sample_sql = format!("SELECT * FROM `{}` LIMIT ?", self.table);
        let rows: Vec<SampleRow> = sqlx::query(&sample_sql)
            .bind(self.sample_limit)
            .fetch_all(&mut *conn)
            .await
            .map_err(|source| DataSourceError::Sample {
                table: self.table.clone(),
                source,
            })?
            .iter()
            .map(row_to_json)
            .collect();

        Ok(TableContext {
            table: self.table.clone(),
            columns,
            rows,
        })
    }
}

/// Close `conn`; the outcome of the work done on it stands either way.
async fn close(conn: MySqlConnection) {
    if let Err(e) = conn.close().await {
        warn!(error = %e, "Failed to close MySQL connection cleanly");
    }
}

#[async_trait]
impl TableSource for MySqlTableSource {
    #[instrument(skip(self), fields(table = %self.table, limit = self.sample_limit))]
    async fn fetch_context(&self) -> Result<TableContext, DataSourceError> {
        let mut conn = self.connect().await?;
        let result = self.read_context(&mut conn).await;
        close(conn).await;

        if let Ok(context) = &result {
            debug!(
                columns = context.columns.len(),
                rows = context.rows.len(),
                "Fetched table context"
            );
        }

        result
    }

    async fn health_check(&self) -> Result<(), DataSourceError> {
        let mut conn = self.connect().await?;
        let result = sqlx::query("SELECT 1")
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(DataSourceError::Connection);
        close(conn).await;
        result
    }

    fn table(&self) -> &str {
        &self.table
    }
}

fn row_to_json(row: &MySqlRow) -> SampleRow {
    row.columns()
        .iter()
        .map(|column| (column.name().to_string(), decode_value(row, column.ordinal())))
        .collect()
}

/// Decode one cell into its natural JSON form, trying the typed decoders
/// first and falling back to the raw text or bytes the server sent.
fn decode_value(row: &MySqlRow, idx: usize) -> Value {
    match row.try_get_raw(idx) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(_) => {}
        Err(_) => return Value::Null,
    }

    // Binary-protocol encodings the generic decoders below would misread.
    match row.column(idx).type_info().name() {
        "YEAR" => {
            if let Ok(v) = row.try_get_unchecked::<u16, _>(idx) {
                return Value::from(v);
            }
        }
        "BIT" => {
            if let Ok(v) = row.try_get_unchecked::<u64, _>(idx) {
                return Value::from(v);
            }
        }
        "TIME" => {
            if let Ok(v) = row.try_get::<MySqlTime, _>(idx) {
                return Value::String(time_text(v));
            }
        }
        _ => {}
    }

    if let Ok(v) = row.try_get::<i64, _>(idx) {
        return Value::from(v);
    }
    if let Ok(v) = row.try_get::<u64, _>(idx) {
        return Value::from(v);
    }
    if let Ok(v) = row.try_get::<f64, _>(idx) {
        return float_value(v);
    }
    if let Ok(v) = row.try_get::<f32, _>(idx) {
        return float_value(f64::from(v));
    }
    if let Ok(v) = row.try_get::<NaiveDateTime, _>(idx) {
        return Value::String(v.to_string());
    }
    if let Ok(v) = row.try_get::<NaiveDate, _>(idx) {
        return Value::String(v.to_string());
    }
    if let Ok(v) = row.try_get::<String, _>(idx) {
        return Value::String(v);
    }
    // DECIMAL, JSON and friends arrive as text on the wire.
    if let Ok(v) = row.try_get_unchecked::<String, _>(idx) {
        return Value::String(v);
    }
    if let Ok(v) = row.try_get_unchecked::<Vec<u8>, _>(idx) {
        return Value::String(String::from_utf8_lossy(&v).into_owned());
    }

    Value::Null
}

/// `08:05:00` for a time of day; negative or longer intervals keep their
/// sign and full hour count (`-12:30:00`, `100:00:00`).
fn time_text(v: MySqlTime) -> String {
    if v.is_valid_time_of_day() {
        if let Ok(t) = NaiveTime::try_from(v) {
            return t.to_string();
        }
    }
    v.to_string()
}

fn float_value(v: f64) -> Value {
    Number::from_f64(v)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(v.to_string()))
}
