//! DuckDB connection wrapper with source ingestion and query execution.
//!
//! The price CSV is ingested once into a typed table:
//! - source columns are renamed through the configured [`FieldMapping`]
//! - amounts and dates are validated row by row before the table is created,
//!   so a malformed file never produces a partially loaded table

use crate::cache::{CacheManager, Source};
use crate::config::{Field, FieldMapping};
use crate::error::{PriceError, Result};
use chrono::NaiveDate;
use duckdb::{types::ValueRef, Connection as DuckDbConnection};
use log::{debug, info};
use serde::de::DeserializeOwned;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Days between 0001-01-01 (CE day 1) and the Unix epoch.
const UNIX_EPOCH_CE_DAYS: i32 = 719_163;

/// Wraps a DuckDB connection and the tables ingested into it.
pub struct Connection {
    conn: DuckDbConnection,
    /// The cache manager used to download/locate source files.
    pub cache: RefCell<CacheManager>,
    registered_tables: RefCell<HashSet<String>>,
}

impl Connection {
    /// Create a connection backed by the given cache.
    ///
    /// Opens an in-memory DuckDB database.
    pub fn new(cache: CacheManager) -> Result<Self> {
        let conn = DuckDbConnection::open_in_memory()?;
        Ok(Self {
            conn,
            cache: RefCell::new(cache),
            registered_tables: RefCell::new(HashSet::new()),
        })
    }

    /// Execute SQL and return results as a `Vec` of `HashMap`s.
    ///
    /// Each row is represented as a `HashMap<String, serde_json::Value>`.
    /// Automatically converts DuckDB types to `serde_json::Value`.
    pub fn execute(
        &self,
        sql: &str,
        params: &[String],
    ) -> Result<Vec<HashMap<String, serde_json::Value>>> {
        debug!("execute: {} {:?}", sql.trim(), params);
        let mut stmt = self.conn.prepare(sql)?;

        let param_values: Vec<&dyn duckdb::ToSql> = params
            .iter()
            .map(|p| p as &dyn duckdb::ToSql)
            .collect();

        let mut rows_result = stmt.query(param_values.as_slice())?;

        // Column metadata is only available after the statement has run
        let stmt_ref = rows_result
            .as_ref()
            .ok_or_else(|| PriceError::InvalidArgument("statement has no result set".into()))?;
        let column_names: Vec<String> = stmt_ref
            .column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect();
        let column_count = stmt_ref.column_count();

        let mut out: Vec<HashMap<String, serde_json::Value>> = Vec::new();

        while let Some(row) = rows_result.next()? {
            let mut map = HashMap::new();
            for (i, col_name) in column_names.iter().enumerate().take(column_count) {
                let value = convert_value_ref(row.get_ref(i)?);
                map.insert(col_name.clone(), value);
            }
            out.push(map);
        }

        Ok(out)
    }

    /// Execute SQL and deserialize each row into type `T`.
    ///
    /// First executes the query as `HashMap` rows, then deserializes each
    /// row using `serde_json`.
    pub fn execute_into<T: DeserializeOwned>(
        &self,
        sql: &str,
        params: &[String],
    ) -> Result<Vec<T>> {
        let rows = self.execute(sql, params)?;
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let value = serde_json::Value::Object(
                row.into_iter().collect::<serde_json::Map<String, serde_json::Value>>(),
            );
            let item: T = serde_json::from_value(value)?;
            results.push(item);
        }
        Ok(results)
    }

    /// Execute SQL and return the first column of the first row.
    ///
    /// Returns `None` if the result set is empty.
    pub fn execute_scalar(
        &self,
        sql: &str,
        params: &[String],
    ) -> Result<Option<serde_json::Value>> {
        debug!("execute_scalar: {} {:?}", sql.trim(), params);
        let mut stmt = self.conn.prepare(sql)?;
        let param_values: Vec<&dyn duckdb::ToSql> = params
            .iter()
            .map(|p| p as &dyn duckdb::ToSql)
            .collect();

        let mut rows = stmt.query(param_values.as_slice())?;

        if let Some(row) = rows.next()? {
            let value = convert_value_ref(row.get_ref(0)?);
            Ok(Some(value))
        } else {
            Ok(None)
        }
    }

    /// Resolve, decode and ingest a source into `table_name`.
    ///
    /// The whole load either succeeds or fails; every failure (unreachable
    /// source, undecodable bytes, schema mismatch, bad cell) comes back as
    /// [`PriceError::Parse`].
    pub fn register_source(
        &self,
        table_name: &str,
        source: &Source,
        encoding: &str,
        mapping: &FieldMapping,
    ) -> Result<()> {
        let path = self
            .cache
            .borrow_mut()
            .ensure_utf8(source, encoding)
            .map_err(|e| match e {
                PriceError::InvalidArgument(_) => e,
                other => other.into_parse(),
            })?;
        self.register_table_from_csv(table_name, &path, mapping)
            .map_err(PriceError::into_parse)?;
        info!("Loaded {} -> {}", source, table_name);
        Ok(())
    }

    /// Create a typed records table from a UTF-8 CSV file.
    ///
    /// The file is first copied verbatim into a staging table so its `rowid`
    /// reflects file order, then validated, then projected through `mapping`.
    pub fn register_table_from_csv(
        &self,
        table_name: &str,
        csv_path: &Path,
        mapping: &FieldMapping,
    ) -> Result<()> {
        let path_fwd = csv_path.to_string_lossy().replace('\\', "/").replace('\'', "''");
        let reader = format!(
            "read_csv('{}', header = true, all_varchar = true, delim = ',', quote = '\"')",
            path_fwd
        );

        self.check_header(&reader, csv_path, mapping)?;

        let staging = format!("{}_staging", table_name);
        let projections: Vec<String> = Field::ALL
            .iter()
            .map(|f| format!("{} AS {}", quote_ident(mapping.source_for(*f)), f.column()))
            .collect();
        self.conn.execute_batch(&format!(
            "CREATE OR REPLACE TEMP TABLE {} AS SELECT {} FROM {}",
            staging,
            projections.join(", "),
            reader
        ))?;

        let result = self
            .validate_staging(&staging, mapping)
            .and_then(|_| {
                self.conn.execute_batch(&format!(
                    "CREATE OR REPLACE TABLE {table} AS \
                     SELECT rowid AS row_id, \
                            COALESCE(category, '') AS category, \
                            COALESCE(seller, '') AS seller, \
                            COALESCE(region, '') AS region, \
                            {date} AS date, \
                            TRY_CAST(NULLIF(TRIM(amount), '') AS DOUBLE) AS amount \
                     FROM {staging} ORDER BY rowid",
                    table = table_name,
                    date = date_expr("date"),
                    staging = staging,
                ))?;
                Ok(())
            });

        self.conn
            .execute_batch(&format!("DROP TABLE IF EXISTS {}", staging))?;
        result?;

        self.registered_tables
            .borrow_mut()
            .insert(table_name.to_string());
        Ok(())
    }

    /// Fail unless every mapped source column is present in the header.
    fn check_header(&self, reader: &str, csv_path: &Path, mapping: &FieldMapping) -> Result<()> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT column_name FROM (DESCRIBE SELECT * FROM {})",
            reader
        ))?;
        let mut rows = stmt.query([])?;
        let mut header: Vec<String> = Vec::new();
        while let Some(row) = rows.next()? {
            header.push(row.get(0)?);
        }

        let first_line = first_line_fields(csv_path)?;
        for (source_col, field) in mapping.entries() {
            if header.iter().any(|h| h == source_col) {
                continue;
            }
            if first_line.iter().any(|h| h == source_col) {
                // The header line has the column but the sniffer picked another row
                return Err(PriceError::Parse(format!(
                    "rows have a different number of fields than the header \
                     ({} columns: {})",
                    first_line.len(),
                    first_line.join(", ")
                )));
            }
            return Err(PriceError::Parse(format!(
                "missing column '{}' for field '{}' (header: {})",
                source_col,
                field,
                header.join(", ")
            )));
        }
        Ok(())
    }

    /// Reject the load on the first bad amount or date, in file order.
    fn validate_staging(&self, staging: &str, mapping: &FieldMapping) -> Result<()> {
        let amount = "TRY_CAST(TRIM(amount) AS DOUBLE)";
        let checks = [
            (
                format!(
                    "NULLIF(TRIM(amount), '') IS NOT NULL \
                     AND ({a} IS NULL OR NOT isfinite({a}))",
                    a = amount
                ),
                "amount",
                "is not a number",
            ),
            (format!("{} < 0", amount), "amount", "is negative"),
            (
                format!(
                    "{d} IS NULL OR {d} NOT BETWEEN DATE '0001-01-01' AND DATE '9999-12-31'",
                    d = date_expr("date")
                ),
                "date",
                "is not a date in years 1-9999",
            ),
        ];

        for (condition, column, problem) in &checks {
            let sql = format!(
                "SELECT rowid AS row_id, {col} AS value FROM {staging} \
                 WHERE {cond} ORDER BY rowid LIMIT 1",
                col = column,
                staging = staging,
                cond = condition
            );
            let rows = self.execute(&sql, &[])?;
            if let Some(row) = rows.into_iter().next() {
                let row_id = row.get("row_id").and_then(|v| v.as_i64()).unwrap_or(0);
                let value = row
                    .get("value")
                    .and_then(|v| v.as_str())
                    .unwrap_or("<empty>")
                    .to_string();
                let field = Field::from_column(column).unwrap_or(Field::Amount);
                return Err(PriceError::Parse(format!(
                    "row {} (line {}): {} '{}' in column '{}' {}",
                    row_id + 1,
                    row_id + 2,
                    field,
                    value,
                    mapping.source_for(field),
                    problem
                )));
            }
        }
        Ok(())
    }

    /// Check whether a table has been registered.
    pub fn has_table(&self, name: &str) -> bool {
        self.registered_tables.borrow().contains(name)
    }

    /// Return a list of all registered table names.
    pub fn tables(&self) -> Vec<String> {
        let mut names: Vec<String> = self.registered_tables.borrow().iter().cloned().collect();
        names.sort();
        names
    }

    /// Access the underlying DuckDB connection for advanced usage.
    pub fn raw(&self) -> &DuckDbConnection {
        &self.conn
    }
}

/// SQL expression turning a text column into a DATE, accepting ISO dates,
/// compact `YYYYMMDD` dates and timestamps. NULL when none of them parse.
fn date_expr(col: &str) -> String {
    format!(
        "COALESCE(TRY_CAST(TRIM({c}) AS DATE), \
                  CAST(TRY_STRPTIME(TRIM({c}), '%Y%m%d') AS DATE), \
                  CAST(TRY_CAST(TRIM({c}) AS TIMESTAMP) AS DATE))",
        c = col
    )
}

/// Field names on the first line of a CSV file, unquoted and trimmed.
fn first_line_fields(path: &Path) -> Result<Vec<String>> {
    let mut line = String::new();
    BufReader::new(File::open(path)?).read_line(&mut line)?;
    Ok(line
        .trim_start_matches('\u{feff}')
        .trim_end_matches(['\r', '\n'])
        .split(',')
        .map(|f| f.trim().trim_matches('"').to_string())
        .collect())
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Convert a DuckDB `ValueRef` to a `serde_json::Value`.
fn convert_value_ref(val: ValueRef<'_>) -> serde_json::Value {
    match val {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Boolean(b) => serde_json::Value::Bool(b),
        ValueRef::TinyInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::SmallInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::Int(n) => serde_json::Value::Number(n.into()),
        ValueRef::BigInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::UTinyInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::USmallInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::UInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::UBigInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::HugeInt(n) => {
            // HugeInt may not fit in i64; try i64, fallback to string
            if let Ok(i) = i64::try_from(n) {
                serde_json::Value::Number(i.into())
            } else {
                serde_json::Value::String(n.to_string())
            }
        }
        ValueRef::Float(f) => serde_json::Number::from_f64(f as f64)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Double(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(bytes) => {
            serde_json::Value::String(String::from_utf8_lossy(bytes).to_string())
        }
        ValueRef::Date32(days) => NaiveDate::from_num_days_from_ce_opt(days + UNIX_EPOCH_CE_DAYS)
            .map(|d| serde_json::Value::String(d.format("%Y-%m-%d").to_string()))
            .unwrap_or(serde_json::Value::Null),
        _ => {
            // Remaining types (Time, Timestamp, Interval, List, ...) are not
            // produced by the records table
            serde_json::Value::Null
        }
    }
}
