//! Record store queries against the loaded `price_records` table.

use chrono::NaiveDate;
use serde_json::Value;

use crate::config::RECORDS_TABLE;
use crate::error::{PriceError, Result};
use crate::models::PriceRecord;
use crate::sql_builder::SqlBuilder;

/// Columns making up a [`PriceRecord`], dates rendered as ISO text.
pub(crate) const RECORD_COLUMNS: [&str; 5] = [
    "category",
    "seller",
    "region",
    "CAST(date AS VARCHAR) AS date",
    "amount",
];

// ---------------------------------------------------------------------------
// RecordQuery
// ---------------------------------------------------------------------------

/// Read-only access to the loaded price records.
///
/// The table is written once when the SDK is built and never mutated after.
pub struct RecordQuery<'a> {
    conn: &'a crate::connection::Connection,
}

impl<'a> RecordQuery<'a> {
    /// Create a new `RecordQuery` bound to the given connection.
    pub fn new(conn: &'a crate::connection::Connection) -> Self {
        Self { conn }
    }

    /// Every record, in file order.
    pub fn all(&self) -> Result<Vec<PriceRecord>> {
        let (sql, params) = SqlBuilder::new(RECORDS_TABLE)
            .select(&RECORD_COLUMNS)
            .order_by(&["row_id ASC"])
            .build();
        self.conn.execute_into(&sql, &params)
    }

    /// Number of loaded records.
    pub fn count(&self) -> Result<usize> {
        let (sql, params) = SqlBuilder::new(RECORDS_TABLE)
            .select(&["COUNT(*)"])
            .build();
        let n = self
            .conn
            .execute_scalar(&sql, &params)?
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        Ok(n as usize)
    }

    /// Distinct categories in first-seen order.
    pub fn distinct_categories(&self) -> Result<Vec<String>> {
        let (sql, params) = SqlBuilder::new(RECORDS_TABLE)
            .select(&["category", "MIN(row_id) AS first_row"])
            .group_by(&["category"])
            .order_by(&["first_row ASC"])
            .build();
        let rows = self.conn.execute(&sql, &params)?;
        Ok(rows
            .into_iter()
            .filter_map(|r| {
                r.get("category")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string())
            })
            .collect())
    }

    /// Records of one category (exact match), in file order.
    ///
    /// An unknown category yields an empty vector.
    pub fn by_category(&self, category: &str) -> Result<Vec<PriceRecord>> {
        let (sql, params) = SqlBuilder::new(RECORDS_TABLE)
            .select(&RECORD_COLUMNS)
            .where_eq("category", category)
            .order_by(&["row_id ASC"])
            .build();
        self.conn.execute_into(&sql, &params)
    }

    /// First and last observation date of a category, or `None` if it has no rows.
    pub fn category_span(&self, category: &str) -> Result<Option<(NaiveDate, NaiveDate)>> {
        let (sql, params) = SqlBuilder::new(RECORDS_TABLE)
            .select(&[
                "CAST(MIN(date) AS VARCHAR) AS first_date",
                "CAST(MAX(date) AS VARCHAR) AS last_date",
            ])
            .where_eq("category", category)
            .build();
        let rows = self.conn.execute(&sql, &params)?;
        let row = match rows.into_iter().next() {
            Some(r) => r,
            None => return Ok(None),
        };
        match (row.get("first_date"), row.get("last_date")) {
            (Some(Value::String(first)), Some(Value::String(last))) => {
                Ok(Some((parse_date(first)?, parse_date(last)?)))
            }
            _ => Ok(None),
        }
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| PriceError::Parse(format!("invalid date '{}': {}", s, e)))
}
