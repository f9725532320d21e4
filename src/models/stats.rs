use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SummaryStats: mean / max / min over a filtered view
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub mean: f64,
    pub max: f64,
    pub min: f64,
    /// Number of rows that carried an amount.
    pub count: usize,
}

// ---------------------------------------------------------------------------
// DailyMean: one point of the daily mean price series
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyMean {
    pub date: NaiveDate,
    pub mean: f64,
}

// ---------------------------------------------------------------------------
// SellerClass: market-type vs retail-type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SellerClass {
    #[serde(rename = "market-type")]
    Market,
    #[serde(rename = "retail-type")]
    Retail,
}

impl SellerClass {
    pub fn as_str(self) -> &'static str {
        match self {
            SellerClass::Market => "market-type",
            SellerClass::Retail => "retail-type",
        }
    }

    /// Label the source dashboard puts on the comparison bars.
    pub fn label(self) -> &'static str {
        match self {
            SellerClass::Market => "시장",
            SellerClass::Retail => "마트",
        }
    }
}

impl fmt::Display for SellerClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
