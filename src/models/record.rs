use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// PriceRecord: One observed price (one row of the source table)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    /// Product / item name.
    pub category: String,
    /// Market or vendor that reported the price.
    pub seller: String,
    /// Geographic area of the seller.
    pub region: String,
    pub date: NaiveDate,
    /// Observed price in local currency units; `None` when the cell was empty.
    pub amount: Option<f64>,
}

impl PriceRecord {
    pub fn new(
        category: impl Into<String>,
        seller: impl Into<String>,
        region: impl Into<String>,
        date: NaiveDate,
        amount: Option<f64>,
    ) -> Self {
        Self {
            category: category.into(),
            seller: seller.into(),
            region: region.into(),
            date,
            amount,
        }
    }
}
