//! Selection filter: narrows the record store to one category and an
//! inclusive date window.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{PriceError, Result};
use crate::models::PriceRecord;

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// What the user picked: a category and optional date bounds.
///
/// Omitted bounds default to the first / last observation date of the
/// chosen category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub category: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl Selection {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            start: None,
            end: None,
        }
    }

    pub fn start(mut self, date: NaiveDate) -> Self {
        self.start = Some(date);
        self
    }

    pub fn end(mut self, date: NaiveDate) -> Self {
        self.end = Some(date);
        self
    }

    /// Fail with [`PriceError::InvalidRange`] when both bounds are given and
    /// `start > end`.
    pub fn validate(&self) -> Result<()> {
        match (self.start, self.end) {
            (Some(start), Some(end)) if start > end => Err(PriceError::InvalidRange { start, end }),
            _ => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// FilteredView
// ---------------------------------------------------------------------------

/// Read-only subset of records sharing one category and falling inside an
/// inclusive date window. Records keep their original (file) order.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredView {
    category: String,
    window: Option<(NaiveDate, NaiveDate)>,
    records: Vec<PriceRecord>,
}

impl FilteredView {
    /// Build a view from in-memory records.
    pub fn from_records(records: &[PriceRecord], selection: &Selection) -> Result<Self> {
        selection.validate()?;
        let rows = filter_by_category(records, &selection.category);
        Self::resolve(selection, rows)
    }

    /// Apply a selection's date bounds to rows already narrowed to its category.
    pub(crate) fn resolve(selection: &Selection, rows: Vec<PriceRecord>) -> Result<Self> {
        selection.validate()?;
        let span = date_span(&rows);
        let start = selection.start.or(span.map(|(first, _)| first));
        let end = selection.end.or(span.map(|(_, last)| last));

        match (start, end) {
            (Some(start), Some(end)) => Ok(Self {
                category: selection.category.clone(),
                window: Some((start, end)),
                records: filter_by_date_range(&rows, start, end)?,
            }),
            _ => Ok(Self {
                category: selection.category.clone(),
                window: None,
                records: Vec::new(),
            }),
        }
    }

    /// Narrow this view to a tighter inclusive window.
    ///
    /// The window is clamped to this view's own bounds. A window that does
    /// not overlap them yields an empty view without bounds.
    pub fn within(&self, start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(PriceError::InvalidRange { start, end });
        }
        let (start, end) = match self.window {
            Some((lo, hi)) => (start.max(lo), end.min(hi)),
            None => (start, end),
        };
        if start > end {
            return Ok(Self {
                category: self.category.clone(),
                window: None,
                records: Vec::new(),
            });
        }
        Ok(Self {
            category: self.category.clone(),
            window: Some((start, end)),
            records: filter_by_date_range(&self.records, start, end)?,
        })
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// Resolved start bound; `None` for an empty view without explicit bounds.
    pub fn start(&self) -> Option<NaiveDate> {
        self.window.map(|(start, _)| start)
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.window.map(|(_, end)| end)
    }

    pub fn records(&self) -> &[PriceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn empty_error(&self) -> PriceError {
        PriceError::EmptyView {
            category: self.category.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Slice filters
// ---------------------------------------------------------------------------

/// Records whose category equals `category` exactly, in original order.
pub fn filter_by_category(records: &[PriceRecord], category: &str) -> Vec<PriceRecord> {
    records
        .iter()
        .filter(|r| r.category == category)
        .cloned()
        .collect()
}

/// Records dated within `[start, end]`, in original order.
pub fn filter_by_date_range(
    records: &[PriceRecord],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<PriceRecord>> {
    if start > end {
        return Err(PriceError::InvalidRange { start, end });
    }
    Ok(records
        .iter()
        .filter(|r| r.date >= start && r.date <= end)
        .cloned()
        .collect())
}

/// Earliest and latest date among `records`.
pub fn date_span(records: &[PriceRecord]) -> Option<(NaiveDate, NaiveDate)> {
    let first = records.iter().map(|r| r.date).min()?;
    let last = records.iter().map(|r| r.date).max()?;
    Some((first, last))
}
