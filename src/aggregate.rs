//! Aggregations over a [`FilteredView`].
//!
//! Every operation is a pure function of the view. Rows without an amount
//! are skipped; a view with no priced rows is reported as
//! [`PriceError::EmptyView`](crate::error::PriceError::EmptyView) instead of
//! producing zeros.

use std::collections::btree_map;
use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::ser::{Serialize, Serializer};

use crate::classify::SellerClassifier;
use crate::error::Result;
use crate::filter::FilteredView;
use crate::models::{DailyMean, PriceRecord, SellerClass, SummaryStats};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct MeanAccumulator {
    sum: f64,
    count: usize,
}

impl MeanAccumulator {
    fn push(&mut self, amount: f64) {
        self.sum += amount;
        self.count += 1;
    }

    fn mean(&self) -> f64 {
        self.sum / self.count as f64
    }
}

// ---------------------------------------------------------------------------
// DailyMeanSeries
// ---------------------------------------------------------------------------

/// Mean amount per observation date, ascending by date.
///
/// Holds per-date running sums; means are computed while iterating, and the
/// series can be iterated any number of times.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailyMeanSeries {
    days: BTreeMap<NaiveDate, MeanAccumulator>,
}

impl DailyMeanSeries {
    pub fn iter(&self) -> DailyMeanIter<'_> {
        DailyMeanIter {
            inner: self.days.iter(),
        }
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.days.get(&date).map(MeanAccumulator::mean)
    }

    pub fn to_vec(&self) -> Vec<DailyMean> {
        self.iter().collect()
    }
}

pub struct DailyMeanIter<'a> {
    inner: btree_map::Iter<'a, NaiveDate, MeanAccumulator>,
}

impl Iterator for DailyMeanIter<'_> {
    type Item = DailyMean;

    fn next(&mut self) -> Option<DailyMean> {
        self.inner.next().map(|(date, acc)| DailyMean {
            date: *date,
            mean: acc.mean(),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for DailyMeanIter<'_> {}

impl<'a> IntoIterator for &'a DailyMeanSeries {
    type Item = DailyMean;
    type IntoIter = DailyMeanIter<'a>;

    fn into_iter(self) -> DailyMeanIter<'a> {
        self.iter()
    }
}

impl Serialize for DailyMeanSeries {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

/// Computes the derived views of a [`FilteredView`].
pub struct Aggregator<'c> {
    classifier: &'c dyn SellerClassifier,
}

impl<'c> Aggregator<'c> {
    pub fn new(classifier: &'c dyn SellerClassifier) -> Self {
        Self { classifier }
    }

    /// Arithmetic mean, maximum and minimum of the view's amounts.
    pub fn summary_stats(&self, view: &FilteredView) -> Result<SummaryStats> {
        let mut acc = MeanAccumulator::default();
        let mut max = f64::NEG_INFINITY;
        let mut min = f64::INFINITY;
        for amount in priced(view).map(|(_, a)| a) {
            acc.push(amount);
            max = max.max(amount);
            min = min.min(amount);
        }
        if acc.count == 0 {
            return Err(view.empty_error());
        }
        Ok(SummaryStats {
            mean: acc.mean(),
            max,
            min,
            count: acc.count,
        })
    }

    /// The row with the lowest amount; the earliest such row wins ties.
    pub fn cheapest_record<'v>(&self, view: &'v FilteredView) -> Result<&'v PriceRecord> {
        let mut best: Option<(&PriceRecord, f64)> = None;
        for (record, amount) in priced(view) {
            match best {
                Some((_, lowest)) if amount >= lowest => {}
                _ => best = Some((record, amount)),
            }
        }
        best.map(|(record, _)| record)
            .ok_or_else(|| view.empty_error())
    }

    /// Mean amount per date, ascending; dates without priced rows are absent.
    pub fn daily_mean_series(&self, view: &FilteredView) -> Result<DailyMeanSeries> {
        let mut days: BTreeMap<NaiveDate, MeanAccumulator> = BTreeMap::new();
        for (record, amount) in priced(view) {
            days.entry(record.date).or_default().push(amount);
        }
        if days.is_empty() {
            return Err(view.empty_error());
        }
        Ok(DailyMeanSeries { days })
    }

    /// Mean amount per seller class; a class with no rows is absent.
    pub fn seller_class_comparison(
        &self,
        view: &FilteredView,
    ) -> Result<BTreeMap<SellerClass, f64>> {
        let mut classes: BTreeMap<SellerClass, MeanAccumulator> = BTreeMap::new();
        for (record, amount) in priced(view) {
            classes
                .entry(self.classifier.classify(&record.seller))
                .or_default()
                .push(amount);
        }
        if classes.is_empty() {
            return Err(view.empty_error());
        }
        Ok(classes
            .into_iter()
            .map(|(class, acc)| (class, acc.mean()))
            .collect())
    }
}

/// Rows of the view that carry an amount, with that amount.
fn priced(view: &FilteredView) -> impl Iterator<Item = (&PriceRecord, f64)> {
    view.records()
        .iter()
        .filter_map(|r| r.amount.map(|a| (r, a)))
}
