//! Everything a dashboard renders for one selection, computed in one pass.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::aggregate::{Aggregator, DailyMeanSeries};
use crate::error::Result;
use crate::filter::FilteredView;
use crate::models::{PriceRecord, SellerClass, SummaryStats};

/// Text summary plus the data behind the line chart (daily means) and the
/// two-bar chart (seller-class comparison).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardReport {
    pub category: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub stats: SummaryStats,
    pub cheapest: PriceRecord,
    pub daily_means: DailyMeanSeries,
    pub seller_classes: BTreeMap<SellerClass, f64>,
}

impl DashboardReport {
    /// Run every aggregation over `view`.
    ///
    /// Fails with `EmptyView` when the view has no priced rows.
    pub fn build(view: &FilteredView, aggregator: &Aggregator<'_>) -> Result<Self> {
        let stats = aggregator.summary_stats(view)?;
        let cheapest = aggregator.cheapest_record(view)?.clone();
        let daily_means = aggregator.daily_mean_series(view)?;
        let seller_classes = aggregator.seller_class_comparison(view)?;

        // A non-empty view always has a resolved window
        let (start, end) = match (view.start(), view.end()) {
            (Some(start), Some(end)) => (start, end),
            _ => return Err(view.empty_error()),
        };

        Ok(Self {
            category: view.category().to_string(),
            start,
            end,
            stats,
            cheapest,
            daily_means,
            seller_classes,
        })
    }
}

impl fmt::Display for DashboardReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} 분석 결과 ({} ~ {})", self.category, self.start, self.end)?;
        writeln!(f, "평균 가격: {:.0}원", self.stats.mean)?;
        writeln!(f, "최대 가격: {:.0}원", self.stats.max)?;
        writeln!(f, "최소 가격: {:.0}원", self.stats.min)?;
        writeln!(
            f,
            "가장 저렴하게 판매하는 곳: {} (지역: {})",
            self.cheapest.seller, self.cheapest.region
        )?;

        writeln!(f)?;
        writeln!(f, "{}의 일별 평균 가격 변화", self.category)?;
        for point in &self.daily_means {
            writeln!(f, "  {}  {:.0}원", point.date, point.mean)?;
        }

        writeln!(f)?;
        writeln!(f, "{} 시장 vs 마트 평균 가격 비교", self.category)?;
        for (class, mean) in &self.seller_classes {
            writeln!(f, "  {}  {:.0}원", class.label(), mean)?;
        }
        Ok(())
    }
}
