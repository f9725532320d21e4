//! Seller classification used by the market-vs-retail comparison.
//!
//! The substring rule is easy to trip (a chain store whose name happens to
//! contain a marker is counted as a market), so it sits behind the
//! [`SellerClassifier`] trait and can be replaced without touching the
//! aggregator.

use crate::config::MARKET_MARKERS;
use crate::models::SellerClass;

/// Maps a seller name onto a [`SellerClass`]. Must be total.
pub trait SellerClassifier: Send + Sync {
    fn classify(&self, seller: &str) -> SellerClass;
}

impl<F> SellerClassifier for F
where
    F: Fn(&str) -> SellerClass + Send + Sync,
{
    fn classify(&self, seller: &str) -> SellerClass {
        self(seller)
    }
}

/// Classifies a seller as market-type when its name contains any marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerClassifier {
    markers: Vec<String>,
}

impl MarkerClassifier {
    pub fn new<S: Into<String>>(markers: impl IntoIterator<Item = S>) -> Self {
        Self {
            markers: markers.into_iter().map(Into::into).collect(),
        }
    }

    pub fn markers(&self) -> &[String] {
        &self.markers
    }
}

impl Default for MarkerClassifier {
    fn default() -> Self {
        Self::new(MARKET_MARKERS)
    }
}

impl SellerClassifier for MarkerClassifier {
    fn classify(&self, seller: &str) -> SellerClass {
        if self.markers.iter().any(|m| seller.contains(m.as_str())) {
            SellerClass::Market
        } else {
            SellerClass::Retail
        }
    }
}
