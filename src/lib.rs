//! Produce price SDK for Rust.
//!
//! Loads a table of grocery / produce price observations (the Korean market
//! survey CSV by default), narrows it to one product and date window, and
//! computes the views a price dashboard renders: summary statistics, the
//! cheapest seller, a daily mean series and a market-vs-retail comparison.
//! The table is decoded, validated and ingested once into an in-process
//! DuckDB database; it is never modified afterwards.
//!
//! # Quick start
//!
//! ```no_run
//! use produce_price_sdk::{ProducePriceSdk, Selection};
//!
//! let sdk = ProducePriceSdk::builder().build().unwrap();
//!
//! // Pick a product
//! let categories = sdk.records().distinct_categories().unwrap();
//!
//! // Everything the dashboard shows for it
//! let report = sdk.report(&Selection::new(&categories[0])).unwrap();
//! println!("{}", report);
//! ```

#[cfg(feature = "async")]
pub mod async_client;
pub mod aggregate;
pub mod cache;
pub mod classify;
pub mod config;
pub mod connection;
pub mod decode;
pub mod error;
pub mod filter;
pub mod models;
pub mod queries;
pub mod report;
pub mod sql_builder;

pub use aggregate::{Aggregator, DailyMeanSeries};
#[cfg(feature = "async")]
pub use async_client::AsyncProducePriceSdk;
pub use cache::{CacheManager, Source};
pub use classify::{MarkerClassifier, SellerClassifier};
pub use crate::config::{Field, FieldMapping, Settings};
pub use connection::Connection;
pub use error::{PriceError, Result};
pub use filter::{FilteredView, Selection};
pub use models::{DailyMean, PriceRecord, SellerClass, SummaryStats};
pub use report::DashboardReport;
pub use sql_builder::SqlBuilder;

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::info;

// ---------------------------------------------------------------------------
// ProducePriceSdkBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing a [`ProducePriceSdk`] instance.
///
/// Use [`ProducePriceSdk::builder()`] to obtain a builder, chain configuration
/// methods, and call [`build()`](ProducePriceSdkBuilder::build) to load the data.
pub struct ProducePriceSdkBuilder {
    source: Source,
    cache_dir: Option<PathBuf>,
    offline: bool,
    timeout: Duration,
    encoding: String,
    mapping: FieldMapping,
    classifier: Box<dyn SellerClassifier>,
}

impl Default for ProducePriceSdkBuilder {
    fn default() -> Self {
        Self {
            source: Source::Url(crate::config::DEFAULT_SOURCE_URL.to_string()),
            cache_dir: None,
            offline: false,
            timeout: Duration::from_secs(crate::config::DEFAULT_TIMEOUT_SECS),
            encoding: crate::config::DEFAULT_ENCODING.to_string(),
            mapping: FieldMapping::default(),
            classifier: Box::new(MarkerClassifier::default()),
        }
    }
}

impl ProducePriceSdkBuilder {
    /// Load the table from a URL (downloaded into the cache directory).
    ///
    /// Defaults to the published `top_5_detailed_products.csv`.
    pub fn source_url(mut self, url: impl Into<String>) -> Self {
        self.source = Source::Url(url.into());
        self
    }

    /// Load the table from a local file instead of a URL.
    pub fn source_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.source = Source::Path(path.as_ref().to_path_buf());
        self
    }

    /// Set a custom cache directory.
    ///
    /// If not set, the platform-appropriate default cache directory is used
    /// (e.g. `~/.cache/produce-price-sdk` on Linux).
    pub fn cache_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.cache_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enable or disable offline mode.
    ///
    /// When offline, the SDK never downloads and only uses a previously
    /// cached copy of a URL source. Defaults to `false`.
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// Set the HTTP request timeout for downloads.
    ///
    /// Defaults to 120 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Text encoding label of the source file. Defaults to `cp949`.
    pub fn encoding(mut self, label: impl Into<String>) -> Self {
        self.encoding = label.into();
        self
    }

    /// Source column to record field mapping.
    pub fn field_mapping(mut self, mapping: FieldMapping) -> Self {
        self.mapping = mapping;
        self
    }

    /// Replace the market-vs-retail seller classification rule.
    pub fn classifier<C: SellerClassifier + 'static>(mut self, classifier: C) -> Self {
        self.classifier = Box::new(classifier);
        self
    }

    /// Build the SDK, fetching, decoding and ingesting the source.
    ///
    /// The load is all-or-nothing: any failure is returned as
    /// [`PriceError::Parse`] and no SDK is created.
    pub fn build(self) -> Result<ProducePriceSdk> {
        decode::resolve_encoding(&self.encoding)?;
        let cache = CacheManager::new(self.cache_dir, self.offline, self.timeout)?;
        let conn = Connection::new(cache)?;
        conn.register_source(crate::config::RECORDS_TABLE, &self.source, &self.encoding, &self.mapping)?;
        Ok(ProducePriceSdk {
            conn,
            source: self.source,
            encoding: self.encoding,
            mapping: self.mapping,
            classifier: self.classifier,
        })
    }
}

// ---------------------------------------------------------------------------
// ProducePriceSdk
// ---------------------------------------------------------------------------

/// The main entry point for the produce price SDK.
///
/// Wraps a [`Connection`] (which owns the [`CacheManager`] and the DuckDB
/// database holding the loaded records) and exposes the record store,
/// selection filter and aggregator as lightweight borrowing wrappers.
///
/// Created via [`ProducePriceSdk::builder()`].
pub struct ProducePriceSdk {
    conn: Connection,
    source: Source,
    encoding: String,
    mapping: FieldMapping,
    classifier: Box<dyn SellerClassifier>,
}

impl ProducePriceSdk {
    /// Create a new builder for configuring the SDK.
    pub fn builder() -> ProducePriceSdkBuilder {
        ProducePriceSdkBuilder::default()
    }

    // -- Pipeline accessors ------------------------------------------------

    /// Access the record store.
    pub fn records(&self) -> queries::RecordQuery<'_> {
        queries::RecordQuery::new(&self.conn)
    }

    /// Access the selection filter.
    pub fn selection(&self) -> queries::SelectionQuery<'_> {
        queries::SelectionQuery::new(&self.conn)
    }

    /// Access the aggregator, using the configured seller classifier.
    pub fn aggregator(&self) -> Aggregator<'_> {
        Aggregator::new(self.classifier.as_ref())
    }

    /// Resolve a selection into a view.
    ///
    /// Shorthand for `sdk.selection().select(selection)`.
    pub fn select(&self, selection: &Selection) -> Result<FilteredView> {
        self.selection().select(selection)
    }

    /// Filter and aggregate in one pass.
    pub fn report(&self, selection: &Selection) -> Result<DashboardReport> {
        let view = self.select(selection)?;
        DashboardReport::build(&view, &self.aggregator())
    }

    // -- Metadata and utility methods --------------------------------------

    /// Where the records were loaded from.
    pub fn source(&self) -> &Source {
        &self.source
    }

    /// The column mapping applied at load time.
    pub fn field_mapping(&self) -> &FieldMapping {
        &self.mapping
    }

    /// Return the names of the tables loaded into DuckDB.
    pub fn tables(&self) -> Vec<String> {
        self.conn.tables()
    }

    /// Execute a raw SQL query against the DuckDB database.
    ///
    /// Provides escape-hatch access to the `price_records` table for queries
    /// not covered by the pipeline.
    ///
    /// # Arguments
    ///
    /// * `query` - SQL string with `?` positional placeholders.
    /// * `params` - Parameter values corresponding to the placeholders.
    ///
    /// # Returns
    ///
    /// A vector of rows, each represented as a `HashMap<String, serde_json::Value>`.
    pub fn sql(
        &self,
        query: &str,
        params: &[String],
    ) -> Result<Vec<HashMap<String, serde_json::Value>>> {
        self.conn.execute(query, params)
    }

    /// Check whether the remote source changed and reload it if so.
    ///
    /// Returns `true` if the data was stale and has been reloaded, `false`
    /// if already up to date (local sources are never stale).
    pub fn refresh(&self) -> Result<bool> {
        let stale = self.conn.cache.borrow_mut().is_stale(&self.source);
        if stale {
            self.conn.cache.borrow().invalidate(&self.source)?;
            self.conn.register_source(
                crate::config::RECORDS_TABLE,
                &self.source,
                &self.encoding,
                &self.mapping,
            )?;
            info!("Source {} changed; records reloaded", self.source);
        }
        Ok(stale)
    }

    /// Consume the SDK and release all resources.
    ///
    /// Closes the DuckDB connection and HTTP client. This is called
    /// automatically when the SDK is dropped, but can be invoked explicitly
    /// for deterministic cleanup.
    pub fn close(self) {
        self.conn.cache.borrow_mut().close();
    }

    /// Return a reference to the underlying [`Connection`] for advanced usage.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl fmt::Display for ProducePriceSdk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cache = self.conn.cache.borrow();
        write!(
            f,
            "ProducePriceSdk(source={}, encoding={}, cache_dir={}, tables=[{}], offline={})",
            self.source,
            self.encoding,
            cache.cache_dir.display(),
            self.conn.tables().join(", "),
            cache.offline
        )
    }
}
