//! Async wrapper around [`ProducePriceSdk`] for use in async runtimes (Tokio, etc.).
//!
//! Runs all SDK operations on a blocking thread pool via
//! [`tokio::task::spawn_blocking`], keeping the async event loop free. One
//! loaded record store can be shared by many sessions; each call builds its
//! own [`FilteredView`](crate::FilteredView).
//!
//! # Example
//!
//! ```no_run
//! use produce_price_sdk::{AsyncProducePriceSdk, Selection};
//!
//! #[tokio::main]
//! async fn main() {
//!     let sdk = AsyncProducePriceSdk::builder().build().await.unwrap();
//!
//!     let categories = sdk.run(|s| s.records().distinct_categories()).await.unwrap();
//!     let report = sdk.report(Selection::new(&categories[0])).await.unwrap();
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{PriceError, Result};
use crate::filter::Selection;
use crate::report::DashboardReport;
use crate::{ProducePriceSdk, ProducePriceSdkBuilder};

// ---------------------------------------------------------------------------
// AsyncProducePriceSdkBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing an [`AsyncProducePriceSdk`] instance.
///
/// Wraps a [`ProducePriceSdkBuilder`]; the blocking load runs on the
/// blocking thread pool.
#[derive(Default)]
pub struct AsyncProducePriceSdkBuilder {
    inner: ProducePriceSdkBuilder,
}

impl AsyncProducePriceSdkBuilder {
    /// Load the table from a URL.
    pub fn source_url(mut self, url: impl Into<String>) -> Self {
        self.inner = self.inner.source_url(url);
        self
    }

    /// Load the table from a local file.
    pub fn source_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.inner = self.inner.source_path(path);
        self
    }

    /// Set a custom cache directory.
    pub fn cache_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.inner = self.inner.cache_dir(path);
        self
    }

    /// Enable or disable offline mode.
    pub fn offline(mut self, offline: bool) -> Self {
        self.inner = self.inner.offline(offline);
        self
    }

    /// Set the HTTP request timeout for downloads.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.inner = self.inner.timeout(timeout);
        self
    }

    /// Text encoding label of the source file.
    pub fn encoding(mut self, label: impl Into<String>) -> Self {
        self.inner = self.inner.encoding(label);
        self
    }

    /// Build the async SDK, loading the source.
    ///
    /// Loading runs on the blocking thread pool so it won't block
    /// the async event loop.
    pub async fn build(self) -> Result<AsyncProducePriceSdk> {
        AsyncProducePriceSdk::from_builder(self.inner).await
    }
}

// ---------------------------------------------------------------------------
// AsyncProducePriceSdk
// ---------------------------------------------------------------------------

/// Async wrapper around [`ProducePriceSdk`].
///
/// All operations are dispatched to a blocking thread pool via
/// [`tokio::task::spawn_blocking`]. The underlying [`ProducePriceSdk`] is
/// protected by a [`Mutex`] since it uses `RefCell` internally.
#[derive(Clone)]
pub struct AsyncProducePriceSdk {
    inner: Arc<Mutex<ProducePriceSdk>>,
}

impl AsyncProducePriceSdk {
    /// Create a new builder for configuring the async SDK.
    pub fn builder() -> AsyncProducePriceSdkBuilder {
        AsyncProducePriceSdkBuilder::default()
    }

    /// Build from an already configured sync builder (custom mapping or
    /// classifier included).
    pub async fn from_builder(builder: ProducePriceSdkBuilder) -> Result<Self> {
        tokio::task::spawn_blocking(move || {
            let sdk = builder.build()?;
            Ok(AsyncProducePriceSdk {
                inner: Arc::new(Mutex::new(sdk)),
            })
        })
        .await
        .map_err(|e| PriceError::InvalidArgument(format!("Task join error: {e}")))?
    }

    /// Run a sync SDK operation on the blocking thread pool.
    ///
    /// The closure receives an `&ProducePriceSdk` reference and should return
    /// a `Result<T>`.
    pub async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&ProducePriceSdk) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sdk = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = sdk
                .lock()
                .map_err(|_| PriceError::InvalidArgument("SDK lock poisoned".into()))?;
            f(&guard)
        })
        .await
        .map_err(|e| PriceError::InvalidArgument(format!("Task join error: {e}")))?
    }

    /// Filter and aggregate one selection asynchronously.
    pub async fn report(&self, selection: Selection) -> Result<DashboardReport> {
        self.run(move |s| s.report(&selection)).await
    }

    /// Distinct categories in first-seen order.
    pub async fn categories(&self) -> Result<Vec<String>> {
        self.run(|s| s.records().distinct_categories()).await
    }

    /// Execute a raw SQL query asynchronously.
    pub async fn sql(
        &self,
        query: &str,
        params: &[String],
    ) -> Result<Vec<HashMap<String, serde_json::Value>>> {
        let query = query.to_string();
        let params = params.to_vec();
        self.run(move |s| s.sql(&query, &params)).await
    }

    /// Reload the source if it changed.
    pub async fn refresh(&self) -> Result<bool> {
        self.run(|s| s.refresh()).await
    }
}
