use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{PriceError, Result};

pub const DEFAULT_SOURCE_URL: &str = "https://raw.githubusercontent.com/leenakyungsongtanbujji/streamlit-app/main/top_5_detailed_products.csv";
pub const DEFAULT_ENCODING: &str = "cp949";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Name of the DuckDB table holding the loaded records.
pub const RECORDS_TABLE: &str = "price_records";

/// Seller-name substrings that mark a traditional or wholesale market.
pub const MARKET_MARKERS: [&str; 2] = ["시장", "도매"];

pub fn default_cache_dir() -> PathBuf {
    if let Some(cache) = dirs::cache_dir() {
        cache.join("produce-price-sdk")
    } else {
        PathBuf::from(".produce-price-sdk-cache")
    }
}

// ---------------------------------------------------------------------------
// Field mapping
// ---------------------------------------------------------------------------

/// A `PriceRecord` field that a source column can be mapped onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Category,
    Seller,
    Region,
    Date,
    Amount,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::Category,
        Field::Seller,
        Field::Region,
        Field::Date,
        Field::Amount,
    ];

    /// Column name of this field in the loaded table.
    pub fn column(self) -> &'static str {
        match self {
            Field::Category => "category",
            Field::Seller => "seller",
            Field::Region => "region",
            Field::Date => "date",
            Field::Amount => "amount",
        }
    }

    pub fn from_column(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.column() == name)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Ordered table of `source column -> record field` renames applied at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    entries: Vec<(String, Field)>,
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            entries: vec![
                ("PRDLST_NM".to_string(), Field::Category),
                ("EXAMIN_MRKT_NM".to_string(), Field::Seller),
                ("EXAMIN_AREA_NM".to_string(), Field::Region),
                ("EXAMIN_DE".to_string(), Field::Date),
                ("EXAMIN_AMT".to_string(), Field::Amount),
            ],
        }
    }
}

impl FieldMapping {
    /// Build a mapping from `(source column, field)` pairs.
    ///
    /// Every field must be mapped exactly once.
    pub fn new<S: Into<String>>(entries: impl IntoIterator<Item = (S, Field)>) -> Result<Self> {
        let entries: Vec<(String, Field)> =
            entries.into_iter().map(|(s, f)| (s.into(), f)).collect();
        for field in Field::ALL {
            let n = entries.iter().filter(|(_, f)| *f == field).count();
            if n != 1 {
                return Err(PriceError::InvalidArgument(format!(
                    "field '{}' must be mapped exactly once (found {})",
                    field, n
                )));
            }
        }
        Ok(Self { entries })
    }

    /// Source column mapped onto `field`.
    pub fn source_for(&self, field: Field) -> &str {
        self.entries
            .iter()
            .find(|(_, f)| *f == field)
            .map(|(s, _)| s.as_str())
            .unwrap_or_default()
    }

    pub fn entries(&self) -> &[(String, Field)] {
        &self.entries
    }
}

// ---------------------------------------------------------------------------
// Settings -- file / environment configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct SourceSettings {
    pub url: Option<String>,
    pub path: Option<PathBuf>,
    pub encoding: Option<String>,
    /// Field name (`category`, `seller`, ...) -> source column.
    pub columns: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CacheSettings {
    pub dir: Option<PathBuf>,
    pub offline: bool,
    pub timeout_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            dir: None,
            offline: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ClassifierSettings {
    pub markers: Vec<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ReportSettings {
    pub category: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Settings {
    pub source: SourceSettings,
    pub cache: CacheSettings,
    pub classifier: ClassifierSettings,
    pub report: ReportSettings,
}

impl Settings {
    /// Load settings from an optional TOML file, overridden by `PRICE_*`
    /// environment variables (`PRICE_CACHE__OFFLINE=true`, ...).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(p) = path {
            builder = builder.add_source(config::File::from(p).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("PRICE")
                .prefix_separator("_")
                .separator("__"),
        );
        Ok(builder.build()?.try_deserialize()?)
    }

    /// Column mapping described by these settings, falling back to the
    /// default column for every field not overridden.
    pub fn field_mapping(&self) -> Result<FieldMapping> {
        let defaults = FieldMapping::default();
        for key in self.source.columns.keys() {
            if Field::from_column(key).is_none() {
                return Err(PriceError::InvalidArgument(format!(
                    "unknown field in column mapping: {}",
                    key
                )));
            }
        }
        FieldMapping::new(Field::ALL.into_iter().map(|field| {
            let source = self
                .source
                .columns
                .get(field.column())
                .cloned()
                .unwrap_or_else(|| defaults.source_for(field).to_string());
            (source, field)
        }))
    }

    /// Turn these settings into a configured SDK builder.
    pub fn into_builder(self) -> Result<crate::ProducePriceSdkBuilder> {
        let mapping = self.field_mapping()?;
        let mut builder = crate::ProducePriceSdk::builder()
            .offline(self.cache.offline)
            .timeout(Duration::from_secs(self.cache.timeout_secs))
            .field_mapping(mapping);
        if let Some(url) = self.source.url {
            builder = builder.source_url(url);
        }
        if let Some(path) = self.source.path {
            builder = builder.source_path(path);
        }
        if let Some(encoding) = self.source.encoding {
            builder = builder.encoding(encoding);
        }
        if let Some(dir) = self.cache.dir {
            builder = builder.cache_dir(dir);
        }
        if !self.classifier.markers.is_empty() {
            builder = builder.classifier(crate::classify::MarkerClassifier::new(
                self.classifier.markers,
            ));
        }
        Ok(builder)
    }
}
