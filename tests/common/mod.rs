//! Shared test fixtures for the produce price SDK integration tests.
//!
//! Provides `setup_sample_sdk()` which writes a small cp949-encoded price CSV
//! into a temporary directory and builds an offline SDK from it.

#![allow(dead_code)]

use chrono::NaiveDate;
use produce_price_sdk::{ProducePriceSdk, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const HEADER: &str = "PRDLST_NM,EXAMIN_MRKT_NM,EXAMIN_AREA_NM,EXAMIN_DE,EXAMIN_AMT,EXAMIN_UNIT";

/// Three products, interleaved so first-seen order differs from sorted order.
///
/// - 감자: the worked example (1000 / 1200 on Jan 1, 900 on Jan 2)
/// - 양파: compact dates, a missing amount and a tie for cheapest
/// - 배추: a single row without an amount
pub const SAMPLE_CSV: &str = "\
PRDLST_NM,EXAMIN_MRKT_NM,EXAMIN_AREA_NM,EXAMIN_DE,EXAMIN_AMT,EXAMIN_UNIT
감자,시장마트,서울,2024-01-01,1000,1kg
양파,가락도매시장,서울,20240103,2000,1kg
감자,이마트,부산,2024-01-01,1200,1kg
배추,동네슈퍼,광주,2024-01-02,,1포기
양파,롯데마트,대구,2024-01-03,2500,1kg
감자,시장마트,서울,2024-01-02,900,1kg
양파,홈플러스,대구,2024-01-05,,1kg
양파,롯데마트,대구,2024-01-05,2000,1kg
";

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

/// Encode text the way the upstream file is published.
pub fn cp949(text: &str) -> Vec<u8> {
    let (bytes, _, had_errors) = encoding_rs::EUC_KR.encode(text);
    assert!(!had_errors, "fixture text must be representable in cp949");
    bytes.into_owned()
}

pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, bytes).unwrap();
    path
}

/// Build an offline SDK over `bytes`, with the cache inside the same temp dir.
pub fn build_from_bytes(bytes: &[u8]) -> (Result<ProducePriceSdk>, tempfile::TempDir) {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = write_file(tmp_dir.path(), "prices.csv", bytes);
    let sdk = ProducePriceSdk::builder()
        .source_path(&path)
        .cache_dir(tmp_dir.path().join("cache"))
        .offline(true)
        .build();
    (sdk, tmp_dir)
}

/// Build an offline SDK over cp949-encoded `text`.
pub fn build_from_text(text: &str) -> (Result<ProducePriceSdk>, tempfile::TempDir) {
    build_from_bytes(&cp949(text))
}

/// Create an SDK loaded with [`SAMPLE_CSV`].
///
/// Returns `(ProducePriceSdk, tempfile::TempDir)`. The caller must keep the
/// `TempDir` alive for the duration of the test.
pub fn setup_sample_sdk() -> (ProducePriceSdk, tempfile::TempDir) {
    let (sdk, tmp_dir) = build_from_text(SAMPLE_CSV);
    (sdk.unwrap(), tmp_dir)
}
