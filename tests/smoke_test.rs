//! Smoke test against the published price file.
//!
//! Downloads the real CSV and runs every pipeline stage over each product.
//!
//! Run with:
//! ```sh
//! cargo test --test smoke_test -- --ignored --nocapture
//! ```

use produce_price_sdk::{PriceError, ProducePriceSdk, Selection};

#[test]
#[ignore]
fn full_pipeline_over_published_data() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let sdk = ProducePriceSdk::builder()
        .cache_dir(tmp_dir.path())
        .build()
        .expect("published price file should load");
    eprintln!("{}", sdk);

    let categories = sdk.records().distinct_categories().unwrap();
    assert!(!categories.is_empty());
    let total: usize = sdk.records().count().unwrap();
    let mut seen = 0;

    for category in &categories {
        let view = sdk.select(&Selection::new(category)).unwrap();
        seen += view.len();
        match sdk.report(&Selection::new(category)) {
            Ok(report) => {
                assert!(report.stats.min <= report.stats.mean);
                assert!(report.stats.mean <= report.stats.max);
                assert!(report.seller_classes.len() <= 2);
                eprintln!("{}", report);
            }
            Err(PriceError::EmptyView { .. }) => eprintln!("{}: no priced rows", category),
            Err(e) => panic!("{}: {}", category, e),
        }
    }
    assert_eq!(seen, total);

    // A second load reuses the cached download
    let again = ProducePriceSdk::builder()
        .cache_dir(tmp_dir.path())
        .build()
        .unwrap();
    assert_eq!(again.records().count().unwrap(), total);
    assert!(!again.refresh().unwrap());
}
