//! Dashboard report tests: text rendering and JSON shape.

mod common;

use common::date;
use produce_price_sdk::{PriceError, SellerClass, Selection};

#[test]
fn report_bundles_all_views() {
    let (sdk, _tmp) = common::setup_sample_sdk();

    let report = sdk.report(&Selection::new("감자")).unwrap();
    assert_eq!(report.category, "감자");
    assert_eq!(report.start, date(2024, 1, 1));
    assert_eq!(report.end, date(2024, 1, 2));
    assert_eq!(report.stats.max, 1200.0);
    assert_eq!(report.cheapest.seller, "시장마트");
    assert_eq!(report.daily_means.len(), 2);
    assert_eq!(report.seller_classes.len(), 2);
}

#[test]
fn report_text_matches_dashboard_wording() {
    let (sdk, _tmp) = common::setup_sample_sdk();

    let text = sdk.report(&Selection::new("감자")).unwrap().to_string();
    assert!(text.contains("평균 가격: 1033원"), "{}", text);
    assert!(text.contains("최대 가격: 1200원"), "{}", text);
    assert!(text.contains("최소 가격: 900원"), "{}", text);
    assert!(text.contains("가장 저렴하게 판매하는 곳: 시장마트 (지역: 서울)"), "{}", text);
    assert!(text.contains("2024-01-01  1100원"), "{}", text);
    assert!(text.contains("시장  950원"), "{}", text);
    assert!(text.contains("마트  1200원"), "{}", text);
}

#[test]
fn report_serializes_to_json() {
    let (sdk, _tmp) = common::setup_sample_sdk();

    let report = sdk.report(&Selection::new("감자")).unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["category"], "감자");
    assert_eq!(json["start"], "2024-01-01");
    assert_eq!(json["cheapest"]["region"], "서울");
    assert_eq!(json["daily_means"][0]["date"], "2024-01-01");
    assert_eq!(json["daily_means"][0]["mean"], 1100.0);
    assert_eq!(json["seller_classes"]["market-type"], 950.0);
    assert_eq!(json["seller_classes"]["retail-type"], 1200.0);
}

#[test]
fn report_on_empty_selection_is_empty_view() {
    let (sdk, _tmp) = common::setup_sample_sdk();

    let err = sdk.report(&Selection::new("고구마")).unwrap_err();
    assert!(matches!(err, PriceError::EmptyView { .. }));
}

#[test]
fn report_on_bad_range_is_invalid_range() {
    let (sdk, _tmp) = common::setup_sample_sdk();

    let err = sdk
        .report(
            &Selection::new("감자")
                .start(date(2024, 1, 2))
                .end(date(2024, 1, 1)),
        )
        .unwrap_err();
    assert!(matches!(err, PriceError::InvalidRange { .. }));
}

#[test]
fn seller_class_labels() {
    assert_eq!(SellerClass::Market.to_string(), "market-type");
    assert_eq!(SellerClass::Retail.to_string(), "retail-type");
    assert_eq!(SellerClass::Market.label(), "시장");
    assert_eq!(SellerClass::Retail.label(), "마트");
}
