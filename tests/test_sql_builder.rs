//! Unit tests for the SqlBuilder query construction.

use produce_price_sdk::SqlBuilder;

// ---------------------------------------------------------------------------
// Basic construction
// ---------------------------------------------------------------------------

#[test]
fn new_creates_select_star_from_table() {
    let (sql, params) = SqlBuilder::new("price_records").build();
    assert_eq!(sql, "SELECT *\nFROM price_records");
    assert!(params.is_empty());
}

#[test]
fn select_replaces_default_star() {
    let (sql, _) = SqlBuilder::new("price_records")
        .select(&["seller", "amount"])
        .build();
    assert!(sql.starts_with("SELECT seller, amount\n"));
}

// ---------------------------------------------------------------------------
// WHERE conditions
// ---------------------------------------------------------------------------

#[test]
fn where_eq_adds_equality_with_param() {
    let (sql, params) = SqlBuilder::new("price_records")
        .where_eq("category", "감자")
        .build();
    assert!(sql.contains("WHERE category = ?"));
    assert_eq!(params, vec!["감자"]);
}

#[test]
fn multiple_conditions_are_and_joined() {
    let (sql, params) = SqlBuilder::new("price_records")
        .where_eq("category", "감자")
        .where_eq("region", "서울")
        .build();
    assert!(sql.contains("WHERE category = ? AND region = ?"));
    assert_eq!(params, vec!["감자", "서울"]);
}

#[test]
fn values_are_never_interpolated() {
    let (sql, params) = SqlBuilder::new("price_records")
        .where_eq("seller", "'; DROP TABLE price_records; --")
        .build();
    assert!(!sql.contains("DROP"));
    assert_eq!(params.len(), 1);
}

// ---------------------------------------------------------------------------
// GROUP BY / ORDER BY
// ---------------------------------------------------------------------------

#[test]
fn group_by_and_order_by() {
    let (sql, _) = SqlBuilder::new("price_records")
        .select(&["category", "MIN(row_id) AS first_row"])
        .group_by(&["category"])
        .order_by(&["first_row ASC"])
        .build();
    assert_eq!(
        sql,
        "SELECT category, MIN(row_id) AS first_row\nFROM price_records\nGROUP BY category\nORDER BY first_row ASC"
    );
}

#[test]
fn clause_order_is_where_group_order() {
    let (sql, _) = SqlBuilder::new("price_records")
        .order_by(&["row_id ASC"])
        .group_by(&["category"])
        .where_eq("category", "x")
        .build();
    let w = sql.find("WHERE").unwrap();
    let g = sql.find("GROUP BY").unwrap();
    let o = sql.find("ORDER BY").unwrap();
    assert!(w < g && g < o);
}
