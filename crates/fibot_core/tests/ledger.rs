use std::collections::BTreeMap;

use fibot_core::db;
use fibot_core::domain::NewTransaction;
use fibot_core::ledger::{
    category_totals, count_transactions, insert_transaction, list_transactions, recent_transactions,
    savings_total,
};
use pretty_assertions::assert_eq;

fn new_tx(date: &str, category: &str, amount: f64) -> NewTransaction {
    NewTransaction {
        date: date.to_string(),
        category: category.to_string(),
        amount,
    }
}

#[test]
fn appended_transaction_aggregates_by_category() {
    let mut conn = db::open_in_memory().expect("open");
    db::migrate(&mut conn).expect("migrate");

    insert_transaction(&conn, &new_tx("2024-01-01", "Food", 500.0)).expect("insert");

    let txns = list_transactions(&conn).expect("list");
    let totals = category_totals(&txns);
    assert_eq!(totals, BTreeMap::from([("Food".to_string(), 500.0)]));
}

#[test]
fn empty_ledger_is_not_an_error() {
    let mut conn = db::open_in_memory().expect("open");
    db::migrate(&mut conn).expect("migrate");

    assert!(list_transactions(&conn).expect("list").is_empty());
    assert_eq!(count_transactions(&conn).expect("count"), 0);
    assert_eq!(savings_total(&conn).expect("savings"), 0.0);
}

#[test]
fn lists_newest_date_first_and_limits_recent() {
    let mut conn = db::open_in_memory().expect("open");
    db::migrate(&mut conn).expect("migrate");

    insert_transaction(&conn, &new_tx("2024-01-02", "Bills", 10.0)).unwrap();
    insert_transaction(&conn, &new_tx("2024-03-01", "Travel", 20.0)).unwrap();
    insert_transaction(&conn, &new_tx("2024-01-02", "Food", 30.0)).unwrap();

    let dates_and_cats = list_transactions(&conn)
        .unwrap()
        .into_iter()
        .map(|t| (t.date, t.category))
        .collect::<Vec<_>>();
    assert_eq!(
        dates_and_cats,
        vec![
            ("2024-03-01".to_string(), "Travel".to_string()),
            ("2024-01-02".to_string(), "Food".to_string()),
            ("2024-01-02".to_string(), "Bills".to_string()),
        ]
    );

    let recent = recent_transactions(&conn, 2).unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].category, "Travel");
}

#[test]
fn savings_total_counts_savings_like_categories_only() {
    let mut conn = db::open_in_memory().expect("open");
    db::migrate(&mut conn).expect("migrate");

    insert_transaction(&conn, &new_tx("2024-01-01", "Savings", 1000.0)).unwrap();
    insert_transaction(&conn, &new_tx("2024-01-02", "Investments", 2500.0)).unwrap();
    insert_transaction(&conn, &new_tx("2024-01-03", "Investment", 500.0)).unwrap();
    insert_transaction(&conn, &new_tx("2024-01-04", "Food", 999.0)).unwrap();

    assert_eq!(savings_total(&conn).unwrap(), 4000.0);
}

#[test]
fn invalid_rows_are_rejected_before_write() {
    let mut conn = db::open_in_memory().expect("open");
    db::migrate(&mut conn).expect("migrate");

    let err = insert_transaction(&conn, &new_tx("2024-13-01", "Food", 5.0)).unwrap_err();
    assert_eq!(err.code, "VALIDATION_DATE");
    let err = insert_transaction(&conn, &new_tx("2024-01-01", "Food", -5.0)).unwrap_err();
    assert_eq!(err.code, "VALIDATION_AMOUNT");

    assert_eq!(count_transactions(&conn).unwrap(), 0);
}
