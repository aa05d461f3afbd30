use crate::common::*;

use keyshop::error::AppError;

fn sell(conn: &rusqlite::Connection, license: &License, customer: &Customer) -> Sale {
    let sale = queries::create_sale(
        conn,
        &CreateSale {
            license_id: license.id,
            customer_id: customer.id,
            amount: license.price,
            status: SaleStatus::Active,
        },
    )
    .unwrap();
    queries::mark_license_sold(conn, license.id).unwrap();
    sale
}

#[test]
fn test_revenue_is_zero_when_empty() {
    let (_dir, pool) = test_pool();
    let conn = pool.get().unwrap();
    assert_eq!(queries::total_active_revenue(&conn).unwrap(), Money::ZERO);
}

#[test]
fn test_revenue_counts_only_active_sales() {
    let (_dir, pool) = test_pool();
    let mut conn = pool.get().unwrap();
    let licenses = add_licenses(&mut conn, "Pro-2", &["K-1", "K-2"], "100.00");
    let cheap = add_licenses(&mut conn, "Lite", &["K-3"], "19.99");
    let customer =
        queries::find_or_create_customer(&conn, &CreateCustomer::new("a@x.com", "Ann")).unwrap();

    let first = sell(&conn, &licenses[0], &customer);
    sell(&conn, &licenses[1], &customer);
    sell(&conn, &cheap[0], &customer);
    assert_eq!(
        queries::total_active_revenue(&conn).unwrap(),
        Money::from_cents(21_999)
    );

    assert!(queries::set_sale_status(&conn, first.id, SaleStatus::Deactivated).unwrap());
    assert_eq!(
        queries::total_active_revenue(&conn).unwrap(),
        Money::from_cents(11_999)
    );
}

#[test]
fn test_sale_amount_is_captured_at_sale_time() {
    let (_dir, pool) = test_pool();
    let mut conn = pool.get().unwrap();
    let licenses = add_licenses(&mut conn, "Pro-2", &["K-1"], "100.00");
    let customer =
        queries::find_or_create_customer(&conn, &CreateCustomer::new("a@x.com", "Ann")).unwrap();
    let sale = sell(&conn, &licenses[0], &customer);

    conn.execute(
        "UPDATE licenses SET price_cents = 5000 WHERE id = ?1",
        rusqlite::params![licenses[0].id],
    )
    .unwrap();

    let stored = queries::get_sale_by_id(&conn, sale.id).unwrap().unwrap();
    assert_eq!(stored.amount, Money::from_cents(10_000));
    assert_eq!(
        queries::total_active_revenue(&conn).unwrap(),
        Money::from_cents(10_000)
    );
}

#[test]
fn test_second_sale_for_same_license_conflicts() {
    let (_dir, pool) = test_pool();
    let mut conn = pool.get().unwrap();
    let licenses = add_licenses(&mut conn, "Pro-2", &["K-1"], "1");
    let customer =
        queries::find_or_create_customer(&conn, &CreateCustomer::new("a@x.com", "Ann")).unwrap();
    sell(&conn, &licenses[0], &customer);

    let err = queries::create_sale(
        &conn,
        &CreateSale {
            license_id: licenses[0].id,
            customer_id: customer.id,
            amount: licenses[0].price,
            status: SaleStatus::Active,
        },
    )
    .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[test]
fn test_list_recent_joins_and_limits() {
    let (_dir, pool) = test_pool();
    let mut conn = pool.get().unwrap();
    let licenses = add_licenses(&mut conn, "Pro-2", &["K-1", "K-2", "K-3"], "10");
    let ann =
        queries::find_or_create_customer(&conn, &CreateCustomer::new("a@x.com", "Ann")).unwrap();
    let bo = CreateCustomer::new("b@x.com", "Bo");
    let bo = queries::find_or_create_customer(&conn, &bo).unwrap();

    sell(&conn, &licenses[0], &ann);
    sell(&conn, &licenses[1], &bo);
    let last = sell(&conn, &licenses[2], &ann);

    let recent = queries::list_recent_sales(&conn, 2).unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].sale.id, last.id);
    assert_eq!(recent[0].license.license_key, "K-3");
    assert_eq!(recent[0].customer.name, "Ann");
    assert_eq!(recent[1].customer.name, "Bo");

    assert_eq!(queries::list_sales(&conn).unwrap().len(), 3);
    assert_eq!(
        queries::list_sales_for_customer_email(&conn, "a@x.com")
            .unwrap()
            .len(),
        2
    );
}
