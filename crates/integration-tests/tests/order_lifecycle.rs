//! Order status lifecycle and the admin order board.

#![allow(clippy::unwrap_used)]

use rust_decimal_macros::dec;
use velvet_fig_core::OrderStatus;
use velvet_fig_integration_tests::TestContext;
use velvet_fig_storefront::StorefrontError;
use velvet_fig_storefront::catalog::NewProduct;

fn scarf() -> NewProduct {
    NewProduct {
        product_name: "Wool Scarf".into(),
        category: "Accessories".into(),
        price: dec!(250),
        discount: None,
        stock: 20,
        description: String::new(),
        image_urls: vec![],
        sizes: None,
    }
}

#[tokio::test]
async fn status_walks_the_strict_lifecycle() {
    let ctx = TestContext::new();
    let user = ctx.sign_in("u-1");
    let product_id = ctx.catalog_admin.create(scarf()).await.unwrap();
    let placed = ctx
        .checkout
        .buy_now(&user, &product_id, 1, None, "12 Main St")
        .await
        .unwrap();

    ctx.orders
        .set_status(&user.id, &placed.id, OrderStatus::Delivered)
        .await
        .unwrap();
    assert_eq!(
        ctx.orders.get(&user, &placed.id).await.unwrap().status,
        OrderStatus::Delivered
    );

    ctx.orders
        .set_status(&user.id, &placed.id, OrderStatus::Completed)
        .await
        .unwrap();
    assert_eq!(
        ctx.orders.get(&user, &placed.id).await.unwrap().status,
        OrderStatus::Completed
    );
}

#[tokio::test]
async fn backward_and_skip_transitions_are_rejected() {
    let ctx = TestContext::new();
    let user = ctx.sign_in("u-1");
    let product_id = ctx.catalog_admin.create(scarf()).await.unwrap();
    let placed = ctx
        .checkout
        .buy_now(&user, &product_id, 1, None, "12 Main St")
        .await
        .unwrap();

    // pending -> completed skips delivery
    let err = ctx
        .orders
        .set_status(&user.id, &placed.id, OrderStatus::Completed)
        .await
        .unwrap_err();
    assert!(matches!(err, StorefrontError::InvalidTransition { .. }));

    ctx.orders
        .set_status(&user.id, &placed.id, OrderStatus::Delivered)
        .await
        .unwrap();
    ctx.orders
        .set_status(&user.id, &placed.id, OrderStatus::Completed)
        .await
        .unwrap();

    // completed is terminal
    let err = ctx
        .orders
        .set_status(&user.id, &placed.id, OrderStatus::Pending)
        .await
        .unwrap_err();
    assert!(matches!(err, StorefrontError::InvalidTransition { .. }));

    // The rejected writes changed nothing
    assert_eq!(
        ctx.orders.get(&user, &placed.id).await.unwrap().status,
        OrderStatus::Completed
    );
}

#[tokio::test]
async fn status_update_preserves_the_snapshot() {
    let ctx = TestContext::new();
    let user = ctx.sign_in("u-1");
    let product_id = ctx.catalog_admin.create(scarf()).await.unwrap();
    let placed = ctx
        .checkout
        .buy_now(&user, &product_id, 2, None, "12 Main St")
        .await
        .unwrap();

    ctx.orders
        .set_status(&user.id, &placed.id, OrderStatus::Delivered)
        .await
        .unwrap();

    let order = ctx.orders.get(&user, &placed.id).await.unwrap();
    assert_eq!(order.final_total, dec!(500));
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.recomputed_total(), order.final_total);
}

#[tokio::test]
async fn admin_board_lists_orders_across_users() {
    let ctx = TestContext::new();
    let product_id = ctx.catalog_admin.create(scarf()).await.unwrap();

    let asha = ctx.sign_in("u-asha");
    let first = ctx
        .checkout
        .buy_now(&asha, &product_id, 1, None, "12 Main St")
        .await
        .unwrap();

    let ravi = ctx.sign_in("u-ravi");
    let second = ctx
        .checkout
        .buy_now(&ravi, &product_id, 2, None, "9 Oak Ave")
        .await
        .unwrap();

    let board = ctx.orders.list_all().await.unwrap();
    assert_eq!(board.len(), 2);

    let ids: Vec<_> = board.iter().map(|(_, id, _)| id.clone()).collect();
    assert!(ids.contains(&first.id));
    assert!(ids.contains(&second.id));

    let users: Vec<_> = board.iter().map(|(uid, _, _)| uid.as_str()).collect();
    assert!(users.contains(&"u-asha"));
    assert!(users.contains(&"u-ravi"));
}

#[tokio::test]
async fn missing_order_is_not_found() {
    let ctx = TestContext::new();
    let user = ctx.sign_in("u-1");

    let err = ctx
        .orders
        .get(&user, &velvet_fig_core::OrderId::new("nope"))
        .await
        .unwrap_err();
    assert!(matches!(err, StorefrontError::NotFound(_)));

    let err = ctx
        .orders
        .set_status(
            &user.id,
            &velvet_fig_core::OrderId::new("nope"),
            OrderStatus::Delivered,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StorefrontError::NotFound(_)));
}
