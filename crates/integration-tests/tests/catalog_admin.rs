//! Catalog administration: the product management flow end to end.

#![allow(clippy::unwrap_used)]

use rust_decimal_macros::dec;
use velvet_fig_integration_tests::TestContext;
use velvet_fig_storefront::catalog::{NewProduct, ProductPatch};
use velvet_fig_storefront::{StorefrontError, discount_percentage};

fn hoodie() -> NewProduct {
    NewProduct {
        product_name: "Fleece Hoodie".into(),
        category: "Hoodies".into(),
        price: dec!(1000),
        discount: Some(dec!(800)),
        stock: 5,
        description: "Heavyweight fleece.".into(),
        image_urls: vec![],
        sizes: Some(vec!["M".into(), "L".into()]),
    }
}

#[tokio::test]
async fn upload_then_create_then_browse() {
    let ctx = TestContext::new();

    let url = ctx
        .catalog_admin
        .upload_image("hoodie-front.jpg", vec![0xFF, 0xD8, 0xFF])
        .await
        .unwrap();

    let product_id = ctx
        .catalog_admin
        .create(NewProduct {
            image_urls: vec![url.clone()],
            ..hoodie()
        })
        .await
        .unwrap();

    let product = ctx.catalog.get(&product_id).await.unwrap();
    assert_eq!(product.first_image(), Some(url.as_str()));
    assert_eq!(product.effective_price(), dec!(800));
    assert_eq!(discount_percentage(product.price, dec!(800)), 20);

    let listing = ctx.catalog.list().await.unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].0, product_id);
}

#[tokio::test]
async fn managed_edit_set_roundtrip() {
    let ctx = TestContext::new();
    let product_id = ctx.catalog_admin.create(hoodie()).await.unwrap();

    ctx.catalog_admin
        .update(
            &product_id,
            ProductPatch {
                product_name: Some("Fleece Hoodie II".into()),
                price: Some(dec!(1200)),
                discount: Some(Some(dec!(900))),
                stock: Some(8),
                description: Some("Updated cut.".into()),
                category: None,
            },
        )
        .await
        .unwrap();

    let product = ctx.catalog.get(&product_id).await.unwrap();
    assert_eq!(product.product_name, "Fleece Hoodie II");
    assert_eq!(product.price, dec!(1200));
    assert_eq!(product.effective_price(), dec!(900));
    assert_eq!(product.stock, 8);
    assert_eq!(product.category, "Hoodies");
}

#[tokio::test]
async fn pricing_invariants_hold_on_create_and_update() {
    let ctx = TestContext::new();

    // The discount-above-list gap is closed at the boundary
    let err = ctx
        .catalog_admin
        .create(NewProduct {
            discount: Some(dec!(1100)),
            ..hoodie()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StorefrontError::Validation(_)));

    let product_id = ctx.catalog_admin.create(hoodie()).await.unwrap();
    let err = ctx
        .catalog_admin
        .update(
            &product_id,
            ProductPatch {
                discount: Some(Some(dec!(1100))),
                ..ProductPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StorefrontError::Validation(_)));
}

#[tokio::test]
async fn deleting_a_product_orphans_open_carts_but_not_orders() {
    let ctx = TestContext::new();
    let user = ctx.sign_in("u-1");
    let product_id = ctx.catalog_admin.create(hoodie()).await.unwrap();

    ctx.cart
        .add(&user, &product_id, 1, Some("M".into()))
        .await
        .unwrap();
    let placed = ctx
        .checkout
        .buy_now(&user, &product_id, 1, Some("L".into()), "12 Main St")
        .await
        .unwrap();

    ctx.catalog_admin.delete(&product_id).await.unwrap();

    // The open cart line shows a display gap
    let views = ctx.cart.lines_with_images(&user).await.unwrap();
    assert_eq!(views.len(), 1);
    assert!(views[0].product_image.is_none());

    // The historical order keeps its denormalized snapshot
    let order = ctx.orders.get(&user, &placed.id).await.unwrap();
    assert_eq!(order.items[0].product_name, "Fleece Hoodie");
    assert_eq!(order.items[0].price, dec!(800));
}

#[tokio::test]
async fn checkout_rejects_a_cart_whose_only_product_is_gone() {
    let ctx = TestContext::new();
    let user = ctx.sign_in("u-1");
    let product_id = ctx.catalog_admin.create(hoodie()).await.unwrap();
    ctx.cart
        .add(&user, &product_id, 1, Some("M".into()))
        .await
        .unwrap();

    ctx.catalog_admin.delete(&product_id).await.unwrap();

    let mut attempt = ctx.checkout.begin(&user, None).await.unwrap();
    attempt.supply_address("12 Main St").unwrap();
    let err = ctx.checkout.place(&mut attempt).await.unwrap_err();
    assert!(matches!(err, StorefrontError::NotFound(_)));

    // The cart survives for the user to fix up
    assert_eq!(ctx.cart.lines(&user).await.unwrap().len(), 1);
    assert!(ctx.orders.list(&user).await.unwrap().is_empty());
}
