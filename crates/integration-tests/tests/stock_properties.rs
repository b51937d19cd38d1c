//! Property tests: arbitrary order sequences keep stock consistent.

#![allow(clippy::unwrap_used)]

use proptest::prelude::*;

use souk_core::{OrderError, PlaceOrderRequest, ProductId, RequestedLineItem};
use souk_integration_tests::Shop;

fn request(shop: &Shop, lines: &[(ProductId, i64)]) -> PlaceOrderRequest {
    PlaceOrderRequest {
        delivery_type: Some("DESK".to_string()),
        delivery_city_id: Some(shop.city.as_i32()),
        delivery_desk_id: Some(shop.desk.as_i32()),
        order_items: Some(
            lines
                .iter()
                .map(|&(product_id, quantity)| RequestedLineItem {
                    product_id: Some(product_id.as_i32()),
                    quantity: Some(quantity),
                    size: None,
                    price: Some(souk_core::Price::from_cents(500)),
                })
                .collect(),
        ),
        ..PlaceOrderRequest::default()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Replays orders sequentially against a simple model of two counters.
    /// An order succeeds exactly when every counter covers it, and stock
    /// never goes below zero.
    #[test]
    fn prop_stock_never_negative(
        initial in (0i32..15, 0i32..15),
        orders in prop::collection::vec(
            prop::collection::vec((0usize..2, 1i64..6), 1..4),
            1..25,
        ),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let shop = Shop::new(initial.0, initial.1);
        let state = shop.state();
        let products = [shop.headphones, shop.shirt];
        let mut model = [i64::from(initial.0), i64::from(initial.1)];

        for order in &orders {
            let lines: Vec<(ProductId, i64)> = order
                .iter()
                .map(|&(index, quantity)| (products[index], quantity))
                .collect();

            let mut wanted = [0i64; 2];
            for &(index, quantity) in order {
                wanted[index] += quantity;
            }
            let fits = wanted.iter().zip(&model).all(|(want, have)| want <= have);

            let result = runtime.block_on(state.orders().place_order(request(&shop, &lines)));
            match result {
                Ok(_) => {
                    prop_assert!(fits);
                    for (have, want) in model.iter_mut().zip(wanted) {
                        *have -= want;
                    }
                }
                Err(OrderError::InsufficientStock { .. }) => prop_assert!(!fits),
                Err(other) => prop_assert!(false, "unexpected error: {other}"),
            }

            for (product, expected) in products.iter().zip(model) {
                let stock = shop.store.stock(*product).unwrap();
                prop_assert!(stock >= 0);
                prop_assert_eq!(i64::from(stock), expected);
            }
        }
    }
}
