mod common;

use alloy::primitives::{U256, address};
use rust_decimal_macros::dec;
use std::sync::Arc;
use swap_engine::{network::ChainClient, routing::RouteQuoter, types::{RouteConfig, SwapDirection}};
use common::*;

fn quoter(chain: &Arc<FakeChain>) -> RouteQuoter {
    let chain: Arc<dyn ChainClient> = chain.clone();
    RouteQuoter::new(chain, &config())
}

#[tokio::test]
async fn best_quote_is_the_maximum_across_routes() {
    let chain = FakeChain::new();
    chain.set_quote(ROUTER_A, WETH, TOKEN, ether(100));
    chain.set_quote(ROUTER_B, WETH, TOKEN, ether(120));

    let quote = quoter(&chain)
        .quote(SwapDirection::NativeToToken, ether(1), TOKEN)
        .await
        .unwrap();

    assert_eq!(quote.amount_out, ether(120));
    assert_eq!(quote.route_key, "b/WETH");
}

#[tokio::test]
async fn failing_routes_are_excluded() {
    let chain = FakeChain::new();
    // Only router A knows the reverse path.
    chain.set_quote(ROUTER_A, TOKEN, WETH, milli(2));

    let routed = quoter(&chain)
        .best_route(SwapDirection::TokenToNative, ether(1), TOKEN)
        .await
        .unwrap();

    assert_eq!(routed.quote.route_key, "a/WETH");
    assert_eq!(routed.path, vec![TOKEN, WETH]);
}

#[tokio::test]
async fn all_routes_failing_yields_none() {
    let chain = FakeChain::new();
    let quoter = quoter(&chain);

    assert!(quoter.quote(SwapDirection::NativeToToken, ether(1), TOKEN).await.is_none());
    assert!(quoter.quote(SwapDirection::TokenToNative, ether(1), TOKEN).await.is_none());
}

#[tokio::test]
async fn zero_outputs_and_zero_inputs_are_not_prices() {
    let chain = FakeChain::new();
    chain.set_quote(ROUTER_A, WETH, TOKEN, U256::ZERO);
    chain.set_quote(ROUTER_B, WETH, TOKEN, ether(5));
    let quoter = quoter(&chain);

    let quote = quoter.quote(SwapDirection::NativeToToken, ether(1), TOKEN).await.unwrap();
    assert_eq!(quote.route_key, "b/WETH");
    assert!(quoter.quote(SwapDirection::NativeToToken, U256::ZERO, TOKEN).await.is_none());
}

#[tokio::test]
async fn non_native_base_adds_a_hop() {
    let chain = FakeChain::new();
    let usdc_route = RouteConfig {
        router_label: "a".to_string(),
        router: ROUTER_A,
        base_label: "USDC".to_string(),
        base_pair: USDC,
    };
    assert_eq!(
        usdc_route.path(SwapDirection::NativeToToken, WETH, TOKEN),
        vec![WETH, USDC, TOKEN]
    );

    let mut config = config();
    config.routes.push(usdc_route);
    chain.set_quote(ROUTER_A, WETH, TOKEN, ether(10));
    let chain_dyn: Arc<dyn ChainClient> = chain.clone();
    let quoter = RouteQuoter::new(chain_dyn, &config);

    // Both router A routes match the (first, last) key; the earlier one wins the tie.
    let routed = quoter.best_route(SwapDirection::NativeToToken, ether(1), TOKEN).await.unwrap();
    assert_eq!(routed.quote.route_key, "a/WETH");
}

#[tokio::test]
async fn native_usd_price_uses_best_router() {
    let chain = FakeChain::new();
    chain.set_quote(ROUTER_A, WETH, USDC, U256::from(3_000_000_000u64));
    chain.set_quote(ROUTER_B, WETH, USDC, U256::from(3_010_500_000u64));

    assert_eq!(quoter(&chain).native_usd_price().await, Some(dec!(3010.5)));
}

#[tokio::test]
async fn quoting_the_wrapped_native_itself_is_unpriced() {
    let chain = FakeChain::new();
    chain.set_quote(ROUTER_A, WETH, WETH, ether(1));
    let other = address!("9999999999999999999999999999999999999999");

    let quoter = quoter(&chain);
    assert!(quoter.quote(SwapDirection::NativeToToken, ether(1), WETH).await.is_none());
    assert!(quoter.quote(SwapDirection::NativeToToken, ether(1), other).await.is_none());
}
