mod common;

use alloy::primitives::U256;
use rust_decimal_macros::dec;
use swap_engine::{
    EngineError,
    execution::TradeRequest,
    storage::TradeLog,
    types::{GasEnvelope, TradeSide, TradeStatus},
};
use common::*;

fn request(h: &Harness, side: TradeSide, amount_in: U256) -> TradeRequest {
    TradeRequest {
        user_id: USER,
        wallet: h.wallet.clone(),
        side,
        token: TOKEN,
        amount_in,
        min_amount_out: U256::ZERO,
        extra_gas_percent: 0.0,
    }
}

fn envelope() -> GasEnvelope {
    GasEnvelope {
        max_priority_fee_per_gas: 1_000_000_000,
        max_fee_per_gas: 10_000_000_000,
        gas_limit: 300_000,
    }
}

#[tokio::test]
async fn buy_executes_against_the_better_router() {
    let h = harness().await;
    h.chain.set_native_balance(h.wallet.address, ether(5));
    h.chain.set_quote(ROUTER_A, WETH, TOKEN, ether(100));
    h.chain.set_quote(ROUTER_B, WETH, TOKEN, ether(120));

    let ticket = h.trader.submit(&request(&h, TradeSide::Buy, ether(1))).await.unwrap();

    assert_eq!(ticket.submission.route_key, "b/WETH");
    assert_eq!(ticket.submission.router, ROUTER_B);

    let sent = h.chain.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].to, Some(ROUTER_B));
    assert_eq!(sent[0].value, ether(1));
    assert_eq!(sent[0].hash, ticket.submission.tx_hash);
    // First buy of a token pre-approves the router on the following nonce.
    assert!(sent[1].is_approval());
    assert_eq!(sent[1].to, Some(TOKEN));
    assert_eq!(sent[1].nonce, sent[0].nonce + 1);
    assert_eq!(ticket.submission.approval_tx, Some(sent[1].hash));

    let trades = h.trades.trades_for(USER, TOKEN).await.unwrap();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].route_key, "b/WETH");
    assert_eq!(trades[0].native_amount_wei, ether(1));
    assert_eq!(trades[0].token_amount_wei, ether(120));
}

#[tokio::test]
async fn confirmation_settles_the_pending_trade() {
    let h = harness().await;
    h.chain.set_native_balance(h.wallet.address, ether(5));
    h.chain.set_quote(ROUTER_A, WETH, TOKEN, ether(500));

    let ticket = h.trader.submit(&request(&h, TradeSide::Buy, ether(1))).await.unwrap();
    assert_eq!(ticket.trade.as_ref().unwrap().status, TradeStatus::Pending);

    let (trades, notifier) = (&h.trades, &h.notifier);
    let settled = eventually(|| async move {
        trades.trades_for(USER, TOKEN).await.unwrap()[0].status == TradeStatus::Confirmed
    })
    .await;
    assert!(settled);
    assert!(eventually(|| async move { notifier.containing("confirmed") == 1 }).await);

    let basis = h.ledger.average_entry(USER, TOKEN, 18).await.unwrap().unwrap();
    assert_eq!(basis.avg_native_per_token, dec!(0.002));
}

#[tokio::test]
async fn reverted_trades_are_reported_and_leave_the_basis() {
    let mut h = harness().await;
    h.chain.set_native_balance(h.wallet.address, ether(5));
    h.chain.set_quote(ROUTER_A, WETH, TOKEN, ether(500));
    h.chain.revert_all(true);

    let ticket = h.trader.submit(&request(&h, TradeSide::Buy, ether(1))).await.unwrap();

    let failure = h.failures.recv().await.unwrap();
    assert_eq!(failure.job.tx_hash, ticket.submission.tx_hash);
    assert!(matches!(failure.error, EngineError::Reverted { .. }));

    let trades = h.trades.trades_for(USER, TOKEN).await.unwrap();
    assert_eq!(trades[0].status, TradeStatus::Reverted);
    assert!(h.ledger.average_entry(USER, TOKEN, 18).await.unwrap().is_none());
    assert_eq!(h.notifier.containing("reverted"), 1);
}

#[tokio::test]
async fn short_balance_fails_before_anything_is_sent() {
    let h = harness().await;
    h.chain.set_native_balance(h.wallet.address, milli(500));
    h.chain.set_quote(ROUTER_A, WETH, TOKEN, ether(100));

    let err = h.trader.submit(&request(&h, TradeSide::Buy, ether(1))).await.unwrap_err();
    assert!(matches!(err, EngineError::InsufficientBalance { .. }));
    assert!(h.chain.sent().is_empty());
    assert!(h.trades.trades_for(USER, TOKEN).await.unwrap().is_empty());
}

#[tokio::test]
async fn unpriced_tokens_fail_with_no_liquidity() {
    let h = harness().await;
    h.chain.set_native_balance(h.wallet.address, ether(5));

    let err = h.trader.submit(&request(&h, TradeSide::Buy, ether(1))).await.unwrap_err();
    assert!(matches!(err, EngineError::NoLiquidity { token } if token == TOKEN));
}

#[tokio::test]
async fn first_sell_sends_approval_ahead_of_the_swap() {
    let h = harness().await;
    h.chain.set_token_balance(TOKEN, h.wallet.address, ether(500));
    h.chain.set_quote(ROUTER_A, TOKEN, WETH, milli(900));

    let ticket = h.trader.submit(&request(&h, TradeSide::Sell, ether(500))).await.unwrap();

    let sent = h.chain.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].is_approval());
    assert_eq!(sent[1].to, Some(ROUTER_A));
    assert_eq!(sent[1].value, U256::ZERO);
    assert_eq!(sent[1].nonce, sent[0].nonce + 1);
    assert_eq!(sent[1].hash, ticket.submission.tx_hash);

    let trades = h.trades.trades_for(USER, TOKEN).await.unwrap();
    assert_eq!(trades[0].side, TradeSide::Sell);
    assert_eq!(trades[0].token_amount_wei, ether(500));
    assert_eq!(trades[0].native_amount_wei, milli(900));

    // Second sell through the same router needs no new approval.
    h.chain.set_token_balance(TOKEN, h.wallet.address, ether(10));
    h.trader.submit(&request(&h, TradeSide::Sell, ether(10))).await.unwrap();
    assert_eq!(h.chain.sent().iter().filter(|tx| tx.is_approval()).count(), 1);
}

#[tokio::test]
async fn rejected_submission_surfaces_as_submission_failed() {
    let h = harness().await;
    h.chain.set_native_balance(h.wallet.address, ether(5));
    h.chain.set_quote(ROUTER_A, WETH, TOKEN, ether(100));
    h.chain.reject_sends(true);

    let err = h.trader.submit(&request(&h, TradeSide::Buy, ether(1))).await.unwrap_err();
    assert!(matches!(err, EngineError::SubmissionFailed { .. }));
    assert!(h.trades.trades_for(USER, TOKEN).await.unwrap().is_empty());
}

#[tokio::test]
async fn explicit_allowance_checks() {
    let h = harness().await;
    let executor = h.trader.executor();

    let err = executor
        .require_allowance(h.wallet.address, TOKEN, ROUTER_A, ether(1))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ApprovalRequired { required, .. } if required == ether(1)));

    let approval = executor
        .ensure_approval(&h.signer, TOKEN, ROUTER_A, ether(1), &envelope())
        .await
        .unwrap();
    assert!(approval.is_some());
    assert!(h.chain.sent()[0].is_approval());

    h.chain.set_allowance(TOKEN, h.wallet.address, ROUTER_B, U256::MAX);
    let approval = executor
        .ensure_approval(&h.signer, TOKEN, ROUTER_B, ether(1), &envelope())
        .await
        .unwrap();
    assert!(approval.is_none());
    assert_eq!(h.chain.sent().len(), 1);
    executor.require_allowance(h.wallet.address, TOKEN, ROUTER_B, ether(1)).await.unwrap();
}

#[tokio::test]
async fn failed_explicit_approval_leaves_the_next_sell_to_approve() {
    let h = harness().await;
    h.chain.set_token_balance(TOKEN, h.wallet.address, ether(10));
    h.chain.set_quote(ROUTER_A, TOKEN, WETH, milli(20));

    h.chain.reject_sends(true);
    let executor = h.trader.executor();
    assert!(executor
        .ensure_approval(&h.signer, TOKEN, ROUTER_A, ether(10), &envelope())
        .await
        .is_err());
    h.chain.reject_sends(false);

    let ticket = h.trader.submit(&request(&h, TradeSide::Sell, ether(10))).await.unwrap();

    let sent = h.chain.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].is_approval());
    assert_eq!(sent[0].to, Some(TOKEN));
    assert_eq!(sent[1].hash, ticket.submission.tx_hash);
}
