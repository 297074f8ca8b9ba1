//! Multi-route quote aggregation

use alloy::primitives::{Address, U256};
use futures::future::join_all;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use crate::{
    config::Config,
    network::{ChainClient, amounts_out, with_timeout},
    types::{Quote, RouteConfig, RoutedQuote, SwapDirection},
    utils::{NATIVE_DECIMALS, units_to_decimal},
};

pub struct RouteQuoter {
    chain: Arc<dyn ChainClient>,
    routes: Vec<RouteConfig>,
    wrapped_native: Address,
    stable_token: Address,
    stable_decimals: u8,
    call_timeout: Duration,
}

impl RouteQuoter {
    pub fn new(chain: Arc<dyn ChainClient>, config: &Config) -> Self {
        Self {
            chain,
            routes: config.routes.clone(),
            wrapped_native: config.wrapped_native,
            stable_token: config.stable_token,
            stable_decimals: config.stable_decimals,
            call_timeout: config.quote_timeout(),
        }
    }

    pub fn routes(&self) -> &[RouteConfig] {
        &self.routes
    }

    pub fn wrapped_native(&self) -> Address {
        self.wrapped_native
    }

    /// Best output across all routes, or `None` when no route can price the swap.
    pub async fn quote(&self, direction: SwapDirection, amount_in: U256, token: Address) -> Option<Quote> {
        self.best_route(direction, amount_in, token)
            .await
            .map(|routed| routed.quote)
    }

    pub async fn best_route(
        &self,
        direction: SwapDirection,
        amount_in: U256,
        token: Address,
    ) -> Option<RoutedQuote> {
        if amount_in.is_zero() {
            return None;
        }

        let candidates = self
            .routes
            .iter()
            .filter(|route| route.base_pair != token && token != self.wrapped_native)
            .map(|route| self.quote_route(route, direction, amount_in, token));

        select_best(join_all(candidates).await)
    }

    async fn quote_route(
        &self,
        route: &RouteConfig,
        direction: SwapDirection,
        amount_in: U256,
        token: Address,
    ) -> Option<RoutedQuote> {
        let path = route.path(direction, self.wrapped_native, token);
        let amount_out = self.final_amount(route.router, amount_in, path.clone(), &route.key()).await?;

        Some(RoutedQuote {
            quote: Quote {
                amount_out,
                route_key: route.key(),
            },
            route: route.clone(),
            path,
        })
    }

    async fn final_amount(
        &self,
        router: Address,
        amount_in: U256,
        path: Vec<Address>,
        label: &str,
    ) -> Option<U256> {
        let hops = path.len();
        let result = with_timeout(
            "getAmountsOut",
            self.call_timeout,
            amounts_out(self.chain.as_ref(), router, amount_in, path),
        )
        .await;

        match result {
            Ok(amounts) if amounts.len() == hops => {
                amounts.last().copied().filter(|out| !out.is_zero())
            }
            Ok(amounts) => {
                debug!(route = label, returned = amounts.len(), expected = hops, "Malformed getAmountsOut response");
                None
            }
            Err(e) => {
                debug!(route = label, error = %e, "Route excluded");
                None
            }
        }
    }

    /// USD value of one wrapped native unit, quoted into the stablecoin.
    pub async fn native_usd_price(&self) -> Option<Decimal> {
        let one_native = U256::from(10u64).pow(U256::from(NATIVE_DECIMALS));
        let mut routers: Vec<Address> = Vec::new();
        for route in &self.routes {
            if !routers.contains(&route.router) {
                routers.push(route.router);
            }
        }

        let quotes = routers.iter().map(|router| {
            self.final_amount(*router, one_native, vec![self.wrapped_native, self.stable_token], "native/usd")
        });
        let best = join_all(quotes).await.into_iter().flatten().max()?;

        Some(units_to_decimal(best, self.stable_decimals))
    }
}

/// Strictly greatest output wins; on ties the earliest candidate is kept.
pub fn select_best(candidates: Vec<Option<RoutedQuote>>) -> Option<RoutedQuote> {
    let mut best: Option<RoutedQuote> = None;
    for candidate in candidates.into_iter().flatten() {
        let better = match &best {
            Some(current) => candidate.quote.amount_out > current.quote.amount_out,
            None => true,
        };
        if better {
            best = Some(candidate);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    fn routed(label: &str, out: u64) -> Option<RoutedQuote> {
        let route = RouteConfig {
            router_label: label.to_string(),
            router: address!("00000000000000000000000000000000000000aa"),
            base_label: "WETH".to_string(),
            base_pair: address!("00000000000000000000000000000000000000bb"),
        };
        Some(RoutedQuote {
            quote: Quote { amount_out: U256::from(out), route_key: route.key() },
            route,
            path: Vec::new(),
        })
    }

    #[test]
    fn selects_strictly_greatest_output() {
        let best = select_best(vec![routed("a", 100), None, routed("b", 120), routed("c", 110)]).unwrap();
        assert_eq!(best.quote.route_key, "b/WETH");
    }

    #[test]
    fn ties_keep_first_configured_route() {
        let best = select_best(vec![None, routed("a", 50), routed("b", 50)]).unwrap();
        assert_eq!(best.quote.route_key, "a/WETH");
    }

    #[test]
    fn all_failed_routes_yield_none() {
        assert!(select_best(vec![None, None]).is_none());
        assert!(select_best(Vec::new()).is_none());
    }
}
