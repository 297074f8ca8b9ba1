//! Route and quote types

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Which way value flows through the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwapDirection {
    NativeToToken,
    TokenToNative,
}

/// A router contract paired with the base token used as the other leg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteConfig {
    pub router_label: String,
    pub router: Address,
    pub base_label: String,
    pub base_pair: Address,
}

impl RouteConfig {
    pub fn key(&self) -> String {
        format!("{}/{}", self.router_label, self.base_label)
    }

    /// Full swap path for this route. Routing through a non-native base adds a hop.
    pub fn path(&self, direction: SwapDirection, wrapped_native: Address, token: Address) -> Vec<Address> {
        let mut path = vec![wrapped_native];
        if self.base_pair != wrapped_native {
            path.push(self.base_pair);
        }
        path.push(token);

        if direction == SwapDirection::TokenToNative {
            path.reverse();
        }
        path
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub amount_out: U256,
    pub route_key: String,
}

/// A quote together with the route that produced it.
#[derive(Debug, Clone)]
pub struct RoutedQuote {
    pub quote: Quote,
    pub route: RouteConfig,
    pub path: Vec<Address>,
}
