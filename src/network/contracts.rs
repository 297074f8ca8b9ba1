//! Router and ERC-20 bindings plus typed read helpers

use alloy::{
    primitives::{Address, U256},
    sol,
    sol_types::{SolCall, SolType, SolValue},
};
use crate::errors::{EngineError, EngineResult};
use super::ChainClient;

sol! {
    interface IUniswapV2Router02 {
        function getAmountsOut(uint256 amountIn, address[] calldata path) external view returns (uint256[] memory amounts);
        function swapExactETHForTokensSupportingFeeOnTransferTokens(uint256 amountOutMin, address[] calldata path, address to, uint256 deadline) external payable;
        function swapExactTokensForETHSupportingFeeOnTransferTokens(uint256 amountIn, uint256 amountOutMin, address[] calldata path, address to, uint256 deadline) external;
    }
}

sol! {
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function totalSupply() external view returns (uint256);
        function decimals() external view returns (uint8);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 value) external returns (bool);
    }
}

async fn read<C, T>(
    chain: &dyn ChainClient,
    contract: Address,
    call: C,
    what: &str,
) -> EngineResult<T>
where
    C: SolCall,
    T: SolValue + From<<T::SolType as SolType>::RustType>,
{
    let result = chain.call(contract, call.abi_encode().into()).await?;
    T::abi_decode(&result, true).map_err(|e| EngineError::Contract {
        contract,
        message: format!("Failed to decode {}", what),
        source: e.into(),
    })
}

pub async fn token_balance(chain: &dyn ChainClient, token: Address, owner: Address) -> EngineResult<U256> {
    read(chain, token, IERC20::balanceOfCall { account: owner }, "balanceOf").await
}

/// `uint8` has no `SolValue` impl, so this decodes through the call's return type.
pub async fn token_decimals(chain: &dyn ChainClient, token: Address) -> EngineResult<u8> {
    let result = chain.call(token, IERC20::decimalsCall {}.abi_encode().into()).await?;
    IERC20::decimalsCall::abi_decode_returns(&result, true)
        .map(|ret| ret._0)
        .map_err(|e| EngineError::Contract {
            contract: token,
            message: "Failed to decode decimals".to_string(),
            source: e.into(),
        })
}

pub async fn total_supply(chain: &dyn ChainClient, token: Address) -> EngineResult<U256> {
    read(chain, token, IERC20::totalSupplyCall {}, "totalSupply").await
}

pub async fn allowance(
    chain: &dyn ChainClient,
    token: Address,
    owner: Address,
    spender: Address,
) -> EngineResult<U256> {
    read(chain, token, IERC20::allowanceCall { owner, spender }, "allowance").await
}

pub async fn amounts_out(
    chain: &dyn ChainClient,
    router: Address,
    amount_in: U256,
    path: Vec<Address>,
) -> EngineResult<Vec<U256>> {
    read(
        chain,
        router,
        IUniswapV2Router02::getAmountsOutCall { amountIn: amount_in, path },
        "getAmountsOut",
    )
    .await
}
