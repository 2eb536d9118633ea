// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! ERC-20 calldata encoding.

use alloy::primitives::{Address, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

// Define the ERC-20 interface using alloy's sol! macro
sol! {
    interface IERC20 {
        function transfer(address to, uint256 amount) external returns (bool);
    }
}

/// ABI-encode a `transfer(to, amount)` call.
pub fn encode_transfer(to: Address, amount: U256) -> Vec<u8> {
    IERC20::transferCall { to, amount }.abi_encode()
}
