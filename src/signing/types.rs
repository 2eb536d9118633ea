// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Settlement-chain types and constants.

use alloy::primitives::U256;

use super::SignerError;

/// Settlement network configuration.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    /// Network name for display
    pub name: &'static str,
    /// Chain ID
    pub chain_id: u64,
}

/// Avalanche C-Chain Mainnet configuration.
pub const AVAX_MAINNET: ChainConfig = ChainConfig {
    name: "Avalanche C-Chain",
    chain_id: 43114,
};

/// Avalanche Fuji Testnet configuration.
pub const AVAX_FUJI: ChainConfig = ChainConfig {
    name: "Avalanche Fuji Testnet",
    chain_id: 43113,
};

/// Fee parameters for one transaction.
///
/// Gas prices come from the host (which has the RPC connection); the
/// defaults below match typical C-Chain conditions and exist so a
/// degraded host can still produce a broadcastable transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeePolicy {
    /// Gas limit
    pub gas_limit: u64,
    /// Max fee per gas in wei (base fee headroom + tip)
    pub max_fee_per_gas: u128,
    /// Max priority fee per gas in wei (tip)
    pub max_priority_fee_per_gas: u128,
}

/// Default base fee assumption: 25 gwei.
const DEFAULT_BASE_FEE: u128 = 25_000_000_000;

/// Standard priority fee: 1.5 gwei.
const DEFAULT_PRIORITY_FEE: u128 = 1_500_000_000;

impl FeePolicy {
    /// Defaults for a native transfer.
    ///
    /// Max fee = 2 * base fee + priority fee (allows for base fee increase).
    pub fn standard() -> Self {
        Self {
            gas_limit: 21_000,
            max_fee_per_gas: DEFAULT_BASE_FEE * 2 + DEFAULT_PRIORITY_FEE,
            max_priority_fee_per_gas: DEFAULT_PRIORITY_FEE,
        }
    }

    /// Defaults for an ERC-20 transfer.
    pub fn token_standard() -> Self {
        Self {
            gas_limit: 65_000,
            ..Self::standard()
        }
    }

    /// Worst-case fee cost in wei.
    pub fn max_cost(&self) -> U256 {
        U256::from(self.gas_limit) * U256::from(self.max_fee_per_gas)
    }
}

/// Known ERC-20 tokens on the settlement chain.
#[derive(Debug, Clone)]
pub struct Erc20Token {
    pub symbol: &'static str,
    pub name: &'static str,
    pub decimals: u8,
    /// Mainnet contract address
    pub mainnet_address: Option<&'static str>,
    /// Fuji testnet contract address
    pub fuji_address: Option<&'static str>,
}

/// Tokenized gold (`bXAU`).
pub const BXAU_TOKEN: Erc20Token = Erc20Token {
    symbol: "bXAU",
    name: "Bullion Gold",
    decimals: 18,
    // TODO: Add mainnet address after token deployment
    mainnet_address: None,
    fuji_address: Some("0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC"),
};

/// Tokenized silver (`bXAG`).
pub const BXAG_TOKEN: Erc20Token = Erc20Token {
    symbol: "bXAG",
    name: "Bullion Silver",
    decimals: 18,
    // TODO: Add mainnet address after token deployment
    mainnet_address: None,
    fuji_address: Some("0x90F79bf6EB2c4f870365E785982E1f101E93b906"),
};

/// Parse a human-readable amount to wei (or token units).
///
/// # Arguments
/// * `amount` - Amount as a string (e.g., "1.5")
/// * `decimals` - Number of decimals (18 for the native coin and both metal tokens)
pub fn parse_amount(amount: &str, decimals: u8) -> Result<U256, SignerError> {
    let parts: Vec<&str> = amount.split('.').collect();

    if parts.len() > 2 {
        return Err(SignerError::InvalidAmount("invalid format".to_string()));
    }

    let whole = parts[0]
        .parse::<u128>()
        .map_err(|_| SignerError::InvalidAmount("invalid whole number".to_string()))?;

    let decimal_part = if parts.len() == 2 {
        let dec_str = parts[1];
        if dec_str.len() > decimals as usize {
            return Err(SignerError::InvalidAmount(format!(
                "too many decimal places (max {decimals})"
            )));
        }
        // Pad with zeros to match decimals
        let padded = format!("{:0<width$}", dec_str, width = decimals as usize);
        padded
            .parse::<u128>()
            .map_err(|_| SignerError::InvalidAmount("invalid decimal".to_string()))?
    } else {
        0u128
    };

    let multiplier = 10u128.pow(decimals as u32);
    let total = whole
        .checked_mul(multiplier)
        .and_then(|w| w.checked_add(decimal_part))
        .ok_or_else(|| SignerError::InvalidAmount("amount overflow".to_string()))?;

    Ok(U256::from(total))
}

/// Format wei (or token units) to a human-readable amount.
pub fn format_amount(amount: U256, decimals: u8) -> String {
    if amount.is_zero() {
        return "0".to_string();
    }

    let divisor = U256::from(10u64).pow(U256::from(decimals));
    let whole = amount / divisor;
    let remainder = amount % divisor;

    if remainder.is_zero() {
        whole.to_string()
    } else {
        let decimal_str = format!("{:0>width$}", remainder, width = decimals as usize);
        let trimmed = decimal_str.trim_end_matches('0');
        if trimmed.is_empty() {
            whole.to_string()
        } else {
            format!("{}.{}", whole, trimmed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_amount_whole() {
        let result = parse_amount("1", 18).unwrap();
        assert_eq!(result, U256::from(1_000_000_000_000_000_000u64));
    }

    #[test]
    fn parse_amount_decimal() {
        let result = parse_amount("1.5", 18).unwrap();
        assert_eq!(result, U256::from(1_500_000_000_000_000_000u64));
    }

    #[test]
    fn parse_amount_small() {
        let result = parse_amount("0.001", 18).unwrap();
        assert_eq!(result, U256::from(1_000_000_000_000_000u64));
    }

    #[test]
    fn parse_amount_rejects_double_dot() {
        assert!(parse_amount("1.2.3", 18).is_err());
    }

    #[test]
    fn parse_amount_rejects_excess_precision() {
        assert!(parse_amount("0.1234567", 6).is_err());
    }

    #[test]
    fn format_amount_round_trips() {
        let one_and_half = U256::from(1_500_000_000_000_000_000u64);
        assert_eq!(format_amount(one_and_half, 18), "1.5");

        let whole = U256::from(2_000_000_000_000_000_000u64);
        assert_eq!(format_amount(whole, 18), "2");

        assert_eq!(format_amount(U256::ZERO, 18), "0");
    }

    #[test]
    fn standard_fees_cover_a_native_transfer() {
        let fees = FeePolicy::standard();
        assert_eq!(fees.gas_limit, 21_000);
        assert!(fees.max_fee_per_gas > fees.max_priority_fee_per_gas);
        assert_eq!(
            fees.max_cost(),
            U256::from(21_000u64) * U256::from(fees.max_fee_per_gas)
        );
    }

    #[test]
    fn token_fees_use_larger_gas_limit() {
        assert!(FeePolicy::token_standard().gas_limit > FeePolicy::standard().gas_limit);
    }
}
