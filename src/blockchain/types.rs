// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain types and constants.

/// Decimals of the native token (wei per AVAX = 10^18).
pub const NATIVE_DECIMALS: u8 = 18;

/// Avalanche network configuration.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Short identifier used in configuration (`fuji`, `mainnet`)
    pub id: &'static str,
    /// Network name for display
    pub name: &'static str,
    /// Chain ID
    pub chain_id: u64,
    /// Default RPC endpoint URL
    pub rpc_url: &'static str,
    /// Block explorer URL
    pub explorer_url: &'static str,
}

/// Avalanche C-Chain Mainnet configuration.
pub const AVAX_MAINNET: NetworkConfig = NetworkConfig {
    id: "mainnet",
    name: "Avalanche C-Chain",
    chain_id: 43114,
    rpc_url: "https://api.avax.network/ext/bc/C/rpc",
    explorer_url: "https://snowtrace.io",
};

/// Avalanche Fuji Testnet configuration.
pub const AVAX_FUJI: NetworkConfig = NetworkConfig {
    id: "fuji",
    name: "Avalanche Fuji Testnet",
    chain_id: 43113,
    rpc_url: "https://api.avax-test.network/ext/bc/C/rpc",
    explorer_url: "https://testnet.snowtrace.io",
};

/// Resolve a network preset by its configuration identifier.
pub fn network_by_name(raw: &str) -> Option<NetworkConfig> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "fuji" => Some(AVAX_FUJI),
        "mainnet" => Some(AVAX_MAINNET),
        _ => None,
    }
}

/// Format a wei amount as a decimal native-token string (up to 6 decimals).
pub fn format_native(wei: u128) -> String {
    let divisor = 10u128.pow(NATIVE_DECIMALS as u32);
    let whole = wei / divisor;
    let remainder = wei % divisor;

    if remainder == 0 {
        return whole.to_string();
    }

    let decimal_str = format!("{:0>width$}", remainder, width = NATIVE_DECIMALS as usize);
    let trimmed = decimal_str.trim_end_matches('0');
    format!("{}.{}", whole, &trimmed[..trimmed.len().min(6)])
}
