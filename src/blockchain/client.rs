// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Avalanche C-Chain client for read-only balance queries.

use alloy::{
    network::Ethereum,
    providers::{
        fillers::{BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller},
        Identity, Provider, ProviderBuilder, RootProvider,
    },
};
use async_trait::async_trait;

use super::address::parse_address;
use super::types::NetworkConfig;

/// HTTP provider type for Avalanche C-Chain (with all fillers).
type HttpProvider = FillProvider<
    JoinFill<
        Identity,
        JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
    >,
    RootProvider<Ethereum>,
>;

/// Source of native balances, in wei.
#[async_trait]
pub trait BalanceSource: Send + Sync {
    async fn native_balance(&self, address: &str) -> Result<u128, ChainClientError>;
}

/// Avalanche C-Chain client.
pub struct AvaxClient {
    network: NetworkConfig,
    provider: HttpProvider,
}

impl AvaxClient {
    /// Create a client for `network`, talking to `rpc_url`.
    pub fn new(network: NetworkConfig, rpc_url: &str) -> Result<Self, ChainClientError> {
        let url: url::Url = rpc_url
            .parse()
            .map_err(|e: url::ParseError| ChainClientError::InvalidRpcUrl(e.to_string()))?;

        let provider = ProviderBuilder::new().connect_http(url);

        Ok(Self { network, provider })
    }

    /// Get the network configuration.
    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }
}

#[async_trait]
impl BalanceSource for AvaxClient {
    async fn native_balance(&self, address: &str) -> Result<u128, ChainClientError> {
        let addr =
            parse_address(address).map_err(|e| ChainClientError::InvalidAddress(e.to_string()))?;

        let balance = self
            .provider
            .get_balance(addr)
            .await
            .map_err(|e| ChainClientError::RpcError(e.to_string()))?;

        // Balances beyond u128 are not reachable for the native token.
        Ok(u128::try_from(balance).unwrap_or(u128::MAX))
    }
}

/// Errors that can occur during blockchain operations.
#[derive(Debug, thiserror::Error)]
pub enum ChainClientError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("RPC error: {0}")]
    RpcError(String),
}
