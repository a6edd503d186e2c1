// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP client for a privacy-pool relayer.
//!
//! The owner key never leaves the process: each request carries the owner
//! address and an EIP-191 signature over a canonical message, which the
//! relayer verifies before acting on the owner's pool notes.

use std::time::Duration;

use alloy::signers::SignerSync;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{DepositReceipt, PoolError, PrivacyPool, WithdrawReceipt};
use crate::blockchain::signer_from_secret;

const DEPOSIT_PATH: &str = "/v1/deposit";
const WITHDRAW_PATH: &str = "/v1/withdraw";
const MESSAGE_DOMAIN: &str = "launch-custody-pool";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PoolAction {
    Deposit,
    Withdraw,
}

impl PoolAction {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdraw => "withdraw",
        }
    }

    fn path(&self) -> &'static str {
        match self {
            Self::Deposit => DEPOSIT_PATH,
            Self::Withdraw => WITHDRAW_PATH,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct RelayerRequest {
    owner: String,
    amount_wei: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    recipient: Option<String>,
    nonce: String,
    signature: String,
}

#[derive(Debug, Deserialize)]
struct RelayerResponse {
    #[serde(default)]
    tx_ref: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RelayerErrorBody {
    error: String,
}

/// Message signed by the owner key for one relayer request.
fn canonical_message(
    action: PoolAction,
    owner: &str,
    amount: u128,
    recipient: Option<&str>,
    nonce: &str,
) -> String {
    format!(
        "{MESSAGE_DOMAIN}:{}\nowner:{owner}\namount:{amount}\nrecipient:{}\nnonce:{nonce}",
        action.as_str(),
        recipient.unwrap_or("")
    )
}

/// Map a non-success relayer response to a pool error.
fn classify_failure(status: StatusCode, body: &str) -> PoolError {
    let message = serde_json::from_str::<RelayerErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| format!("relayer returned {status}"));

    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => PoolError::Timeout,
        StatusCode::TOO_MANY_REQUESTS
        | StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE => PoolError::Unavailable(message),
        _ => PoolError::from_message(message),
    }
}

/// Pool client backed by a relayer HTTP API.
#[derive(Debug, Clone)]
pub struct RelayerPoolClient {
    base_url: String,
    http: Client,
}

impl RelayerPoolClient {
    pub fn new(base_url: &url::Url, timeout: Duration) -> Result<Self, PoolError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PoolError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            http,
        })
    }

    fn build_request(
        &self,
        action: PoolAction,
        owner_secret: &str,
        amount: u128,
        recipient: Option<&str>,
    ) -> Result<RelayerRequest, PoolError> {
        let signer =
            signer_from_secret(owner_secret).map_err(|e| PoolError::InvalidOwnerKey(e.to_string()))?;
        let owner = signer.address().to_string();
        let nonce = Uuid::new_v4().to_string();

        let message = canonical_message(action, &owner, amount, recipient, &nonce);
        let signature = signer
            .sign_message_sync(message.as_bytes())
            .map_err(|e| PoolError::InvalidOwnerKey(e.to_string()))?;

        Ok(RelayerRequest {
            owner,
            amount_wei: amount.to_string(),
            recipient: recipient.map(str::to_string),
            nonce,
            signature: alloy::hex::encode_prefixed(signature.as_bytes()),
        })
    }

    async fn post(
        &self,
        action: PoolAction,
        request: &RelayerRequest,
        idempotency_key: &str,
    ) -> Result<RelayerResponse, PoolError> {
        let path = action.path();
        debug!(path, owner = %request.owner, "Sending relayer request");

        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .header("Idempotency-Key", idempotency_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PoolError::Timeout
                } else {
                    PoolError::Unavailable(format!("POST {path} failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = classify_failure(status, &body);
            warn!(path, status = %status, error = %error, "Relayer request failed");
            return Err(error);
        }

        response.json().await.map_err(|e| {
            PoolError::Rejected(format!("POST {path} returned an unreadable response: {e}"))
        })
    }
}

#[async_trait]
impl PrivacyPool for RelayerPoolClient {
    async fn deposit(
        &self,
        owner_secret: &str,
        amount: u128,
        idempotency_key: &str,
    ) -> Result<DepositReceipt, PoolError> {
        let request = self.build_request(PoolAction::Deposit, owner_secret, amount, None)?;
        let response = self
            .post(PoolAction::Deposit, &request, idempotency_key)
            .await?;
        Ok(DepositReceipt {
            tx_ref: response.tx_ref,
        })
    }

    async fn withdraw(
        &self,
        owner_secret: &str,
        amount: u128,
        recipient: &str,
    ) -> Result<WithdrawReceipt, PoolError> {
        let recipient = super::checked_recipient(recipient)?;
        let request =
            self.build_request(PoolAction::Withdraw, owner_secret, amount, Some(&recipient))?;

        // Launch wallets are single-use, so recipient and amount identify the withdrawal.
        let idempotency_key = format!("withdraw:{}:{amount}", recipient.to_ascii_lowercase());
        let response = self
            .post(PoolAction::Withdraw, &request, &idempotency_key)
            .await?;

        // Success without a reference leaves the outcome unknown.
        let tx_ref = response.tx_ref.ok_or_else(|| {
            PoolError::Rejected("relayer accepted the withdrawal without a tx reference".to_string())
        })?;
        Ok(WithdrawReceipt { tx_ref })
    }
}
