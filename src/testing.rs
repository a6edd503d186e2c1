// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Test doubles for the pool and chain, plus a ready-made engine and router.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;

use crate::auth::SessionVerifier;
use crate::blockchain::{BalanceSource, ChainClientError};
use crate::launch::{DispatchWorker, LaunchDispatcher, LaunchEngine, LaunchSettings};
use crate::pool::{DepositReceipt, PoolError, PrivacyPool, WithdrawReceipt};
use crate::rate_limit::FixedWindowLimiter;
use crate::state::AppState;
use crate::storage::Ledger;
use crate::vault::SecretVault;
use crate::wallet::WalletProvisioner;

pub const MASTER_KEY: &[u8] = b"0123456789abcdef0123456789abcdef";
pub const MIN_AMOUNT: u128 = 50_000_000_000_000_000;
pub const MAX_ATTEMPTS: u32 = 10;

/// Scriptable pool. Unscripted calls succeed.
#[derive(Default)]
pub struct FakePool {
    deposit_results: Mutex<VecDeque<Result<DepositReceipt, PoolError>>>,
    withdraw_results: Mutex<VecDeque<Result<WithdrawReceipt, PoolError>>>,
    deposits: AtomicUsize,
    withdrawals: AtomicUsize,
    recipients: Mutex<Vec<String>>,
    deposit_keys: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl FakePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push_deposit(&self, result: Result<DepositReceipt, PoolError>) {
        self.deposit_results.lock().unwrap().push_back(result);
    }

    pub fn push_withdraw(&self, result: Result<WithdrawReceipt, PoolError>) {
        self.withdraw_results.lock().unwrap().push_back(result);
    }

    pub fn deposit_calls(&self) -> usize {
        self.deposits.load(Ordering::SeqCst)
    }

    pub fn withdraw_calls(&self) -> usize {
        self.withdrawals.load(Ordering::SeqCst)
    }

    pub fn withdraw_recipients(&self) -> Vec<String> {
        self.recipients.lock().unwrap().clone()
    }

    pub fn deposit_keys(&self) -> Vec<String> {
        self.deposit_keys.lock().unwrap().clone()
    }
}

#[async_trait]
impl PrivacyPool for FakePool {
    async fn deposit(
        &self,
        _owner_secret: &str,
        _amount: u128,
        idempotency_key: &str,
    ) -> Result<DepositReceipt, PoolError> {
        let n = self.deposits.fetch_add(1, Ordering::SeqCst) + 1;
        self.deposit_keys
            .lock()
            .unwrap()
            .push(idempotency_key.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let scripted = self.deposit_results.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(DepositReceipt {
                tx_ref: Some(format!("0xdeposit{n}")),
            })
        })
    }

    async fn withdraw(
        &self,
        _owner_secret: &str,
        _amount: u128,
        recipient: &str,
    ) -> Result<WithdrawReceipt, PoolError> {
        let n = self.withdrawals.fetch_add(1, Ordering::SeqCst) + 1;
        self.recipients.lock().unwrap().push(recipient.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let scripted = self.withdraw_results.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(WithdrawReceipt {
                tx_ref: format!("0xwithdraw{n}"),
            })
        })
    }
}

/// Chain stub returning a fixed balance or an RPC failure.
pub struct FakeChain {
    balance: Option<u128>,
    calls: AtomicUsize,
}

impl FakeChain {
    pub fn with_balance(balance: u128) -> Self {
        Self {
            balance: Some(balance),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            balance: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BalanceSource for FakeChain {
    async fn native_balance(&self, _address: &str) -> Result<u128, ChainClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.balance
            .ok_or_else(|| ChainClientError::RpcError("connection refused".to_string()))
    }
}

/// Engine over a temporary ledger with fake pool and chain.
pub struct TestHarness {
    pub engine: Arc<LaunchEngine>,
    pub ledger: Arc<Ledger>,
    pub pool: Arc<FakePool>,
    pub chain: Arc<FakeChain>,
    _dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with(FakePool::new(), FakeChain::with_balance(u128::MAX))
    }

    pub fn with(pool: FakePool, chain: FakeChain) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Arc::new(Ledger::open(&dir.path().join("ledger.redb")).unwrap());
        let pool = Arc::new(pool);
        let chain = Arc::new(chain);
        let engine = Arc::new(build_engine(
            ledger.clone(),
            MASTER_KEY,
            pool.clone(),
            chain.clone(),
        ));
        Self {
            engine,
            ledger,
            pool,
            chain,
            _dir: dir,
        }
    }

    /// A second engine over the same ledger and fakes, with another vault key.
    pub fn engine_with_master_key(&self, master_key: &[u8]) -> LaunchEngine {
        build_engine(
            self.ledger.clone(),
            master_key,
            self.pool.clone(),
            self.chain.clone(),
        )
    }
}

fn build_engine(
    ledger: Arc<Ledger>,
    master_key: &[u8],
    pool: Arc<FakePool>,
    chain: Arc<FakeChain>,
) -> LaunchEngine {
    let vault = SecretVault::new(master_key).unwrap();
    LaunchEngine::new(
        ledger.clone(),
        WalletProvisioner::new(ledger, vault),
        pool,
        chain,
        LaunchSettings {
            min_launch_amount: MIN_AMOUNT,
            max_attempts: MAX_ATTEMPTS,
        },
    )
}

pub const SESSION_SECRET: &[u8] = b"test-session-secret";

/// Session token for `user_id`, valid for an hour.
pub fn issue_session(user_id: &str) -> String {
    issue_session_with_exp(user_id, chrono::Utc::now().timestamp() + 3600)
}

pub fn issue_session_with_exp(user_id: &str, exp: i64) -> String {
    let claims = crate::auth::SessionClaims {
        sub: user_id.to_string(),
        exp,
        iat: chrono::Utc::now().timestamp(),
    };
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(SESSION_SECRET),
    )
    .unwrap()
}

/// Router over a [`TestHarness`]. Queued jobs are held, not executed.
pub struct TestApp {
    pub harness: TestHarness,
    pub state: AppState,
    _worker: DispatchWorker,
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(u32::MAX, None)
    }

    pub fn with_rate_limit(per_minute: u32) -> Self {
        Self::build(per_minute, None)
    }

    pub fn with_job_secret(secret: &str) -> Self {
        Self::build(u32::MAX, Some(secret.to_string()))
    }

    fn build(per_minute: u32, internal_job_secret: Option<String>) -> Self {
        let harness = TestHarness::new();
        let (dispatcher, worker) = LaunchDispatcher::new(harness.engine.clone(), 16);
        let state = AppState {
            engine: harness.engine.clone(),
            dispatcher,
            ledger: harness.ledger.clone(),
            sessions: Arc::new(SessionVerifier::new(SESSION_SECRET)),
            rate_limiter: Arc::new(FixedWindowLimiter::per_minute(per_minute)),
            internal_job_secret,
        };
        Self {
            harness,
            state,
            _worker: worker,
        }
    }

    pub fn router(&self) -> axum::Router {
        crate::api::router(self.state.clone())
    }
}

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
