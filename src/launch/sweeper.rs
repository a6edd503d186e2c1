// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Launch Retry Sweeper
//!
//! Background task that re-queues launches parked in `deposit_pending`:
//! launches whose withdrawal was deferred because the pool had not indexed
//! the deposit yet, launches whose deposit failed transiently, and launches
//! created just before a restart.
//!
//! ## Strategy
//!
//! Once at startup and then every `interval` the sweeper:
//! 1. Lists `deposit_pending` launches that have not exhausted
//!    `max_attempts`.
//! 2. Dispatches each through the [`LaunchDispatcher`].
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown, like the
//! dispatch worker.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::dispatch::{LaunchDispatcher, LaunchJob};
use super::engine::LaunchEngine;

pub struct LaunchSweeper {
    engine: Arc<LaunchEngine>,
    dispatcher: LaunchDispatcher,
    interval: Duration,
}

impl LaunchSweeper {
    pub fn new(engine: Arc<LaunchEngine>, dispatcher: LaunchDispatcher, interval: Duration) -> Self {
        Self {
            engine,
            dispatcher,
            interval,
        }
    }

    /// Run the sweep loop until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(sweeper.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Launch retry sweeper starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Launch retry sweeper shutting down");
                return;
            }

            self.sweep_once();

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Launch retry sweeper shutting down");
                    return;
                }
            }
        }
    }

    /// Queue every retryable launch. Returns how many were queued.
    pub fn sweep_once(&self) -> usize {
        let pending = match self.engine.pending_launches() {
            Ok(pending) => pending,
            Err(e) => {
                warn!(error = %e, "Sweeper: failed to list pending launches");
                return 0;
            }
        };

        if pending.is_empty() {
            return 0;
        }

        info!(count = pending.len(), "Sweeper: re-queueing pending launches");

        pending
            .into_iter()
            .filter(|record| {
                self.dispatcher.dispatch(LaunchJob {
                    launch_id: record.id.clone(),
                    owner_user_id: record.owner_user_id.clone(),
                })
            })
            .count()
    }
}
