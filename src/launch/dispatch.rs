// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Launch Dispatcher
//!
//! Runs the deposit/withdraw pipeline after the request that created (or
//! retried) a launch has returned. Handlers call [`LaunchDispatcher::dispatch`],
//! which never waits: jobs go into a bounded queue consumed by a single
//! [`DispatchWorker`] that spawns one execution per job.
//!
//! A full queue drops the job with a warning. The launch stays in
//! `deposit_pending` and the sweeper picks it up on its next pass.

use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::engine::LaunchEngine;
use super::error::LaunchError;

/// Default capacity of the job queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// A request to run the pipeline for one launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchJob {
    pub launch_id: String,
    pub owner_user_id: String,
}

/// Non-blocking handle for queueing launch executions.
#[derive(Clone)]
pub struct LaunchDispatcher {
    tx: mpsc::Sender<LaunchJob>,
}

impl LaunchDispatcher {
    /// Create a dispatcher and the worker that drains it.
    pub fn new(engine: Arc<LaunchEngine>, capacity: usize) -> (Self, DispatchWorker) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, DispatchWorker { rx, engine })
    }

    /// Queue a job. Returns `false` if it could not be queued.
    pub fn dispatch(&self, job: LaunchJob) -> bool {
        match self.tx.try_send(job) {
            Ok(()) => true,
            Err(TrySendError::Full(job)) => {
                warn!(
                    launch_id = %job.launch_id,
                    "Launch queue full; leaving launch for the sweeper"
                );
                false
            }
            Err(TrySendError::Closed(job)) => {
                warn!(
                    launch_id = %job.launch_id,
                    "Launch worker stopped; leaving launch for the sweeper"
                );
                false
            }
        }
    }
}

/// Consumes queued jobs and executes them.
pub struct DispatchWorker {
    rx: mpsc::Receiver<LaunchJob>,
    engine: Arc<LaunchEngine>,
}

impl DispatchWorker {
    /// Run until the token is cancelled, then wait for in-flight executions.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!("Launch dispatch worker starting");
        let mut in_flight = JoinSet::new();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                job = self.rx.recv() => match job {
                    Some(job) => {
                        let engine = self.engine.clone();
                        in_flight.spawn(run_job(engine, job));
                    }
                    None => break,
                },
                Some(result) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = result {
                        error!(error = %e, "Launch execution task panicked");
                    }
                }
            }
        }

        info!(
            in_flight = in_flight.len(),
            "Launch dispatch worker shutting down"
        );
        while let Some(result) = in_flight.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "Launch execution task panicked");
            }
        }
    }
}

async fn run_job(engine: Arc<LaunchEngine>, job: LaunchJob) {
    match engine
        .execute_launch(&job.owner_user_id, &job.launch_id)
        .await
    {
        Ok(status) => info!(
            launch_id = %job.launch_id,
            status = %status,
            "Launch execution finished"
        ),
        Err(LaunchError::DecryptionFailure) => error!(
            launch_id = %job.launch_id,
            "Launch execution aborted: custody secret could not be decrypted"
        ),
        Err(e) => warn!(
            launch_id = %job.launch_id,
            error = %e,
            "Launch execution failed"
        ),
    }
}
