// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::SessionVerifier;
use crate::launch::{LaunchDispatcher, LaunchEngine};
use crate::rate_limit::RateLimiter;
use crate::storage::Ledger;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<LaunchEngine>,
    pub dispatcher: LaunchDispatcher,
    pub ledger: Arc<Ledger>,
    pub sessions: Arc<SessionVerifier>,
    pub rate_limiter: Arc<dyn RateLimiter>,
    /// Required in `x-internal-job-secret` on internal routes, when set.
    pub internal_job_secret: Option<String>,
}
