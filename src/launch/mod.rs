// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Launch funding lifecycle: engine, background dispatch and retry sweep.

pub mod dispatch;
pub mod engine;
pub mod error;
pub mod sweeper;

pub use dispatch::{DispatchWorker, LaunchDispatcher, LaunchJob, DEFAULT_QUEUE_CAPACITY};
pub use engine::{CreatedLaunch, LaunchEngine, LaunchSettings};
pub use error::LaunchError;
pub use sweeper::LaunchSweeper;
