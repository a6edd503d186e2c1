// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Session-token authentication for the launch API.
//!
//! ## Auth Flow
//!
//! 1. The web app signs the user in and issues an HS256 session JWT
//! 2. The client sends it as `Authorization: Bearer <token>` or in the
//!    `session-token` cookie
//! 3. The server verifies signature and expiry, then uses `sub` as the
//!    canonical `user_id`
//!
//! ## Security
//!
//! - All non-health endpoints require authentication
//! - Clock skew tolerance is 60 seconds

pub mod error;
pub mod extractor;
pub mod session;

pub use error::AuthError;
pub use extractor::Auth;
pub use session::{AuthenticatedUser, SessionClaims, SessionVerifier, SESSION_COOKIE};
