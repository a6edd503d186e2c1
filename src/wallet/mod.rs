// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Custodial wallet provisioning.

pub mod provisioner;

pub use provisioner::{GeneratedWallet, ProvisionError, WalletProvisioner};
