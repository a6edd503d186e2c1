// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ownership enforcement for stored records.
//!
//! Every user-facing read goes through [`OwnershipCheck::owned_by`]. A record
//! that belongs to someone else is reported exactly like a missing one.

use super::records::{LaunchRecord, PlatformWallet};

/// Trait for resources that have an owner.
pub trait OwnedResource {
    /// Get the owner's user ID.
    fn owner_user_id(&self) -> &str;

    fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_user_id() == user_id
    }
}

impl OwnedResource for LaunchRecord {
    fn owner_user_id(&self) -> &str {
        &self.owner_user_id
    }
}

impl OwnedResource for PlatformWallet {
    fn owner_user_id(&self) -> &str {
        &self.owner_user_id
    }
}

/// Filter a lookup result down to resources owned by `user_id`.
pub trait OwnershipCheck<T> {
    fn owned_by(self, user_id: &str) -> Option<T>;
}

impl<T: OwnedResource> OwnershipCheck<T> for Option<T> {
    fn owned_by(self, user_id: &str) -> Option<T> {
        self.filter(|resource| resource.is_owned_by(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn wallet(owner: &str) -> PlatformWallet {
        PlatformWallet {
            owner_user_id: owner.to_string(),
            address: "0x1111111111111111111111111111111111111111".to_string(),
            secret_encrypted: "v1:a:b".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn foreign_resources_look_missing() {
        assert!(Some(wallet("alice")).owned_by("alice").is_some());
        assert!(Some(wallet("alice")).owned_by("bob").is_none());
        assert!(None::<PlatformWallet>.owned_by("alice").is_none());
    }
}
