// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit logging for security-sensitive operations.
//!
//! Launch lifecycle transitions, platform wallet creation and decryption
//! failures are appended to the `audit_events` table of the ledger.

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ledger::{Ledger, LedgerResult};

/// Composite key `timestamp_micros_be | event_id` → serialized AuditEvent.
pub(super) const AUDIT_EVENTS: TableDefinition<&[u8], &[u8]> =
    TableDefinition::new("audit_events");

/// Types of auditable events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    // Wallet events
    PlatformWalletCreated,

    // Launch events
    LaunchCreated,
    DepositSubmitted,
    DepositFailed,
    LaunchFunded,
    WithdrawDeferred,
    WithdrawFailed,
    LaunchRetried,
    LaunchMarkedLaunched,

    // Custody events
    DecryptionFailed,
}

/// An audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID.
    pub event_id: String,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Type of event.
    pub event_type: AuditEventType,
    /// User who triggered the event (if known).
    pub user_id: Option<String>,
    /// Resource affected (launch id, user id).
    pub resource_id: Option<String>,
    /// Resource type (launch, platform_wallet).
    pub resource_type: Option<String>,
    /// Additional details as JSON.
    pub details: Option<serde_json::Value>,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Error message if operation failed.
    pub error: Option<String>,
}

impl AuditEvent {
    /// Create a new audit event.
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type,
            user_id: None,
            resource_id: None,
            resource_type: None,
            details: None,
            success: true,
            error: None,
        }
    }

    /// Set the user ID.
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Set the resource.
    pub fn with_resource(
        mut self,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        self.resource_type = Some(resource_type.into());
        self.resource_id = Some(resource_id.into());
        self
    }

    /// Add details.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Mark as failed with error message.
    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }

    fn key(&self) -> Vec<u8> {
        let micros = self.timestamp.timestamp_micros() as u64;
        let mut key = Vec::with_capacity(8 + self.event_id.len());
        key.extend_from_slice(&micros.to_be_bytes());
        key.extend_from_slice(self.event_id.as_bytes());
        key
    }
}

/// Repository for audit events.
pub struct AuditRepository<'a> {
    ledger: &'a Ledger,
}

impl<'a> AuditRepository<'a> {
    /// Create a new audit repository.
    pub fn new(ledger: &'a Ledger) -> Self {
        Self { ledger }
    }

    /// Append an audit event.
    pub fn log(&self, event: &AuditEvent) -> LedgerResult<()> {
        let json = serde_json::to_vec(event)?;
        let key = event.key();

        let write_txn = self.ledger.db().begin_write()?;
        {
            let mut table = write_txn.open_table(AUDIT_EVENTS)?;
            table.insert(key.as_slice(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Events for one resource, oldest first.
    pub fn list_for_resource(&self, resource_id: &str) -> LedgerResult<Vec<AuditEvent>> {
        let read_txn = self.ledger.db().begin_read()?;
        let table = read_txn.open_table(AUDIT_EVENTS)?;

        let mut events = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let event: AuditEvent = serde_json::from_slice(value.value())?;
            if event.resource_id.as_deref() == Some(resource_id) {
                events.push(event);
            }
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audit_event_builder() {
        let event = AuditEvent::new(AuditEventType::LaunchCreated)
            .with_user("user-123")
            .with_resource("launch", "launch-456")
            .with_details(serde_json::json!({"amount_wei": "50000000000000000"}));

        assert_eq!(event.event_type, AuditEventType::LaunchCreated);
        assert_eq!(event.user_id, Some("user-123".to_string()));
        assert_eq!(event.resource_type, Some("launch".to_string()));
        assert_eq!(event.resource_id, Some("launch-456".to_string()));
        assert!(event.success);
    }

    #[test]
    fn failed_event() {
        let event = AuditEvent::new(AuditEventType::WithdrawFailed).failed("relayer rejected");
        assert!(!event.success);
        assert_eq!(event.error.as_deref(), Some("relayer rejected"));
    }

    #[test]
    fn log_and_list_for_resource() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::open(&dir.path().join("audit.redb")).unwrap();
        let repo = AuditRepository::new(&ledger);

        repo.log(&AuditEvent::new(AuditEventType::LaunchCreated).with_resource("launch", "l-1"))
            .unwrap();
        repo.log(&AuditEvent::new(AuditEventType::LaunchFunded).with_resource("launch", "l-1"))
            .unwrap();
        repo.log(&AuditEvent::new(AuditEventType::LaunchCreated).with_resource("launch", "l-2"))
            .unwrap();

        let events = repo.list_for_resource("l-1").unwrap();
        assert_eq!(events.len(), 2);
        assert!(events
            .iter()
            .any(|e| e.event_type == AuditEventType::LaunchFunded));
        assert!(events.iter().all(|e| e.resource_id.as_deref() == Some("l-1")));
    }
}
