// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit logging for security-sensitive operations.
//!
//! Submissions, status transitions, denied actions, issuance and
//! administrative access are appended to the `audit_events` table.
//! Keys are `created_ms | event_id`, so a time range is a key range.

use chrono::{DateTime, NaiveDate, Utc};
use redb::{ReadableDatabase, ReadableTable};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::database::{oldest_first_key, RegistryDatabase, AUDIT_EVENTS};
use super::StorageResult;

/// Types of auditable events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    // Registration events
    RegistrationSubmitted,
    PayloadUpdated,
    RegistrationResubmitted,

    // Workflow events
    StatusChanged,
    TransitionDenied,
    CertificateIssued,
    CertificateExpired,

    // Document events
    DocumentRendered,
    RenderFailed,

    // Access events
    PermissionDenied,
    AdminAccess,
}

/// An audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditEvent {
    /// Unique event ID.
    pub event_id: String,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Type of event.
    pub event_type: AuditEventType,
    /// User who triggered the event (`system` for internal actions).
    pub user_id: Option<String>,
    /// Resource affected (registration id, notification id, ...).
    pub resource_id: Option<String>,
    /// Resource type (registration, document, ...).
    pub resource_type: Option<String>,
    /// Additional details as JSON.
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Error message if operation failed.
    pub error: Option<String>,
}

impl AuditEvent {
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

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_resource(
        mut self,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        self.resource_type = Some(resource_type.into());
        self.resource_id = Some(resource_id.into());
        self
    }

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
}

/// Filters for reading the audit log. Dates are inclusive.
#[derive(Debug, Clone)]
pub struct AuditQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub user_id: Option<String>,
    pub event_type: Option<AuditEventType>,
    pub resource_id: Option<String>,
    pub offset: usize,
    pub limit: usize,
}

/// One page of audit events plus the number of events matching the filters.
#[derive(Debug, Clone)]
pub struct AuditPage {
    pub events: Vec<AuditEvent>,
    pub total: usize,
}

/// Repository for audit events.
pub struct AuditRepository<'a> {
    db: &'a RegistryDatabase,
}

impl<'a> AuditRepository<'a> {
    pub fn new(db: &'a RegistryDatabase) -> Self {
        Self { db }
    }

    /// Append an audit event.
    pub fn log(&self, event: &AuditEvent) -> StorageResult<()> {
        let key = oldest_first_key(event.timestamp, &event.event_id);
        let json = serde_json::to_vec(event)?;

        let write_txn = self.db.inner().begin_write()?;
        {
            let mut table = write_txn.open_table(AUDIT_EVENTS)?;
            table.insert(key.as_slice(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Events in the query's date range, newest first.
    pub fn query(&self, query: &AuditQuery) -> StorageResult<AuditPage> {
        let start = day_start_key(query.start_date);
        let end = match query.end_date.succ_opt() {
            Some(next) => day_start_key(next),
            None => u64::MAX.to_be_bytes().to_vec(),
        };

        let read_txn = self.db.inner().begin_read()?;
        let table = read_txn.open_table(AUDIT_EVENTS)?;

        let mut events = Vec::new();
        let mut total = 0usize;
        for entry in table.range(start.as_slice()..end.as_slice())?.rev() {
            let (_, value) = entry?;
            let event: AuditEvent = serde_json::from_slice(value.value())?;
            if !matches_query(&event, query) {
                continue;
            }
            if total >= query.offset && events.len() < query.limit {
                events.push(event);
            }
            total += 1;
        }

        Ok(AuditPage { events, total })
    }
}

fn day_start_key(date: NaiveDate) -> Vec<u8> {
    let ms = date
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp_millis())
        .unwrap_or_default();
    (ms.max(0) as u64).to_be_bytes().to_vec()
}

fn matches_query(event: &AuditEvent, query: &AuditQuery) -> bool {
    if let Some(user_id) = &query.user_id {
        if event.user_id.as_ref() != Some(user_id) {
            return false;
        }
    }
    if let Some(event_type) = query.event_type {
        if event.event_type != event_type {
            return false;
        }
    }
    if let Some(resource_id) = &query.resource_id {
        if event.resource_id.as_ref() != Some(resource_id) {
            return false;
        }
    }
    true
}

/// Helper macro for logging audit events.
///
/// Audit failures are logged and swallowed; they never fail the caller.
#[macro_export]
macro_rules! audit_log {
    ($db:expr, $event:expr) => {{
        let repo = $crate::storage::AuditRepository::new($db);
        if let Err(error) = repo.log(&$event) {
            tracing::warn!(%error, "Failed to write audit event");
        }
    }};
    ($db:expr, $event_type:expr, $actor:expr, $resource_type:expr, $resource_id:expr) => {{
        let event = $crate::storage::AuditEvent::new($event_type)
            .with_user($actor.id.as_str())
            .with_resource($resource_type, $resource_id);
        $crate::audit_log!($db, event);
    }};
}
