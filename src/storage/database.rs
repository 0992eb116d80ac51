// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded registry database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `registrations`: record id → serialized RegistrationRecord
//! - `registrations_by_created`: `!created_ms | id` → id (newest first)
//! - `registrations_by_owner` (multimap): owner id → `!created_ms | id`
//! - `certificate_numbers`: certificate number → record id
//! - `certificate_sequences`: `PREFIX-YEAR` → last issued sequence (u64 BE)
//! - `notifications`: notification id → serialized notification
//! - `notifications_by_owner` (multimap): owner id → `!created_ms | id`
//! - `documents`: record id → rendered certificate bytes
//! - `document_meta`: record id → serialized document metadata
//! - `audit_events`: `created_ms | event id` → serialized audit event
//!
//! redb serializes write transactions, so a read-validate-write sequence
//! inside one write transaction is atomic per database.

use std::path::Path;

use chrono::{DateTime, Utc};
use redb::backends::InMemoryBackend;
use redb::{Database, MultimapTableDefinition, TableDefinition};

// =============================================================================
// Table Definitions
// =============================================================================

pub(crate) const REGISTRATIONS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("registrations");

pub(crate) const REGISTRATIONS_BY_CREATED: TableDefinition<&[u8], &str> =
    TableDefinition::new("registrations_by_created");

pub(crate) const REGISTRATIONS_BY_OWNER: MultimapTableDefinition<&str, &[u8]> =
    MultimapTableDefinition::new("registrations_by_owner");

pub(crate) const CERTIFICATE_NUMBERS: TableDefinition<&str, &str> =
    TableDefinition::new("certificate_numbers");

pub(crate) const CERTIFICATE_SEQUENCES: TableDefinition<&str, u64> =
    TableDefinition::new("certificate_sequences");

pub(crate) const NOTIFICATIONS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("notifications");

pub(crate) const NOTIFICATIONS_BY_OWNER: MultimapTableDefinition<&str, &[u8]> =
    MultimapTableDefinition::new("notifications_by_owner");

pub(crate) const DOCUMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("documents");

pub(crate) const DOCUMENT_META: TableDefinition<&str, &[u8]> =
    TableDefinition::new("document_meta");

pub(crate) const AUDIT_EVENTS: TableDefinition<&[u8], &[u8]> =
    TableDefinition::new("audit_events");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("permission denied: {user_id} cannot access {resource}")]
    PermissionDenied { user_id: String, resource: String },

    /// The row changed between read and write.
    #[error("version conflict on {id}: expected {expected}, found {found}")]
    VersionConflict { id: String, expected: u64, found: u64 },

    #[error("certificate number {0} is already assigned")]
    CertificateCollision(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// Key Helpers
// =============================================================================

/// Composite key ordering newest first: `!created_ms (BE) | id`.
pub(crate) fn newest_first_key(created_at: DateTime<Utc>, id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(8 + id.len());
    key.extend_from_slice(&(!(created_at.timestamp_millis() as u64)).to_be_bytes());
    key.extend_from_slice(id.as_bytes());
    key
}

/// Composite key ordering oldest first: `created_ms (BE) | id`.
pub(crate) fn oldest_first_key(created_at: DateTime<Utc>, id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(8 + id.len());
    key.extend_from_slice(&(created_at.timestamp_millis() as u64).to_be_bytes());
    key.extend_from_slice(id.as_bytes());
    key
}

/// Recover the id suffix from either composite key format.
pub(crate) fn id_from_key(key: &[u8]) -> Option<&str> {
    key.get(8..).and_then(|id| std::str::from_utf8(id).ok())
}

// =============================================================================
// RegistryDatabase
// =============================================================================

/// Handle to the embedded registry database.
///
/// Repositories borrow this handle; nothing else opens the underlying file.
pub struct RegistryDatabase {
    db: Database,
}

impl RegistryDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;
        Self::with_tables(db)
    }

    /// Create a database that lives only in memory (tests, dry runs).
    pub fn in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(InMemoryBackend::new())?;
        Self::with_tables(db)
    }

    /// Pre-create all tables so later read transactions don't fail.
    fn with_tables(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(REGISTRATIONS)?;
            let _ = write_txn.open_table(REGISTRATIONS_BY_CREATED)?;
            let _ = write_txn.open_multimap_table(REGISTRATIONS_BY_OWNER)?;
            let _ = write_txn.open_table(CERTIFICATE_NUMBERS)?;
            let _ = write_txn.open_table(CERTIFICATE_SEQUENCES)?;
            let _ = write_txn.open_table(NOTIFICATIONS)?;
            let _ = write_txn.open_multimap_table(NOTIFICATIONS_BY_OWNER)?;
            let _ = write_txn.open_table(DOCUMENTS)?;
            let _ = write_txn.open_table(DOCUMENT_META)?;
            let _ = write_txn.open_table(AUDIT_EVENTS)?;
        }
        write_txn.commit()?;
        Ok(Self { db })
    }

    pub(crate) fn inner(&self) -> &Database {
        &self.db
    }

    /// Round-trip a read transaction to confirm the database is usable.
    pub fn health_check(&self) -> StorageResult<()> {
        use redb::ReadableDatabase;

        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(REGISTRATIONS)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn newest_first_key_ordering() {
        let now = Utc::now();
        let key_old = newest_first_key(now - Duration::seconds(10), "a");
        let key_new = newest_first_key(now, "b");
        assert!(key_new < key_old, "Newer timestamps should sort first");
    }

    #[test]
    fn oldest_first_key_ordering() {
        let now = Utc::now();
        let key_old = oldest_first_key(now - Duration::seconds(10), "a");
        let key_new = oldest_first_key(now, "b");
        assert!(key_old < key_new);
    }

    #[test]
    fn id_round_trips_through_key() {
        let key = newest_first_key(Utc::now(), "8d3c7a9e-record");
        assert_eq!(id_from_key(&key), Some("8d3c7a9e-record"));
        assert_eq!(id_from_key(&[1, 2, 3]), None);
    }

    #[test]
    fn open_on_disk_and_health_check() {
        let dir = tempfile::tempdir().unwrap();
        let db = RegistryDatabase::open(&dir.path().join("nested").join("registry.redb")).unwrap();
        db.health_check().unwrap();
    }

    #[test]
    fn in_memory_database_is_usable() {
        let db = RegistryDatabase::in_memory().unwrap();
        db.health_check().unwrap();
    }
}
