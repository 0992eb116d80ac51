// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Registration repository on the embedded database.
//!
//! Records are never deleted. Every update is a compare-and-swap on the
//! record `version`, performed inside a single redb write transaction, so a
//! writer that read a stale row gets [`StorageError::VersionConflict`]
//! instead of overwriting a newer state.

use std::collections::HashMap;

use chrono::Utc;
use redb::{ReadableDatabase, ReadableMultimapTable, ReadableTable};

use crate::registry::{RegistrationRecord, RegistrationStatus, RegistrationType};

use super::super::database::{
    id_from_key, newest_first_key, RegistryDatabase, CERTIFICATE_NUMBERS, CERTIFICATE_SEQUENCES,
    REGISTRATIONS, REGISTRATIONS_BY_CREATED, REGISTRATIONS_BY_OWNER,
};
use super::super::{StorageError, StorageResult};

/// Filters for a paginated listing.
#[derive(Debug, Clone, Default)]
pub struct RecordQuery {
    /// Restrict to one owner; `None` lists every owner's records.
    pub owner_id: Option<String>,
    pub status: Option<RegistrationStatus>,
    pub registration_type: Option<RegistrationType>,
    pub offset: usize,
    pub limit: usize,
}

/// One page of records plus the total number of matches.
#[derive(Debug, Clone)]
pub struct RecordPage {
    pub records: Vec<RegistrationRecord>,
    pub total: usize,
}

/// Repository for registration records.
pub struct RegistrationRepository<'a> {
    db: &'a RegistryDatabase,
}

impl<'a> RegistrationRepository<'a> {
    /// Create a new RegistrationRepository.
    pub fn new(db: &'a RegistryDatabase) -> Self {
        Self { db }
    }

    /// Store a brand new record and its index entries.
    pub fn insert(&self, record: &RegistrationRecord) -> StorageResult<()> {
        let json = serde_json::to_vec(record)?;
        let index_key = newest_first_key(record.created_at, &record.id);

        let write_txn = self.db.inner().begin_write()?;
        {
            let mut table = write_txn.open_table(REGISTRATIONS)?;
            if table.get(record.id.as_str())?.is_some() {
                return Err(StorageError::AlreadyExists(format!(
                    "Registration {}",
                    record.id
                )));
            }
            table.insert(record.id.as_str(), json.as_slice())?;

            let mut by_created = write_txn.open_table(REGISTRATIONS_BY_CREATED)?;
            by_created.insert(index_key.as_slice(), record.id.as_str())?;

            let mut by_owner = write_txn.open_multimap_table(REGISTRATIONS_BY_OWNER)?;
            by_owner.insert(record.owner_id.as_str(), index_key.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up a record by id.
    pub fn find(&self, id: &str) -> StorageResult<Option<RegistrationRecord>> {
        let read_txn = self.db.inner().begin_read()?;
        let table = read_txn.open_table(REGISTRATIONS)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Get a record by id, failing with `NotFound` if it doesn't exist.
    pub fn get(&self, id: &str) -> StorageResult<RegistrationRecord> {
        self.find(id)?
            .ok_or_else(|| StorageError::NotFound(format!("Registration {id}")))
    }

    /// Look up a record through the certificate number index.
    pub fn find_by_certificate_number(
        &self,
        number: &str,
    ) -> StorageResult<Option<RegistrationRecord>> {
        let read_txn = self.db.inner().begin_read()?;
        let numbers = read_txn.open_table(CERTIFICATE_NUMBERS)?;
        let id = match numbers.get(number)? {
            Some(id) => id.value().to_string(),
            None => return Ok(None),
        };

        let table = read_txn.open_table(REGISTRATIONS)?;
        match table.get(id.as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Paginated listing, newest first.
    ///
    /// The page and the total are computed from the same read transaction.
    pub fn list(&self, query: &RecordQuery) -> StorageResult<RecordPage> {
        let read_txn = self.db.inner().begin_read()?;
        let table = read_txn.open_table(REGISTRATIONS)?;

        let ids: Vec<String> = match &query.owner_id {
            Some(owner_id) => {
                let by_owner = read_txn.open_multimap_table(REGISTRATIONS_BY_OWNER)?;
                let mut ids = Vec::new();
                for key in by_owner.get(owner_id.as_str())? {
                    let key = key?;
                    if let Some(id) = id_from_key(key.value()) {
                        ids.push(id.to_string());
                    }
                }
                ids
            }
            None => {
                let by_created = read_txn.open_table(REGISTRATIONS_BY_CREATED)?;
                let mut ids = Vec::new();
                for entry in by_created.iter()? {
                    let (_, id) = entry?;
                    ids.push(id.value().to_string());
                }
                ids
            }
        };

        let mut records = Vec::with_capacity(query.limit.min(ids.len()));
        let mut total = 0usize;

        for id in ids {
            let Some(value) = table.get(id.as_str())? else {
                continue;
            };
            let record: RegistrationRecord = serde_json::from_slice(value.value())?;

            if query.status.is_some_and(|s| s != record.status) {
                continue;
            }
            if query
                .registration_type
                .is_some_and(|t| t != record.registration_type)
            {
                continue;
            }
            if query
                .owner_id
                .as_deref()
                .is_some_and(|owner| owner != record.owner_id)
            {
                continue;
            }

            if total >= query.offset && records.len() < query.limit {
                records.push(record);
            }
            total += 1;
        }

        Ok(RecordPage { records, total })
    }

    /// All records currently in `status`, oldest first.
    pub fn list_by_status(&self, status: RegistrationStatus) -> StorageResult<Vec<RegistrationRecord>> {
        let read_txn = self.db.inner().begin_read()?;
        let table = read_txn.open_table(REGISTRATIONS)?;

        let mut records = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let record: RegistrationRecord = serde_json::from_slice(value.value())?;
            if record.status == status {
                records.push(record);
            }
        }
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }

    /// Record counts grouped by (type, status).
    pub fn counts(&self) -> StorageResult<HashMap<(RegistrationType, RegistrationStatus), usize>> {
        let read_txn = self.db.inner().begin_read()?;
        let table = read_txn.open_table(REGISTRATIONS)?;

        let mut counts = HashMap::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let record: RegistrationRecord = serde_json::from_slice(value.value())?;
            *counts
                .entry((record.registration_type, record.status))
                .or_insert(0) += 1;
        }
        Ok(counts)
    }

    /// Replace a record if its stored version still equals `expected_version`.
    ///
    /// Identity fields (`id`, `owner_id`, `type`, `created_at`) are always
    /// kept from the stored row. A certificate number on `record` is added to
    /// the global index in the same transaction; a number already bound to a
    /// different record fails with `CertificateCollision`.
    ///
    /// Returns the stored record with its new version.
    pub fn update(
        &self,
        record: &RegistrationRecord,
        expected_version: u64,
    ) -> StorageResult<RegistrationRecord> {
        let id = record.id.as_str();

        let write_txn = self.db.inner().begin_write()?;
        let stored = {
            let mut table = write_txn.open_table(REGISTRATIONS)?;

            // Read existing value and deserialize before mutating
            let existing_bytes = {
                let existing = table
                    .get(id)?
                    .ok_or_else(|| StorageError::NotFound(format!("Registration {id}")))?;
                existing.value().to_vec()
            };
            let current: RegistrationRecord = serde_json::from_slice(&existing_bytes)?;

            if current.version != expected_version {
                return Err(StorageError::VersionConflict {
                    id: id.to_string(),
                    expected: expected_version,
                    found: current.version,
                });
            }

            let mut next = record.clone();
            next.id = current.id;
            next.owner_id = current.owner_id;
            next.registration_type = current.registration_type;
            next.created_at = current.created_at;
            next.version = expected_version + 1;
            next.updated_at = Utc::now();

            if let Some(number) = next.certificate_number.as_deref() {
                let mut numbers = write_txn.open_table(CERTIFICATE_NUMBERS)?;
                let bound_to = numbers.get(number)?.map(|v| v.value().to_string());
                match bound_to {
                    Some(other) if other != id => {
                        return Err(StorageError::CertificateCollision(number.to_string()));
                    }
                    Some(_) => {}
                    None => {
                        numbers.insert(number, id)?;
                    }
                }
            }

            let json = serde_json::to_vec(&next)?;
            table.insert(id, json.as_slice())?;
            next
        };
        write_txn.commit()?;
        Ok(stored)
    }

    /// Reserve the next certificate sequence number for `PREFIX-YEAR`.
    ///
    /// Sequences are never reused; a reservation that is not followed by a
    /// successful update leaves a gap.
    pub fn next_certificate_sequence(&self, prefix: &str, year: i32) -> StorageResult<u64> {
        let key = format!("{prefix}-{year}");

        let write_txn = self.db.inner().begin_write()?;
        let next = {
            let mut table = write_txn.open_table(CERTIFICATE_SEQUENCES)?;
            let current = table.get(key.as_str())?.map(|v| v.value()).unwrap_or(0);
            let next = current + 1;
            table.insert(key.as_str(), next)?;
            next
        };
        write_txn.commit()?;
        Ok(next)
    }
}
