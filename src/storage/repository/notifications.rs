// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Owner-facing status notifications.

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableMultimapTable, ReadableTable};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::registry::{RegistrationStatus, RegistrationType};

use super::super::database::{
    id_from_key, newest_first_key, RegistryDatabase, NOTIFICATIONS, NOTIFICATIONS_BY_OWNER,
};
use super::super::{StorageError, StorageResult};

/// A notification delivered to a registration owner.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct StoredNotification {
    pub id: String,
    pub owner_id: String,
    pub record_id: String,
    pub registration_type: RegistrationType,
    pub status: RegistrationStatus,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
}

impl super::super::OwnedResource for StoredNotification {
    fn owner_user_id(&self) -> &str {
        &self.owner_id
    }
}

/// Repository for notifications.
pub struct NotificationRepository<'a> {
    db: &'a RegistryDatabase,
}

impl<'a> NotificationRepository<'a> {
    pub fn new(db: &'a RegistryDatabase) -> Self {
        Self { db }
    }

    pub fn insert(&self, notification: &StoredNotification) -> StorageResult<()> {
        let json = serde_json::to_vec(notification)?;
        let key = newest_first_key(notification.created_at, &notification.id);

        let write_txn = self.db.inner().begin_write()?;
        {
            let mut table = write_txn.open_table(NOTIFICATIONS)?;
            table.insert(notification.id.as_str(), json.as_slice())?;

            let mut by_owner = write_txn.open_multimap_table(NOTIFICATIONS_BY_OWNER)?;
            by_owner.insert(notification.owner_id.as_str(), key.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> StorageResult<StoredNotification> {
        let read_txn = self.db.inner().begin_read()?;
        let table = read_txn.open_table(NOTIFICATIONS)?;
        match table.get(id)? {
            Some(value) => Ok(serde_json::from_slice(value.value())?),
            None => Err(StorageError::NotFound(format!("Notification {id}"))),
        }
    }

    /// Notifications for one owner, newest first.
    pub fn list_by_owner(
        &self,
        owner_id: &str,
        unread_only: bool,
        limit: usize,
    ) -> StorageResult<Vec<StoredNotification>> {
        let read_txn = self.db.inner().begin_read()?;
        let table = read_txn.open_table(NOTIFICATIONS)?;
        let by_owner = read_txn.open_multimap_table(NOTIFICATIONS_BY_OWNER)?;

        let mut notifications = Vec::new();
        for key in by_owner.get(owner_id)? {
            if notifications.len() >= limit {
                break;
            }
            let key = key?;
            let Some(id) = id_from_key(key.value()) else {
                continue;
            };
            if let Some(value) = table.get(id)? {
                let notification: StoredNotification = serde_json::from_slice(value.value())?;
                if !unread_only || !notification.read {
                    notifications.push(notification);
                }
            }
        }
        Ok(notifications)
    }

    /// Mark a notification as read. Idempotent.
    pub fn mark_read(&self, id: &str) -> StorageResult<StoredNotification> {
        let write_txn = self.db.inner().begin_write()?;
        let updated = {
            let mut table = write_txn.open_table(NOTIFICATIONS)?;
            let bytes = {
                let existing = table
                    .get(id)?
                    .ok_or_else(|| StorageError::NotFound(format!("Notification {id}")))?;
                existing.value().to_vec()
            };
            let mut notification: StoredNotification = serde_json::from_slice(&bytes)?;
            if !notification.read {
                notification.read = true;
                notification.read_at = Some(Utc::now());
                let json = serde_json::to_vec(&notification)?;
                table.insert(id, json.as_slice())?;
            }
            notification
        };
        write_txn.commit()?;
        Ok(updated)
    }
}
