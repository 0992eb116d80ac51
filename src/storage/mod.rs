// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Registry Storage
//!
//! Persistent state lives in a single redb database file under `DATA_DIR`.
//!
//! ## Consistency Model
//!
//! - Every registration carries a `version` counter
//! - Updates are compare-and-swap on that counter inside one write transaction
//! - redb allows one writer at a time, so the check and the write cannot interleave
//! - Certificate numbers are bound to records through a global unique index
//!
//! Nothing outside this module touches redb directly.

pub mod audit;
pub mod database;
pub mod ownership;
pub mod repository;

pub use audit::{AuditEvent, AuditEventType, AuditPage, AuditQuery, AuditRepository};
pub use database::{RegistryDatabase, StorageError, StorageResult};
pub use ownership::{OwnedResource, OwnershipCheck, OwnershipEnforcer};
pub use repository::{
    DocumentMetadata, DocumentRepository, NotificationRepository, RecordPage, RecordQuery,
    RegistrationRepository, StoredNotification,
};
