// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to the registry database.
//!
//! Each repository borrows the shared [`super::RegistryDatabase`] handle and
//! owns the tables for one entity type.

pub mod documents;
pub mod notifications;
pub mod registrations;

pub use documents::{DocumentMetadata, DocumentRepository};
pub use notifications::{NotificationRepository, StoredNotification};
pub use registrations::{RecordPage, RecordQuery, RegistrationRepository};
