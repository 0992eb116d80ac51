// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Collaborators invoked by the workflow after a state change.
//!
//! Both are best-effort from the workflow's point of view: a failing renderer
//! or notifier is logged and audited, and the transition stands.

use std::sync::Arc;

use chrono::Utc;
use url::Url;

use crate::storage::{NotificationRepository, RegistryDatabase, StorageError, StoredNotification};

use super::{RegistrationRecord, RegistrationStatus, RegistrationType};

#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    #[error("render failed: {0}")]
    Render(String),

    #[error("notification dispatch failed: {0}")]
    Dispatch(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

// =============================================================================
// Document rendering
// =============================================================================

/// Output of a renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Turns an issued record into a certificate document.
pub trait DocumentRenderer: Send + Sync {
    fn render(
        &self,
        registration_type: RegistrationType,
        record: &RegistrationRecord,
        verification_url: Option<&Url>,
    ) -> Result<RenderedDocument, CollaboratorError>;
}

/// Plain-text certificate. The verification URL doubles as the QR payload.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextCertificateRenderer;

impl DocumentRenderer for TextCertificateRenderer {
    fn render(
        &self,
        registration_type: RegistrationType,
        record: &RegistrationRecord,
        verification_url: Option<&Url>,
    ) -> Result<RenderedDocument, CollaboratorError> {
        let number = record
            .certificate_number
            .as_deref()
            .ok_or_else(|| CollaboratorError::Render("record has no certificate number".into()))?;
        let issued_at = record
            .issued_at
            .ok_or_else(|| CollaboratorError::Render("record has not been issued".into()))?;
        let fields = record.payload.public_fields();

        let mut text = String::new();
        text.push_str(&format!("{registration_type} CERTIFICATE\n"));
        text.push_str(&format!("Certificate number: {number}\n"));
        text.push_str(&format!("Name: {}\n", fields.full_name));
        text.push_str(&format!("Date of event: {}\n", fields.event_date));
        text.push_str(&format!("Place of event: {}\n", fields.event_place));
        if let Some(approver) = &record.approver_name {
            text.push_str(&format!("Approved by: {approver}\n"));
        }
        text.push_str(&format!("Issued: {}\n", issued_at.format("%Y-%m-%d")));
        if let Some(expires_at) = record.expires_at {
            text.push_str(&format!("Valid until: {}\n", expires_at.format("%Y-%m-%d")));
        }
        if let Some(url) = verification_url {
            text.push_str(&format!("Verify: {url}\n"));
        }

        Ok(RenderedDocument {
            content_type: "text/plain; charset=utf-8".to_string(),
            bytes: text.into_bytes(),
        })
    }
}

// =============================================================================
// Notifications
// =============================================================================

/// A status change to tell the owner about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusNotification {
    pub owner_id: String,
    pub record_id: String,
    pub registration_type: RegistrationType,
    pub status: RegistrationStatus,
    pub message: String,
}

impl StatusNotification {
    pub fn for_record(record: &RegistrationRecord) -> Self {
        let message = match record.status {
            RegistrationStatus::Pending => format!(
                "Your {} registration was received and is awaiting review",
                record.registration_type
            ),
            RegistrationStatus::Rejected => format!(
                "Your {} registration was rejected: {}",
                record.registration_type,
                record
                    .rejection
                    .as_ref()
                    .map(|r| r.reason.as_str())
                    .unwrap_or("no reason given")
            ),
            RegistrationStatus::Issued => format!(
                "Your {} certificate was issued with number {}",
                record.registration_type,
                record.certificate_number.as_deref().unwrap_or("-")
            ),
            status => format!(
                "Your {} registration is now {status}",
                record.registration_type
            ),
        };

        Self {
            owner_id: record.owner_id.clone(),
            record_id: record.id.clone(),
            registration_type: record.registration_type,
            status: record.status,
            message,
        }
    }
}

pub trait NotificationDispatcher: Send + Sync {
    fn dispatch(&self, notification: &StatusNotification) -> Result<(), CollaboratorError>;
}

/// Stores notifications in the registry database for the owner to read.
pub struct StoredNotifier {
    db: Arc<RegistryDatabase>,
}

impl StoredNotifier {
    pub fn new(db: Arc<RegistryDatabase>) -> Self {
        Self { db }
    }
}

impl NotificationDispatcher for StoredNotifier {
    fn dispatch(&self, notification: &StatusNotification) -> Result<(), CollaboratorError> {
        let stored = StoredNotification {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: notification.owner_id.clone(),
            record_id: notification.record_id.clone(),
            registration_type: notification.registration_type,
            status: notification.status,
            message: notification.message.clone(),
            created_at: Utc::now(),
            read: false,
            read_at: None,
        };
        NotificationRepository::new(&self.db).insert(&stored)?;
        Ok(())
    }
}
