// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the REST API. Domain types
//! ([`RegistrationRecord`], [`RegistrationPayload`], ...) are serialized as
//! they are; this module only adds the envelopes around them.
//!
//! ## Model Categories
//!
//! - **Registrations**: submission, payload edits, transitions, listings
//! - **Notifications**: owner inbox

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::registry::{
    RecordList, RegistrationPayload, RegistrationRecord, RegistrationStatus, RegistrationType,
};
use crate::storage::StoredNotification;

// =============================================================================
// Registration Models
// =============================================================================

/// Request to submit a new registration. The record type follows the
/// payload's `type` tag.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmitRegistrationRequest {
    pub payload: RegistrationPayload,
}

/// Request to replace the payload of a PENDING registration.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdatePayloadRequest {
    pub payload: RegistrationPayload,
}

/// Request to move a registration to another status.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransitionRequest {
    /// Destination status.
    pub status: RegistrationStatus,
    /// Required when `status` is `REJECTED`.
    #[serde(default)]
    pub reason: Option<String>,
}

/// A registration as returned to its owner or to staff.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RegistrationResponse {
    #[serde(flatten)]
    pub record: RegistrationRecord,
    /// Public verification link, once a certificate number exists and a
    /// public base URL is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_url: Option<String>,
}

/// Query parameters for listing registrations.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListRegistrationsParams {
    /// Only records in this status.
    pub status: Option<RegistrationStatus>,
    /// Only records of this type.
    #[serde(rename = "type")]
    pub registration_type: Option<RegistrationType>,
    /// Page number, starting at 1 (default 1).
    pub page: Option<usize>,
    /// Page size (default 20, max 100).
    pub page_size: Option<usize>,
}

/// A page of registrations.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RegistrationListResponse {
    pub registrations: Vec<RegistrationResponse>,
    /// Total matching records across all pages.
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

impl RegistrationListResponse {
    pub fn from_list(list: RecordList, view: impl Fn(RegistrationRecord) -> RegistrationResponse) -> Self {
        Self {
            registrations: list.records.into_iter().map(view).collect(),
            total: list.total,
            page: list.page,
            page_size: list.page_size,
        }
    }
}

// =============================================================================
// Notification Models
// =============================================================================

/// Query parameters for the notification inbox.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListNotificationsParams {
    /// Only unread notifications (default false).
    pub unread_only: Option<bool>,
    /// Maximum number of notifications (default 20, max 100).
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NotificationListResponse {
    pub notifications: Vec<StoredNotification>,
}
