// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Registry Core
//!
//! Domain logic of the civil registry, independent of HTTP:
//!
//! - **types**: registration types, statuses, payloads and the record itself
//! - **transitions**: the allowed status moves and who may request them
//! - **workflow**: the single writer of status, with issuance and expiry
//! - **access**: ownership-scoped reads and listings
//! - **verification**: anonymous certificate lookup
//! - **collaborators**: document rendering and owner notifications

mod access;
mod actor;
mod collaborators;
mod error;
mod expiry;
mod numbering;
mod transitions;
mod types;
mod verification;
mod workflow;

pub use access::{AccessLayer, ListFilter, RecordList, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use actor::{Actor, ActorRole};
pub use collaborators::{
    CollaboratorError, DocumentRenderer, NotificationDispatcher, RenderedDocument,
    StatusNotification, StoredNotifier, TextCertificateRenderer,
};
pub use error::{RegistryError, RegistryResult};
pub use expiry::{is_expired, ExpiryPolicy, ExpirySweeper, DEFAULT_SWEEP_INTERVAL};
pub use numbering::{format_certificate_number, looks_like_certificate_number};
pub use transitions::{authorize, is_allowed, rule_for, TransitionRule};
pub use types::{
    AdoptionDetails, BirthDetails, DeathDetails, DivorceDetails, MarriageDetails, PublicFields,
    RegistrationPayload, RegistrationRecord, RegistrationStatus, RegistrationType, Rejection,
};
pub use verification::{PublicCertificate, VerificationResult, VerificationService};
pub use workflow::{StatusWorkflow, WorkflowPolicy};
