// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Status Workflow
//!
//! The only writer of registration status. Every change goes through
//! [`StatusWorkflow::apply_transition`], which checks, in order:
//!
//! 1. the destination is reachable at all (`InvalidTransition`)
//! 2. the actor's role may request it (`Forbidden`)
//! 3. a rejection carries a reason (`Validation`)
//! 4. the record exists (`NotFound`)
//! 5. the record's current status is an allowed source (`InvalidTransition`)
//! 6. nobody wrote the record since it was read (`InvalidTransition`)
//!
//! Step 6 is a compare-and-swap on the record version inside one redb write
//! transaction, so of two conflicting staff actions exactly one lands.
//!
//! ## Side Effects
//!
//! After a successful write the workflow logs, audits and notifies the owner.
//! Reaching APPROVED triggers issuance (when `auto_issue` is on) as a second,
//! separate write by the system actor; reaching ISSUED triggers rendering.
//! None of these can undo the committed transition.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, info, warn};
use url::Url;

use crate::audit_log;
use crate::storage::{
    AuditEvent, AuditEventType, DocumentMetadata, DocumentRepository, RegistrationRepository,
    RegistryDatabase, StorageError,
};

use super::access::AccessLayer;
use super::actor::{Actor, ActorRole};
use super::collaborators::{
    CollaboratorError, DocumentRenderer, NotificationDispatcher, StatusNotification,
    StoredNotifier, TextCertificateRenderer,
};
use super::error::{RegistryError, RegistryResult};
use super::expiry::{is_past_expiry, ExpiryPolicy};
use super::numbering::next_certificate_number;
use super::transitions::{self, TransitionRule};
use super::{RegistrationPayload, RegistrationRecord, RegistrationStatus, Rejection};

/// A freshly generated certificate number can only collide with imported
/// data; retry a couple of times with a new sequence before giving up.
const MAX_ISSUE_ATTEMPTS: usize = 3;

/// Policy knobs, read from configuration at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowPolicy {
    /// Issue immediately after approval.
    pub auto_issue: bool,
    /// Allow owners to resubmit a rejected registration as a new record.
    pub allow_resubmission: bool,
    pub expiry: ExpiryPolicy,
}

impl Default for WorkflowPolicy {
    fn default() -> Self {
        Self {
            auto_issue: true,
            allow_resubmission: true,
            expiry: ExpiryPolicy::never(),
        }
    }
}

pub struct StatusWorkflow {
    db: Arc<RegistryDatabase>,
    access: AccessLayer,
    policy: WorkflowPolicy,
    renderer: Arc<dyn DocumentRenderer>,
    notifier: Arc<dyn NotificationDispatcher>,
    public_base_url: Option<Url>,
}

impl StatusWorkflow {
    /// Workflow with the default collaborators: plain-text certificates and
    /// notifications stored in the registry database.
    pub fn new(db: Arc<RegistryDatabase>, policy: WorkflowPolicy) -> Self {
        Self {
            access: AccessLayer::new(db.clone()),
            renderer: Arc::new(TextCertificateRenderer),
            notifier: Arc::new(StoredNotifier::new(db.clone())),
            db,
            policy,
            public_base_url: None,
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn DocumentRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationDispatcher>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_public_base_url(mut self, url: Option<Url>) -> Self {
        self.public_base_url = url;
        self
    }

    pub fn policy(&self) -> &WorkflowPolicy {
        &self.policy
    }

    pub fn access(&self) -> &AccessLayer {
        &self.access
    }

    /// `{PUBLIC_BASE_URL}/v1/verify/{number}`, if a public base URL is set.
    pub fn verification_url(&self, certificate_number: &str) -> Option<Url> {
        let mut url = self.public_base_url.clone()?;
        {
            let mut segments = url.path_segments_mut().ok()?;
            segments
                .pop_if_empty()
                .extend(["v1", "verify", certificate_number]);
        }
        Some(url)
    }

    // -------------------------------------------------------------------------
    // Submission
    // -------------------------------------------------------------------------

    /// Create a PENDING registration owned by `actor`.
    pub fn submit(
        &self,
        actor: &Actor,
        payload: RegistrationPayload,
    ) -> RegistryResult<RegistrationRecord> {
        if actor.role == ActorRole::System {
            return Err(RegistryError::Forbidden(
                "the system actor cannot own registrations".to_string(),
            ));
        }
        validate_payload(&payload)?;

        let record = RegistrationRecord::new_pending(actor.id.clone(), payload);
        RegistrationRepository::new(&self.db).insert(&record)?;

        info!(
            record_id = %record.id,
            registration_type = %record.registration_type,
            owner_id = %record.owner_id,
            "Registration submitted"
        );
        audit_log!(
            &self.db,
            AuditEventType::RegistrationSubmitted,
            actor,
            "registration",
            record.id.as_str()
        );
        self.notify(&record);
        Ok(record)
    }

    /// Replace the payload of the caller's own PENDING registration.
    pub fn update_payload(
        &self,
        actor: &Actor,
        id: &str,
        payload: RegistrationPayload,
    ) -> RegistryResult<RegistrationRecord> {
        let current = self.access.get_owned(actor, id)?;
        if current.status != RegistrationStatus::Pending {
            return Err(RegistryError::Validation(format!(
                "the payload can only be changed while PENDING (currently {})",
                current.status
            )));
        }
        if payload.registration_type() != current.registration_type {
            return Err(RegistryError::Validation(format!(
                "payload type {} does not match registration type {}",
                payload.registration_type(),
                current.registration_type
            )));
        }
        validate_payload(&payload)?;

        let mut next = current.clone();
        next.payload = payload;
        let updated = RegistrationRepository::new(&self.db)
            .update(&next, current.version)
            .map_err(|error| conflict_to_invalid(error, RegistrationStatus::Pending))?;

        audit_log!(
            &self.db,
            AuditEventType::PayloadUpdated,
            actor,
            "registration",
            updated.id.as_str()
        );
        Ok(updated)
    }

    /// Start a new PENDING registration from the caller's REJECTED one.
    ///
    /// The rejected record is left untouched; the new one links back to it
    /// through `resubmitted_from`.
    pub fn resubmit(&self, actor: &Actor, id: &str) -> RegistryResult<RegistrationRecord> {
        if !self.policy.allow_resubmission {
            return Err(RegistryError::Forbidden(
                "resubmission of rejected registrations is disabled".to_string(),
            ));
        }
        let rejected = self.access.get_owned(actor, id)?;
        if rejected.status != RegistrationStatus::Rejected {
            return Err(RegistryError::invalid_transition(
                RegistrationStatus::Pending,
                format!("only REJECTED registrations can be resubmitted, this one is {}", rejected.status),
            ));
        }

        let mut record = RegistrationRecord::new_pending(actor.id.clone(), rejected.payload.clone());
        record.resubmitted_from = Some(rejected.id.clone());
        RegistrationRepository::new(&self.db).insert(&record)?;

        info!(
            record_id = %record.id,
            resubmitted_from = %rejected.id,
            "Registration resubmitted"
        );
        let event = AuditEvent::new(AuditEventType::RegistrationResubmitted)
            .with_user(actor.id.as_str())
            .with_resource("registration", record.id.as_str())
            .with_details(json!({ "resubmitted_from": rejected.id }));
        audit_log!(&self.db, event);
        self.notify(&record);
        Ok(record)
    }

    // -------------------------------------------------------------------------
    // Transitions
    // -------------------------------------------------------------------------

    /// Move a registration to `requested` on behalf of `actor`.
    ///
    /// Returns the stored record. When the transition reaches APPROVED and
    /// `auto_issue` is on, the returned record is the issued one, or the
    /// approved one if issuance failed (it can be retried with [`Self::issue`]).
    pub fn apply_transition(
        &self,
        actor: &Actor,
        id: &str,
        requested: RegistrationStatus,
        reason: Option<&str>,
    ) -> RegistryResult<RegistrationRecord> {
        let rule = transitions::authorize(actor.role, requested)
            .inspect_err(|error| self.audit_denied(actor, id, requested, error))?;

        let reason = reason.map(str::trim).filter(|r| !r.is_empty());
        if requested == RegistrationStatus::Rejected && reason.is_none() {
            return Err(RegistryError::Validation(
                "a reason is required to reject a registration".to_string(),
            ));
        }

        let current = self.access.get_record_for_mutation(id)?;
        let updated = self
            .commit(actor, rule, &current, reason, Utc::now())
            .inspect_err(|error| {
                if matches!(error, RegistryError::InvalidTransition { .. }) {
                    self.audit_denied(actor, id, requested, error);
                }
            })?;
        self.after_transition(actor, current.status, &updated, reason);

        if updated.status == RegistrationStatus::Approved && self.policy.auto_issue {
            return Ok(match self.issue(id) {
                Ok(issued) => issued,
                Err(error) => {
                    warn!(record_id = %id, %error, "Automatic issuance failed");
                    updated
                }
            });
        }
        Ok(updated)
    }

    /// APPROVED → ISSUED as the system actor.
    pub fn issue(&self, id: &str) -> RegistryResult<RegistrationRecord> {
        self.apply_transition(&Actor::system(), id, RegistrationStatus::Issued, None)
    }

    /// Move every ISSUED record whose validity window elapsed by `now` to
    /// EXPIRED. Returns how many were expired.
    pub fn expire_due(&self, now: DateTime<Utc>) -> RegistryResult<usize> {
        let system = Actor::system();
        let rule = transitions::authorize(system.role, RegistrationStatus::Expired)?;

        let due: Vec<RegistrationRecord> = RegistrationRepository::new(&self.db)
            .list_by_status(RegistrationStatus::Issued)?
            .into_iter()
            .filter(|record| is_past_expiry(record, now))
            .collect();

        let mut expired = 0;
        for record in due {
            match self.commit(&system, rule, &record, None, now) {
                Ok(updated) => {
                    self.after_transition(&system, record.status, &updated, None);
                    expired += 1;
                }
                // Someone else moved it first
                Err(RegistryError::InvalidTransition { .. }) => {
                    debug!(record_id = %record.id, "Skipped expiry of changed record");
                }
                Err(error) => return Err(error),
            }
        }
        Ok(expired)
    }

    /// Validate the source state and write the transition with a version check.
    fn commit(
        &self,
        actor: &Actor,
        rule: &TransitionRule,
        current: &RegistrationRecord,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> RegistryResult<RegistrationRecord> {
        if !rule.allows_from(current.status) {
            return Err(RegistryError::invalid_transition(
                rule.to,
                format!("not reachable from {}", current.status),
            ));
        }

        let repo = RegistrationRepository::new(&self.db);
        let mut attempt = 1;
        loop {
            let mut next = current.clone();
            next.status = rule.to;

            match rule.to {
                RegistrationStatus::UnderReview => {
                    next.reviewer_id = Some(actor.id.clone());
                    next.review_started_at = Some(now);
                }
                RegistrationStatus::Verified => {
                    next.verifier_id = Some(actor.id.clone());
                    next.verified_at = Some(now);
                }
                RegistrationStatus::Approved => {
                    next.approver_id = Some(actor.id.clone());
                    // Public on the certificate; never fall back to the internal user id
                    next.approver_name = actor.public_name().map(str::to_string);
                    next.approved_at = Some(now);
                }
                RegistrationStatus::Issued => {
                    let number = next_certificate_number(&repo, current.registration_type, now)?;
                    next.certificate_number = Some(number);
                    next.issued_at = Some(now);
                    next.expires_at = self.policy.expiry.expires_at(now);
                }
                RegistrationStatus::Rejected => {
                    next.rejection = Some(Rejection {
                        reason: reason.unwrap_or_default().to_string(),
                        rejected_by: actor.id.clone(),
                        rejected_at: now,
                    });
                }
                RegistrationStatus::Expired => {
                    if !is_past_expiry(current, now) {
                        return Err(RegistryError::invalid_transition(
                            rule.to,
                            "the certificate is still within its validity window",
                        ));
                    }
                    next.expired_at = Some(now);
                }
                RegistrationStatus::Pending => {
                    return Err(RegistryError::invalid_transition(
                        rule.to,
                        "no transition leads to this status",
                    ));
                }
            }

            match repo.update(&next, current.version) {
                Ok(stored) => return Ok(stored),
                Err(StorageError::CertificateCollision(number)) if attempt < MAX_ISSUE_ATTEMPTS => {
                    warn!(record_id = %current.id, %number, attempt, "Certificate number collision, retrying");
                    attempt += 1;
                }
                Err(error) => return Err(conflict_to_invalid(error, rule.to)),
            }
        }
    }

    fn after_transition(
        &self,
        actor: &Actor,
        from: RegistrationStatus,
        record: &RegistrationRecord,
        reason: Option<&str>,
    ) {
        info!(
            record_id = %record.id,
            %from,
            to = %record.status,
            actor_id = %actor.id,
            actor_role = %actor.role,
            "Registration status changed"
        );

        let event = AuditEvent::new(AuditEventType::StatusChanged)
            .with_user(actor.id.as_str())
            .with_resource("registration", record.id.as_str())
            .with_details(json!({
                "from": from,
                "to": record.status,
                "actor_role": actor.role,
                "reason": reason,
            }));
        audit_log!(&self.db, event);

        match record.status {
            RegistrationStatus::Issued => {
                let event = AuditEvent::new(AuditEventType::CertificateIssued)
                    .with_user(actor.id.as_str())
                    .with_resource("registration", record.id.as_str())
                    .with_details(json!({ "certificate_number": record.certificate_number }));
                audit_log!(&self.db, event);
                self.render_best_effort(record);
            }
            RegistrationStatus::Expired => {
                audit_log!(
                    &self.db,
                    AuditEventType::CertificateExpired,
                    actor,
                    "registration",
                    record.id.as_str()
                );
            }
            _ => {}
        }

        self.notify(record);
    }

    // -------------------------------------------------------------------------
    // Collaborators
    // -------------------------------------------------------------------------

    /// Re-render the certificate of an ISSUED or EXPIRED registration.
    ///
    /// Expired records keep their certificate number, so their document can
    /// still be reproduced for the archive.
    pub fn render_document(&self, id: &str) -> RegistryResult<DocumentMetadata> {
        let record = self.access.get_record_for_mutation(id)?;
        if !matches!(
            record.status,
            RegistrationStatus::Issued | RegistrationStatus::Expired
        ) {
            return Err(RegistryError::Validation(format!(
                "only ISSUED or EXPIRED registrations have a certificate document (currently {})",
                record.status
            )));
        }
        Ok(self.render(&record)?)
    }

    fn render(&self, record: &RegistrationRecord) -> Result<DocumentMetadata, CollaboratorError> {
        let url = record
            .certificate_number
            .as_deref()
            .and_then(|number| self.verification_url(number));
        let document = self
            .renderer
            .render(record.registration_type, record, url.as_ref())?;
        Ok(DocumentRepository::new(&self.db).put(
            &record.id,
            &document.content_type,
            &document.bytes,
        )?)
    }

    fn render_best_effort(&self, record: &RegistrationRecord) {
        match self.render(record) {
            Ok(meta) => {
                debug!(record_id = %record.id, sha256 = %meta.sha256, "Certificate rendered");
                let event = AuditEvent::new(AuditEventType::DocumentRendered)
                    .with_user(Actor::SYSTEM_ID)
                    .with_resource("registration", record.id.as_str())
                    .with_details(json!({ "sha256": meta.sha256, "size_bytes": meta.size_bytes }));
                audit_log!(&self.db, event);
            }
            Err(error) => {
                warn!(record_id = %record.id, %error, "Certificate rendering failed");
                let event = AuditEvent::new(AuditEventType::RenderFailed)
                    .with_user(Actor::SYSTEM_ID)
                    .with_resource("registration", record.id.as_str())
                    .failed(error.to_string());
                audit_log!(&self.db, event);
            }
        }
    }

    fn notify(&self, record: &RegistrationRecord) {
        let notification = StatusNotification::for_record(record);
        if let Err(error) = self.notifier.dispatch(&notification) {
            warn!(record_id = %record.id, %error, "Notification dispatch failed");
        }
    }

    fn audit_denied(
        &self,
        actor: &Actor,
        id: &str,
        requested: RegistrationStatus,
        error: &RegistryError,
    ) {
        let event = AuditEvent::new(AuditEventType::TransitionDenied)
            .with_user(actor.id.as_str())
            .with_resource("registration", id)
            .with_details(json!({ "requested": requested, "actor_role": actor.role }))
            .failed(error.to_string());
        audit_log!(&self.db, event);
    }
}

fn validate_payload(payload: &RegistrationPayload) -> RegistryResult<()> {
    payload
        .validate(Utc::now().date_naive())
        .map_err(|problems| RegistryError::Validation(problems.join("; ")))
}

/// A version conflict means the record moved after it was read.
fn conflict_to_invalid(error: StorageError, to: RegistrationStatus) -> RegistryError {
    match error {
        StorageError::VersionConflict { .. } => RegistryError::invalid_transition(
            to,
            "the registration changed while the request was processed",
        ),
        other => other.into(),
    }
}
