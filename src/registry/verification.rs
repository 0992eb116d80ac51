// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Verification Service
//!
//! Anonymous lookup behind the QR code on a certificate. Given a certificate
//! number (or, failing that, a record id) it answers with a fixed allow-list
//! of public fields.
//!
//! Soft failures only: an unknown identifier and a record that exists but is
//! not issued produce `valid: false` with one of two fixed messages, so the
//! response never reveals anything else about unissued records. Only storage
//! failures surface as errors.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::storage::{RegistrationRepository, RegistryDatabase};

use super::error::RegistryResult;
use super::expiry::is_expired;
use super::numbering::looks_like_certificate_number;
use super::{RegistrationRecord, RegistrationStatus, RegistrationType};

pub const NOT_FOUND: &str = "not found";
pub const NOT_ISSUED: &str = "not issued";

/// Public projection of an issued certificate.
///
/// Nothing here identifies the owner or the record internally.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct PublicCertificate {
    #[serde(rename = "type")]
    pub certificate_type: RegistrationType,
    pub full_name: String,
    pub event_date: NaiveDate,
    pub event_place: String,
    /// Approver's display name; omitted when the approver had none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    pub certificate_number: String,
    pub issued_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl PublicCertificate {
    fn from_record(record: &RegistrationRecord) -> Option<Self> {
        let fields = record.payload.public_fields();
        Some(Self {
            certificate_type: record.registration_type,
            full_name: fields.full_name,
            event_date: fields.event_date,
            event_place: fields.event_place,
            approved_by: record.approver_name.clone(),
            certificate_number: record.certificate_number.clone()?,
            issued_at: record.issued_at?,
            expires_at: record.expires_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct VerificationResult {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<PublicCertificate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expired: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VerificationResult {
    fn invalid(error: &str) -> Self {
        Self {
            valid: false,
            certificate: None,
            expired: None,
            error: Some(error.to_string()),
        }
    }

    fn valid(certificate: PublicCertificate, expired: bool) -> Self {
        Self {
            valid: true,
            certificate: Some(certificate),
            expired: Some(expired),
            error: None,
        }
    }
}

#[derive(Clone)]
pub struct VerificationService {
    db: Arc<RegistryDatabase>,
}

impl VerificationService {
    pub fn new(db: Arc<RegistryDatabase>) -> Self {
        Self { db }
    }

    pub fn verify(&self, identifier: &str) -> RegistryResult<VerificationResult> {
        self.verify_at(identifier, Utc::now())
    }

    pub fn verify_at(
        &self,
        identifier: &str,
        now: DateTime<Utc>,
    ) -> RegistryResult<VerificationResult> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Ok(VerificationResult::invalid(NOT_FOUND));
        }

        let repo = RegistrationRepository::new(&self.db);
        let record = if looks_like_certificate_number(identifier) {
            repo.find_by_certificate_number(identifier)?
        } else {
            None
        };
        let record = match record {
            Some(record) => Some(record),
            None => repo.find(identifier)?,
        };

        let Some(record) = record else {
            return Ok(VerificationResult::invalid(NOT_FOUND));
        };

        // EXPIRED records were issued, so they still verify (as expired).
        if !matches!(
            record.status,
            RegistrationStatus::Issued | RegistrationStatus::Expired
        ) {
            return Ok(VerificationResult::invalid(NOT_ISSUED));
        }

        match PublicCertificate::from_record(&record) {
            Some(certificate) => Ok(VerificationResult::valid(
                certificate,
                is_expired(&record, now),
            )),
            None => {
                tracing::error!(record_id = %record.id, "Issued record without certificate data");
                Ok(VerificationResult::invalid(NOT_ISSUED))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{
        Actor, ActorRole, DeathDetails, RegistrationPayload, StatusWorkflow, WorkflowPolicy,
    };

    fn setup() -> (Arc<RegistryDatabase>, VerificationService) {
        let db = Arc::new(RegistryDatabase::in_memory().unwrap());
        (db.clone(), VerificationService::new(db))
    }

    fn death_record() -> RegistrationRecord {
        RegistrationRecord::new_pending(
            "citizen-1",
            RegistrationPayload::Death(DeathDetails {
                deceased_full_name: "Old Man".to_string(),
                date_of_death: NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
                place_of_death: "Rubavu".to_string(),
                date_of_birth: None,
                cause_of_death: Some("confidential".to_string()),
                informant_full_name: Some("Informant".to_string()),
            }),
        )
    }

    fn issue(db: &RegistryDatabase, record: &RegistrationRecord, expires_at: Option<DateTime<Utc>>) -> RegistrationRecord {
        let repo = RegistrationRepository::new(db);
        let mut next = record.clone();
        next.status = RegistrationStatus::Issued;
        next.approver_name = Some("Registrar".to_string());
        next.certificate_number = Some("DC-2026-000001-00FF".to_string());
        next.issued_at = Some(Utc::now());
        next.expires_at = expires_at;
        repo.update(&next, record.version).unwrap()
    }

    #[test]
    fn unknown_identifier_is_soft_not_found() {
        let (_db, service) = setup();
        let result = service.verify("DC-2026-000009-AAAA").unwrap();
        assert!(!result.valid);
        assert_eq!(result.error.as_deref(), Some(NOT_FOUND));

        let blank = service.verify("   ").unwrap();
        assert_eq!(blank.error.as_deref(), Some(NOT_FOUND));
    }

    #[test]
    fn pending_record_is_not_issued() {
        let (db, service) = setup();
        let record = death_record();
        RegistrationRepository::new(&db).insert(&record).unwrap();

        let result = service.verify(&record.id).unwrap();
        assert!(!result.valid);
        assert_eq!(result.error.as_deref(), Some(NOT_ISSUED));
        assert!(result.certificate.is_none());
    }

    #[test]
    fn issued_record_verifies_by_number_and_id() {
        let (db, service) = setup();
        let record = death_record();
        RegistrationRepository::new(&db).insert(&record).unwrap();
        issue(&db, &record, None);

        let by_number = service.verify("DC-2026-000001-00FF").unwrap();
        assert!(by_number.valid);
        assert_eq!(by_number.expired, Some(false));
        let cert = by_number.certificate.unwrap();
        assert_eq!(cert.full_name, "Old Man");
        assert_eq!(cert.approved_by.as_deref(), Some("Registrar"));

        let by_id = service.verify(&record.id).unwrap();
        assert!(by_id.valid);
    }

    #[test]
    fn projection_is_allow_listed() {
        let (db, service) = setup();
        let record = death_record();
        RegistrationRepository::new(&db).insert(&record).unwrap();
        issue(&db, &record, None);

        let json = serde_json::to_value(service.verify("DC-2026-000001-00FF").unwrap()).unwrap();
        let cert = json["certificate"].as_object().unwrap();
        let mut keys: Vec<&str> = cert.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec![
                "approved_by",
                "certificate_number",
                "event_date",
                "event_place",
                "full_name",
                "issued_at",
                "type"
            ]
        );
        let text = json.to_string();
        assert!(!text.contains("citizen-1"));
        assert!(!text.contains("confidential"));
        assert!(!text.contains(&record.id));
    }

    #[test]
    fn past_window_is_valid_but_expired() {
        let (db, service) = setup();
        let record = death_record();
        RegistrationRepository::new(&db).insert(&record).unwrap();
        let expires = Utc::now() - chrono::Duration::minutes(1);
        issue(&db, &record, Some(expires));

        let result = service.verify("DC-2026-000001-00FF").unwrap();
        assert!(result.valid);
        assert_eq!(result.expired, Some(true));
    }

    #[test]
    fn nameless_staff_never_appear_on_public_certificate() {
        let (db, service) = setup();
        let workflow = StatusWorkflow::new(db.clone(), WorkflowPolicy::default());
        let owner = Actor::new("user_2citizenInternal", ActorRole::Citizen);
        let verifier = Actor::new("user_2verifierInternal", ActorRole::Verifier);
        let approver = Actor::new("user_2approverInternal", ActorRole::Approver);

        let record = workflow.submit(&owner, death_record().payload).unwrap();
        workflow
            .apply_transition(&verifier, &record.id, RegistrationStatus::Verified, None)
            .unwrap();
        let issued = workflow
            .apply_transition(&approver, &record.id, RegistrationStatus::Approved, None)
            .unwrap();
        assert_eq!(issued.status, RegistrationStatus::Issued);

        let result = service
            .verify(issued.certificate_number.as_deref().unwrap())
            .unwrap();
        assert!(result.valid);
        assert_eq!(result.certificate.as_ref().unwrap().approved_by, None);

        let json = serde_json::to_value(&result).unwrap();
        assert!(json["certificate"].get("approved_by").is_none());
        let text = json.to_string();
        for internal in [
            "user_2citizenInternal",
            "user_2verifierInternal",
            "user_2approverInternal",
            record.id.as_str(),
        ] {
            assert!(!text.contains(internal), "{internal} leaked into {text}");
        }
    }
}
