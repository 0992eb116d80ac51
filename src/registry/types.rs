// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Registration records and their type-specific payloads.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Vital event category. Fixed at submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationType {
    Birth,
    Death,
    Marriage,
    Divorce,
    Adoption,
}

impl RegistrationType {
    pub const ALL: [RegistrationType; 5] = [
        RegistrationType::Birth,
        RegistrationType::Death,
        RegistrationType::Marriage,
        RegistrationType::Divorce,
        RegistrationType::Adoption,
    ];

    /// Prefix used in certificate numbers (`BC-2026-000001-1A2B`).
    pub fn certificate_prefix(&self) -> &'static str {
        match self {
            RegistrationType::Birth => "BC",
            RegistrationType::Death => "DC",
            RegistrationType::Marriage => "MC",
            RegistrationType::Divorce => "DV",
            RegistrationType::Adoption => "AC",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationType::Birth => "BIRTH",
            RegistrationType::Death => "DEATH",
            RegistrationType::Marriage => "MARRIAGE",
            RegistrationType::Divorce => "DIVORCE",
            RegistrationType::Adoption => "ADOPTION",
        }
    }
}

impl std::fmt::Display for RegistrationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a registration.
///
/// `status` only ever changes through [`crate::registry::StatusWorkflow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationStatus {
    Pending,
    UnderReview,
    Verified,
    Approved,
    Issued,
    Rejected,
    Expired,
}

impl RegistrationStatus {
    pub const ALL: [RegistrationStatus; 7] = [
        RegistrationStatus::Pending,
        RegistrationStatus::UnderReview,
        RegistrationStatus::Verified,
        RegistrationStatus::Approved,
        RegistrationStatus::Issued,
        RegistrationStatus::Rejected,
        RegistrationStatus::Expired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Pending => "PENDING",
            RegistrationStatus::UnderReview => "UNDER_REVIEW",
            RegistrationStatus::Verified => "VERIFIED",
            RegistrationStatus::Approved => "APPROVED",
            RegistrationStatus::Issued => "ISSUED",
            RegistrationStatus::Rejected => "REJECTED",
            RegistrationStatus::Expired => "EXPIRED",
        }
    }

    /// No transition leaves a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RegistrationStatus::Rejected | RegistrationStatus::Expired)
    }
}

impl std::fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Payloads
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BirthDetails {
    pub child_full_name: String,
    pub date_of_birth: NaiveDate,
    pub place_of_birth: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mother_full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub father_full_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DeathDetails {
    pub deceased_full_name: String,
    pub date_of_death: NaiveDate,
    pub place_of_death: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    /// Never part of the public verification view.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause_of_death: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub informant_full_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MarriageDetails {
    pub spouse_one_full_name: String,
    pub spouse_two_full_name: String,
    pub date_of_marriage: NaiveDate,
    pub place_of_marriage: String,
    #[serde(default)]
    pub witnesses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DivorceDetails {
    pub spouse_one_full_name: String,
    pub spouse_two_full_name: String,
    pub date_of_divorce: NaiveDate,
    pub court_location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AdoptionDetails {
    pub adoptee_full_name: String,
    pub date_of_adoption: NaiveDate,
    pub court_location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adoptee_date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub adoptive_parents: Vec<String>,
}

/// Type-specific registration fields, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationPayload {
    Birth(BirthDetails),
    Death(DeathDetails),
    Marriage(MarriageDetails),
    Divorce(DivorceDetails),
    Adoption(AdoptionDetails),
}

/// The subset of payload fields that may appear on a public certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicFields {
    pub full_name: String,
    pub event_date: NaiveDate,
    pub event_place: String,
}

impl RegistrationPayload {
    pub fn registration_type(&self) -> RegistrationType {
        match self {
            RegistrationPayload::Birth(_) => RegistrationType::Birth,
            RegistrationPayload::Death(_) => RegistrationType::Death,
            RegistrationPayload::Marriage(_) => RegistrationType::Marriage,
            RegistrationPayload::Divorce(_) => RegistrationType::Divorce,
            RegistrationPayload::Adoption(_) => RegistrationType::Adoption,
        }
    }

    pub fn public_fields(&self) -> PublicFields {
        match self {
            RegistrationPayload::Birth(d) => PublicFields {
                full_name: d.child_full_name.clone(),
                event_date: d.date_of_birth,
                event_place: d.place_of_birth.clone(),
            },
            RegistrationPayload::Death(d) => PublicFields {
                full_name: d.deceased_full_name.clone(),
                event_date: d.date_of_death,
                event_place: d.place_of_death.clone(),
            },
            RegistrationPayload::Marriage(d) => PublicFields {
                full_name: format!("{} & {}", d.spouse_one_full_name, d.spouse_two_full_name),
                event_date: d.date_of_marriage,
                event_place: d.place_of_marriage.clone(),
            },
            RegistrationPayload::Divorce(d) => PublicFields {
                full_name: format!("{} & {}", d.spouse_one_full_name, d.spouse_two_full_name),
                event_date: d.date_of_divorce,
                event_place: d.court_location.clone(),
            },
            RegistrationPayload::Adoption(d) => PublicFields {
                full_name: d.adoptee_full_name.clone(),
                event_date: d.date_of_adoption,
                event_place: d.court_location.clone(),
            },
        }
    }

    /// Check the payload for obviously malformed input.
    ///
    /// Returns every problem found, not just the first.
    pub fn validate(&self, today: NaiveDate) -> Result<(), Vec<String>> {
        let mut problems = Vec::new();

        let mut require = |field: &str, value: &str| {
            if value.trim().is_empty() {
                problems.push(format!("{field} must not be empty"));
            }
        };

        match self {
            RegistrationPayload::Birth(d) => {
                require("child_full_name", &d.child_full_name);
                require("place_of_birth", &d.place_of_birth);
            }
            RegistrationPayload::Death(d) => {
                require("deceased_full_name", &d.deceased_full_name);
                require("place_of_death", &d.place_of_death);
            }
            RegistrationPayload::Marriage(d) => {
                require("spouse_one_full_name", &d.spouse_one_full_name);
                require("spouse_two_full_name", &d.spouse_two_full_name);
                require("place_of_marriage", &d.place_of_marriage);
            }
            RegistrationPayload::Divorce(d) => {
                require("spouse_one_full_name", &d.spouse_one_full_name);
                require("spouse_two_full_name", &d.spouse_two_full_name);
                require("court_location", &d.court_location);
            }
            RegistrationPayload::Adoption(d) => {
                require("adoptee_full_name", &d.adoptee_full_name);
                require("court_location", &d.court_location);
            }
        }

        let fields = self.public_fields();
        if fields.event_date > today {
            problems.push("event date must not be in the future".to_string());
        }

        match self {
            RegistrationPayload::Death(d) => {
                if let Some(born) = d.date_of_birth {
                    if born > d.date_of_death {
                        problems.push("date_of_birth must not be after date_of_death".to_string());
                    }
                }
            }
            RegistrationPayload::Marriage(MarriageDetails {
                spouse_one_full_name: a,
                spouse_two_full_name: b,
                ..
            })
            | RegistrationPayload::Divorce(DivorceDetails {
                spouse_one_full_name: a,
                spouse_two_full_name: b,
                ..
            }) => {
                if !a.trim().is_empty() && a.trim().eq_ignore_ascii_case(b.trim()) {
                    problems.push("spouses must be two different people".to_string());
                }
            }
            RegistrationPayload::Adoption(d) => {
                if let Some(born) = d.adoptee_date_of_birth {
                    if born > d.date_of_adoption {
                        problems.push(
                            "adoptee_date_of_birth must not be after date_of_adoption".to_string(),
                        );
                    }
                }
            }
            RegistrationPayload::Birth(_) => {}
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }
}

// ============================================================================
// Record
// ============================================================================

/// Why and by whom a registration was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Rejection {
    pub reason: String,
    pub rejected_by: String,
    pub rejected_at: DateTime<Utc>,
}

/// One application for a vital event registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RegistrationRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub registration_type: RegistrationType,
    pub owner_id: String,
    pub status: RegistrationStatus,
    pub payload: RegistrationPayload,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verifier_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approver_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approver_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expired_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection: Option<Rejection>,
    /// Set when this record was created by resubmitting a rejected one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resubmitted_from: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Incremented on every write; used for compare-and-swap updates.
    pub version: u64,
}

impl RegistrationRecord {
    /// Build a fresh PENDING record for `owner_id`.
    pub fn new_pending(owner_id: impl Into<String>, payload: RegistrationPayload) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            registration_type: payload.registration_type(),
            owner_id: owner_id.into(),
            status: RegistrationStatus::Pending,
            payload,
            reviewer_id: None,
            review_started_at: None,
            verifier_id: None,
            verified_at: None,
            approver_id: None,
            approver_name: None,
            approved_at: None,
            certificate_number: None,
            issued_at: None,
            expires_at: None,
            expired_at: None,
            rejection: None,
            resubmitted_from: None,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }
}

impl crate::storage::OwnedResource for RegistrationRecord {
    fn owner_user_id(&self) -> &str {
        &self.owner_id
    }
}
