// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Certificate numbers: `{PREFIX}-{YEAR}-{SEQ:06}-{RAND4}`.
//!
//! The sequence is per prefix and year. The random suffix makes numbers
//! hard to enumerate from a single known certificate.

use chrono::{DateTime, Datelike, Utc};

use crate::storage::{RegistrationRepository, StorageResult};

use super::RegistrationType;

/// Format a certificate number from its parts.
pub fn format_certificate_number(
    registration_type: RegistrationType,
    year: i32,
    sequence: u64,
    suffix: &str,
) -> String {
    format!(
        "{}-{year}-{sequence:06}-{suffix}",
        registration_type.certificate_prefix()
    )
}

/// Four uppercase hex digits from a fresh v4 UUID.
pub fn random_suffix() -> String {
    let bytes = uuid::Uuid::new_v4().into_bytes();
    format!("{:02X}{:02X}", bytes[0], bytes[1])
}

/// Reserve a sequence and build the next number for `registration_type`.
pub fn next_certificate_number(
    repo: &RegistrationRepository<'_>,
    registration_type: RegistrationType,
    issued_at: DateTime<Utc>,
) -> StorageResult<String> {
    let year = issued_at.year();
    let sequence =
        repo.next_certificate_sequence(registration_type.certificate_prefix(), year)?;
    Ok(format_certificate_number(
        registration_type,
        year,
        sequence,
        &random_suffix(),
    ))
}

/// Cheap shape check used to pick the lookup order in verification.
pub fn looks_like_certificate_number(identifier: &str) -> bool {
    let parts: Vec<&str> = identifier.split('-').collect();
    let [prefix, year, sequence, suffix] = parts.as_slice() else {
        return false;
    };
    RegistrationType::ALL
        .iter()
        .any(|t| t.certificate_prefix() == *prefix)
        && year.len() == 4
        && year.chars().all(|c| c.is_ascii_digit())
        && sequence.len() >= 6
        && sequence.chars().all(|c| c.is_ascii_digit())
        && suffix.len() == 4
        && suffix.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::RegistryDatabase;
    use chrono::TimeZone;

    #[test]
    fn format_pads_sequence() {
        assert_eq!(
            format_certificate_number(RegistrationType::Marriage, 2026, 42, "0A1B"),
            "MC-2026-000042-0A1B"
        );
    }

    #[test]
    fn suffix_is_four_hex_digits() {
        for _ in 0..32 {
            let suffix = random_suffix();
            assert_eq!(suffix.len(), 4);
            assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
        }
    }

    #[test]
    fn numbers_increment_per_prefix_and_year() {
        let db = RegistryDatabase::in_memory().unwrap();
        let repo = RegistrationRepository::new(&db);
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();

        let first = next_certificate_number(&repo, RegistrationType::Birth, at).unwrap();
        let second = next_certificate_number(&repo, RegistrationType::Birth, at).unwrap();
        let death = next_certificate_number(&repo, RegistrationType::Death, at).unwrap();

        assert!(first.starts_with("BC-2026-000001-"));
        assert!(second.starts_with("BC-2026-000002-"));
        assert!(death.starts_with("DC-2026-000001-"));
    }

    #[test]
    fn shape_check() {
        assert!(looks_like_certificate_number("BC-2026-000001-9F3A"));
        assert!(looks_like_certificate_number("AC-2026-1234567-abcd"));
        assert!(!looks_like_certificate_number("XX-2026-000001-9F3A"));
        assert!(!looks_like_certificate_number("BC-26-000001-9F3A"));
        assert!(!looks_like_certificate_number(
            "2f1c5c3e-8d0c-4d3e-9b61-0b8f3f0b9c1a"
        ));
    }
}
