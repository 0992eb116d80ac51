// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Error taxonomy of the registry core.
//!
//! None of these are retried by the core. The HTTP layer maps them to
//! status codes in [`crate::error::ApiError`].

use crate::storage::StorageError;

use super::collaborators::CollaboratorError;
use super::RegistrationStatus;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// No record (or notification, or document) with the given identifier.
    #[error("{0} not found")]
    NotFound(String),

    /// The caller's role or ownership does not permit the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The requested status is not reachable from the current one,
    /// including when another writer moved the record first.
    #[error("cannot move to {to}: {detail}")]
    InvalidTransition {
        to: RegistrationStatus,
        detail: String,
    },

    /// Malformed input, e.g. a rejection without a reason.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(StorageError),

    /// A renderer or dispatcher failed on an explicitly requested retry.
    #[error("{0}")]
    Collaborator(CollaboratorError),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

impl RegistryError {
    pub(crate) fn invalid_transition(to: RegistrationStatus, detail: impl Into<String>) -> Self {
        RegistryError::InvalidTransition {
            to,
            detail: detail.into(),
        }
    }
}

impl From<StorageError> for RegistryError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::NotFound(what) => RegistryError::NotFound(what),
            StorageError::PermissionDenied { resource, .. } => {
                RegistryError::Forbidden(format!("not allowed to access this {resource}"))
            }
            other => RegistryError::Storage(other),
        }
    }
}

impl From<CollaboratorError> for RegistryError {
    fn from(error: CollaboratorError) -> Self {
        match error {
            CollaboratorError::Storage(storage) => storage.into(),
            other => RegistryError::Collaborator(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_not_found_stays_not_found() {
        let err: RegistryError = StorageError::NotFound("Registration r1".to_string()).into();
        assert!(matches!(err, RegistryError::NotFound(ref what) if what == "Registration r1"));
        assert_eq!(err.to_string(), "Registration r1 not found");
    }

    #[test]
    fn permission_denied_becomes_forbidden() {
        let err: RegistryError = StorageError::PermissionDenied {
            user_id: "u1".to_string(),
            resource: "registration".to_string(),
        }
        .into();
        assert!(matches!(err, RegistryError::Forbidden(_)));
    }

    #[test]
    fn other_storage_errors_are_wrapped() {
        let err: RegistryError = StorageError::AlreadyExists("x".to_string()).into();
        assert!(matches!(err, RegistryError::Storage(_)));
    }
}
