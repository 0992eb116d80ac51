// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User roles for authorization.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// User roles for authorization.
///
/// ## Role Hierarchy
///
/// - `Admin` - Full access, including admin endpoints and every transition a staff role may make
/// - `Approver` - Approves verified registrations, may reject
/// - `Verifier` - Reviews and verifies submitted registrations, may reject
/// - `Citizen` - Submits registrations and sees only their own
///
/// Verifier, approver and admin are the staff roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Approver,
    Verifier,
    Citizen,
}

impl Role {
    /// Staff roles see every registration.
    pub fn is_staff(&self) -> bool {
        !matches!(self, Role::Citizen)
    }

    /// Parse role from string (case-insensitive).
    /// Used when extracting roles from Clerk public metadata.
    pub fn from_str(s: &str) -> Option<Role> {
        match s.to_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "approver" => Some(Role::Approver),
            "verifier" => Some(Role::Verifier),
            "citizen" => Some(Role::Citizen),
            _ => None,
        }
    }
}

impl Default for Role {
    /// Default role is Citizen (least privilege for authenticated users).
    fn default() -> Self {
        Role::Citizen
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Approver => write!(f, "approver"),
            Role::Verifier => write!(f, "verifier"),
            Role::Citizen => write!(f, "citizen"),
        }
    }
}
