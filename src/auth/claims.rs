// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and authenticated user representation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::roles::Role;

/// Claims read from a Clerk session token.
///
/// Only the fields the registry needs are decoded; `aud`, `iss` and `exp`
/// are validated by `jsonwebtoken` in production mode.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Expiration timestamp
    #[serde(default)]
    pub exp: i64,
    /// Issuer
    #[serde(default)]
    pub iss: String,
    /// Session ID (Clerk-specific)
    #[serde(default)]
    pub sid: Option<String>,
    /// Full name, when the session token template includes it
    #[serde(default)]
    pub name: Option<String>,
    /// Clerk public metadata containing role
    #[serde(default, rename = "publicMetadata")]
    pub public_metadata: Option<PublicMetadata>,
}

/// Clerk public metadata structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PublicMetadata {
    /// User's role (set in Clerk dashboard)
    #[serde(default)]
    pub role: Option<String>,
}

/// Authenticated user information extracted from JWT.
///
/// This is the primary type used throughout the application to represent
/// the authenticated user making a request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    /// Canonical user ID (Clerk `sub` claim)
    pub user_id: String,

    /// User's role
    pub role: Role,

    /// Display name; shown as the approver on issued certificates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Session ID (if available)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Original issuer (used for validation, not serialized)
    #[serde(skip)]
    pub issuer: String,

    /// Token expiration (Unix timestamp, not serialized)
    #[serde(skip)]
    pub expires_at: i64,
}

impl AuthenticatedUser {
    /// Create from decoded claims. Unknown or missing roles become `Citizen`.
    pub fn from_claims(claims: JwtClaims) -> Self {
        let role = claims
            .public_metadata
            .as_ref()
            .and_then(|m| m.role.as_deref())
            .and_then(Role::from_str)
            .unwrap_or_default();

        Self {
            user_id: claims.sub,
            role,
            display_name: claims.name.filter(|n| !n.trim().is_empty()),
            session_id: claims.sid,
            issuer: claims.iss,
            expires_at: claims.exp,
        }
    }

    /// Check if this user is an admin.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_claims() -> JwtClaims {
        JwtClaims {
            sub: "user_123".to_string(),
            exp: 1700003600,
            iss: "https://clerk.example.com".to_string(),
            sid: Some("sess_abc".to_string()),
            name: Some("Amina Uwase".to_string()),
            public_metadata: Some(PublicMetadata {
                role: Some("approver".to_string()),
            }),
        }
    }

    #[test]
    fn from_claims_extracts_user_id_and_name() {
        let user = AuthenticatedUser::from_claims(sample_claims());
        assert_eq!(user.user_id, "user_123");
        assert_eq!(user.display_name.as_deref(), Some("Amina Uwase"));
    }

    #[test]
    fn from_claims_extracts_role_from_metadata() {
        let user = AuthenticatedUser::from_claims(sample_claims());
        assert_eq!(user.role, Role::Approver);
    }

    #[test]
    fn from_claims_defaults_to_citizen_role() {
        let mut claims = sample_claims();
        claims.public_metadata = None;
        let user = AuthenticatedUser::from_claims(claims);
        assert_eq!(user.role, Role::Citizen);

        let mut claims = sample_claims();
        claims.public_metadata = Some(PublicMetadata {
            role: Some("system".to_string()),
        });
        assert_eq!(AuthenticatedUser::from_claims(claims).role, Role::Citizen);
    }

    #[test]
    fn blank_name_is_dropped() {
        let mut claims = sample_claims();
        claims.name = Some("  ".to_string());
        assert!(AuthenticatedUser::from_claims(claims).display_name.is_none());
    }

    #[test]
    fn claims_parse_clerk_shape() {
        let json = r#"{"sub":"user_9","exp":10,"iss":"i","publicMetadata":{"role":"admin"}}"#;
        let claims: JwtClaims = serde_json::from_str(json).unwrap();
        let user = AuthenticatedUser::from_claims(claims);
        assert!(user.is_admin());
        assert!(user.role.is_staff());
    }
}
