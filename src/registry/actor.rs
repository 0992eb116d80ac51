// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Who is acting on a registration.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{AuthenticatedUser, Role};

/// Role as seen by the workflow.
///
/// `System` is never derived from a token. Only the server itself acts as
/// system, for issuance and expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    Citizen,
    Verifier,
    Approver,
    Admin,
    System,
}

impl ActorRole {
    pub const ALL: [ActorRole; 5] = [
        ActorRole::Citizen,
        ActorRole::Verifier,
        ActorRole::Approver,
        ActorRole::Admin,
        ActorRole::System,
    ];

    /// Staff see every registration.
    pub fn is_staff(&self) -> bool {
        matches!(
            self,
            ActorRole::Verifier | ActorRole::Approver | ActorRole::Admin | ActorRole::System
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActorRole::Citizen => "citizen",
            ActorRole::Verifier => "verifier",
            ActorRole::Approver => "approver",
            ActorRole::Admin => "admin",
            ActorRole::System => "system",
        }
    }
}

impl From<Role> for ActorRole {
    fn from(role: Role) -> Self {
        match role {
            Role::Citizen => ActorRole::Citizen,
            Role::Verifier => ActorRole::Verifier,
            Role::Approver => ActorRole::Approver,
            Role::Admin => ActorRole::Admin,
        }
    }
}

impl std::fmt::Display for ActorRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The caller of a workflow or access operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub role: ActorRole,
    pub display_name: Option<String>,
}

impl Actor {
    pub const SYSTEM_ID: &'static str = "system";

    pub fn new(id: impl Into<String>, role: ActorRole) -> Self {
        Self {
            id: id.into(),
            role,
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// The server acting on its own behalf.
    pub fn system() -> Self {
        Self::new(Self::SYSTEM_ID, ActorRole::System)
    }

    /// Name that may appear on a public certificate, if the actor has one.
    pub fn public_name(&self) -> Option<&str> {
        self.display_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

impl From<&AuthenticatedUser> for Actor {
    fn from(user: &AuthenticatedUser) -> Self {
        Self {
            id: user.user_id.clone(),
            role: user.role.into(),
            display_name: user.display_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_roles_never_map_to_system() {
        for role in [Role::Citizen, Role::Verifier, Role::Approver, Role::Admin] {
            assert_ne!(ActorRole::from(role), ActorRole::System);
        }
    }

    #[test]
    fn actor_from_user_keeps_display_name() {
        let user = AuthenticatedUser {
            user_id: "user_7".to_string(),
            role: Role::Approver,
            display_name: Some("Jean Mugisha".to_string()),
            session_id: None,
            issuer: String::new(),
            expires_at: 0,
        };
        let actor = Actor::from(&user);
        assert_eq!(actor.role, ActorRole::Approver);
        assert_eq!(actor.public_name(), Some("Jean Mugisha"));
        assert_eq!(Actor::new("user_8", ActorRole::Admin).public_name(), None);
        assert_eq!(
            Actor::new("user_9", ActorRole::Admin)
                .with_display_name("  ")
                .public_name(),
            None
        );
    }
}
