// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The caller's identity as the registry sees it.

use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    auth::{Auth, AuthenticatedUser, Role},
    registry::{authorize, ActorRole, RegistrationStatus},
};

#[derive(Debug, Serialize, ToSchema)]
pub struct UserMeResponse {
    pub user_id: String,
    pub role: Role,
    /// Staff see every registration; citizens only their own.
    pub is_staff: bool,
    /// Shown as "approved by" on certificates this user approves.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Statuses this role may request through the transitions endpoint.
    pub permitted_transitions: Vec<RegistrationStatus>,
}

impl From<AuthenticatedUser> for UserMeResponse {
    fn from(user: AuthenticatedUser) -> Self {
        let actor_role = ActorRole::from(user.role);
        let permitted_transitions = RegistrationStatus::ALL
            .into_iter()
            .filter(|&to| authorize(actor_role, to).is_ok())
            .collect();
        Self {
            user_id: user.user_id,
            is_staff: user.role.is_staff(),
            role: user.role,
            display_name: user.display_name,
            session_id: user.session_id,
            permitted_transitions,
        }
    }
}

/// Who am I, and what may I do to a registration.
#[utoipa::path(
    get,
    path = "/v1/users/me",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller identity and permissions", body = UserMeResponse),
        (status = 401, description = "Not authenticated"),
    )
)]
pub async fn get_current_user(Auth(user): Auth) -> Json<UserMeResponse> {
    Json(user.into())
}
