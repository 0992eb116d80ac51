// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared fixtures for unit and HTTP tests.

use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

use crate::registry::{StatusWorkflow, WorkflowPolicy};
use crate::state::{AppState, AuthConfig};
use crate::storage::RegistryDatabase;

/// In-memory state with development-mode auth and default policy.
pub fn test_state() -> AppState {
    test_state_with(WorkflowPolicy::default())
}

pub fn test_state_with(policy: WorkflowPolicy) -> AppState {
    let db = Arc::new(RegistryDatabase::in_memory().unwrap());
    let workflow = Arc::new(StatusWorkflow::new(db.clone(), policy));
    AppState::new(db, workflow).with_auth_config(AuthConfig::development())
}

/// Unsigned JWT accepted in development mode.
pub fn dev_token(sub: &str, role: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT"}"#);
    let claims = serde_json::json!({
        "sub": sub,
        "exp": 9_999_999_999_i64,
        "iss": "https://clerk.test",
        "name": format!("{sub} name"),
        "publicMetadata": { "role": role },
    });
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.fake_signature")
}
