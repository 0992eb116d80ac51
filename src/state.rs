// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;
use std::time::Instant;

use crate::auth::JwksManager;
use crate::registry::{AccessLayer, StatusWorkflow, VerificationService};
use crate::storage::RegistryDatabase;

/// How bearer tokens are verified.
///
/// `Default` is the unconfigured state: no JWKS and no dev mode, so every
/// authenticated request is rejected.
#[derive(Clone, Default)]
pub struct AuthConfig {
    pub jwks: Option<JwksManager>,
    pub issuer: Option<String>,
    pub audience: Option<String>,
    /// Accept unsigned tokens. Ignored when `jwks` is set.
    pub dev_mode: bool,
}

impl AuthConfig {
    pub fn production(
        jwks: JwksManager,
        issuer: Option<String>,
        audience: Option<String>,
    ) -> Self {
        Self {
            jwks: Some(jwks),
            issuer,
            audience,
            dev_mode: false,
        }
    }

    pub fn development() -> Self {
        Self {
            dev_mode: true,
            ..Self::default()
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<RegistryDatabase>,
    pub workflow: Arc<StatusWorkflow>,
    pub access: AccessLayer,
    pub verification: VerificationService,
    pub auth_config: AuthConfig,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(db: Arc<RegistryDatabase>, workflow: Arc<StatusWorkflow>) -> Self {
        Self {
            access: workflow.access().clone(),
            verification: VerificationService::new(db.clone()),
            db,
            workflow,
            auth_config: AuthConfig::default(),
            started_at: Instant::now(),
        }
    }

    pub fn with_auth_config(mut self, auth_config: AuthConfig) -> Self {
        self.auth_config = auth_config;
        self
    }
}
