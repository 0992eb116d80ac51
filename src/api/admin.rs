// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Admin-only API endpoints.
//!
//! These endpoints require the Admin role and provide:
//! - Registry statistics
//! - Audit log queries
//! - Issuance and rendering retries

use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    api::registrations::registration_view,
    audit_log,
    auth::AdminOnly,
    error::ApiError,
    models::RegistrationResponse,
    registry::Actor,
    state::AppState,
    storage::{
        AuditEvent, AuditEventType, AuditQuery, AuditRepository, DocumentMetadata,
        RegistrationRepository,
    },
};

const DEFAULT_AUDIT_LIMIT: usize = 100;
const MAX_AUDIT_LIMIT: usize = 1000;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Registry statistics response.
#[derive(Debug, Serialize, ToSchema)]
pub struct SystemStatsResponse {
    /// Total number of registrations.
    pub total_registrations: usize,
    /// Registrations per status (e.g. `PENDING`).
    pub by_status: BTreeMap<String, usize>,
    /// Registrations per type (e.g. `BIRTH`).
    pub by_type: BTreeMap<String, usize>,
    /// Seconds since the server started.
    pub uptime_seconds: u64,
    /// Current timestamp.
    pub timestamp: String,
}

/// Query parameters for audit log queries.
#[derive(Debug, Deserialize, IntoParams)]
pub struct AuditQueryParams {
    /// Start date (YYYY-MM-DD format, default today).
    pub start_date: Option<String>,
    /// End date (YYYY-MM-DD format, default today, inclusive).
    pub end_date: Option<String>,
    /// Filter by user ID.
    pub user_id: Option<String>,
    /// Filter by event type (e.g. `status_changed`).
    pub event_type: Option<AuditEventType>,
    /// Filter by resource ID.
    pub resource_id: Option<String>,
    /// Maximum number of results (default 100, max 1000).
    pub limit: Option<usize>,
    /// Offset for pagination.
    pub offset: Option<usize>,
}

/// Response for audit log queries.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuditLogResponse {
    /// Audit events matching the query, newest first.
    pub events: Vec<AuditEvent>,
    /// Total count (before limit/offset).
    pub total: usize,
    /// Whether there are more results.
    pub has_more: bool,
}

fn parse_date(value: Option<&str>, name: &str, default: NaiveDate) -> Result<NaiveDate, ApiError> {
    match value {
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map_err(|_| ApiError::bad_request(format!("Invalid {name} format. Use YYYY-MM-DD."))),
        None => Ok(default),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Get registry statistics.
///
/// Returns registration counts by status and by type. Admin only.
#[utoipa::path(
    get,
    path = "/v1/admin/stats",
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Registry statistics", body = SystemStatsResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not authorized (admin required)")
    )
)]
pub async fn get_system_stats(
    AdminOnly(user): AdminOnly,
    State(state): State<AppState>,
) -> Result<Json<SystemStatsResponse>, ApiError> {
    let counts = RegistrationRepository::new(&state.db).counts()?;

    let mut by_status = BTreeMap::new();
    let mut by_type = BTreeMap::new();
    for ((registration_type, status), count) in &counts {
        *by_status.entry(status.to_string()).or_insert(0) += count;
        *by_type.entry(registration_type.to_string()).or_insert(0) += count;
    }

    audit_log!(
        &state.db,
        AuditEventType::AdminAccess,
        Actor::from(&user),
        "stats",
        "registry"
    );

    Ok(Json(SystemStatsResponse {
        total_registrations: counts.values().sum(),
        by_status,
        by_type,
        uptime_seconds: state.started_at.elapsed().as_secs(),
        timestamp: Utc::now().to_rfc3339(),
    }))
}

/// Query audit logs.
///
/// Search and filter audit log entries by date range, user ID, event type
/// and resource ID. Admin only.
#[utoipa::path(
    get,
    path = "/v1/admin/audit/events",
    tag = "Admin",
    params(AuditQueryParams),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Audit events", body = AuditLogResponse),
        (status = 400, description = "Invalid query parameters"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not authorized (admin required)")
    )
)]
pub async fn query_audit_logs(
    AdminOnly(admin_user): AdminOnly,
    Query(params): Query<AuditQueryParams>,
    State(state): State<AppState>,
) -> Result<Json<AuditLogResponse>, ApiError> {
    let today = Utc::now().date_naive();
    let start_date = parse_date(params.start_date.as_deref(), "start_date", today)?;
    let end_date = parse_date(params.end_date.as_deref(), "end_date", today)?;
    if start_date > end_date {
        return Err(ApiError::bad_request("start_date must not be after end_date"));
    }

    let limit = params.limit.unwrap_or(DEFAULT_AUDIT_LIMIT).min(MAX_AUDIT_LIMIT);
    let offset = params.offset.unwrap_or(0);

    let page = AuditRepository::new(&state.db).query(&AuditQuery {
        start_date,
        end_date,
        user_id: params.user_id,
        event_type: params.event_type,
        resource_id: params.resource_id,
        offset,
        limit,
    })?;

    // Log the admin access
    audit_log!(
        &state.db,
        AuditEventType::AdminAccess,
        Actor::from(&admin_user),
        "audit_log",
        "query"
    );

    Ok(Json(AuditLogResponse {
        has_more: offset + page.events.len() < page.total,
        events: page.events,
        total: page.total,
    }))
}

/// Issue the certificate of an APPROVED registration.
///
/// Retries issuance after an automatic attempt failed, or issues manually
/// when automatic issuance is disabled. Admin only.
#[utoipa::path(
    post,
    path = "/v1/admin/registrations/{id}/issue",
    tag = "Admin",
    params(("id" = String, Path, description = "Registration ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Certificate issued", body = RegistrationResponse),
        (status = 403, description = "Not authorized (admin required)"),
        (status = 404, description = "Registration not found"),
        (status = 409, description = "Registration is not APPROVED")
    )
)]
pub async fn issue_registration(
    AdminOnly(user): AdminOnly,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RegistrationResponse>, ApiError> {
    audit_log!(
        &state.db,
        AuditEventType::AdminAccess,
        Actor::from(&user),
        "registration",
        id.as_str()
    );
    let record = state.workflow.issue(&id)?;
    Ok(Json(registration_view(&state.workflow, record)))
}

/// Re-render the certificate document of an ISSUED or EXPIRED registration. Admin only.
#[utoipa::path(
    post,
    path = "/v1/admin/registrations/{id}/render",
    tag = "Admin",
    params(("id" = String, Path, description = "Registration ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Document rendered", body = DocumentMetadata),
        (status = 403, description = "Not authorized (admin required)"),
        (status = 404, description = "Registration not found"),
        (status = 422, description = "Registration is not ISSUED or EXPIRED"),
        (status = 500, description = "Renderer failed")
    )
)]
pub async fn render_registration(
    AdminOnly(user): AdminOnly,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DocumentMetadata>, ApiError> {
    audit_log!(
        &state.db,
        AuditEventType::AdminAccess,
        Actor::from(&user),
        "document",
        id.as_str()
    );
    Ok(Json(state.workflow.render_document(&id)?))
}

#[cfg(test)]
mod tests {
    use crate::api::router;
    use crate::registry::{Actor, ActorRole, BirthDetails, RegistrationPayload, RegistrationStatus, WorkflowPolicy};
    use crate::test_support::{dev_token, test_state_with};
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use chrono::NaiveDate;
    use serde_json::Value;
    use tower::ServiceExt;

    async fn call(app: &axum::Router, method: &str, uri: &str, token: &str) -> (StatusCode, Value) {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .header("Authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn payload() -> RegistrationPayload {
        RegistrationPayload::Birth(BirthDetails {
            child_full_name: "Ishimwe Paul".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(2026, 4, 4).unwrap(),
            place_of_birth: "Rwamagana".to_string(),
            sex: None,
            mother_full_name: None,
            father_full_name: None,
        })
    }

    #[tokio::test]
    async fn admin_endpoints_reject_non_admins() {
        let app = router(test_state_with(WorkflowPolicy::default()));
        let approver = dev_token("approver_1", "approver");
        for (method, uri) in [
            ("GET", "/v1/admin/stats"),
            ("GET", "/v1/admin/audit/events"),
            ("POST", "/v1/admin/registrations/x/issue"),
            ("POST", "/v1/admin/registrations/x/render"),
        ] {
            let (status, body) = call(&app, method, uri, &approver).await;
            assert_eq!(status, StatusCode::FORBIDDEN, "{method} {uri}");
            assert_eq!(body["error_code"], "insufficient_permissions");
        }
    }

    #[tokio::test]
    async fn manual_issue_then_stats_and_audit() {
        let state = test_state_with(WorkflowPolicy {
            auto_issue: false,
            ..WorkflowPolicy::default()
        });
        let record = state
            .workflow
            .submit(&Actor::new("citizen_1", ActorRole::Citizen), payload())
            .unwrap();
        state
            .workflow
            .apply_transition(&Actor::new("v", ActorRole::Verifier), &record.id, RegistrationStatus::Verified, None)
            .unwrap();
        state
            .workflow
            .apply_transition(&Actor::new("a", ActorRole::Approver), &record.id, RegistrationStatus::Approved, None)
            .unwrap();
        let app = router(state);
        let admin = dev_token("admin_1", "admin");

        let (status, _) = call(&app, "POST", &format!("/v1/admin/registrations/{}/render", record.id), &admin).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, issued) = call(&app, "POST", &format!("/v1/admin/registrations/{}/issue", record.id), &admin).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(issued["status"], "ISSUED");

        let (status, _) = call(&app, "POST", &format!("/v1/admin/registrations/{}/issue", record.id), &admin).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, meta) = call(&app, "POST", &format!("/v1/admin/registrations/{}/render", record.id), &admin).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(meta["sha256"].as_str().unwrap().len(), 64);

        let (status, stats) = call(&app, "GET", "/v1/admin/stats", &admin).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["total_registrations"], 1);
        assert_eq!(stats["by_status"]["ISSUED"], 1);
        assert_eq!(stats["by_type"]["BIRTH"], 1);

        let (status, audit) = call(
            &app,
            "GET",
            &format!("/v1/admin/audit/events?event_type=certificate_issued&resource_id={}", record.id),
            &admin,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(audit["total"], 1);

        let (status, _) = call(&app, "GET", "/v1/admin/audit/events?start_date=yesterday", &admin).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
