// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Registration endpoints.
//!
//! Citizens submit and follow their own registrations; staff list and move
//! any registration through the workflow. Which role may request which
//! status is decided by the workflow, not here.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    auth::Auth,
    error::ApiError,
    models::{
        ListRegistrationsParams, RegistrationListResponse, RegistrationResponse,
        SubmitRegistrationRequest, TransitionRequest, UpdatePayloadRequest,
    },
    registry::{Actor, ListFilter, RegistrationRecord, StatusWorkflow, DEFAULT_PAGE_SIZE},
    state::AppState,
};

/// Attach the public verification URL, when there is one.
pub(crate) fn registration_view(
    workflow: &StatusWorkflow,
    record: RegistrationRecord,
) -> RegistrationResponse {
    let verification_url = record
        .certificate_number
        .as_deref()
        .and_then(|number| workflow.verification_url(number))
        .map(String::from);
    RegistrationResponse {
        record,
        verification_url,
    }
}

/// Submit a new registration.
///
/// The caller becomes the owner. The registration starts in `PENDING`.
#[utoipa::path(
    post,
    path = "/v1/registrations",
    tag = "Registrations",
    request_body = SubmitRegistrationRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Registration submitted", body = RegistrationResponse),
        (status = 401, description = "Not authenticated"),
        (status = 422, description = "Invalid payload")
    )
)]
pub async fn submit_registration(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<SubmitRegistrationRequest>,
) -> Result<(StatusCode, Json<RegistrationResponse>), ApiError> {
    let actor = Actor::from(&user);
    let record = state.workflow.submit(&actor, request.payload)?;
    Ok((
        StatusCode::CREATED,
        Json(registration_view(&state.workflow, record)),
    ))
}

/// List registrations visible to the caller, newest first.
///
/// Citizens see their own registrations; staff see all of them.
#[utoipa::path(
    get,
    path = "/v1/registrations",
    tag = "Registrations",
    params(ListRegistrationsParams),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "A page of registrations", body = RegistrationListResponse),
        (status = 401, description = "Not authenticated"),
        (status = 422, description = "Invalid page or page size")
    )
)]
pub async fn list_registrations(
    Auth(user): Auth,
    State(state): State<AppState>,
    Query(params): Query<ListRegistrationsParams>,
) -> Result<Json<RegistrationListResponse>, ApiError> {
    let filter = ListFilter {
        status: params.status,
        registration_type: params.registration_type,
        page: params.page.unwrap_or(1),
        page_size: params.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
    };
    let list = state.access.list_records(&Actor::from(&user), filter)?;
    Ok(Json(RegistrationListResponse::from_list(list, |record| {
        registration_view(&state.workflow, record)
    })))
}

/// Get one registration (owner or staff).
#[utoipa::path(
    get,
    path = "/v1/registrations/{id}",
    tag = "Registrations",
    params(("id" = String, Path, description = "Registration ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Registration", body = RegistrationResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Registration not found")
    )
)]
pub async fn get_registration(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RegistrationResponse>, ApiError> {
    let record = state.access.get_visible(&Actor::from(&user), &id)?;
    Ok(Json(registration_view(&state.workflow, record)))
}

/// Replace the payload of the caller's own PENDING registration.
#[utoipa::path(
    put,
    path = "/v1/registrations/{id}",
    tag = "Registrations",
    params(("id" = String, Path, description = "Registration ID")),
    request_body = UpdatePayloadRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Payload updated", body = RegistrationResponse),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Registration not found"),
        (status = 409, description = "Registration changed concurrently"),
        (status = 422, description = "Invalid payload or registration no longer PENDING")
    )
)]
pub async fn update_registration(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdatePayloadRequest>,
) -> Result<Json<RegistrationResponse>, ApiError> {
    let record = state
        .workflow
        .update_payload(&Actor::from(&user), &id, request.payload)?;
    Ok(Json(registration_view(&state.workflow, record)))
}

/// Move a registration to another status.
///
/// Approving a registration issues its certificate in the same request
/// unless automatic issuance is disabled.
#[utoipa::path(
    post,
    path = "/v1/registrations/{id}/transitions",
    tag = "Registrations",
    params(("id" = String, Path, description = "Registration ID")),
    request_body = TransitionRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Transition applied", body = RegistrationResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Role may not request this status"),
        (status = 404, description = "Registration not found"),
        (status = 409, description = "Status not reachable from the current one"),
        (status = 422, description = "Missing rejection reason")
    )
)]
pub async fn transition_registration(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<TransitionRequest>,
) -> Result<Json<RegistrationResponse>, ApiError> {
    let record = state.workflow.apply_transition(
        &Actor::from(&user),
        &id,
        request.status,
        request.reason.as_deref(),
    )?;
    Ok(Json(registration_view(&state.workflow, record)))
}

/// Start a new registration from the caller's rejected one.
#[utoipa::path(
    post,
    path = "/v1/registrations/{id}/resubmit",
    tag = "Registrations",
    params(("id" = String, Path, description = "ID of the REJECTED registration")),
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "New PENDING registration", body = RegistrationResponse),
        (status = 403, description = "Not the owner, or resubmission disabled"),
        (status = 404, description = "Registration not found"),
        (status = 409, description = "Registration is not REJECTED")
    )
)]
pub async fn resubmit_registration(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<RegistrationResponse>), ApiError> {
    let record = state.workflow.resubmit(&Actor::from(&user), &id)?;
    Ok((
        StatusCode::CREATED,
        Json(registration_view(&state.workflow, record)),
    ))
}

/// Download the rendered certificate (owner or staff).
#[utoipa::path(
    get,
    path = "/v1/registrations/{id}/certificate",
    tag = "Registrations",
    params(("id" = String, Path, description = "Registration ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Certificate document", content_type = "application/octet-stream"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Registration or document not found")
    )
)]
pub async fn get_certificate(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let (meta, bytes) = state.access.get_document(&Actor::from(&user), &id)?;
    Ok((
        [
            (header::CONTENT_TYPE, meta.content_type),
            (header::ETAG, format!("\"{}\"", meta.sha256)),
        ],
        bytes,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use crate::api::router;
    use crate::test_support::{dev_token, test_state, test_state_with};
    use crate::registry::WorkflowPolicy;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn send(app: &Router, method: &str, uri: &str, token: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("Authorization", format!("Bearer {token}"));
        let body = match body {
            Some(body) => {
                builder = builder.header("Content-Type", "application/json");
                Body::from(body.to_string())
            }
            None => Body::empty(),
        };
        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    fn birth() -> Value {
        json!({
            "payload": {
                "type": "BIRTH",
                "child_full_name": "Uwase Aline",
                "date_of_birth": "2026-02-01",
                "place_of_birth": "Kigali",
                "mother_full_name": "Private Person"
            }
        })
    }

    #[tokio::test]
    async fn submit_then_owner_reads_and_stranger_is_forbidden() {
        let app = router(test_state());
        let owner = dev_token("citizen_1", "citizen");

        let (status, created) = send(&app, "POST", "/v1/registrations", &owner, Some(birth())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["status"], "PENDING");
        assert_eq!(created["type"], "BIRTH");
        assert_eq!(created["owner_id"], "citizen_1");
        let id = created["id"].as_str().unwrap().to_string();

        let (status, _) = send(&app, "GET", &format!("/v1/registrations/{id}"), &owner, None).await;
        assert_eq!(status, StatusCode::OK);

        let stranger = dev_token("citizen_2", "citizen");
        let (status, body) = send(&app, "GET", &format!("/v1/registrations/{id}"), &stranger, None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body["error"].is_string());

        let (status, _) = send(&app, "GET", "/v1/registrations/unknown-id", &owner, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn missing_token_is_unauthorized() {
        let app = router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/registrations")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn full_review_flow_over_http() {
        let app = router(test_state());
        let citizen = dev_token("citizen_1", "citizen");
        let verifier = dev_token("verifier_1", "verifier");
        let approver = dev_token("approver_1", "approver");

        let (_, created) = send(&app, "POST", "/v1/registrations", &citizen, Some(birth())).await;
        let id = created["id"].as_str().unwrap().to_string();
        let transitions = format!("/v1/registrations/{id}/transitions");

        // Citizens cannot approve their own registration
        let (status, _) = send(&app, "POST", &transitions, &citizen, Some(json!({"status": "APPROVED"}))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        // Approval before verification is not reachable
        let (status, _) = send(&app, "POST", &transitions, &approver, Some(json!({"status": "APPROVED"}))).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = send(&app, "POST", &transitions, &verifier, Some(json!({"status": "UNDER_REVIEW"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reviewer_id"], "verifier_1");

        let (status, _) = send(&app, "POST", &transitions, &verifier, Some(json!({"status": "VERIFIED"}))).await;
        assert_eq!(status, StatusCode::OK);

        let (status, issued) = send(&app, "POST", &transitions, &approver, Some(json!({"status": "APPROVED"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(issued["status"], "ISSUED");
        assert_eq!(issued["approver_name"], "approver_1 name");
        let number = issued["certificate_number"].as_str().unwrap().to_string();
        assert!(number.starts_with("BC-"));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/v1/registrations/{id}/certificate"))
                    .header("Authorization", format!("Bearer {citizen}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains(&number));
    }

    #[tokio::test]
    async fn rejection_needs_reason_and_allows_resubmission() {
        let app = router(test_state());
        let citizen = dev_token("citizen_1", "citizen");
        let verifier = dev_token("verifier_1", "verifier");

        let (_, created) = send(&app, "POST", "/v1/registrations", &citizen, Some(birth())).await;
        let id = created["id"].as_str().unwrap().to_string();
        let transitions = format!("/v1/registrations/{id}/transitions");

        let (status, _) = send(&app, "POST", &transitions, &verifier, Some(json!({"status": "REJECTED"}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, rejected) = send(
            &app,
            "POST",
            &transitions,
            &verifier,
            Some(json!({"status": "REJECTED", "reason": "illegible birth notice"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(rejected["rejection"]["reason"], "illegible birth notice");

        let (status, fresh) = send(&app, "POST", &format!("/v1/registrations/{id}/resubmit"), &citizen, None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(fresh["status"], "PENDING");
        assert_eq!(fresh["resubmitted_from"], id.as_str());
    }

    #[tokio::test]
    async fn listing_is_scoped_and_paginated() {
        let app = router(test_state());
        let alice = dev_token("alice", "citizen");
        let bob = dev_token("bob", "citizen");
        let admin = dev_token("admin_1", "admin");

        for _ in 0..3 {
            send(&app, "POST", "/v1/registrations", &alice, Some(birth())).await;
        }
        send(&app, "POST", "/v1/registrations", &bob, Some(birth())).await;

        let (_, page) = send(&app, "GET", "/v1/registrations?page=1&page_size=2", &alice, None).await;
        assert_eq!(page["total"], 3);
        assert_eq!(page["registrations"].as_array().unwrap().len(), 2);

        let (_, all) = send(&app, "GET", "/v1/registrations?status=PENDING&type=BIRTH", &admin, None).await;
        assert_eq!(all["total"], 4);

        let (_, own_pending) = send(&app, "GET", "/v1/registrations?status=PENDING", &bob, None).await;
        assert_eq!(own_pending["total"], 1);
        let records = own_pending["registrations"].as_array().unwrap();
        assert_eq!(records.len(), 1);
        assert!(records.iter().all(|r| r["owner_id"] == "bob"));

        let (status, _) = send(&app, "GET", "/v1/registrations?page=0", &alice, None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn payload_edit_while_pending() {
        let app = router(test_state_with(WorkflowPolicy {
            auto_issue: false,
            ..WorkflowPolicy::default()
        }));
        let citizen = dev_token("citizen_1", "citizen");
        let (_, created) = send(&app, "POST", "/v1/registrations", &citizen, Some(birth())).await;
        let id = created["id"].as_str().unwrap().to_string();

        let mut edited = birth();
        edited["payload"]["child_full_name"] = json!("Uwase Aline Grace");
        let (status, body) = send(&app, "PUT", &format!("/v1/registrations/{id}"), &citizen, Some(edited)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["payload"]["child_full_name"], "Uwase Aline Grace");
        assert_eq!(body["version"], 1);
    }
}
