// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::HeaderName,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::Role,
    models::{
        NotificationListResponse, RegistrationListResponse, RegistrationResponse,
        SubmitRegistrationRequest, TransitionRequest, UpdatePayloadRequest,
    },
    registry::{
        AdoptionDetails, BirthDetails, DeathDetails, DivorceDetails, MarriageDetails,
        PublicCertificate, RegistrationPayload, RegistrationRecord, RegistrationStatus,
        RegistrationType, Rejection, VerificationResult,
    },
    state::AppState,
    storage::{AuditEvent, AuditEventType, DocumentMetadata, StoredNotification},
};

pub mod admin;
pub mod health;
pub mod notifications;
pub mod registrations;
pub mod users;
pub mod verify;

const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/users/me", get(users::get_current_user))
        .route(
            "/registrations",
            get(registrations::list_registrations).post(registrations::submit_registration),
        )
        .route(
            "/registrations/{id}",
            get(registrations::get_registration).put(registrations::update_registration),
        )
        .route(
            "/registrations/{id}/transitions",
            post(registrations::transition_registration),
        )
        .route(
            "/registrations/{id}/resubmit",
            post(registrations::resubmit_registration),
        )
        .route(
            "/registrations/{id}/certificate",
            get(registrations::get_certificate),
        )
        .route("/verify/{identifier}", get(verify::verify_certificate))
        .route("/notifications", get(notifications::list_notifications))
        .route(
            "/notifications/{id}/read",
            post(notifications::mark_notification_read),
        )
        .route("/admin/stats", get(admin::get_system_stats))
        .route("/admin/audit/events", get(admin::query_audit_logs))
        .route(
            "/admin/registrations/{id}/issue",
            post(admin::issue_registration),
        )
        .route(
            "/admin/registrations/{id}/render",
            post(admin::render_registration),
        );

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .nest("/v1", v1_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        users::get_current_user,
        registrations::submit_registration,
        registrations::list_registrations,
        registrations::get_registration,
        registrations::update_registration,
        registrations::transition_registration,
        registrations::resubmit_registration,
        registrations::get_certificate,
        verify::verify_certificate,
        notifications::list_notifications,
        notifications::mark_notification_read,
        admin::get_system_stats,
        admin::query_audit_logs,
        admin::issue_registration,
        admin::render_registration
    ),
    components(
        schemas(
            Role,
            RegistrationType,
            RegistrationStatus,
            RegistrationPayload,
            BirthDetails,
            DeathDetails,
            MarriageDetails,
            DivorceDetails,
            AdoptionDetails,
            Rejection,
            RegistrationRecord,
            RegistrationResponse,
            RegistrationListResponse,
            SubmitRegistrationRequest,
            UpdatePayloadRequest,
            TransitionRequest,
            PublicCertificate,
            VerificationResult,
            StoredNotification,
            NotificationListResponse,
            DocumentMetadata,
            AuditEvent,
            AuditEventType,
            users::UserMeResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse,
            admin::SystemStatsResponse,
            admin::AuditLogResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Users", description = "Current user"),
        (name = "Registrations", description = "Submission and review workflow"),
        (name = "Verification", description = "Anonymous certificate verification"),
        (name = "Notifications", description = "Owner notification inbox"),
        (name = "Admin", description = "Statistics, audit log and operational retries")
    )
)]
struct ApiDoc;
