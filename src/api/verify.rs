// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Anonymous certificate verification.
//!
//! This is the target of the QR code printed on certificates, so it takes no
//! authentication. Unknown and unissued identifiers both answer 200 with
//! `valid: false`.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{error::ApiError, registry::VerificationResult, state::AppState};

/// Verify a certificate by certificate number or registration ID.
#[utoipa::path(
    get,
    path = "/v1/verify/{identifier}",
    tag = "Verification",
    params(("identifier" = String, Path, description = "Certificate number or registration ID")),
    responses(
        (status = 200, description = "Verification result", body = VerificationResult)
    )
)]
pub async fn verify_certificate(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> Result<Json<VerificationResult>, ApiError> {
    Ok(Json(state.verification.verify(&identifier)?))
}

#[cfg(test)]
mod tests {
    use crate::api::router;
    use crate::registry::{Actor, ActorRole, BirthDetails, RegistrationPayload, RegistrationStatus};
    use crate::test_support::test_state;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use chrono::NaiveDate;
    use serde_json::Value;
    use tower::ServiceExt;

    async fn get(app: axum::Router, uri: &str) -> Value {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn unknown_certificate_is_soft_failure() {
        let app = router(test_state());
        let body = get(app, "/v1/verify/BC-2026-000001-ABCD").await;
        assert_eq!(body["valid"], false);
        assert_eq!(body["error"], "not found");
    }

    #[tokio::test]
    async fn issued_certificate_exposes_only_public_fields() {
        let state = test_state();
        let citizen = Actor::new("citizen_1", ActorRole::Citizen);
        let record = state
            .workflow
            .submit(
                &citizen,
                RegistrationPayload::Birth(BirthDetails {
                    child_full_name: "Keza Diane".to_string(),
                    date_of_birth: NaiveDate::from_ymd_opt(2026, 1, 20).unwrap(),
                    place_of_birth: "Nyagatare".to_string(),
                    sex: Some("F".to_string()),
                    mother_full_name: Some("Hidden Mother".to_string()),
                    father_full_name: None,
                }),
            )
            .unwrap();

        let pending = get(router(state.clone()), &format!("/v1/verify/{}", record.id)).await;
        assert_eq!(pending["valid"], false);
        assert_eq!(pending["error"], "not issued");

        let verifier = Actor::new("verifier_1", ActorRole::Verifier);
        let approver = Actor::new("approver_1", ActorRole::Approver);
        state
            .workflow
            .apply_transition(&verifier, &record.id, RegistrationStatus::Verified, None)
            .unwrap();
        let issued = state
            .workflow
            .apply_transition(&approver, &record.id, RegistrationStatus::Approved, None)
            .unwrap();
        let number = issued.certificate_number.unwrap();

        let body = get(router(state), &format!("/v1/verify/{number}")).await;
        assert_eq!(body["valid"], true);
        assert_eq!(body["expired"], false);
        assert_eq!(body["certificate"]["full_name"], "Keza Diane");
        assert_eq!(body["certificate"]["type"], "BIRTH");
        let text = body.to_string();
        assert!(!text.contains("Hidden Mother"));
        assert!(!text.contains("citizen_1"));
    }
}
