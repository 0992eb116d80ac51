// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Owner notification inbox.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::{
    auth::Auth,
    error::ApiError,
    models::{ListNotificationsParams, NotificationListResponse},
    registry::{Actor, DEFAULT_PAGE_SIZE},
    state::AppState,
    storage::StoredNotification,
};

/// List the caller's notifications, newest first.
#[utoipa::path(
    get,
    path = "/v1/notifications",
    tag = "Notifications",
    params(ListNotificationsParams),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Notifications", body = NotificationListResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_notifications(
    Auth(user): Auth,
    State(state): State<AppState>,
    Query(params): Query<ListNotificationsParams>,
) -> Result<Json<NotificationListResponse>, ApiError> {
    let notifications = state.access.list_notifications(
        &Actor::from(&user),
        params.unread_only.unwrap_or(false),
        params.limit.unwrap_or(DEFAULT_PAGE_SIZE),
    )?;
    Ok(Json(NotificationListResponse { notifications }))
}

/// Mark one of the caller's notifications as read.
#[utoipa::path(
    post,
    path = "/v1/notifications/{id}/read",
    tag = "Notifications",
    params(("id" = String, Path, description = "Notification ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Notification marked as read", body = StoredNotification),
        (status = 403, description = "Not the recipient"),
        (status = 404, description = "Notification not found")
    )
)]
pub async fn mark_notification_read(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StoredNotification>, ApiError> {
    let notification = state
        .access
        .mark_notification_read(&Actor::from(&user), &id)?;
    Ok(Json(notification))
}
