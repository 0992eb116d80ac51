// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Certificate Expiry
//!
//! The validity window is policy: `CERTIFICATE_VALIDITY_DAYS` unset means
//! certificates never expire. The window is fixed onto each record as
//! `expires_at` at issuance, so changing the policy later does not shorten
//! or extend certificates already issued.
//!
//! ## Sweeper
//!
//! Every `interval` (default 1 h) the sweeper moves ISSUED records whose
//! `expires_at` has passed to EXPIRED, acting as the system actor.
//! Verification already reports such certificates as expired before the
//! sweep runs; the sweep only makes the status catch up.
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{RegistrationRecord, RegistrationStatus, StatusWorkflow};

/// Default interval between expiry sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpiryPolicy {
    validity: Option<chrono::Duration>,
}

impl ExpiryPolicy {
    pub fn never() -> Self {
        Self { validity: None }
    }

    pub fn days(days: u32) -> Self {
        Self {
            validity: Some(chrono::Duration::days(i64::from(days))),
        }
    }

    pub fn validity(&self) -> Option<chrono::Duration> {
        self.validity
    }

    /// When a certificate issued at `issued_at` stops being valid.
    pub fn expires_at(&self, issued_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.validity.map(|validity| issued_at + validity)
    }
}

/// Whether the record's validity window has elapsed at `now`.
pub fn is_past_expiry(record: &RegistrationRecord, now: DateTime<Utc>) -> bool {
    record.expires_at.is_some_and(|at| now >= at)
}

/// Whether a verifier should treat the certificate as expired.
pub fn is_expired(record: &RegistrationRecord, now: DateTime<Utc>) -> bool {
    record.status == RegistrationStatus::Expired
        || (record.status == RegistrationStatus::Issued && is_past_expiry(record, now))
}

/// Background task that expires due certificates.
pub struct ExpirySweeper {
    workflow: Arc<StatusWorkflow>,
    interval: Duration,
}

impl ExpirySweeper {
    pub fn new(workflow: Arc<StatusWorkflow>) -> Self {
        Self {
            workflow,
            interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run the sweep loop until the cancellation token is triggered.
    ///
    /// ```rust,ignore
    /// tokio::spawn(sweeper.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        if self.workflow.policy().expiry.validity().is_none() {
            info!("Certificate validity is unlimited, expiry sweeper not started");
            return;
        }

        info!(
            interval_secs = self.interval.as_secs(),
            "Expiry sweeper starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Expiry sweeper shutting down");
                return;
            }

            self.sweep_once();

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Expiry sweeper shutting down");
                    return;
                }
            }
        }
    }

    fn sweep_once(&self) {
        match self.workflow.expire_due(Utc::now()) {
            Ok(0) => {}
            Ok(expired) => info!(expired, "Expired certificates"),
            Err(error) => warn!(%error, "Expiry sweep failed"),
        }
    }
}
