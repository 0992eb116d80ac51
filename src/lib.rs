// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Civil Registry - Vital Event Registration & Certificate Verification
//!
//! Citizens submit birth, death, marriage, divorce and adoption
//! registrations; staff review, verify and approve them; approved
//! registrations are issued a certificate whose authenticity anyone can
//! check anonymously.
//!
//! ## Modules
//!
//! - `registry` - Domain core: status workflow, access layer, verification
//! - `storage` - redb database, repositories and audit log
//! - `auth` - Authentication and authorization (Clerk JWT)
//! - `api` - HTTP API handlers (Axum)

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod registry;
pub mod state;
pub mod storage;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod test_support;
