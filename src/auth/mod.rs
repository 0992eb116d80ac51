// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Clerk JWT authentication for the civil registry API.
//!
//! ## Auth Flow
//!
//! 1. The citizen or staff portal authenticates the user with Clerk
//! 2. It sends `Authorization: Bearer <Clerk JWT>`
//! 3. The server:
//!    - Fetches Clerk JWKS via HTTPS
//!    - Verifies JWT signature, expiry, issuer, audience
//!    - Extracts:
//!      - `sub` → canonical `user_id`
//!      - `publicMetadata.role` → [`Role`] (default `citizen`)
//!      - `name` → display name
//!
//! ## Security
//!
//! - Every endpoint except health and `/v1/verify` requires authentication
//! - JWT verification uses HTTPS-only JWKS fetching
//! - JWKS is cached with TTL for performance
//! - Clock skew tolerance is 60 seconds

pub mod claims;
pub mod error;
pub mod extractor;
pub mod jwks;
pub mod roles;

pub use claims::AuthenticatedUser;
pub use error::AuthError;
pub use extractor::{AdminOnly, Auth};
pub use jwks::JwksManager;
pub use roles::Role;
