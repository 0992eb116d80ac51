// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The transition table.
//!
//! Every status change a registration can make is listed here, together with
//! the states it may start from and the roles that may request it. Creation
//! (→ PENDING) is not a transition; it happens through `submit`.

use super::actor::ActorRole;
use super::error::{RegistryError, RegistryResult};
use super::RegistrationStatus;

use ActorRole::{Admin, Approver, System, Verifier};
use RegistrationStatus::{Approved, Expired, Issued, Pending, Rejected, UnderReview, Verified};

/// One destination status with its allowed sources and actors.
#[derive(Debug)]
pub struct TransitionRule {
    pub to: RegistrationStatus,
    pub from: &'static [RegistrationStatus],
    pub actors: &'static [ActorRole],
}

impl TransitionRule {
    pub fn allows_actor(&self, role: ActorRole) -> bool {
        self.actors.contains(&role)
    }

    pub fn allows_from(&self, status: RegistrationStatus) -> bool {
        self.from.contains(&status)
    }
}

pub static TRANSITIONS: &[TransitionRule] = &[
    TransitionRule {
        to: UnderReview,
        from: &[Pending],
        actors: &[Verifier, Admin],
    },
    TransitionRule {
        to: Verified,
        from: &[Pending, UnderReview],
        actors: &[Verifier, Admin],
    },
    TransitionRule {
        to: Approved,
        from: &[Verified],
        actors: &[Approver, Admin],
    },
    TransitionRule {
        to: Issued,
        from: &[Approved],
        actors: &[System],
    },
    TransitionRule {
        to: Rejected,
        from: &[Pending, UnderReview, Verified],
        actors: &[Verifier, Approver, Admin],
    },
    // Also requires the certificate's validity window to have elapsed.
    TransitionRule {
        to: Expired,
        from: &[Issued],
        actors: &[System],
    },
];

pub fn rule_for(to: RegistrationStatus) -> Option<&'static TransitionRule> {
    TRANSITIONS.iter().find(|rule| rule.to == to)
}

/// Capability check done before the record is loaded.
///
/// Unknown destinations are `InvalidTransition`; a known destination the
/// role may not request is `Forbidden`, whatever the record's state.
pub fn authorize(
    role: ActorRole,
    to: RegistrationStatus,
) -> RegistryResult<&'static TransitionRule> {
    let rule = rule_for(to).ok_or_else(|| {
        RegistryError::invalid_transition(to, "no transition leads to this status")
    })?;
    if !rule.allows_actor(role) {
        return Err(RegistryError::Forbidden(format!(
            "role {role} may not move a registration to {to}"
        )));
    }
    Ok(rule)
}

/// Whether `role` may move a record from `from` to `to`.
///
/// Does not include the EXPIRED validity-window condition.
pub fn is_allowed(role: ActorRole, from: RegistrationStatus, to: RegistrationStatus) -> bool {
    rule_for(to).is_some_and(|rule| rule.allows_actor(role) && rule.allows_from(from))
}
