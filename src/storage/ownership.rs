// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ownership enforcement for reads and owner-only mutations.
//!
//! Citizens only ever see resources they own. Staff roles may read every
//! registration, but owner-only operations (editing a payload, resubmitting,
//! reading notifications) still require the caller to be the owner.

use crate::registry::Actor;

use super::{StorageError, StorageResult};

/// Trait for resources that have an owner.
pub trait OwnedResource {
    /// Get the owner's user ID.
    fn owner_user_id(&self) -> &str;
}

/// Trait for enforcing ownership on storage operations.
pub trait OwnershipEnforcer {
    /// Verify that the actor owns this resource.
    ///
    /// # Errors
    /// Returns `StorageError::PermissionDenied` if the actor doesn't own the resource.
    fn verify_ownership(&self, actor: &Actor) -> StorageResult<()>;

    /// Verify that the actor owns this resource or holds a staff role.
    fn verify_visible_to(&self, actor: &Actor) -> StorageResult<()>;
}

impl<T: OwnedResource> OwnershipEnforcer for T {
    fn verify_ownership(&self, actor: &Actor) -> StorageResult<()> {
        if self.owner_user_id() == actor.id {
            Ok(())
        } else {
            Err(StorageError::PermissionDenied {
                user_id: actor.id.clone(),
                resource: "resource".to_string(),
            })
        }
    }

    fn verify_visible_to(&self, actor: &Actor) -> StorageResult<()> {
        if actor.role.is_staff() {
            return Ok(());
        }
        self.verify_ownership(actor)
    }
}

/// Ownership checks chained onto a lookup result.
pub trait OwnershipCheck<T> {
    /// Verify ownership and return the resource if authorized.
    fn verify_owner(self, actor: &Actor) -> StorageResult<T>;

    /// Verify visibility (owner or staff) and return the resource.
    fn verify_visible(self, actor: &Actor) -> StorageResult<T>;
}

impl<T: OwnedResource> OwnershipCheck<T> for StorageResult<T> {
    fn verify_owner(self, actor: &Actor) -> StorageResult<T> {
        let resource = self?;
        resource.verify_ownership(actor)?;
        Ok(resource)
    }

    fn verify_visible(self, actor: &Actor) -> StorageResult<T> {
        let resource = self?;
        resource.verify_visible_to(actor)?;
        Ok(resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ActorRole;

    struct TestResource {
        owner: String,
    }

    impl OwnedResource for TestResource {
        fn owner_user_id(&self) -> &str {
            &self.owner
        }
    }

    fn resource(owner: &str) -> TestResource {
        TestResource {
            owner: owner.to_string(),
        }
    }

    fn actor(id: &str, role: ActorRole) -> Actor {
        Actor::new(id, role)
    }

    #[test]
    fn ownership_verification_passes_for_owner() {
        let user = actor("user_123", ActorRole::Citizen);
        assert!(resource("user_123").verify_ownership(&user).is_ok());
    }

    #[test]
    fn ownership_verification_fails_for_non_owner() {
        let user = actor("user_456", ActorRole::Citizen);
        let result = resource("user_123").verify_ownership(&user);
        assert!(matches!(result, Err(StorageError::PermissionDenied { .. })));
    }

    #[test]
    fn staff_can_see_but_not_own() {
        let verifier = actor("staff_1", ActorRole::Verifier);
        let r = resource("user_123");
        assert!(r.verify_visible_to(&verifier).is_ok());
        assert!(r.verify_ownership(&verifier).is_err());
    }

    #[test]
    fn citizen_cannot_see_others() {
        let other = actor("user_456", ActorRole::Citizen);
        assert!(resource("user_123").verify_visible_to(&other).is_err());
    }

    #[test]
    fn ownership_check_on_result() {
        let user = actor("user_123", ActorRole::Citizen);
        let result: StorageResult<TestResource> = Ok(resource("user_123"));
        assert!(result.verify_owner(&user).is_ok());

        let missing: StorageResult<TestResource> =
            Err(StorageError::NotFound("Registration x".to_string()));
        assert!(matches!(
            missing.verify_visible(&user),
            Err(StorageError::NotFound(_))
        ));
    }
}
