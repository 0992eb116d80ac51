// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Access Layer
//!
//! Every read of a registration, its document or an owner's notifications
//! goes through here, so the visibility rule lives in one place:
//!
//! - citizens see only records they own
//! - staff (verifier, approver, admin) see every record
//!
//! Listing is a single read transaction, so `total` always agrees with the
//! page it accompanies.

use std::sync::Arc;

use crate::audit_log;
use crate::storage::{
    AuditEvent, AuditEventType, DocumentMetadata, DocumentRepository, NotificationRepository,
    OwnershipCheck, OwnershipEnforcer, RecordQuery, RegistrationRepository, RegistryDatabase,
    StorageError, StoredNotification,
};

use super::error::{RegistryError, RegistryResult};
use super::{Actor, RegistrationRecord, RegistrationStatus, RegistrationType};

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

/// Listing filter. `page` starts at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListFilter {
    pub status: Option<RegistrationStatus>,
    pub registration_type: Option<RegistrationType>,
    pub page: usize,
    pub page_size: usize,
}

impl Default for ListFilter {
    fn default() -> Self {
        Self {
            status: None,
            registration_type: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// A page of records visible to the caller.
#[derive(Debug, Clone)]
pub struct RecordList {
    pub records: Vec<RegistrationRecord>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

#[derive(Clone)]
pub struct AccessLayer {
    db: Arc<RegistryDatabase>,
}

impl AccessLayer {
    pub fn new(db: Arc<RegistryDatabase>) -> Self {
        Self { db }
    }

    /// Records visible to `caller`, newest first.
    ///
    /// `page_size` above [`MAX_PAGE_SIZE`] is clamped; page 0 or page size 0
    /// is a validation error.
    pub fn list_records(&self, caller: &Actor, filter: ListFilter) -> RegistryResult<RecordList> {
        if filter.page == 0 {
            return Err(RegistryError::Validation("page starts at 1".to_string()));
        }
        if filter.page_size == 0 {
            return Err(RegistryError::Validation(
                "page_size must be at least 1".to_string(),
            ));
        }
        let page_size = filter.page_size.min(MAX_PAGE_SIZE);

        let owner_id = if caller.role.is_staff() {
            None
        } else {
            Some(caller.id.clone())
        };

        let query = RecordQuery {
            owner_id,
            status: filter.status,
            registration_type: filter.registration_type,
            offset: (filter.page - 1).saturating_mul(page_size),
            limit: page_size,
        };
        let page = RegistrationRepository::new(&self.db).list(&query)?;

        Ok(RecordList {
            records: page.records,
            total: page.total,
            page: filter.page,
            page_size,
        })
    }

    /// Plain lookup used by the workflow before a write.
    pub fn get_record_for_mutation(&self, id: &str) -> RegistryResult<RegistrationRecord> {
        Ok(RegistrationRepository::new(&self.db).get(id)?)
    }

    /// A record the caller may read (owner or staff).
    pub fn get_visible(&self, caller: &Actor, id: &str) -> RegistryResult<RegistrationRecord> {
        let result = RegistrationRepository::new(&self.db)
            .get(id)
            .verify_visible(caller);
        self.audit_denied(caller, "registration", id, &result);
        Ok(result?)
    }

    /// A record owned by the caller, for owner-only operations.
    pub fn get_owned(&self, caller: &Actor, id: &str) -> RegistryResult<RegistrationRecord> {
        let result = RegistrationRepository::new(&self.db)
            .get(id)
            .verify_owner(caller);
        self.audit_denied(caller, "registration", id, &result);
        Ok(result?)
    }

    /// Rendered certificate for a record the caller may read.
    pub fn get_document(
        &self,
        caller: &Actor,
        id: &str,
    ) -> RegistryResult<(DocumentMetadata, Vec<u8>)> {
        let record = self.get_visible(caller, id)?;
        DocumentRepository::new(&self.db)
            .get(&record.id)?
            .ok_or_else(|| RegistryError::NotFound(format!("Certificate document for {id}")))
    }

    /// The caller's own notifications, newest first.
    pub fn list_notifications(
        &self,
        caller: &Actor,
        unread_only: bool,
        limit: usize,
    ) -> RegistryResult<Vec<StoredNotification>> {
        Ok(NotificationRepository::new(&self.db).list_by_owner(
            &caller.id,
            unread_only,
            limit.clamp(1, MAX_PAGE_SIZE),
        )?)
    }

    /// Mark one of the caller's notifications as read.
    pub fn mark_notification_read(
        &self,
        caller: &Actor,
        id: &str,
    ) -> RegistryResult<StoredNotification> {
        let repo = NotificationRepository::new(&self.db);
        let notification = repo.get(id)?;
        notification.verify_ownership(caller)?;
        Ok(repo.mark_read(id)?)
    }

    fn audit_denied<T>(
        &self,
        caller: &Actor,
        resource_type: &str,
        id: &str,
        result: &Result<T, StorageError>,
    ) {
        if let Err(StorageError::PermissionDenied { .. }) = result {
            let event = AuditEvent::new(AuditEventType::PermissionDenied)
                .with_user(caller.id.as_str())
                .with_resource(resource_type, id)
                .failed("caller is neither owner nor staff");
            audit_log!(&self.db, event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{ActorRole, BirthDetails, RegistrationPayload};
    use crate::storage::{AuditQuery, AuditRepository};
    use chrono::{NaiveDate, Utc};

    fn setup() -> (Arc<RegistryDatabase>, AccessLayer) {
        let db = Arc::new(RegistryDatabase::in_memory().unwrap());
        (db.clone(), AccessLayer::new(db))
    }

    fn insert(db: &RegistryDatabase, owner: &str) -> RegistrationRecord {
        let record = RegistrationRecord::new_pending(
            owner,
            RegistrationPayload::Birth(BirthDetails {
                child_full_name: format!("Child of {owner}"),
                date_of_birth: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                place_of_birth: "Musanze".to_string(),
                sex: None,
                mother_full_name: None,
                father_full_name: None,
            }),
        );
        RegistrationRepository::new(db).insert(&record).unwrap();
        record
    }

    fn citizen(id: &str) -> Actor {
        Actor::new(id, ActorRole::Citizen)
    }

    #[test]
    fn citizen_lists_only_own_records() {
        let (db, access) = setup();
        insert(&db, "c1");
        insert(&db, "c1");
        insert(&db, "c2");

        let list = access
            .list_records(&citizen("c1"), ListFilter::default())
            .unwrap();
        assert_eq!(list.total, 2);
        assert!(list.records.iter().all(|r| r.owner_id == "c1"));
    }

    #[test]
    fn staff_list_everything_with_status_filter() {
        let (db, access) = setup();
        insert(&db, "c1");
        insert(&db, "c2");

        let verifier = Actor::new("v1", ActorRole::Verifier);
        let all = access.list_records(&verifier, ListFilter::default()).unwrap();
        assert_eq!(all.total, 2);

        let filter = ListFilter {
            status: Some(RegistrationStatus::Verified),
            ..ListFilter::default()
        };
        let none = access.list_records(&verifier, filter).unwrap();
        assert_eq!(none.total, 0);
        assert!(none.records.is_empty());
    }

    fn move_to(db: &RegistryDatabase, record: &RegistrationRecord, status: RegistrationStatus) {
        let mut next = record.clone();
        next.status = status;
        RegistrationRepository::new(db)
            .update(&next, record.version)
            .unwrap();
    }

    #[test]
    fn citizen_status_filter_stays_within_own_records() {
        let (db, access) = setup();
        insert(&db, "c1");
        let own_rejected = insert(&db, "c1");
        move_to(&db, &own_rejected, RegistrationStatus::Rejected);
        for _ in 0..3 {
            insert(&db, "c2");
        }
        let other_rejected = insert(&db, "c2");
        move_to(&db, &other_rejected, RegistrationStatus::Rejected);
        let other_verified = insert(&db, "c2");
        move_to(&db, &other_verified, RegistrationStatus::Verified);

        let by_status = |status| {
            access
                .list_records(
                    &citizen("c1"),
                    ListFilter {
                        status: Some(status),
                        ..ListFilter::default()
                    },
                )
                .unwrap()
        };

        let pending = by_status(RegistrationStatus::Pending);
        assert_eq!(pending.total, 1);
        assert!(pending.records.iter().all(|r| r.owner_id == "c1"));

        let rejected = by_status(RegistrationStatus::Rejected);
        assert_eq!(rejected.total, 1);
        assert_eq!(rejected.records[0].id, own_rejected.id);

        // Only c2 has a VERIFIED record
        let verified = by_status(RegistrationStatus::Verified);
        assert_eq!(verified.total, 0);
        assert!(verified.records.is_empty());

        let typed = access
            .list_records(
                &citizen("c1"),
                ListFilter {
                    status: Some(RegistrationStatus::Pending),
                    registration_type: Some(RegistrationType::Birth),
                    ..ListFilter::default()
                },
            )
            .unwrap();
        assert_eq!(typed.total, 1);
        assert!(typed.records.iter().all(|r| r.owner_id == "c1"));
    }

    #[test]
    fn pagination_clamps_and_validates() {
        let (db, access) = setup();
        for _ in 0..3 {
            insert(&db, "c1");
        }

        let filter = ListFilter {
            page: 2,
            page_size: 2,
            ..ListFilter::default()
        };
        let second = access.list_records(&citizen("c1"), filter).unwrap();
        assert_eq!(second.total, 3);
        assert_eq!(second.records.len(), 1);

        let huge = ListFilter {
            page_size: 10_000,
            ..ListFilter::default()
        };
        assert_eq!(
            access.list_records(&citizen("c1"), huge).unwrap().page_size,
            MAX_PAGE_SIZE
        );

        let zero = ListFilter {
            page: 0,
            ..ListFilter::default()
        };
        assert!(matches!(
            access.list_records(&citizen("c1"), zero),
            Err(RegistryError::Validation(_))
        ));
    }

    #[test]
    fn other_citizen_is_forbidden_and_audited() {
        let (db, access) = setup();
        let record = insert(&db, "c1");

        assert!(access.get_visible(&citizen("c1"), &record.id).is_ok());
        assert!(matches!(
            access.get_visible(&citizen("c2"), &record.id),
            Err(RegistryError::Forbidden(_))
        ));
        assert!(access
            .get_visible(&Actor::new("a1", ActorRole::Approver), &record.id)
            .is_ok());

        let today = Utc::now().date_naive();
        let page = AuditRepository::new(&db)
            .query(&AuditQuery {
                start_date: today - chrono::Duration::days(1),
                end_date: today,
                user_id: Some("c2".to_string()),
                event_type: Some(AuditEventType::PermissionDenied),
                resource_id: None,
                offset: 0,
                limit: 10,
            })
            .unwrap();
        assert_eq!(page.total, 1);
    }

    #[test]
    fn staff_do_not_own_records() {
        let (db, access) = setup();
        let record = insert(&db, "c1");
        assert!(matches!(
            access.get_owned(&Actor::new("admin", ActorRole::Admin), &record.id),
            Err(RegistryError::Forbidden(_))
        ));
    }

    #[test]
    fn missing_record_is_not_found() {
        let (_db, access) = setup();
        assert!(matches!(
            access.get_record_for_mutation("nope"),
            Err(RegistryError::NotFound(_))
        ));
        assert!(matches!(
            access.get_visible(&citizen("c1"), "nope"),
            Err(RegistryError::NotFound(_))
        ));
    }

    #[test]
    fn document_missing_until_rendered() {
        let (db, access) = setup();
        let record = insert(&db, "c1");
        assert!(matches!(
            access.get_document(&citizen("c1"), &record.id),
            Err(RegistryError::NotFound(_))
        ));

        DocumentRepository::new(&db)
            .put(&record.id, "text/plain", b"doc")
            .unwrap();
        let (_, bytes) = access.get_document(&citizen("c1"), &record.id).unwrap();
        assert_eq!(bytes, b"doc");
    }

    #[test]
    fn notifications_are_owner_only() {
        let (db, access) = setup();
        let notification = StoredNotification {
            id: "n1".to_string(),
            owner_id: "c1".to_string(),
            record_id: "r1".to_string(),
            registration_type: RegistrationType::Birth,
            status: RegistrationStatus::Pending,
            message: "received".to_string(),
            created_at: Utc::now(),
            read: false,
            read_at: None,
        };
        NotificationRepository::new(&db).insert(&notification).unwrap();

        assert!(matches!(
            access.mark_notification_read(&citizen("c2"), "n1"),
            Err(RegistryError::Forbidden(_))
        ));
        assert!(access.mark_notification_read(&citizen("c1"), "n1").unwrap().read);
        assert!(access
            .list_notifications(&citizen("c1"), true, 20)
            .unwrap()
            .is_empty());
    }
}
