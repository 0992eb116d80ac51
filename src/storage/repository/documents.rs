// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Rendered certificate documents, one per issued registration.

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

use super::super::database::{RegistryDatabase, DOCUMENTS, DOCUMENT_META};
use super::super::StorageResult;

/// Metadata stored alongside the document bytes.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct DocumentMetadata {
    pub record_id: String,
    pub content_type: String,
    /// Lowercase hex SHA-256 of the stored bytes.
    pub sha256: String,
    pub size_bytes: usize,
    pub rendered_at: DateTime<Utc>,
}

/// Repository for rendered documents.
pub struct DocumentRepository<'a> {
    db: &'a RegistryDatabase,
}

impl<'a> DocumentRepository<'a> {
    pub fn new(db: &'a RegistryDatabase) -> Self {
        Self { db }
    }

    /// Store (or replace) the document for a record.
    pub fn put(
        &self,
        record_id: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> StorageResult<DocumentMetadata> {
        let meta = DocumentMetadata {
            record_id: record_id.to_string(),
            content_type: content_type.to_string(),
            sha256: hex_digest(bytes),
            size_bytes: bytes.len(),
            rendered_at: Utc::now(),
        };
        let meta_json = serde_json::to_vec(&meta)?;

        let write_txn = self.db.inner().begin_write()?;
        {
            let mut documents = write_txn.open_table(DOCUMENTS)?;
            documents.insert(record_id, bytes)?;

            let mut metadata = write_txn.open_table(DOCUMENT_META)?;
            metadata.insert(record_id, meta_json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(meta)
    }

    /// Document bytes and metadata, if the record has been rendered.
    pub fn get(&self, record_id: &str) -> StorageResult<Option<(DocumentMetadata, Vec<u8>)>> {
        let read_txn = self.db.inner().begin_read()?;
        let meta_table = read_txn.open_table(DOCUMENT_META)?;
        let documents = read_txn.open_table(DOCUMENTS)?;

        let meta: DocumentMetadata = match meta_table.get(record_id)? {
            Some(value) => serde_json::from_slice(value.value())?,
            None => return Ok(None),
        };
        let bytes = match documents.get(record_id)? {
            Some(value) => value.value().to_vec(),
            None => return Ok(None),
        };
        Ok(Some((meta, bytes)))
    }
}

fn hex_digest(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
