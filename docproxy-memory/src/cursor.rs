//! Materialized result streams returned by the in-memory client.

use std::collections::VecDeque;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::value::{RawValue, to_raw_value};

use docproxy_core::{
    client::{AttachmentMeta, AttachmentStream, ResultDocument, ResultRows},
    error::{DocError, DocResult},
};

use crate::view::IndexRow;

#[derive(Debug, Clone)]
struct MemoryRow {
    id: String,
    key: Box<RawValue>,
    value: Box<RawValue>,
    doc: Option<Box<RawValue>>,
}

impl TryFrom<IndexRow> for MemoryRow {
    type Error = DocError;

    fn try_from(row: IndexRow) -> DocResult<Self> {
        Ok(Self {
            id: row.id,
            key: to_raw_value(&row.key)?,
            value: to_raw_value(&row.value)?,
            doc: row.doc.as_ref().map(to_raw_value).transpose()?,
        })
    }
}

/// Rows of an `all_docs` or view query.
#[derive(Debug, Default)]
pub struct InMemoryRows {
    pending: VecDeque<MemoryRow>,
    current: Option<MemoryRow>,
    offset: i64,
    total_rows: i64,
    update_seq: String,
}

impl InMemoryRows {
    pub(crate) fn new(
        rows: Vec<IndexRow>,
        offset: i64,
        total_rows: i64,
        update_seq: String,
    ) -> DocResult<Self> {
        Ok(Self {
            pending: rows
                .into_iter()
                .map(MemoryRow::try_from)
                .collect::<DocResult<_>>()?,
            current: None,
            offset,
            total_rows,
            update_seq,
        })
    }

    fn current(&self) -> DocResult<&MemoryRow> {
        self.current
            .as_ref()
            .ok_or_else(|| DocError::Serialization("no current row".into()))
    }
}

#[async_trait]
impl ResultRows for InMemoryRows {
    async fn next(&mut self) -> bool {
        self.current = self.pending.pop_front();
        self.current.is_some()
    }

    fn err(&self) -> Option<DocError> {
        None
    }

    fn id(&self) -> &str {
        self.current
            .as_ref()
            .map(|row| row.id.as_str())
            .unwrap_or_default()
    }

    fn key(&self) -> Option<&RawValue> {
        self.current.as_ref().map(|row| row.key.as_ref())
    }

    fn scan_value<T: DeserializeOwned>(&self) -> DocResult<T> {
        Ok(serde_json::from_str(self.current()?.value.get())?)
    }

    fn scan_doc<T: DeserializeOwned>(&self) -> DocResult<T> {
        let doc = self.current()?.doc.as_ref().map_or("null", |doc| doc.get());

        Ok(serde_json::from_str(doc)?)
    }

    fn offset(&self) -> i64 {
        self.offset
    }

    fn total_rows(&self) -> i64 {
        self.total_rows
    }

    fn update_seq(&self) -> &str {
        &self.update_seq
    }

    async fn close(&mut self) -> DocResult<()> {
        self.pending.clear();
        self.current = None;

        Ok(())
    }
}

/// Attachment metadata of a fetched document.
///
/// Holds no resources, so it keeps the default `close`.
#[derive(Debug, Default)]
pub struct InMemoryAttachments {
    pending: VecDeque<AttachmentMeta>,
}

impl InMemoryAttachments {
    pub(crate) fn new(attachments: Vec<AttachmentMeta>) -> Self {
        Self {
            pending: attachments.into(),
        }
    }
}

#[async_trait]
impl AttachmentStream for InMemoryAttachments {
    async fn next(&mut self) -> DocResult<Option<AttachmentMeta>> {
        Ok(self.pending.pop_front())
    }
}

/// A document fetched from an in-memory database.
#[derive(Debug)]
pub struct InMemoryDocument {
    id: String,
    rev: String,
    body: Box<RawValue>,
    attachments: Option<InMemoryAttachments>,
}

impl InMemoryDocument {
    pub(crate) fn new(
        id: String,
        rev: String,
        body: Box<RawValue>,
        attachments: Vec<AttachmentMeta>,
    ) -> Self {
        Self {
            id,
            rev,
            body,
            attachments: Some(InMemoryAttachments::new(attachments)),
        }
    }
}

impl ResultDocument for InMemoryDocument {
    type Attachments = InMemoryAttachments;

    fn id(&self) -> &str {
        &self.id
    }

    fn rev(&self) -> &str {
        &self.rev
    }

    fn scan_doc<T: DeserializeOwned>(&self) -> DocResult<T> {
        Ok(serde_json::from_str(self.body.get())?)
    }

    fn take_attachments(&mut self) -> Option<Self::Attachments> {
        self.attachments.take()
    }
}
