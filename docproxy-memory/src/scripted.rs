//! Scripted result streams for fault injection.
//!
//! [`ScriptedRows`] and [`ScriptedAttachments`] replay a fixed script of records
//! and failures. Row payloads are kept as raw text and only parsed when read, so
//! a script can carry malformed values or documents.
//!
//! # Example
//!
//! ```ignore
//! use docproxy_memory::scripted::{ScriptedRow, ScriptedRows};
//!
//! let rows = ScriptedRows::new(vec![
//!     ScriptedRow::new("a", "1", "{\"n\":1}"),
//!     ScriptedRow::new("b", "2", "{broken"),
//! ])
//! .failing_with(DocError::status_error(Status::Network, "connection reset"));
//! ```

use std::{
    collections::VecDeque,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::value::RawValue;

use docproxy_core::{
    client::{AttachmentMeta, AttachmentStream, ResultRows},
    error::{DocError, DocResult},
};

/// Counts how often a scripted stream was closed.
#[derive(Debug, Clone, Default)]
pub struct CloseCounter(Arc<AtomicUsize>);

impl CloseCounter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// One scripted result row.
#[derive(Debug, Clone)]
pub struct ScriptedRow {
    id: String,
    key: Option<Box<RawValue>>,
    value: String,
    doc: Option<String>,
}

impl ScriptedRow {
    /// Creates a row. `key` and `value` are raw JSON text; a key that is not valid
    /// JSON is reported as absent.
    pub fn new(id: impl Into<String>, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            key: RawValue::from_string(key.into()).ok(),
            value: value.into(),
            doc: None,
        }
    }

    /// Attaches an embedded document, as raw JSON text.
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }
}

/// A [`ResultRows`] stream replaying scripted rows.
#[derive(Debug, Default)]
pub struct ScriptedRows {
    pending: VecDeque<ScriptedRow>,
    current: Option<ScriptedRow>,
    failure: Option<DocError>,
    err: Option<DocError>,
    offset: i64,
    total_rows: i64,
    update_seq: String,
    closes: CloseCounter,
}

impl ScriptedRows {
    pub fn new(rows: Vec<ScriptedRow>) -> Self {
        Self {
            total_rows: rows.len() as i64,
            pending: rows.into(),
            ..Self::default()
        }
    }

    /// Ends the stream with `err` once the scripted rows are exhausted.
    pub fn failing_with(mut self, err: DocError) -> Self {
        self.failure = Some(err);
        self
    }

    pub fn with_metadata(mut self, offset: i64, total_rows: i64, update_seq: impl Into<String>) -> Self {
        self.offset = offset;
        self.total_rows = total_rows;
        self.update_seq = update_seq.into();
        self
    }

    /// Returns a handle observing calls to [`close`](ResultRows::close).
    pub fn close_counter(&self) -> CloseCounter {
        self.closes.clone()
    }

    fn current(&self) -> DocResult<&ScriptedRow> {
        self.current
            .as_ref()
            .ok_or_else(|| DocError::Serialization("no current row".into()))
    }
}

#[async_trait]
impl ResultRows for ScriptedRows {
    async fn next(&mut self) -> bool {
        self.current = self.pending.pop_front();

        if self.current.is_none() {
            self.err = self.failure.take().or(self.err.take());
        }

        self.current.is_some()
    }

    fn err(&self) -> Option<DocError> {
        self.err.clone()
    }

    fn id(&self) -> &str {
        self.current
            .as_ref()
            .map(|row| row.id.as_str())
            .unwrap_or_default()
    }

    fn key(&self) -> Option<&RawValue> {
        self.current.as_ref()?.key.as_deref()
    }

    fn scan_value<T: DeserializeOwned>(&self) -> DocResult<T> {
        Ok(serde_json::from_str(&self.current()?.value)?)
    }

    fn scan_doc<T: DeserializeOwned>(&self) -> DocResult<T> {
        let doc = self.current()?.doc.as_deref().unwrap_or("null");

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
        self.closes.bump();
        self.pending.clear();
        self.current = None;

        Ok(())
    }
}

/// An [`AttachmentStream`] replaying scripted records and failures in order.
#[derive(Debug, Default)]
pub struct ScriptedAttachments {
    script: VecDeque<DocResult<AttachmentMeta>>,
    closes: CloseCounter,
}

impl ScriptedAttachments {
    pub fn new(script: Vec<DocResult<AttachmentMeta>>) -> Self {
        Self {
            script: script.into(),
            closes: CloseCounter::default(),
        }
    }

    /// Returns a handle observing calls to [`close`](AttachmentStream::close).
    pub fn close_counter(&self) -> CloseCounter {
        self.closes.clone()
    }
}

#[async_trait]
impl AttachmentStream for ScriptedAttachments {
    async fn next(&mut self) -> DocResult<Option<AttachmentMeta>> {
        self.script.pop_front().transpose()
    }

    async fn close(&mut self) -> DocResult<()> {
        self.closes.bump();
        self.script.clear();

        Ok(())
    }
}
