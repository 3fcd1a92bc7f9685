//! The low-level driver contract.
//!
//! This module defines the streaming, cursor-based interface expected by a driver
//! registry. Cursors are push-style: the caller owns a record and asks the cursor
//! to fill it, and the end of a result set is signalled with
//! [`DocError::EndOfStream`](crate::error::DocError::EndOfStream).
//!
//! # Traits
//!
//! - [`DriverClient`] and [`Authenticator`]: connection-level operations
//! - [`DriverDb`]: per-database operations, declared for every contract revision
//! - [`OptionlessDb`]: the options-less overloads of the legacy revision
//! - [`DriverRows`], [`DriverAttachments`], [`DriverChanges`]: cursors
//! - [`DriverClientBuilder`]: factory trait for driver clients
//!
//! # Example
//!
//! ```ignore
//! use docproxy_core::{driver::{DriverClient, Row}, context::Context, error::DocError, Options};
//!
//! let ctx = Context::new();
//! let db = driver.db(&ctx, "users", &Options::new()).await?;
//! let mut rows = db.all_docs(&ctx, &Options::new()).await?;
//! let mut row = Row::default();
//!
//! loop {
//!     match rows.next(&mut row).await {
//!         Ok(()) => println!("{}", row.id),
//!         Err(DocError::EndOfStream) => break,
//!         Err(err) => return Err(err),
//!     }
//! }
//! ```

use async_trait::async_trait;
use serde_json::{Value, value::RawValue};
use std::fmt;

use crate::{
    Options,
    context::Context,
    error::{DocError, DocResult},
    revision::Capabilities,
};

pub use crate::client::Credentials;

/// One row of a query result.
#[derive(Debug, Clone, Default)]
pub struct Row {
    pub id: String,
    /// The raw, unparsed row key.
    pub key: Option<Box<RawValue>>,
    pub value: Option<Box<RawValue>>,
    /// The embedded document, when the query included documents.
    pub doc: Option<Box<RawValue>>,
}

/// Attachment metadata as filled by a [`DriverAttachments`] cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub size: i64,
    pub digest: String,
    pub revpos: i64,
    pub stub: bool,
}

/// An attachment to be stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentUpload {
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

/// An attachment fetched by filename.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentContent {
    pub content_type: String,
    pub digest: String,
    pub content: Vec<u8>,
}

/// A document fetched by id.
pub struct Document {
    pub rev: String,
    /// The raw document body.
    pub body: Box<RawValue>,
    /// Attachment metadata cursor, for revisions that expose one.
    pub attachments: Option<Box<dyn DriverAttachments>>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("rev", &self.rev)
            .field("body", &self.body)
            .field("attachments", &self.attachments.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Version {
    pub version: String,
    pub vendor: String,
    pub features: Vec<String>,
    pub raw_response: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Members {
    pub names: Vec<String>,
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Security {
    pub admins: Members,
    pub members: Members,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterStats {
    pub replicas: i64,
    pub shards: i64,
    pub read_quorum: i64,
    pub write_quorum: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DbStats {
    pub name: String,
    pub compact_running: bool,
    pub doc_count: i64,
    pub deleted_count: i64,
    pub update_seq: String,
    pub disk_size: i64,
    pub active_size: i64,
    pub external_size: i64,
    /// Only populated by revisions whose stats carry cluster information.
    pub cluster: Option<ClusterStats>,
    pub raw_response: Vec<u8>,
}

/// One entry of a change feed.
#[derive(Debug, Clone, Default)]
pub struct Change {
    pub id: String,
    pub seq: String,
    pub deleted: bool,
    /// Leaf revisions of the changed document.
    pub changes: Vec<String>,
    pub doc: Option<Box<RawValue>>,
}

/// Outcome of one document in a bulk write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkResult {
    pub id: String,
    pub rev: String,
    pub error: Option<DocError>,
}

/// A push-style cursor over query result rows.
#[async_trait]
pub trait DriverRows: Send {
    /// Fills `row` with the next result row.
    ///
    /// Returns [`DocError::EndOfStream`] once the result set is exhausted.
    async fn next(&mut self, row: &mut Row) -> DocResult<()>;

    /// Releases the cursor.
    async fn close(&mut self) -> DocResult<()>;

    fn offset(&self) -> i64;

    fn total_rows(&self) -> i64;

    fn update_seq(&self) -> String;
}

/// A push-style cursor over attachment metadata.
#[async_trait]
pub trait DriverAttachments: Send {
    /// Fills `attachment` with the next record, or returns
    /// [`DocError::EndOfStream`].
    async fn next(&mut self, attachment: &mut Attachment) -> DocResult<()>;

    async fn close(&mut self) -> DocResult<()>;
}

/// A push-style cursor over a change feed.
#[async_trait]
pub trait DriverChanges: Send {
    async fn next(&mut self, change: &mut Change) -> DocResult<()>;

    async fn close(&mut self) -> DocResult<()>;
}

/// Connection-level driver operations.
#[async_trait]
pub trait DriverClient: Send + Sync {
    async fn all_dbs(&self, ctx: &Context, options: &Options) -> DocResult<Vec<String>>;

    async fn create_db(&self, ctx: &Context, name: &str, options: &Options) -> DocResult<()>;

    async fn db_exists(&self, ctx: &Context, name: &str, options: &Options) -> DocResult<bool>;

    async fn destroy_db(&self, ctx: &Context, name: &str, options: &Options) -> DocResult<()>;

    async fn version(&self, ctx: &Context) -> DocResult<Version>;

    /// Returns a handle to the database `name`.
    async fn db(&self, ctx: &Context, name: &str, options: &Options)
    -> DocResult<Box<dyn DriverDb>>;
}

/// Optional driver capability: session authentication.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, ctx: &Context, credentials: &Credentials) -> DocResult<()>;
}

/// Per-database driver operations.
///
/// Every method takes caller-supplied options. Operations a revision does not
/// support return [`NOT_IMPLEMENTED`](crate::error::NOT_IMPLEMENTED).
#[async_trait]
pub trait DriverDb: Send + Sync {
    /// Returns the capability table of the revision this handle implements.
    fn capabilities(&self) -> Capabilities;

    /// Returns the options-less overloads, for revisions that declare them.
    fn optionless(&self) -> Option<&dyn OptionlessDb> {
        None
    }

    async fn all_docs(&self, ctx: &Context, options: &Options) -> DocResult<Box<dyn DriverRows>>;

    async fn query(
        &self,
        ctx: &Context,
        ddoc: &str,
        view: &str,
        options: &Options,
    ) -> DocResult<Box<dyn DriverRows>>;

    async fn get(&self, ctx: &Context, id: &str, options: &Options) -> DocResult<Document>;

    async fn stats(&self, ctx: &Context) -> DocResult<DbStats>;

    async fn security(&self, ctx: &Context) -> DocResult<Security>;

    async fn set_security(&self, ctx: &Context, security: &Security) -> DocResult<()>;

    async fn changes(&self, ctx: &Context, options: &Options) -> DocResult<Box<dyn DriverChanges>>;

    async fn bulk_docs(
        &self,
        ctx: &Context,
        docs: &[Value],
        options: &Options,
    ) -> DocResult<Vec<BulkResult>>;

    /// Creates a document with a generated id. Returns `(id, rev)`.
    async fn create_doc(
        &self,
        ctx: &Context,
        doc: &Value,
        options: &Options,
    ) -> DocResult<(String, String)>;

    async fn put(&self, ctx: &Context, id: &str, doc: &Value, options: &Options)
    -> DocResult<String>;

    async fn delete(&self, ctx: &Context, id: &str, rev: &str, options: &Options)
    -> DocResult<String>;

    async fn put_attachment(
        &self,
        ctx: &Context,
        doc_id: &str,
        rev: &str,
        attachment: AttachmentUpload,
        options: &Options,
    ) -> DocResult<String>;

    async fn get_attachment(
        &self,
        ctx: &Context,
        doc_id: &str,
        filename: &str,
        options: &Options,
    ) -> DocResult<AttachmentContent>;

    async fn delete_attachment(
        &self,
        ctx: &Context,
        doc_id: &str,
        rev: &str,
        filename: &str,
        options: &Options,
    ) -> DocResult<String>;
}

/// The options-less overloads declared by the legacy revision.
///
/// Driver registries only ever call the options-accepting forms on [`DriverDb`], so
/// implementations report any call here as
/// [`DocError::ContractViolation`].
#[async_trait]
pub trait OptionlessDb: Send + Sync {
    async fn create_doc_without_options(
        &self,
        ctx: &Context,
        doc: &Value,
    ) -> DocResult<(String, String)>;

    async fn put_without_options(&self, ctx: &Context, id: &str, doc: &Value) -> DocResult<String>;

    async fn delete_without_options(&self, ctx: &Context, id: &str, rev: &str) -> DocResult<String>;

    async fn put_attachment_without_options(
        &self,
        ctx: &Context,
        doc_id: &str,
        rev: &str,
        attachment: AttachmentUpload,
    ) -> DocResult<String>;

    async fn get_attachment_without_options(
        &self,
        ctx: &Context,
        doc_id: &str,
        filename: &str,
    ) -> DocResult<AttachmentContent>;

    async fn delete_attachment_without_options(
        &self,
        ctx: &Context,
        doc_id: &str,
        rev: &str,
        filename: &str,
    ) -> DocResult<String>;
}

/// Factory trait for creating driver clients.
#[async_trait]
pub trait DriverClientBuilder {
    type Client: DriverClient;

    async fn build(self) -> DocResult<Self::Client>;
}
