//! The high-level document database client contract.
//!
//! This is the ergonomic side of the adapter: whole-result operations on a
//! connection ([`Client`]) and on a database handle ([`Database`]), with pull-based
//! streams ([`ResultRows`], [`AttachmentStream`]) for query results and document
//! attachments. The proxy adapter consumes these traits; concrete clients such as
//! the in-memory client implement them.
//!
//! # Example
//!
//! ```ignore
//! use docproxy_core::{client::{Client, Database, ResultRows}, context::Context, Options};
//!
//! let ctx = Context::new();
//! let db = client.db(&ctx, "users", &Options::new()).await?;
//! let mut rows = db.all_docs(&ctx, &Options::new()).await?;
//!
//! while rows.next().await {
//!     println!("{}", rows.id());
//! }
//!
//! if let Some(err) = rows.err() {
//!     return Err(err);
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, value::RawValue};
use std::{fmt::Debug, sync::Arc};

use crate::{
    Options,
    context::Context,
    error::{DocError, DocResult},
};

/// Server version information.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Version {
    /// The version string reported by the server.
    pub version: String,
    /// The vendor string reported by the server.
    pub vendor: String,
    /// Optional features advertised by the server.
    pub features: Vec<String>,
    /// The unparsed server response.
    pub raw_response: Vec<u8>,
}

/// A list of user names and roles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Members {
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// A database security object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Security {
    #[serde(default)]
    pub admins: Members,
    #[serde(default)]
    pub members: Members,
}

/// Sharding and quorum settings of a clustered database.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterConfig {
    pub replicas: i64,
    pub shards: i64,
    pub read_quorum: i64,
    pub write_quorum: i64,
}

/// Database statistics.
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
    /// Present only when the server runs in clustered mode.
    pub cluster: Option<ClusterConfig>,
    pub raw_response: Vec<u8>,
}

/// Credentials handed to [`Client::authenticate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// HTTP basic authentication.
    Basic { username: String, password: String },
    /// Session cookie authentication.
    Cookie { username: String, password: String },
}

/// Metadata describing one attachment of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentMeta {
    pub filename: String,
    pub content_type: String,
    /// Size of the attachment content in bytes.
    pub size: i64,
    /// Content digest, e.g. `md5-<base64>`.
    pub digest: String,
    /// The document generation in which the attachment was last modified.
    pub revpos: i64,
    /// `true` when the record carries metadata only.
    pub stub: bool,
}

/// An attachment to be stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentUpload {
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

/// An attachment fetched from the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentContent {
    pub content_type: String,
    pub digest: String,
    pub content: Vec<u8>,
}

/// A pull-based stream of query result rows.
///
/// Callers advance the stream with [`next`](ResultRows::next) and then read the
/// current row through the field accessors. When `next` returns `false`, the stream
/// is exhausted and [`err`](ResultRows::err) reports whether it ended because of a
/// failure.
#[async_trait]
pub trait ResultRows: Send {
    /// Advances to the next row. Returns `false` when there are no more rows or an
    /// error occurred.
    async fn next(&mut self) -> bool;

    /// Returns the error that stopped the stream, if any.
    fn err(&self) -> Option<DocError>;

    /// Returns the id of the current row.
    fn id(&self) -> &str;

    /// Returns the raw key of the current row.
    fn key(&self) -> Option<&RawValue>;

    /// Decodes the value of the current row.
    fn scan_value<T: DeserializeOwned>(&self) -> DocResult<T>;

    /// Decodes the embedded document of the current row. A row without an embedded
    /// document decodes as JSON `null`.
    fn scan_doc<T: DeserializeOwned>(&self) -> DocResult<T>;

    /// Number of rows skipped before the first row of this result.
    fn offset(&self) -> i64;

    /// Total number of rows in the underlying index.
    fn total_rows(&self) -> i64;

    /// Update sequence of the database when the result was produced.
    fn update_seq(&self) -> &str;

    /// Releases the resources held by the stream.
    async fn close(&mut self) -> DocResult<()>;
}

/// A stream of attachment metadata belonging to one fetched document.
#[async_trait]
pub trait AttachmentStream: Send {
    /// Returns the next attachment, or `None` once the stream is exhausted.
    async fn next(&mut self) -> DocResult<Option<AttachmentMeta>>;

    /// Releases the resources held by the stream.
    ///
    /// Streams that clean up on their own keep the default, which always succeeds.
    async fn close(&mut self) -> DocResult<()> {
        Ok(())
    }
}

/// A single document fetched by id.
pub trait ResultDocument: Send {
    type Attachments: AttachmentStream + 'static;

    fn id(&self) -> &str;

    fn rev(&self) -> &str;

    /// Decodes the document body.
    fn scan_doc<T: DeserializeOwned>(&self) -> DocResult<T>;

    /// Takes the attachment stream of this document, if it has one.
    fn take_attachments(&mut self) -> Option<Self::Attachments>;
}

/// A handle to one named database.
#[async_trait]
pub trait Database: Send + Sync + Debug {
    type Rows: ResultRows + 'static;
    type Document: ResultDocument + 'static;

    /// Returns the name this handle was opened with.
    fn name(&self) -> &str;

    /// Lists every document in the database.
    async fn all_docs(&self, ctx: &Context, options: &Options) -> DocResult<Self::Rows>;

    /// Runs the view `view` of the design document `ddoc`.
    async fn query(
        &self,
        ctx: &Context,
        ddoc: &str,
        view: &str,
        options: &Options,
    ) -> DocResult<Self::Rows>;

    /// Fetches a single document.
    async fn get(&self, ctx: &Context, id: &str, options: &Options) -> DocResult<Self::Document>;

    async fn stats(&self, ctx: &Context) -> DocResult<DbStats>;

    async fn security(&self, ctx: &Context) -> DocResult<Security>;

    async fn set_security(&self, ctx: &Context, security: &Security) -> DocResult<()>;

    /// Creates a document with a server-generated id. Returns `(id, rev)`.
    async fn create_doc(
        &self,
        ctx: &Context,
        doc: &Value,
        options: &Options,
    ) -> DocResult<(String, String)>;

    /// Creates or updates the document `id`. Returns the new revision.
    async fn put(&self, ctx: &Context, id: &str, doc: &Value, options: &Options)
    -> DocResult<String>;

    /// Deletes revision `rev` of document `id`. Returns the tombstone revision.
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

/// A connection to a document database server.
#[async_trait]
pub trait Client: Send + Sync + Debug {
    type Database: Database + 'static;

    async fn all_dbs(&self, ctx: &Context, options: &Options) -> DocResult<Vec<String>>;

    async fn create_db(&self, ctx: &Context, name: &str, options: &Options) -> DocResult<()>;

    async fn db_exists(&self, ctx: &Context, name: &str, options: &Options) -> DocResult<bool>;

    async fn destroy_db(&self, ctx: &Context, name: &str, options: &Options) -> DocResult<()>;

    async fn version(&self, ctx: &Context) -> DocResult<Version>;

    /// Opens a handle to the database `name`.
    ///
    /// Fails if the database does not exist.
    async fn db(&self, ctx: &Context, name: &str, options: &Options) -> DocResult<Self::Database>;

    async fn authenticate(&self, ctx: &Context, credentials: &Credentials) -> DocResult<()>;
}

#[async_trait]
impl<C> Client for Arc<C>
where
    C: Client,
{
    type Database = C::Database;

    async fn all_dbs(&self, ctx: &Context, options: &Options) -> DocResult<Vec<String>> {
        (**self).all_dbs(ctx, options).await
    }

    async fn create_db(&self, ctx: &Context, name: &str, options: &Options) -> DocResult<()> {
        (**self).create_db(ctx, name, options).await
    }

    async fn db_exists(&self, ctx: &Context, name: &str, options: &Options) -> DocResult<bool> {
        (**self).db_exists(ctx, name, options).await
    }

    async fn destroy_db(&self, ctx: &Context, name: &str, options: &Options) -> DocResult<()> {
        (**self).destroy_db(ctx, name, options).await
    }

    async fn version(&self, ctx: &Context) -> DocResult<Version> {
        (**self).version(ctx).await
    }

    async fn db(&self, ctx: &Context, name: &str, options: &Options) -> DocResult<Self::Database> {
        (**self).db(ctx, name, options).await
    }

    async fn authenticate(&self, ctx: &Context, credentials: &Credentials) -> DocResult<()> {
        (**self).authenticate(ctx, credentials).await
    }
}

/// Factory trait for creating client instances.
#[async_trait]
pub trait ClientBuilder {
    type Client: Client;

    async fn build(self) -> DocResult<Self::Client>;
}
