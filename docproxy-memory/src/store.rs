//! In-memory client implementation.
//!
//! This module provides a self-contained document database that keeps every
//! database, document, attachment and view in process memory behind async-aware
//! read-write locks. It follows the observable behavior of a single-node server
//! closely enough to exercise clients and the proxy driver without a network.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use md5::{Digest, Md5};
use mea::rwlock::RwLock;
use serde_json::{Map, Value, json, value::to_raw_value};
use tracing::debug;
use uuid::Uuid;

use docproxy_core::{
    Options,
    client::{
        AttachmentContent, AttachmentMeta, AttachmentUpload, Client, ClientBuilder, ClusterConfig,
        Credentials, Database, DbStats, Security, Version,
    },
    context::Context,
    error::{DocError, DocResult, Status},
};

use crate::{
    cursor::{InMemoryDocument, InMemoryRows},
    view::{IndexRow, MapFn, QueryOptions, View},
};

const VERSION: &str = "3.3.3";
const VENDOR: &str = "docproxy-memory";
const FEATURES: [&str; 3] = ["access-ready", "partitioned", "scheduler"];

const DB_MISSING: &str = "Database does not exist.";
const DB_EXISTS: &str = "The database could not be created, the file already exists.";
const CONFLICT: &str = "Document update conflict.";

/// Bytes counted in `disk_size`, on top of `active_size`, for each deleted
/// document's id, revision and deletion marker.
const TOMBSTONE_SIZE: usize = 64;

fn db_missing() -> DocError {
    DocError::not_found(DB_MISSING)
}

fn conflict() -> DocError {
    DocError::status_error(Status::Conflict, CONFLICT)
}

fn bad_request(message: impl Into<String>) -> DocError {
    let message: String = message.into();
    DocError::status_error(Status::BadRequest, message)
}

/// Database names start with a lowercase letter and contain only lowercase
/// letters, digits and `_$()+-/`.
fn valid_db_name(name: &str) -> bool {
    let mut chars = name.chars();

    matches!(chars.next(), Some('a'..='z'))
        && chars.all(|c| matches!(c, 'a'..='z' | '0'..='9' | '_' | '$' | '(' | ')' | '+' | '-' | '/'))
}

fn new_rev(generation: u64) -> String {
    format!("{generation}-{}", Uuid::new_v4().simple())
}

fn md5_digest(content: &[u8]) -> String {
    format!("md5-{}", STANDARD.encode(Md5::digest(content)))
}

#[derive(Debug, Clone)]
struct StoredAttachment {
    content_type: String,
    content: Vec<u8>,
    digest: String,
    revpos: u64,
}

#[derive(Debug, Clone, Default)]
struct StoredDoc {
    rev: String,
    generation: u64,
    deleted: bool,
    /// The document body without `_id`, `_rev` and `_attachments`.
    body: Map<String, Value>,
    attachments: BTreeMap<String, StoredAttachment>,
}

impl StoredDoc {
    /// Renders the document the way it is returned to callers.
    fn render(&self, id: &str) -> Value {
        let mut doc = Map::new();
        doc.insert("_id".into(), Value::String(id.into()));
        doc.insert("_rev".into(), Value::String(self.rev.clone()));
        doc.extend(self.body.clone());

        if !self.attachments.is_empty() {
            let stubs = self
                .attachments
                .iter()
                .map(|(name, attachment)| {
                    (
                        name.clone(),
                        json!({
                            "content_type": attachment.content_type,
                            "digest": attachment.digest,
                            "length": attachment.content.len(),
                            "revpos": attachment.revpos,
                            "stub": true,
                        }),
                    )
                })
                .collect::<Map<_, _>>();

            doc.insert("_attachments".into(), Value::Object(stubs));
        }

        Value::Object(doc)
    }

    fn attachment_meta(&self) -> Vec<AttachmentMeta> {
        self.attachments
            .iter()
            .map(|(name, attachment)| AttachmentMeta {
                filename: name.clone(),
                content_type: attachment.content_type.clone(),
                size: attachment.content.len() as i64,
                digest: attachment.digest.clone(),
                revpos: attachment.revpos as i64,
                stub: true,
            })
            .collect()
    }

    fn size(&self) -> DocResult<usize> {
        let body = serde_json::to_vec(&self.body)?.len();
        let attachments = self
            .attachments
            .values()
            .map(|attachment| attachment.content.len())
            .sum::<usize>();

        Ok(body + attachments)
    }

    /// Checks the caller's revision against the stored one.
    fn check_rev(&self, rev: &str) -> DocResult<()> {
        if self.rev == rev {
            Ok(())
        } else {
            Err(conflict())
        }
    }

    /// Moves the document to its next generation and returns the new revision.
    fn bump(&mut self) -> String {
        self.generation += 1;
        self.rev = new_rev(self.generation);
        self.rev.clone()
    }
}

#[derive(Debug, Default)]
struct DbState {
    dropped: bool,
    update_seq: u64,
    docs: BTreeMap<String, StoredDoc>,
    security: Security,
    views: HashMap<(String, String), View>,
}

impl DbState {
    fn ensure_live(&self) -> DocResult<()> {
        if self.dropped { Err(db_missing()) } else { Ok(()) }
    }

    fn live_doc(&self, id: &str) -> DocResult<&StoredDoc> {
        match self.docs.get(id) {
            None => Err(DocError::not_found("missing")),
            Some(doc) if doc.deleted => Err(DocError::not_found("deleted")),
            Some(doc) => Ok(doc),
        }
    }

    fn live_doc_mut(&mut self, id: &str) -> DocResult<&mut StoredDoc> {
        match self.docs.get_mut(id) {
            None => Err(DocError::not_found("missing")),
            Some(doc) if doc.deleted => Err(DocError::not_found("deleted")),
            Some(doc) => Ok(doc),
        }
    }

    fn live_docs(&self) -> impl Iterator<Item = (&String, &StoredDoc)> {
        self.docs.iter().filter(|(_, doc)| !doc.deleted)
    }

    fn update_seq(&self) -> String {
        self.update_seq.to_string()
    }

    /// Writes `body` as the next revision of document `id`.
    fn write(&mut self, id: &str, rev: Option<&str>, body: Map<String, Value>) -> DocResult<String> {
        match (self.docs.get(id), rev) {
            // New documents and tombstones accept writes without a revision.
            (None, None) => {}
            (Some(doc), None) if doc.deleted => {}
            (Some(doc), Some(rev)) => doc.check_rev(rev)?,
            (None, Some(_)) | (Some(_), None) => return Err(conflict()),
        }

        let doc = self.docs.entry(id.to_string()).or_default();
        doc.deleted = false;
        doc.body = body;
        let rev = doc.bump();
        self.update_seq += 1;

        Ok(rev)
    }
}

/// Splits a document into its revision and its body without metadata fields.
fn split_doc(doc: &Value) -> DocResult<(Option<String>, Map<String, Value>)> {
    let Value::Object(fields) = doc else {
        return Err(bad_request("Document must be a JSON object"));
    };

    let rev = fields
        .get("_rev")
        .and_then(Value::as_str)
        .map(ToOwned::to_owned);

    let body = fields
        .iter()
        .filter(|(name, _)| !matches!(name.as_str(), "_id" | "_rev" | "_attachments" | "_deleted"))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();

    Ok((rev, body))
}

/// Resolves the revision of a write from the document body or the `rev` option.
fn resolve_rev(body_rev: Option<String>, options: &Options) -> Option<String> {
    body_rev.or_else(|| options.get("rev").and_then(Value::as_str).map(ToOwned::to_owned))
}

type DatabaseMap = BTreeMap<String, Arc<RwLock<DbState>>>;

/// Thread-safe in-memory document database client.
///
/// `InMemoryClient` is cloneable; clones share the same databases, so a test can
/// hand one clone to an adapter and keep another to seed data or register views.
///
/// # Example
///
/// ```ignore
/// use docproxy_core::{client::{Client, ClientBuilder, Database}, context::Context, Options};
/// use docproxy_memory::InMemoryClient;
/// use serde_json::json;
///
/// let client = InMemoryClient::builder().build().await?;
/// let ctx = Context::new();
///
/// client.create_db(&ctx, "users", &Options::new()).await?;
/// let db = client.db(&ctx, "users", &Options::new()).await?;
/// let rev = db.put(&ctx, "alice", &json!({"age": 30}), &Options::new()).await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryClient {
    databases: Arc<RwLock<DatabaseMap>>,
    users: Arc<HashMap<String, String>>,
}

impl InMemoryClient {
    /// Creates an empty client that accepts any credentials.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> InMemoryClientBuilder {
        InMemoryClientBuilder::default()
    }

    async fn state(&self, name: &str) -> DocResult<Arc<RwLock<DbState>>> {
        self.databases
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(db_missing)
    }

    /// Registers the view `view` of design document `ddoc` in database `db`.
    ///
    /// `map` is called with every live document, rendered with its `_id` and `_rev`,
    /// and returns the `(key, value)` rows to emit for it.
    pub async fn register_view<F>(&self, db: &str, ddoc: &str, view: &str, map: F) -> DocResult<()>
    where
        F: Fn(&Value) -> Vec<(Value, Value)> + Send + Sync + 'static,
    {
        let state = self.state(db).await?;
        let map: Arc<MapFn> = Arc::new(map);

        state
            .write()
            .await
            .views
            .insert((ddoc.to_string(), view.to_string()), View(map));

        debug!(db, ddoc, view, "registered view");

        Ok(())
    }
}

#[async_trait]
impl Client for InMemoryClient {
    type Database = InMemoryDatabase;

    async fn all_dbs(&self, ctx: &Context, _options: &Options) -> DocResult<Vec<String>> {
        ctx.check()?;

        Ok(self.databases.read().await.keys().cloned().collect())
    }

    async fn create_db(&self, ctx: &Context, name: &str, _options: &Options) -> DocResult<()> {
        ctx.check()?;

        if !valid_db_name(name) {
            return Err(bad_request(format!(
                "Name: '{name}'. Only lowercase characters (a-z), digits (0-9), and any of the characters _, $, (, ), +, -, and / are allowed. Must begin with a letter."
            )));
        }

        let mut databases = self.databases.write().await;

        if databases.contains_key(name) {
            return Err(DocError::status_error(Status::PreconditionFailed, DB_EXISTS));
        }

        databases.insert(name.to_string(), Arc::new(RwLock::new(DbState::default())));
        debug!(db = name, "created database");

        Ok(())
    }

    async fn db_exists(&self, ctx: &Context, name: &str, _options: &Options) -> DocResult<bool> {
        ctx.check()?;

        Ok(self.databases.read().await.contains_key(name))
    }

    async fn destroy_db(&self, ctx: &Context, name: &str, _options: &Options) -> DocResult<()> {
        ctx.check()?;

        let state = self
            .databases
            .write()
            .await
            .remove(name)
            .ok_or_else(db_missing)?;

        // Handles opened before the drop report the database as missing.
        state.write().await.dropped = true;
        debug!(db = name, "destroyed database");

        Ok(())
    }

    async fn version(&self, ctx: &Context) -> DocResult<Version> {
        ctx.check()?;

        let raw_response = serde_json::to_vec(&json!({
            "couchdb": "Welcome",
            "version": VERSION,
            "features": FEATURES,
            "vendor": { "name": VENDOR },
        }))?;

        Ok(Version {
            version: VERSION.to_string(),
            vendor: VENDOR.to_string(),
            features: FEATURES.iter().map(ToString::to_string).collect(),
            raw_response,
        })
    }

    async fn db(&self, ctx: &Context, name: &str, _options: &Options) -> DocResult<Self::Database> {
        ctx.check()?;

        Ok(InMemoryDatabase {
            name: name.to_string(),
            state: self.state(name).await?,
        })
    }

    async fn authenticate(&self, ctx: &Context, credentials: &Credentials) -> DocResult<()> {
        ctx.check()?;

        if self.users.is_empty() {
            return Ok(());
        }

        let (Credentials::Basic { username, password } | Credentials::Cookie { username, password }) =
            credentials;

        match self.users.get(username) {
            Some(expected) if expected == password => Ok(()),
            _ => Err(DocError::status_error(
                Status::Unauthorized,
                "Name or password is incorrect.",
            )),
        }
    }
}

/// A handle to one in-memory database.
///
/// The handle outlives the database: once destroyed, every operation fails with
/// `404 Database does not exist.`.
#[derive(Debug, Clone)]
pub struct InMemoryDatabase {
    name: String,
    state: Arc<RwLock<DbState>>,
}

#[async_trait]
impl Database for InMemoryDatabase {
    type Rows = InMemoryRows;
    type Document = InMemoryDocument;

    fn name(&self) -> &str {
        &self.name
    }

    async fn all_docs(&self, ctx: &Context, options: &Options) -> DocResult<Self::Rows> {
        ctx.check()?;
        let query = QueryOptions::parse(options)?;

        let state = self.state.read().await;
        state.ensure_live()?;

        let index = state
            .live_docs()
            .map(|(id, doc)| IndexRow {
                id: id.clone(),
                key: Value::String(id.clone()),
                value: json!({ "rev": doc.rev }),
                doc: query.include_docs.then(|| doc.render(id)),
            })
            .collect::<Vec<_>>();

        let total_rows = index.len() as i64;
        let (rows, offset) = query.select(index);

        InMemoryRows::new(rows, offset, total_rows, state.update_seq())
    }

    async fn query(
        &self,
        ctx: &Context,
        ddoc: &str,
        view: &str,
        options: &Options,
    ) -> DocResult<Self::Rows> {
        ctx.check()?;
        let query = QueryOptions::parse(options)?;

        let state = self.state.read().await;
        state.ensure_live()?;

        let View(map) = state
            .views
            .get(&(ddoc.to_string(), view.to_string()))
            .ok_or_else(|| DocError::not_found("missing_named_view"))?;

        let mut index = Vec::new();

        for (id, doc) in state.live_docs() {
            let rendered = doc.render(id);

            for (key, value) in map(&rendered) {
                index.push(IndexRow {
                    id: id.clone(),
                    key,
                    value,
                    doc: query.include_docs.then(|| rendered.clone()),
                });
            }
        }

        let total_rows = index.len() as i64;
        let (rows, offset) = query.select(index);

        InMemoryRows::new(rows, offset, total_rows, state.update_seq())
    }

    async fn get(&self, ctx: &Context, id: &str, options: &Options) -> DocResult<Self::Document> {
        ctx.check()?;

        let state = self.state.read().await;
        state.ensure_live()?;

        let doc = state.live_doc(id)?;

        if let Some(rev) = options.get("rev").and_then(Value::as_str) {
            if rev != doc.rev {
                return Err(DocError::not_found("missing"));
            }
        }

        Ok(InMemoryDocument::new(
            id.to_string(),
            doc.rev.clone(),
            to_raw_value(&doc.render(id))?,
            doc.attachment_meta(),
        ))
    }

    async fn stats(&self, ctx: &Context) -> DocResult<DbStats> {
        ctx.check()?;

        let state = self.state.read().await;
        state.ensure_live()?;

        let mut doc_count = 0;
        let mut deleted_count = 0;
        let mut active_size = 0;
        let mut external_size = 0;

        for doc in state.docs.values() {
            if doc.deleted {
                deleted_count += 1;
            } else {
                doc_count += 1;
                active_size += doc.size()?;
                external_size += serde_json::to_vec(&doc.body)?.len();
            }
        }

        let disk_size = active_size + deleted_count * TOMBSTONE_SIZE;

        let raw_response = serde_json::to_vec(&json!({
            "db_name": self.name,
            "doc_count": doc_count,
            "doc_del_count": deleted_count,
            "update_seq": state.update_seq(),
            "compact_running": false,
            "sizes": { "file": disk_size, "active": active_size, "external": external_size },
            "cluster": { "q": 1, "n": 1, "w": 1, "r": 1 },
        }))?;

        Ok(DbStats {
            name: self.name.clone(),
            compact_running: false,
            doc_count: doc_count as i64,
            deleted_count: deleted_count as i64,
            update_seq: state.update_seq(),
            disk_size: disk_size as i64,
            active_size: active_size as i64,
            external_size: external_size as i64,
            cluster: Some(ClusterConfig {
                replicas: 1,
                shards: 1,
                read_quorum: 1,
                write_quorum: 1,
            }),
            raw_response,
        })
    }

    async fn security(&self, ctx: &Context) -> DocResult<Security> {
        ctx.check()?;

        let state = self.state.read().await;
        state.ensure_live()?;

        Ok(state.security.clone())
    }

    async fn set_security(&self, ctx: &Context, security: &Security) -> DocResult<()> {
        ctx.check()?;

        let mut state = self.state.write().await;
        state.ensure_live()?;
        state.security = security.clone();

        Ok(())
    }

    async fn create_doc(
        &self,
        ctx: &Context,
        doc: &Value,
        options: &Options,
    ) -> DocResult<(String, String)> {
        let id = match doc.get("_id").and_then(Value::as_str) {
            Some(id) => id.to_string(),
            None => Uuid::new_v4().simple().to_string(),
        };

        let rev = self.put(ctx, &id, doc, options).await?;

        Ok((id, rev))
    }

    async fn put(
        &self,
        ctx: &Context,
        id: &str,
        doc: &Value,
        options: &Options,
    ) -> DocResult<String> {
        ctx.check()?;

        if id.is_empty() {
            return Err(bad_request("Document id must not be empty"));
        }

        let (body_rev, body) = split_doc(doc)?;
        let rev = resolve_rev(body_rev, options);

        let mut state = self.state.write().await;
        state.ensure_live()?;

        state.write(id, rev.as_deref(), body)
    }

    async fn delete(
        &self,
        ctx: &Context,
        id: &str,
        rev: &str,
        _options: &Options,
    ) -> DocResult<String> {
        ctx.check()?;

        let mut state = self.state.write().await;
        state.ensure_live()?;

        let doc = state.live_doc_mut(id)?;
        doc.check_rev(rev)?;

        doc.deleted = true;
        doc.body.clear();
        doc.attachments.clear();
        let rev = doc.bump();

        state.update_seq += 1;

        Ok(rev)
    }

    async fn put_attachment(
        &self,
        ctx: &Context,
        doc_id: &str,
        rev: &str,
        attachment: AttachmentUpload,
        _options: &Options,
    ) -> DocResult<String> {
        ctx.check()?;

        let mut state = self.state.write().await;
        state.ensure_live()?;

        // Attaching to a missing document without a revision creates it.
        match state.docs.get(doc_id) {
            Some(doc) if !doc.deleted => doc.check_rev(rev)?,
            _ if !rev.is_empty() => return Err(conflict()),
            _ => {}
        }

        let doc = state.docs.entry(doc_id.to_string()).or_default();
        doc.deleted = false;

        let rev = doc.bump();
        let digest = md5_digest(&attachment.content);

        doc.attachments.insert(
            attachment.filename,
            StoredAttachment {
                content_type: attachment.content_type,
                content: attachment.content,
                digest,
                revpos: doc.generation,
            },
        );

        state.update_seq += 1;

        Ok(rev)
    }

    async fn get_attachment(
        &self,
        ctx: &Context,
        doc_id: &str,
        filename: &str,
        _options: &Options,
    ) -> DocResult<AttachmentContent> {
        ctx.check()?;

        let state = self.state.read().await;
        state.ensure_live()?;

        let attachment = state
            .live_doc(doc_id)?
            .attachments
            .get(filename)
            .ok_or_else(|| DocError::not_found("Document is missing attachment"))?;

        Ok(AttachmentContent {
            content_type: attachment.content_type.clone(),
            digest: attachment.digest.clone(),
            content: attachment.content.clone(),
        })
    }

    async fn delete_attachment(
        &self,
        ctx: &Context,
        doc_id: &str,
        rev: &str,
        filename: &str,
        _options: &Options,
    ) -> DocResult<String> {
        ctx.check()?;

        let mut state = self.state.write().await;
        state.ensure_live()?;

        let doc = state.live_doc_mut(doc_id)?;
        doc.check_rev(rev)?;

        if doc.attachments.remove(filename).is_none() {
            return Err(DocError::not_found("Document is missing attachment"));
        }

        let rev = doc.bump();
        state.update_seq += 1;

        Ok(rev)
    }
}

/// Builder for constructing [`InMemoryClient`] instances.
///
/// # Example
///
/// ```ignore
/// use docproxy_core::client::ClientBuilder;
/// use docproxy_memory::InMemoryClient;
///
/// let client = InMemoryClient::builder()
///     .user("admin", "secret")
///     .build()
///     .await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryClientBuilder {
    users: HashMap<String, String>,
}

impl InMemoryClientBuilder {
    /// Adds a user accepted by [`Client::authenticate`].
    ///
    /// A client without users accepts any credentials.
    pub fn user(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.users.insert(username.into(), password.into());
        self
    }
}

#[async_trait]
impl ClientBuilder for InMemoryClientBuilder {
    type Client = InMemoryClient;

    async fn build(self) -> DocResult<Self::Client> {
        Ok(InMemoryClient {
            databases: Arc::new(RwLock::new(DatabaseMap::new())),
            users: Arc::new(self.users),
        })
    }
}
