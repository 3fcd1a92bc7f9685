use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use uuid::Uuid;

use docproxy_adapter::{ProxyClient, ProxyClientBuilder, RowsAdapter};
use docproxy_core::{
    Options,
    client::{self, Client, ClientBuilder, Credentials},
    context::Context,
    driver::{
        Attachment, AttachmentUpload, Authenticator, DriverClient, DriverClientBuilder, DriverDb,
        DriverRows, Row,
    },
    error::{DocError, DocResult, NOT_IMPLEMENTED, Status},
    revision::Revision,
};
use docproxy_memory::{
    InMemoryClient, InMemoryDatabase,
    scripted::{ScriptedRow, ScriptedRows},
};

fn no_options() -> Options {
    Options::new()
}

fn options(value: Value) -> Options {
    match value {
        Value::Object(map) => map,
        _ => Options::new(),
    }
}

async fn seeded_client(ctx: &Context) -> InMemoryClient {
    let client = InMemoryClient::new();
    client.create_db(ctx, "inventory", &no_options()).await.unwrap();

    let db = client.db(ctx, "inventory", &no_options()).await.unwrap();

    for (id, kind, qty) in [("bolt", "metal", 120), ("nut", "metal", 80), ("washer", "rubber", 40)] {
        client::Database::put(&db, ctx, id, &json!({"kind": kind, "qty": qty}), &no_options())
            .await
            .unwrap();
    }

    client
        .register_view("inventory", "stock", "by_kind", |doc| {
            vec![(doc["kind"].clone(), doc["qty"].clone())]
        })
        .await
        .unwrap();

    client
}

async fn proxied_db(ctx: &Context, revision: Revision) -> Box<dyn DriverDb> {
    ProxyClient::with_revision(seeded_client(ctx).await, revision)
        .db(ctx, "inventory", &no_options())
        .await
        .unwrap()
}

/// Drains a driver cursor into `(id, key, value, doc)` tuples.
async fn drain(rows: &mut dyn DriverRows) -> DocResult<Vec<(String, String, String, Option<String>)>> {
    let mut out = Vec::new();
    let mut row = Row::default();

    loop {
        match rows.next(&mut row).await {
            Ok(()) => out.push((
                row.id.clone(),
                row.key.as_ref().map(|key| key.get().to_string()).unwrap_or_default(),
                row.value.as_ref().map(|value| value.get().to_string()).unwrap_or_default(),
                row.doc.as_ref().map(|doc| doc.get().to_string()),
            )),
            Err(DocError::EndOfStream) => return Ok(out),
            Err(err) => return Err(err),
        }
    }
}

#[tokio::test]
async fn rows_come_out_in_order_then_end() {
    let ctx = Context::new();
    let db = proxied_db(&ctx, Revision::V3).await;

    let mut rows = db
        .query(&ctx, "stock", "by_kind", &options(json!({"include_docs": true})))
        .await
        .unwrap();
    let drained = drain(rows.as_mut()).await.unwrap();

    assert_eq!(
        drained
            .iter()
            .map(|(id, key, value, _)| (id.as_str(), key.as_str(), value.as_str()))
            .collect::<Vec<_>>(),
        vec![
            ("bolt", "\"metal\"", "120"),
            ("nut", "\"metal\"", "80"),
            ("washer", "\"rubber\"", "40"),
        ]
    );

    let doc: Value = serde_json::from_str(drained[2].3.as_deref().unwrap()).unwrap();
    assert_eq!(doc["_id"], "washer");

    assert_eq!(rows.total_rows(), 3);
    assert_eq!(rows.offset(), 0);
    assert_eq!(rows.update_seq(), "3");
}

#[tokio::test]
async fn all_docs_rows_match_the_wrapped_client() {
    let ctx = Context::new();
    let client = seeded_client(&ctx).await;
    let opts = options(json!({"startkey": "nut"}));

    let direct = client.db(&ctx, "inventory", &no_options()).await.unwrap();
    let mut expected = Vec::new();
    let mut client_rows = client::Database::all_docs(&direct, &ctx, &opts).await.unwrap();
    while client::ResultRows::next(&mut client_rows).await {
        expected.push(client::ResultRows::id(&client_rows).to_string());
    }

    let db = ProxyClient::new(client).db(&ctx, "inventory", &no_options()).await.unwrap();
    let mut rows = db.all_docs(&ctx, &opts).await.unwrap();
    let drained = drain(rows.as_mut()).await.unwrap();

    assert_eq!(expected, vec!["nut", "washer"]);
    assert_eq!(
        drained.into_iter().map(|(id, ..)| id).collect::<Vec<_>>(),
        expected
    );
}

#[tokio::test]
async fn stream_error_is_returned_on_the_failing_fill() {
    let failure = DocError::status_error(Status::Network, "connection reset by peer");
    let mut cursor = RowsAdapter::new(
        ScriptedRows::new(vec![
            ScriptedRow::new("a", "1", "1"),
            ScriptedRow::new("b", "2", "2"),
        ])
        .failing_with(failure.clone()),
    );
    let mut row = Row::default();

    cursor.next(&mut row).await.unwrap();
    cursor.next(&mut row).await.unwrap();
    assert_eq!(cursor.next(&mut row).await, Err(failure.clone()));

    // The outcome is latched.
    assert_eq!(cursor.next(&mut row).await, Err(failure));
}

#[tokio::test]
async fn unsupported_operations_return_the_sentinel() {
    let ctx = Context::new();

    for revision in Revision::ALL {
        let db = proxied_db(&ctx, revision).await;

        for opts in [no_options(), options(json!({"since": "now", "feed": "continuous"}))] {
            assert_eq!(db.changes(&ctx, &opts).await.err(), Some(NOT_IMPLEMENTED.clone()));
            assert_eq!(
                db.bulk_docs(&ctx, &[json!({"_id": "x"})], &opts).await,
                Err(NOT_IMPLEMENTED.clone())
            );
            assert_eq!(db.bulk_docs(&ctx, &[], &opts).await, Err(NOT_IMPLEMENTED.clone()));
        }
    }
}

#[tokio::test]
async fn legacy_revision_declines_attachment_transfer() {
    let ctx = Context::new();
    let db = proxied_db(&ctx, Revision::Legacy).await;

    let put = db
        .put_attachment(&ctx, "bolt", "1-abc", AttachmentUpload::default(), &no_options())
        .await;
    let get = db.get_attachment(&ctx, "bolt", "spec.pdf", &no_options()).await;

    assert!(put.unwrap_err().is_not_implemented());
    assert!(get.unwrap_err().is_not_implemented());

    // The wrapped database was not touched.
    let doc = db.get(&ctx, "bolt", &no_options()).await.unwrap();
    assert!(doc.rev.starts_with("1-"));
}

#[tokio::test]
async fn attachments_flow_through_newer_revisions() {
    let ctx = Context::new();

    for revision in [Revision::V2, Revision::V3] {
        let db = proxied_db(&ctx, revision).await;
        let rev = db.get(&ctx, "bolt", &no_options()).await.unwrap().rev;

        let rev = db
            .put_attachment(
                &ctx,
                "bolt",
                &rev,
                AttachmentUpload {
                    filename: "spec.txt".into(),
                    content_type: "text/plain".into(),
                    content: b"M8x40".to_vec(),
                },
                &no_options(),
            )
            .await
            .unwrap();

        let content = db.get_attachment(&ctx, "bolt", "spec.txt", &no_options()).await.unwrap();
        assert_eq!(content.content, b"M8x40".to_vec());
        assert!(content.digest.starts_with("md5-"));

        let mut doc = db.get(&ctx, "bolt", &no_options()).await.unwrap();
        match revision {
            Revision::V3 => {
                let mut attachments = doc.attachments.take().unwrap();
                let mut attachment = Attachment::default();

                attachments.next(&mut attachment).await.unwrap();
                assert_eq!(attachment.filename, "spec.txt");
                assert_eq!(attachment.size, 5);
                assert_eq!(
                    attachments.next(&mut attachment).await,
                    Err(DocError::EndOfStream)
                );
            }
            _ => assert!(doc.attachments.is_none()),
        }

        db.delete_attachment(&ctx, "bolt", &rev, "spec.txt", &no_options())
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn stats_and_security_pass_through_losslessly() {
    let ctx = Context::new();
    let client = seeded_client(&ctx).await;
    let direct = client.db(&ctx, "inventory", &no_options()).await.unwrap();

    let security = client::Security {
        admins: client::Members {
            names: vec!["ops".into()],
            roles: vec!["_admin".into()],
        },
        members: client::Members {
            names: vec![],
            roles: vec!["warehouse".into()],
        },
    };
    client::Database::set_security(&direct, &ctx, &security).await.unwrap();
    let expected = client::Database::stats(&direct, &ctx).await.unwrap();

    let driver = ProxyClient::with_revision(client, Revision::V3);
    let db = driver.db(&ctx, "inventory", &no_options()).await.unwrap();

    let stats = db.stats(&ctx).await.unwrap();
    assert_eq!(stats.name, expected.name);
    assert_eq!(stats.doc_count, expected.doc_count);
    assert_eq!(stats.deleted_count, expected.deleted_count);
    assert_eq!(stats.update_seq, expected.update_seq);
    assert_eq!(stats.disk_size, expected.disk_size);
    assert_eq!(stats.active_size, expected.active_size);
    assert_eq!(stats.external_size, expected.external_size);
    assert_eq!(stats.raw_response, expected.raw_response);
    assert_eq!(stats.cluster.map(|cluster| cluster.shards), Some(1));

    let fetched = db.security(&ctx).await.unwrap();
    assert_eq!(fetched.admins.names, security.admins.names);
    assert_eq!(fetched.admins.roles, security.admins.roles);
    assert_eq!(fetched.members.roles, security.members.roles);

    db.set_security(&ctx, &fetched).await.unwrap();
    assert_eq!(
        client::Database::security(&direct, &ctx).await.unwrap(),
        security
    );
}

#[tokio::test]
async fn missing_database_error_is_returned_unchanged() {
    let ctx = Context::new();
    let driver = ProxyClient::new(InMemoryClient::new());

    let err = driver.db(&ctx, "nowhere", &no_options()).await.err();

    assert_eq!(err, Some(DocError::not_found("Database does not exist.")));
    assert_eq!(err.and_then(|err| err.status()).map(Status::code), Some(404));
}

#[tokio::test]
async fn interleaved_cursors_match_sequential_runs() {
    let ctx = Context::new();
    let db = proxied_db(&ctx, Revision::V3).await;

    let mut first = db.all_docs(&ctx, &no_options()).await.unwrap();
    let sequential_all = drain(first.as_mut()).await.unwrap();
    let mut second = db.query(&ctx, "stock", "by_kind", &no_options()).await.unwrap();
    let sequential_view = drain(second.as_mut()).await.unwrap();

    let mut all = db.all_docs(&ctx, &no_options()).await.unwrap();
    let mut view = db.query(&ctx, "stock", "by_kind", &no_options()).await.unwrap();
    let (mut interleaved_all, mut interleaved_view) = (Vec::new(), Vec::new());
    let (mut all_done, mut view_done) = (false, false);

    while !(all_done && view_done) {
        let mut row = Row::default();
        if !all_done {
            match all.next(&mut row).await {
                Ok(()) => interleaved_all.push(row.id.clone()),
                Err(err) => {
                    assert_eq!(err, DocError::EndOfStream);
                    all_done = true;
                }
            }
        }
        if !view_done {
            match view.next(&mut row).await {
                Ok(()) => interleaved_view.push(row.id.clone()),
                Err(err) => {
                    assert_eq!(err, DocError::EndOfStream);
                    view_done = true;
                }
            }
        }
    }

    assert_eq!(
        interleaved_all,
        sequential_all.into_iter().map(|(id, ..)| id).collect::<Vec<_>>()
    );
    assert_eq!(
        interleaved_view,
        sequential_view.into_iter().map(|(id, ..)| id).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn closed_cursor_reports_closed() {
    let ctx = Context::new();
    let db = proxied_db(&ctx, Revision::V3).await;
    let mut rows = db.all_docs(&ctx, &no_options()).await.unwrap();
    let mut row = Row::default();

    rows.next(&mut row).await.unwrap();
    rows.close().await.unwrap();
    rows.close().await.unwrap();

    assert_eq!(rows.next(&mut row).await, Err(DocError::CursorClosed));
}

#[tokio::test]
async fn extraction_failure_leaves_cursor_usable() {
    let mut cursor = RowsAdapter::new(ScriptedRows::new(vec![
        ScriptedRow::new("a", "1", "{\"broken\""),
        ScriptedRow::new("b", "2", "2"),
    ]));
    let mut row = Row::default();

    assert!(matches!(
        cursor.next(&mut row).await,
        Err(DocError::Serialization(_))
    ));

    cursor.next(&mut row).await.unwrap();
    assert_eq!(row.id, "b");
    assert_eq!(cursor.next(&mut row).await, Err(DocError::EndOfStream));
}

#[tokio::test]
async fn optionless_overloads_exist_only_in_legacy() {
    let ctx = Context::new();

    for revision in [Revision::V2, Revision::V3] {
        assert!(proxied_db(&ctx, revision).await.optionless().is_none());
    }

    let db = proxied_db(&ctx, Revision::Legacy).await;
    let legacy = db.optionless().unwrap();

    let created = legacy.create_doc_without_options(&ctx, &json!({})).await;
    let put = legacy.put_without_options(&ctx, "bolt", &json!({})).await;
    let deleted = legacy.delete_without_options(&ctx, "bolt", "1-abc").await;
    let fetched = legacy.get_attachment_without_options(&ctx, "bolt", "a.txt").await;

    assert!(matches!(created, Err(DocError::ContractViolation(_))));
    assert!(matches!(put, Err(DocError::ContractViolation(_))));
    assert!(matches!(deleted, Err(DocError::ContractViolation(_))));
    assert!(matches!(fetched, Err(DocError::ContractViolation(_))));

    // Nothing reached the wrapped database.
    let doc = db.get(&ctx, "bolt", &no_options()).await.unwrap();
    assert!(doc.rev.starts_with("1-"));
}

#[tokio::test]
async fn legacy_stats_omit_cluster_record() {
    let ctx = Context::new();
    let db = proxied_db(&ctx, Revision::Legacy).await;

    let stats = db.stats(&ctx).await.unwrap();

    assert_eq!(stats.cluster, None);
    assert_eq!(stats.doc_count, 3);
}

/// A client that records the request id of every context it receives.
#[derive(Debug, Clone, Default)]
struct RecordingClient {
    inner: InMemoryClient,
    seen: Arc<Mutex<Vec<Uuid>>>,
}

impl RecordingClient {
    fn record(&self, ctx: &Context) {
        self.seen.lock().unwrap().push(ctx.request_id());
    }
}

#[async_trait]
impl Client for RecordingClient {
    type Database = InMemoryDatabase;

    async fn all_dbs(&self, ctx: &Context, options: &Options) -> DocResult<Vec<String>> {
        self.record(ctx);
        self.inner.all_dbs(ctx, options).await
    }

    async fn create_db(&self, ctx: &Context, name: &str, options: &Options) -> DocResult<()> {
        self.record(ctx);
        self.inner.create_db(ctx, name, options).await
    }

    async fn db_exists(&self, ctx: &Context, name: &str, options: &Options) -> DocResult<bool> {
        self.record(ctx);
        self.inner.db_exists(ctx, name, options).await
    }

    async fn destroy_db(&self, ctx: &Context, name: &str, options: &Options) -> DocResult<()> {
        self.record(ctx);
        self.inner.destroy_db(ctx, name, options).await
    }

    async fn version(&self, ctx: &Context) -> DocResult<client::Version> {
        self.record(ctx);
        self.inner.version(ctx).await
    }

    async fn db(&self, ctx: &Context, name: &str, options: &Options) -> DocResult<Self::Database> {
        self.record(ctx);
        self.inner.db(ctx, name, options).await
    }

    async fn authenticate(&self, ctx: &Context, credentials: &Credentials) -> DocResult<()> {
        self.record(ctx);
        self.inner.authenticate(ctx, credentials).await
    }
}

#[tokio::test]
async fn context_reaches_the_wrapped_client_unchanged() {
    let recording = RecordingClient::default();
    let driver = ProxyClient::new(recording.clone());
    let ctx = Context::new();

    driver.create_db(&ctx, "audit", &no_options()).await.unwrap();
    driver.all_dbs(&ctx, &no_options()).await.unwrap();
    driver.version(&ctx).await.unwrap();
    driver.db(&ctx, "audit", &no_options()).await.unwrap();

    let seen = recording.seen.lock().unwrap().clone();
    assert_eq!(seen, vec![ctx.request_id(); 4]);
}

#[tokio::test]
async fn cancellation_reaches_the_wrapped_database() {
    let ctx = Context::new();
    let db = proxied_db(&ctx, Revision::V3).await;

    let cancelled = Context::new();
    cancelled.cancel();

    assert_eq!(db.stats(&cancelled).await.unwrap_err(), DocError::Canceled);
    assert_eq!(
        db.all_docs(&cancelled, &no_options()).await.err(),
        Some(DocError::Canceled)
    );
}

#[tokio::test]
async fn builder_wraps_built_client() {
    let driver = ProxyClientBuilder::new(InMemoryClient::builder())
        .revision(Revision::Legacy)
        .build()
        .await
        .unwrap();
    let ctx = Context::new();

    driver.create_db(&ctx, "built", &no_options()).await.unwrap();
    let db = driver.db(&ctx, "built", &no_options()).await.unwrap();

    assert_eq!(driver.revision(), Revision::Legacy);
    assert!(db.optionless().is_some());
    assert_eq!(
        driver.version(&ctx).await.unwrap().vendor,
        "docproxy-memory"
    );
}

#[tokio::test]
async fn null_view_values_survive_the_proxy() {
    let ctx = Context::new();
    let client = seeded_client(&ctx).await;
    client
        .register_view("inventory", "stock", "kinds", |doc| {
            vec![(doc["kind"].clone(), Value::Null)]
        })
        .await
        .unwrap();

    let db = ProxyClient::new(client).db(&ctx, "inventory", &no_options()).await.unwrap();
    let mut rows = db.query(&ctx, "stock", "kinds", &no_options()).await.unwrap();
    let drained = drain(rows.as_mut()).await.unwrap();

    assert_eq!(
        drained
            .iter()
            .map(|(id, _, value, _)| (id.as_str(), value.as_str()))
            .collect::<Vec<_>>(),
        vec![("bolt", "null"), ("nut", "null"), ("washer", "null")]
    );
}

#[tokio::test]
async fn database_lifecycle_passes_through() {
    let ctx = Context::new();
    let client = InMemoryClient::new();
    let driver = ProxyClient::new(client.clone());

    driver.create_db(&ctx, "ledger", &no_options()).await.unwrap();
    assert_eq!(driver.db_exists(&ctx, "ledger", &no_options()).await, Ok(true));

    assert_eq!(
        driver.create_db(&ctx, "ledger", &no_options()).await,
        client.create_db(&ctx, "ledger", &no_options()).await
    );

    driver.destroy_db(&ctx, "ledger", &no_options()).await.unwrap();
    assert_eq!(driver.db_exists(&ctx, "ledger", &no_options()).await, Ok(false));

    let err = driver.destroy_db(&ctx, "ledger", &no_options()).await;
    assert_eq!(err, Err(DocError::not_found("Database does not exist.")));
    assert_eq!(err, client.destroy_db(&ctx, "ledger", &no_options()).await);
}

#[tokio::test]
async fn document_writes_pass_through() {
    let ctx = Context::new();
    let db = proxied_db(&ctx, Revision::V3).await;

    let (id, first) = db
        .create_doc(&ctx, &json!({"kind": "rubber", "qty": 5}), &no_options())
        .await
        .unwrap();
    assert!(first.starts_with("1-"));

    let doc = db.get(&ctx, &id, &no_options()).await.unwrap();
    assert_eq!(doc.rev, first);

    let second = db
        .put(&ctx, &id, &json!({"_rev": first, "kind": "rubber", "qty": 4}), &no_options())
        .await
        .unwrap();
    assert!(second.starts_with("2-"));

    let conflict = DocError::status_error(Status::Conflict, "Document update conflict.");
    assert_eq!(
        db.put(&ctx, &id, &json!({"_rev": first, "qty": 3}), &no_options()).await,
        Err(conflict.clone())
    );
    assert_eq!(db.delete(&ctx, &id, &first, &no_options()).await, Err(conflict));

    let third = db.delete(&ctx, &id, &second, &no_options()).await.unwrap();
    assert!(third.starts_with("3-"));

    assert_eq!(
        db.get(&ctx, &id, &no_options()).await.err(),
        Some(DocError::not_found("deleted"))
    );
}

#[tokio::test]
async fn authentication_result_passes_through() {
    let ctx = Context::new();
    let client = InMemoryClient::builder().user("admin", "secret").build().await.unwrap();
    let driver = ProxyClient::new(client);

    let valid = Credentials::Basic {
        username: "admin".into(),
        password: "secret".into(),
    };
    let invalid = Credentials::Basic {
        username: "admin".into(),
        password: "guess".into(),
    };

    assert_eq!(driver.authenticate(&ctx, &valid).await, Ok(()));
    assert_eq!(
        driver.authenticate(&ctx, &invalid).await,
        Err(DocError::status_error(
            Status::Unauthorized,
            "Name or password is incorrect."
        ))
    );
}
