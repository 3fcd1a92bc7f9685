//! Database adapter.
//!
//! [`ProxyDb`] presents a client [`Database`] through the driver [`DriverDb`]
//! contract of one [`Revision`]. Supported operations forward the caller's
//! context, arguments and options unchanged and reshape the results. Operations
//! the adapter does not bridge return [`NOT_IMPLEMENTED`] without touching the
//! wrapped database.

use async_trait::async_trait;
use serde_json::{Value, value::RawValue};
use tracing::{error, warn};

use docproxy_core::{
    Options,
    client::{Database, ResultDocument},
    context::Context,
    driver::{
        AttachmentContent, AttachmentUpload, BulkResult, DbStats, Document, DriverAttachments,
        DriverChanges, DriverDb, DriverRows, OptionlessDb, Security,
    },
    error::{DocError, DocResult, NOT_IMPLEMENTED},
    revision::{Capabilities, Revision},
};

use crate::{attachments::AttachmentsAdapter, reshape, rows::RowsAdapter};

/// A client database handle exposed through the driver database contract.
#[derive(Debug, Clone)]
pub struct ProxyDb<D: Database> {
    db: D,
    revision: Revision,
}

impl<D: Database> ProxyDb<D> {
    pub fn new(db: D, revision: Revision) -> Self {
        Self { db, revision }
    }

    /// The contract revision this handle implements.
    pub fn revision(&self) -> Revision {
        self.revision
    }

    /// The wrapped client database.
    pub fn inner(&self) -> &D {
        &self.db
    }

    fn unsupported(&self, operation: &'static str) -> DocError {
        warn!(
            db = self.db.name(),
            operation,
            revision = %self.revision,
            "operation not supported by proxy driver"
        );

        NOT_IMPLEMENTED.clone()
    }

    fn contract_violation(&self, operation: &'static str) -> DocError {
        error!(
            db = self.db.name(),
            operation,
            "driver registry called an options-less overload"
        );

        DocError::ContractViolation(format!("{operation} should never be called").into())
    }
}

#[async_trait]
impl<D> DriverDb for ProxyDb<D>
where
    D: Database + 'static,
{
    fn capabilities(&self) -> Capabilities {
        self.revision.capabilities()
    }

    fn optionless(&self) -> Option<&dyn OptionlessDb> {
        if self.revision.capabilities().optionless_overloads {
            Some(self)
        } else {
            None
        }
    }

    async fn all_docs(&self, ctx: &Context, options: &Options) -> DocResult<Box<dyn DriverRows>> {
        let rows = self.db.all_docs(ctx, options).await?;

        Ok(Box::new(RowsAdapter::new(rows)))
    }

    async fn query(
        &self,
        ctx: &Context,
        ddoc: &str,
        view: &str,
        options: &Options,
    ) -> DocResult<Box<dyn DriverRows>> {
        let rows = self.db.query(ctx, ddoc, view, options).await?;

        Ok(Box::new(RowsAdapter::new(rows)))
    }

    async fn get(&self, ctx: &Context, id: &str, options: &Options) -> DocResult<Document> {
        let mut doc = self.db.get(ctx, id, options).await?;
        let body = doc.scan_doc::<Box<RawValue>>()?;

        let attachments: Option<Box<dyn DriverAttachments>> =
            if self.revision.capabilities().document_attachments {
                doc.take_attachments().map(|attachments| {
                    Box::new(AttachmentsAdapter::new(attachments)) as Box<dyn DriverAttachments>
                })
            } else {
                None
            };

        Ok(Document {
            rev: doc.rev().to_string(),
            body,
            attachments,
        })
    }

    async fn stats(&self, ctx: &Context) -> DocResult<DbStats> {
        let stats = self.db.stats(ctx).await?;

        Ok(reshape::stats(stats, &self.revision.capabilities()))
    }

    async fn security(&self, ctx: &Context) -> DocResult<Security> {
        self.db.security(ctx).await.map(reshape::security)
    }

    async fn set_security(&self, ctx: &Context, security: &Security) -> DocResult<()> {
        self.db
            .set_security(ctx, &reshape::client_security(security))
            .await
    }

    async fn changes(&self, _ctx: &Context, _options: &Options) -> DocResult<Box<dyn DriverChanges>> {
        Err(self.unsupported("changes"))
    }

    async fn bulk_docs(
        &self,
        _ctx: &Context,
        _docs: &[Value],
        _options: &Options,
    ) -> DocResult<Vec<BulkResult>> {
        Err(self.unsupported("bulk_docs"))
    }

    async fn create_doc(
        &self,
        ctx: &Context,
        doc: &Value,
        options: &Options,
    ) -> DocResult<(String, String)> {
        self.db.create_doc(ctx, doc, options).await
    }

    async fn put(
        &self,
        ctx: &Context,
        id: &str,
        doc: &Value,
        options: &Options,
    ) -> DocResult<String> {
        self.db.put(ctx, id, doc, options).await
    }

    async fn delete(
        &self,
        ctx: &Context,
        id: &str,
        rev: &str,
        options: &Options,
    ) -> DocResult<String> {
        self.db.delete(ctx, id, rev, options).await
    }

    async fn put_attachment(
        &self,
        ctx: &Context,
        doc_id: &str,
        rev: &str,
        attachment: AttachmentUpload,
        options: &Options,
    ) -> DocResult<String> {
        if !self.revision.capabilities().attachment_transfer {
            return Err(self.unsupported("put_attachment"));
        }

        self.db
            .put_attachment(ctx, doc_id, rev, reshape::upload(attachment), options)
            .await
    }

    async fn get_attachment(
        &self,
        ctx: &Context,
        doc_id: &str,
        filename: &str,
        options: &Options,
    ) -> DocResult<AttachmentContent> {
        if !self.revision.capabilities().attachment_transfer {
            return Err(self.unsupported("get_attachment"));
        }

        self.db
            .get_attachment(ctx, doc_id, filename, options)
            .await
            .map(reshape::content)
    }

    async fn delete_attachment(
        &self,
        ctx: &Context,
        doc_id: &str,
        rev: &str,
        filename: &str,
        options: &Options,
    ) -> DocResult<String> {
        self.db
            .delete_attachment(ctx, doc_id, rev, filename, options)
            .await
    }
}

#[async_trait]
impl<D> OptionlessDb for ProxyDb<D>
where
    D: Database + 'static,
{
    async fn create_doc_without_options(
        &self,
        _ctx: &Context,
        _doc: &Value,
    ) -> DocResult<(String, String)> {
        Err(self.contract_violation("create_doc_without_options"))
    }

    async fn put_without_options(&self, _ctx: &Context, _id: &str, _doc: &Value) -> DocResult<String> {
        Err(self.contract_violation("put_without_options"))
    }

    async fn delete_without_options(&self, _ctx: &Context, _id: &str, _rev: &str) -> DocResult<String> {
        Err(self.contract_violation("delete_without_options"))
    }

    async fn put_attachment_without_options(
        &self,
        _ctx: &Context,
        _doc_id: &str,
        _rev: &str,
        _attachment: AttachmentUpload,
    ) -> DocResult<String> {
        Err(self.contract_violation("put_attachment_without_options"))
    }

    async fn get_attachment_without_options(
        &self,
        _ctx: &Context,
        _doc_id: &str,
        _filename: &str,
    ) -> DocResult<AttachmentContent> {
        Err(self.contract_violation("get_attachment_without_options"))
    }

    async fn delete_attachment_without_options(
        &self,
        _ctx: &Context,
        _doc_id: &str,
        _rev: &str,
        _filename: &str,
    ) -> DocResult<String> {
        Err(self.contract_violation("delete_attachment_without_options"))
    }
}
