//! Client adapter.

use async_trait::async_trait;
use tracing::debug;

use docproxy_core::{
    Options,
    client::{Client, ClientBuilder, Credentials},
    context::Context,
    driver::{Authenticator, DriverClient, DriverClientBuilder, DriverDb, Version},
    error::DocResult,
    revision::{Capabilities, Revision},
};

use crate::{db::ProxyDb, reshape};

/// A client connection exposed through the driver client contract.
///
/// Every call forwards the caller's context, arguments and options to the wrapped
/// client and returns its errors unchanged. Database handles opened through
/// [`db`](DriverClient::db) implement the same [`Revision`] as the client.
///
/// # Example
///
/// ```ignore
/// use docproxy_adapter::ProxyClient;
/// use docproxy_core::{context::Context, driver::DriverClient, revision::Revision, Options};
///
/// let driver = ProxyClient::with_revision(client, Revision::V2);
/// let db = driver.db(&Context::new(), "users", &Options::new()).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProxyClient<C: Client> {
    client: C,
    revision: Revision,
}

impl<C: Client> ProxyClient<C> {
    /// Wraps `client` using the current contract revision.
    pub fn new(client: C) -> Self {
        Self::with_revision(client, Revision::default())
    }

    pub fn with_revision(client: C, revision: Revision) -> Self {
        Self { client, revision }
    }

    pub fn revision(&self) -> Revision {
        self.revision
    }

    pub fn capabilities(&self) -> Capabilities {
        self.revision.capabilities()
    }

    /// The wrapped client.
    pub fn inner(&self) -> &C {
        &self.client
    }

    pub fn into_inner(self) -> C {
        self.client
    }
}

#[async_trait]
impl<C> DriverClient for ProxyClient<C>
where
    C: Client + 'static,
{
    async fn all_dbs(&self, ctx: &Context, options: &Options) -> DocResult<Vec<String>> {
        self.client.all_dbs(ctx, options).await
    }

    async fn create_db(&self, ctx: &Context, name: &str, options: &Options) -> DocResult<()> {
        self.client.create_db(ctx, name, options).await
    }

    async fn db_exists(&self, ctx: &Context, name: &str, options: &Options) -> DocResult<bool> {
        self.client.db_exists(ctx, name, options).await
    }

    async fn destroy_db(&self, ctx: &Context, name: &str, options: &Options) -> DocResult<()> {
        self.client.destroy_db(ctx, name, options).await
    }

    async fn version(&self, ctx: &Context) -> DocResult<Version> {
        self.client.version(ctx).await.map(reshape::version)
    }

    async fn db(
        &self,
        ctx: &Context,
        name: &str,
        options: &Options,
    ) -> DocResult<Box<dyn DriverDb>> {
        let db = self.client.db(ctx, name, options).await?;

        debug!(
            db = name,
            revision = %self.revision,
            request_id = %ctx.request_id(),
            "opened proxied database"
        );

        Ok(Box::new(ProxyDb::new(db, self.revision)))
    }
}

#[async_trait]
impl<C> Authenticator for ProxyClient<C>
where
    C: Client + 'static,
{
    async fn authenticate(&self, ctx: &Context, credentials: &Credentials) -> DocResult<()> {
        self.client.authenticate(ctx, credentials).await
    }
}

/// Builds a [`ProxyClient`] around the client produced by a [`ClientBuilder`].
///
/// # Example
///
/// ```ignore
/// use docproxy_adapter::ProxyClientBuilder;
/// use docproxy_core::{driver::DriverClientBuilder, revision::Revision};
/// use docproxy_memory::InMemoryClient;
///
/// let driver = ProxyClientBuilder::new(InMemoryClient::builder())
///     .revision(Revision::Legacy)
///     .build()
///     .await?;
/// ```
#[derive(Debug, Default)]
pub struct ProxyClientBuilder<B> {
    builder: B,
    revision: Revision,
}

impl<B: ClientBuilder> ProxyClientBuilder<B> {
    pub fn new(builder: B) -> Self {
        Self {
            builder,
            revision: Revision::default(),
        }
    }

    /// Selects the contract revision of the built client.
    pub fn revision(mut self, revision: Revision) -> Self {
        self.revision = revision;
        self
    }
}

#[async_trait]
impl<B> DriverClientBuilder for ProxyClientBuilder<B>
where
    B: ClientBuilder + Send,
    B::Client: 'static,
{
    type Client = ProxyClient<B::Client>;

    async fn build(self) -> DocResult<Self::Client> {
        let client = self.builder.build().await?;

        Ok(ProxyClient::with_revision(client, self.revision))
    }
}
