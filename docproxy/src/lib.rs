//! Main docproxy crate: expose a high-level document database client through the
//! low-level, cursor-based driver contract.
//!
//! This crate is the primary entry point for users of docproxy. It re-exports the
//! core contracts, the proxy driver and, behind the `memory` feature, the in-memory
//! client.
//!
//! # Features
//!
//! - **Two contracts** - The ergonomic client contract and the streaming driver contract
//! - **One adapter, three revisions** - `Legacy`, `V2` and `V3` driver revisions from a single wrapper
//! - **Explicit gaps** - Unbridged operations return a shared `NOT_IMPLEMENTED` sentinel
//! - **In-memory client** - A complete reference client for development and tests
//!
//! # Quick Start
//!
//! ```ignore
//! use docproxy::{prelude::*, memory::InMemoryClient};
//! use futures::TryStreamExt;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> DocResult<()> {
//!     let ctx = Context::new();
//!     let client = InMemoryClient::builder().build().await?;
//!
//!     client.create_db(&ctx, "users", &Options::new()).await?;
//!
//!     // Present the client through the driver contract of the current revision
//!     let driver = ProxyClient::new(client);
//!     let db = driver.db(&ctx, "users", &Options::new()).await?;
//!
//!     db.put(&ctx, "alice", &json!({"name": "Alice"}), &Options::new()).await?;
//!
//!     // Consume a driver cursor as a stream
//!     let rows: Vec<Row> = rows_stream(db.all_docs(&ctx, &Options::new()).await?)
//!         .try_collect()
//!         .await?;
//!
//!     println!("{} rows", rows.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Revisions
//!
//! ```ignore
//! use docproxy::prelude::*;
//!
//! let driver = ProxyClient::with_revision(client, Revision::V2);
//! let db = driver.db(&ctx, "users", &Options::new()).await?;
//!
//! // V2 carries no attachment cursor on fetched documents
//! assert!(db.get(&ctx, "alice", &Options::new()).await?.attachments.is_none());
//!
//! // Change feeds are not bridged by any revision
//! assert!(db.changes(&ctx, &Options::new()).await.is_err_and(|err| err.is_not_implemented()));
//! ```
//!
//! # Clients
//!
//! - [`memory`] - In-memory client for development and testing (requires `memory` feature)

pub mod prelude;

pub use docproxy_core::{Options, client, context, driver, error, revision, stream};

// Re-export JSON types for convenience
pub use serde_json;

/// The proxy driver.
pub mod adapter {
    pub use docproxy_adapter::{
        AttachmentsAdapter, ProxyClient, ProxyClientBuilder, ProxyDb, RowsAdapter, reshape,
    };
}

/// In-memory client implementation.
///
/// This module is only available when the `memory` feature is enabled.
#[cfg(feature = "memory")]
pub mod memory {
    pub use docproxy_memory::{
        InMemoryAttachments, InMemoryClient, InMemoryClientBuilder, InMemoryDatabase,
        InMemoryDocument, InMemoryRows, MapFn, collation, scripted,
    };
}
