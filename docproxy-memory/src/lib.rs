//! In-memory document database client for docproxy.
//!
//! This crate provides a thread-safe, in-memory implementation of the
//! [`Client`](docproxy_core::client::Client) contract. It keeps databases in
//! async-aware read-write locks and is meant for development, testing and as the
//! reference client behind the proxy driver.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Revisioned documents** - Conflict detection, tombstones and attachment digests
//! - **Views** - Rust map functions with key collation and range queries
//! - **Fault injection** - Scripted row and attachment streams in [`scripted`]
//!
//! # Quick Start
//!
//! ```ignore
//! use docproxy_core::{client::{Client, ClientBuilder, Database}, context::Context, Options};
//! use docproxy_memory::InMemoryClient;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = InMemoryClient::builder().build().await?;
//!     let ctx = Context::new();
//!
//!     client.create_db(&ctx, "users", &Options::new()).await?;
//!     client
//!         .register_view("users", "app", "by_age", |doc| vec![(doc["age"].clone(), json!(null))])
//!         .await?;
//!
//!     let db = client.db(&ctx, "users", &Options::new()).await?;
//!     db.put(&ctx, "alice", &json!({"age": 30}), &Options::new()).await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docproxy_memory;

pub mod collation;
pub mod cursor;
pub mod scripted;
pub mod store;
mod view;

pub use cursor::{InMemoryAttachments, InMemoryDocument, InMemoryRows};
pub use store::{InMemoryClient, InMemoryClientBuilder, InMemoryDatabase};
pub use view::MapFn;
