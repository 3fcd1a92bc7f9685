//! Proxy driver for docproxy.
//!
//! This crate wraps any high-level [`Client`](docproxy_core::client::Client) and
//! presents it through the low-level driver contract, so a driver registry can use
//! an existing client as if it were a native driver.
//!
//! # Features
//!
//! - **Revision aware** - One adapter serves every contract revision; the selected
//!   [`Revision`](docproxy_core::revision::Revision) decides which operations are bridged
//! - **Cursor adaptation** - Pull-based row and attachment streams become push-style cursors
//! - **Faithful forwarding** - Contexts, arguments, options and errors pass through unchanged
//! - **Explicit gaps** - Unbridged operations return the `NOT_IMPLEMENTED` sentinel
//!
//! # Example
//!
//! ```ignore
//! use docproxy_adapter::ProxyClient;
//! use docproxy_core::{context::Context, driver::{DriverClient, Row}, error::DocError, Options};
//!
//! let driver = ProxyClient::new(client);
//! let ctx = Context::new();
//! let db = driver.db(&ctx, "users", &Options::new()).await?;
//! let mut rows = db.all_docs(&ctx, &Options::new()).await?;
//! let mut row = Row::default();
//!
//! while rows.next(&mut row).await.is_ok() {
//!     println!("{}", row.id);
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docproxy_adapter;

pub mod attachments;
pub mod client;
mod cursor;
pub mod db;
pub mod reshape;
pub mod rows;

pub use attachments::AttachmentsAdapter;
pub use client::{ProxyClient, ProxyClientBuilder};
pub use db::ProxyDb;
pub use rows::RowsAdapter;
