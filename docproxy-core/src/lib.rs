//! Shared vocabulary for exposing a high-level document database client through a
//! low-level, cursor-based driver contract.
//!
//! This crate is the core of the docproxy project and provides:
//!
//! - **Client contract** ([`client`]) - The ergonomic, whole-result client being wrapped
//! - **Driver contract** ([`driver`]) - The streaming, cursor-based contract being implemented
//! - **Contract revisions** ([`revision`]) - Capability tables for each driver revision
//! - **Request context** ([`context`]) - Deadlines, request ids and cancellation
//! - **Error handling** ([`error`]) - The shared error type and the not-implemented sentinel
//! - **Cursor streams** ([`stream`]) - `futures::Stream` views over driver cursors
//!
//! # Example
//!
//! ```ignore
//! use docproxy_core::{context::Context, driver::DriverClient, Options};
//!
//! let ctx = Context::new();
//! let databases = driver.all_dbs(&ctx, &Options::new()).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docproxy_core;

pub mod client;
pub mod context;
pub mod driver;
pub mod error;
pub mod revision;
pub mod stream;

/// Caller-supplied query and request options, forwarded untouched.
pub type Options = serde_json::Map<String, serde_json::Value>;
