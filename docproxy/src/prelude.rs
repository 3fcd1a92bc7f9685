//! Convenient re-exports of commonly used types from docproxy.
//!
//! Import this prelude module to quickly access the most frequently used types
//! and traits without needing to import from multiple sub-modules:
//!
//! ```ignore
//! use docproxy::prelude::*;
//! ```
//!
//! This provides access to:
//! - Client and driver contract traits
//! - The proxy driver and its builder
//! - Revisions, contexts and options
//! - Error types and the not-implemented sentinel

pub use docproxy_core::{
    Options,
    client::{AttachmentStream, Client, ClientBuilder, Database, ResultDocument, ResultRows},
    context::Context,
    driver::{
        Attachment, Authenticator, Document, DriverAttachments, DriverChanges, DriverClient,
        DriverClientBuilder, DriverDb, DriverRows, OptionlessDb, Row,
    },
    error::{DocError, DocResult, NOT_IMPLEMENTED, Status},
    revision::{Capabilities, Revision},
    stream::{attachments_stream, rows_stream},
};

pub use docproxy_adapter::{ProxyClient, ProxyClientBuilder, ProxyDb};
