//! Revisions of the driver contract and the capability table of each.
//!
//! The driver contract evolved through three revisions that perform the same role
//! but differ in method arity, record shapes and which operations exist. Instead of
//! one adapter per revision, adapters carry a [`Revision`] and branch on its
//! [`Capabilities`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// A revision of the driver contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Revision {
    /// The first contract. Every write exists in an options-less and an
    /// options-accepting form, and attachment transfer is not exposed.
    Legacy,
    /// Options-only methods, attachment transfer and clustered stats.
    V2,
    /// Like [`Revision::V2`], and document reads expose an attachment cursor.
    #[default]
    V3,
}

/// What a contract revision supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Writes have an options-less overload next to the options-accepting one.
    pub optionless_overloads: bool,
    /// Attachments can be uploaded and downloaded by filename.
    pub attachment_transfer: bool,
    /// Stats records carry the cluster sub-record.
    pub cluster_stats: bool,
    /// Document reads carry an attachment metadata cursor.
    pub document_attachments: bool,
}

impl Revision {
    /// Every known revision, oldest first.
    pub const ALL: [Revision; 3] = [Revision::Legacy, Revision::V2, Revision::V3];

    pub const fn capabilities(self) -> Capabilities {
        match self {
            Revision::Legacy => Capabilities {
                optionless_overloads: true,
                attachment_transfer: false,
                cluster_stats: false,
                document_attachments: false,
            },
            Revision::V2 => Capabilities {
                optionless_overloads: false,
                attachment_transfer: true,
                cluster_stats: true,
                document_attachments: false,
            },
            Revision::V3 => Capabilities {
                optionless_overloads: false,
                attachment_transfer: true,
                cluster_stats: true,
                document_attachments: true,
            },
        }
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Revision::Legacy => f.write_str("legacy"),
            Revision::V2 => f.write_str("v2"),
            Revision::V3 => f.write_str("v3"),
        }
    }
}
