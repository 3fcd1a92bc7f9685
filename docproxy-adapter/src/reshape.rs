//! Field-for-field conversion between client records and driver records.
//!
//! Nothing here computes or defaults a value: every driver field is copied from the
//! matching client field. The only revision-dependent step is whether stats carry
//! the cluster sub-record.

use docproxy_core::{client, driver, revision::Capabilities};

pub fn version(version: client::Version) -> driver::Version {
    driver::Version {
        version: version.version,
        vendor: version.vendor,
        features: version.features,
        raw_response: version.raw_response,
    }
}

pub fn members(members: client::Members) -> driver::Members {
    driver::Members {
        names: members.names,
        roles: members.roles,
    }
}

pub fn security(security: client::Security) -> driver::Security {
    driver::Security {
        admins: members(security.admins),
        members: members(security.members),
    }
}

/// Converts a driver security object back into the client shape.
pub fn client_security(security: &driver::Security) -> client::Security {
    client::Security {
        admins: client::Members {
            names: security.admins.names.clone(),
            roles: security.admins.roles.clone(),
        },
        members: client::Members {
            names: security.members.names.clone(),
            roles: security.members.roles.clone(),
        },
    }
}

pub fn cluster(cluster: client::ClusterConfig) -> driver::ClusterStats {
    driver::ClusterStats {
        replicas: cluster.replicas,
        shards: cluster.shards,
        read_quorum: cluster.read_quorum,
        write_quorum: cluster.write_quorum,
    }
}

/// Converts stats, dropping the cluster record for revisions that do not carry it.
pub fn stats(stats: client::DbStats, capabilities: &Capabilities) -> driver::DbStats {
    driver::DbStats {
        name: stats.name,
        compact_running: stats.compact_running,
        doc_count: stats.doc_count,
        deleted_count: stats.deleted_count,
        update_seq: stats.update_seq,
        disk_size: stats.disk_size,
        active_size: stats.active_size,
        external_size: stats.external_size,
        cluster: if capabilities.cluster_stats {
            stats.cluster.map(cluster)
        } else {
            None
        },
        raw_response: stats.raw_response,
    }
}

pub fn attachment(meta: client::AttachmentMeta) -> driver::Attachment {
    driver::Attachment {
        filename: meta.filename,
        content_type: meta.content_type,
        size: meta.size,
        digest: meta.digest,
        revpos: meta.revpos,
        stub: meta.stub,
    }
}

pub fn upload(upload: driver::AttachmentUpload) -> client::AttachmentUpload {
    client::AttachmentUpload {
        filename: upload.filename,
        content_type: upload.content_type,
        content: upload.content,
    }
}

pub fn content(content: client::AttachmentContent) -> driver::AttachmentContent {
    driver::AttachmentContent {
        content_type: content.content_type,
        digest: content.digest,
        content: content.content,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docproxy_core::revision::Revision;
    use pretty_assertions::assert_eq;

    fn clustered_stats() -> client::DbStats {
        client::DbStats {
            name: "orders".into(),
            compact_running: true,
            doc_count: 42,
            deleted_count: 3,
            update_seq: "45-g1AAAA".into(),
            disk_size: 8192,
            active_size: 4096,
            external_size: 2048,
            cluster: Some(client::ClusterConfig {
                replicas: 3,
                shards: 8,
                read_quorum: 2,
                write_quorum: 2,
            }),
            raw_response: br#"{"db_name":"orders"}"#.to_vec(),
        }
    }

    #[test]
    fn stats_are_copied_field_for_field() {
        let converted = stats(clustered_stats(), &Revision::V3.capabilities());

        assert_eq!(
            converted,
            driver::DbStats {
                name: "orders".into(),
                compact_running: true,
                doc_count: 42,
                deleted_count: 3,
                update_seq: "45-g1AAAA".into(),
                disk_size: 8192,
                active_size: 4096,
                external_size: 2048,
                cluster: Some(driver::ClusterStats {
                    replicas: 3,
                    shards: 8,
                    read_quorum: 2,
                    write_quorum: 2,
                }),
                raw_response: br#"{"db_name":"orders"}"#.to_vec(),
            }
        );
    }

    #[test]
    fn absent_cluster_stays_absent() {
        let source = client::DbStats {
            cluster: None,
            ..clustered_stats()
        };

        assert_eq!(stats(source, &Revision::V2.capabilities()).cluster, None);
    }

    #[test]
    fn legacy_stats_drop_the_cluster_record() {
        let converted = stats(clustered_stats(), &Revision::Legacy.capabilities());

        assert_eq!(converted.cluster, None);
        assert_eq!(converted.doc_count, 42);
    }

    #[test]
    fn zero_valued_stats_stay_zero() {
        assert_eq!(
            stats(client::DbStats::default(), &Revision::V3.capabilities()),
            driver::DbStats::default()
        );
    }

    #[test]
    fn security_round_trips_through_both_shapes() {
        let source = client::Security {
            admins: client::Members {
                names: vec!["alice".into()],
                roles: vec!["_admin".into()],
            },
            members: client::Members {
                names: vec!["bob".into(), "carol".into()],
                roles: vec![],
            },
        };

        let converted = security(source.clone());

        assert_eq!(converted.admins.names, vec!["alice".to_string()]);
        assert_eq!(converted.admins.roles, vec!["_admin".to_string()]);
        assert_eq!(converted.members.names, vec!["bob".to_string(), "carol".to_string()]);
        assert!(converted.members.roles.is_empty());
        assert_eq!(client_security(&converted), source);
    }

    #[test]
    fn attachment_metadata_is_copied() {
        let meta = client::AttachmentMeta {
            filename: "logo.png".into(),
            content_type: "image/png".into(),
            size: 1024,
            digest: "md5-abc".into(),
            revpos: 2,
            stub: true,
        };

        assert_eq!(
            attachment(meta),
            driver::Attachment {
                filename: "logo.png".into(),
                content_type: "image/png".into(),
                size: 1024,
                digest: "md5-abc".into(),
                revpos: 2,
                stub: true,
            }
        );
    }
}
