//! Default [`ArchiveSource`] that discovers organizations/users/servers by
//! walking the data root's directory layout. Deployments with a real
//! organization database supply their own `ArchiveSource` instead of this
//! one.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pritunl_archive::{ArchiveSource, OrgArchiveEntry, ServerArchiveEntry, UserArchiveEntry};
use pritunl_core::{OrgId, ServerId, UserId};

pub struct FsArchiveSource {
    data_root: PathBuf,
}

impl FsArchiveSource {
    pub fn new(data_root: impl AsRef<Path>) -> Self {
        Self { data_root: data_root.as_ref().to_path_buf() }
    }

    fn organizations_dir(&self) -> PathBuf {
        self.data_root.join("organizations")
    }

    fn servers_dir(&self) -> PathBuf {
        self.data_root.join("servers")
    }
}

fn subdirs(dir: &Path) -> Vec<(String, PathBuf)> {
    let Ok(entries) = std::fs::read_dir(dir) else { return Vec::new() };
    entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .filter_map(|e| e.file_name().into_string().ok().map(|name| (name, e.path())))
        .collect()
}

#[async_trait]
impl ArchiveSource for FsArchiveSource {
    async fn organizations(&self) -> Vec<OrgArchiveEntry> {
        subdirs(&self.organizations_dir())
            .into_iter()
            .map(|(org_name, org_dir)| {
                let users = subdirs(&org_dir.join("users"))
                    .into_iter()
                    .map(|(user_name, user_dir)| UserArchiveEntry {
                        user_id: UserId::new(user_name),
                        request_path: user_dir.join("user.req"),
                        key_path: user_dir.join("user.key"),
                        cert_path: user_dir.join("user.crt"),
                        doc_path: user_dir.join("user.json"),
                    })
                    .collect();

                OrgArchiveEntry {
                    org_id: OrgId::new(org_name),
                    doc_path: org_dir.join("org.json"),
                    ca_request_path: org_dir.join("ca.req"),
                    ca_key_path: org_dir.join("ca.key"),
                    ca_cert_path: org_dir.join("ca.crt"),
                    ca_doc_path: org_dir.join("ca.json"),
                    users,
                }
            })
            .collect()
    }

    async fn servers(&self) -> Vec<ServerArchiveEntry> {
        subdirs(&self.servers_dir())
            .into_iter()
            .map(|(server_name, server_dir)| ServerArchiveEntry {
                server_id: ServerId::new(server_name),
                dh_param_path: server_dir.join("dh_param"),
                ip_pool_path: server_dir.join("ip_pool"),
                doc_path: server_dir.join("server.json"),
            })
            .collect()
    }
}
