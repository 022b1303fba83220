//! Produces a single uncompressed tar snapshot of the control-plane's
//! on-disk state. The archive is first materialized in a scratch file under
//! the data root, then read back into memory for the caller; the scratch
//! file is removed on every exit path via a drop guard.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::Local;
use pritunl_core::constants::{
    APP_NAME, AUTH_LOG_NAME, DATABASE_NAME, EMPTY_TEMP_DIR, NODE_SERVER_MARKER, SERVER_CERT_NAME, SERVER_KEY_NAME, TEMP_DIR, VERSION_NAME,
};
use std::sync::Arc;
use tracing::warn;

use crate::error::ArchiveError;
use crate::source::ArchiveSource;

pub struct ArchiveExporter {
    data_root: PathBuf,
    source: Arc<dyn ArchiveSource>,
}

struct ScratchGuard(PathBuf);

impl Drop for ScratchGuard {
    fn drop(&mut self) {
        if self.0.exists() {
            if let Err(err) = fs::remove_file(&self.0) {
                warn!(path = %self.0.display(), error = %err, "failed to remove archive scratch file");
            }
        }
    }
}

impl ArchiveExporter {
    pub fn new(data_root: impl AsRef<Path>, source: Arc<dyn ArchiveSource>) -> Self {
        Self { data_root: data_root.as_ref().to_path_buf(), source }
    }

    /// Returns `(filename, bytes)`. `filename` is `{APP_NAME}_{YYYY_MM_DD_HH_MM_SS}.tar`
    /// built from local time.
    pub async fn export(&self) -> Result<(String, Vec<u8>), ArchiveError> {
        let filename = format!("{APP_NAME}_{}.tar", Local::now().format("%Y_%m_%d_%H_%M_%S"));

        let temp_dir = self.data_root.join(TEMP_DIR);
        fs::create_dir_all(&temp_dir).map_err(|e| ArchiveError::io(&temp_dir, e))?;
        let empty_dir = temp_dir.join(EMPTY_TEMP_DIR);
        fs::create_dir_all(&empty_dir).map_err(|e| ArchiveError::io(&empty_dir, e))?;

        let scratch_path = temp_dir.join(format!(".{filename}.scratch"));
        let _guard = ScratchGuard(scratch_path.clone());

        {
            let file = File::create(&scratch_path).map_err(|e| ArchiveError::io(&scratch_path, e))?;
            let mut builder = tar::Builder::new(file);

            add_if_present(&mut builder, &self.data_root, &self.data_root.join(AUTH_LOG_NAME))?;
            add_if_present(&mut builder, &self.data_root, &self.data_root.join(DATABASE_NAME))?;
            add_if_present(&mut builder, &self.data_root, &self.data_root.join(SERVER_CERT_NAME))?;
            add_if_present(&mut builder, &self.data_root, &self.data_root.join(SERVER_KEY_NAME))?;
            add_if_present(&mut builder, &self.data_root, &self.data_root.join(VERSION_NAME))?;

            for org in self.source.organizations().await {
                add_if_present(&mut builder, &self.data_root, &org.doc_path)?;
                add_if_present(&mut builder, &self.data_root, &org.ca_request_path)?;
                add_if_present(&mut builder, &self.data_root, &org.ca_key_path)?;
                add_if_present(&mut builder, &self.data_root, &org.ca_cert_path)?;
                add_if_present(&mut builder, &self.data_root, &org.ca_doc_path)?;

                for user in &org.users {
                    add_if_present(&mut builder, &self.data_root, &user.request_path)?;
                    add_if_present(&mut builder, &self.data_root, &user.key_path)?;
                    add_if_present(&mut builder, &self.data_root, &user.cert_path)?;
                    add_if_present(&mut builder, &self.data_root, &user.doc_path)?;
                }

                let org_dir = org.doc_path.parent().unwrap_or(&self.data_root);
                add_placeholder_temp_dir(&mut builder, &self.data_root, org_dir, &empty_dir)?;
            }

            for server in self.source.servers().await {
                add_if_present(&mut builder, &self.data_root, &server.dh_param_path)?;
                add_if_present(&mut builder, &self.data_root, &server.ip_pool_path)?;
                add_if_present(&mut builder, &self.data_root, &server.doc_path)?;

                let server_dir = server.doc_path.parent().unwrap_or(&self.data_root);
                add_if_present(&mut builder, &self.data_root, &server_dir.join(NODE_SERVER_MARKER))?;
                add_placeholder_temp_dir(&mut builder, &self.data_root, server_dir, &empty_dir)?;
            }

            builder.finish().map_err(|e| ArchiveError::io(&scratch_path, e))?;
        }

        let bytes = fs::read(&scratch_path).map_err(|e| ArchiveError::io(&scratch_path, e))?;
        Ok((filename, bytes))
    }
}

fn relative_arcname(data_root: &Path, abs_path: &Path) -> String {
    abs_path
        .strip_prefix(data_root)
        .unwrap_or(abs_path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn add_if_present(builder: &mut tar::Builder<File>, data_root: &Path, abs_path: &Path) -> Result<(), ArchiveError> {
    if !abs_path.exists() {
        return Ok(());
    }
    let arcname = relative_arcname(data_root, abs_path);
    builder.append_path_with_name(abs_path, arcname).map_err(|e| ArchiveError::io(abs_path, e))
}

/// Every organization/server directory gets a `temp/` placeholder even
/// though nothing on disk lives there; `empty_dir` (itself empty) supplies
/// the directory entry's metadata.
fn add_placeholder_temp_dir(builder: &mut tar::Builder<File>, data_root: &Path, owner_dir: &Path, empty_dir: &Path) -> Result<(), ArchiveError> {
    let arcname = format!("{}/{}", relative_arcname(data_root, owner_dir), TEMP_DIR);
    builder.append_dir(arcname, empty_dir).map_err(|e| ArchiveError::io(empty_dir, e))
}
