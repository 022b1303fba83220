use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive io error at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

impl ArchiveError {
    pub(crate) fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        ArchiveError::Io { path: path.as_ref().to_path_buf(), source }
    }
}
