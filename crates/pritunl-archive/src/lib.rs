//! Tar export of the control-plane's on-disk state at an instant.

pub mod error;
pub mod exporter;
pub mod source;

pub use error::ArchiveError;
pub use exporter::ArchiveExporter;
pub use source::{ArchiveSource, OrgArchiveEntry, ServerArchiveEntry, UserArchiveEntry};
