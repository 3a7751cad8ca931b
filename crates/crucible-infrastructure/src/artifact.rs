//! Session artifact persistence.
//!
//! Each finished session produces two artifacts named by session id: the
//! machine-readable report (`fsir_<id>.json`) and the rendered document
//! (`fsir_<id>.md`). Both are written atomically.

use crate::storage::AtomicFile;
use crucible_core::error::Result;
use crucible_core::report::CompositeReport;
use std::path::PathBuf;

/// Where a session's artifacts landed.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    /// The machine-readable report.
    pub report_path: PathBuf,
    /// The rendered document.
    pub document_path: PathBuf,
}

/// Writes session artifacts into an output directory.
pub struct ArtifactStore {
    output_dir: PathBuf,
}

impl ArtifactStore {
    /// Creates a store rooted at the given directory.
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    /// Persists the report JSON and the rendered document.
    pub fn save(&self, report: &CompositeReport, document: &[u8]) -> Result<ArtifactPaths> {
        let report_path = self
            .output_dir
            .join(format!("fsir_{}.json", report.session_id));
        let document_path = self
            .output_dir
            .join(format!("fsir_{}.md", report.session_id));

        let json = serde_json::to_string_pretty(report)?;
        AtomicFile::new(report_path.clone()).write_string(&json)?;
        AtomicFile::new(document_path.clone()).write_bytes(document)?;

        tracing::info!(
            "session artifacts written: {} / {}",
            report_path.display(),
            document_path.display()
        );

        Ok(ArtifactPaths {
            report_path,
            document_path,
        })
    }
}
