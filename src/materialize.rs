//! Writing resolved assets into the export directory tree
//!
//! Each asset lands at
//! `<export_root>/attachments/<record_type>_<record_id>/<discriminator>_<filename>`.
//! The random discriminator keeps repeated filenames within one record from
//! colliding, so two attachments both named `photo.png` coexist.

use crate::error::{Error, Result};
use crate::types::{MaterializedPath, RecordId, ResolvedAsset};
use std::path::PathBuf;
use tokio::fs;
use tracing::debug;

/// Top-level directory inside the export root that holds all attachments
pub(crate) const ATTACHMENTS_DIR: &str = "attachments";

/// Writes resolved assets beneath an export root
pub(crate) struct Materializer {
    export_root: PathBuf,
}

impl Materializer {
    pub fn new(export_root: impl Into<PathBuf>) -> Self {
        Self {
            export_root: export_root.into(),
        }
    }

    /// Persist one asset and return where it landed
    ///
    /// Directory creation is idempotent; a filesystem failure is fatal to
    /// this reference only, never to the job.
    pub async fn persist(
        &self,
        record_type: &str,
        record_id: RecordId,
        asset: &ResolvedAsset,
    ) -> Result<MaterializedPath> {
        let record_dir = format!("{record_type}_{record_id}");
        let directory = self.export_root.join(ATTACHMENTS_DIR).join(&record_dir);
        fs::create_dir_all(&directory)
            .await
            .map_err(|source| Error::Filesystem {
                path: directory.clone(),
                source,
            })?;

        let file_name = format!("{:016x}_{}", rand::random::<u64>(), asset.filename);
        let path = directory.join(&file_name);
        fs::write(&path, &asset.bytes)
            .await
            .map_err(|source| Error::Filesystem {
                path: path.clone(),
                source,
            })?;

        debug!(
            path = %path.display(),
            bytes = asset.bytes.len(),
            "materialized attachment"
        );

        Ok(MaterializedPath {
            record_type: record_type.to_string(),
            record_id,
            relative_path: format!("{ATTACHMENTS_DIR}/{record_dir}/{file_name}"),
        })
    }
}
