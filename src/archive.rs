//! Deterministic packaging of a completed export tree
//!
//! The tree is the only copy of resolved assets until the archive exists, so
//! the contract is strict: the tree is deleted only after the archive is
//! fully written, and any packaging failure leaves it intact.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tokio::task::spawn_blocking;
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::write::FileOptions;

/// Package the tree at `root` into `<root>.zip`, then delete the tree
///
/// Entries are written in lexicographic entry-name order with forward-slash
/// names and fixed timestamps, so identical trees produce byte-identical
/// archives on any platform. Returns the archive path on success. On failure
/// the tree is left fully intact for retry or inspection and any partial
/// archive is removed best-effort.
pub async fn pack_tree(root: impl Into<PathBuf>) -> Result<PathBuf> {
    let root = root.into();
    let archive_path = archive_path_for(&root);

    // Compression and the tree walk are blocking work
    let root_task = root.clone();
    let archive_task = archive_path.clone();
    let outcome = spawn_blocking(move || write_archive(&root_task, &archive_task))
        .await
        .map_err(|e| Error::ArchiveWrite {
            path: archive_path.clone(),
            reason: format!("packaging task panicked: {e}"),
        })?;

    if let Err(error) = outcome {
        let _ = tokio::fs::remove_file(&archive_path).await;
        return Err(error);
    }

    // The archive is complete; the tree is no longer the only copy
    tokio::fs::remove_dir_all(&root)
        .await
        .map_err(|e| Error::ArchiveWrite {
            path: archive_path.clone(),
            reason: format!("archive written but tree removal failed: {e}"),
        })?;

    info!(archive = %archive_path.display(), "export tree packaged");
    Ok(archive_path)
}

/// `<root>.zip`, appended so a dotted root name keeps its full stem
fn archive_path_for(root: &Path) -> PathBuf {
    let mut name = root.as_os_str().to_os_string();
    name.push(".zip");
    PathBuf::from(name)
}

/// Enumerate, sort, and write every file under `root` into the archive
fn write_archive(root: &Path, archive_path: &Path) -> Result<()> {
    let entries = sorted_entries(root, archive_path)?;

    let file = File::create(archive_path)
        .map_err(|e| archive_error(archive_path, format!("cannot create archive: {e}")))?;
    let mut writer = zip::ZipWriter::new(file);
    // Fixed timestamp (the zip epoch) keeps repeated packs byte-identical;
    // the default stamps entries with the current time
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());

    let mut buffer = [0u8; 8192];
    for (name, path) in entries {
        writer
            .start_file(name.as_str(), options)
            .map_err(|e| archive_error(archive_path, format!("cannot start entry {name}: {e}")))?;

        let mut reader = File::open(&path).map_err(|e| {
            archive_error(archive_path, format!("cannot open {}: {e}", path.display()))
        })?;
        loop {
            let read = reader.read(&mut buffer).map_err(|e| {
                archive_error(archive_path, format!("cannot read {}: {e}", path.display()))
            })?;
            if read == 0 {
                break;
            }
            writer.write_all(&buffer[..read]).map_err(|e| {
                archive_error(archive_path, format!("cannot write entry {name}: {e}"))
            })?;
        }
        debug!(entry = %name, "archive entry written");
    }

    writer
        .finish()
        .map_err(|e| archive_error(archive_path, format!("cannot finalize archive: {e}")))?;
    Ok(())
}

/// All files under `root` as (entry name, path), sorted by entry name
///
/// Sorting happens on the final entry names rather than walk order, so the
/// result is stable across filesystems and platforms.
fn sorted_entries(root: &Path, archive_path: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry
            .map_err(|e| archive_error(archive_path, format!("cannot walk export tree: {e}")))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry_name(root, entry.path());
        entries.push((name, entry.into_path()));
    }
    entries.sort();
    Ok(entries)
}

/// Tree-relative entry name with forward slashes
///
/// Undecodable path bytes are replaced rather than failing the pack.
fn entry_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn archive_error(path: &Path, reason: String) -> Error {
    Error::ArchiveWrite {
        path: path.to_path_buf(),
        reason,
    }
}
