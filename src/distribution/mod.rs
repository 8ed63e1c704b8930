//! Publishing certificate files to object storage.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use walkdir::WalkDir;

use crate::core::material::CertificateMaterial;

pub mod export;
mod memory;
mod s3;

pub use memory::MemoryObjectStore;
pub use s3::S3ObjectStore;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Uploads the file at `path` to `bucket/key`.
    async fn put_file(&self, bucket: &str, key: &str, path: &Path) -> Result<()>;
}

/// Lays the material out in a private scratch directory, uploads every file
/// of the `live/` tree under `<prefix>/`, and removes each local file as soon as its
/// upload succeeds. The first failed upload aborts the rest; the scratch
/// directory is removed on every exit path.
///
/// Returns the uploaded object keys in upload order.
pub async fn upload_to_s3(
    store: &dyn ObjectStore,
    bucket: &str,
    prefix: &str,
    lineage: &str,
    material: &CertificateMaterial,
    scratch_root: &Path,
) -> Result<Vec<String>> {
    info!("[s3] Uploading certificate files to {bucket}/{prefix}.");
    let scratch = tempfile::Builder::new()
        .prefix("cert-fleet-")
        .tempdir_in(scratch_root)
        .with_context(|| {
            format!(
                "failed to create scratch directory in {}",
                scratch_root.display()
            )
        })?;
    let live_dir = export::write_live_layout(scratch.path(), lineage, material)?;

    let mut uploaded = Vec::new();
    for local_path in collect_files(&live_dir)? {
        let relative = local_path
            .strip_prefix(&live_dir)
            .with_context(|| format!("{} escaped the live directory", local_path.display()))?;
        let key = object_key(prefix, relative);
        store
            .put_file(bucket, &key, &local_path)
            .await
            .with_context(|| format!("Failed to upload {key} to {bucket}"))?;
        std::fs::remove_file(&local_path)
            .with_context(|| format!("failed to delete {}", local_path.display()))?;
        debug!("[s3] uploaded {key}");
        uploaded.push(key);
    }

    info!("[s3] Finished uploading certificate files to {bucket}/{prefix}.");
    Ok(uploaded)
}

fn collect_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Object keys always use `/`, whatever the local separator.
fn object_key(prefix: &str, relative: &Path) -> String {
    let mut key = prefix.trim_matches('/').to_string();
    for component in relative.components() {
        if !key.is_empty() {
            key.push('/');
        }
        key.push_str(&component.as_os_str().to_string_lossy());
    }
    key
}
