//! Download of the export artifact and extraction into the staging root.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tokio::task::spawn_blocking;
use tracing::{debug, info, warn};

use crate::error::PipelineError;
use crate::export::ExportService;
use crate::pipeline::ExportJob;

/// Replaces the staging tree with the contents of a job's artifact.
pub struct ArchiveRetriever {
    staging_root: PathBuf,
}

impl ArchiveRetriever {
    pub fn new(staging_root: impl Into<PathBuf>) -> Self {
        Self {
            staging_root: staging_root.into(),
        }
    }

    /// Download `artifact` for `job`, clear the staging root, then extract.
    ///
    /// Returns only once extraction has finished, with the number of files
    /// written. The staging root is left untouched if the download fails or
    /// the archive cannot be opened.
    pub async fn retrieve<S: ExportService>(
        &self,
        service: &S,
        job: &ExportJob,
        artifact: &str,
    ) -> Result<usize, PipelineError> {
        let download = tempfile::Builder::new()
            .prefix("docpress-")
            .suffix(".zip")
            .tempfile()?;

        let mut sink = tokio::fs::File::from_std(download.reopen()?);
        let bytes = service
            .download_artifact(&job.id, artifact, &mut sink)
            .await?;
        sink.flush().await?;
        drop(sink);
        info!(job_id = %job.id, %artifact, bytes, "artifact downloaded");

        let dest = self.staging_root.clone();
        let name = artifact.to_string();
        let extracted = spawn_blocking(move || {
            let archive = open_zip(download.path(), &name)?;
            clear_dir(&dest)?;
            extract_entries(archive, &dest, &name)
        })
        .await??;

        info!(
            staging_root = %self.staging_root.display(),
            extracted,
            "artifact extracted"
        );
        Ok(extracted)
    }
}

/// Remove everything under `dir` and recreate it empty.
pub fn clear_dir(dir: &Path) -> Result<(), PipelineError> {
    let staging = |source| PipelineError::Staging {
        path: dir.to_path_buf(),
        source,
    };
    match std::fs::remove_dir_all(dir) {
        Ok(()) => debug!(path = %dir.display(), "cleared staging root"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(staging(e)),
    }
    std::fs::create_dir_all(dir).map_err(staging)
}

fn corrupt(name: &str, reason: String) -> PipelineError {
    PipelineError::Archive {
        archive: name.to_string(),
        reason,
    }
}

fn staging_io(path: &Path, source: io::Error) -> PipelineError {
    PipelineError::Staging {
        path: path.to_path_buf(),
        source,
    }
}

/// Open and validate the zip at `archive_path` without touching the staging root.
pub fn open_zip(archive_path: &Path, name: &str) -> Result<zip::ZipArchive<File>, PipelineError> {
    let file = File::open(archive_path).map_err(|e| staging_io(archive_path, e))?;
    zip::ZipArchive::new(file).map_err(|e| corrupt(name, format!("failed to read ZIP archive: {e}")))
}

/// Extract every entry of `archive` below `dest`; returns the number of files.
///
/// Entries whose names would escape `dest` are skipped.
pub fn extract_entries(
    mut archive: zip::ZipArchive<File>,
    dest: &Path,
    name: &str,
) -> Result<usize, PipelineError> {
    let mut extracted = 0;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| corrupt(name, format!("failed to read ZIP entry {i}: {e}")))?;

        let Some(out_path) = entry.enclosed_name().map(|p| dest.join(p)) else {
            warn!(entry = entry.name(), "skipping entry with unsafe path");
            continue;
        };

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|e| staging_io(&out_path, e))?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| staging_io(parent, e))?;
        }
        let mut outfile = File::create(&out_path).map_err(|e| staging_io(&out_path, e))?;
        io::copy(&mut entry, &mut outfile)
            .map_err(|e| corrupt(name, format!("failed to extract {}: {e}", entry.name())))?;
        extracted += 1;
    }

    Ok(extracted)
}
