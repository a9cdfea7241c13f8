//! Export archive handling: download, local content backup, extraction.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;

use crate::error::ArchiveError;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Directories an export archive can contribute to the workspace.
const FULL_EXTRACT_DIRS: &[&str] = &["content", "data", "layouts", "static"];
const CONTENT_EXTRACT_DIRS: &[&str] = &["content", "data"];

/// Downloads an export archive into `dest_dir` and returns the file path.
pub async fn download_archive(url: &str, dest_dir: &Path) -> Result<PathBuf, ArchiveError> {
    info!("downloading export archive");

    std::fs::create_dir_all(dest_dir)?;

    let filename = url
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .unwrap_or("export.zip");
    let output_path = dest_dir.join(filename);

    let client = reqwest::Client::builder()
        .timeout(DOWNLOAD_TIMEOUT)
        .build()
        .map_err(|e| ArchiveError::Download(e.to_string()))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| ArchiveError::Download(e.to_string()))?
        .error_for_status()
        .map_err(|e| ArchiveError::Download(e.to_string()))?;

    let mut file = tokio::fs::File::create(&output_path).await?;
    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| ArchiveError::Download(e.to_string()))?;
        downloaded += chunk.len() as u64;
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    info!(
        "export archive downloaded: {} ({:.2} MB)",
        output_path.display(),
        downloaded as f64 / 1024.0 / 1024.0
    );
    Ok(output_path)
}

/// Creates a timestamped zip backup of the workspace's `content/` directory
/// before it gets replaced. Returns `None` when there is nothing to back up.
pub fn backup_existing_content(
    root: &Path,
    backups_dir: &Path,
) -> Result<Option<PathBuf>, ArchiveError> {
    let content_dir = root.join("content");
    if !content_dir.exists() {
        debug!("no existing content directory to back up");
        return Ok(None);
    }

    std::fs::create_dir_all(backups_dir)?;

    let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let backup_path = backups_dir.join(format!("content-backup-{timestamp}.zip"));

    let file = File::create(&backup_path)?;
    let mut zip = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let mut file_count = 0;
    for entry in WalkDir::new(&content_dir) {
        let entry = entry.map_err(|e| ArchiveError::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| {
                ArchiveError::Io(io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
            })?
            .to_string_lossy()
            .into_owned();

        zip.start_file(name, options)?;
        let mut source = File::open(entry.path())?;
        io::copy(&mut source, &mut zip)?;
        file_count += 1;
    }
    zip.finish()?;

    info!(
        "content backup created: {} ({file_count} files)",
        backup_path.display()
    );
    Ok(Some(backup_path))
}

/// Extracts an export archive into the workspace, replacing the content
/// directories it carries. Returns the number of directories replaced.
///
/// Archives come in two layouts: the directories at the archive root, or
/// nested under a single theme directory.
pub fn extract_export(
    zip_path: &Path,
    root: &Path,
    backups_dir: &Path,
    extract_all: bool,
) -> Result<usize, ArchiveError> {
    let temp_dir = backups_dir.join("temp_extract");
    let result = extract_into(zip_path, root, &temp_dir, extract_all);

    if temp_dir.exists() {
        if let Err(e) = std::fs::remove_dir_all(&temp_dir) {
            warn!("failed to clean up {}: {e}", temp_dir.display());
        }
    }

    result
}

fn extract_into(
    zip_path: &Path,
    root: &Path,
    temp_dir: &Path,
    extract_all: bool,
) -> Result<usize, ArchiveError> {
    info!("extracting export archive {}", zip_path.display());

    if temp_dir.exists() {
        std::fs::remove_dir_all(temp_dir)?;
    }
    std::fs::create_dir_all(temp_dir)?;

    let file = File::open(zip_path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    archive.extract(temp_dir)?;

    let theme_dir = if temp_dir.join("content").exists() {
        debug!("archive layout: directories at root level");
        temp_dir.to_path_buf()
    } else {
        let subdir = std::fs::read_dir(temp_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .find(|path| path.is_dir())
            .ok_or_else(|| ArchiveError::InvalidLayout {
                path: zip_path.to_path_buf(),
                reason: "no theme directory found in archive".to_string(),
            })?;
        debug!("archive layout: nested under {}", subdir.display());
        subdir
    };

    let dirs = if extract_all {
        FULL_EXTRACT_DIRS
    } else {
        CONTENT_EXTRACT_DIRS
    };

    let mut extracted = 0;
    for name in dirs {
        let source = theme_dir.join(name);
        if !source.exists() {
            warn!("{name}/ not found in export archive");
            continue;
        }

        let dest = root.join(name);
        if dest.exists() {
            debug!("removing existing {name}/");
            std::fs::remove_dir_all(&dest)?;
        }

        copy_dir(&source, &dest)?;

        let file_count = WalkDir::new(&dest)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .count();
        info!("{name}/ extracted ({file_count} files)");
        extracted += 1;
    }

    info!("content extraction complete ({extracted} directories)");
    Ok(extracted)
}

fn copy_dir(source: &Path, dest: &Path) -> Result<(), ArchiveError> {
    for entry in WalkDir::new(source) {
        let entry = entry.map_err(|e| ArchiveError::Io(e.into()))?;
        let relative = entry.path().strip_prefix(source).map_err(|e| {
            ArchiveError::Io(io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
        })?;
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
