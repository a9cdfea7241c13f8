//! Backup operation: export the site's theme and content, download the
//! archive, and replace the local working copy (after backing it up).

use std::path::{Path, PathBuf};

use tracing::info;

use crate::archive::{backup_existing_content, download_archive, extract_export};
use crate::config::Config;
use crate::correlate;
use crate::error::Result;
use crate::extract::TokenExtractor;
use crate::handshake::perform_handshake;
use crate::mailbox::{ImapMailbox, MatchCriteria, PollOptions};

const EXPORT_SUBJECT: &str = "Export ready";
const BACKUPS_DIR: &str = "backups";

#[derive(Debug, Clone, Default)]
pub struct BackupOptions {
    /// Stop after downloading the archive.
    pub export_only: bool,

    /// Skip the export entirely and extract this archive instead.
    pub extract_only: Option<PathBuf>,

    /// Also replace layouts/ and static/, not just content/ and data/.
    pub extract_all: bool,

    /// Do not snapshot the current content/ before replacing it.
    pub no_backup: bool,

    pub max_retries: Option<u32>,
    pub retry_interval: Option<u64>,
    pub session_cookie: Option<String>,
}

pub async fn run(config: &Config, options: &BackupOptions) -> Result<()> {
    let root = std::env::current_dir()?;
    let backups_dir = root.join(BACKUPS_DIR);

    if let Some(zip_path) = &options.extract_only {
        extract_local(&root, &backups_dir, zip_path, options)?;
        return Ok(());
    }

    let platform =
        super::authenticated_platform(config, options.session_cookie.as_deref()).await?;
    let connector = ImapMailbox::new(config.mailbox.clone());

    let poll = super::apply_poll_overrides(
        PollOptions::export(),
        options.max_retries,
        options.retry_interval,
    );
    let criteria = MatchCriteria::new(&config.platform.notification_sender, EXPORT_SUBJECT);
    let extractor = TokenExtractor::export_download()?;

    // For exports the extracted token IS the deliverable: a pre-signed
    // download URL, no cookie exchange involved.
    let token = perform_handshake(
        &connector,
        || platform.trigger_export(&config.platform.site_id),
        &poll,
        &criteria,
        correlate::export_skew(),
        &extractor,
    )
    .await?;

    let download_url = token.into_url();
    let zip_path = download_archive(&download_url, &backups_dir).await?;

    if options.export_only {
        info!("export downloaded to {}", zip_path.display());
        return Ok(());
    }

    extract_local(&root, &backups_dir, &zip_path, options)?;
    info!("backup complete");
    Ok(())
}

fn extract_local(
    root: &Path,
    backups_dir: &Path,
    zip_path: &Path,
    options: &BackupOptions,
) -> Result<()> {
    if options.no_backup {
        info!("skipping content backup (--no-backup)");
    } else if let Some(backup) = backup_existing_content(root, backups_dir)? {
        info!("previous content saved to {}", backup.display());
    }

    extract_export(zip_path, root, backups_dir, options.extract_all)?;
    Ok(())
}
