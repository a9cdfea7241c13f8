//! Deploy operation: validate the session, trigger theme reload and site
//! rebuild, and optionally watch the rebuild to completion.

use std::time::Duration;

use tracing::{info, warn};

use crate::config::Config;
use crate::error::{MbopsError, Result};
use crate::monitor::monitor_build;

#[derive(Debug, Clone)]
pub struct DeployOptions {
    pub reload: bool,
    pub rebuild: bool,
    pub monitor: bool,

    /// Only check the session cookie, do nothing else.
    pub validate_only: bool,

    /// Wall-clock budget for the build monitor.
    pub timeout: Duration,

    /// Delay between build status polls.
    pub poll_interval: Duration,

    pub session_cookie: Option<String>,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            reload: false,
            rebuild: false,
            monitor: false,
            validate_only: false,
            timeout: Duration::from_secs(300),
            poll_interval: Duration::from_secs(5),
            session_cookie: None,
        }
    }
}

pub async fn run(config: &Config, options: &DeployOptions) -> Result<()> {
    let platform =
        super::authenticated_platform(config, options.session_cookie.as_deref()).await?;

    if options.validate_only {
        info!("session cookie is valid; nothing else requested");
        return Ok(());
    }

    // Reload and rebuild are fire-and-forget on the platform side; a failed
    // trigger is reported but does not abort the remaining steps.
    if options.reload {
        if let Err(e) = platform.reload_theme(&config.platform.theme_id).await {
            warn!("theme reload request failed: {e}");
        }
    }

    if options.rebuild {
        if let Err(e) = platform.trigger_rebuild().await {
            warn!("rebuild trigger failed: {e}");
        }
    }

    if options.monitor {
        if !monitor_build(&platform, options.timeout, options.poll_interval).await {
            return Err(MbopsError::BuildTimeout);
        }
    }

    info!("deploy steps complete");
    Ok(())
}
