//! HTTP client for the blogging platform's web endpoints.
//!
//! These calls are collaborators of the handshake core: triggers that cause
//! emails to be sent, the status endpoint the build monitor polls, and a few
//! best-effort account actions.

use std::time::Duration;

use reqwest::header;
use tracing::{debug, info, warn};

use crate::config::PlatformConfig;
use crate::error::HandshakeError;
use crate::monitor::BuildStatusSample;
use crate::store::SessionCredential;

pub(crate) const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the platform web UI, optionally authenticated with a session
/// cookie.
pub struct PlatformClient {
    /// Follows redirects; used for triggers and status polls.
    http: reqwest::Client,
    /// Never follows redirects; used where a redirect is itself the signal.
    direct: reqwest::Client,
    base_url: String,
    cookie_name: String,
    credential: Option<SessionCredential>,
}

impl PlatformClient {
    pub fn new(config: &PlatformConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let direct = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            http,
            direct,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cookie_name: config.session_cookie_name.clone(),
            credential: None,
        })
    }

    /// Attaches the session credential used for authenticated calls.
    pub fn set_credential(&mut self, credential: SessionCredential) {
        self.credential = Some(credential);
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn cookie_header(&self) -> Option<String> {
        self.credential
            .as_ref()
            .map(|c| format!("{}={}", self.cookie_name, c.expose()))
    }

    fn with_session(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.cookie_header() {
            Some(cookie) => builder.header(header::COOKIE, cookie),
            None => builder,
        }
    }

    /// Requests a sign-in email for the account. This is the trigger of the
    /// sign-in handshake, so a failure is fatal.
    pub async fn request_signin_email(&self, account_email: &str) -> Result<(), HandshakeError> {
        info!("requesting sign-in email for {account_email}");

        let form = reqwest::multipart::Form::new().text("email", account_email.to_string());
        let response = self
            .http
            .post(self.url("/account/signin"))
            .header(header::ORIGIN, self.base_url.clone())
            .header(header::REFERER, self.url("/signin"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| HandshakeError::Trigger(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(HandshakeError::Trigger(format!(
                "sign-in request returned status {}",
                response.status()
            )))
        }
    }

    /// Triggers a theme export. This is the trigger of the export handshake,
    /// so a failure is fatal.
    pub async fn trigger_export(&self, site_id: &str) -> Result<(), HandshakeError> {
        info!("triggering theme export for site {site_id}");

        let response = self
            .with_session(self.http.get(self.url(&format!("/account/export/{site_id}/theme"))))
            .send()
            .await
            .map_err(|e| HandshakeError::Trigger(e.to_string()))?;

        if response.status().is_success() {
            info!("export triggered; the notification email typically takes 2-5 minutes");
            Ok(())
        } else {
            Err(HandshakeError::Trigger(format!(
                "export request returned status {}",
                response.status()
            )))
        }
    }

    /// Tests whether the session cookie is still accepted. Expiry is only
    /// detectable reactively, by the logs page redirecting to sign-in.
    pub async fn validate_session(&self) -> Result<bool, reqwest::Error> {
        let response = self
            .with_session(self.direct.get(self.url("/account/logs")))
            .send()
            .await?;

        let status = response.status();
        if status.is_redirection() {
            let location = response
                .headers()
                .get(header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("");
            if location.contains("signin") {
                warn!("session cookie is invalid or expired");
                return Ok(false);
            }
        }

        if status.is_success() {
            debug!("session cookie is valid");
            return Ok(true);
        }

        warn!("unexpected response while validating session: {status}");
        Ok(false)
    }

    /// Makes the given site the account's active one. Best effort: callers
    /// log failures and carry on, the credential is still usable.
    pub async fn switch_default_site(&self, site_id: &str) -> Result<(), reqwest::Error> {
        info!("switching active site to {site_id}");

        let response = self
            .with_session(self.http.post(self.url("/account/sites/make_default")))
            .header("X-Requested-With", "XMLHttpRequest")
            .form(&[("id", site_id)])
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            info!("switched active site to {site_id}");
        } else {
            warn!("site switch returned status {status}; the cookie may still work");
        }
        Ok(())
    }

    /// Reloads the theme templates from their source repository. The
    /// endpoint answers with a redirect when the reload is queued.
    pub async fn reload_theme(&self, theme_id: &str) -> Result<(), reqwest::Error> {
        info!("reloading theme {theme_id}");

        let response = self
            .with_session(self.direct.post(self.url("/account/themes/reload")))
            .header("X-Requested-With", "XMLHttpRequest")
            .header(
                header::REFERER,
                self.url(&format!("/account/themes/{theme_id}/info")),
            )
            .form(&[("theme_id", theme_id)])
            .send()
            .await?;

        let status = response.status();
        if status.is_redirection() {
            let location = response
                .headers()
                .get(header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("");
            info!("theme reload triggered (redirected to {location})");
        } else if status.is_success() || status == reqwest::StatusCode::NOT_FOUND {
            info!("theme reload triggered");
        } else {
            warn!("theme reload returned unexpected status {status}");
        }
        Ok(())
    }

    /// Kicks off a site rebuild by visiting the logs page.
    pub async fn trigger_rebuild(&self) -> Result<(), reqwest::Error> {
        info!("triggering site rebuild");

        let response = self
            .with_session(self.http.get(self.url("/account/logs")))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            info!("site rebuild triggered");
        } else {
            warn!("logs page returned status {status}");
        }
        Ok(())
    }

    /// Polls the check endpoint that drives the build forward and reports
    /// its progress.
    pub async fn check_build_status(&self) -> Result<BuildStatusSample, reqwest::Error> {
        let response = self
            .with_session(self.http.get(self.url("/posts/check")))
            .header(header::CACHE_CONTROL, "no-cache")
            .header(header::PRAGMA, "no-cache")
            .send()
            .await?
            .error_for_status()?;

        response.json::<BuildStatusSample>().await
    }
}
