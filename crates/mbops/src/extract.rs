//! Token extraction from notification email bodies.
//!
//! Extraction is an ordered list of strategies, each a pure
//! `&str -> Option<String>` over the message HTML. The precise pattern match
//! is tried first; the generic anchor scan exists because the email
//! renderer's output is not a stable contract.

use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

/// URL shape of export archive links in "Export ready" notifications.
const ARCHIVE_URL_PATTERN: &str = r#"https://s3\.amazonaws\.com/micro\.blog/archives/[^"\s]+\.zip"#;

/// A token pulled out of a message body: either a full magic link (sign-in)
/// or a bare download URL (export).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedToken(String);

impl ExtractedToken {
    pub fn url(&self) -> &str {
        &self.0
    }

    pub fn into_url(self) -> String {
        self.0
    }
}

/// One extraction strategy over message HTML.
pub trait LinkStrategy: Send + Sync {
    fn extract(&self, html: &str) -> Option<String>;
}

/// Ordered list of extraction strategies, tried first to last.
pub struct TokenExtractor {
    strategies: Vec<Box<dyn LinkStrategy>>,
}

impl TokenExtractor {
    /// Extractor for sign-in magic links: exact URL pattern first, generic
    /// anchor scan as fallback.
    pub fn signin(base_url: &str) -> Result<Self, regex::Error> {
        let base_url = base_url.trim_end_matches('/');
        let host = base_url
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .to_string();

        Ok(Self {
            strategies: vec![
                Box::new(SigninLinkPattern::new(base_url)?),
                Box::new(AnchorScan::new(vec![
                    host,
                    "signin".to_string(),
                    "auth=".to_string(),
                ])),
            ],
        })
    }

    /// Extractor for export download URLs.
    pub fn export_download() -> Result<Self, regex::Error> {
        Ok(Self {
            strategies: vec![Box::new(ArchiveLinkPattern::new()?)],
        })
    }

    /// Runs the strategies in order; the first hit wins.
    pub fn extract(&self, html: &str) -> Option<ExtractedToken> {
        self.strategies
            .iter()
            .enumerate()
            .find_map(|(tier, strategy)| {
                let link = strategy.extract(html)?;
                debug!("link extracted by strategy {}", tier + 1);
                Some(link)
            })
            .map(ExtractedToken)
    }
}

/// Exact pattern match for the sign-in magic link.
///
/// The body is often quoted-printable encoded, so the `=` in `auth=` shows
/// up as `=3D`; the decoded URL is reconstructed from the captured token.
struct SigninLinkPattern {
    regex: Regex,
    base_url: String,
}

impl SigninLinkPattern {
    fn new(base_url: &str) -> Result<Self, regex::Error> {
        let pattern = format!(
            r"{}/account/signin\?auth=(?:3D)?([A-F0-9]+)",
            regex::escape(base_url)
        );
        Ok(Self {
            regex: Regex::new(&pattern)?,
            base_url: base_url.to_string(),
        })
    }
}

impl LinkStrategy for SigninLinkPattern {
    fn extract(&self, html: &str) -> Option<String> {
        let caps = self.regex.captures(html)?;
        Some(format!(
            "{}/account/signin?auth={}",
            self.base_url,
            &caps[1]
        ))
    }
}

/// Exact pattern match for the export archive URL.
struct ArchiveLinkPattern {
    regex: Regex,
}

impl ArchiveLinkPattern {
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(ARCHIVE_URL_PATTERN)?,
        })
    }
}

impl LinkStrategy for ArchiveLinkPattern {
    fn extract(&self, html: &str) -> Option<String> {
        self.regex.find(html).map(|m| m.as_str().to_string())
    }
}

/// Generic fallback: scan anchor tags and keep the first href containing all
/// relevance markers.
struct AnchorScan {
    markers: Vec<String>,
}

impl AnchorScan {
    fn new(markers: Vec<String>) -> Self {
        Self { markers }
    }
}

impl LinkStrategy for AnchorScan {
    fn extract(&self, html: &str) -> Option<String> {
        let document = Html::parse_document(html);
        let anchors = Selector::parse("a").ok()?;

        document
            .select(&anchors)
            .filter_map(|el| el.value().attr("href"))
            .find(|href| self.markers.iter().all(|m| href.contains(m.as_str())))
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://micro.blog";

    #[test]
    fn tier1_decodes_quoted_printable_signin_link() {
        let extractor = TokenExtractor::signin(BASE).unwrap();
        let html = "<p>Click https://micro.blog/account/signin?auth=3DABCD1234 to sign in</p>";

        let token = extractor.extract(html).unwrap();
        assert_eq!(
            token.url(),
            "https://micro.blog/account/signin?auth=ABCD1234"
        );
    }

    #[test]
    fn tier1_handles_unencoded_signin_link() {
        let extractor = TokenExtractor::signin(BASE).unwrap();
        let html = "visit https://micro.blog/account/signin?auth=DEADBEEF now";

        let token = extractor.extract(html).unwrap();
        assert_eq!(
            token.url(),
            "https://micro.blog/account/signin?auth=DEADBEEF"
        );
    }

    #[test]
    fn tier2_falls_back_to_anchor_scan() {
        let extractor = TokenExtractor::signin(BASE).unwrap();
        // No /account/ path, so the tier-1 pattern misses.
        let html = r#"<html><body>
            <a href="https://micro.blog/unsubscribe">unsubscribe</a>
            <a href="https://micro.blog/signin?auth=XYZ">Sign in</a>
        </body></html>"#;

        let token = extractor.extract(html).unwrap();
        assert_eq!(token.url(), "https://micro.blog/signin?auth=XYZ");
    }

    #[test]
    fn no_match_in_either_tier_returns_none() {
        let extractor = TokenExtractor::signin(BASE).unwrap();
        let html = r#"<html><body><a href="https://example.com/">hi</a></body></html>"#;
        assert!(extractor.extract(html).is_none());
    }

    #[test]
    fn export_extractor_finds_archive_url() {
        let extractor = TokenExtractor::export_download().unwrap();
        let html = r#"<a href="https://s3.amazonaws.com/micro.blog/archives/2026/08/theme_abc123.zip">Download</a>"#;

        let token = extractor.extract(html).unwrap();
        assert_eq!(
            token.url(),
            "https://s3.amazonaws.com/micro.blog/archives/2026/08/theme_abc123.zip"
        );
    }

    #[test]
    fn export_extractor_ignores_other_links() {
        let extractor = TokenExtractor::export_download().unwrap();
        let html = r#"<a href="https://micro.blog/account/logs">logs</a>"#;
        assert!(extractor.extract(html).is_none());
    }
}
