//! Parsing fetched messages into correlation candidates.

use chrono::{DateTime, Utc};
use mail_parser::MessageParser;

use crate::error::AttemptError;

/// One fetched email considered for matching.
#[derive(Debug)]
pub struct CandidateMessage {
    /// Declared send time, parsed from the Date header. `None` when the
    /// header is missing or unparseable; that must not disqualify the
    /// message.
    pub date: Option<DateTime<Utc>>,

    pub subject: Option<String>,

    /// The HTML body part, when the message has one.
    pub html: Option<String>,
}

impl CandidateMessage {
    /// Parses a raw RFC 822 message.
    pub fn parse(raw: &[u8]) -> Result<Self, AttemptError> {
        let message = MessageParser::default()
            .parse(raw)
            .ok_or_else(|| AttemptError::Decode("unparseable message".to_string()))?;

        let date = message
            .date()
            .and_then(|d| DateTime::<Utc>::from_timestamp(d.to_timestamp(), 0));
        let subject = message.subject().map(str::to_string);
        let html = message.body_html(0).map(|body| body.into_owned());

        Ok(Self {
            date,
            subject,
            html,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_message(date_header: &str, body: &str) -> Vec<u8> {
        format!(
            "From: help@micro.blog\r\n\
             To: inbox@example.com\r\n\
             Subject: Micro.blog sign-in\r\n\
             {date_header}\
             Content-Type: text/html; charset=utf-8\r\n\
             \r\n\
             {body}"
        )
        .into_bytes()
    }

    #[test]
    fn parses_date_subject_and_html() {
        let raw = raw_message(
            "Date: Tue, 18 Aug 2026 10:30:00 +0000\r\n",
            "<html><body>hello</body></html>",
        );
        let candidate = CandidateMessage::parse(&raw).unwrap();

        assert!(candidate.date.is_some());
        assert_eq!(candidate.subject.as_deref(), Some("Micro.blog sign-in"));
        assert!(candidate.html.unwrap().contains("hello"));
    }

    #[test]
    fn missing_date_header_yields_none() {
        let raw = raw_message("", "<p>no date</p>");
        let candidate = CandidateMessage::parse(&raw).unwrap();
        assert!(candidate.date.is_none());
    }
}
