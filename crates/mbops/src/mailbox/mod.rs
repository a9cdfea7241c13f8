//! Remote mailbox access and the inbox poll loop.

pub mod client;
pub mod message;
pub mod poller;

use async_trait::async_trait;

use crate::error::{AttemptError, HandshakeError};

pub use client::ImapMailbox;
pub use message::CandidateMessage;
pub use poller::{poll_for_token, PollOptions};

/// Sender + subject-substring filter used for the mailbox search.
#[derive(Debug, Clone)]
pub struct MatchCriteria {
    pub from: String,
    pub subject: String,
}

impl MatchCriteria {
    pub fn new(from: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            subject: subject.into(),
        }
    }

    /// Renders the criteria as an IMAP SEARCH query. A SINCE filter is
    /// deliberately not used here; server-side date filtering is unreliable
    /// across timezones, so recency is checked per message instead.
    pub fn imap_query(&self) -> String {
        format!(r#"(FROM "{}" SUBJECT "{}")"#, self.from, self.subject)
    }
}

/// One open, authenticated mailbox connection.
///
/// Owned exclusively by the poll loop that holds it; replaced wholesale on
/// proactive refresh.
#[async_trait]
pub trait MailboxSession: Send {
    /// Runs a header search and returns matching message ids in ascending
    /// (oldest-first) order.
    async fn search(&mut self, criteria: &MatchCriteria) -> Result<Vec<u32>, AttemptError>;

    /// Fetches one raw message by id.
    async fn fetch(&mut self, id: u32) -> Result<Vec<u8>, AttemptError>;

    /// Explicit logout.
    async fn logout(&mut self) -> Result<(), AttemptError>;
}

/// Opens authenticated mailbox sessions.
#[async_trait]
pub trait MailboxConnector: Send + Sync {
    type Session: MailboxSession;

    /// Connects and authenticates. A rejected login is
    /// [`HandshakeError::MailboxAuth`] and fatal to the whole operation.
    async fn connect(&self) -> Result<Self::Session, HandshakeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn imap_query_quotes_criteria() {
        let criteria = MatchCriteria::new("help@micro.blog", "sign-in");
        assert_eq!(
            criteria.imap_query(),
            r#"(FROM "help@micro.blog" SUBJECT "sign-in")"#
        );
    }
}
