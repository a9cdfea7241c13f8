//! IMAP implementation of the mailbox traits.

use async_imap::Session;
use async_native_tls::TlsConnector;
use async_trait::async_trait;
use futures_util::StreamExt;
use secrecy::ExposeSecret;
use tracing::{debug, info};

use crate::config::MailboxConfig;
use crate::error::{AttemptError, HandshakeError};

use super::{MailboxConnector, MailboxSession, MatchCriteria};

/// Type alias for the underlying async stream (async-std compatible TcpStream).
type AsyncTcpStream = async_io::Async<std::net::TcpStream>;

/// Type alias for the TLS stream used by the IMAP session.
type TlsStream = async_native_tls::TlsStream<AsyncTcpStream>;

/// Connector that opens TLS IMAP sessions with username/app-password login.
pub struct ImapMailbox {
    config: MailboxConfig,
}

impl ImapMailbox {
    pub fn new(config: MailboxConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl MailboxConnector for ImapMailbox {
    type Session = ImapSession;

    async fn connect(&self) -> Result<ImapSession, HandshakeError> {
        let password = self
            .config
            .resolve_password()
            .map_err(|e| HandshakeError::MailboxAuth(e.to_string()))?;

        let addr = format!("{}:{}", self.config.host, self.config.port);
        debug!("connecting to IMAP server at {}", addr);

        let std_stream = std::net::TcpStream::connect(&addr)
            .map_err(|e| HandshakeError::MailboxConnect(e.to_string()))?;
        std_stream
            .set_nonblocking(true)
            .map_err(|e| HandshakeError::MailboxConnect(e.to_string()))?;
        let tcp_stream = async_io::Async::new(std_stream)
            .map_err(|e| HandshakeError::MailboxConnect(e.to_string()))?;

        let tls_stream = TlsConnector::new()
            .connect(&self.config.host, tcp_stream)
            .await
            .map_err(|e| HandshakeError::MailboxConnect(e.to_string()))?;

        let client = async_imap::Client::new(tls_stream);

        let session = client
            .login(&self.config.username, password.expose_secret())
            .await
            .map_err(|(e, _)| HandshakeError::MailboxAuth(e.to_string()))?;

        info!("authenticated to IMAP server {}", self.config.host);
        Ok(ImapSession { inner: session })
    }
}

/// One authenticated IMAP session over TLS.
pub struct ImapSession {
    inner: Session<TlsStream>,
}

#[async_trait]
impl MailboxSession for ImapSession {
    async fn search(&mut self, criteria: &MatchCriteria) -> Result<Vec<u32>, AttemptError> {
        // Re-select INBOX on every search so new deliveries are visible.
        self.inner
            .select("INBOX")
            .await
            .map_err(|e| AttemptError::Search(e.to_string()))?;

        let ids = self
            .inner
            .search(criteria.imap_query())
            .await
            .map_err(|e| AttemptError::Search(e.to_string()))?;

        let mut ids: Vec<u32> = ids.into_iter().collect();
        ids.sort_unstable();
        debug!("search matched {} messages", ids.len());
        Ok(ids)
    }

    async fn fetch(&mut self, id: u32) -> Result<Vec<u8>, AttemptError> {
        // BODY.PEEK[] keeps the message unread in the shared inbox.
        let mut messages = self
            .inner
            .fetch(id.to_string(), "BODY.PEEK[]")
            .await
            .map_err(|e| AttemptError::Fetch(e.to_string()))?;

        let message = messages
            .next()
            .await
            .ok_or_else(|| AttemptError::Fetch(format!("message {id} not returned")))?
            .map_err(|e| AttemptError::Fetch(e.to_string()))?;

        let body = message
            .body()
            .ok_or_else(|| AttemptError::Fetch(format!("message {id} has no body")))?;

        Ok(body.to_vec())
    }

    async fn logout(&mut self) -> Result<(), AttemptError> {
        debug!("logging out of IMAP session");
        self.inner
            .logout()
            .await
            .map_err(|e| AttemptError::Reconnect(e.to_string()))
    }
}
