//! Router to tier transport
//!
//! The Router reaches a tier through a fresh TCP connection per proxied
//! request: connect, forward the command frame, move the payload, read the
//! tier's answer, close. Connections are never pooled.

use std::net::SocketAddr;
use tfs_core::{
    command::{Command, Verb},
    routing::FileKind,
    status::{self, DIRECTORY_NOT_FOUND},
    transfer::{self, Connection},
    TfsError, TfsResult, TierId, TransferConfig,
};
use tokio::net::TcpStream;
use tracing::{debug, warn};

/// What a proxied download produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relayed {
    pub bytes: u64,
    /// `None` when the tier closed without a status line
    pub status: Option<String>,
}

/// Short-lived client for one storage tier
#[derive(Debug, Clone)]
pub struct TierClient {
    tier: TierId,
    addr: SocketAddr,
    transfer: TransferConfig,
}

impl TierClient {
    pub fn new(tier: TierId, addr: SocketAddr, transfer: TransferConfig) -> Self {
        Self { tier, addr, transfer }
    }

    pub fn tier(&self) -> TierId {
        self.tier
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    async fn connect(&self) -> TfsResult<TcpStream> {
        let stream = TcpStream::connect(self.addr).await.map_err(|e| {
            warn!("Cannot reach {} tier at {}: {}", self.tier, self.addr, e);
            TfsError::TierUnavailable {
                tier: self.tier.to_string(),
                reason: e.to_string(),
            }
        })?;
        stream.set_nodelay(true).map_err(|e| TfsError::Network(e.to_string()))?;
        debug!("Connected to {} tier at {}", self.tier, self.addr);
        Ok(stream)
    }

    /// Open a connection and forward `frame` on it.
    async fn open(&self, frame: &[u8]) -> TfsResult<TcpStream> {
        let mut stream = self.connect().await?;
        transfer::write_command(&mut stream, frame).await?;
        Ok(stream)
    }

    /// Forward an upload: the raw command, then the payload read from
    /// `payload`. Returns the tier's status line.
    pub async fn upload(&self, frame: &[u8], payload: &mut dyn Connection) -> TfsResult<Option<String>> {
        let mut stream = self.open(frame).await?;
        transfer::relay_payload(payload, &mut stream, &self.transfer).await?;
        transfer::recv_status(&mut stream, &self.transfer).await
    }

    /// Forward a download, relaying the tier's payload into `sink`.
    pub async fn download(&self, frame: &[u8], sink: &mut dyn Connection) -> TfsResult<Relayed> {
        let mut stream = self.open(frame).await?;
        let bytes = transfer::relay_payload(&mut stream, sink, &self.transfer).await?;
        if bytes == 0 {
            return Ok(Relayed { bytes, status: None });
        }
        let status = transfer::recv_status(&mut stream, &self.transfer).await?;
        Ok(Relayed { bytes, status })
    }

    pub async fn remove(&self, frame: &[u8]) -> TfsResult<Option<String>> {
        let mut stream = self.open(frame).await?;
        transfer::recv_status(&mut stream, &self.transfer).await
    }

    /// Ask the tier to build its archive for `kind` and relay it into `sink`.
    pub async fn archive(&self, kind: FileKind, sink: &mut dyn Connection) -> TfsResult<u64> {
        let frame = Command::encode(Verb::Dtar, kind.extension(), "", self.transfer.chunk_size)?;
        let mut stream = self.open(&frame).await?;
        transfer::relay_payload(&mut stream, sink, &self.transfer).await
    }

    /// Paths of the tier's files below `path`; `None` when the tier reports
    /// the directory absent.
    pub async fn display(&self, path: &str) -> TfsResult<Option<Vec<String>>> {
        let frame = Command::encode(Verb::Display, path, "", self.transfer.chunk_size)?;
        let mut stream = self.open(&frame).await?;
        let mut response = Vec::new();
        let n = transfer::recv_payload(&mut stream, &mut response, &self.transfer).await?;
        if n == 0 {
            return Err(TfsError::NoResponse);
        }
        let text = String::from_utf8_lossy(&response);
        if text.trim_end_matches('\0') == DIRECTORY_NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(status::listing_lines(&text).map(String::from).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    fn transfer() -> TransferConfig {
        TransferConfig { chunk_size: 64, status_delay_ms: 0, ..Default::default() }
    }

    /// Accept one connection, read its command and answer with `reply`.
    async fn one_shot_tier(reply: &'static [u8]) -> (SocketAddr, tokio::task::JoinHandle<Command>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let cmd = transfer::read_command(&mut stream, &transfer()).await.unwrap().unwrap();
            let len = reply.len() as u64;
            let mut reply = reply;
            transfer::send_payload(&mut stream, &mut reply, len, &transfer()).await.unwrap();
            cmd
        });
        (addr, handle)
    }

    #[tokio::test]
    async fn test_display_parses_listing() {
        let (addr, tier) = one_shot_tier(b"notes/b.pdf\nnotes/x/d.pdf\n").await;
        let client = TierClient::new(TierId::Pdf, addr, transfer());
        let listing = client.display("notes").await.unwrap().unwrap();
        assert_eq!(listing, vec!["notes/b.pdf", "notes/x/d.pdf"]);

        let cmd = tier.await.unwrap();
        assert_eq!(cmd.verb, Some(Verb::Display));
        assert_eq!(cmd.arg1, "notes");
    }

    #[tokio::test]
    async fn test_display_sentinel_is_none() {
        let (addr, _tier) = one_shot_tier(DIRECTORY_NOT_FOUND.as_bytes()).await;
        let client = TierClient::new(TierId::Text, addr, transfer());
        assert_eq!(client.display("notes").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unreachable_tier() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = TierClient::new(TierId::Pdf, addr, transfer());
        let err = client.remove(b"rmfile a.pdf").await.unwrap_err();
        assert!(matches!(err, TfsError::TierUnavailable { .. }));
        assert!(err.is_transport());
    }
}
