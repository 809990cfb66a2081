//! Client side of the persistent connection to the Router

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tfs_core::{
    command::{Command, Verb},
    path::base_name,
    routing::FileKind,
    status,
    transfer, TfsError, TfsResult, TransferConfig,
};
use tokio::net::TcpStream;
use tracing::{debug, info};

/// Result of a download or archive request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Download {
    Saved {
        path: PathBuf,
        bytes: u64,
        status: String,
    },
    /// The Router answered with a status line instead of a payload
    Rejected(String),
}

/// One client connection to the Router; commands run strictly one at a time
pub struct RouterSession {
    addr: SocketAddr,
    transfer: TransferConfig,
    stream: Option<TcpStream>,
}

impl RouterSession {
    pub fn new(addr: SocketAddr, transfer: TransferConfig) -> Self {
        Self { addr, transfer, stream: None }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    pub async fn connect(&mut self) -> TfsResult<()> {
        self.stream().await.map(|_| ())
    }

    async fn stream(&mut self) -> TfsResult<&mut TcpStream> {
        if self.stream.is_none() {
            let stream = TcpStream::connect(self.addr)
                .await
                .map_err(|e| TfsError::Network(format!("cannot connect to {}: {}", self.addr, e)))?;
            stream.set_nodelay(true).map_err(|e| TfsError::Network(e.to_string()))?;
            info!("Connected to router at {}", self.addr);
            self.stream = Some(stream);
        }
        self.stream
            .as_mut()
            .ok_or_else(|| TfsError::Network("not connected".into()))
    }

    fn disconnect(&mut self) {
        if self.stream.take().is_some() {
            debug!("Router closed the connection");
        }
    }

    async fn send(&mut self, verb: Verb, arg1: &str, arg2: &str) -> TfsResult<()> {
        let frame = Command::encode(verb, arg1, arg2, self.transfer.chunk_size)?;
        let stream = self.stream().await?;
        transfer::write_command(stream, &frame).await
    }

    async fn status(&mut self) -> TfsResult<String> {
        let config = self.transfer.clone();
        let stream = self.stream().await?;
        match transfer::recv_status(stream, &config).await {
            Ok(Some(line)) => Ok(line),
            Ok(None) => {
                self.disconnect();
                Err(TfsError::NoResponse)
            }
            Err(e) => {
                self.disconnect();
                Err(e)
            }
        }
    }

    /// Send a command line as-is and return the single status read.
    pub async fn raw(&mut self, line: &str) -> TfsResult<String> {
        let frame = self.transfer.frame(line)?;
        let stream = self.stream().await?;
        transfer::write_command(stream, &frame).await?;
        self.status().await
    }

    /// `ufile <local> <dest>`
    pub async fn upload(&mut self, local: &Path, dest: &str) -> TfsResult<String> {
        let name = local.to_string_lossy().into_owned();
        if FileKind::from_name(&name).is_none() {
            self.send(Verb::Ufile, &name, dest).await?;
            return self.status().await;
        }

        let mut file = tokio::fs::File::open(local).await?;
        let len = file.metadata().await?.len();
        self.send(Verb::Ufile, &name, dest).await?;
        let config = self.transfer.clone();
        let stream = self.stream().await?;
        let bytes = transfer::send_payload(stream, &mut file, len, &config).await?;
        debug!(bytes, "uploaded {}", name);
        self.status().await
    }

    /// `dfile <name>`, saved under `into_dir` without overwriting anything.
    pub async fn download(&mut self, name: &str, into_dir: &Path) -> TfsResult<Download> {
        if FileKind::from_name(name).is_none() {
            self.send(Verb::Dfile, name, "").await?;
            return self.status().await.map(Download::Rejected);
        }
        self.send(Verb::Dfile, name, "").await?;
        let data = self.receive_payload().await?;
        if data.is_empty() {
            self.disconnect();
            return Err(TfsError::NotFound(name.to_string()));
        }
        // The file already arrived; a missing status line only costs the
        // connection, which `status` has dropped for the next command.
        let status = match self.status().await {
            Ok(line) => line,
            Err(e) => {
                debug!("no status after downloading {}: {}", name, e);
                String::new()
            }
        };
        self.save(into_dir, base_name(name), data, status).await
    }

    /// `rmfile <name>`
    pub async fn remove(&mut self, name: &str) -> TfsResult<String> {
        self.send(Verb::Rmfile, name, "").await?;
        self.status().await
    }

    /// `dtar <ext>`, saved under `into_dir` as the extension's archive name.
    pub async fn archive(&mut self, extension: &str, into_dir: &Path) -> TfsResult<Download> {
        self.send(Verb::Dtar, extension, "").await?;
        let Some(kind) = FileKind::from_extension(extension) else {
            return self.status().await.map(Download::Rejected);
        };
        let data = self.receive_payload().await?;
        if data.is_empty() {
            self.disconnect();
            return Err(TfsError::NoResponse);
        }
        self.save(into_dir, kind.archive_name(), data, String::new()).await
    }

    /// `display <path>`: base names across every tier.
    pub async fn display(&mut self, path: &str) -> TfsResult<Vec<String>> {
        self.send(Verb::Display, path, "").await?;
        let data = self.receive_payload().await?;
        if data.is_empty() {
            self.disconnect();
            return Err(TfsError::NoResponse);
        }
        let text = String::from_utf8_lossy(&data);
        Ok(status::listing_lines(&text).map(String::from).collect())
    }

    async fn receive_payload(&mut self) -> TfsResult<Vec<u8>> {
        let config = self.transfer.clone();
        let stream = self.stream().await?;
        let mut data = Vec::new();
        if let Err(e) = transfer::recv_payload(stream, &mut data, &config).await {
            self.disconnect();
            return Err(e);
        }
        Ok(data)
    }

    async fn save(&self, dir: &Path, name: &str, data: Vec<u8>, status: String) -> TfsResult<Download> {
        let path = unique_path(dir, name);
        tokio::fs::write(&path, &data).await?;
        Ok(Download::Saved {
            path,
            bytes: data.len() as u64,
            status,
        })
    }
}

/// `dir/name`, or `dir/name(1)`, `dir/name(2)`, ... when taken.
pub fn unique_path(dir: &Path, name: &str) -> PathBuf {
    let mut candidate = dir.join(name);
    let mut i = 1;
    while candidate.exists() {
        candidate = dir.join(format!("{}({})", name, i));
        i += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_download_kept_when_status_never_arrives() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let config = TransferConfig { chunk_size: 64, status_delay_ms: 0, ..Default::default() };
        let server_transfer = config.clone();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            transfer::read_command(&mut stream, &server_transfer).await.unwrap();
            let body = b"int x;";
            transfer::send_payload(&mut stream, &mut &body[..], body.len() as u64, &server_transfer)
                .await
                .unwrap();
        });

        let tmp = tempfile::tempdir().unwrap();
        let mut session = RouterSession::new(addr, config);
        match session.download("notes/x.c", tmp.path()).await.unwrap() {
            Download::Saved { path, bytes, status } => {
                assert_eq!(path, tmp.path().join("x.c"));
                assert_eq!(bytes, 6);
                assert!(status.is_empty());
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(!session.is_connected());
    }

    #[test]
    fn test_unique_path() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(unique_path(tmp.path(), "a.c"), tmp.path().join("a.c"));

        std::fs::write(tmp.path().join("a.c"), b"").unwrap();
        assert_eq!(unique_path(tmp.path(), "a.c"), tmp.path().join("a.c(1)"));

        std::fs::write(tmp.path().join("a.c(1)"), b"").unwrap();
        assert_eq!(unique_path(tmp.path(), "a.c"), tmp.path().join("a.c(2)"));
    }
}
