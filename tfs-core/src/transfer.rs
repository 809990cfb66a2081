//! Byte-stream transfer protocol
//!
//! Commands travel as fixed-size, NUL padded frames. File payloads follow the
//! command on the same connection in `chunk_size` pieces with no length
//! prefix: the receiver treats any read shorter than a chunk (a zero-length
//! read included) as the end of the stream. A payload whose length is an
//! exact multiple of the chunk size is followed by a single [`END_MARKER`]
//! byte so that the last read comes up short; the receiver cannot tell that
//! byte from data, so such payloads arrive one byte longer than they were
//! sent. [`Framing::LengthPrefixed`] removes that ambiguity for deployments
//! where every component is configured with it.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

use crate::command::Command;
use crate::error::{TfsError, TfsResult};

pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Pad byte written after a payload that ends on a chunk boundary
pub const END_MARKER: u8 = 0;

/// A bidirectional byte stream a handler can serve a command over
pub trait Connection: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send + ?Sized> Connection for T {}

/// How a payload's end is communicated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Framing {
    /// A read shorter than one chunk ends the stream
    #[default]
    ShortRead,
    /// An 8 byte big-endian length precedes the payload
    LengthPrefixed,
}

/// Transfer settings; every component on a path must agree on them
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    pub chunk_size: usize,
    pub framing: Framing,
    /// Pause between the last download chunk and its status line
    pub status_delay_ms: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            framing: Framing::ShortRead,
            status_delay_ms: 5000,
        }
    }
}

impl TransferConfig {
    pub fn status_delay(&self) -> Duration {
        Duration::from_millis(self.status_delay_ms)
    }

    /// Lets the final chunk land before a status line is written behind it.
    pub async fn pause_before_status(&self) {
        if self.status_delay_ms > 0 {
            tokio::time::sleep(self.status_delay()).await;
        }
    }

    /// Frame a command line for this transfer configuration.
    pub fn frame(&self, line: &str) -> TfsResult<bytes::Bytes> {
        Command::encode_line(line, self.chunk_size)
    }
}

/// Read one command frame. `Ok(None)` means the peer closed the connection
/// before sending anything.
pub async fn read_command<R>(reader: &mut R, config: &TransferConfig) -> TfsResult<Option<Command>>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut frame = vec![0u8; config.chunk_size];
    let mut filled = 0;
    while filled < frame.len() {
        let n = reader.read(&mut frame[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            break;
        }
        filled += n;
    }
    Ok(Some(Command::parse(&frame)))
}

/// Write a command frame in a single write.
pub async fn write_command<W>(writer: &mut W, frame: &[u8]) -> TfsResult<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    writer.write_all(frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Stream the `len` byte payload held by `source` to `writer`. Returns the
/// payload size, not counting framing bytes.
///
/// Under [`Framing::ShortRead`] the source is read until it is exhausted and
/// `len` is only a hint; under [`Framing::LengthPrefixed`] exactly `len`
/// bytes are sent behind the prefix, and a source that ends early is an error.
pub async fn send_payload<W, R>(
    writer: &mut W,
    source: &mut R,
    len: u64,
    config: &TransferConfig,
) -> TfsResult<u64>
where
    W: AsyncWrite + Unpin + ?Sized,
    R: AsyncRead + Unpin + ?Sized,
{
    let total = match config.framing {
        Framing::ShortRead => {
            let mut buf = vec![0u8; config.chunk_size];
            let mut total = 0u64;
            loop {
                let n = fill_chunk(source, &mut buf).await?;
                if n > 0 {
                    writer.write_all(&buf[..n]).await?;
                    total += n as u64;
                    trace!(bytes = n, "sent chunk");
                }
                if n < buf.len() {
                    if n == 0 {
                        writer.write_all(&[END_MARKER]).await?;
                    }
                    break;
                }
            }
            total
        }
        Framing::LengthPrefixed => {
            writer.write_u64(len).await?;
            copy_exact(source, writer, len).await?
        }
    };
    writer.flush().await?;
    debug!(bytes = total, hint = len, "payload sent");
    Ok(total)
}

/// Receive one payload from `reader` into `sink`. Returns the number of bytes
/// written to `sink`; zero when the peer closed without sending anything.
pub async fn recv_payload<R, W>(reader: &mut R, sink: &mut W, config: &TransferConfig) -> TfsResult<u64>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let total = match config.framing {
        Framing::ShortRead => copy_short_read(reader, sink, config.chunk_size).await?,
        Framing::LengthPrefixed => match read_length(reader).await? {
            Some(len) => copy_exact(reader, sink, len).await?,
            None => 0,
        },
    };
    sink.flush().await?;
    debug!(bytes = total, "payload received");
    Ok(total)
}

/// Forward one payload from `from` to `to` chunk for chunk, framing included.
pub async fn relay_payload<R, W>(from: &mut R, to: &mut W, config: &TransferConfig) -> TfsResult<u64>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let total = match config.framing {
        Framing::ShortRead => copy_short_read(from, to, config.chunk_size).await?,
        Framing::LengthPrefixed => match read_length(from).await? {
            Some(len) => {
                to.write_u64(len).await?;
                copy_exact(from, to, len).await?
            }
            None => 0,
        },
    };
    to.flush().await?;
    debug!(bytes = total, "payload relayed");
    Ok(total)
}

/// Read and discard one payload.
pub async fn drain_payload<R>(reader: &mut R, config: &TransferConfig) -> TfsResult<u64>
where
    R: AsyncRead + Unpin + ?Sized,
{
    recv_payload(reader, &mut tokio::io::sink(), config).await
}

/// Write a status line in a single write.
pub async fn send_status<W>(writer: &mut W, line: &str) -> TfsResult<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Read a status line with a single read. `Ok(None)` when the peer closed
/// without answering.
pub async fn recv_status<R>(reader: &mut R, config: &TransferConfig) -> TfsResult<Option<String>>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buf = vec![0u8; config.chunk_size];
    let n = reader.read(&mut buf).await?;
    if n == 0 {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(&buf[..n]).into_owned()))
}

async fn copy_short_read<R, W>(reader: &mut R, sink: &mut W, chunk_size: usize) -> TfsResult<u64>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buf = vec![0u8; chunk_size];
    let mut total = 0u64;
    loop {
        let n = reader.read(&mut buf).await?;
        if n > 0 {
            sink.write_all(&buf[..n]).await?;
            total += n as u64;
            trace!(bytes = n, "received chunk");
        }
        if n < chunk_size {
            break;
        }
    }
    Ok(total)
}

async fn read_length<R>(reader: &mut R) -> TfsResult<Option<u64>>
where
    R: AsyncRead + Unpin + ?Sized,
{
    match reader.read_u64().await {
        Ok(len) => Ok(Some(len)),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn copy_exact<R, W>(reader: &mut R, sink: &mut W, len: u64) -> TfsResult<u64>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut limited = (&mut *reader).take(len);
    let copied = tokio::io::copy(&mut limited, sink).await?;
    if copied != len {
        return Err(TfsError::Network(format!(
            "payload truncated: expected {} bytes, got {}",
            len, copied
        )));
    }
    Ok(copied)
}

/// Fill `buf` from a local source, stopping early only at end of input.
async fn fill_chunk<R>(source: &mut R, buf: &mut [u8]) -> TfsResult<usize>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = source.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Verb;

    fn config(chunk_size: usize, framing: Framing) -> TransferConfig {
        TransferConfig { chunk_size, framing, status_delay_ms: 0 }
    }

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8 + 1).collect()
    }

    async fn round_trip(data: &[u8], cfg: &TransferConfig) -> Vec<u8> {
        let (mut a, mut b) = tokio::io::duplex(1 << 20);
        let mut source = data;
        send_payload(&mut a, &mut source, data.len() as u64, cfg).await.unwrap();
        let mut received = Vec::new();
        recv_payload(&mut b, &mut received, cfg).await.unwrap();
        received
    }

    #[tokio::test]
    async fn test_short_read_round_trip() {
        let cfg = config(64, Framing::ShortRead);
        for len in [1, 63, 65, 200] {
            let data = payload(len);
            assert_eq!(round_trip(&data, &cfg).await, data, "len {}", len);
        }
    }

    #[tokio::test]
    async fn test_exact_multiple_gains_end_marker() {
        let cfg = config(64, Framing::ShortRead);
        let data = payload(128);
        let received = round_trip(&data, &cfg).await;
        assert_ne!(received, data);
        assert_eq!(received.len(), data.len() + 1);
        assert_eq!(&received[..128], &data[..]);
        assert_eq!(received[128], END_MARKER);
    }

    #[tokio::test]
    async fn test_empty_payload_is_one_marker_byte() {
        let cfg = config(64, Framing::ShortRead);
        assert_eq!(round_trip(&[], &cfg).await, vec![END_MARKER]);
    }

    #[tokio::test]
    async fn test_length_prefixed_handles_exact_multiples() {
        let cfg = config(64, Framing::LengthPrefixed);
        for len in [0, 64, 128, 130] {
            let data = payload(len);
            assert_eq!(round_trip(&data, &cfg).await, data, "len {}", len);
        }
    }

    #[tokio::test]
    async fn test_length_prefixed_sends_only_the_announced_bytes() {
        let cfg = config(64, Framing::LengthPrefixed);
        let data = payload(100);
        let (mut a, mut b) = tokio::io::duplex(1 << 20);

        let mut source = &data[..];
        assert_eq!(send_payload(&mut a, &mut source, 40, &cfg).await.unwrap(), 40);
        assert_eq!(source, &data[40..]);

        let mut received = Vec::new();
        recv_payload(&mut b, &mut received, &cfg).await.unwrap();
        assert_eq!(received, &data[..40]);
    }

    #[tokio::test]
    async fn test_length_prefixed_short_source_is_an_error() {
        let cfg = config(64, Framing::LengthPrefixed);
        let (mut a, _b) = tokio::io::duplex(1 << 20);
        let data = payload(10);
        let mut source = &data[..];
        let err = send_payload(&mut a, &mut source, 64, &cfg).await.unwrap_err();
        assert!(matches!(err, TfsError::Network(_)));
    }

    #[tokio::test]
    async fn test_recv_on_closed_peer_is_empty() {
        for framing in [Framing::ShortRead, Framing::LengthPrefixed] {
            let cfg = config(64, framing);
            let (a, mut b) = tokio::io::duplex(1024);
            drop(a);
            let mut received = Vec::new();
            assert_eq!(recv_payload(&mut b, &mut received, &cfg).await.unwrap(), 0);
            assert!(received.is_empty());
            assert!(recv_status(&mut b, &cfg).await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn test_relay_preserves_framing() {
        for framing in [Framing::ShortRead, Framing::LengthPrefixed] {
            let cfg = config(64, framing);
            let data = payload(150);
            let (mut up_tx, mut up_rx) = tokio::io::duplex(1 << 20);
            let (mut down_tx, mut down_rx) = tokio::io::duplex(1 << 20);

            let mut source = &data[..];
            send_payload(&mut up_tx, &mut source, data.len() as u64, &cfg).await.unwrap();
            relay_payload(&mut up_rx, &mut down_tx, &cfg).await.unwrap();

            let mut received = Vec::new();
            recv_payload(&mut down_rx, &mut received, &cfg).await.unwrap();
            assert_eq!(received, data);
        }
    }

    #[tokio::test]
    async fn test_command_frame_split_across_writes() {
        let cfg = config(64, Framing::ShortRead);
        let frame = Command::encode(Verb::Rmfile, "notes/a.c", "", 64).unwrap();
        let (mut a, mut b) = tokio::io::duplex(1024);

        let writer = tokio::spawn(async move {
            a.write_all(&frame[..10]).await.unwrap();
            tokio::time::sleep(Duration::from_millis(10)).await;
            a.write_all(&frame[10..]).await.unwrap();
            a.write_all(b"payload").await.unwrap();
            a
        });

        let cmd = read_command(&mut b, &cfg).await.unwrap().unwrap();
        assert_eq!(cmd.verb, Some(Verb::Rmfile));
        assert_eq!(cmd.arg1, "notes/a.c");
        assert_eq!(cmd.raw.len(), 64);

        let _a = writer.await.unwrap();
        let mut rest = [0u8; 7];
        b.read_exact(&mut rest).await.unwrap();
        assert_eq!(&rest, b"payload");
    }

    #[tokio::test]
    async fn test_read_command_on_closed_peer() {
        let cfg = config(64, Framing::ShortRead);
        let (a, mut b) = tokio::io::duplex(64);
        drop(a);
        assert!(read_command(&mut b, &cfg).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_status_line() {
        let cfg = config(64, Framing::ShortRead);
        let (mut a, mut b) = tokio::io::duplex(1024);
        send_status(&mut a, "File a.c uploaded successfully\n").await.unwrap();
        let status = recv_status(&mut b, &cfg).await.unwrap();
        assert_eq!(status.as_deref(), Some("File a.c uploaded successfully\n"));
    }
}
