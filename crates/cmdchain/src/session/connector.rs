//! The transport seam: connectors open shell streams, links pump them.

use std::future::Future;
use std::io;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, WriteHalf};
use tokio::task::JoinHandle;

use super::buffer::SharedBuffer;
use crate::error::ConnectError;

/// Opens an interactive shell stream on a device.
///
/// The session calls `connect` once at startup and again whenever a poisoned
/// connection is rebuilt, so implementations must be able to produce a fresh
/// stream per call.
pub trait ShellConnector: Send {
    /// Stream type produced by [`connect`](Self::connect).
    type Stream: AsyncRead + AsyncWrite + Send + Unpin + 'static;

    /// Establish the transport connection and open the shell stream.
    fn connect(&mut self) -> impl Future<Output = Result<Self::Stream, ConnectError>> + Send;
}

/// One open shell stream: the write half plus the reader task that feeds the
/// shared receive buffer.
pub(crate) struct ShellLink<S> {
    writer: WriteHalf<S>,
    reader: JoinHandle<()>,
}

impl<S: AsyncRead + AsyncWrite + Send + Unpin + 'static> ShellLink<S> {
    /// Split the stream and spawn the reader task.
    ///
    /// The reader task is the sole producer of `buffer`: it appends each
    /// incoming chunk decoded as UTF-8 (lossily) until the stream ends.
    pub(crate) fn open(stream: S, buffer: SharedBuffer, chunk_size: usize) -> Self {
        let (mut read_half, writer) = tokio::io::split(stream);
        let reader = tokio::spawn(async move {
            let mut chunk = BytesMut::with_capacity(chunk_size.max(1));
            loop {
                chunk.clear();
                match read_half.read_buf(&mut chunk).await {
                    Ok(0) => break,
                    Ok(_) => buffer.append(&String::from_utf8_lossy(&chunk)),
                    Err(err) => {
                        tracing::debug!(%err, "shell stream read failed");
                        break;
                    }
                }
            }
        });
        Self { writer, reader }
    }

    /// Write bytes to the shell and flush.
    pub(crate) async fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.writer.write_all(bytes).await?;
        self.writer.flush().await
    }

    /// Check whether the stream is still being pumped.
    pub(crate) fn is_open(&self) -> bool {
        !self.reader.is_finished()
    }

    /// Shut the stream down and stop the reader task.
    pub(crate) async fn close(mut self) {
        let _ = self.writer.shutdown().await;
        self.reader.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reader_task_feeds_buffer() {
        let (local, mut remote) = tokio::io::duplex(1024);
        let buffer = SharedBuffer::new();
        let mut link = ShellLink::open(local, buffer.clone(), 256);

        remote.write_all(b"-> ").await.unwrap();
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(buffer.snapshot(), "-> ");

        link.write(b"show vlan\n").await.unwrap();
        let mut echo = [0u8; 10];
        remote.read_exact(&mut echo).await.unwrap();
        assert_eq!(&echo, b"show vlan\n");

        assert!(link.is_open());
        link.close().await;
    }

    #[tokio::test]
    async fn link_reports_closed_after_peer_hangs_up() {
        let (local, remote) = tokio::io::duplex(64);
        let buffer = SharedBuffer::new();
        let link = ShellLink::open(local, buffer, 64);
        drop(remote);
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!link.is_open());
        link.close().await;
    }
}
