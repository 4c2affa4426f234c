//! Byte transport between the bot and the IRC server.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Error while connecting to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("Transport is not connected")]
    NotConnected,
    #[error("Connection closed by peer")]
    Closed,
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Outcome of a bounded wait for inbound data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    Timeout,
}

/// Socket operations the poll loop depends on.
#[async_trait]
pub trait Transport: Send {
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Wait up to `timeout` for data to become readable.
    async fn wait_readable(&mut self, timeout: Duration) -> Result<Readiness, TransportError>;

    /// Read up to `max_bytes`. An empty result means nothing was available.
    async fn read(&mut self, max_bytes: usize) -> Result<Vec<u8>, TransportError>;

    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError>;

    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Plain TCP transport on tokio.
pub struct TcpTransport {
    addr: String,
    stream: Option<TcpStream>,
}

impl TcpTransport {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            addr: format!("{host}:{port}"),
            stream: None,
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    fn stream(&mut self) -> Result<&mut TcpStream, TransportError> {
        self.stream.as_mut().ok_or(TransportError::NotConnected)
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|source| TransportError::Connect {
                addr: self.addr.clone(),
                source,
            })?;
        info!(addr = %self.addr, "Connected");
        self.stream = Some(stream);
        Ok(())
    }

    async fn wait_readable(&mut self, timeout: Duration) -> Result<Readiness, TransportError> {
        let stream = self.stream()?;
        match tokio::time::timeout(timeout, stream.readable()).await {
            Ok(Ok(())) => Ok(Readiness::Ready),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Ok(Readiness::Timeout),
        }
    }

    async fn read(&mut self, max_bytes: usize) -> Result<Vec<u8>, TransportError> {
        let stream = self.stream()?;
        let mut buf = vec![0u8; max_bytes];
        match stream.try_read(&mut buf) {
            Ok(0) => Err(TransportError::Closed),
            Ok(n) => {
                buf.truncate(n);
                Ok(buf)
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let stream = self.stream()?;
        stream.write_all(data).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if let Some(mut stream) = self.stream.take() {
            stream.shutdown().await?;
            debug!(addr = %self.addr, "Connection closed");
        }
        Ok(())
    }
}
