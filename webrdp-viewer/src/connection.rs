//! Gateway connection.
//!
//! [`Transport`] is the seam the client drives; [`FramedTransport`]
//! implements it over any byte stream using [`FrameCodec`].

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::info;
use webrdp_core::{RdpError, Result};

use crate::codec::FrameCodec;
use crate::config::NetworkConfig;

/// Message-oriented, bidirectional link to the gateway.
#[async_trait]
pub trait Transport: Send {
    /// Next inbound message. `None` once the peer has closed.
    async fn recv(&mut self) -> Option<Result<Bytes>>;

    /// Send one outbound message.
    async fn send(&mut self, message: Bytes) -> Result<()>;
}

/// TCP connection to the gateway.
pub type ServerConnection = FramedTransport<TcpStream>;

pub struct FramedTransport<T> {
    framed: Framed<T, FrameCodec>,
}

impl<T> FramedTransport<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(io: T, max_frame_size: usize) -> Self {
        Self {
            framed: Framed::new(io, FrameCodec::new(max_frame_size)),
        }
    }
}

impl ServerConnection {
    /// Connect to the gateway within the configured timeout.
    pub async fn connect(config: &NetworkConfig) -> Result<Self> {
        let timeout = config.timeout();

        info!("connecting to {}", config.server_address);
        let stream = tokio::time::timeout(timeout, TcpStream::connect(&config.server_address))
            .await
            .map_err(|_| RdpError::Timeout(timeout))??;
        stream.set_nodelay(true)?;

        if let Ok(peer) = stream.peer_addr() {
            info!("connected to {peer}");
        }
        Ok(Self::new(stream, config.max_frame_size))
    }
}

#[async_trait]
impl<T> Transport for FramedTransport<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn recv(&mut self) -> Option<Result<Bytes>> {
        self.framed.next().await
    }

    async fn send(&mut self, message: Bytes) -> Result<()> {
        self.framed.send(message).await
    }
}
