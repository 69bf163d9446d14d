//! Client side of the request/reply channel.

use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::debug;

use crate::error::TransportError;
use crate::protocol::FramedStream;

/// A connection to a packet-log server.
pub struct Client {
    framed: FramedStream<TcpStream>,
}

impl Client {
    /// Connect to the server at `addr`.
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr).await?;
        debug!(peer = ?stream.peer_addr().ok(), "Connected");
        Ok(Self {
            framed: FramedStream::unbounded(stream),
        })
    }

    /// Send one message and wait for its reply.
    pub async fn request(&mut self, message: &str) -> Result<String, TransportError> {
        self.framed.send(message.as_bytes()).await?;
        match self.framed.recv().await? {
            Some(reply) => Ok(String::from_utf8_lossy(&reply).into_owned()),
            None => Err(TransportError::UnexpectedEof),
        }
    }
}

/// Connect, send `message`, and return the single reply.
pub async fn send_once<A: ToSocketAddrs>(addr: A, message: &str) -> Result<String, TransportError> {
    let mut client = Client::connect(addr).await?;
    client.request(message).await
}
