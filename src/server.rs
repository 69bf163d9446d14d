//! TCP server for the packet log.
//!
//! Accepts one connection at a time and serves it to completion. Each
//! request frame is handled and answered before the next one is read, so
//! the session counter and the log file never see overlapping requests.

use std::future::Future;
use std::io;
use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::TransportError;
use crate::handler::MessageHandler;
use crate::protocol::{FramedStream, Request};
use crate::storage::LogStore;

/// Pending connections the kernel may queue while one is being served
const LISTEN_BACKLOG: i32 = 128;

/// Server instance
pub struct Server {
    listener: TcpListener,
    handler: MessageHandler,
    max_message_size: usize,
}

impl Server {
    /// Bind the listening socket and set up the handler.
    ///
    /// Fails if the address cannot be resolved or is already in use.
    pub async fn bind(config: &Config) -> io::Result<Self> {
        let addr = tokio::net::lookup_host(&config.listen)
            .await?
            .next()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("could not resolve address '{}'", config.listen),
                )
            })?;

        let listener = TcpListener::from_std(create_listener(addr)?)?;
        let handler = MessageHandler::new(LogStore::new(&config.log_file));

        Ok(Server {
            listener,
            handler,
            max_message_size: config.max_message_size,
        })
    }

    /// Address the server is listening on
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until Ctrl-C.
    pub async fn run(self) -> io::Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for interrupt");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Serve until `shutdown` completes, then release the listening socket.
    ///
    /// A request in flight when `shutdown` fires is dropped without a reply.
    pub async fn run_until<F>(mut self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()>,
    {
        let address = self.local_addr()?;
        info!(
            %address,
            path = %self.handler.store().path().display(),
            "Server listening"
        );

        tokio::select! {
            () = serve(&self.listener, &mut self.handler, self.max_message_size) => {}
            () = shutdown => {}
        }

        drop(self.listener);
        info!(
            packets = self.handler.counter(),
            "Server stopped"
        );
        Ok(())
    }
}

/// Accept connections forever, one at a time.
async fn serve(listener: &TcpListener, handler: &mut MessageHandler, max_message_size: usize) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                debug!(%peer, "New connection");

                match handle_connection(stream, handler, max_message_size).await {
                    Ok(()) => debug!(%peer, "Connection closed"),
                    Err(e) => warn!(%peer, error = %e, "Connection error"),
                }
            }
            Err(e) => {
                error!(error = %e, "Failed to accept connection");
            }
        }
    }
}

/// Serve one client: receive a request, reply, repeat until it hangs up.
async fn handle_connection(
    stream: TcpStream,
    handler: &mut MessageHandler,
    max_message_size: usize,
) -> Result<(), TransportError> {
    let mut framed = FramedStream::with_max_message_size(stream, max_message_size);

    loop {
        let payload = match framed.recv().await {
            Ok(Some(payload)) => payload,
            Ok(None) => return Ok(()),
            Err(e @ (TransportError::InvalidLength | TransportError::PayloadTooLarge { .. })) => {
                // Tell the client why before hanging up; the stream is out of sync
                let _ = framed.send(format!("ERROR:{e}").as_bytes()).await;
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        let request = Request::classify(&payload);
        match &request {
            Request::ReadAll => info!("Received show request"),
            Request::Write(message) => info!(%message, "Received message"),
        }

        let reply = match handler.handle(request) {
            Ok(reply) => reply,
            Err(e) => {
                error!(error = %e, "Failed to handle request");
                format!("ERROR:{e}")
            }
        };

        framed.send(reply.as_bytes()).await?;
        info!(bytes = reply.len(), "Sent reply");
    }
}

/// Create the listening socket.
///
/// `SO_REUSEADDR` lets a restarted server rebind past TIME_WAIT; without
/// `SO_REUSEPORT` a second live server on the same address fails to bind.
fn create_listener(addr: SocketAddr) -> io::Result<std::net::TcpListener> {
    let socket = socket2::Socket::new(
        match addr {
            SocketAddr::V4(_) => socket2::Domain::IPV4,
            SocketAddr::V6(_) => socket2::Domain::IPV6,
        },
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(LISTEN_BACKLOG)?;

    Ok(socket.into())
}
