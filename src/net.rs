//! Point-to-point transport: one connection per message, no retries.
//!
//! With the `turmoil` feature the socket types come from turmoil's
//! simulated network instead of tokio, which lets tests inject partitions
//! and latency without touching the protocol code.

use std::net::SocketAddr;

use futures::SinkExt;
use tokio::io::AsyncWriteExt;
use tokio_util::codec::FramedWrite;
use tracing::debug;

#[cfg(not(feature = "turmoil"))]
pub use tokio::net::{TcpListener, TcpStream};
#[cfg(feature = "turmoil")]
pub use turmoil::net::{TcpListener, TcpStream};

use crate::codec;
use crate::error::Error;
use crate::message::Message;

/// Unicast one message: fresh connection, one frame, close.
///
/// Failures are swallowed by the caller; the network model treats them as
/// message loss.
pub(crate) async fn send(addr: SocketAddr, msg: &Message) -> Result<(), Error> {
    let stream = TcpStream::connect(addr).await?;
    let mut framed = FramedWrite::new(stream, codec::frame_codec());
    framed.send(codec::encode(msg)?).await?;
    framed.get_mut().shutdown().await?;
    Ok(())
}

/// Fire-and-forget variant of [`send`] used by broadcast paths.
pub(crate) fn send_detached(addr: SocketAddr, msg: Message) {
    tokio::spawn(async move {
        if let Err(e) = send(addr, &msg).await {
            debug!("dropping undeliverable message to {addr}: {e}");
        }
    });
}
