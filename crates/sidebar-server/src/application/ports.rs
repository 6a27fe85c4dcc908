//! Outbound ports: how the engine reaches the host's client connections.
//!
//! The engine never opens sockets itself.  The host game server adapts its own
//! connection objects to these two traits and hands them to the
//! [`crate::application::registry::BoardRegistry`].
//!
//! # Dependency rule
//!
//! These traits are defined here, in the application layer, and implemented
//! by `infrastructure` (or by the host).  The board logic only ever sees
//! `Arc<dyn PacketTransport>` and `Arc<dyn VersionResolver>`, which is also
//! what makes the recording transport usable in tests.

use async_trait::async_trait;
use sidebar_core::{ProtocolVersion, ViewerId};
use thiserror::Error;

/// Failure reported by the host when delivering a packet.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The viewer's connection closed before or during the send.
    #[error("connection to viewer {0} is closed")]
    Closed(ViewerId),

    /// Any other host-side failure.
    #[error("send failed: {0}")]
    Send(String),
}

/// Delivers already-encoded packets to one viewer.
///
/// Every packet for a viewer goes through the same `send` call in the order
/// the engine produced them; implementations must preserve that order.
#[async_trait]
pub trait PacketTransport: Send + Sync {
    async fn send(&self, viewer: ViewerId, packet: Vec<u8>) -> Result<(), TransportError>;
}

/// Looks up a connected viewer's protocol version.
///
/// `None` means the viewer is no longer connected.  The engine prunes such
/// viewers from a board's viewer set on the next broadcast.
pub trait VersionResolver: Send + Sync {
    fn protocol_version(&self, viewer: ViewerId) -> Option<ProtocolVersion>;
}
