//! In-memory transport that records every packet it is asked to send.
//!
//! `RecordingTransport` plays both host roles: it resolves protocol versions
//! for the viewers registered with [`RecordingTransport::connect`] and it
//! stores the bytes handed to [`PacketTransport::send`].  Stored packets can
//! be decoded back with the codec for inspection, which is how the demo binary
//! prints what a client would receive and how the integration tests assert on
//! packet sequences.
//!
//! Viewers can be disconnected (the resolver stops answering and sends fail
//! with [`TransportError::Closed`]) or marked as failing (sends fail with
//! [`TransportError::Send`] while the viewer still resolves).

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use sidebar_core::{decode_packet, ProtocolVersion, ScoreboardPacket, ViewerId};
use tracing::{trace, warn};

use crate::application::ports::{PacketTransport, TransportError, VersionResolver};

/// One recorded send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentPacket {
    pub viewer: ViewerId,
    pub version: ProtocolVersion,
    pub bytes: Vec<u8>,
}

impl SentPacket {
    /// Decodes the bytes with the version they were sent for.
    pub fn decode(&self) -> Option<ScoreboardPacket> {
        match decode_packet(&self.bytes, self.version) {
            Ok((packet, _)) => Some(packet),
            Err(e) => {
                warn!(viewer = %self.viewer, version = %self.version, "recorded packet does not decode: {e}");
                None
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct RecordingTransport {
    versions: Mutex<HashMap<ViewerId, ProtocolVersion>>,
    failing: Mutex<HashSet<ViewerId>>,
    sent: Mutex<Vec<SentPacket>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connected viewer.
    pub fn connect(&self, viewer: ViewerId, version: ProtocolVersion) {
        lock(&self.versions).insert(viewer, version);
        lock(&self.failing).remove(&viewer);
    }

    pub fn disconnect(&self, viewer: ViewerId) {
        lock(&self.versions).remove(&viewer);
    }

    /// Makes every later send to `viewer` fail while it stays connected.
    pub fn fail_sends_to(&self, viewer: ViewerId) {
        lock(&self.failing).insert(viewer);
    }

    pub fn sent(&self) -> Vec<SentPacket> {
        lock(&self.sent).clone()
    }

    /// Every packet sent to `viewer`, decoded, in send order.
    pub fn packets_for(&self, viewer: ViewerId) -> Vec<ScoreboardPacket> {
        lock(&self.sent)
            .iter()
            .filter(|p| p.viewer == viewer)
            .filter_map(SentPacket::decode)
            .collect()
    }

    /// Like [`Self::packets_for`] but also forgets them.
    pub fn take_packets_for(&self, viewer: ViewerId) -> Vec<ScoreboardPacket> {
        let mut sent = lock(&self.sent);
        let (taken, kept): (Vec<_>, Vec<_>) = sent.drain(..).partition(|p| p.viewer == viewer);
        *sent = kept;
        taken.iter().filter_map(SentPacket::decode).collect()
    }

    pub fn clear(&self) {
        lock(&self.sent).clear();
    }
}

#[async_trait]
impl PacketTransport for RecordingTransport {
    async fn send(&self, viewer: ViewerId, packet: Vec<u8>) -> Result<(), TransportError> {
        let Some(version) = self.protocol_version(viewer) else {
            return Err(TransportError::Closed(viewer));
        };
        if lock(&self.failing).contains(&viewer) {
            return Err(TransportError::Send(format!("simulated failure for {viewer}")));
        }
        trace!(%viewer, len = packet.len(), "recorded packet");
        lock(&self.sent).push(SentPacket {
            viewer,
            version,
            bytes: packet,
        });
        Ok(())
    }
}

impl VersionResolver for RecordingTransport {
    fn protocol_version(&self, viewer: ViewerId) -> Option<ProtocolVersion> {
        lock(&self.versions).get(&viewer).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sidebar_core::encode_packet;
    use uuid::Uuid;

    fn reset(entry: &str) -> ScoreboardPacket {
        ScoreboardPacket::ResetScore {
            entry: entry.to_string(),
            objective: "sb-c0ffee".to_string(),
        }
    }

    #[tokio::test]
    async fn test_send_records_and_decodes() {
        // Arrange
        let transport = RecordingTransport::new();
        let viewer = Uuid::new_v4();
        transport.connect(viewer, ProtocolVersion::MINECRAFT_1_8);
        let bytes = encode_packet(&reset("§0§r"), ProtocolVersion::MINECRAFT_1_8).unwrap();

        // Act
        transport.send(viewer, bytes).await.unwrap();

        // Assert
        assert_eq!(transport.packets_for(viewer), vec![reset("§0§r")]);
    }

    #[tokio::test]
    async fn test_send_to_disconnected_viewer_is_closed() {
        let transport = RecordingTransport::new();
        let viewer = Uuid::new_v4();

        let result = transport.send(viewer, vec![0]).await;

        assert!(matches!(result, Err(TransportError::Closed(v)) if v == viewer));
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_failing_viewer_still_resolves() {
        let transport = RecordingTransport::new();
        let viewer = Uuid::new_v4();
        transport.connect(viewer, ProtocolVersion::MINECRAFT_1_20_3);
        transport.fail_sends_to(viewer);

        assert!(transport.protocol_version(viewer).is_some());
        assert!(matches!(
            transport.send(viewer, vec![0]).await,
            Err(TransportError::Send(_))
        ));
    }

    #[tokio::test]
    async fn test_take_packets_keeps_other_viewers() {
        let transport = RecordingTransport::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let version = ProtocolVersion::MINECRAFT_1_13;
        transport.connect(a, version);
        transport.connect(b, version);
        transport.send(a, encode_packet(&reset("§0§r"), version).unwrap()).await.unwrap();
        transport.send(b, encode_packet(&reset("§1§r"), version).unwrap()).await.unwrap();

        assert_eq!(transport.take_packets_for(a).len(), 1);
        assert!(transport.packets_for(a).is_empty());
        assert_eq!(transport.packets_for(b), vec![reset("§1§r")]);
    }
}
