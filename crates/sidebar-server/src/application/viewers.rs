//! Viewer membership and per-viewer packet fan-out for one board.
//!
//! # How a broadcast works (for beginners)
//!
//! Every viewer may run a different client version and see different text,
//! so the engine cannot build one packet and copy it to everybody.  Instead a
//! broadcast takes a *render closure* and, for each viewer in turn:
//!
//! 1. resolves the viewer's protocol version (viewers that no longer resolve
//!    are dropped from the set),
//! 2. calls the closure to get that viewer's semantic packets,
//! 3. encodes **all** of them, and only then
//! 4. sends them in order.
//!
//! Step 3 before step 4 means a viewer never receives half of an update
//! because a later packet failed to encode.  The first failure stops the
//! broadcast and is returned with the viewer and board attached.

use std::collections::BTreeSet;
use std::sync::Arc;

use sidebar_core::{encode_packet, ObjectiveName, ScoreboardPacket, ViewerId};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::application::content::{ContentError, ViewerContext};
use crate::application::error::BoardError;
use crate::application::ports::{PacketTransport, VersionResolver};

/// The set of viewers currently shown one board.
pub struct ViewerSet {
    board: ObjectiveName,
    members: Mutex<BTreeSet<ViewerId>>,
    transport: Arc<dyn PacketTransport>,
    resolver: Arc<dyn VersionResolver>,
}

impl ViewerSet {
    pub fn new(
        board: ObjectiveName,
        transport: Arc<dyn PacketTransport>,
        resolver: Arc<dyn VersionResolver>,
    ) -> Self {
        Self {
            board,
            members: Mutex::new(BTreeSet::new()),
            transport,
            resolver,
        }
    }

    pub async fn contains(&self, viewer: ViewerId) -> bool {
        self.members.lock().await.contains(&viewer)
    }

    pub async fn snapshot(&self) -> Vec<ViewerId> {
        self.members.lock().await.iter().copied().collect()
    }

    pub async fn len(&self) -> usize {
        self.members.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.members.lock().await.is_empty()
    }

    /// Resolves the viewer's context from the host.
    pub fn context(&self, viewer: ViewerId) -> Option<ViewerContext> {
        self.resolver
            .protocol_version(viewer)
            .map(|protocol_version| ViewerContext {
                viewer,
                protocol_version,
            })
    }

    /// Sends the packets produced by `render` to a new viewer and then adds
    /// it to the set.
    ///
    /// Returns `Ok(false)` without sending anything when the viewer is
    /// already a member.  On error the viewer is not added.
    pub async fn add_with<F>(&self, viewer: ViewerId, render: F) -> Result<bool, BoardError>
    where
        F: FnOnce(&ViewerContext) -> Result<Vec<ScoreboardPacket>, ContentError>,
    {
        let mut members = self.members.lock().await;
        if members.contains(&viewer) {
            return Ok(false);
        }
        let ctx = self.context(viewer).ok_or(BoardError::ViewerOffline(viewer))?;
        let packets = render(&ctx).map_err(|source| self.content_error(viewer, source))?;
        self.deliver(&ctx, &packets).await?;
        members.insert(viewer);
        debug!(%viewer, board = %self.board, "viewer added");
        Ok(true)
    }

    /// Removes a viewer and sends it the packets produced by `render`.
    ///
    /// Membership is dropped first, so a failed send still leaves the viewer
    /// out of the set.  A viewer that no longer resolves receives nothing.
    pub async fn remove_with<F>(&self, viewer: ViewerId, render: F) -> Result<bool, BoardError>
    where
        F: FnOnce(&ViewerContext) -> Result<Vec<ScoreboardPacket>, ContentError>,
    {
        let mut members = self.members.lock().await;
        if !members.remove(&viewer) {
            return Ok(false);
        }
        debug!(%viewer, board = %self.board, "viewer removed");
        let Some(ctx) = self.context(viewer) else {
            return Ok(true);
        };
        let packets = render(&ctx).map_err(|source| self.content_error(viewer, source))?;
        self.deliver(&ctx, &packets).await?;
        Ok(true)
    }

    /// Renders and sends to every member, pruning members that no longer
    /// resolve.  Fails fast on the first error.
    pub async fn broadcast<F>(&self, mut render: F) -> Result<(), BoardError>
    where
        F: FnMut(&ViewerContext) -> Result<Vec<ScoreboardPacket>, ContentError>,
    {
        let mut members = self.members.lock().await;
        let online = self.prune(&mut members);
        for ctx in &online {
            let packets = render(ctx).map_err(|source| self.content_error(ctx.viewer, source))?;
            if packets.is_empty() {
                continue;
            }
            self.deliver(ctx, &packets).await?;
        }
        Ok(())
    }

    /// Empties the set, sending each still-connected viewer its packets from
    /// `render`.  Failures are logged and skipped.  Returns how many viewers
    /// were removed.
    pub async fn drain_with<F>(&self, mut render: F) -> usize
    where
        F: FnMut(&ViewerContext) -> Result<Vec<ScoreboardPacket>, ContentError>,
    {
        let mut members = self.members.lock().await;
        let drained = std::mem::take(&mut *members);
        for viewer in &drained {
            let Some(ctx) = self.context(*viewer) else {
                continue;
            };
            let result = match render(&ctx) {
                Ok(packets) => self.deliver(&ctx, &packets).await,
                Err(source) => Err(self.content_error(*viewer, source)),
            };
            if let Err(e) = result {
                warn!(%viewer, board = %self.board, "teardown failed: {e}");
            }
        }
        drained.len()
    }

    // ── Internals ─────────────────────────────────────────────────────────

    fn prune(&self, members: &mut BTreeSet<ViewerId>) -> Vec<ViewerContext> {
        let mut online = Vec::with_capacity(members.len());
        members.retain(|viewer| match self.context(*viewer) {
            Some(ctx) => {
                online.push(ctx);
                true
            }
            None => {
                debug!(%viewer, board = %self.board, "pruning disconnected viewer");
                false
            }
        });
        online
    }

    async fn deliver(&self, ctx: &ViewerContext, packets: &[ScoreboardPacket]) -> Result<(), BoardError> {
        let encoded = packets
            .iter()
            .map(|packet| encode_packet(packet, ctx.protocol_version))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| BoardError::Protocol {
                board: self.board.clone(),
                viewer: ctx.viewer,
                source,
            })?;
        for bytes in encoded {
            self.transport
                .send(ctx.viewer, bytes)
                .await
                .map_err(|source| BoardError::transport(&self.board, ctx.viewer, source))?;
        }
        Ok(())
    }

    fn content_error(&self, viewer: ViewerId, source: ContentError) -> BoardError {
        BoardError::Content {
            board: self.board.clone(),
            viewer,
            source,
        }
    }
}
