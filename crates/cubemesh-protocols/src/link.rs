//! Per-side link state.
//!
//! A [`SideSlot`] tracks one face: who is attached, when they were last
//! heard, what they claim, and the bytes received but not yet framed.
//!
//! # Identity
//!
//! Heartbeats are flooded, so a face carries heartbeats from every cube in
//! the component and none of them proves who sits on the other end. Only
//! hellos do: they are never forwarded, so the sender of a hello is the cube
//! plugged into this face. Hellos alone bind the slot and keep it alive. A
//! hello from a different sender on a connected slot means the face was
//! re-plugged, and the slot rebinds at once.
//!
//! # State Coalescing
//!
//! At most one state frame waits per side. A newer one replaces the older
//! unprocessed one; the node drains the survivors once per tick.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use cubemesh_election::{HostClaim, NeighborView};
use cubemesh_topology::NodeId;

use crate::frame::frame_len;
use crate::transport::{SideLink, Timestamp};

/// Whether a face has a live neighbour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    /// Nothing heard, or the neighbour timed out
    #[default]
    Disconnected,
    /// Heartbeats arriving within the timeout
    Connected,
}

/// What a hello changed on a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Refresh {
    /// A new neighbour is attached
    pub joined: bool,
    /// The neighbour it displaced, when the face was re-plugged
    pub replaced: Option<NodeId>,
    /// The neighbour's claim differs from the previous one
    pub claim_changed: bool,
}

/// State of one side.
#[derive(Debug, Default)]
pub struct SideSlot {
    side: u8,
    identity: Option<NodeId>,
    state: LinkState,
    last_heartbeat: Timestamp,
    claim: Option<HostClaim>,
    rx: BytesMut,
    pending_state: Option<Bytes>,
}

impl SideSlot {
    /// An idle slot for `side`.
    pub fn new(side: u8) -> Self {
        Self {
            side,
            ..Default::default()
        }
    }

    /// Side index.
    pub fn side(&self) -> u8 {
        self.side
    }

    /// Current link state.
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Whether a neighbour is attached.
    pub fn is_connected(&self) -> bool {
        self.state == LinkState::Connected
    }

    /// Identity of the attached neighbour.
    pub fn identity(&self) -> Option<NodeId> {
        self.identity
    }

    /// When the neighbour last said hello.
    pub fn last_heartbeat(&self) -> Timestamp {
        self.last_heartbeat
    }

    /// Latest claim from the neighbour.
    pub fn claim(&self) -> Option<&HostClaim> {
        self.claim.as_ref()
    }

    /// Bytes received but not yet framed.
    pub fn buffered(&self) -> usize {
        self.rx.len()
    }

    /// This neighbour as seen by the election, if connected.
    pub fn view(&self) -> Option<NeighborView> {
        match (self.state, self.identity) {
            (LinkState::Connected, Some(id)) => Some(NeighborView {
                side: self.side,
                id,
                claim: self.claim.clone(),
            }),
            _ => None,
        }
    }

    /// Pull everything the link has into the receive buffer.
    pub fn ingest<L: SideLink>(&mut self, link: &mut L) -> usize {
        link.read_available(&mut self.rx)
    }

    /// Split the next complete frame off the receive buffer.
    pub fn next_frame(&mut self) -> Option<Bytes> {
        let len = frame_len(&self.rx)?;
        if self.rx.len() < len {
            return None;
        }
        Some(self.rx.split_to(len).freeze())
    }

    /// Hold a state frame until the end of the sweep. Returns `true` when an
    /// older unprocessed frame was replaced.
    pub fn stash_state(&mut self, raw: Bytes) -> bool {
        self.pending_state.replace(raw).is_some()
    }

    /// Take the held state frame.
    pub fn take_pending(&mut self) -> Option<Bytes> {
        self.pending_state.take()
    }

    /// Record a hello received on this face.
    pub fn refresh(&mut self, sender: NodeId, now: Timestamp, claim: Option<HostClaim>) -> Refresh {
        let replaced = match (self.state, self.identity) {
            (LinkState::Connected, Some(previous)) if previous != sender => {
                self.claim = None;
                Some(previous)
            }
            _ => None,
        };
        let joined = self.state == LinkState::Disconnected || replaced.is_some();
        let claim_changed = self.claim != claim;

        self.identity = Some(sender);
        self.state = LinkState::Connected;
        self.last_heartbeat = now;
        self.claim = claim;

        Refresh {
            joined,
            replaced,
            claim_changed,
        }
    }

    /// Whether the neighbour has been silent longer than `timeout`.
    pub fn is_timed_out(&self, now: Timestamp, timeout: Duration) -> bool {
        self.is_connected() && now.saturating_since(self.last_heartbeat) > timeout
    }

    /// Forget the neighbour, returning who it was. Buffered bytes are kept.
    pub fn reset(&mut self) -> Option<NodeId> {
        self.state = LinkState::Disconnected;
        self.last_heartbeat = Timestamp::ZERO;
        self.claim = None;
        self.identity.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Frame, FrameKind};
    use crate::transport::MemoryLink;
    use cubemesh_topology::Path;

    fn heartbeat(sender: u32, seq: u16) -> Bytes {
        Frame::new(FrameKind::Heartbeat, NodeId(sender), seq, Bytes::new())
            .unwrap()
            .encode()
    }

    #[test]
    fn frames_are_split_across_reads() {
        let mut slot = SideSlot::new(0);
        let mut link = MemoryLink::unplugged();
        let wire = heartbeat(7, 1);

        link.inject(&wire[..5]);
        slot.ingest(&mut link);
        assert_eq!(slot.next_frame(), None);

        link.inject(&wire[5..]);
        link.inject(&wire);
        slot.ingest(&mut link);
        assert_eq!(slot.next_frame(), Some(wire.clone()));
        assert_eq!(slot.next_frame(), Some(wire));
        assert_eq!(slot.next_frame(), None);
        assert_eq!(slot.buffered(), 0);
    }

    #[test]
    fn payload_waits_for_all_bytes() {
        let mut slot = SideSlot::new(1);
        let mut link = MemoryLink::unplugged();
        let wire = Frame::new(FrameKind::State, NodeId(2), 1, Bytes::from_static(b"abcdef"))
            .unwrap()
            .encode();

        link.inject(&wire[..10]);
        slot.ingest(&mut link);
        assert_eq!(slot.next_frame(), None);
        assert_eq!(slot.buffered(), 10);

        link.inject(&wire[10..]);
        slot.ingest(&mut link);
        assert_eq!(slot.next_frame(), Some(wire));
    }

    #[test]
    fn first_hello_connects() {
        let mut slot = SideSlot::new(2);
        assert!(slot.view().is_none());

        let refresh = slot.refresh(NodeId(5), Timestamp::from_millis(10), None);
        assert!(refresh.joined);
        assert_eq!(refresh.replaced, None);
        assert!(!refresh.claim_changed);
        assert_eq!(slot.identity(), Some(NodeId(5)));
        assert_eq!(slot.view(), Some(NeighborView::bare(2, NodeId(5))));
    }

    #[test]
    fn hello_from_another_cube_rebinds() {
        let mut slot = SideSlot::new(0);
        slot.refresh(NodeId(5), Timestamp::ZERO, Some(HostClaim::host(NodeId(5))));

        let refresh = slot.refresh(NodeId(6), Timestamp::from_millis(400), None);
        assert!(refresh.joined);
        assert_eq!(refresh.replaced, Some(NodeId(5)));
        assert!(!refresh.claim_changed);
        assert_eq!(slot.identity(), Some(NodeId(6)));
        assert_eq!(slot.claim(), None);
        assert_eq!(slot.last_heartbeat(), Timestamp::from_millis(400));

        let refresh = slot.refresh(NodeId(6), Timestamp::from_millis(1400), None);
        assert_eq!(refresh, Refresh::default());
    }

    #[test]
    fn claim_changes_are_reported() {
        let mut slot = SideSlot::new(0);
        let claim = HostClaim::new(NodeId(9), Path::from_steps(vec![1]).unwrap());
        slot.refresh(NodeId(5), Timestamp::ZERO, None);

        let refresh = slot.refresh(NodeId(5), Timestamp::from_millis(1000), Some(claim.clone()));
        assert!(!refresh.joined);
        assert!(refresh.claim_changed);

        let refresh = slot.refresh(NodeId(5), Timestamp::from_millis(2000), Some(claim.clone()));
        assert!(!refresh.claim_changed);
        assert_eq!(slot.claim(), Some(&claim));
    }

    #[test]
    fn timeout_is_strictly_greater() {
        let mut slot = SideSlot::new(0);
        let timeout = Duration::from_millis(3000);
        assert!(!slot.is_timed_out(Timestamp::from_millis(99_999), timeout));

        slot.refresh(NodeId(5), Timestamp::from_millis(1000), None);
        assert!(!slot.is_timed_out(Timestamp::from_millis(4000), timeout));
        assert!(slot.is_timed_out(Timestamp::from_millis(4001), timeout));
    }

    #[test]
    fn reset_forgets_neighbour_but_keeps_bytes() {
        let mut slot = SideSlot::new(0);
        let mut link = MemoryLink::unplugged();
        slot.refresh(NodeId(5), Timestamp::from_millis(1000), Some(HostClaim::host(NodeId(5))));
        link.inject(&[0x01, 0]);
        slot.ingest(&mut link);

        assert_eq!(slot.reset(), Some(NodeId(5)));
        assert_eq!(slot.state(), LinkState::Disconnected);
        assert_eq!(slot.claim(), None);
        assert_eq!(slot.last_heartbeat(), Timestamp::ZERO);
        assert_eq!(slot.buffered(), 2);
        assert_eq!(slot.reset(), None);
    }

    #[test]
    fn newer_state_replaces_pending() {
        let mut slot = SideSlot::new(0);
        assert!(!slot.stash_state(Bytes::from_static(b"old")));
        assert!(slot.stash_state(Bytes::from_static(b"new")));

        assert_eq!(slot.take_pending(), Some(Bytes::from_static(b"new")));
        assert_eq!(slot.take_pending(), None);
    }
}
