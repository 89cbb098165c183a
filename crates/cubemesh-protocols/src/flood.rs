//! Flooding.
//!
//! Origination writes a fresh frame to every side whether or not anything
//! is attached there; that is how an idle face first hears from a new
//! neighbour. Forwarding relays received bytes unchanged to every connected
//! side except the one they came in on. Loops are broken by the duplicate
//! filter, not by the forwarding rule.

use bytes::Bytes;
use cubemesh_topology::NodeId;
use tracing::trace;

use crate::error::FrameError;
use crate::frame::Frame;
use crate::link::SideSlot;
use crate::transport::SideLink;

/// Originates and relays frames.
#[derive(Debug, Clone, Default)]
pub struct Flooder {
    sequence: u16,
}

impl Flooder {
    /// A flooder whose first frame carries sequence 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence number of the most recently originated frame.
    pub fn last_sequence(&self) -> u16 {
        self.sequence
    }

    /// Build a frame with the next sequence number and write it to every
    /// side. Returns the frame.
    pub fn originate<L: SideLink>(
        &mut self,
        tag: u8,
        sender: NodeId,
        payload: Bytes,
        links: &mut [L],
    ) -> Result<Frame, FrameError> {
        let sequence = self.sequence.wrapping_add(1);
        let frame = Frame::with_tag(tag, sender, sequence, payload)?;
        self.sequence = sequence;

        let wire = frame.encode();
        for link in links.iter_mut() {
            link.write(&wire);
        }
        trace!(tag, sequence, len = wire.len(), "Originated frame");
        Ok(frame)
    }

    /// Relay raw frame bytes received on `incoming` to every other
    /// connected side. Returns the number of sides written.
    pub fn forward<L: SideLink>(incoming: usize, raw: &[u8], slots: &[SideSlot], links: &mut [L]) -> usize {
        let mut sent = 0;
        for (index, (slot, link)) in slots.iter().zip(links.iter_mut()).enumerate() {
            if index == incoming || !slot.is_connected() {
                continue;
            }
            link.write(raw);
            sent += 1;
        }
        trace!(incoming, sent, len = raw.len(), "Forwarded frame");
        sent
    }
}
