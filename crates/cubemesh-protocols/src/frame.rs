//! Wire frames.
//!
//! Every message on a side link is one frame:
//!
//! ```text
//! +-----+-----+-----------------+-----------+------------------+
//! | tag | len | sender (u32 BE) | seq (u16) | payload[len]     |
//! +-----+-----+-----------------+-----------+------------------+
//!   0     1     2..6              6..8        8..8+len
//! ```
//!
//! `len` counts payload bytes only. The header carries no checksum and no
//! sync marker; the link is assumed to deliver bytes in order.
//!
//! Heartbeats and state frames are flooded. Hellos stay on the link they
//! were sent on; older firmware sees them as an unknown tag and drops them.

use bytes::{BufMut, Bytes, BytesMut};
use cubemesh_topology::NodeId;

use crate::error::FrameError;

/// Size of the fixed frame header.
pub const HEADER_LEN: usize = 8;

/// Largest payload a frame can declare.
pub const MAX_PAYLOAD_LEN: usize = u8::MAX as usize;

/// The message kinds this protocol understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameKind {
    /// Liveness plus optional host claim
    Heartbeat = 0x01,
    /// Opaque application state
    State = 0x02,
    /// One-hop heartbeat that binds and keeps alive a side, never forwarded
    Hello = 0x03,
}

impl FrameKind {
    /// Wire tag for this kind.
    pub const fn tag(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for FrameKind {
    type Error = FrameError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0x01 => Ok(Self::Heartbeat),
            0x02 => Ok(Self::State),
            0x03 => Ok(Self::Hello),
            other => Err(FrameError::UnknownTag(other)),
        }
    }
}

/// Total length of the frame whose header starts `buf`, or `None` while the
/// header is still incomplete.
pub fn frame_len(buf: &[u8]) -> Option<usize> {
    (buf.len() >= HEADER_LEN).then(|| HEADER_LEN + usize::from(buf[1]))
}

/// A decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Raw tag byte; see [`FrameKind`]
    pub tag: u8,
    /// Originating node
    pub sender: NodeId,
    /// Per-sender sequence number
    pub sequence: u16,
    /// Payload bytes
    pub payload: Bytes,
}

impl Frame {
    /// Build a frame of a known kind.
    pub fn new(kind: FrameKind, sender: NodeId, sequence: u16, payload: Bytes) -> Result<Self, FrameError> {
        Self::with_tag(kind.tag(), sender, sequence, payload)
    }

    /// Build a frame with an arbitrary tag byte.
    pub fn with_tag(tag: u8, sender: NodeId, sequence: u16, payload: Bytes) -> Result<Self, FrameError> {
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(FrameError::PayloadTooLong { len: payload.len() });
        }
        Ok(Self {
            tag,
            sender,
            sequence,
            payload,
        })
    }

    /// The frame's kind, if its tag is one this protocol knows.
    pub fn kind(&self) -> Result<FrameKind, FrameError> {
        FrameKind::try_from(self.tag)
    }

    /// Length on the wire.
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.payload.len()
    }

    /// Serialize to wire bytes.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        buf.put_u8(self.tag);
        // Length was bounded at construction.
        buf.put_u8(self.payload.len() as u8);
        buf.put_slice(&self.sender.to_be_bytes());
        buf.put_u16(self.sequence);
        buf.put_slice(&self.payload);
        buf.freeze()
    }

    /// Parse exactly one frame from `buf`.
    ///
    /// The buffer must hold the header and precisely the declared payload.
    pub fn decode(buf: &[u8]) -> Result<Self, FrameError> {
        if buf.len() < HEADER_LEN {
            return Err(FrameError::Truncated { len: buf.len() });
        }
        let declared = usize::from(buf[1]);
        let available = buf.len() - HEADER_LEN;
        if declared != available {
            return Err(FrameError::LengthMismatch { declared, available });
        }

        let sender = NodeId::from_be_bytes([buf[2], buf[3], buf[4], buf[5]]);
        let sequence = u16::from_be_bytes([buf[6], buf[7]]);

        Ok(Self {
            tag: buf[0],
            sender,
            sequence,
            payload: Bytes::copy_from_slice(&buf[HEADER_LEN..]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn header_layout_is_big_endian() {
        let frame = Frame::new(
            FrameKind::State,
            NodeId(0x0A0B_0C0D),
            0x0102,
            Bytes::from_static(b"hi"),
        )
        .unwrap();

        assert_eq!(
            frame.encode().as_ref(),
            &[0x02, 2, 0x0A, 0x0B, 0x0C, 0x0D, 0x01, 0x02, b'h', b'i']
        );
    }

    #[test]
    fn empty_heartbeat_is_header_only() {
        let frame = Frame::new(FrameKind::Heartbeat, NodeId(1), 7, Bytes::new()).unwrap();
        let wire = frame.encode();

        assert_eq!(wire.len(), HEADER_LEN);
        assert_eq!(Frame::decode(&wire).unwrap(), frame);
    }

    #[test]
    fn oversized_payload_rejected() {
        let payload = Bytes::from(vec![0u8; 256]);
        assert_eq!(
            Frame::new(FrameKind::State, NodeId(1), 0, payload),
            Err(FrameError::PayloadTooLong { len: 256 })
        );
    }

    #[test]
    fn short_buffers_are_truncated() {
        assert_eq!(Frame::decode(&[0x01, 0, 0]), Err(FrameError::Truncated { len: 3 }));
        assert_eq!(frame_len(&[0x01, 4, 0, 0, 0, 0, 0]), None);
    }

    #[test]
    fn declared_length_must_match() {
        let wire = [0x02, 3, 0, 0, 0, 1, 0, 1, 0xFF];
        assert_eq!(
            Frame::decode(&wire),
            Err(FrameError::LengthMismatch {
                declared: 3,
                available: 1
            })
        );
        assert_eq!(frame_len(&wire), Some(11));
    }

    #[test]
    fn known_tags() {
        for kind in [FrameKind::Heartbeat, FrameKind::State, FrameKind::Hello] {
            assert_eq!(FrameKind::try_from(kind.tag()), Ok(kind));
        }
        assert_eq!(FrameKind::Hello.tag(), 0x03);
    }

    #[test]
    fn unknown_tag_decodes_but_has_no_kind() {
        let frame = Frame::decode(&[0x7F, 0, 0, 0, 0, 9, 0, 3]).unwrap();
        assert_eq!(frame.kind(), Err(FrameError::UnknownTag(0x7F)));
        assert_eq!(frame.sender, NodeId(9));
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(
            tag in any::<u8>(),
            sender in any::<u32>(),
            sequence in any::<u16>(),
            payload in prop::collection::vec(any::<u8>(), 0..=MAX_PAYLOAD_LEN),
        ) {
            let frame = Frame::with_tag(tag, NodeId(sender), sequence, Bytes::from(payload)).unwrap();
            let wire = frame.encode();

            prop_assert_eq!(frame_len(&wire), Some(wire.len()));
            prop_assert_eq!(Frame::decode(&wire).unwrap(), frame);
        }
    }
}
