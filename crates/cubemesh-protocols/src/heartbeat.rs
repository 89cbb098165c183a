//! Heartbeat and hello payloads.
//!
//! Both kinds carry the same payload. An empty one only proves liveness.
//! Otherwise it carries the sender's host claim:
//!
//! ```text
//! +---------------+-----------+----------------------+
//! | host (u32 BE) | steps: u8 | packed path          |
//! +---------------+-----------+----------------------+
//! ```
//!
//! Payloads shorter than five bytes, and claims naming host `0`, carry no
//! claim and are treated as liveness only.

use bytes::{BufMut, Bytes, BytesMut};
use cubemesh_election::HostClaim;
use cubemesh_topology::{NodeId, Path};

use crate::error::HeartbeatError;

/// Bytes before the packed path.
pub const CLAIM_HEADER_LEN: usize = 5;

/// Encode a heartbeat payload.
pub fn encode_claim(claim: Option<&HostClaim>) -> Bytes {
    let Some(claim) = claim else {
        return Bytes::new();
    };
    let packed = claim.path.pack();
    let mut buf = BytesMut::with_capacity(CLAIM_HEADER_LEN + packed.len());
    buf.put_slice(&claim.host.to_be_bytes());
    // Path length is bounded to a byte by construction.
    buf.put_u8(claim.path.len() as u8);
    buf.put_slice(&packed);
    buf.freeze()
}

/// Decode the claim a heartbeat from `sender` carries.
pub fn decode_claim(sender: NodeId, payload: &[u8]) -> Result<Option<HostClaim>, HeartbeatError> {
    if payload.len() < CLAIM_HEADER_LEN {
        return Ok(None);
    }
    let host = NodeId::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
    if host == NodeId::NONE {
        return Ok(None);
    }
    let steps = usize::from(payload[4]);
    let path = Path::unpack(&payload[CLAIM_HEADER_LEN..], steps)?;

    let claim = HostClaim::new(host, path);
    if !claim.is_consistent_for(sender) {
        return Err(HeartbeatError::InconsistentClaim { sender, host });
    }
    Ok(Some(claim))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cubemesh_topology::TopologyError;

    fn path(steps: &[u8]) -> Path {
        Path::from_steps(steps.to_vec()).unwrap()
    }

    #[test]
    fn client_claim_wire_format() {
        let claim = HostClaim::new(NodeId(0x0000_0100), path(&[1, 2, 3, 0]));
        let wire = encode_claim(Some(&claim));

        assert_eq!(wire.as_ref(), &[0, 0, 1, 0, 4, 0b0011_1001]);
        assert_eq!(decode_claim(NodeId(5), &wire).unwrap(), Some(claim));
    }

    #[test]
    fn host_claims_itself_with_empty_path() {
        let claim = HostClaim::host(NodeId(9));
        let wire = encode_claim(Some(&claim));

        assert_eq!(wire.as_ref(), &[0, 0, 0, 9, 0]);
        assert_eq!(decode_claim(NodeId(9), &wire).unwrap(), Some(claim));
    }

    #[test]
    fn short_payload_carries_no_claim() {
        assert!(encode_claim(None).is_empty());
        assert_eq!(decode_claim(NodeId(1), &[]).unwrap(), None);
        assert_eq!(decode_claim(NodeId(1), &[0, 0, 0, 9]).unwrap(), None);
    }

    #[test]
    fn zero_host_carries_no_claim() {
        assert_eq!(decode_claim(NodeId(1), &[0, 0, 0, 0, 0]).unwrap(), None);
    }

    #[test]
    fn overlong_step_count_is_rejected() {
        let err = decode_claim(NodeId(1), &[0, 0, 0, 9, 5, 0xFF]).unwrap_err();
        assert_eq!(
            err,
            HeartbeatError::Path(TopologyError::PathOverflow {
                asserted: 5,
                capacity: 4
            })
        );
    }

    #[test]
    fn trailing_codes_beyond_step_count_are_ignored() {
        let claim = decode_claim(NodeId(1), &[0, 0, 0, 9, 1, 0xFF]).unwrap().unwrap();
        assert_eq!(claim.path, path(&[3]));
    }

    #[test]
    fn inconsistent_claims_are_rejected() {
        // Someone else asserting the empty path.
        assert!(matches!(
            decode_claim(NodeId(1), &[0, 0, 0, 9, 0]),
            Err(HeartbeatError::InconsistentClaim { .. })
        ));
        // The host asserting a non-empty path.
        assert!(matches!(
            decode_claim(NodeId(9), &[0, 0, 0, 9, 1, 0]),
            Err(HeartbeatError::InconsistentClaim { .. })
        ));
    }
}
