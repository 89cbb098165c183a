//! Cubemesh Protocols - Link Management, Flooding and Heartbeats
//!
//! This crate runs the per-cube protocol: it frames bytes from each side,
//! suppresses duplicates, floods everything it accepts, tracks which faces
//! have live neighbours and keeps the host election and topology map in step
//! with what the hellos and heartbeats say.
//!
//! # Overview
//!
//! ## Frames
//!
//! Three message kinds share one 8-byte header (see [`frame`]):
//!
//! - **Hello** (`0x03`): one hop only; binds a face to the cube plugged into
//!   it and keeps it alive, carrying that cube's host and path
//! - **Heartbeat** (`0x01`): the same claim, flooded so every cube can place
//!   every other one
//! - **State** (`0x02`): opaque application payload, newest per side wins
//!
//! ## Flooding
//!
//! Every accepted heartbeat and state frame is relayed to every connected
//! side except the one it arrived on. A bounded `(sender, sequence)` window drops the copies that
//! come back around loops.
//!
//! ## Driving a Node
//!
//! A [`CubeNode`] owns one [`SideLink`] per side and a [`Clock`]. The host
//! program calls [`CubeNode::tick`] in its main loop; events surface through
//! a [`MeshObserver`].
//!
//! # Example
//!
//! ```rust
//! use cubemesh_protocols::{CubeNode, ManualClock, MemoryLink, MeshConfig, NodeId};
//! use std::time::Duration;
//!
//! let clock = ManualClock::new();
//! let (a0, b2) = MemoryLink::pair();
//! let faces = |attached: MemoryLink, side: usize| -> Vec<MemoryLink> {
//!     (0..4)
//!         .map(|i| if i == side { attached.clone() } else { MemoryLink::unplugged() })
//!         .collect()
//! };
//!
//! let mut a = CubeNode::new(NodeId(3), faces(a0, 0), clock.clone(), MeshConfig::default()).unwrap();
//! let mut b = CubeNode::new(NodeId(9), faces(b2, 2), clock.clone(), MeshConfig::default()).unwrap();
//!
//! for _ in 0..4 {
//!     clock.advance(Duration::from_millis(500));
//!     a.tick();
//!     b.tick();
//! }
//!
//! assert!(b.is_host());
//! assert_eq!(a.host_id(), Some(NodeId(9)));
//! ```

pub mod config;
pub mod dedup;
pub mod error;
pub mod flood;
pub mod frame;
pub mod heartbeat;
pub mod link;
pub mod node;
pub mod observer;
pub mod transport;

pub use config::MeshConfig;
pub use dedup::DuplicateFilter;
pub use error::{Error, FrameError, HeartbeatError, Result};
pub use flood::Flooder;
pub use frame::{Frame, FrameKind, HEADER_LEN, MAX_PAYLOAD_LEN};
pub use link::{LinkState, SideSlot};
pub use node::CubeNode;
pub use observer::{MeshObserver, RecordingObserver};
pub use transport::{Clock, ManualClock, MemoryLink, SideLink, SystemClock, Timestamp};

// Re-export the types that cross this crate's API
pub use cubemesh_election::{HostClaim, Role};
pub use cubemesh_topology::{CubeEntry, NodeId, PathKnowledge, TopologyMap};
