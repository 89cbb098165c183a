//! Bounded duplicate suppression for flooded frames.
//!
//! A frame is identified by `(sender, sequence)`. The filter remembers the
//! most recent `capacity` identities in arrival order and evicts the oldest
//! when full. Once evicted, an identity is accepted again; with a 16-bit
//! sequence and a small window this is what lets a sender's counter wrap.

use std::collections::{HashSet, VecDeque};

use cubemesh_topology::NodeId;

/// Default number of remembered frame identities.
pub const DEFAULT_CAPACITY: usize = 100;

/// Remembers recently seen frames.
#[derive(Debug, Clone)]
pub struct DuplicateFilter {
    capacity: usize,
    order: VecDeque<(NodeId, u16)>,
    members: HashSet<(NodeId, u16)>,
}

impl DuplicateFilter {
    /// Create a filter remembering up to `capacity` frames.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            members: HashSet::with_capacity(capacity),
        }
    }

    /// Check a frame and remember it.
    ///
    /// Returns `true` if the frame was already seen. A new identity is
    /// recorded, evicting the oldest when the window is full.
    pub fn seen(&mut self, sender: NodeId, sequence: u16) -> bool {
        let key = (sender, sequence);
        if self.members.contains(&key) {
            return true;
        }
        if self.capacity == 0 {
            return false;
        }
        if self.order.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.members.remove(&oldest);
            }
        }
        self.order.push_back(key);
        self.members.insert(key);
        false
    }

    /// Whether a frame is currently remembered, without recording it.
    pub fn contains(&self, sender: NodeId, sequence: u16) -> bool {
        self.members.contains(&(sender, sequence))
    }

    /// Number of remembered frames.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether nothing is remembered.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Window size.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for DuplicateFilter {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
