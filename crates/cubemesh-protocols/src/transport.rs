//! Side links and time.
//!
//! The node core never touches hardware. Each side is a [`SideLink`]: a
//! full-duplex, in-order byte pipe to whatever cube (if any) is attached to
//! that face. Time comes from a [`Clock`] so the whole mesh can be driven
//! from a simulated timeline.
//!
//! # In-Memory Links
//!
//! [`MemoryLink::pair`] joins two sides back to back. Either end can be cut
//! to model a cube being pulled away; bytes written while cut are lost.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::{Duration, Instant};

use bytes::BytesMut;

/// Milliseconds on a monotonic clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Clock origin.
    pub const ZERO: Self = Self(0);

    /// Create from milliseconds.
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    /// Milliseconds since the clock origin.
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Time elapsed since `earlier`, zero if `earlier` is in the future.
    pub fn saturating_since(self, earlier: Timestamp) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }

    /// This timestamp moved forward by `duration`.
    pub fn saturating_add(self, duration: Duration) -> Self {
        let ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        Self(self.0.saturating_add(ms))
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// One face of a cube.
///
/// Implementations never block. Writes that cannot be delivered (nothing
/// attached, buffer full) are dropped; the heartbeat protocol detects the
/// resulting silence.
pub trait SideLink {
    /// Append every byte currently available to `buf`, returning how many.
    fn read_available(&mut self, buf: &mut BytesMut) -> usize;

    /// Send bytes toward the attached cube.
    fn write(&mut self, data: &[u8]);
}

/// Monotonic millisecond time source.
pub trait Clock {
    /// Current time.
    fn now(&self) -> Timestamp;
}

/// Wall clock measured from its creation.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    /// Start a clock at zero.
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let ms = u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX);
        Timestamp::from_millis(ms)
    }
}

/// Manually advanced clock.
///
/// Clones share the same timeline, so one handle can drive many nodes.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    current: Rc<Cell<Timestamp>>,
}

impl ManualClock {
    /// A clock at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// A clock starting at `time`.
    pub fn at(time: Timestamp) -> Self {
        Self {
            current: Rc::new(Cell::new(time)),
        }
    }

    /// Jump to `time`.
    pub fn set(&self, time: Timestamp) {
        self.current.set(time);
    }

    /// Move forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        self.current.set(self.current.get().saturating_add(duration));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.current.get()
    }
}

type Pipe = Rc<RefCell<VecDeque<u8>>>;

/// In-memory side link.
#[derive(Debug, Clone)]
pub struct MemoryLink {
    inbox: Pipe,
    outbox: Option<Pipe>,
    wired: Rc<Cell<bool>>,
}

impl MemoryLink {
    /// Two ends of one wire.
    pub fn pair() -> (Self, Self) {
        let a_to_b: Pipe = Rc::default();
        let b_to_a: Pipe = Rc::default();
        let wired = Rc::new(Cell::new(true));

        let a = Self {
            inbox: Rc::clone(&b_to_a),
            outbox: Some(Rc::clone(&a_to_b)),
            wired: Rc::clone(&wired),
        };
        let b = Self {
            inbox: a_to_b,
            outbox: Some(b_to_a),
            wired,
        };
        (a, b)
    }

    /// A face with nothing attached. Writes vanish; reads only see
    /// injected bytes.
    pub fn unplugged() -> Self {
        Self {
            inbox: Rc::default(),
            outbox: None,
            wired: Rc::new(Cell::new(false)),
        }
    }

    /// Sever the wire for both ends.
    pub fn cut(&self) {
        self.wired.set(false);
    }

    /// Reconnect a severed wire.
    pub fn restore(&self) {
        if self.outbox.is_some() {
            self.wired.set(true);
        }
    }

    /// Whether the wire currently carries bytes.
    pub fn is_wired(&self) -> bool {
        self.wired.get()
    }

    /// Place raw bytes in this end's receive queue.
    pub fn inject(&self, data: &[u8]) {
        self.inbox.borrow_mut().extend(data);
    }

    /// Bytes waiting to be read at this end.
    pub fn pending(&self) -> usize {
        self.inbox.borrow().len()
    }
}

impl SideLink for MemoryLink {
    fn read_available(&mut self, buf: &mut BytesMut) -> usize {
        let mut inbox = self.inbox.borrow_mut();
        let count = inbox.len();
        let (front, back) = inbox.as_slices();
        buf.extend_from_slice(front);
        buf.extend_from_slice(back);
        inbox.clear();
        count
    }

    fn write(&mut self, data: &[u8]) {
        if !self.wired.get() {
            return;
        }
        if let Some(outbox) = &self.outbox {
            outbox.borrow_mut().extend(data);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_carries_bytes_both_ways() {
        let (mut a, mut b) = MemoryLink::pair();
        a.write(b"ping");
        b.write(b"pong");

        let mut buf = BytesMut::new();
        assert_eq!(b.read_available(&mut buf), 4);
        assert_eq!(&buf[..], b"ping");

        buf.clear();
        assert_eq!(a.read_available(&mut buf), 4);
        assert_eq!(&buf[..], b"pong");
        assert_eq!(a.read_available(&mut buf), 0);
    }

    #[test]
    fn cut_drops_later_writes() {
        let (mut a, mut b) = MemoryLink::pair();
        a.write(b"1");
        b.cut();
        a.write(b"2");

        assert!(!a.is_wired());
        let mut buf = BytesMut::new();
        b.read_available(&mut buf);
        assert_eq!(&buf[..], b"1");

        a.restore();
        a.write(b"3");
        buf.clear();
        b.read_available(&mut buf);
        assert_eq!(&buf[..], b"3");
    }

    #[test]
    fn unplugged_face_only_reads_injected_bytes() {
        let mut link = MemoryLink::unplugged();
        link.write(b"lost");
        link.restore();
        assert!(!link.is_wired());

        link.inject(&[1, 2]);
        assert_eq!(link.pending(), 2);
        let mut buf = BytesMut::new();
        assert_eq!(link.read_available(&mut buf), 2);
    }

    #[test]
    fn manual_clock_is_shared() {
        let clock = ManualClock::new();
        let other = clock.clone();
        clock.advance(Duration::from_millis(1500));

        assert_eq!(other.now(), Timestamp::from_millis(1500));
        other.set(Timestamp::from_millis(10));
        assert_eq!(clock.now().as_millis(), 10);
    }

    #[test]
    fn elapsed_saturates() {
        let early = Timestamp::from_millis(100);
        let late = Timestamp::from_millis(350);

        assert_eq!(late.saturating_since(early), Duration::from_millis(250));
        assert_eq!(early.saturating_since(late), Duration::ZERO);
    }
}
