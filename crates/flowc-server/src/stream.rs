//! Stream identity, lifecycle phase and counters.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use flowc_core::NodeId;

/// Unique identifier for a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamId(u64);

impl StreamId {
    /// Next identifier.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Numeric value.
    #[inline]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for StreamId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stream-{}", self.0)
    }
}

/// Lifecycle of an ADS stream.
///
/// Phases only move forward:
/// `Open → Hello → Subscribed → Pushing → Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StreamPhase {
    /// Accepted, nothing received yet.
    Open,
    /// Node identified by the first request.
    Hello,
    /// At least one resource type subscribed.
    Subscribed,
    /// At least one response sent.
    Pushing,
    /// Ended.
    Closed,
}

impl fmt::Display for StreamPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StreamPhase::Open => "open",
            StreamPhase::Hello => "hello",
            StreamPhase::Subscribed => "subscribed",
            StreamPhase::Pushing => "pushing",
            StreamPhase::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Per-stream bookkeeping.
#[derive(Debug)]
pub struct StreamContext {
    id: StreamId,
    node: Option<NodeId>,
    phase: StreamPhase,
    created_at: Instant,
    requests: u64,
    responses: u64,
}

impl StreamContext {
    /// Context for a newly accepted stream.
    pub fn new() -> Self {
        Self {
            id: StreamId::new(),
            node: None,
            phase: StreamPhase::Open,
            created_at: Instant::now(),
            requests: 0,
            responses: 0,
        }
    }

    /// Stream identifier.
    #[inline]
    pub fn id(&self) -> StreamId {
        self.id
    }

    /// Node, once identified.
    #[inline]
    pub fn node(&self) -> Option<&NodeId> {
        self.node.as_ref()
    }

    /// Current phase.
    #[inline]
    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    /// Record the node and enter [`StreamPhase::Hello`].
    pub fn set_node(&mut self, node: NodeId) {
        self.node = Some(node);
        self.advance(StreamPhase::Hello);
    }

    /// Move to `phase` if it is later than the current one.
    pub fn advance(&mut self, phase: StreamPhase) {
        if phase > self.phase {
            self.phase = phase;
        }
    }

    /// Time since the stream opened.
    #[inline]
    pub fn duration(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Count a request.
    pub fn record_request(&mut self) {
        self.requests += 1;
    }

    /// Count a response and enter [`StreamPhase::Pushing`].
    pub fn record_response(&mut self) {
        self.responses += 1;
        self.advance(StreamPhase::Pushing);
    }

    /// Requests received.
    #[inline]
    pub fn request_count(&self) -> u64 {
        self.requests
    }

    /// Responses sent.
    #[inline]
    pub fn response_count(&self) -> u64 {
        self.responses
    }
}

impl Default for StreamContext {
    fn default() -> Self {
        Self::new()
    }
}
