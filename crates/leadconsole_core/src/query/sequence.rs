//! Dispatch sequencing for last-dispatched-wins page loads.

/// Sequence number stamped on a page request at dispatch time.
pub type RequestSeq = u64;

/// Issues strictly increasing request sequence numbers and decides whether a
/// response is still current.
///
/// A response is current only when its sequence equals the latest dispatched
/// one; arrival order is irrelevant.
#[derive(Debug, Clone, Default)]
pub struct DispatchSequencer {
    latest: RequestSeq,
}

impl DispatchSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamps a new dispatch and returns its sequence number (starting at 1).
    pub fn next(&mut self) -> RequestSeq {
        self.latest += 1;
        self.latest
    }

    /// Latest dispatched sequence, `0` before the first dispatch.
    pub fn latest(&self) -> RequestSeq {
        self.latest
    }

    pub fn is_current(&self, seq: RequestSeq) -> bool {
        seq == self.latest && seq != 0
    }

    pub fn is_stale(&self, seq: RequestSeq) -> bool {
        seq < self.latest
    }
}
