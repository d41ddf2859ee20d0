//! Circuit breaker summary types

use cardsync_types::Direction;

/// Point-in-time view of one direction's breaker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakerSummary {
    pub direction: Direction,
    pub engaged: bool,
    /// Successful `try_enter` calls
    pub total_trips: u64,
    /// Releases that actually cleared an engaged flag
    pub total_releases: u64,
    /// Scheduled releases that have not fired or been cancelled yet
    pub pending_releases: usize,
}

impl BreakerSummary {
    /// True once every trip has been matched by a release and nothing is pending.
    pub fn is_settled(&self) -> bool {
        !self.engaged && self.pending_releases == 0
    }
}
