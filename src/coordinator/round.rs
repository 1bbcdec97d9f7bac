//! Aggregation state for a single rendezvous round

/// Peer messages collected so far, in arrival order
///
/// Peers are keyed by their remote `ip:port`. A reconnecting peer overwrites
/// its stored message but keeps its original position, so the combined
/// payload always reflects first-arrival order.
#[derive(Debug, Default)]
pub struct AggregationRound {
    entries: Vec<(String, String)>,
    delivered: bool,
}

impl AggregationRound {
    /// Record a peer's message (last-write-wins on the same identity)
    ///
    /// Once delivery has been claimed the mapping stays cleared: messages
    /// arriving after that point are dropped, not accumulated.
    pub fn record(&mut self, peer: &str, message: String) {
        if self.delivered {
            return;
        }
        if let Some(entry) = self.entries.iter_mut().find(|(id, _)| id == peer) {
            entry.1 = message;
        } else {
            self.entries.push((peer.to_string(), message));
        }
    }

    /// Number of distinct peers recorded
    pub fn peer_count(&self) -> usize {
        self.entries.len()
    }

    /// Whether this round's delivery has already been claimed
    pub fn delivered(&self) -> bool {
        self.delivered
    }

    /// Claim delivery if the barrier is satisfied
    ///
    /// Returns the space-joined payload the first time the recorded peer
    /// count reaches `expected_peers`, clearing the entries and latching
    /// `delivered`; returns `None` ever after. Callers must invoke this
    /// while holding the round's lock so only one task can claim.
    pub fn try_claim(&mut self, expected_peers: usize) -> Option<String> {
        if self.delivered || self.entries.len() < expected_peers {
            return None;
        }
        self.delivered = true;

        let combined = self
            .entries
            .iter()
            .map(|(_, message)| message.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        self.entries.clear();
        Some(combined)
    }
}
