//! Correlation ids and connection ids
//!
//! Both are plain counters. A correlation id pairs a BEGIN event with its
//! HANDLE event; a connection id names one transport-layer endpoint.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier pairing a BEGIN event with its eventual HANDLE event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CorrelationId(u64);

impl CorrelationId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Correlation id generator
///
/// Starts at 0 and never hands out the same value twice. Ids are unique per
/// generator only: every server owns a fresh one by default, so two servers
/// in one process produce overlapping ids. Wrap one generator in an `Arc` and
/// pass it to each server when ids must be unique across the process.
#[derive(Debug)]
pub struct CorrelationIdGenerator {
    next_id: AtomicU64,
}

impl CorrelationIdGenerator {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Generator whose first id is `first`
    pub fn starting_at(first: u64) -> Self {
        Self {
            next_id: AtomicU64::new(first),
        }
    }

    /// Generate the next id
    pub fn next(&self) -> CorrelationId {
        CorrelationId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// The id the next call to [`next`](Self::next) will return
    pub fn peek(&self) -> CorrelationId {
        CorrelationId(self.next_id.load(Ordering::Relaxed))
    }
}

impl Default for CorrelationIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Connection unique identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Connection id generator, starting at 1
#[derive(Debug)]
pub struct ConnectionIdGenerator {
    next_id: AtomicU64,
}

impl ConnectionIdGenerator {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
        }
    }

    pub fn next(&self) -> ConnectionId {
        ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_correlation_ids_start_at_zero() {
        let ids = CorrelationIdGenerator::new();
        assert_eq!(ids.next().value(), 0);
        assert_eq!(ids.next().value(), 1);
    }

    #[test]
    fn test_correlation_ids_distinct_and_increasing() {
        let ids = CorrelationIdGenerator::new();
        let generated: Vec<CorrelationId> = (0..1000).map(|_| ids.next()).collect();

        assert!(generated.windows(2).all(|w| w[0] < w[1]));
        let unique: HashSet<_> = generated.iter().copied().collect();
        assert_eq!(unique.len(), generated.len());
    }

    #[test]
    fn test_peek_does_not_advance() {
        let ids = CorrelationIdGenerator::starting_at(41);
        assert_eq!(ids.peek().value(), 41);
        assert_eq!(ids.next().value(), 41);
        assert_eq!(ids.peek().value(), 42);
    }

    #[test]
    fn test_shared_generator_across_threads() {
        let ids = std::sync::Arc::new(CorrelationIdGenerator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ids = ids.clone();
                std::thread::spawn(move || (0..250).map(|_| ids.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut all = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(all.insert(id));
            }
        }
        assert_eq!(all.len(), 1000);
    }

    #[test]
    fn test_connection_id() {
        let id1 = ConnectionId::new(1);
        let id2 = ConnectionId::new(2);
        assert_ne!(id1, id2);
        assert_eq!(id1.value(), 1);
        assert_eq!(id2.to_string(), "2");
    }

    #[test]
    fn test_connection_id_generator() {
        let generator = ConnectionIdGenerator::new();
        assert_eq!(generator.next().value(), 1);
        assert_eq!(generator.next().value(), 2);
    }
}
