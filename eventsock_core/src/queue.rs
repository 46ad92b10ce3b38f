//! Event queue
//!
//! Insertion-ordered buffer between completion handlers (producers) and the
//! application (consumer). Never reorders, never drops.

use crate::event::Event;
use crate::transport::TransportKind;
use std::collections::VecDeque;

#[derive(Debug)]
pub struct EventQueue<C> {
    transport: TransportKind,
    events: VecDeque<Event<C>>,
}

impl<C> EventQueue<C> {
    pub fn new(transport: TransportKind) -> Self {
        Self {
            transport,
            events: VecDeque::new(),
        }
    }

    pub fn push(&mut self, event: Event<C>) {
        self.events.push_back(event);
    }

    /// Oldest event, or `None` when empty
    pub fn pop(&mut self) -> Option<Event<C>> {
        self.events.pop_front()
    }

    /// Oldest event, or the null event when empty
    pub fn poll(&mut self) -> Event<C> {
        let transport = self.transport;
        self.pop().unwrap_or_else(|| Event::none(transport))
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event<C>> {
        self.events.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use crate::id::CorrelationId;

    fn event(kind: EventKind, id: u64) -> Event<()> {
        Event::new(kind, TransportKind::Stream, CorrelationId::new(id))
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = EventQueue::new(TransportKind::Stream);
        queue.push(event(EventKind::AcceptBegin, 0));
        queue.push(event(EventKind::AcceptHandle, 0));
        queue.push(event(EventKind::ReadBegin, 1));

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.poll().kind(), EventKind::AcceptBegin);
        assert_eq!(queue.poll().kind(), EventKind::AcceptHandle);
        assert_eq!(queue.poll().kind(), EventKind::ReadBegin);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_poll_empty_is_idempotent() {
        let mut queue: EventQueue<()> = EventQueue::new(TransportKind::Datagram);
        for _ in 0..3 {
            let event = queue.poll();
            assert!(event.is_none());
            assert_eq!(event.transport(), TransportKind::Datagram);
            assert_eq!(queue.len(), 0);
        }
    }

    #[test]
    fn test_pop_after_drain() {
        let mut queue = EventQueue::new(TransportKind::Stream);
        queue.push(event(EventKind::SendBegin, 4));
        assert!(queue.pop().is_some());
        assert!(queue.pop().is_none());
    }
}
