use std::collections::VecDeque;

/// Default number of retained events; older ones are discarded first.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// One recorded event with its position in the global emission order.
#[derive(Debug, Clone, PartialEq)]
pub struct Event<E> {
    pub seq: u64,
    pub kind: E,
}

/// Ordered, bounded log of state-transition events.
///
/// Sequence numbers keep increasing across `drain` calls so two snapshots can
/// always be ordered against each other.
#[derive(Debug)]
pub struct EventBus<E> {
    events: VecDeque<Event<E>>,
    next_seq: u64,
    capacity: usize,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::new(),
            next_seq: 0,
            capacity: capacity.max(1),
        }
    }

    /// Records `kind` and returns its sequence number.
    pub fn emit(&mut self, kind: E) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(Event { seq, kind });
        seq
    }

    pub fn events(&self) -> impl Iterator<Item = &Event<E>> + '_ {
        self.events.iter()
    }

    pub fn last(&self) -> Option<&Event<E>> {
        self.events.back()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn drain(&mut self) -> Vec<Event<E>> {
        self.events.drain(..).collect()
    }
}
