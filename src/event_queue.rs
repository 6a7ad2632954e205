// SPDX-FileCopyrightText: © 2025 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use crate::event::Event;

/// Event with its insertion sequence number, used to break ties.
struct Scheduled {
    seq: u64,
    event: Event,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    // BinaryHeap is a max-heap: the earliest time, then the lowest sequence
    // number, must compare as the greatest element.
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .event
            .time
            .total_cmp(&self.event.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Pending events in non-decreasing time order, FIFO among equal times.
#[derive(Default)]
pub struct EventQueue {
    queue: std::collections::BinaryHeap<Scheduled>,
    next_seq: u64,
}

impl EventQueue {
    pub fn push(&mut self, event: Event) {
        self.queue.push(Scheduled {
            seq: self.next_seq,
            event,
        });
        self.next_seq += 1;
    }
    pub fn pop(&mut self) -> Option<Event> {
        self.queue.pop().map(|x| x.event)
    }
    pub fn len(&self) -> usize {
        self.queue.len()
    }
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::EventQueue;
    use crate::event::{Event, EventType};

    #[test]
    fn test_event_queue_time_order() {
        let mut events = EventQueue::default();
        assert!(events.is_empty());
        for time in [3.0, 0.5, 2.0, 0.0, 1.5] {
            events.push(Event::new(time, EventType::Arrival));
        }
        assert_eq!(5, events.len());

        let mut times = vec![];
        while let Some(event) = events.pop() {
            times.push(event.time());
        }
        assert_eq!(vec![0.0, 0.5, 1.5, 2.0, 3.0], times);
        assert!(events.pop().is_none());
    }

    #[test]
    fn test_event_queue_fifo_ties() {
        let mut events = EventQueue::default();
        events.push(Event::new(1.0, EventType::ExperimentEnd));
        events.push(Event::new(1.0, EventType::Arrival));
        events.push(Event::new(0.5, EventType::Progress(50)));
        events.push(Event::new(1.0, EventType::Departure));

        assert_eq!(EventType::Progress(50), events.pop().unwrap().event_type);
        assert_eq!(EventType::ExperimentEnd, events.pop().unwrap().event_type);
        assert_eq!(EventType::Arrival, events.pop().unwrap().event_type);
        assert_eq!(EventType::Departure, events.pop().unwrap().event_type);
    }

    #[test]
    #[should_panic]
    fn test_event_negative_time() {
        let _ = Event::new(-1.0, EventType::Arrival);
    }
}
