// SPDX-FileCopyrightText: © 2025 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    /// A new customer reaches the system.
    Arrival,
    /// The customer in service leaves the system.
    Departure,
    /// The warm-up period expires.
    WarmupPeriodEnd,
    /// The simulation ends.
    ExperimentEnd,
    /// Print progress.
    Progress(u16),
}

/// For all the events there is the time when it is scheduled to occur.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event {
    /// Simulated time, non-negative.
    pub time: f64,
    pub event_type: EventType,
}

impl Event {
    pub fn new(time: f64, event_type: EventType) -> Self {
        assert!(
            time >= 0.0 && time.is_finite(),
            "invalid event time {} for {:?}",
            time,
            event_type
        );
        Self { time, event_type }
    }

    pub fn time(&self) -> f64 {
        self.time
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.event_type {
            EventType::Arrival => write!(f, "A {}", self.time),
            EventType::Departure => write!(f, "D {}", self.time),
            EventType::WarmupPeriodEnd => write!(f, "W {}", self.time),
            EventType::ExperimentEnd => write!(f, "E {}", self.time),
            EventType::Progress(percentage) => write!(f, "P {} ({}%)", self.time, percentage),
        }
    }
}
