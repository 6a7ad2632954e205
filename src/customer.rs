// SPDX-FileCopyrightText: © 2025 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use crate::utils::CsvFriend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CustomerKind {
    /// Always joins the queue.
    Basic,
    /// Joins if the expected sojourn time is smaller than the service value.
    Selfish,
    /// Joins if the number in system is below Naor's threshold.
    Optimal,
}

impl std::fmt::Display for CustomerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                CustomerKind::Basic => "basic",
                CustomerKind::Selfish => "selfish",
                CustomerKind::Optimal => "optimal",
            }
        )
    }
}

/// A customer admitted to the system.
#[derive(Debug, Clone)]
pub struct Customer {
    /// Sequential identifier, in order of arrival.
    pub id: u64,
    pub kind: CustomerKind,
    pub arrival_time: f64,
    /// Set when the customer reaches the server.
    pub service_start: Option<f64>,
    /// Set together with `service_start`.
    pub service_time: f64,
    /// True if the customer arrived after the warm-up period.
    pub measured: bool,
}

impl Customer {
    pub fn new(id: u64, kind: CustomerKind, arrival_time: f64, measured: bool) -> Self {
        Self {
            id,
            kind,
            arrival_time,
            service_start: None,
            service_time: 0.0,
            measured,
        }
    }

    /// Start the service at `now`, lasting `service_time`.
    /// Return the time when the service ends.
    pub fn start_service(&mut self, now: f64, service_time: f64) -> f64 {
        assert!(
            self.service_start.is_none(),
            "customer {} started service twice",
            self.id
        );
        assert!(now >= self.arrival_time);
        self.service_start = Some(now);
        self.service_time = service_time;
        now + service_time
    }

    /// Return the record of a customer that has started service.
    pub fn record(&self) -> CustomerRecord {
        let service_start = self
            .service_start
            .unwrap_or_else(|| panic!("customer {} has not been served", self.id));
        CustomerRecord {
            id: self.id,
            kind: self.kind,
            arrival_time: self.arrival_time,
            service_start,
            service_time: self.service_time,
        }
    }
}

/// Timeline of a customer that completed service.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CustomerRecord {
    pub id: u64,
    pub kind: CustomerKind,
    pub arrival_time: f64,
    pub service_start: f64,
    pub service_time: f64,
}

impl CustomerRecord {
    pub fn wait(&self) -> f64 {
        self.service_start - self.arrival_time
    }

    pub fn service_end(&self) -> f64 {
        self.service_start + self.service_time
    }

    /// Time spent in the system, i.e., wait plus service.
    pub fn sojourn(&self) -> f64 {
        self.wait() + self.service_time
    }
}

impl CsvFriend for CustomerRecord {
    fn header(&self) -> String {
        String::from("customer,kind,arrival_time,wait,service_start,service_time,service_end")
    }
    fn to_csv(&self) -> String {
        format!(
            "{},{},{},{},{},{},{}",
            self.id,
            self.kind,
            self.arrival_time,
            self.wait(),
            self.service_start,
            self.service_time,
            self.service_end()
        )
    }
}
