// SPDX-FileCopyrightText: © 2025 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

/// Steady-state figures of an M/M/1 queue without balking.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Mm1Theory {
    /// Server utilization, rho = lambda / mu.
    pub utilization: f64,
    /// Mean number in system, L.
    pub mean_number_in_system: f64,
    /// Mean number waiting, Lq.
    pub mean_queue_length: f64,
    /// Mean time in system, W.
    pub mean_system_time: f64,
    /// Mean waiting time, Wq.
    pub mean_wait_time: f64,
}

impl Mm1Theory {
    /// Return None if the queue is not stable, i.e., lambda >= mu.
    pub fn new(arrival_rate: f64, service_rate: f64) -> Option<Self> {
        if arrival_rate <= 0.0 || service_rate <= 0.0 || arrival_rate >= service_rate {
            return None;
        }
        let rho = arrival_rate / service_rate;
        Some(Self {
            utilization: rho,
            mean_number_in_system: rho / (1.0 - rho),
            mean_queue_length: rho * rho / (1.0 - rho),
            mean_system_time: 1.0 / (service_rate - arrival_rate),
            mean_wait_time: rho / (service_rate - arrival_rate),
        })
    }
}
