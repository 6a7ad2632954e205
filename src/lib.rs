// SPDX-FileCopyrightText: © 2025 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

pub mod balking;
pub mod config;
pub mod customer;
pub mod error;
pub mod event;
pub mod event_queue;
pub mod output;
pub mod random;
pub mod simulation;
#[cfg(test)]
pub mod tests;
pub mod theory;
pub mod user_config;
pub mod utils;

pub use error::SimulationError;
pub use output::SimulationResult;
pub use simulation::{run, Simulation};
pub use user_config::StopCondition;
