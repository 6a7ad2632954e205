// SPDX-FileCopyrightText: © 2025 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulationError {
    /// A user parameter is out of its admissible range.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// No customer completed service while statistics were collected, hence
    /// wait-based metrics and ratios are undefined.
    #[error("no customer served in a measurement window of {elapsed} time units")]
    DegenerateResult { elapsed: f64 },
}

impl SimulationError {
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
