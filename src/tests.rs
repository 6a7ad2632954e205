// SPDX-FileCopyrightText: © 2025 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

/// Uniform source replaying a fixed sequence of values, cyclically.
pub struct ScriptedSource {
    values: Vec<f64>,
    num_draws: usize,
}

impl ScriptedSource {
    pub fn new(values: &[f64]) -> Self {
        assert!(!values.is_empty());
        assert!(values.iter().all(|x| *x > 0.0 && *x < 1.0));
        Self {
            values: values.to_vec(),
            num_draws: 0,
        }
    }

    pub fn num_draws(&self) -> usize {
        self.num_draws
    }
}

impl crate::random::UniformSource for ScriptedSource {
    fn uniform(&mut self) -> f64 {
        let value = self.values[self.num_draws % self.values.len()];
        self.num_draws += 1;
        value
    }
}

pub fn config(seed: u64, user_config: crate::user_config::UserConfig) -> crate::config::Config {
    crate::config::Config { seed, user_config }
}
