// SPDX-FileCopyrightText: © 2025 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use crate::error::SimulationError;

/// When the simulation ends.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum StopCondition {
    /// Stop when the simulated time reaches the given value.
    MaxTime(f64),
    /// Stop when the given number of measured customers have been served.
    MaxCustomers(u64),
}

/// Balking customers, which may decline to join the queue.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Balking {
    /// Probability that an arriving customer is selfish, otherwise it
    /// follows the socially optimal threshold.
    pub selfish_fraction: f64,
    /// Value of service, in time units.
    pub service_value: f64,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct UserConfig {
    /// Arrival rate of customers, lambda.
    pub arrival_rate: f64,
    /// Service rate, mu.
    pub service_rate: f64,
    /// Stop condition.
    pub stop_condition: StopCondition,
    /// The warm-up period, in time units.
    #[serde(default)]
    pub warmup_period: f64,
    /// Balking behavior, none if all customers join.
    #[serde(default)]
    pub balking: Option<Balking>,
    /// Keep the system state over time and the served customers.
    #[serde(default)]
    pub save_trace: bool,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            arrival_rate: 1.0,
            service_rate: 2.0,
            stop_condition: StopCondition::MaxTime(1000.0),
            warmup_period: 0.0,
            balking: None,
            save_trace: false,
        }
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), SimulationError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(SimulationError::invalid(
            name,
            format!("must be positive and finite, found {}", value),
        ))
    }
}

impl UserConfig {
    pub fn new(arrival_rate: f64, service_rate: f64, stop_condition: StopCondition) -> Self {
        Self {
            arrival_rate,
            service_rate,
            stop_condition,
            ..Default::default()
        }
    }

    /// Check that all parameters are admissible.
    pub fn validate(&self) -> Result<(), SimulationError> {
        positive("arrival_rate", self.arrival_rate)?;
        positive("service_rate", self.service_rate)?;
        match self.stop_condition {
            StopCondition::MaxTime(max_time) => positive("max_time", max_time)?,
            StopCondition::MaxCustomers(max_customers) => {
                if max_customers == 0 {
                    return Err(SimulationError::invalid("max_customers", "must be positive"));
                }
            }
        }
        if !(self.warmup_period >= 0.0 && self.warmup_period.is_finite()) {
            return Err(SimulationError::invalid(
                "warmup_period",
                format!("must be non-negative and finite, found {}", self.warmup_period),
            ));
        }
        if let StopCondition::MaxTime(max_time) = self.stop_condition {
            if self.warmup_period >= max_time {
                return Err(SimulationError::invalid(
                    "warmup_period",
                    format!(
                        "must be smaller than the simulation duration {}, found {}",
                        max_time, self.warmup_period
                    ),
                ));
            }
        }
        if let Some(balking) = &self.balking {
            if !(0.0..=1.0).contains(&balking.selfish_fraction) {
                return Err(SimulationError::invalid(
                    "selfish_fraction",
                    format!("must be in [0, 1], found {}", balking.selfish_fraction),
                ));
            }
            positive("service_value", balking.service_value)?;
            if self.service_rate * balking.service_value <= 1.0 {
                return Err(SimulationError::invalid(
                    "service_value",
                    format!(
                        "no customer would ever join with service rate {} and value {}",
                        self.service_rate, balking.service_value
                    ),
                ));
            }
            if self.service_rate * balking.service_value
                > crate::balking::MAX_NORMALIZED_SERVICE_VALUE
            {
                return Err(SimulationError::invalid(
                    "service_value",
                    format!(
                        "service rate {} times value {} exceeds {}",
                        self.service_rate,
                        balking.service_value,
                        crate::balking::MAX_NORMALIZED_SERVICE_VALUE
                    ),
                ));
            }
        }
        Ok(())
    }

    pub fn header() -> String {
        String::from("arrival_rate,service_rate,max_time,max_customers,warmup_period,selfish_fraction,service_value")
    }

    pub fn to_csv(&self) -> String {
        let (max_time, max_customers) = match self.stop_condition {
            StopCondition::MaxTime(max_time) => (max_time.to_string(), String::default()),
            StopCondition::MaxCustomers(num) => (String::default(), num.to_string()),
        };
        let (selfish_fraction, service_value) = match &self.balking {
            Some(balking) => (
                balking.selfish_fraction.to_string(),
                balking.service_value.to_string(),
            ),
            None => (String::default(), String::default()),
        };
        format!(
            "{},{},{},{},{},{},{}",
            self.arrival_rate,
            self.service_rate,
            max_time,
            max_customers,
            self.warmup_period,
            selfish_fraction,
            service_value
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{Balking, StopCondition, UserConfig};
    use crate::error::SimulationError;

    fn invalid_name(user_config: &UserConfig) -> &'static str {
        match user_config.validate() {
            Err(SimulationError::InvalidParameter { name, .. }) => name,
            res => panic!("unexpected validation result: {:?}", res),
        }
    }

    #[test]
    fn test_user_config_validate() {
        assert!(UserConfig::default().validate().is_ok());

        let mut user_config = UserConfig::default();
        user_config.arrival_rate = 0.0;
        assert_eq!("arrival_rate", invalid_name(&user_config));

        let mut user_config = UserConfig::default();
        user_config.service_rate = -1.0;
        assert_eq!("service_rate", invalid_name(&user_config));

        let mut user_config = UserConfig::default();
        user_config.service_rate = f64::NAN;
        assert_eq!("service_rate", invalid_name(&user_config));

        let user_config = UserConfig::new(1.0, 2.0, StopCondition::MaxTime(0.0));
        assert_eq!("max_time", invalid_name(&user_config));

        let user_config = UserConfig::new(1.0, 2.0, StopCondition::MaxCustomers(0));
        assert_eq!("max_customers", invalid_name(&user_config));

        let mut user_config = UserConfig::new(1.0, 2.0, StopCondition::MaxTime(10.0));
        user_config.warmup_period = 10.0;
        assert_eq!("warmup_period", invalid_name(&user_config));
        user_config.warmup_period = -1.0;
        assert_eq!("warmup_period", invalid_name(&user_config));

        let mut user_config = UserConfig::new(1.0, 2.0, StopCondition::MaxCustomers(10));
        user_config.warmup_period = 100.0;
        assert!(user_config.validate().is_ok());
    }

    #[test]
    fn test_user_config_validate_balking() {
        let mut user_config = UserConfig::default();
        user_config.balking = Some(Balking {
            selfish_fraction: 1.5,
            service_value: 2.0,
        });
        assert_eq!("selfish_fraction", invalid_name(&user_config));

        user_config.balking = Some(Balking {
            selfish_fraction: 0.5,
            service_value: 0.0,
        });
        assert_eq!("service_value", invalid_name(&user_config));

        // mu * v = 1: nobody joins an empty system
        user_config.balking = Some(Balking {
            selfish_fraction: 0.5,
            service_value: 0.5,
        });
        assert_eq!("service_value", invalid_name(&user_config));

        // mu * v = 2e17: the threshold would take forever to compute
        user_config.balking = Some(Balking {
            selfish_fraction: 0.5,
            service_value: 1e17,
        });
        assert_eq!("service_value", invalid_name(&user_config));
        user_config.balking = Some(Balking {
            selfish_fraction: 0.5,
            service_value: 1e9,
        });
        assert_eq!("service_value", invalid_name(&user_config));

        user_config.balking = Some(Balking {
            selfish_fraction: 0.5,
            service_value: 2.0,
        });
        assert!(user_config.validate().is_ok());
        user_config.balking = Some(Balking {
            selfish_fraction: 0.5,
            service_value: 5e8,
        });
        assert!(user_config.validate().is_ok());
    }

    #[test]
    fn test_user_config_from_json() -> anyhow::Result<()> {
        let user_config: UserConfig = serde_json::from_str(
            r#"{
                "arrival_rate": 0.5,
                "service_rate": 1.0,
                "stop_condition": { "MaxCustomers": 100 },
                "balking": { "selfish_fraction": 0.25, "service_value": 4.0 }
            }"#,
        )?;
        assert_eq!(StopCondition::MaxCustomers(100), user_config.stop_condition);
        assert_eq!(0.0, user_config.warmup_period);
        assert!(!user_config.save_trace);
        assert_eq!("0.5,1,,100,0,0.25,4", user_config.to_csv());
        assert_eq!(
            UserConfig::header().split(',').count(),
            user_config.to_csv().split(',').count()
        );
        Ok(())
    }
}
