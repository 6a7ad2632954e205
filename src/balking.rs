// SPDX-FileCopyrightText: © 2025 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use crate::customer::CustomerKind;
use crate::random::UniformSource;
use crate::user_config::Balking;

/// Largest admissible value of service normalized to the mean service
/// time, i.e., `service_rate * service_value`.
pub const MAX_NORMALIZED_SERVICE_VALUE: f64 = 1e9;

/// Return Naor's threshold for socially optimal joining in an M/M/1 queue,
/// from "The regulation of queue size by levying tolls" (1969).
///
/// The threshold is the number in system n such that `f(n) <= mu * v <
/// f(n+1)`, where `f(n) = (n(1-rho) - rho(1-rho^n)) / (1-rho)^2` and `v` is
/// the value of service in time units. `f(n)` is computed incrementally as
/// `sum_{k=1..n} sum_{j<k} rho^j`, which also covers `rho = 1`.
/// With `rho < 1`, once `rho^n` is negligible the increments of `f` are
/// constant and the remaining steps are skipped in one go.
///
/// Parameters:
/// - `arrival_rate`: the arrival rate, lambda.
/// - `service_rate`: the service rate, mu.
/// - `service_value`: the value of service, must be non-negative and such
///   that `mu * v` does not exceed `MAX_NORMALIZED_SERVICE_VALUE`.
pub fn naor_threshold(arrival_rate: f64, service_rate: f64, service_value: f64) -> u64 {
    assert!(arrival_rate > 0.0 && service_rate > 0.0);
    assert!(service_value >= 0.0 && service_value.is_finite());

    let rho = arrival_rate / service_rate;
    let center = service_rate * service_value;
    assert!(
        center <= MAX_NORMALIZED_SERVICE_VALUE,
        "normalized service value too large: {}",
        center
    );

    // f(n) and sum_{j<n} rho^j, starting from n = 0.
    // f(n) >= n(n+1)/2 until rho^n vanishes, hence the loop is bounded.
    let mut f = 0.0;
    let mut geometric = 0.0;
    let mut rho_power = 1.0;
    let mut n = 0;
    loop {
        geometric += rho_power;
        rho_power *= rho;
        let f_next = f + geometric;
        if f <= center && center < f_next {
            return n;
        }
        if rho < 1.0 && rho_power <= f64::EPSILON * geometric {
            // f(n + m) = f(n) + m * geometric from now on
            return n + ((center - f) / geometric).floor() as u64;
        }
        f = f_next;
        n += 1;
    }
}

/// Decides which customers join the queue.
#[derive(Debug, Clone)]
pub struct BalkingPolicy {
    selfish_fraction: f64,
    service_value: f64,
    service_rate: f64,
    naor_threshold: u64,
}

impl BalkingPolicy {
    pub fn new(balking: &Balking, arrival_rate: f64, service_rate: f64) -> Self {
        Self {
            selfish_fraction: balking.selfish_fraction,
            service_value: balking.service_value,
            service_rate,
            naor_threshold: naor_threshold(arrival_rate, service_rate, balking.service_value),
        }
    }

    pub fn naor_threshold(&self) -> u64 {
        self.naor_threshold
    }

    pub fn service_value(&self) -> f64 {
        self.service_value
    }

    /// Draw the kind of a new customer.
    /// A uniform value is consumed only if both kinds are possible.
    pub fn draw_kind<U: UniformSource + ?Sized>(&self, source: &mut U) -> CustomerKind {
        if self.selfish_fraction >= 1.0 {
            CustomerKind::Selfish
        } else if self.selfish_fraction <= 0.0 || source.uniform() >= self.selfish_fraction {
            CustomerKind::Optimal
        } else {
            CustomerKind::Selfish
        }
    }

    /// Return true if a customer of the given kind joins a system with
    /// `num_in_system` customers.
    pub fn joins(&self, kind: CustomerKind, num_in_system: u64) -> bool {
        match kind {
            CustomerKind::Basic => true,
            CustomerKind::Selfish => {
                (num_in_system + 1) as f64 / self.service_rate < self.service_value
            }
            CustomerKind::Optimal => num_in_system < self.naor_threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{naor_threshold, BalkingPolicy, MAX_NORMALIZED_SERVICE_VALUE};
    use crate::customer::CustomerKind;
    use crate::user_config::Balking;

    #[test]
    fn test_naor_threshold() {
        // rho = 0.5: f(1) = 1, f(2) = 2.5, f(3) = 4.25
        assert_eq!(0, naor_threshold(1.0, 2.0, 0.25));
        assert_eq!(1, naor_threshold(1.0, 2.0, 0.5));
        assert_eq!(1, naor_threshold(1.0, 2.0, 1.0));
        assert_eq!(2, naor_threshold(1.0, 2.0, 1.25));
        assert_eq!(2, naor_threshold(1.0, 2.0, 1.5));
        assert_eq!(3, naor_threshold(1.0, 2.0, 2.125));

        // rho = 1: f(n) = n(n+1)/2
        assert_eq!(2, naor_threshold(1.0, 1.0, 4.0));
        assert_eq!(3, naor_threshold(1.0, 1.0, 6.0));

        // rho > 1 still grows without bound
        assert_eq!(1, naor_threshold(4.0, 2.0, 1.0));
    }

    #[test]
    fn test_naor_threshold_large_service_value() {
        // rho = 0.5: f(n) = 2n - 2 + 2^(1-n)
        assert_eq!(400_000_001, naor_threshold(1.0, 2.0, 4e8 + 0.25));
        assert_eq!(
            500_000_000,
            naor_threshold(1.0, 2.0, (MAX_NORMALIZED_SERVICE_VALUE - 1.0) / 2.0)
        );

        // rho = 1: n(n+1)/2 <= 1e9 < (n+1)(n+2)/2
        let n = naor_threshold(1.0, 1.0, MAX_NORMALIZED_SERVICE_VALUE);
        assert_eq!(44720, n);

        // rho close to 1 switches from quadratic to linear growth
        let n = naor_threshold(0.999, 1.0, MAX_NORMALIZED_SERVICE_VALUE);
        assert!(n > 1_000_000 && n < 1_002_000, "threshold {}", n);
    }

    #[test]
    #[should_panic]
    fn test_naor_threshold_too_large() {
        let _ = naor_threshold(1.0, 2.0, MAX_NORMALIZED_SERVICE_VALUE);
    }

    #[test]
    fn test_naor_threshold_matches_closed_form() {
        let closed_form = |n: u64, rho: f64| {
            let n = n as f64;
            (n * (1.0 - rho) - rho * (1.0 - rho.powf(n))) / ((1.0 - rho) * (1.0 - rho))
        };
        for (arrival_rate, service_rate, service_value) in
            [(1.0, 2.0, 7.3), (0.3, 1.0, 12.0), (3.0, 2.0, 5.5)]
        {
            let rho = arrival_rate / service_rate;
            let n = naor_threshold(arrival_rate, service_rate, service_value);
            let center = service_rate * service_value;
            assert!(closed_form(n, rho) <= center + 1e-9);
            assert!(center < closed_form(n + 1, rho) + 1e-9);
        }
    }

    #[test]
    fn test_balking_policy_joins() {
        let policy = BalkingPolicy::new(
            &Balking {
                selfish_fraction: 0.5,
                service_value: 1.5,
            },
            1.0,
            2.0,
        );
        assert_eq!(2, policy.naor_threshold());

        // selfish: (n + 1) / 2 < 1.5
        assert!(policy.joins(CustomerKind::Selfish, 0));
        assert!(policy.joins(CustomerKind::Selfish, 1));
        assert!(!policy.joins(CustomerKind::Selfish, 2));

        // optimal: n < 2
        assert!(policy.joins(CustomerKind::Optimal, 1));
        assert!(!policy.joins(CustomerKind::Optimal, 2));

        assert!(policy.joins(CustomerKind::Basic, 1000));
    }

    #[test]
    fn test_balking_policy_draw_kind() {
        let mut source = crate::tests::ScriptedSource::new(&[0.2, 0.8]);
        let mixed = BalkingPolicy::new(
            &Balking {
                selfish_fraction: 0.5,
                service_value: 3.0,
            },
            1.0,
            2.0,
        );
        assert_eq!(CustomerKind::Selfish, mixed.draw_kind(&mut source));
        assert_eq!(CustomerKind::Optimal, mixed.draw_kind(&mut source));
        assert_eq!(2, source.num_draws());

        let selfish_only = BalkingPolicy::new(
            &Balking {
                selfish_fraction: 1.0,
                service_value: 3.0,
            },
            1.0,
            2.0,
        );
        assert_eq!(CustomerKind::Selfish, selfish_only.draw_kind(&mut source));
        let optimal_only = BalkingPolicy::new(
            &Balking {
                selfish_fraction: 0.0,
                service_value: 3.0,
            },
            1.0,
            2.0,
        );
        assert_eq!(CustomerKind::Optimal, optimal_only.draw_kind(&mut source));
        assert_eq!(2, source.num_draws());
    }
}
