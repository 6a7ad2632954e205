// SPDX-FileCopyrightText: © 2025 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

/// Source of values uniformly distributed in the open interval (0, 1).
pub trait UniformSource {
    fn uniform(&mut self) -> f64;
}

impl<R: rand::Rng + ?Sized> UniformSource for R {
    fn uniform(&mut self) -> f64 {
        self.sample(rand_distr::Open01)
    }
}

/// Exponentially distributed r.v., sampled by inverse-CDF transform.
#[derive(Debug, Clone, Copy)]
pub struct Exponential {
    rate: f64,
}

impl Exponential {
    /// Create an exponential r.v. with given rate, i.e., 1 / mean.
    pub fn new(rate: f64) -> Self {
        assert!(
            rate > 0.0 && rate.is_finite(),
            "invalid exponential rate {}",
            rate
        );
        Self { rate }
    }

    /// Draw a sample as `-ln(U) / rate`.
    pub fn sample<U: UniformSource + ?Sized>(&self, source: &mut U) -> f64 {
        -source.uniform().ln() / self.rate
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::{Exponential, UniformSource};

    #[test]
    fn test_exponential_inverse_cdf() {
        let mut source = crate::tests::ScriptedSource::new(&[0.5, 0.3, 0.7, 0.2]);
        let rv = Exponential::new(2.0);
        assert_float_eq::assert_f64_near!(2.0_f64.ln() / 2.0, rv.sample(&mut source));
        assert_float_eq::assert_f64_near!(-(0.3_f64.ln()) / 2.0, rv.sample(&mut source));
        assert_float_eq::assert_f64_near!(-(0.7_f64.ln()) / 2.0, rv.sample(&mut source));
        assert_float_eq::assert_f64_near!(-(0.2_f64.ln()) / 2.0, rv.sample(&mut source));
    }

    #[test]
    fn test_exponential_mean() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let rv = Exponential::new(4.0);
        let num_samples = 100000;
        let mut sum = 0.0;
        for _ in 0..num_samples {
            let value = rv.sample(&mut rng);
            assert!(value > 0.0 && value.is_finite());
            sum += value;
        }
        let mean = sum / num_samples as f64;
        assert!((mean - 0.25).abs() < 0.01, "mean {}", mean);
    }

    #[test]
    fn test_uniform_open_interval() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(0);
        for _ in 0..10000 {
            let u = rng.uniform();
            assert!(u > 0.0 && u < 1.0);
        }
    }

    #[test]
    #[should_panic]
    fn test_exponential_zero_rate() {
        let _ = Exponential::new(0.0);
    }
}
