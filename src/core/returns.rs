use std::f64::consts::PI;

use rand::Rng;

use super::history::{US_HISTORY, YearlyReturn};
use super::types::{Allocation, ReturnSource};

/// One simulated year of market conditions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketSample {
    pub portfolio_return: f64,
    pub inflation: f64,
}

/// Yields one year of market conditions per call. The path simulator only
/// sees this seam, so tests can drive it with fixed streams.
pub trait ReturnGenerator {
    fn sample(&mut self, allocation: Allocation) -> MarketSample;
}

impl<G: ReturnGenerator + ?Sized> ReturnGenerator for &mut G {
    fn sample(&mut self, allocation: Allocation) -> MarketSample {
        (**self).sample(allocation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Moments {
    pub mean: f64,
    pub std_dev: f64,
}

impl Moments {
    pub const fn new(mean: f64, std_dev: f64) -> Self {
        Self { mean, std_dev }
    }

    fn scale(self, z: f64) -> f64 {
        self.mean + self.std_dev * z
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParametricAssumptions {
    pub stocks: Moments,
    pub bonds: Moments,
    pub inflation: Moments,
}

impl Default for ParametricAssumptions {
    fn default() -> Self {
        Self {
            stocks: Moments::new(0.07, 0.18),
            bonds: Moments::new(0.02, 0.05),
            inflation: Moments::new(0.03, 0.02),
        }
    }
}

/// Market return generator backed by an injected random source.
pub struct MarketModel<'h, R> {
    source: ReturnSource,
    assumptions: ParametricAssumptions,
    history: &'h [YearlyReturn],
    rng: R,
}

impl<R: Rng> MarketModel<'static, R> {
    pub fn new(source: ReturnSource, rng: R) -> Self {
        Self {
            source,
            assumptions: ParametricAssumptions::default(),
            history: US_HISTORY,
            rng,
        }
    }
}

impl<'h, R: Rng> MarketModel<'h, R> {
    /// Swaps the resampling table. An empty table makes historical draws
    /// fall back to the parametric model.
    pub fn with_history<'a>(self, history: &'a [YearlyReturn]) -> MarketModel<'a, R> {
        MarketModel {
            source: self.source,
            assumptions: self.assumptions,
            history,
            rng: self.rng,
        }
    }

    pub fn with_assumptions(mut self, assumptions: ParametricAssumptions) -> Self {
        self.assumptions = assumptions;
        self
    }

    pub fn source(&self) -> ReturnSource {
        self.source
    }

    fn sample_parametric(&mut self, allocation: Allocation) -> MarketSample {
        let stock = self.assumptions.stocks.scale(standard_normal(&mut self.rng));
        let bond = self.assumptions.bonds.scale(standard_normal(&mut self.rng));
        let inflation = self
            .assumptions
            .inflation
            .scale(standard_normal(&mut self.rng))
            .max(0.0);

        MarketSample {
            portfolio_return: allocation.blend(stock, bond),
            inflation,
        }
    }

    fn sample_historical(&mut self, allocation: Allocation) -> MarketSample {
        if self.history.is_empty() {
            return self.sample_parametric(allocation);
        }
        let row = self.history[self.rng.random_range(0..self.history.len())];
        MarketSample {
            portfolio_return: allocation.blend(row.equity_return, row.bond_return),
            inflation: row.inflation,
        }
    }
}

impl<R: Rng> ReturnGenerator for MarketModel<'_, R> {
    fn sample(&mut self, allocation: Allocation) -> MarketSample {
        match self.source {
            ReturnSource::Parametric => self.sample_parametric(allocation),
            ReturnSource::Historical => self.sample_historical(allocation),
        }
    }
}

/// Box–Muller, cosine branch only: every deviate consumes two fresh uniforms.
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    // random::<f64>() is [0, 1); flip it so ln never sees zero.
    let u1 = 1.0 - rng.random::<f64>();
    let u2 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const EPS: f64 = 1e-12;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sixty_forty() -> Allocation {
        Allocation::new(0.6, 0.4).expect("valid allocation")
    }

    fn zero_vol(stocks: f64, bonds: f64, inflation: f64) -> ParametricAssumptions {
        ParametricAssumptions {
            stocks: Moments::new(stocks, 0.0),
            bonds: Moments::new(bonds, 0.0),
            inflation: Moments::new(inflation, 0.0),
        }
    }

    #[test]
    fn parametric_zero_volatility_returns_weighted_means() {
        let mut model = MarketModel::new(ReturnSource::Parametric, StdRng::seed_from_u64(1))
            .with_assumptions(zero_vol(0.07, 0.02, 0.03));
        let s = model.sample(sixty_forty());
        assert_approx(s.portfolio_return, 0.6 * 0.07 + 0.4 * 0.02);
        assert_approx(s.inflation, 0.03);
    }

    #[test]
    fn parametric_inflation_is_floored_at_zero() {
        let mut model = MarketModel::new(ReturnSource::Parametric, StdRng::seed_from_u64(2))
            .with_assumptions(zero_vol(0.05, 0.01, -0.04));
        for _ in 0..20 {
            assert_eq!(model.sample(sixty_forty()).inflation, 0.0);
        }
    }

    #[test]
    fn parametric_draws_match_default_moments() {
        let allocation = Allocation::new(1.0, 0.0).expect("valid allocation");
        let mut model = MarketModel::new(ReturnSource::Parametric, StdRng::seed_from_u64(42));
        let n = 40_000;
        let draws = (0..n)
            .map(|_| model.sample(allocation).portfolio_return)
            .collect::<Vec<_>>();
        let mean = draws.iter().sum::<f64>() / n as f64;
        let var = draws.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n as f64 - 1.0);
        assert!((mean - 0.07).abs() < 0.01, "mean {mean}");
        assert!((var.sqrt() - 0.18).abs() < 0.01, "sd {}", var.sqrt());
    }

    #[test]
    fn standard_normal_is_centered_with_unit_variance() {
        let mut rng = StdRng::seed_from_u64(7);
        let n = 50_000;
        let draws = (0..n).map(|_| standard_normal(&mut rng)).collect::<Vec<_>>();
        assert!(draws.iter().all(|z| z.is_finite()));
        let mean = draws.iter().sum::<f64>() / n as f64;
        let var = draws.iter().map(|z| (z - mean).powi(2)).sum::<f64>() / n as f64;
        assert!(mean.abs() < 0.02, "mean {mean}");
        assert!((var - 1.0).abs() < 0.03, "var {var}");
    }

    #[test]
    fn historical_single_row_blends_and_keeps_negative_inflation() {
        let table = [YearlyReturn::new(1931, -0.4384, -0.0256, -0.0952)];
        let mut model = MarketModel::new(ReturnSource::Historical, StdRng::seed_from_u64(3))
            .with_history(&table);
        let s = model.sample(sixty_forty());
        assert_approx(s.portfolio_return, 0.6 * -0.4384 + 0.4 * -0.0256);
        assert_approx(s.inflation, -0.0952);
    }

    #[test]
    fn historical_draws_come_from_the_table() {
        let table = [
            YearlyReturn::new(2000, 0.10, 0.00, 0.01),
            YearlyReturn::new(2001, -0.20, 0.05, 0.02),
            YearlyReturn::new(2002, 0.30, 0.10, 0.03),
        ];
        let allocation = Allocation::new(1.0, 0.0).expect("valid allocation");
        let mut model = MarketModel::new(ReturnSource::Historical, StdRng::seed_from_u64(9))
            .with_history(&table);
        let mut seen = [false; 3];
        for _ in 0..200 {
            let s = model.sample(allocation);
            let idx = table
                .iter()
                .position(|row| row.equity_return == s.portfolio_return)
                .expect("sample must match a table row");
            assert_approx(s.inflation, table[idx].inflation);
            seen[idx] = true;
        }
        assert!(seen.iter().all(|&hit| hit));
    }

    #[test]
    fn same_seed_gives_same_stream() {
        let mut a = MarketModel::new(ReturnSource::Parametric, StdRng::seed_from_u64(11));
        let mut b = MarketModel::new(ReturnSource::Parametric, StdRng::seed_from_u64(11));
        for _ in 0..50 {
            assert_eq!(a.sample(sixty_forty()), b.sample(sixty_forty()));
        }
    }
}
