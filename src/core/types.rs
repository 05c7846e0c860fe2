use serde::Serialize;

use super::error::ParamsError;

const ALLOCATION_TOLERANCE: f64 = 1e-6;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnSource {
    #[default]
    Parametric,
    Historical,
}

/// What happens to the working balance once a path has run out of money.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Keep compounding the unfloored (negative) balance for the remaining years.
    #[default]
    ContinueCompounding,
    /// Pin the working balance at zero from the failure year onwards.
    FreezeAtZero,
}

/// Stock/bond split. Both fractions lie in `[0, 1]` and sum to one.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    stocks: f64,
    bonds: f64,
}

impl Allocation {
    pub fn new(stocks: f64, bonds: f64) -> Result<Self, ParamsError> {
        for (asset, fraction) in [("stock", stocks), ("bond", bonds)] {
            if !fraction.is_finite() || !(0.0..=1.0).contains(&fraction) {
                return Err(ParamsError::AllocationOutOfRange { asset, fraction });
            }
        }
        let total = stocks + bonds;
        if (total - 1.0).abs() > ALLOCATION_TOLERANCE {
            return Err(ParamsError::AllocationSum { total });
        }
        Ok(Self { stocks, bonds })
    }

    pub fn stocks(self) -> f64 {
        self.stocks
    }

    pub fn bonds(self) -> f64 {
        self.bonds
    }

    pub fn blend(self, stock_return: f64, bond_return: f64) -> f64 {
        self.stocks * stock_return + self.bonds * bond_return
    }
}

#[derive(Debug, Clone)]
pub struct SimulationParams {
    pub initial_portfolio: f64,
    pub annual_withdrawal: f64,
    pub retirement_years: u32,
    pub allocation: Allocation,
    pub simulations: u32,
    pub return_source: ReturnSource,
    pub failure_policy: FailurePolicy,
    pub seed: Option<u64>,
}

impl SimulationParams {
    pub fn validate(&self) -> Result<(), ParamsError> {
        if !self.initial_portfolio.is_finite() || self.initial_portfolio < 0.0 {
            return Err(ParamsError::NegativeAmount {
                field: "initial portfolio",
                value: self.initial_portfolio,
            });
        }
        if !self.annual_withdrawal.is_finite() || self.annual_withdrawal < 0.0 {
            return Err(ParamsError::NegativeAmount {
                field: "annual withdrawal",
                value: self.annual_withdrawal,
            });
        }
        if self.retirement_years == 0 {
            return Err(ParamsError::ZeroYears);
        }
        if self.simulations == 0 {
            return Err(ParamsError::ZeroSimulations);
        }
        Ok(())
    }
}

/// Index of a path inside [`SimulationResult::paths`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(transparent)]
pub struct PathId(pub usize);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationPath {
    /// Recorded balances, floored at zero. Index 0 is the starting balance.
    pub portfolio_values: Vec<f64>,
    pub withdrawals: Vec<f64>,
    pub success: bool,
    /// First year (1-based) whose pre-floor balance reached zero or below.
    pub failure_year: Option<u32>,
    pub final_balance: f64,
}

impl SimulationPath {
    pub fn years(&self) -> usize {
        self.withdrawals.len()
    }
}

/// Path indices sorted ascending by final balance. Equal balances keep
/// generation order.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedView {
    order: Vec<usize>,
}

impl RankedView {
    pub fn new(paths: &[SimulationPath]) -> Self {
        let mut order = (0..paths.len()).collect::<Vec<_>>();
        order.sort_by(|&a, &b| paths[a].final_balance.total_cmp(&paths[b].final_balance));
        Self { order }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Path at rank `floor(n * fraction)`, clamped to the last rank.
    pub fn at_fraction(&self, fraction: f64) -> Option<PathId> {
        if self.order.is_empty() {
            return None;
        }
        let n = self.order.len();
        let rank = ((n as f64 * fraction).floor() as usize).min(n - 1);
        Some(PathId(self.order[rank]))
    }

    pub fn ascending(&self) -> impl Iterator<Item = PathId> + '_ {
        self.order.iter().map(|&idx| PathId(idx))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyBand {
    pub year: u32,
    pub p5_balance: f64,
    pub median_balance: f64,
    pub p95_balance: f64,
}

#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub success_rate: f64,
    pub success_count: u32,
    pub total_simulations: u32,
    pub median_ending_balance: f64,
    pub worst_case_balance: f64,
    pub best_case_balance: f64,
    pub success_ci_half_width: f64,
    pub median_path: PathId,
    pub yearly_bands: Vec<YearlyBand>,
    pub ranked: RankedView,
    /// Every generated path, in generation order.
    pub paths: Vec<SimulationPath>,
}

impl SimulationResult {
    pub fn path(&self, id: PathId) -> &SimulationPath {
        &self.paths[id.0]
    }

    pub fn median(&self) -> &SimulationPath {
        self.path(self.median_path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleRunSelection {
    pub best_case: PathId,
    pub worst_case: PathId,
    pub median: PathId,
    pub random_success: Option<PathId>,
    pub random_failure: Option<PathId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearDetail {
    pub year: u32,
    pub starting_balance: f64,
    pub market_return: f64,
    pub withdrawal: f64,
    pub ending_balance: f64,
}
