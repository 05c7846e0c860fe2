use std::time::Instant;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info};

use super::error::ParamsError;
use super::returns::{MarketModel, ReturnGenerator};
use super::types::{
    FailurePolicy, RankedView, SimulationParams, SimulationPath, SimulationResult, YearlyBand,
};

pub const WORST_CASE_FRACTION: f64 = 0.05;
pub const MEDIAN_FRACTION: f64 = 0.5;
pub const BEST_CASE_FRACTION: f64 = 0.95;

/// Stream ids split off the caller's seed so market draws and sample
/// picking never share a generator.
pub const MARKET_STREAM: u64 = 0;
pub const SELECTION_STREAM: u64 = 1;

/// Runs the full Monte Carlo with the built-in market model, seeded from
/// `params.seed` or from OS entropy.
pub fn run_simulation(params: &SimulationParams) -> Result<SimulationResult, ParamsError> {
    params.validate()?;
    let mut model = MarketModel::new(params.return_source, seeded_rng(params.seed, MARKET_STREAM));
    debug!(
        source = ?model.source(),
        seeded = params.seed.is_some(),
        "market model ready"
    );
    run_simulation_with(params, &mut model)
}

/// Runs exactly `params.simulations` paths against `generator` and
/// aggregates them. Paths keep generation order.
pub fn run_simulation_with<G: ReturnGenerator + ?Sized>(
    params: &SimulationParams,
    generator: &mut G,
) -> Result<SimulationResult, ParamsError> {
    params.validate()?;
    debug!(
        simulations = params.simulations,
        years = params.retirement_years,
        initial_portfolio = params.initial_portfolio,
        annual_withdrawal = params.annual_withdrawal,
        policy = ?params.failure_policy,
        "starting Monte Carlo run"
    );

    let started = Instant::now();
    let paths = (0..params.simulations)
        .map(|_| simulate_path(params, generator))
        .collect::<Vec<_>>();
    let result = build_result(paths)?;

    info!(
        success_rate = result.success_rate,
        median_ending_balance = result.median_ending_balance,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Monte Carlo run complete"
    );
    Ok(result)
}

pub fn simulate_path<G: ReturnGenerator + ?Sized>(
    params: &SimulationParams,
    generator: &mut G,
) -> SimulationPath {
    let years = params.retirement_years as usize;
    let freeze = params.failure_policy == FailurePolicy::FreezeAtZero;

    let mut portfolio_values = Vec::with_capacity(years + 1);
    let mut withdrawals = Vec::with_capacity(years);
    let mut portfolio = params.initial_portfolio;
    let mut withdrawal = params.annual_withdrawal;
    let mut failure_year = None;

    portfolio_values.push(portfolio.max(0.0));

    for year in 1..=params.retirement_years {
        let sampled = generator.sample(params.allocation);
        let frozen = freeze && failure_year.is_some();

        if !frozen {
            portfolio *= 1.0 + sampled.portfolio_return;
        }
        withdrawal *= 1.0 + sampled.inflation;
        if !frozen {
            portfolio -= withdrawal;
        }

        portfolio_values.push(portfolio.max(0.0));
        withdrawals.push(withdrawal);

        if portfolio <= 0.0 && failure_year.is_none() {
            failure_year = Some(year);
            if freeze {
                portfolio = 0.0;
            }
        }
    }

    SimulationPath {
        portfolio_values,
        withdrawals,
        success: portfolio > 0.0,
        failure_year,
        final_balance: portfolio.max(0.0),
    }
}

fn build_result(paths: Vec<SimulationPath>) -> Result<SimulationResult, ParamsError> {
    let ranked = RankedView::new(&paths);
    let (Some(worst), Some(median), Some(best)) = (
        ranked.at_fraction(WORST_CASE_FRACTION),
        ranked.at_fraction(MEDIAN_FRACTION),
        ranked.at_fraction(BEST_CASE_FRACTION),
    ) else {
        return Err(ParamsError::ZeroSimulations);
    };

    let total = paths.len() as u32;
    let success_count = paths.iter().filter(|p| p.success).count() as u32;
    let success_fraction = success_count as f64 / total as f64;

    Ok(SimulationResult {
        success_rate: 100.0 * success_fraction,
        success_count,
        total_simulations: total,
        median_ending_balance: paths[median.0].final_balance,
        worst_case_balance: paths[worst.0].final_balance,
        best_case_balance: paths[best.0].final_balance,
        success_ci_half_width: 100.0 * binomial_ci_half_width(success_fraction, total),
        median_path: median,
        yearly_bands: yearly_bands(&paths),
        ranked,
        paths,
    })
}

fn yearly_bands(paths: &[SimulationPath]) -> Vec<YearlyBand> {
    let Some(width) = paths.iter().map(|p| p.portfolio_values.len()).min() else {
        return Vec::new();
    };

    let mut column = Vec::with_capacity(paths.len());
    (0..width)
        .map(|idx| {
            column.clear();
            column.extend(paths.iter().map(|p| p.portfolio_values[idx]));
            column.sort_by(|a, b| a.total_cmp(b));
            YearlyBand {
                year: idx as u32,
                p5_balance: nearest_rank(&column, WORST_CASE_FRACTION),
                median_balance: nearest_rank(&column, MEDIAN_FRACTION),
                p95_balance: nearest_rank(&column, BEST_CASE_FRACTION),
            }
        })
        .collect()
}

/// Order statistic at `floor(n * fraction)` of an ascending slice.
fn nearest_rank(sorted: &[f64], fraction: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = ((sorted.len() as f64 * fraction).floor() as usize).min(sorted.len() - 1);
    sorted[rank]
}

fn binomial_ci_half_width(p: f64, n: u32) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let p = p.clamp(0.0, 1.0);
    1.96 * (p * (1.0 - p) / n as f64).sqrt()
}

/// Deterministic generator for `seed` on the given stream, or an
/// entropy-seeded one when no seed is set.
pub fn seeded_rng(seed: Option<u64>, stream: u64) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(derive_seed(seed, stream)),
        None => StdRng::from_os_rng(),
    }
}

fn derive_seed(base_seed: u64, stream: u64) -> u64 {
    splitmix64(base_seed ^ (stream << 32))
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}
