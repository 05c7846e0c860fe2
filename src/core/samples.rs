use rand::Rng;

use super::engine::{BEST_CASE_FRACTION, MEDIAN_FRACTION, WORST_CASE_FRACTION};
use super::types::{PathId, SampleRunSelection, SimulationPath, SimulationResult, YearDetail};

/// Picks the canonical runs shown in drill-down views.
///
/// Best/worst/median come from the result's ranked view. The random success
/// avoids the best and median paths whenever another successful path exists,
/// falling back to the first successful path; it is `None` only when nothing
/// succeeded.
pub fn select_samples<R: Rng + ?Sized>(
    result: &SimulationResult,
    rng: &mut R,
) -> SampleRunSelection {
    let ranked = &result.ranked;
    let best_case = ranked
        .at_fraction(BEST_CASE_FRACTION)
        .unwrap_or(result.median_path);
    let worst_case = ranked
        .at_fraction(WORST_CASE_FRACTION)
        .unwrap_or(result.median_path);
    let median = ranked
        .at_fraction(MEDIAN_FRACTION)
        .unwrap_or(result.median_path);

    let (successes, failures): (Vec<PathId>, Vec<PathId>) = (0..result.paths.len())
        .map(PathId)
        .partition(|&id| result.path(id).success);

    let distinct = successes
        .iter()
        .copied()
        .filter(|&id| id != best_case && id != median)
        .collect::<Vec<_>>();
    let random_success = pick(&distinct, rng).or_else(|| successes.first().copied());
    let random_failure = pick(&failures, rng);

    SampleRunSelection {
        best_case,
        worst_case,
        median,
        random_success,
        random_failure,
    }
}

fn pick<R: Rng + ?Sized>(ids: &[PathId], rng: &mut R) -> Option<PathId> {
    if ids.is_empty() {
        return None;
    }
    Some(ids[rng.random_range(0..ids.len())])
}

/// Rebuilds per-year detail from a recorded path by inverting
/// `end = start * (1 + r) - withdrawal`.
///
/// Years whose ending balance was floored at zero cannot recover the true
/// return; the inferred rate overstates it there.
pub fn derive_year_details(path: &SimulationPath, initial_portfolio: f64) -> Vec<YearDetail> {
    path.withdrawals
        .iter()
        .enumerate()
        .map(|(idx, &withdrawal)| {
            let starting_balance = if idx == 0 {
                initial_portfolio
            } else {
                path.portfolio_values[idx]
            };
            let ending_balance = path.portfolio_values[idx + 1];
            let after_return = ending_balance + withdrawal;
            let market_return = if starting_balance > 0.0 {
                (after_return - starting_balance) / starting_balance
            } else {
                0.0
            };

            YearDetail {
                year: idx as u32 + 1,
                starting_balance,
                market_return,
                withdrawal,
                ending_balance,
            }
        })
        .collect()
}
