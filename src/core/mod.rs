mod engine;
mod error;
mod history;
mod returns;
mod samples;
mod types;

pub use engine::{
    MARKET_STREAM, SELECTION_STREAM, run_simulation, run_simulation_with, seeded_rng,
    simulate_path,
};
pub use error::ParamsError;
pub use history::{HistorySummary, US_HISTORY, YearlyReturn, summarize};
pub use returns::{MarketModel, MarketSample, Moments, ParametricAssumptions, ReturnGenerator};
pub use samples::{derive_year_details, select_samples};
pub use types::{
    Allocation, FailurePolicy, PathId, RankedView, ReturnSource, SampleRunSelection,
    SimulationParams, SimulationPath, SimulationResult, YearDetail, YearlyBand,
};
