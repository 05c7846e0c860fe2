use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamsError {
    #[error("{asset} allocation must be between 0 and 1, got {fraction}")]
    AllocationOutOfRange { asset: &'static str, fraction: f64 },
    #[error("stock and bond allocations must sum to 1, got {total}")]
    AllocationSum { total: f64 },
    #[error("{field} must be a finite amount >= 0, got {value}")]
    NegativeAmount { field: &'static str, value: f64 },
    #[error("retirement years must be > 0")]
    ZeroYears,
    #[error("number of simulations must be > 0")]
    ZeroSimulations,
}
