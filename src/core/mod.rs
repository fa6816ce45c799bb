mod engine;
mod error;
mod solver;
mod table;
mod types;

pub use engine::{
    age_to_month, project_payment, rank_options, simulate_series, simulate_total, summarize,
};
pub use error::TableError;
pub use solver::{find_break_even, first_overtake, interpolate_crossover};
pub use table::{
    BASE_CLAIM_AGE, CLAIM_MULTIPLIERS, FULL_RETIREMENT_AGE, MAX_CLAIM_AGE, build_benefit_table,
    claim_multiplier, options_from_rows, parse_benefit_csv, validate_multiplier_table,
};
pub use types::{
    Assumptions, BalanceSeries, BenefitFormula, BenefitRow, ClaimOption, ComparisonSummary,
    Crossover, DEFAULT_FLAT_GROWTH_RATE, SimulationModel, TotalRow,
};
