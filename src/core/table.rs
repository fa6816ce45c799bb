use std::collections::BTreeMap;

use super::error::TableError;
use super::types::{BenefitFormula, BenefitRow, ClaimOption};

pub const BASE_CLAIM_AGE: u32 = 62;
pub const FULL_RETIREMENT_AGE: u32 = 67;
pub const MAX_CLAIM_AGE: u32 = 70;

pub const CLAIM_MULTIPLIERS: [(u32, f64); 9] = [
    (62, 0.70),
    (63, 0.75),
    (64, 0.80),
    (65, 0.8667),
    (66, 0.9333),
    (67, 1.00),
    (68, 1.08),
    (69, 1.16),
    (70, 1.24),
];

pub fn validate_multiplier_table(table: &[(u32, f64)]) -> Result<(), TableError> {
    let expected_len = (MAX_CLAIM_AGE - BASE_CLAIM_AGE + 1) as usize;
    for (position, &(age, factor)) in table.iter().enumerate() {
        if age != BASE_CLAIM_AGE + position as u32 || position >= expected_len {
            return Err(TableError::MultiplierGap {
                first: BASE_CLAIM_AGE,
                last: MAX_CLAIM_AGE,
                found: age,
                position,
            });
        }
        if !factor.is_finite() || factor <= 0.0 {
            return Err(TableError::InvalidMultiplier { age });
        }
    }
    if table.len() != expected_len {
        let last = table.last().map(|&(age, _)| age).unwrap_or(0);
        return Err(TableError::MultiplierGap {
            first: BASE_CLAIM_AGE,
            last: MAX_CLAIM_AGE,
            found: last,
            position: table.len(),
        });
    }
    Ok(())
}

pub fn claim_multiplier(age: u32) -> Option<f64> {
    CLAIM_MULTIPLIERS
        .iter()
        .find(|&&(a, _)| a == age)
        .map(|&(_, factor)| factor)
}

pub fn build_benefit_table(
    reference_monthly: f64,
    cola_annual: f64,
    formula: BenefitFormula,
) -> Result<Vec<BenefitRow>, TableError> {
    if !reference_monthly.is_finite() || reference_monthly <= 0.0 {
        return Err(TableError::InvalidReferenceAmount {
            reference_age: BASE_CLAIM_AGE,
            amount: reference_monthly,
        });
    }

    let rows = match formula {
        BenefitFormula::FlatGrowth { annual_rate } => (BASE_CLAIM_AGE..=MAX_CLAIM_AGE)
            .map(|age| {
                let years = (age - BASE_CLAIM_AGE) as i32;
                BenefitRow {
                    age,
                    monthly: reference_monthly * (1.0 + annual_rate).powi(years),
                }
            })
            .collect(),
        BenefitFormula::MultiplierTable => {
            let base_factor = claim_multiplier(BASE_CLAIM_AGE).unwrap_or(1.0);
            let pia = reference_monthly / base_factor;
            CLAIM_MULTIPLIERS
                .iter()
                .map(|&(age, factor)| {
                    let years = (age - BASE_CLAIM_AGE) as i32;
                    BenefitRow {
                        age,
                        monthly: pia * factor * (1.0 + cola_annual).powi(years),
                    }
                })
                .collect()
        }
    };
    Ok(rows)
}

pub fn options_from_rows(rows: &[BenefitRow]) -> Vec<ClaimOption> {
    rows.iter().copied().map(ClaimOption::from).collect()
}

/// Parses an explicit benefit table with `age,monthly` headers. Rows come
/// back sorted by age; a repeated age keeps its last value.
pub fn parse_benefit_csv(text: &str) -> Result<Vec<BenefitRow>, TableError> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty());

    let Some((_, header)) = lines.next() else {
        return Err(TableError::MissingCsvHeaders);
    };
    let columns: Vec<&str> = header.split(',').map(str::trim).collect();
    let age_col = columns.iter().position(|&c| c == "age");
    let monthly_col = columns.iter().position(|&c| c == "monthly");
    let (Some(age_col), Some(monthly_col)) = (age_col, monthly_col) else {
        return Err(TableError::MissingCsvHeaders);
    };

    let mut by_age = BTreeMap::new();
    for (line, raw) in lines {
        let fields: Vec<&str> = raw.split(',').map(str::trim).collect();
        let field = |col: usize, name: &str| {
            fields
                .get(col)
                .copied()
                .ok_or_else(|| TableError::InvalidCsvRow {
                    line,
                    reason: format!("missing {name} column"),
                })
        };
        let age_text = field(age_col, "age")?;
        let monthly_text = field(monthly_col, "monthly")?;
        let age = age_text
            .parse::<u32>()
            .map_err(|_| TableError::InvalidCsvRow {
                line,
                reason: format!("age {age_text:?} is not a whole number"),
            })?;
        let monthly = monthly_text
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| TableError::InvalidCsvRow {
                line,
                reason: format!("monthly {monthly_text:?} is not a number"),
            })?;
        by_age.insert(age, monthly);
    }

    if by_age.is_empty() {
        return Err(TableError::EmptyCsv);
    }
    Ok(by_age
        .into_iter()
        .map(|(age, monthly)| BenefitRow { age, monthly })
        .collect())
}
