use serde::Serialize;

use super::format::{format_currency, format_money};
use crate::core::{
    Assumptions, BalanceSeries, BenefitFormula, BenefitRow, ClaimOption, ComparisonSummary,
    Crossover, TableError, TotalRow, build_benefit_table, first_overtake, interpolate_crossover,
    options_from_rows, rank_options, simulate_series, summarize,
};

#[derive(Debug, Clone, PartialEq)]
pub enum BenefitSource {
    Derived {
        reference_monthly: f64,
        formula: BenefitFormula,
    },
    Explicit(Vec<BenefitRow>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonInputs {
    pub benefits: BenefitSource,
    pub start_age: f64,
    pub through_age: f64,
    pub max_age: f64,
    pub assumptions: Assumptions,
    pub claim_age_a: u32,
    pub claim_age_b: u32,
    pub step_months: usize,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportStatus {
    Ok,
    InvalidBenefit,
    SameClaimAge,
    NotEnoughOptions,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonReport {
    pub status: ReportStatus,
    pub message: Option<String>,
    pub start_age: f64,
    pub through_age: f64,
    pub max_age: f64,
    pub assumptions: Assumptions,
    pub benefit_rows: Vec<BenefitRow>,
    pub totals: Vec<TotalRow>,
    pub option_a: Option<ClaimOption>,
    pub option_b: Option<ClaimOption>,
    pub series_a: BalanceSeries,
    pub series_b: BalanceSeries,
    pub break_even_age: Option<f64>,
    pub crossover: Option<Crossover>,
    pub summary: ComparisonSummary,
}

impl ComparisonReport {
    fn empty(inputs: &ComparisonInputs, status: ReportStatus, message: String) -> Self {
        Self {
            status,
            message: Some(message),
            start_age: inputs.start_age,
            through_age: inputs.through_age,
            max_age: inputs.max_age,
            assumptions: inputs.assumptions,
            benefit_rows: Vec::new(),
            totals: Vec::new(),
            option_a: None,
            option_b: None,
            series_a: BalanceSeries::default(),
            series_b: BalanceSeries::default(),
            break_even_age: None,
            crossover: None,
            summary: ComparisonSummary::default(),
        }
    }
}

pub fn resolve_benefit_rows(
    source: &BenefitSource,
    cola_annual: f64,
) -> Result<Vec<BenefitRow>, TableError> {
    match source {
        BenefitSource::Derived {
            reference_monthly,
            formula,
        } => build_benefit_table(*reference_monthly, cola_annual, *formula),
        BenefitSource::Explicit(rows) if rows.is_empty() => Err(TableError::EmptyCsv),
        BenefitSource::Explicit(rows) => Ok(rows.clone()),
    }
}

fn select_option(
    options: &[ClaimOption],
    claim_age: u32,
    fallback_index: usize,
) -> Option<ClaimOption> {
    options
        .iter()
        .find(|o| o.claim_age == claim_age)
        .or_else(|| options.get(fallback_index))
        .copied()
}

pub fn run_comparison(inputs: &ComparisonInputs) -> ComparisonReport {
    let assumptions = &inputs.assumptions;
    let rows = match resolve_benefit_rows(&inputs.benefits, assumptions.cola_annual) {
        Ok(rows) => rows,
        Err(err) => {
            return ComparisonReport::empty(inputs, ReportStatus::InvalidBenefit, err.to_string());
        }
    };
    let options = options_from_rows(&rows);
    let totals = rank_options(&options, inputs.start_age, inputs.through_age, assumptions);

    let option_a = select_option(&options, inputs.claim_age_a, 0);
    let option_b = select_option(&options, inputs.claim_age_b, 1);

    let (status, message, series_a, series_b, break_even_age, crossover) = match (option_a, option_b)
    {
        (Some(a), Some(b)) if a.claim_age != b.claim_age => {
            let series_a = simulate_series(&a, inputs.start_age, inputs.max_age, assumptions);
            let series_b = simulate_series(&b, inputs.start_age, inputs.max_age, assumptions);
            let min_age = a.claim_age.max(b.claim_age) as f64;
            let break_even = first_overtake(&series_a, &series_b, min_age);
            let crossover = interpolate_crossover(
                &series_a.ages,
                &series_a.balances,
                &series_b.balances,
                min_age,
            );
            let message = break_even
                .is_none()
                .then(|| format!("No crossover before age {:.0}.", inputs.max_age));
            (
                ReportStatus::Ok,
                message,
                series_a.sampled(inputs.step_months),
                series_b.sampled(inputs.step_months),
                break_even,
                crossover,
            )
        }
        (Some(_), Some(_)) => (
            ReportStatus::SameClaimAge,
            Some("Select different claim ages.".to_string()),
            BalanceSeries::default(),
            BalanceSeries::default(),
            None,
            None,
        ),
        _ => (
            ReportStatus::NotEnoughOptions,
            Some("Need at least two claim ages to compare.".to_string()),
            BalanceSeries::default(),
            BalanceSeries::default(),
            None,
            None,
        ),
    };

    let summary = summarize(&totals, break_even_age);
    ComparisonReport {
        status,
        message,
        start_age: inputs.start_age,
        through_age: inputs.through_age,
        max_age: inputs.max_age,
        assumptions: inputs.assumptions,
        benefit_rows: rows,
        totals,
        option_a,
        option_b,
        series_a,
        series_b,
        break_even_age,
        crossover,
        summary,
    }
}

pub fn render_text_report(report: &ComparisonReport) -> String {
    if report.status == ReportStatus::InvalidBenefit {
        return report.message.clone().unwrap_or_default();
    }

    let assumptions = &report.assumptions;
    let label = if assumptions.interest_annual > 0.0 {
        "Balance"
    } else {
        "Total"
    };

    let mut lines = vec![
        String::new(),
        format!(
            "{label} benefits from age {:.1} through age {:.1}",
            report.start_age, report.through_age
        ),
    ];
    if assumptions.cola_annual > 0.0 {
        lines.push(format!(
            "Assumptions: COLA={:.2}%/yr",
            assumptions.cola_annual * 100.0
        ));
    }
    if assumptions.interest_annual > 0.0 {
        lines.push(format!(
            "Assumptions: Interest={:.2}%/yr (monthly comp)",
            assumptions.interest_annual * 100.0
        ));
    }
    if assumptions.tax_rate > 0.0 {
        lines.push(format!(
            "Assumptions: Tax={:.2}% on {:.0}% of benefits{}",
            assumptions.tax_rate * 100.0,
            assumptions.model.taxable_benefit_fraction * 100.0,
            if assumptions.model.include_growth_tax {
                " and on growth"
            } else {
                ""
            }
        ));
    }

    lines.push(String::new());
    lines.push(format!(
        "{:>9}  {:>12}  {:>20}",
        "Claim Age",
        "Monthly ($)",
        format!("{label} thru age X ($)")
    ));
    lines.push("-".repeat(46));
    for row in &report.totals {
        lines.push(format!(
            "{:>9}  {:>12}  {:>20}",
            row.claim_age,
            format_money(row.monthly),
            format_money(row.total)
        ));
    }

    if let Some(best) = report.summary.best {
        lines.push(String::new());
        lines.push(format!(
            "Best by age {:.1}: claim at {} ({label} {})",
            report.through_age,
            best.claim_age,
            format_money(best.total)
        ));
    }
    if let Some(gap) = report.summary.max_gap {
        lines.push(format!("Spread between best and worst: {}", format_currency(gap)));
    }

    lines.push(String::new());
    match (report.status, report.option_a, report.option_b) {
        (ReportStatus::Ok, Some(a), Some(b)) => match report.break_even_age {
            Some(age) => lines.push(format!(
                "Break-even age between claim {} and {}: {age:.2}",
                a.claim_age, b.claim_age
            )),
            None => lines.push(format!(
                "No break-even found up to age {:.1} between claim {} and {}.",
                report.max_age, a.claim_age, b.claim_age
            )),
        },
        (ReportStatus::NotEnoughOptions, _, _) => {
            lines.push("Pick two ages: the benefit table needs at least two claim ages.".to_string())
        }
        _ => lines.push("Pick two ages: select different claim ages.".to_string()),
    }
    lines.push(String::new());
    lines.join("\n")
}

fn series_label(option: &ClaimOption) -> String {
    format!(
        "Claim {} ({}/mo)",
        option.claim_age,
        format_currency(option.monthly)
    )
}

pub fn render_series_csv(
    options: &[ClaimOption],
    start_age: f64,
    max_age: f64,
    assumptions: &Assumptions,
    step_months: usize,
) -> String {
    let series: Vec<BalanceSeries> = options
        .iter()
        .map(|o| simulate_series(o, start_age, max_age, assumptions).sampled(step_months))
        .collect();

    let mut out = String::from("age");
    for option in options {
        out.push_str(",\"");
        out.push_str(&series_label(option));
        out.push('"');
    }
    out.push('\n');

    let grid = series.first().map(|s| s.ages.as_slice()).unwrap_or(&[]);
    for (idx, age) in grid.iter().enumerate() {
        out.push_str(&format!("{age:.4}"));
        for s in &series {
            out.push_str(&format!(",{:.2}", s.balances[idx]));
        }
        out.push('\n');
    }
    out
}
