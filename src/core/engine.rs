use super::types::{Assumptions, BalanceSeries, ClaimOption, ComparisonSummary, TotalRow};

const MONTHS_PER_YEAR: i64 = 12;

/// Payment due `months_since_claim` months after claiming. COLA is applied
/// once per full year elapsed, never monthly.
pub fn project_payment(base_monthly: f64, months_since_claim: i64, cola_annual: f64) -> f64 {
    if cola_annual <= 0.0 {
        return base_monthly;
    }
    let years = months_since_claim.div_euclid(MONTHS_PER_YEAR);
    base_monthly * (1.0 + cola_annual).powi(years as i32)
}

pub fn age_to_month(age: f64) -> i64 {
    (age * MONTHS_PER_YEAR as f64).round() as i64
}

fn month_to_age(month: i64) -> f64 {
    month as f64 / MONTHS_PER_YEAR as f64
}

fn monthly_equivalent_rate(annual: f64) -> f64 {
    if annual > 0.0 {
        (1.0 + annual).powf(1.0 / MONTHS_PER_YEAR as f64) - 1.0
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy)]
struct MonthlyLedger {
    claim_month: i64,
    base_monthly: f64,
    monthly_rate: f64,
    growth_keep: f64,
    deposit_keep: f64,
    cola_annual: f64,
}

impl MonthlyLedger {
    fn new(option: &ClaimOption, assumptions: &Assumptions) -> Self {
        let growth_keep = if assumptions.model.include_growth_tax {
            1.0 - assumptions.tax_rate
        } else {
            1.0
        };
        Self {
            claim_month: age_to_month(option.claim_age as f64),
            base_monthly: option.monthly,
            monthly_rate: monthly_equivalent_rate(assumptions.interest_annual),
            growth_keep,
            deposit_keep: 1.0
                - assumptions.tax_rate * assumptions.model.taxable_benefit_fraction,
            cola_annual: assumptions.cola_annual,
        }
    }

    fn advance(&self, mut balance: f64, month: i64) -> f64 {
        if self.monthly_rate > 0.0 {
            let interest_earned = balance * self.monthly_rate;
            balance += interest_earned * self.growth_keep;
        }
        if month >= self.claim_month {
            let payment =
                project_payment(self.base_monthly, month - self.claim_month, self.cola_annual);
            balance += payment * self.deposit_keep;
        }
        balance
    }
}

/// Month-by-month balance from `start_age` to `end_age` inclusive. The first
/// sample is always zero; an `end_age` before `start_age` yields no samples.
pub fn simulate_series(
    option: &ClaimOption,
    start_age: f64,
    end_age: f64,
    assumptions: &Assumptions,
) -> BalanceSeries {
    let start_month = age_to_month(start_age);
    let end_month = age_to_month(end_age);
    let ledger = MonthlyLedger::new(option, assumptions);

    let samples = (end_month - start_month + 1).max(0) as usize;
    let mut series = BalanceSeries::with_capacity(samples);
    let mut balance = 0.0;
    for t in start_month..=end_month {
        if t > start_month {
            balance = ledger.advance(balance, t - 1);
        }
        series.push(month_to_age(t), balance);
    }
    series
}

pub fn simulate_total(
    option: &ClaimOption,
    start_age: f64,
    through_age: f64,
    assumptions: &Assumptions,
) -> f64 {
    let start_month = age_to_month(start_age);
    let end_month = age_to_month(through_age);
    let ledger = MonthlyLedger::new(option, assumptions);

    (start_month..end_month).fold(0.0, |balance, month| ledger.advance(balance, month))
}

pub fn rank_options(
    options: &[ClaimOption],
    start_age: f64,
    through_age: f64,
    assumptions: &Assumptions,
) -> Vec<TotalRow> {
    let mut totals: Vec<TotalRow> = options
        .iter()
        .map(|option| TotalRow {
            claim_age: option.claim_age,
            monthly: option.monthly,
            total: simulate_total(option, start_age, through_age, assumptions),
        })
        .collect();
    totals.sort_by(|a, b| b.total.total_cmp(&a.total));
    totals
}

pub fn summarize(totals: &[TotalRow], break_even_age: Option<f64>) -> ComparisonSummary {
    let best = totals.first().copied();
    let max_gap = match (totals.first(), totals.last()) {
        (Some(best), Some(worst)) if totals.len() > 1 => Some(best.total - worst.total),
        _ => None,
    };
    ComparisonSummary {
        break_even_age,
        best,
        max_gap,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::SimulationModel;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn no_growth() -> Assumptions {
        Assumptions::new(0.0, 0.0, 0.0)
    }

    fn option(claim_age: u32, monthly: f64) -> ClaimOption {
        ClaimOption { claim_age, monthly }
    }

    #[test]
    fn payment_steps_up_once_per_full_year() {
        assert_approx(project_payment(1000.0, 0, 0.03), 1000.0);
        assert_approx(project_payment(1000.0, 11, 0.03), 1000.0);
        assert_approx(project_payment(1000.0, 12, 0.03), 1030.0);
        assert_approx(
            project_payment(1000.0, 23, 0.03),
            project_payment(1000.0, 12, 0.03),
        );
        assert_approx(project_payment(1000.0, 24, 0.03), 1060.9);
    }

    #[test]
    fn payment_ignores_non_positive_cola() {
        assert_approx(project_payment(1000.0, 60, 0.0), 1000.0);
        assert_approx(project_payment(1000.0, 60, -0.02), 1000.0);
    }

    #[test]
    fn flat_total_is_uncompounded_sum() {
        let total = simulate_total(&option(62, 1000.0), 62.0, 85.0, &no_growth());
        assert_approx(total, 1000.0 * 23.0 * 12.0);
    }

    #[test]
    fn oracle_monthly_compounding_matches_hand_calculation() {
        // Annual rate chosen so the monthly-equivalent rate is exactly 1%.
        let assumptions = Assumptions::new(0.0, 1.01_f64.powi(12) - 1.0, 0.0);
        let series = simulate_series(&option(62, 100.0), 62.0, 62.25, &assumptions);

        // 100; 100*1.01+100 = 201; 201*1.01+100 = 303.01
        assert_eq!(series.len(), 4);
        assert_approx(series.balances[0], 0.0);
        assert_approx(series.balances[1], 100.0);
        assert_approx(series.balances[2], 201.0);
        assert_approx(series.balances[3], 303.01);
        assert_approx(series.ages[3], 62.25);
        assert_approx(
            simulate_total(&option(62, 100.0), 62.0, 62.25, &assumptions),
            303.01,
        );
    }

    #[test]
    fn oracle_full_model_taxes_growth_and_85_percent_of_benefits() {
        let assumptions =
            Assumptions::new(0.0, 1.01_f64.powi(12) - 1.0, 0.5).with_model(SimulationModel::FULL);
        // Deposit 100*(1-0.5*0.85) = 57.5; second month adds 0.575 interest taxed
        // at half -> 57.5 + 0.2875 + 57.5 = 115.2875
        let total = simulate_total(&option(62, 100.0), 62.0, 62.0 + 2.0 / 12.0, &assumptions);
        assert_approx(total, 115.2875);
    }

    #[test]
    fn oracle_baseline_model_taxes_full_benefit_only() {
        let assumptions = Assumptions::new(0.0, 1.01_f64.powi(12) - 1.0, 0.5)
            .with_model(SimulationModel::BASELINE);
        // Deposit 50; 50*1.01 + 50 = 100.5
        let total = simulate_total(&option(62, 100.0), 62.0, 62.0 + 2.0 / 12.0, &assumptions);
        assert_approx(total, 100.5);
    }

    #[test]
    fn cola_applies_from_the_claim_anniversary() {
        let assumptions = Assumptions::new(0.10, 0.0, 0.0);
        let total = simulate_total(&option(62, 1000.0), 62.0, 64.0, &assumptions);
        assert_approx(total, 12.0 * 1000.0 + 12.0 * 1100.0);
    }

    #[test]
    fn balance_stays_zero_until_claim_month() {
        let series = simulate_series(&option(63, 1000.0), 62.0, 64.0, &no_growth());
        assert_eq!(series.len(), 25);
        assert!(series.balances[..=12].iter().all(|b| *b == 0.0));
        assert_approx(series.balances[13], 1000.0);
        assert_approx(series.last_balance().expect("samples"), 12_000.0);
    }

    #[test]
    fn degenerate_horizons_do_not_accumulate() {
        let opt = option(62, 1000.0);
        assert_eq!(simulate_total(&opt, 70.0, 70.0, &no_growth()), 0.0);
        assert_eq!(simulate_total(&opt, 70.0, 65.0, &no_growth()), 0.0);

        let single = simulate_series(&opt, 70.0, 70.0, &no_growth());
        assert_eq!(single.ages, vec![70.0]);
        assert_eq!(single.balances, vec![0.0]);

        assert!(simulate_series(&opt, 70.0, 65.0, &no_growth()).is_empty());
    }

    #[test]
    fn sampled_series_keeps_every_nth_month_from_the_start() {
        let series = simulate_series(&option(62, 100.0), 62.0, 64.0, &no_growth());
        let yearly = series.sampled(12);
        assert_eq!(yearly.ages, vec![62.0, 63.0, 64.0]);
        assert_eq!(yearly.balances, vec![0.0, 1200.0, 2400.0]);
        assert_eq!(series.sampled(0), series);
    }

    #[test]
    fn rank_options_orders_totals_descending() {
        let options = [option(62, 1000.0), option(66, 1400.0), option(70, 2000.0)];
        let ranked = rank_options(&options, 62.0, 85.0, &no_growth());
        // 62: 23*12*1000 = 276k, 66: 19*12*1400 = 319.2k, 70: 15*12*2000 = 360k
        let ages: Vec<u32> = ranked.iter().map(|r| r.claim_age).collect();
        assert_eq!(ages, vec![70, 66, 62]);
        assert_approx(ranked[0].total, 360_000.0);
        assert_approx(ranked[2].total, 276_000.0);
    }

    #[test]
    fn summarize_reports_best_and_spread() {
        let options = [option(62, 1000.0), option(70, 2000.0)];
        let ranked = rank_options(&options, 62.0, 85.0, &no_growth());
        let summary = summarize(&ranked, Some(78.0));
        assert_eq!(summary.best.map(|r| r.claim_age), Some(70));
        assert_approx(summary.max_gap.expect("two rows"), 84_000.0);
        assert_eq!(summary.break_even_age, Some(78.0));

        let single = summarize(&ranked[..1], None);
        assert_eq!(single.max_gap, None);
        assert_eq!(summarize(&[], None), ComparisonSummary::default());
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(32))]

        #[test]
        fn prop_payment_at_claim_is_base_amount(
            base_cents in 1u32..1_000_000,
            cola_bp in 0u32..2000
        ) {
            let base = base_cents as f64 / 100.0;
            let paid = project_payment(base, 0, cola_bp as f64 / 10_000.0);
            prop_assert_eq!(paid, base);
        }

        #[test]
        fn prop_series_is_aligned_and_starts_at_zero(
            claim_age in 62u32..71,
            start_age in 55u32..70,
            span_months in 0i64..480,
            monthly_cents in 0u32..800_000,
            cola_bp in 0u32..800,
            interest_bp in 0u32..1200,
            tax_bp in 0u32..5000
        ) {
            let assumptions = Assumptions::new(
                cola_bp as f64 / 10_000.0,
                interest_bp as f64 / 10_000.0,
                tax_bp as f64 / 10_000.0,
            );
            let opt = option(claim_age, monthly_cents as f64 / 100.0);
            let start = start_age as f64;
            let end = start + span_months as f64 / 12.0;
            let series = simulate_series(&opt, start, end, &assumptions);

            prop_assert_eq!(series.ages.len(), series.balances.len());
            prop_assert_eq!(series.len() as i64, span_months + 1);
            prop_assert_eq!(series.balances[0], 0.0);
            for pair in series.ages.windows(2) {
                prop_assert!((pair[1] - pair[0] - 1.0 / 12.0).abs() < 1e-9);
            }
            for pair in series.balances.windows(2) {
                prop_assert!(pair[1] >= pair[0]);
            }

            let total = simulate_total(&opt, start, end, &assumptions);
            let last = series.last_balance().unwrap_or(0.0);
            prop_assert!((total - last).abs() <= 1e-6 * last.max(1.0));
        }

        #[test]
        fn prop_ranked_totals_never_increase(
            reference_cents in 10_000u32..500_000,
            through_age in 63u32..105,
            cola_bp in 0u32..600,
            interest_bp in 0u32..900,
            tax_bp in 0u32..4000
        ) {
            let assumptions = Assumptions::new(
                cola_bp as f64 / 10_000.0,
                interest_bp as f64 / 10_000.0,
                tax_bp as f64 / 10_000.0,
            );
            let rows = crate::core::build_benefit_table(
                reference_cents as f64 / 100.0,
                assumptions.cola_annual,
                crate::core::BenefitFormula::MultiplierTable,
            )
            .expect("valid amount");
            let options = crate::core::options_from_rows(&rows);
            let ranked = rank_options(&options, 62.0, through_age as f64, &assumptions);

            prop_assert_eq!(ranked.len(), options.len());
            for pair in ranked.windows(2) {
                prop_assert!(pair[0].total >= pair[1].total);
            }
            let best = ranked[0].total;
            prop_assert!(ranked.iter().all(|row| best >= row.total));
        }
    }
}
