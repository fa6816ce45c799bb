use super::engine::simulate_series;
use super::types::{Assumptions, BalanceSeries, ClaimOption, Crossover};

const EXACT_HIT_EPS: f64 = 1e-9;

/// First age at which `option_b`'s balance is at least `option_a`'s, scanning
/// month by month from the later of the two claim ages up to `max_age`.
pub fn find_break_even(
    option_a: &ClaimOption,
    option_b: &ClaimOption,
    start_age: f64,
    max_age: f64,
    assumptions: &Assumptions,
) -> Option<f64> {
    let series_a = simulate_series(option_a, start_age, max_age, assumptions);
    let series_b = simulate_series(option_b, start_age, max_age, assumptions);
    let min_age = option_a.claim_age.max(option_b.claim_age) as f64;
    first_overtake(&series_a, &series_b, min_age)
}

pub fn first_overtake(
    series_a: &BalanceSeries,
    series_b: &BalanceSeries,
    min_age: f64,
) -> Option<f64> {
    series_a
        .ages
        .iter()
        .zip(series_a.balances.iter().zip(series_b.balances.iter()))
        .find(|&(&age, (&a, &b))| age >= min_age && b >= a)
        .map(|(&age, _)| age)
}

pub fn interpolate_crossover(
    ages: &[f64],
    first: &[f64],
    second: &[f64],
    min_age: f64,
) -> Option<Crossover> {
    let len = ages.len().min(first.len()).min(second.len());
    if len < 2 {
        return None;
    }
    let diff = |i: usize| first[i] - second[i];

    let start = ages[..len].iter().position(|&age| age >= min_age)?;
    if start >= len - 1 {
        return None;
    }
    let mut prev = (start..len).find(|&i| diff(i).abs() >= EXACT_HIT_EPS)?;
    let mut prev_diff = diff(prev);

    for cur in prev + 1..len {
        let cur_diff = diff(cur);
        if cur_diff.abs() < EXACT_HIT_EPS {
            return Some(Crossover {
                age: ages[cur],
                balance: first[cur],
            });
        }
        if prev_diff * cur_diff < 0.0 {
            let t = prev_diff.abs() / (prev_diff.abs() + cur_diff.abs());
            return Some(Crossover {
                age: ages[prev] + (ages[cur] - ages[prev]) * t,
                balance: first[prev] + (first[cur] - first[prev]) * t,
            });
        }
        prev = cur;
        prev_diff = cur_diff;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BenefitFormula, build_benefit_table, options_from_rows};

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    fn option(claim_age: u32, monthly: f64) -> ClaimOption {
        ClaimOption { claim_age, monthly }
    }

    fn flat() -> Assumptions {
        Assumptions::new(0.0, 0.0, 0.0)
    }

    fn reference_options() -> Vec<ClaimOption> {
        let rows = build_benefit_table(2632.0, 0.02, BenefitFormula::MultiplierTable)
            .expect("valid amount");
        options_from_rows(&rows)
    }

    #[test]
    fn no_break_even_when_head_start_is_never_overcome() {
        let rows = build_benefit_table(1000.0, 0.0, BenefitFormula::MultiplierTable)
            .expect("valid amount");
        let options = options_from_rows(&rows);
        let result = find_break_even(&options[0], &options[1], 62.0, 63.0, &flat());
        assert_eq!(result, None);
    }

    #[test]
    fn break_even_matches_hand_calculation_without_growth() {
        // A has 1000*(t-744) and B has 2000*(t-768): equal at month 792.
        let result = find_break_even(
            &option(62, 1000.0),
            &option(64, 2000.0),
            62.0,
            100.0,
            &flat(),
        );
        assert_eq!(result, Some(66.0));
    }

    #[test]
    fn equality_at_first_eligible_month_counts_as_break_even() {
        let result = find_break_even(&option(62, 0.0), &option(63, 100.0), 62.0, 70.0, &flat());
        assert_eq!(result, Some(63.0));
    }

    #[test]
    fn search_waits_for_later_claim_age_even_when_second_option_leads() {
        let result = find_break_even(
            &option(64, 2000.0),
            &option(62, 1000.0),
            62.0,
            100.0,
            &flat(),
        );
        assert_eq!(result, Some(64.0));
    }

    #[test]
    fn delayed_claim_overtakes_early_claim_with_growth_and_cola() {
        let options = reference_options();
        let assumptions = Assumptions::new(0.02, 0.04, 0.0);
        let early = options[0];
        let late = options[8];
        assert_eq!((early.claim_age, late.claim_age), (62, 70));

        let age = find_break_even(&early, &late, 62.0, 100.0, &assumptions)
            .expect("delayed claim must overtake by 100");
        assert!(age > 70.0 && age < 100.0, "break-even at {age}");

        let capped = find_break_even(&early, &late, 62.0, 68.0, &assumptions);
        assert_eq!(capped, None);
    }

    #[test]
    fn interpolate_crossover_between_samples() {
        let ages = [0.0, 1.0, 2.0, 3.0];
        let first = [10.0, 8.0, 6.0, 4.0];
        let second = [0.0, 4.0, 8.0, 12.0];
        let hit = interpolate_crossover(&ages, &first, &second, 0.0).expect("lines cross");
        assert_approx(hit.age, 1.0 + 2.0 / 3.0);
        assert_approx(hit.balance, 8.0 - 2.0 * 2.0 / 3.0);
    }

    #[test]
    fn interpolate_crossover_returns_exact_hit_sample() {
        let ages = [0.0, 1.0, 2.0];
        let first = [5.0, 4.0, 3.0];
        let second = [0.0, 4.0, 6.0];
        let hit = interpolate_crossover(&ages, &first, &second, 0.0).expect("exact hit");
        assert_eq!(hit, Crossover { age: 1.0, balance: 4.0 });
    }

    #[test]
    fn interpolate_crossover_skips_leading_equal_samples_and_respects_min_age() {
        let ages = [0.0, 1.0, 2.0, 3.0];
        let first = [0.0, 0.0, 3.0, 0.0];
        let second = [0.0, 0.0, 0.0, 3.0];
        let hit = interpolate_crossover(&ages, &first, &second, 0.0).expect("cross");
        assert_approx(hit.age, 2.5);

        assert_eq!(interpolate_crossover(&ages, &first, &second, 3.0), None);
        assert_eq!(interpolate_crossover(&ages[..1], &first, &second, 0.0), None);
    }

    #[test]
    fn interpolated_crossover_sits_just_before_monthly_break_even() {
        let options = reference_options();
        let assumptions = Assumptions::new(0.02, 0.04, 0.0);
        let a = simulate_series(&options[0], 62.0, 100.0, &assumptions);
        let b = simulate_series(&options[8], 62.0, 100.0, &assumptions);
        let monthly = first_overtake(&a, &b, 70.0).expect("break-even");
        let hit = interpolate_crossover(&a.ages, &a.balances, &b.balances, 70.0).expect("cross");
        assert!(hit.age <= monthly && hit.age > monthly - 1.0 / 12.0);
    }
}
