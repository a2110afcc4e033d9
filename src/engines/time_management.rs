//! Think-time budgets.
//!
//! The caller passes raw clock readings; these functions turn them into a
//! sampled, floored think time for the current turn. Sampling always goes
//! through the engine-owned RNG so tests can seed it.

use std::time::Duration;

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::engines::decision_state::DecisionState;
use crate::engines::engine_trait::ClockInfo;
use crate::engines::policy::{ClockPolicy, TimingPolicy};

/// `N(mean, stdev)`, or `mean` itself when the deviation is not usable.
pub fn sample_normal(rng: &mut impl Rng, mean: f64, stdev: f64) -> f64 {
    match Normal::new(mean, stdev) {
        Ok(normal) if stdev > 0.0 => normal.sample(rng),
        _ => mean,
    }
}

/// Chi-squared density with `dof` degrees of freedom.
pub fn chi_squared_pdf(x: f64, dof: u32) -> f64 {
    if x <= 0.0 || dof == 0 {
        return 0.0;
    }
    let half = f64::from(dof) / 2.0;
    x.powf(half - 1.0) * (-x / 2.0).exp() / (2f64.powf(half) * gamma_of_half(dof))
}

/// Gamma(n / 2), exact for every positive integer `n`.
fn gamma_of_half(n: u32) -> f64 {
    let target = f64::from(n) / 2.0;
    let (mut value, mut a) = if n % 2 == 0 {
        (1.0, 1.0)
    } else {
        (std::f64::consts::PI.sqrt(), 0.5)
    };
    while a < target {
        value *= a;
        a += 1.0;
    }
    value
}

fn secs(value: f64) -> Duration {
    Duration::from_secs_f64(value.max(0.0))
}

/// Starting budget used by the formulas, substituting a notional budget for
/// untimed games.
pub fn effective_start_secs(clocks: &ClockInfo, clock_policy: &ClockPolicy) -> f64 {
    if clocks.is_timed() {
        clocks.start_secs()
    } else {
        clock_policy.untimed_budget_secs
    }
}

/// Short normal-distributed delay for book-like opening moves.
pub fn opening_think_time(
    clocks: &ClockInfo,
    clock_policy: &ClockPolicy,
    timing: &TimingPolicy,
    rng: &mut impl Rng,
) -> Duration {
    let mean = if clocks.is_timed() && clocks.start_secs() < clock_policy.short_game_secs {
        timing.opening_short_game_mean_secs
    } else {
        timing.opening_mean_secs
    };
    let sampled = sample_normal(rng, mean, timing.opening_stdev_secs);
    let ceiling = timing.opening_max_secs.max(timing.opening_floor_secs);
    secs(sampled.clamp(timing.opening_floor_secs, ceiling))
}

/// Spend roughly as if a fixed number of moves remained, more of them early
/// in the game.
pub fn time_scramble_think_time(
    clocks: &ClockInfo,
    fullmove_number: u16,
    clock_policy: &ClockPolicy,
    timing: &TimingPolicy,
    rng: &mut impl Rng,
) -> Duration {
    let own = clocks.own_secs();
    if own < timing.scramble_panic_secs {
        return secs(timing.floor_secs);
    }

    let divisor = match fullmove_number {
        0..=9 => timing.scramble_divisors[0],
        10..=19 => timing.scramble_divisors[1],
        _ => timing.scramble_divisors[2],
    };
    let mean = own / divisor;

    let short_game = effective_start_secs(clocks, clock_policy) < clock_policy.short_game_secs;
    let stdev = if short_game && own <= timing.scramble_short_game_calm_secs {
        own / timing.scramble_short_game_stdev_divisor
    } else {
        own / timing.scramble_stdev_divisor
    };

    secs(sample_normal(rng, mean, stdev).max(timing.floor_secs))
}

/// Normal play: a chi-squared curve over the move number, scaled by the
/// position's complexity and the game's length.
pub fn normal_think_time(
    clocks: &ClockInfo,
    fullmove_number: u16,
    complexity: f64,
    clock_policy: &ClockPolicy,
    timing: &TimingPolicy,
    rng: &mut impl Rng,
) -> Duration {
    if timing.shadow_mode {
        return secs(timing.shadow_secs);
    }

    let start = effective_start_secs(clocks, clock_policy);
    let stdev = start / timing.normal_stdev_divisor;

    let mean = if clocks.opp_fraction() < timing.opponent_pressure_fraction {
        // Keep the opponent under pressure instead of thinking long.
        if rng.random_bool(timing.opponent_pressure_probability.clamp(0.0, 1.0)) {
            timing.opponent_pressure_mean_secs
        } else {
            start / timing.opponent_pressure_budget_divisor
        }
    } else {
        let mut curve = chi_squared_pdf(
            f64::from(fullmove_number) / timing.chi_squared_move_scale,
            timing.chi_squared_dof,
        );
        if fullmove_number > timing.late_game_move {
            curve *= 2.0;
        }
        let scale = (complexity.max(0.0) / timing.complexity_scale).powf(timing.complexity_exponent);
        let divisor = if complexity < timing.hard_complexity {
            timing.easy_divisor
        } else {
            timing.hard_divisor
        };
        start / divisor * scale * curve
    };

    secs(sample_normal(rng, mean, stdev).max(timing.floor_secs))
}

/// Blend the sampled time with the recent average so consecutive moves do
/// not jump around too much. Skipped in shadow mode.
pub fn smooth_think_time(sampled: Duration, state: &DecisionState, timing: &TimingPolicy) -> Duration {
    if timing.shadow_mode {
        return sampled;
    }
    let Some(recent) = state.mean_recent_move_time() else {
        return sampled;
    };
    let weight = timing.smoothing_weight.clamp(0.0, 1.0);
    let blended = sampled.as_secs_f64() * (1.0 - weight) + recent.as_secs_f64() * weight;
    secs(blended.max(timing.floor_secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::policy::HumanPolicy;
    use crate::game_state::chess_types::Color;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn chi_squared_density_matches_known_values() {
        // chi2.pdf(5, 7) = 5^2.5 * e^-2.5 / (2^3.5 * Gamma(3.5))
        assert!((chi_squared_pdf(5.0, 7) - 0.122_041).abs() < 1e-5);
        assert!((chi_squared_pdf(2.0, 2) - 0.5 * (-1.0f64).exp()).abs() < 1e-12);
        assert_eq!(chi_squared_pdf(0.0, 7), 0.0);
        assert!((gamma_of_half(7) - 3.323_350_970_447_842_6).abs() < 1e-12);
    }

    #[test]
    fn normal_think_time_respects_floor_and_varies() {
        let policy = HumanPolicy::default();
        let clocks = ClockInfo::from_millis(180_000, 150_000, 150_000);
        let mut rng = StdRng::seed_from_u64(3);

        let samples: Vec<f64> = (0..200)
            .map(|_| {
                normal_think_time(&clocks, 20, 30.0, &policy.clock, &policy.timing, &mut rng)
                    .as_secs_f64()
            })
            .collect();

        assert!(samples.iter().all(|&t| t >= policy.timing.floor_secs - 1e-9));
        let first = samples[0];
        assert!(samples.iter().any(|&t| (t - first).abs() > 1e-6));

        // Mean is 180/7 * (30/55)^1.8 * chi2(5, 7), stdev 2s; nearly all
        // samples land within three deviations.
        let mean = 180.0 / 7.0 * (30.0f64 / 55.0).powf(1.8) * chi_squared_pdf(5.0, 7);
        let within = samples.iter().filter(|&&t| (t - mean).abs() <= 6.0).count();
        assert!(within >= 195);
    }

    #[test]
    fn shadow_mode_pins_the_time() {
        let mut policy = HumanPolicy::default();
        policy.timing.shadow_mode = true;
        let clocks = ClockInfo::from_millis(300_000, 250_000, 250_000);
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..10 {
            let time = normal_think_time(&clocks, 25, 40.0, &policy.clock, &policy.timing, &mut rng);
            assert_eq!(time, Duration::from_secs(1));
        }
    }

    #[test]
    fn opening_times_stay_quick() {
        let policy = HumanPolicy::default();
        let clocks = ClockInfo::from_millis(600_000, 600_000, 600_000);
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..100 {
            let time = opening_think_time(&clocks, &policy.clock, &policy.timing, &mut rng);
            assert!(time >= Duration::from_millis(200));
            assert!(time < Duration::from_secs(1));
        }
    }

    #[test]
    fn scramble_panics_at_low_clock() {
        let policy = HumanPolicy::default();
        let clocks = ClockInfo::from_millis(60_000, 5_000, 30_000);
        let mut rng = StdRng::seed_from_u64(1);
        let time = time_scramble_think_time(&clocks, 30, &policy.clock, &policy.timing, &mut rng);
        assert_eq!(time, Duration::from_millis(100));

        let clocks = ClockInfo::from_millis(600_000, 90_000, 300_000);
        for _ in 0..50 {
            let time = time_scramble_think_time(&clocks, 30, &policy.clock, &policy.timing, &mut rng);
            assert!(time >= Duration::from_millis(100));
            assert!(time < Duration::from_secs(10));
        }
    }

    #[test]
    fn smoothing_pulls_towards_recent_times() {
        let policy = HumanPolicy::default();
        let mut rng = StdRng::seed_from_u64(2);
        let mut state = DecisionState::new(Color::Light, &policy, &mut rng);
        let sampled = Duration::from_secs(5);
        assert_eq!(smooth_think_time(sampled, &state, &policy.timing), sampled);

        state.push_move_time(Duration::from_secs(1));
        let smoothed = smooth_think_time(sampled, &state, &policy.timing);
        // 0.8 * 5 + 0.2 * 1
        assert!((smoothed.as_secs_f64() - 4.2).abs() < 1e-9);
    }
}
