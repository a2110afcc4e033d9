//! Turn-level mode transitions.
//!
//! `next_state` is the only place mode flags and the think plan are decided.
//! It is pure apart from the RNG it is handed: the previous state, the
//! position signals and the clocks go in, a new state comes out, and the
//! previous state is left untouched.

use rand::Rng;

use crate::analysis::complexity::ComplexityReport;
use crate::analysis::king_danger::HIGH_KING_DANGER;
use crate::analysis::phase::GamePhase;
use crate::engines::decision_state::{DecisionState, ThinkPlan};
use crate::engines::engine_trait::{ClockInfo, ModeFlags};
use crate::engines::policy::{BlunderPolicy, ClockPolicy, HumanPolicy};
use crate::engines::time_management::{
    normal_think_time, opening_think_time, smooth_think_time, time_scramble_think_time,
};

/// Modes that depend on the clocks alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClockModes {
    pub time_scramble: bool,
    pub premove_mode: bool,
    pub flagging: bool,
}

/// What the engine measured about the position before deciding modes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurnSignals {
    pub phase: GamePhase,
    pub fullmove_number: u16,
    /// Only measured outside the opening and outside time scrambles.
    pub complexity: Option<ComplexityReport>,
    pub king_danger: f64,
}

pub fn clock_modes(clocks: &ClockInfo, bullet_threshold: f64, policy: &ClockPolicy) -> ClockModes {
    if !clocks.is_timed() {
        return ClockModes::default();
    }
    let own = clocks.own_secs();
    let start = clocks.start_secs();

    ClockModes {
        time_scramble: own < policy.time_scramble_own_secs
            || start < policy.short_game_secs
            || clocks.own_fraction() < policy.time_scramble_fraction,
        premove_mode: own < policy.premove_own_secs || start < policy.premove_start_secs,
        flagging: own < bullet_threshold || clocks.opp_secs() < policy.opponent_critical_secs,
    }
}

/// Decide whether this turn is blunder prone and how the final selection
/// should err, from efficient mobility, complexity and king danger.
pub fn blunder_decision(
    report: &ComplexityReport,
    king_danger: f64,
    policy: &BlunderPolicy,
    rng: &mut impl Rng,
) -> (bool, f64, f64) {
    let accurate = (policy.accurate_difficulty, policy.accurate_stdev);
    let eff = report.efficient_mobility;

    if eff < policy.mobility_low {
        // Few good moves: mostly accurate, but tactics still get missed.
        let missed = rng.random_bool(policy.missed_tactic_probability.clamp(0.0, 1.0));
        (missed, accurate.0, accurate.1)
    } else if eff < policy.mobility_high {
        let difficulty = policy.difficulty_base + rng.random::<f64>() * policy.difficulty_spread;
        let stdev = report.complexity.max(0.0).powf(policy.stdev_exponent);
        (true, difficulty, stdev)
    } else {
        (king_danger > HIGH_KING_DANGER, accurate.0, accurate.1)
    }
}

pub fn next_state(
    prev: &DecisionState,
    signals: &TurnSignals,
    clocks: &ClockInfo,
    policy: &HumanPolicy,
    rng: &mut impl Rng,
) -> DecisionState {
    let modes = clock_modes(clocks, prev.bullet_threshold, &policy.clock);
    let blunder = &policy.blunder;

    let (blunder_prone, plan) = if modes.time_scramble {
        let think = time_scramble_think_time(
            clocks,
            signals.fullmove_number,
            &policy.clock,
            &policy.timing,
            rng,
        );
        (
            rng.random_bool(blunder.time_scramble_probability.clamp(0.0, 1.0)),
            ThinkPlan {
                difficulty: blunder.scramble_difficulty,
                loss_stdev: blunder.scramble_stdev,
                think_time: think,
            },
        )
    } else if signals.phase == GamePhase::Opening {
        let think = opening_think_time(clocks, &policy.clock, &policy.timing, rng);
        (false, ThinkPlan::accurate(blunder, think))
    } else {
        let (prone, difficulty, loss_stdev, complexity) = match &signals.complexity {
            Some(report) => {
                let (prone, difficulty, stdev) =
                    blunder_decision(report, signals.king_danger, blunder, rng);
                (prone, difficulty, stdev, report.complexity)
            }
            None => (false, blunder.accurate_difficulty, blunder.accurate_stdev, 0.0),
        };
        let sampled = normal_think_time(
            clocks,
            signals.fullmove_number,
            complexity,
            &policy.clock,
            &policy.timing,
            rng,
        );
        (
            prone,
            ThinkPlan {
                difficulty,
                loss_stdev,
                think_time: smooth_think_time(sampled, prev, &policy.timing),
            },
        )
    };

    let think_secs = plan.think_time.as_secs_f64();
    let flags = ModeFlags {
        blunder_prone,
        time_scramble: modes.time_scramble,
        premove_mode: modes.premove_mode,
        flagging: modes.flagging,
        resigned: prev.flags.resigned,
        mate_in_one: false,
        big_material_take: false,
        long_think: think_secs >= policy.timing.long_think_secs,
        quick_move: think_secs < policy.timing.quick_move_secs,
    };

    let mut next = prev.clone();
    next.phase = signals.phase;
    next.flags = flags;
    next.plan = plan;
    next.obvious_move = None;
    next
}
