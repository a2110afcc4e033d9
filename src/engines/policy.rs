//! Tunable behaviour parameters.
//!
//! Every threshold, multiplier and distribution parameter the decision engine
//! uses lives here. `Default` reproduces the tuned values; a TOML file only
//! needs to name the fields it changes.
//!
//! ```toml
//! [clock]
//! time_scramble_own_secs = 20.0
//!
//! [resign]
//! enabled = true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{HumanEngineError, HumanResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HumanPolicy {
    pub clock: ClockPolicy,
    pub timing: TimingPolicy,
    pub caps: CapsPolicy,
    pub rerank: RerankPolicy,
    pub obvious: ObviousPolicy,
    pub blunder: BlunderPolicy,
    pub premove: PremovePolicy,
    pub resign: ResignPolicy,
    pub history: HistoryPolicy,
}

impl HumanPolicy {
    pub fn from_toml_str(text: &str) -> HumanResult<Self> {
        toml::from_str(text).map_err(|e| HumanEngineError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> HumanResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| HumanEngineError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }
}

/// Clock thresholds that switch modes. Times are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClockPolicy {
    pub time_scramble_own_secs: f64,
    /// Games shorter than this are played in time-scramble mode throughout.
    pub short_game_secs: f64,
    pub time_scramble_fraction: f64,
    pub premove_own_secs: f64,
    pub premove_start_secs: f64,
    /// Bullet threshold is `base + uniform(1..=jitter)` seconds, drawn per game.
    pub bullet_threshold_base: u32,
    pub bullet_threshold_jitter: u32,
    /// Opponent clock below which survival (flagging) play starts.
    pub opponent_critical_secs: f64,
    /// Clock budget assumed for think-time formulas in untimed games.
    pub untimed_budget_secs: f64,
}

impl Default for ClockPolicy {
    fn default() -> Self {
        Self {
            time_scramble_own_secs: 25.0,
            short_game_secs: 61.0,
            time_scramble_fraction: 1.0 / 6.0,
            premove_own_secs: 11.0,
            premove_start_secs: 16.0,
            bullet_threshold_base: 9,
            bullet_threshold_jitter: 5,
            opponent_critical_secs: 5.0,
            untimed_budget_secs: 600.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingPolicy {
    pub floor_secs: f64,
    pub opening_mean_secs: f64,
    pub opening_short_game_mean_secs: f64,
    pub opening_stdev_secs: f64,
    pub opening_floor_secs: f64,
    pub opening_max_secs: f64,
    /// Below this own clock a time-scramble move is played at the floor.
    pub scramble_panic_secs: f64,
    /// Own-time divisors for the time-scramble mean before move 10, before
    /// move 20, and afterwards.
    pub scramble_divisors: [f64; 3],
    pub scramble_stdev_divisor: f64,
    pub scramble_short_game_stdev_divisor: f64,
    /// Own clock above which short games keep the wider divisor.
    pub scramble_short_game_calm_secs: f64,
    pub chi_squared_dof: u32,
    pub chi_squared_move_scale: f64,
    /// Past this move number the chi-squared mean is doubled.
    pub late_game_move: u16,
    pub easy_divisor: f64,
    pub hard_divisor: f64,
    pub complexity_scale: f64,
    pub complexity_exponent: f64,
    /// Complexity at or above which the hard factor applies.
    pub hard_complexity: f64,
    pub normal_stdev_divisor: f64,
    pub opponent_pressure_fraction: f64,
    pub opponent_pressure_mean_secs: f64,
    pub opponent_pressure_probability: f64,
    pub opponent_pressure_budget_divisor: f64,
    /// Fixed think time in reduced-variance calibration runs.
    pub shadow_mode: bool,
    pub shadow_secs: f64,
    /// Weight given to the mean of recent move times.
    pub smoothing_weight: f64,
    pub obvious_move_max_secs: f64,
    pub long_think_secs: f64,
    pub quick_move_secs: f64,
    pub evasion_delay_min_ms: u64,
    pub evasion_delay_max_ms: u64,
}

impl Default for TimingPolicy {
    fn default() -> Self {
        Self {
            floor_secs: 0.1,
            opening_mean_secs: 0.4,
            opening_short_game_mean_secs: 0.1,
            opening_stdev_secs: 0.3,
            opening_floor_secs: 0.2,
            opening_max_secs: 0.9,
            scramble_panic_secs: 25.0,
            scramble_divisors: [260.0, 220.0, 180.0],
            scramble_stdev_divisor: 50.0,
            scramble_short_game_stdev_divisor: 40.0,
            scramble_short_game_calm_secs: 40.0,
            chi_squared_dof: 7,
            chi_squared_move_scale: 4.0,
            late_game_move: 40,
            easy_divisor: 10.0,
            hard_divisor: 7.0,
            complexity_scale: 55.0,
            complexity_exponent: 1.8,
            hard_complexity: 25.0,
            normal_stdev_divisor: 90.0,
            opponent_pressure_fraction: 1.0 / 6.0,
            opponent_pressure_mean_secs: 1.5,
            opponent_pressure_probability: 0.8,
            opponent_pressure_budget_divisor: 100.0,
            shadow_mode: false,
            shadow_secs: 1.0,
            smoothing_weight: 0.2,
            obvious_move_max_secs: 0.5,
            long_think_secs: 10.0,
            quick_move_secs: 1.0,
            evasion_delay_min_ms: 300,
            evasion_delay_max_ms: 1200,
        }
    }
}

/// Per-phase cap coefficients: `cap = legal_moves_of_kind * slope + offset`,
/// indexed pawn, knight, bishop, rook, queen, king.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CapsPolicy {
    pub opening_slopes: [f64; 6],
    pub opening_offsets: [f64; 6],
    pub midgame_slopes: [f64; 6],
    pub midgame_offsets: [f64; 6],
    pub endgame_slopes: [f64; 6],
    pub endgame_offsets: [f64; 6],
    /// Fewer pieces than this on the board switches to `exhaustive`.
    pub few_pieces: u32,
    pub exhaustive: [usize; 6],
    pub blunder_prone: usize,
    /// Candidates kept after re-ranking in a blunder-prone turn.
    pub narrow_default: usize,
    pub narrow_low_mobility: usize,
    pub low_mobility: f64,
    pub narrow_king_danger_bonus: usize,
    /// Multiplier for destination squares holding an enemy piece.
    pub capture_destination_bonus: f32,
}

impl Default for CapsPolicy {
    fn default() -> Self {
        Self {
            opening_slopes: [0.5, 0.6, 0.6, 0.2, 0.4, 1.0],
            opening_offsets: [3.0, 3.0, 3.0, 1.0, 3.0, 6.0],
            midgame_slopes: [0.5, 0.5, 0.5, 0.5, 0.5, 1.0],
            midgame_offsets: [3.0, 3.0, 3.0, 3.0, 4.0, 6.0],
            endgame_slopes: [0.7, 0.7, 0.7, 1.0, 1.0, 1.0],
            endgame_offsets: [3.0, 3.0, 3.0, 3.0, 3.0, 6.0],
            few_pieces: 8,
            exhaustive: [64, 24, 24, 24, 36, 20],
            blunder_prone: 10,
            narrow_default: 7,
            narrow_low_mobility: 4,
            low_mobility: 8.0,
            narrow_king_danger_bonus: 2,
            capture_destination_bonus: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RerankPolicy {
    pub hanging_capture: f64,
    pub endgame_pawn_capture: f64,
    pub poor_trade_divisor: f64,
    pub losing_trade_divisor: f64,
    /// Material deficit (material-weight units) that counts as clearly losing.
    pub losing_material: f64,
    pub pawn_advance: f64,
    pub promotion: f64,
    pub hanging_escape: f64,
    /// New attacks are boosted by `1 + salience / new_attack_scale`.
    pub new_attack_scale: f64,
    pub protect_threatened: f64,
    pub shuffle_divisor: f64,
    /// Hung or abandoned pieces divide by `max(1, salience / hang_scale)`.
    pub hang_scale: f64,
    pub weird_divisor: f64,
}

impl Default for RerankPolicy {
    fn default() -> Self {
        Self {
            hanging_capture: 8.0,
            endgame_pawn_capture: 2.0,
            poor_trade_divisor: 4.0,
            losing_trade_divisor: 3.0,
            losing_material: 3.0,
            pawn_advance: 1.5,
            promotion: 6.0,
            hanging_escape: 4.0,
            new_attack_scale: 10.0,
            protect_threatened: 3.0,
            shuffle_divisor: 5.0,
            hang_scale: 2.0,
            weird_divisor: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ObviousPolicy {
    pub depth: u32,
    pub short_game_depth: u32,
    pub multipv: usize,
    /// Lines within this many centipawns of the best are interchangeable.
    pub sample_band_cp: i32,
    pub flagging_band_cp: i32,
    /// Best line at or below this counts as losing for repetition purposes.
    pub losing_cp: i32,
    /// Own clock below `ratio * opponent clock` is critically behind.
    pub critical_time_ratio: f64,
    /// A fingerprint seen this many times is a repetition to avoid.
    pub repetition_count: usize,
    pub margin_cp: i32,
    pub takeback_tolerance: f64,
    pub big_take_deficit: f64,
    pub big_take_value: f64,
    pub big_take_gain: f64,
    pub quick_move_probability: f64,
    pub complexity_depth: u32,
    pub complexity_multipv: usize,
}

impl Default for ObviousPolicy {
    fn default() -> Self {
        Self {
            depth: 6,
            short_game_depth: 5,
            multipv: 3,
            sample_band_cp: 30,
            flagging_band_cp: 80,
            losing_cp: -100,
            critical_time_ratio: 0.5,
            repetition_count: 2,
            margin_cp: 200,
            takeback_tolerance: 1.7,
            big_take_deficit: -2.5,
            big_take_value: 2.9,
            big_take_gain: 1.0,
            quick_move_probability: 0.1,
            complexity_depth: 8,
            complexity_multipv: 18,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlunderPolicy {
    /// Efficient-mobility band in which every turn is blunder prone.
    pub mobility_low: f64,
    pub mobility_high: f64,
    /// Chance of a missed tactic when mobility is below the band.
    pub missed_tactic_probability: f64,
    pub time_scramble_probability: f64,
    pub accurate_difficulty: f64,
    pub accurate_stdev: f64,
    pub scramble_difficulty: f64,
    pub scramble_stdev: f64,
    /// Blunder-prone difficulty is drawn from `[base, base + spread)`.
    pub difficulty_base: f64,
    pub difficulty_spread: f64,
    pub stdev_exponent: f64,
    /// Centipawn loss mean is `-loss_per_level * (10 - difficulty)`.
    pub loss_per_level: f64,
    pub final_multipv: usize,
}

impl Default for BlunderPolicy {
    fn default() -> Self {
        Self {
            mobility_low: 8.0,
            mobility_high: 20.0,
            missed_tactic_probability: 0.3,
            time_scramble_probability: 0.35,
            accurate_difficulty: 10.0,
            accurate_stdev: 4.0,
            scramble_difficulty: 7.0,
            scramble_stdev: 20.0,
            difficulty_base: 7.0,
            difficulty_spread: 3.0,
            stdev_exponent: 0.65,
            loss_per_level: 5.0,
            final_multipv: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PremovePolicy {
    pub probe_depth: u32,
    /// Largest trade-point gap between attacker and target for a recapture.
    pub value_tolerance: f64,
    pub blind_probability: f64,
    pub blind_depth: u32,
}

impl Default for PremovePolicy {
    fn default() -> Self {
        Self {
            probe_depth: 3,
            value_tolerance: 0.7,
            blind_probability: 0.66,
            blind_depth: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResignPolicy {
    pub enabled: bool,
    /// Resignation threshold is `base + uniform(1..=jitter)` full moves.
    pub min_move_base: u16,
    pub min_move_jitter: u16,
    pub probe_depth: u32,
    pub opponent_floor_secs: f64,
    pub opponent_fraction: f64,
    pub hopeless_percentage: f64,
    pub untimed_hopeless_percentage: f64,
}

impl Default for ResignPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            min_move_base: 30,
            min_move_jitter: 10,
            probe_depth: 10,
            opponent_floor_secs: 30.0,
            opponent_fraction: 1.0 / 6.0,
            hopeless_percentage: 99.0,
            untimed_hopeless_percentage: 97.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HistoryPolicy {
    pub positions: usize,
    pub move_times: usize,
}

impl Default for HistoryPolicy {
    fn default() -> Self {
        Self {
            positions: 12,
            move_times: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_is_the_default_policy() {
        let policy = HumanPolicy::from_toml_str("").expect("empty policy parses");
        assert_eq!(policy, HumanPolicy::default());
        assert!(!policy.resign.enabled);
    }

    #[test]
    fn partial_tables_keep_other_defaults() {
        let policy = HumanPolicy::from_toml_str(
            r#"
            [clock]
            time_scramble_own_secs = 20.0

            [resign]
            enabled = true
            "#,
        )
        .expect("policy parses");
        assert_eq!(policy.clock.time_scramble_own_secs, 20.0);
        assert_eq!(policy.clock.premove_own_secs, 11.0);
        assert!(policy.resign.enabled);
        assert_eq!(policy.resign.min_move_base, 30);
    }

    #[test]
    fn unknown_keys_are_config_errors() {
        let result = HumanPolicy::from_toml_str("[clock]\nturbo = true\n");
        assert!(matches!(result, Err(HumanEngineError::Config(_))));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let result = HumanPolicy::load("/nonexistent/policy.toml");
        assert!(matches!(result, Err(HumanEngineError::Config(_))));
    }
}
