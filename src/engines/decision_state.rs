//! Per-game decision state.
//!
//! One value per active game. The mode flags and think plan are replaced
//! wholesale each turn by `mode_machine::next_state`; the memory fields
//! (histories, last moves) change only when a decided move is committed.

use std::collections::VecDeque;
use std::time::Duration;

use rand::Rng;

use crate::analysis::phase::GamePhase;
use crate::engines::engine_trait::ModeFlags;
use crate::engines::policy::{BlunderPolicy, HumanPolicy};
use crate::game_state::chess_types::Color;
use crate::moves::chess_move::ChessMove;

/// How the final selection should err this turn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThinkPlan {
    /// 0..=10; 10 aims at the best line.
    pub difficulty: f64,
    /// Standard deviation of the sampled centipawn loss.
    pub loss_stdev: f64,
    pub think_time: Duration,
}

impl ThinkPlan {
    pub fn accurate(blunder: &BlunderPolicy, think_time: Duration) -> Self {
        Self {
            difficulty: blunder.accurate_difficulty,
            loss_stdev: blunder.accurate_stdev,
            think_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecisionState {
    pub side: Color,
    pub phase: GamePhase,
    pub flags: ModeFlags,
    pub plan: ThinkPlan,
    /// Best probe line when it clearly dominated the second best.
    pub obvious_move: Option<String>,
    pub recent_move_times: VecDeque<Duration>,
    /// Fingerprints of recent positions, oldest first.
    pub position_history: VecDeque<String>,
    pub prev_own_move: Option<ChessMove>,
    pub prev_opponent_move: Option<String>,
    /// Position left to the opponent by the engine's last move.
    pub prev_fen: Option<String>,
    /// Full-move number before which resignation is never considered.
    pub resign_threshold: u16,
    /// Own clock, in seconds, below which survival play starts.
    pub bullet_threshold: f64,
    position_limit: usize,
    move_time_limit: usize,
}

impl DecisionState {
    pub fn new(side: Color, policy: &HumanPolicy, rng: &mut impl Rng) -> Self {
        let bullet_jitter = rng.random_range(1..=policy.clock.bullet_threshold_jitter.max(1));
        let resign_jitter = rng.random_range(1..=policy.resign.min_move_jitter.max(1));
        Self {
            side,
            phase: GamePhase::Opening,
            flags: ModeFlags::default(),
            plan: ThinkPlan::accurate(&policy.blunder, Duration::ZERO),
            obvious_move: None,
            recent_move_times: VecDeque::with_capacity(policy.history.move_times),
            position_history: VecDeque::with_capacity(policy.history.positions),
            prev_own_move: None,
            prev_opponent_move: None,
            prev_fen: None,
            resign_threshold: policy.resign.min_move_base + resign_jitter,
            bullet_threshold: f64::from(policy.clock.bullet_threshold_base + bullet_jitter),
            position_limit: policy.history.positions.max(1),
            move_time_limit: policy.history.move_times.max(1),
        }
    }

    pub fn push_position(&mut self, fingerprint: String) {
        if self.position_history.len() == self.position_limit {
            self.position_history.pop_front();
        }
        self.position_history.push_back(fingerprint);
    }

    pub fn push_move_time(&mut self, think_time: Duration) {
        if self.recent_move_times.len() == self.move_time_limit {
            self.recent_move_times.pop_front();
        }
        self.recent_move_times.push_back(think_time);
    }

    /// How often `fingerprint` appears in the recent history.
    pub fn times_seen(&self, fingerprint: &str) -> usize {
        self.position_history
            .iter()
            .filter(|seen| seen.as_str() == fingerprint)
            .count()
    }

    pub fn mean_recent_move_time(&self) -> Option<Duration> {
        let count = self.recent_move_times.len();
        if count == 0 {
            return None;
        }
        let total: Duration = self.recent_move_times.iter().sum();
        Some(total / count as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn fresh_state() -> DecisionState {
        let mut rng = StdRng::seed_from_u64(7);
        DecisionState::new(Color::Light, &HumanPolicy::default(), &mut rng)
    }

    #[test]
    fn thresholds_are_drawn_within_policy_ranges() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let state = DecisionState::new(Color::Dark, &HumanPolicy::default(), &mut rng);
            assert!((10.0..=14.0).contains(&state.bullet_threshold));
            assert!((31..=40).contains(&state.resign_threshold));
        }
    }

    #[test]
    fn accurate_plan_follows_the_policy() {
        let policy = HumanPolicy::from_toml_str("[blunder]\naccurate_difficulty = 9.5\naccurate_stdev = 6.0\n")
            .expect("policy parses");
        let mut rng = StdRng::seed_from_u64(3);
        let state = DecisionState::new(Color::Light, &policy, &mut rng);
        assert_eq!(state.plan.difficulty, 9.5);
        assert_eq!(state.plan.loss_stdev, 6.0);
        assert_eq!(state.plan.think_time, Duration::ZERO);

        let defaults = ThinkPlan::accurate(&HumanPolicy::default().blunder, Duration::from_secs(2));
        assert_eq!(defaults.difficulty, 10.0);
        assert_eq!(defaults.loss_stdev, 4.0);
    }

    #[test]
    fn histories_drop_the_oldest_entry() {
        let mut state = fresh_state();
        for i in 0..20 {
            state.push_position(format!("fp{i}"));
            state.push_move_time(Duration::from_millis(100 * i));
        }
        assert_eq!(state.position_history.len(), 12);
        assert_eq!(state.position_history.front().map(String::as_str), Some("fp8"));
        assert_eq!(state.recent_move_times.len(), 5);
        assert_eq!(state.recent_move_times.front(), Some(&Duration::from_millis(1500)));
    }

    #[test]
    fn repetitions_are_counted_and_times_averaged() {
        let mut state = fresh_state();
        assert_eq!(state.mean_recent_move_time(), None);
        state.push_position("a".to_owned());
        state.push_position("b".to_owned());
        state.push_position("a".to_owned());
        assert_eq!(state.times_seen("a"), 2);
        assert_eq!(state.times_seen("c"), 0);

        state.push_move_time(Duration::from_millis(200));
        state.push_move_time(Duration::from_millis(400));
        assert_eq!(state.mean_recent_move_time(), Some(Duration::from_millis(300)));
    }
}
