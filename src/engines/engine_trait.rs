//! Engine-facing contract used by the game loop.
//!
//! Defines the clock input, the per-turn decision payload and the trait every
//! human-like engine implements, so drivers can hold engines behind a single
//! interface.

use std::sync::{atomic::AtomicBool, Arc};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::analysis::phase::GamePhase;
use crate::errors::HumanResult;
use crate::game_state::game_state::GameState;

/// Clock readings at the start of a turn. A zero `starting_budget` means the
/// game is untimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClockInfo {
    pub starting_budget: Duration,
    pub own_time: Duration,
    pub opp_time: Duration,
}

impl ClockInfo {
    pub fn new(starting_budget: Duration, own_time: Duration, opp_time: Duration) -> Self {
        Self {
            starting_budget,
            own_time,
            opp_time,
        }
    }

    pub fn from_millis(starting_ms: u64, own_ms: u64, opp_ms: u64) -> Self {
        Self::new(
            Duration::from_millis(starting_ms),
            Duration::from_millis(own_ms),
            Duration::from_millis(opp_ms),
        )
    }

    pub fn untimed() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_timed(&self) -> bool {
        !self.starting_budget.is_zero()
    }

    #[inline]
    pub fn start_secs(&self) -> f64 {
        self.starting_budget.as_secs_f64()
    }

    #[inline]
    pub fn own_secs(&self) -> f64 {
        self.own_time.as_secs_f64()
    }

    #[inline]
    pub fn opp_secs(&self) -> f64 {
        self.opp_time.as_secs_f64()
    }

    /// Own clock as a fraction of the starting budget; 1.0 when untimed.
    pub fn own_fraction(&self) -> f64 {
        if self.is_timed() {
            self.own_secs() / self.start_secs()
        } else {
            1.0
        }
    }

    pub fn opp_fraction(&self) -> f64 {
        if self.is_timed() {
            self.opp_secs() / self.start_secs()
        } else {
            1.0
        }
    }
}

/// Per-turn mode flags. Recomputed every turn; only `resigned` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModeFlags {
    pub blunder_prone: bool,
    pub time_scramble: bool,
    pub premove_mode: bool,
    /// Survival play: minimal input distance, avoid repetitions.
    pub flagging: bool,
    pub resigned: bool,
    pub mate_in_one: bool,
    pub big_material_take: bool,
    pub long_think: bool,
    pub quick_move: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MoveDecision {
    /// Long-algebraic move, `None` only after resigning.
    pub chosen_move: Option<String>,
    /// How long the move should appear to take.
    pub think_time: Duration,
    /// Additional wait declared for camouflage, on top of `think_time`.
    pub extra_delay: Duration,
    pub flags: ModeFlags,
    pub phase: GamePhase,
    pub decided_at: DateTime<Utc>,
}

impl MoveDecision {
    pub fn resigned(phase: GamePhase, flags: ModeFlags) -> Self {
        Self {
            chosen_move: None,
            think_time: Duration::ZERO,
            extra_delay: Duration::ZERO,
            flags: ModeFlags {
                resigned: true,
                ..flags
            },
            phase,
            decided_at: Utc::now(),
        }
    }

    /// Total wait the caller should observe before submitting the move.
    pub fn total_delay(&self) -> Duration {
        self.think_time + self.extra_delay
    }
}

pub trait HumanlikeEngine: Send {
    fn update_position(&mut self, position: GameState);

    fn position(&self) -> &GameState;

    /// Decide the engine's move in its stored position and play it there.
    fn make_move(
        &mut self,
        clocks: ClockInfo,
        prev_position: Option<&GameState>,
        prev_move: Option<&str>,
    ) -> HumanResult<MoveDecision>;

    /// Speculative reply for a position where the opponent is to move.
    fn premove(&mut self, position: &GameState) -> HumanResult<Option<String>>;

    fn reset(&mut self);

    fn set_stop_signal(&mut self, _stop_signal: Option<Arc<AtomicBool>>) {}
}
