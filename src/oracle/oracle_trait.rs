//! Positional oracle abstraction.
//!
//! The decision engine never searches on its own; it asks an external
//! evaluator for ranked lines. Implementations must be shareable across game
//! instances and serialise their own access to the underlying process.

use std::sync::atomic::AtomicBool;
use std::time::Duration;

use crate::errors::HumanResult;
use crate::game_state::game_state::GameState;
use crate::oracle::score::Score;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchLimit {
    Depth(u32),
    Time(Duration),
}

#[derive(Debug, Clone)]
pub struct EvaluationRequest<'a> {
    pub position: &'a GameState,
    pub limit: SearchLimit,
    /// Restrict the search to these root moves; empty means all legal moves.
    pub root_moves: &'a [String],
    pub multipv: usize,
}

impl<'a> EvaluationRequest<'a> {
    pub fn new(position: &'a GameState, limit: SearchLimit, multipv: usize) -> Self {
        Self {
            position,
            limit,
            root_moves: &[],
            multipv,
        }
    }

    pub fn restricted_to(mut self, root_moves: &'a [String]) -> Self {
        self.root_moves = root_moves;
        self
    }

    /// Number of lines to ask for: never more than the restricted root set.
    pub fn effective_multipv(&self) -> usize {
        if self.root_moves.is_empty() {
            self.multipv.max(1)
        } else {
            self.multipv.clamp(1, self.root_moves.len())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineLine {
    pub move_uci: String,
    pub score: Score,
}

impl EngineLine {
    pub fn new(move_uci: impl Into<String>, score: Score) -> Self {
        Self {
            move_uci: move_uci.into(),
            score,
        }
    }

    #[inline]
    pub fn centipawns(&self) -> i32 {
        self.score.to_centipawns()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayResult {
    pub best_move: String,
    /// The reply the oracle expects from the opponent.
    pub ponder: Option<String>,
}

pub trait PositionalOracle: Send + Sync {
    /// Ranked lines for the position, best first. `cancel` aborts the search
    /// with `HumanEngineError::Cancelled` when raised.
    fn evaluate(
        &self,
        request: &EvaluationRequest<'_>,
        cancel: Option<&AtomicBool>,
    ) -> HumanResult<Vec<EngineLine>>;

    fn play(
        &self,
        position: &GameState,
        limit: SearchLimit,
        cancel: Option<&AtomicBool>,
    ) -> HumanResult<PlayResult>;
}

/// Sort lines best first by folded centipawns, keeping oracle order on ties.
pub fn sort_best_first(lines: &mut [EngineLine]) {
    lines.sort_by_key(|line| std::cmp::Reverse(line.centipawns()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multipv_is_capped_by_root_moves() {
        let game = GameState::new_game();
        let roots = vec!["e2e4".to_owned(), "d2d4".to_owned()];
        let request = EvaluationRequest::new(&game, SearchLimit::Depth(5), 3).restricted_to(&roots);
        assert_eq!(request.effective_multipv(), 2);
        let open = EvaluationRequest::new(&game, SearchLimit::Depth(5), 0);
        assert_eq!(open.effective_multipv(), 1);
    }

    #[test]
    fn sorting_puts_mates_first() {
        let mut lines = vec![
            EngineLine::new("a2a3", Score::Centipawns(10)),
            EngineLine::new(
                "d1h5",
                Score::MateIn {
                    moves: 2,
                    side: crate::oracle::score::MateSide::Giving,
                },
            ),
            EngineLine::new("e2e4", Score::Centipawns(40)),
        ];
        sort_best_first(&mut lines);
        let order: Vec<_> = lines.iter().map(|l| l.move_uci.as_str()).collect();
        assert_eq!(order, vec!["d1h5", "e2e4", "a2a3"]);
    }
}
