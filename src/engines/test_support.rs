//! In-memory oracle and predictor fakes for unit tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::analysis::en_pris::hanging_pieces;
use crate::analysis::piece_values::exchange_value;
use crate::errors::{HumanEngineError, HumanResult};
use crate::game_state::{chess_types::*, game_state::GameState};
use crate::move_generation::legal_move_checks::is_king_in_check;
use crate::move_generation::legal_move_generator::generate_legal_moves;
use crate::oracle::oracle_trait::{
    sort_best_first, EngineLine, EvaluationRequest, PlayResult, PositionalOracle, SearchLimit,
};
use crate::oracle::score::{MateSide, Score};
use crate::predictor::board_encoding::BoardEncoding;
use crate::predictor::predictor_trait::{PlausibilityPredictor, PredictorModel, SquareDistribution};
use crate::utils::long_algebraic::move_to_long_algebraic;

type Script = dyn Fn(&EvaluationRequest<'_>) -> Vec<EngineLine> + Send + Sync;

/// What the engine asked for, for assertions on probe depths and subsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub fen: String,
    pub limit: SearchLimit,
    pub root_moves: Vec<String>,
    pub multipv: usize,
}

pub struct ScriptedOracle {
    script: Box<Script>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedOracle {
    /// One-and-a-half ply material search: material after the move, minus the
    /// worst exchange the mover is left facing. Mates are found at one ply.
    pub fn material() -> Self {
        Self::from_fn(material_lines)
    }

    pub fn from_fn(
        script: impl Fn(&EvaluationRequest<'_>) -> Vec<EngineLine> + Send + Sync + 'static,
    ) -> Self {
        Self {
            script: Box::new(script),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn material_balance(game: &GameState, side: Color) -> i32 {
    PieceKind::ALL
        .into_iter()
        .filter(|&piece| piece != PieceKind::King)
        .map(|piece| {
            (game.count(side, piece) as i32 - game.count(side.opposite(), piece) as i32)
                * exchange_value(piece)
        })
        .sum()
}

fn material_lines(request: &EvaluationRequest<'_>) -> Vec<EngineLine> {
    let position = request.position;
    let mover = position.side_to_move;
    let Ok(legal) = generate_legal_moves(position) else {
        return Vec::new();
    };

    let mut lines: Vec<EngineLine> = legal
        .iter()
        .map(|generated| (move_to_long_algebraic(&generated.chess_move), generated))
        .filter(|(uci, _)| request.root_moves.is_empty() || request.root_moves.contains(uci))
        .map(|(uci, generated)| {
            let after = &generated.game_after_move;
            let opponent_stuck = generate_legal_moves(after).map_or(false, |m| m.is_empty());
            let score = if opponent_stuck && is_king_in_check(after, mover.opposite()) {
                Score::MateIn {
                    moves: 1,
                    side: MateSide::Giving,
                }
            } else {
                let exposed = hanging_pieces(after, mover)
                    .into_iter()
                    .map(|(_, _, net)| net)
                    .max()
                    .unwrap_or(0);
                Score::Centipawns((material_balance(after, mover) - exposed) * 100)
            };
            EngineLine::new(uci, score)
        })
        .collect();

    sort_best_first(&mut lines);
    lines.truncate(request.effective_multipv());
    lines
}

impl PositionalOracle for ScriptedOracle {
    fn evaluate(
        &self,
        request: &EvaluationRequest<'_>,
        cancel: Option<&AtomicBool>,
    ) -> HumanResult<Vec<EngineLine>> {
        if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            return Err(HumanEngineError::Cancelled);
        }
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedRequest {
                fen: request.position.get_fen(),
                limit: request.limit,
                root_moves: request.root_moves.to_vec(),
                multipv: request.multipv,
            });
        Ok((self.script)(request))
    }

    fn play(
        &self,
        position: &GameState,
        limit: SearchLimit,
        cancel: Option<&AtomicBool>,
    ) -> HumanResult<PlayResult> {
        let lines = self.evaluate(&EvaluationRequest::new(position, limit, 1), cancel)?;
        let best = lines
            .first()
            .ok_or_else(|| HumanEngineError::OracleProtocol("no legal moves to play".to_owned()))?;
        let ponder = crate::utils::long_algebraic::find_legal_move(&best.move_uci, position)
            .ok()
            .and_then(|generated| {
                material_lines(&EvaluationRequest::new(&generated.game_after_move, limit, 1))
                    .into_iter()
                    .next()
            })
            .map(|line| line.move_uci);
        Ok(PlayResult {
            best_move: best.move_uci.clone(),
            ponder,
        })
    }
}

/// Uniform distributions for every model.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatPredictor;

impl PlausibilityPredictor for FlatPredictor {
    fn predict(
        &self,
        _model: PredictorModel,
        _encoding: &BoardEncoding,
    ) -> HumanResult<SquareDistribution> {
        Ok(SquareDistribution::uniform())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn material_oracle_prefers_winning_material() {
        // The black queen on d4 is loose against the f3 knight.
        let game = GameState::from_fen("rnb1kbnr/pppp1ppp/8/8/3q4/5N2/PPPP1PPP/RNBQKB1R w KQkq - 0 4")
            .expect("FEN should parse");
        let oracle = ScriptedOracle::material();
        let lines = oracle
            .evaluate(&EvaluationRequest::new(&game, SearchLimit::Depth(3), 3), None)
            .expect("lines");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].move_uci, "f3d4");
        assert_eq!(oracle.requests().len(), 1);
    }

    #[test]
    fn root_moves_restrict_the_lines() {
        let game = GameState::new_game();
        let oracle = ScriptedOracle::material();
        let roots = vec!["a2a3".to_owned(), "h2h3".to_owned()];
        let request = EvaluationRequest::new(&game, SearchLimit::Depth(1), 5).restricted_to(&roots);
        let lines = oracle.evaluate(&request, None).expect("lines");
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| roots.contains(&l.move_uci)));
    }

    #[test]
    fn raised_cancel_flag_aborts() {
        let game = GameState::new_game();
        let oracle = ScriptedOracle::material();
        let stop = AtomicBool::new(true);
        let result = oracle.evaluate(&EvaluationRequest::new(&game, SearchLimit::Depth(1), 1), Some(&stop));
        assert!(matches!(result, Err(HumanEngineError::Cancelled)));
    }

    #[test]
    fn mate_in_one_is_reported_as_mate() {
        let game = GameState::from_fen("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1").expect("FEN should parse");
        let lines = ScriptedOracle::material()
            .evaluate(&EvaluationRequest::new(&game, SearchLimit::Depth(1), 2), None)
            .expect("lines");
        assert_eq!(lines[0].move_uci, "a1a8");
        assert!(lines[0].score.is_mate_in_one());
    }
}
