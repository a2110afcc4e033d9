//! Human-plausible candidate moves from the plausibility predictor.
//!
//! For every piece kind the destination model's most likely squares are
//! paired with each of the mover's pieces of that kind; pairs that are legal
//! moves become candidates scored `origin x destination`. How many squares
//! each kind gets depends on the phase, the number of legal moves of that
//! kind, and whether the turn is blunder prone.

use std::collections::HashMap;

use log::debug;

use crate::analysis::phase::GamePhase;
use crate::engines::policy::CapsPolicy;
use crate::errors::HumanResult;
use crate::game_state::{chess_types::*, game_state::{bits, GameState}};
use crate::move_generation::legal_move_generator::GeneratedMove;
use crate::moves::chess_move::ChessMove;
use crate::predictor::board_encoding::BoardEncoding;
use crate::predictor::predictor_trait::{PlausibilityPredictor, PredictorModel};
use crate::utils::long_algebraic::move_to_long_algebraic;

/// Number of destination squares considered per piece kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceCaps(pub [usize; 6]);

impl PieceCaps {
    #[inline]
    pub fn cap(&self, piece: PieceKind) -> usize {
        self.0[piece.index()]
    }
}

#[derive(Debug, Clone)]
pub struct CandidateMove {
    pub move_uci: String,
    pub chess_move: ChessMove,
    pub game_after_move: GameState,
    pub origin_probability: f64,
    pub destination_probability: f64,
    pub score: f64,
}

pub fn calculate_caps(
    position: &GameState,
    phase: GamePhase,
    blunder_prone: bool,
    legal: &[GeneratedMove],
    policy: &CapsPolicy,
) -> PieceCaps {
    // Endgame technique must not collapse, so this wins over tunnel vision.
    if position.piece_count() < policy.few_pieces {
        return PieceCaps(policy.exhaustive);
    }
    if blunder_prone {
        return PieceCaps([policy.blunder_prone; 6]);
    }

    let mut moves_per_kind = [0usize; 6];
    for generated in legal {
        moves_per_kind[generated.chess_move.piece.index()] += 1;
    }

    let (slopes, offsets) = match phase {
        GamePhase::Opening => (&policy.opening_slopes, &policy.opening_offsets),
        GamePhase::Midgame => (&policy.midgame_slopes, &policy.midgame_offsets),
        GamePhase::Endgame => (&policy.endgame_slopes, &policy.endgame_offsets),
    };

    let mut caps = [0usize; 6];
    for piece in PieceKind::ALL {
        let i = piece.index();
        caps[i] = (moves_per_kind[i] as f64 * slopes[i] + offsets[i]).max(0.0) as usize;
    }
    PieceCaps(caps)
}

/// Candidates for `side` (which must be the side to move), best first.
/// Promotions are only ever proposed as queen promotions.
pub fn generate_candidates(
    position: &GameState,
    side: Color,
    caps: &PieceCaps,
    legal: &[GeneratedMove],
    predictor: &dyn PlausibilityPredictor,
    policy: &CapsPolicy,
) -> HumanResult<Vec<CandidateMove>> {
    let encoding = BoardEncoding::for_side(position, side);
    let board = encoding.perspective();
    let selector = predictor.predict(PredictorModel::PieceSelector, &encoding)?;
    let to_board = |square: Square| match side {
        Color::Light => square,
        Color::Dark => mirror_square(square),
    };

    let mut by_uci: HashMap<String, CandidateMove> = HashMap::new();

    for piece in PieceKind::ALL {
        let origins = board.bitboard(Color::Light, piece);
        let cap = caps.cap(piece);
        if origins == 0 || cap == 0 {
            continue;
        }
        let piece_count = f64::from(origins.count_ones());
        let destinations = predictor.predict(PredictorModel::Destination(piece), &encoding)?;

        for (destination, probability) in destinations.top_squares(cap) {
            let mut destination_probability = f64::from(probability) * piece_count;
            if board.color_at(destination) == Some(Color::Dark) {
                destination_probability *= f64::from(policy.capture_destination_bonus);
            }

            for origin in bits(origins) {
                let (from, to) = (to_board(origin), to_board(destination));
                let Some(generated) = legal.iter().find(|generated| {
                    let mv = &generated.chess_move;
                    mv.from == from
                        && mv.to == to
                        && matches!(mv.promotion, None | Some(PieceKind::Queen))
                }) else {
                    continue;
                };

                let origin_probability = f64::from(selector.probability_at(origin));
                let move_uci = move_to_long_algebraic(&generated.chess_move);
                by_uci.insert(
                    move_uci.clone(),
                    CandidateMove {
                        move_uci,
                        chess_move: generated.chess_move,
                        game_after_move: generated.game_after_move.clone(),
                        origin_probability,
                        destination_probability,
                        score: origin_probability * destination_probability,
                    },
                );
            }
        }
    }

    let mut candidates: Vec<CandidateMove> = by_uci.into_values().collect();
    sort_candidates(&mut candidates);
    debug!(
        "caps {:?} produced {} candidate(s)",
        caps.0,
        candidates.len()
    );
    Ok(candidates)
}

/// Every legal move as an equally weighted candidate, queen promotions only.
pub fn all_legal_candidates(legal: &[GeneratedMove]) -> Vec<CandidateMove> {
    let mut candidates: Vec<CandidateMove> = legal
        .iter()
        .filter(|generated| matches!(generated.chess_move.promotion, None | Some(PieceKind::Queen)))
        .map(|generated| CandidateMove {
            move_uci: move_to_long_algebraic(&generated.chess_move),
            chess_move: generated.chess_move,
            game_after_move: generated.game_after_move.clone(),
            origin_probability: 1.0,
            destination_probability: 1.0,
            score: 1.0,
        })
        .collect();
    sort_candidates(&mut candidates);
    candidates
}

/// Highest score first; equal scores in move-string order.
pub fn sort_candidates(candidates: &mut [CandidateMove]) {
    candidates.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.move_uci.cmp(&b.move_uci))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::policy::HumanPolicy;
    use crate::move_generation::legal_move_generator::generate_legal_moves;
    use crate::predictor::centrality_predictor::CentralityPredictor;
    use crate::utils::long_algebraic::long_algebraic_to_move;

    fn candidates_for(fen: &str, side: Color) -> (GameState, Vec<CandidateMove>) {
        let game = GameState::from_fen(fen).expect("FEN should parse");
        let legal = generate_legal_moves(&game).expect("legal moves");
        let policy = HumanPolicy::default();
        let caps = calculate_caps(&game, GamePhase::Opening, false, &legal, &policy.caps);
        let candidates =
            generate_candidates(&game, side, &caps, &legal, &CentralityPredictor::new(), &policy.caps)
                .expect("candidates");
        (game, candidates)
    }

    #[test]
    fn opening_caps_scale_with_legal_moves() {
        let game = GameState::new_game();
        let legal = generate_legal_moves(&game).expect("legal moves");
        let policy = HumanPolicy::default();
        let caps = calculate_caps(&game, GamePhase::Opening, false, &legal, &policy.caps);
        assert_eq!(caps, PieceCaps([11, 5, 3, 1, 3, 6]));

        let blunder = calculate_caps(&game, GamePhase::Opening, true, &legal, &policy.caps);
        assert_eq!(blunder, PieceCaps([10; 6]));
    }

    #[test]
    fn few_pieces_get_exhaustive_caps_even_when_blunder_prone() {
        let game = GameState::from_fen("8/8/4k3/8/8/8/4K3/R7 w - - 0 60").expect("FEN should parse");
        let legal = generate_legal_moves(&game).expect("legal moves");
        let policy = HumanPolicy::default();
        let caps = calculate_caps(&game, GamePhase::Endgame, true, &legal, &policy.caps);
        assert_eq!(caps, PieceCaps([64, 24, 24, 24, 36, 20]));
    }

    #[test]
    fn every_candidate_is_legal_for_white() {
        let (game, candidates) = candidates_for(
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            Color::Light,
        );
        assert!(!candidates.is_empty());
        for candidate in &candidates {
            assert!(long_algebraic_to_move(&candidate.move_uci, &game).is_ok());
        }
        let ucis: Vec<&str> = candidates.iter().map(|c| c.move_uci.as_str()).collect();
        assert!(ucis.contains(&"g1f3"));
        assert!(ucis.contains(&"e2e4"));
    }

    #[test]
    fn black_candidates_are_mirrored_back() {
        let (game, candidates) = candidates_for(
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1",
            Color::Dark,
        );
        assert!(!candidates.is_empty());
        for candidate in &candidates {
            assert!(long_algebraic_to_move(&candidate.move_uci, &game).is_ok());
            assert_eq!(game.color_at(candidate.chess_move.from), Some(Color::Dark));
        }
        let ucis: Vec<&str> = candidates.iter().map(|c| c.move_uci.as_str()).collect();
        assert!(ucis.contains(&"g8f6"));
    }

    #[test]
    fn candidates_are_sorted_best_first() {
        let (_, candidates) = candidates_for(
            "r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3",
            Color::Light,
        );
        for pair in candidates.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }
}
