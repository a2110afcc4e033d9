//! Weight-free fallback predictor.
//!
//! Reads the perspective board out of the encoding and favours central
//! destinations, captures, and pieces with room to move. Good enough to drive
//! the engine when no trained weights are available.

use crate::errors::HumanResult;
use crate::game_state::{chess_types::*, game_state::{bits, GameState}};
use crate::moves::attack_tables::piece_attacks;
use crate::predictor::board_encoding::{output_index, BoardEncoding};
use crate::predictor::predictor_trait::{PlausibilityPredictor, PredictorModel, SquareDistribution};

const CAPTURE_BONUS: f32 = 2.0;
const PAWN_SELECTOR_DISCOUNT: f32 = 0.5;

#[derive(Debug, Clone, Copy, Default)]
pub struct CentralityPredictor;

impl CentralityPredictor {
    pub fn new() -> Self {
        Self
    }
}

/// 0.5 on the rim up to 3.5 in the four centre squares.
fn centrality(square: Square) -> f32 {
    let file = square_file(square) as f32;
    let rank = square_rank(square) as f32;
    let distance = (file - 3.5).abs().max((rank - 3.5).abs());
    4.0 - distance
}

/// Squares the mover's piece on `from` can reach, ignoring pins.
fn reachable(board: &GameState, piece: PieceKind, from: Square) -> u64 {
    let own = board.occupancy_by_color[Color::Light.index()];
    let enemy = board.occupancy_by_color[Color::Dark.index()];
    if piece == PieceKind::Pawn {
        let mut push = 0u64;
        if from < 56 && board.occupancy_all & (1u64 << (from + 8)) == 0 {
            push |= 1u64 << (from + 8);
            if square_rank(from) == 1 && board.occupancy_all & (1u64 << (from + 16)) == 0 {
                push |= 1u64 << (from + 16);
            }
        }
        return push | (piece_attacks(Color::Light, piece, from, board.occupancy_all) & enemy);
    }
    piece_attacks(Color::Light, piece, from, board.occupancy_all) & !own
}

fn normalise(weights: [f32; 64]) -> SquareDistribution {
    let total: f32 = weights.iter().sum();
    if total <= 0.0 {
        return SquareDistribution::uniform();
    }
    let mut out = weights;
    for weight in &mut out {
        *weight /= total;
    }
    SquareDistribution(out)
}

impl PlausibilityPredictor for CentralityPredictor {
    fn predict(
        &self,
        model: PredictorModel,
        encoding: &BoardEncoding,
    ) -> HumanResult<SquareDistribution> {
        let board = encoding.perspective();
        let enemy = board.occupancy_by_color[Color::Dark.index()];
        let mut weights = [0.0f32; 64];

        match model {
            PredictorModel::PieceSelector => {
                for piece in PieceKind::ALL {
                    for from in bits(board.bitboard(Color::Light, piece)) {
                        let mobility = reachable(board, piece, from).count_ones() as f32;
                        let discount = if piece == PieceKind::Pawn {
                            PAWN_SELECTOR_DISCOUNT
                        } else {
                            1.0
                        };
                        weights[output_index(from)] = mobility * discount;
                    }
                }
            }
            PredictorModel::Destination(piece) => {
                for from in bits(board.bitboard(Color::Light, piece)) {
                    for to in bits(reachable(board, piece, from)) {
                        let capture = if enemy & (1u64 << to) != 0 {
                            CAPTURE_BONUS
                        } else {
                            0.0
                        };
                        weights[output_index(to)] += centrality(to) + capture;
                    }
                }
            }
        }

        Ok(normalise(weights))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn knights_prefer_central_development() {
        let encoding = BoardEncoding::for_side(&GameState::new_game(), Color::Light);
        let knight = CentralityPredictor::new()
            .predict(PredictorModel::Destination(PieceKind::Knight), &encoding)
            .expect("prediction");
        let top: Vec<Square> = knight.top_squares(2).into_iter().map(|(sq, _)| sq).collect();
        // c3 and f3 beat the rim squares a3 and h3.
        assert!(top.contains(&18));
        assert!(top.contains(&21));
        assert_eq!(knight.probability_at(28), 0.0);
    }

    #[test]
    fn selector_ignores_pieces_that_cannot_move() {
        let encoding = BoardEncoding::for_side(&GameState::new_game(), Color::Light);
        let selector = CentralityPredictor::new()
            .predict(PredictorModel::PieceSelector, &encoding)
            .expect("prediction");
        // a1 rook is boxed in, g1 knight is not.
        assert_eq!(selector.probability_at(0), 0.0);
        assert!(selector.probability_at(6) > 0.0);
        let total: f32 = selector.0.iter().sum();
        assert!((total - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_model_falls_back_to_uniform() {
        let game = GameState::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1").expect("FEN should parse");
        let encoding = BoardEncoding::for_side(&game, Color::Light);
        let queen = CentralityPredictor::new()
            .predict(PredictorModel::Destination(PieceKind::Queen), &encoding)
            .expect("prediction");
        assert_eq!(queen, SquareDistribution::uniform());
    }
}
