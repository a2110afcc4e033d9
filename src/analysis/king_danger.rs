//! King-danger score.
//!
//! Attackers and defenders of every square in a box around the king (two
//! files and three ranks either way) are weighed by their closeness to the
//! king. Open files next to the king and an enemy queen add flat penalties.

use crate::analysis::files::{file_status, FileStatus};
use crate::analysis::phase::GamePhase;
use crate::game_state::{chess_types::*, game_state::GameState};
use crate::move_generation::legal_move_checks::attackers_to_square;

const BOX_FILE_RADIUS: u8 = 2;
const BOX_RANK_RADIUS: u8 = 3;
const DISTANCE_CEILING: f64 = 4.0;
const DEFENDER_DISCOUNT: f64 = 1.5;

pub const OPEN_FILE_PENALTY: f64 = 500.0;
pub const SEMI_OPEN_FILE_PENALTY: f64 = 400.0;
pub const ENEMY_QUEEN_PENALTY: f64 = 300.0;

/// Threshold above which the king is considered under real pressure.
pub const HIGH_KING_DANGER: f64 = 400.0;

#[inline]
const fn danger_value(piece: PieceKind) -> f64 {
    match piece {
        PieceKind::Pawn => 15.0,
        PieceKind::Knight => 10.0,
        PieceKind::Bishop => 10.5,
        PieceKind::Rook => 35.5,
        PieceKind::Queen => 55.0,
        PieceKind::King => 0.0,
    }
}

#[inline]
const fn protection_value(piece: PieceKind) -> f64 {
    match piece {
        PieceKind::Pawn => 40.0,
        PieceKind::Knight => 20.0,
        PieceKind::Bishop => 20.5,
        PieceKind::Rook => 25.5,
        PieceKind::Queen => 55.0,
        PieceKind::King => 0.0,
    }
}

pub fn king_danger(game_state: &GameState, side: Color, phase: GamePhase) -> f64 {
    let Some(king_sq) = game_state.king_square(side) else {
        return 0.0;
    };
    let enemy = side.opposite();
    let king_file = square_file(king_sq);
    let king_rank = square_rank(king_sq);

    let mut danger = 0.0;

    for file in king_file.saturating_sub(BOX_FILE_RADIUS)..=(king_file + BOX_FILE_RADIUS).min(7) {
        for rank in king_rank.saturating_sub(BOX_RANK_RADIUS)..=(king_rank + BOX_RANK_RADIUS).min(7) {
            let square = make_square(file, rank);
            let closeness = DISTANCE_CEILING - square_distance(square, king_sq) as f64;

            danger += attackers_to_square(game_state, square, enemy)
                .iter()
                .map(|&(_, piece)| closeness * danger_value(piece))
                .sum::<f64>();
            danger -= attackers_to_square(game_state, square, side)
                .iter()
                .map(|&(_, piece)| closeness / DEFENDER_DISCOUNT * protection_value(piece))
                .sum::<f64>();
        }
    }

    if phase != GamePhase::Endgame {
        for file in king_file.saturating_sub(1)..=(king_file + 1).min(7) {
            danger += match file_status(game_state, file) {
                FileStatus::Open => OPEN_FILE_PENALTY,
                FileStatus::SemiOpenFor(color) if color == side => SEMI_OPEN_FILE_PENALTY,
                _ => 0.0,
            };
        }
    }

    danger += game_state.count(enemy, PieceKind::Queen) as f64 * ENEMY_QUEEN_PENALTY;
    danger
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn castled_king_behind_pawns_is_safer_than_exposed_king() {
        let sheltered = GameState::from_fen("r4rk1/pp3ppp/8/8/8/8/PP3PPP/R4RK1 w - - 0 20")
            .expect("FEN should parse");
        let exposed = GameState::from_fen("r4rk1/pp3ppp/8/8/8/8/PP6/R4RK1 w - - 0 20")
            .expect("FEN should parse");
        let phase = GamePhase::Midgame;
        assert!(
            king_danger(&exposed, Color::Light, phase) > king_danger(&sheltered, Color::Light, phase)
        );
    }

    #[test]
    fn enemy_queen_adds_flat_penalty() {
        let without = GameState::from_fen("6k1/5ppp/8/8/8/8/5PPP/6K1 w - - 0 40")
            .expect("FEN should parse");
        let with = GameState::from_fen("6kq/5ppp/8/8/8/8/5PPP/6K1 w - - 0 40")
            .expect("FEN should parse");
        let delta = king_danger(&with, Color::Light, GamePhase::Endgame)
            - king_danger(&without, Color::Light, GamePhase::Endgame);
        // The h8 queen sees nothing near the white king.
        assert!((delta - ENEMY_QUEEN_PENALTY).abs() < 1e-9);
    }

    #[test]
    fn open_files_only_count_outside_the_endgame() {
        let game = GameState::from_fen("6k1/5ppp/8/8/8/8/8/6K1 w - - 0 40")
            .expect("FEN should parse");
        let endgame = king_danger(&game, Color::Light, GamePhase::Endgame);
        let midgame = king_danger(&game, Color::Light, GamePhase::Midgame);
        // f, g and h files are semi-open for white.
        assert!((midgame - endgame - 3.0 * SEMI_OPEN_FILE_PENALTY).abs() < 1e-9);
    }
}
