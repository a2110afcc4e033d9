//! Game phase classification from material and back-rank occupancy.

use serde::{Deserialize, Serialize};

use crate::game_state::chess_rules::BACK_RANK_SQUARES;
use crate::game_state::{chess_types::*, game_state::GameState};
use crate::moves::attack_tables::rank_mask;

/// Fewer minor/major pieces than this is an endgame.
pub const ENDGAME_PIECE_THRESHOLD: u32 = 7;
/// Fewer minor/major pieces than this (and not an endgame) is a midgame.
pub const MIDGAME_PIECE_THRESHOLD: u32 = 11;
/// A side that has vacated more back-rank squares than this has developed.
pub const MAX_VACATED_BACK_RANK: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GamePhase {
    Opening,
    Midgame,
    Endgame,
}

pub fn minor_and_major_count(game_state: &GameState) -> u32 {
    [Color::Light, Color::Dark]
        .into_iter()
        .flat_map(|color| {
            PieceKind::ALL
                .into_iter()
                .filter(|piece| piece.is_minor_or_major())
                .map(move |piece| game_state.count(color, piece))
        })
        .sum()
}

pub fn phase_of_game(game_state: &GameState) -> GamePhase {
    let pieces = minor_and_major_count(game_state);
    if pieces < ENDGAME_PIECE_THRESHOLD {
        return GamePhase::Endgame;
    }
    if pieces < MIDGAME_PIECE_THRESHOLD {
        return GamePhase::Midgame;
    }

    let developed = [Color::Light, Color::Dark].into_iter().any(|color| {
        let home = game_state.occupancy_by_color[color.index()] & rank_mask(color.back_rank());
        BACK_RANK_SQUARES - home.count_ones() > MAX_VACATED_BACK_RANK
    });

    if developed {
        GamePhase::Midgame
    } else {
        GamePhase::Opening
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starting_position_is_opening() {
        assert_eq!(phase_of_game(&GameState::new_game()), GamePhase::Opening);
    }

    #[test]
    fn five_pieces_is_endgame() {
        let game = GameState::from_fen("4k3/pp3ppp/2n5/8/3R4/2B5/PP3PPP/3QK2r w - - 0 30")
            .expect("FEN should parse");
        assert_eq!(minor_and_major_count(&game), 5);
        assert_eq!(phase_of_game(&game), GamePhase::Endgame);
    }

    #[test]
    fn six_pieces_is_still_endgame() {
        let game = GameState::from_fen("4k3/pp3ppp/2n5/8/3R4/2B2N2/PP3PPP/3QK2r w - - 0 30")
            .expect("FEN should parse");
        assert_eq!(minor_and_major_count(&game), 6);
        assert_eq!(phase_of_game(&game), GamePhase::Endgame);

        let seven = GameState::from_fen("4k3/pp3ppp/2n5/8/3R4/2B2N2/PP3PPP/2BQK2r w - - 0 30")
            .expect("FEN should parse");
        assert_eq!(minor_and_major_count(&seven), 7);
        assert_eq!(phase_of_game(&seven), GamePhase::Midgame);
    }

    #[test]
    fn vacated_back_rank_is_midgame() {
        // No trades yet, but white has castled and cleared four home squares.
        let game = GameState::from_fen(
            "r1bqkb1r/pppp1ppp/2n2n2/4p1B1/2B1P3/2NP1N2/PPP2PPP/R2Q1RK1 b kq - 0 6",
        )
        .expect("FEN should parse");
        assert_eq!(minor_and_major_count(&game), 14);
        assert_eq!(phase_of_game(&game), GamePhase::Midgame);
    }

    #[test]
    fn classification_is_deterministic() {
        let game = GameState::from_fen("r2q1rk1/ppp2ppp/2n5/3pp3/8/8/PPP2PPP/R2Q1RK1 w - - 0 12")
            .expect("FEN should parse");
        let first = phase_of_game(&game);
        for _ in 0..10 {
            assert_eq!(phase_of_game(&game), first);
        }
    }
}
