//! Moves a human rarely plays without a concrete reason.
//!
//! Mostly heavy-piece shuffles: rooks stepping on each other's toes along the
//! back rank, rooks lifted to the second or third rank behind closed files,
//! rooks parked on locked files, queens retreating home, and king walks while
//! the king is perfectly safe.

use crate::analysis::files::{is_locked_file, is_open_file};
use crate::analysis::king_danger::HIGH_KING_DANGER;
use crate::analysis::phase::GamePhase;
use crate::game_state::{chess_types::*, game_state::GameState};
use crate::moves::chess_move::ChessMove;
use crate::utils::long_algebraic::move_to_long_algebraic;

/// (destination file, partner file) on the back rank. A rook arriving on e1
/// beside a rook on f1, or on b1 beside a rook on a1, jams the two together.
const ROOK_JAMS: [(u8, u8); 2] = [(4, 5), (1, 0)];

pub fn is_weird_move(
    game_state: &GameState,
    phase: GamePhase,
    mv: &ChessMove,
    obvious_move: Option<&str>,
    king_danger: f64,
) -> Result<bool, String> {
    if obvious_move == Some(move_to_long_algebraic(mv).as_str()) {
        return Ok(false);
    }

    let side = game_state
        .color_at(mv.from)
        .ok_or_else(|| format!("No piece on from-square {} when judging a move", mv.from))?;
    let back_rank = side.back_rank();

    match mv.piece {
        PieceKind::Rook => {
            if square_rank(mv.from) == back_rank && square_rank(mv.to) == back_rank {
                for (dest_file, partner_file) in ROOK_JAMS {
                    let partner = make_square(partner_file, back_rank);
                    if mv.to == make_square(dest_file, back_rank)
                        && mv.from != partner
                        && game_state.piece_of_color_at(side, partner) == Some(PieceKind::Rook)
                    {
                        return Ok(true);
                    }
                }
            }

            let lift_ranks = match side {
                Color::Light => [1u8, 2u8],
                Color::Dark => [6u8, 5u8],
            };
            if phase != GamePhase::Endgame
                && lift_ranks.contains(&square_rank(mv.to))
                && !is_open_file(game_state, square_file(mv.to))
            {
                return Ok(true);
            }

            is_locked_file(game_state, square_file(mv.to))
        }
        PieceKind::Queen => Ok(phase != GamePhase::Endgame && square_rank(mv.to) == back_rank),
        PieceKind::King => Ok(phase != GamePhase::Endgame
            && !mv.is_castling()
            && king_danger < HIGH_KING_DANGER),
        _ => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::long_algebraic::long_algebraic_to_move;

    fn judge(fen: &str, uci: &str, phase: GamePhase, danger: f64) -> bool {
        let game = GameState::from_fen(fen).expect("FEN should parse");
        let mv = long_algebraic_to_move(uci, &game).expect("move should be legal");
        is_weird_move(&game, phase, &mv, None, danger).expect("move should be judged")
    }

    #[test]
    fn rook_jamming_the_back_rank_is_weird() {
        let spread = "r4rk1/pp3ppp/8/8/8/8/PP3PPP/R3R1K1 w - - 0 15";
        assert!(!judge(spread, "e1d1", GamePhase::Midgame, 0.0));
        let jam = "r4rk1/pp3ppp/8/8/8/8/PP3PPP/R2R1RK1 w - - 0 15";
        assert!(judge(jam, "d1e1", GamePhase::Midgame, 0.0));
    }

    #[test]
    fn rook_lift_onto_a_closed_file_is_weird_outside_endgame() {
        let fen = "r5k1/pp1p1ppp/8/8/8/R7/PP1P1PPP/6K1 w - - 0 15";
        assert!(judge(fen, "a3b3", GamePhase::Midgame, 0.0));
        assert!(!judge(fen, "a3c3", GamePhase::Midgame, 0.0));
        assert!(!judge(fen, "a3b3", GamePhase::Endgame, 0.0));
    }

    #[test]
    fn queen_retreat_home_is_weird_until_the_endgame() {
        let fen = "4k3/8/8/8/8/3Q4/8/4K3 w - - 0 30";
        assert!(judge(fen, "d3d1", GamePhase::Midgame, 0.0));
        assert!(!judge(fen, "d3d1", GamePhase::Endgame, 0.0));
        assert!(!judge(fen, "d3d5", GamePhase::Midgame, 0.0));
    }

    #[test]
    fn idle_king_walk_is_weird_only_when_safe() {
        let fen = "r3k2r/pppq1ppp/8/8/8/8/PPPQ1PPP/R3K2R w KQkq - 0 12";
        assert!(judge(fen, "e1f1", GamePhase::Midgame, 0.0));
        assert!(!judge(fen, "e1f1", GamePhase::Midgame, 900.0));
        assert!(!judge(fen, "e1g1", GamePhase::Midgame, 0.0));
    }

    #[test]
    fn cached_obvious_move_is_never_weird() {
        let game = GameState::from_fen("4k3/8/8/8/8/3Q4/8/4K3 w - - 0 30").expect("FEN should parse");
        let mv = long_algebraic_to_move("d3d1", &game).expect("move should be legal");
        assert_eq!(
            is_weird_move(&game, GamePhase::Midgame, &mv, Some("d3d1"), 0.0),
            Ok(false)
        );
    }
}
