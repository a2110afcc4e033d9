//! Long-algebraic (UCI) move strings such as `e2e4`, `e1g1`, `a7a8q`.

use crate::game_state::{chess_types::*, game_state::GameState};
use crate::move_generation::legal_move_generator::{generate_legal_moves, GeneratedMove};
use crate::moves::chess_move::ChessMove;
use crate::utils::algebraic::algebraic_to_square;

pub fn move_to_long_algebraic(mv: &ChessMove) -> String {
    let mut out = String::with_capacity(5);
    for square in [mv.from, mv.to] {
        out.push(char::from(b'a' + square_file(square)));
        out.push(char::from(b'1' + square_rank(square)));
    }
    if let Some(promotion) = mv.promotion {
        out.push(promotion_to_char(promotion));
    }
    out
}

/// Resolve a move string against the legal moves of `game_state`.
pub fn long_algebraic_to_move(
    long_algebraic: &str,
    game_state: &GameState,
) -> Result<ChessMove, String> {
    find_legal_move(long_algebraic, game_state).map(|generated| generated.chess_move)
}

/// Like [`long_algebraic_to_move`], also returning the position after the move.
pub fn find_legal_move(long_algebraic: &str, game_state: &GameState) -> Result<GeneratedMove, String> {
    let (from, to, promotion) = split_long_algebraic(long_algebraic)?;

    generate_legal_moves(game_state)?
        .into_iter()
        .find(|generated| {
            let mv = &generated.chess_move;
            mv.from == from && mv.to == to && mv.promotion == promotion
        })
        .ok_or_else(|| format!("Move {long_algebraic} is not legal in {}", game_state.get_fen()))
}

/// Parse the squares and optional promotion piece without a position.
pub fn split_long_algebraic(
    long_algebraic: &str,
) -> Result<(Square, Square, Option<PieceKind>), String> {
    if !long_algebraic.is_ascii() || !(4..=5).contains(&long_algebraic.len()) {
        return Err(format!("Invalid long algebraic move: {long_algebraic}"));
    }

    let from = algebraic_to_square(&long_algebraic[0..2])?;
    let to = algebraic_to_square(&long_algebraic[2..4])?;
    let promotion = long_algebraic[4..]
        .chars()
        .next()
        .map(char_to_promotion)
        .transpose()?;

    Ok((from, to, promotion))
}

fn promotion_to_char(piece_kind: PieceKind) -> char {
    match piece_kind {
        PieceKind::Knight => 'n',
        PieceKind::Bishop => 'b',
        PieceKind::Rook => 'r',
        _ => 'q',
    }
}

fn char_to_promotion(ch: char) -> Result<PieceKind, String> {
    match ch.to_ascii_lowercase() {
        'n' => Ok(PieceKind::Knight),
        'b' => Ok(PieceKind::Bishop),
        'r' => Ok(PieceKind::Rook),
        'q' => Ok(PieceKind::Queen),
        _ => Err(format!("Invalid promotion piece character: {ch}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_push_resolves_with_flags() {
        let game = GameState::new_game();
        let mv = long_algebraic_to_move("e2e4", &game).expect("e2e4 should be legal");
        assert!(mv.is_double_pawn_push());
        assert_eq!(move_to_long_algebraic(&mv), "e2e4");
    }

    #[test]
    fn promotion_suffix_is_kept() {
        let game = GameState::from_fen("7k/P7/8/8/8/8/8/K7 w - - 0 1").expect("FEN should parse");
        let mv = long_algebraic_to_move("a7a8q", &game).expect("promotion should be legal");
        assert_eq!(mv.promotion, Some(PieceKind::Queen));
        assert_eq!(move_to_long_algebraic(&mv), "a7a8q");
        assert!(long_algebraic_to_move("a7a8", &game).is_err());
    }

    #[test]
    fn detects_castling_and_en_passant() {
        let castle_state = GameState::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1")
            .expect("FEN should parse");
        let castle = long_algebraic_to_move("e1g1", &castle_state).expect("castle should parse");
        assert!(castle.is_castling());

        let ep_state = GameState::from_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1")
            .expect("FEN should parse");
        let ep = long_algebraic_to_move("e5d6", &ep_state).expect("en-passant should parse");
        assert!(ep.is_en_passant());
    }

    #[test]
    fn rejects_illegal_and_malformed_strings() {
        let game = GameState::new_game();
        assert!(long_algebraic_to_move("e2e5", &game).is_err());
        assert!(long_algebraic_to_move("e2", &game).is_err());
        assert!(split_long_algebraic("e7e8x").is_err());
    }
}
