//! Open / semi-open / locked file tests.

use crate::game_state::{chess_types::*, game_state::GameState};
use crate::move_generation::legal_move_generator::legal_moves;
use crate::moves::attack_tables::file_mask;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    /// No pawns at all.
    Open,
    /// The given side has no pawn on the file, the other side does.
    SemiOpenFor(Color),
    /// Pawns of both colors.
    Closed,
}

pub fn file_status(game_state: &GameState, file: u8) -> FileStatus {
    let mask = file_mask(file);
    let light = game_state.bitboard(Color::Light, PieceKind::Pawn) & mask != 0;
    let dark = game_state.bitboard(Color::Dark, PieceKind::Pawn) & mask != 0;

    match (light, dark) {
        (false, false) => FileStatus::Open,
        (false, true) => FileStatus::SemiOpenFor(Color::Light),
        (true, false) => FileStatus::SemiOpenFor(Color::Dark),
        (true, true) => FileStatus::Closed,
    }
}

#[inline]
pub fn is_open_file(game_state: &GameState, file: u8) -> bool {
    file_status(game_state, file) == FileStatus::Open
}

/// A file is locked when it holds pawns and none of them can move, whichever
/// side is to move.
pub fn is_locked_file(game_state: &GameState, file: u8) -> Result<bool, String> {
    let mask = file_mask(file);
    let pawns_on_file = (game_state.bitboard(Color::Light, PieceKind::Pawn)
        | game_state.bitboard(Color::Dark, PieceKind::Pawn))
        & mask;
    if pawns_on_file == 0 {
        return Ok(false);
    }

    for color in [Color::Light, Color::Dark] {
        let as_mover = game_state.with_side_to_move(color);
        let pawn_moves_on_file = legal_moves(&as_mover)?
            .iter()
            .any(|mv| mv.piece == PieceKind::Pawn && pawns_on_file & (1u64 << mv.from) != 0);
        if pawn_moves_on_file {
            return Ok(false);
        }
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_status_by_pawn_colors() {
        let game = GameState::from_fen("4k3/3p4/8/4p3/4P3/8/2P5/4K3 w - - 0 1")
            .expect("FEN should parse");
        assert_eq!(file_status(&game, 0), FileStatus::Open);
        assert_eq!(file_status(&game, 2), FileStatus::SemiOpenFor(Color::Dark));
        assert_eq!(file_status(&game, 3), FileStatus::SemiOpenFor(Color::Light));
        assert_eq!(file_status(&game, 4), FileStatus::Closed);
        assert!(is_open_file(&game, 7));
    }

    #[test]
    fn rammed_pawns_lock_the_file() {
        let game = GameState::from_fen("4k3/8/8/4p3/4P3/8/8/4K3 w - - 0 1")
            .expect("FEN should parse");
        assert_eq!(is_locked_file(&game, 4), Ok(true));
        assert_eq!(is_locked_file(&game, 3), Ok(false));
    }

    #[test]
    fn one_mobile_pawn_keeps_the_file_unlocked() {
        let game = GameState::from_fen("2q2k2/4ppbp/2pp2p1/4n3/p3P3/P3BP1P/1P2Q1P1/1R4K1 w - - 0 24")
            .expect("FEN should parse");
        // e4 is blocked by the e5 knight, but e7 can still advance.
        assert_eq!(is_locked_file(&game, 4), Ok(false));
        // a4/a3 are rammed with no captures around.
        assert_eq!(is_locked_file(&game, 0), Ok(true));
    }
}
