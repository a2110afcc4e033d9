//! Attack and check queries over a `GameState`.

use crate::game_state::{chess_types::*, game_state::GameState};
use crate::moves::attack_tables::{
    bishop_attacks, king_attacks, knight_attacks, pawn_attacks, rook_attacks,
};

/// Bitboard of every `attacker_color` piece attacking `square`, with sliders
/// traced against the current occupancy.
pub fn attackers_bitboard(game_state: &GameState, square: Square, attacker_color: Color) -> u64 {
    let pieces = &game_state.pieces[attacker_color.index()];
    let occupancy = game_state.occupancy_all;

    // A pawn of `attacker_color` attacks `square` iff a pawn of the other
    // color standing on `square` would attack it back.
    let pawns = pawn_attacks(attacker_color.opposite(), square) & pieces[PieceKind::Pawn.index()];
    let knights = knight_attacks(square) & pieces[PieceKind::Knight.index()];
    let kings = king_attacks(square) & pieces[PieceKind::King.index()];
    let diagonal = bishop_attacks(square, occupancy)
        & (pieces[PieceKind::Bishop.index()] | pieces[PieceKind::Queen.index()]);
    let orthogonal = rook_attacks(square, occupancy)
        & (pieces[PieceKind::Rook.index()] | pieces[PieceKind::Queen.index()]);

    pawns | knights | kings | diagonal | orthogonal
}

#[inline]
pub fn is_square_attacked(game_state: &GameState, square: Square, attacker_color: Color) -> bool {
    attackers_bitboard(game_state, square, attacker_color) != 0
}

/// Attacking pieces as `(square, kind)` pairs, cheapest kind first.
pub fn attackers_to_square(
    game_state: &GameState,
    square: Square,
    attacker_color: Color,
) -> Vec<(Square, PieceKind)> {
    let attackers = attackers_bitboard(game_state, square, attacker_color);
    let mut out = Vec::with_capacity(attackers.count_ones() as usize);
    for piece in PieceKind::ALL {
        let mut bb = attackers & game_state.bitboard(attacker_color, piece);
        while bb != 0 {
            out.push((bb.trailing_zeros() as Square, piece));
            bb &= bb - 1;
        }
    }
    out
}

#[inline]
pub fn is_king_in_check(game_state: &GameState, color: Color) -> bool {
    let Some(king_sq) = game_state.king_square(color) else {
        return false;
    };
    is_square_attacked(game_state, king_sq, color.opposite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pawn_and_bishop_attackers_are_found() {
        let game = GameState::from_fen("4k3/8/8/3p4/8/1B6/8/4K3 w - - 0 1")
            .expect("FEN should parse");
        // d5 pawn attacked by the b3 bishop
        let attackers = attackers_to_square(&game, 35, Color::Light);
        assert_eq!(attackers, vec![(17, PieceKind::Bishop)]);
        // e4 is attacked by the d5 pawn
        assert!(is_square_attacked(&game, 28, Color::Dark));
        assert!(!is_square_attacked(&game, 27, Color::Dark));
    }

    #[test]
    fn detects_check_through_open_line() {
        let game = GameState::from_fen("4k3/8/8/8/8/8/8/r3K3 w - - 0 1")
            .expect("FEN should parse");
        assert!(is_king_in_check(&game, Color::Light));
        assert!(!is_king_in_check(&game, Color::Dark));
    }

    #[test]
    fn blocked_slider_does_not_attack() {
        let game = GameState::from_fen("4k3/8/8/8/8/8/4P3/r3K2R w - - 0 1")
            .expect("FEN should parse");
        assert!(!is_square_attacked(&game, 20, Color::Dark));
        assert_eq!(attackers_to_square(&game, 4, Color::Dark).len(), 1);
    }
}
