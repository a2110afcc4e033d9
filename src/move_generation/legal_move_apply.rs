use crate::game_state::{chess_types::*, game_state::GameState};
use crate::moves::chess_move::ChessMove;

/// Play `mv` on a copy of `game_state` and return the resulting position.
/// The move must have been generated for this position; legality is not
/// re-checked here.
pub fn apply_move(game_state: &GameState, mv: &ChessMove) -> Result<GameState, String> {
    let from_mask = 1u64 << mv.from;
    let to_mask = 1u64 << mv.to;

    let moving_color = game_state.side_to_move;
    let enemy_color = moving_color.opposite();

    if game_state.bitboard(moving_color, mv.piece) & from_mask == 0 {
        return Err(format!(
            "No {:?} {:?} on from-square {}",
            moving_color, mv.piece, mv.from
        ));
    }

    let mut next = game_state.clone();
    next.pieces[moving_color.index()][mv.piece.index()] &= !from_mask;

    if mv.is_en_passant() {
        let capture_sq = match moving_color {
            Color::Light => mv.to.checked_sub(8),
            Color::Dark => mv.to.checked_add(8),
        }
        .ok_or("Invalid en-passant capture square")?;
        next.pieces[enemy_color.index()][PieceKind::Pawn.index()] &= !(1u64 << capture_sq);
    } else if mv.is_capture() {
        for piece in PieceKind::ALL {
            next.pieces[enemy_color.index()][piece.index()] &= !to_mask;
        }
    }

    let landing = mv.promotion.unwrap_or(mv.piece);
    next.pieces[moving_color.index()][landing.index()] |= to_mask;

    if mv.is_castling() {
        let (rook_from, rook_to) = match (moving_color, mv.to) {
            (Color::Light, 6) => (7, 5),
            (Color::Light, 2) => (0, 3),
            (Color::Dark, 62) => (63, 61),
            (Color::Dark, 58) => (56, 59),
            _ => return Err(format!("Invalid castling destination {}", mv.to)),
        };
        let rooks = &mut next.pieces[moving_color.index()][PieceKind::Rook.index()];
        *rooks &= !(1u64 << rook_from);
        *rooks |= 1u64 << rook_to;
    }

    next.castling_rights &= !rights_lost(moving_color, mv);

    next.en_passant_square = mv
        .is_double_pawn_push()
        .then_some((mv.from + mv.to) / 2);

    if mv.piece == PieceKind::Pawn || mv.is_capture() {
        next.halfmove_clock = 0;
    } else {
        next.halfmove_clock = next.halfmove_clock.saturating_add(1);
    }
    if moving_color == Color::Dark {
        next.fullmove_number = next.fullmove_number.saturating_add(1);
    }

    next.side_to_move = enemy_color;
    next.recalc_occupancy();

    Ok(next)
}

fn rights_lost(moving_color: Color, mv: &ChessMove) -> CastlingRights {
    let mut lost = 0;

    if mv.piece == PieceKind::King {
        lost |= match moving_color {
            Color::Light => CASTLE_LIGHT_KINGSIDE | CASTLE_LIGHT_QUEENSIDE,
            Color::Dark => CASTLE_DARK_KINGSIDE | CASTLE_DARK_QUEENSIDE,
        };
    }

    // A rook leaving its corner or being captured there.
    for square in [mv.from, mv.to] {
        lost |= match square {
            0 => CASTLE_LIGHT_QUEENSIDE,
            7 => CASTLE_LIGHT_KINGSIDE,
            56 => CASTLE_DARK_QUEENSIDE,
            63 => CASTLE_DARK_KINGSIDE,
            _ => 0,
        };
    }

    lost
}
