//! A fully described move: squares, pieces involved and special-move flags.
//!
//! Moves are generated per position, so `piece` and `captured` are always
//! consistent with the `GameState` they were generated from.

use crate::game_state::chess_types::{PieceKind, Square};

pub const FLAG_CAPTURE: u8 = 1 << 0;
pub const FLAG_DOUBLE_PAWN_PUSH: u8 = 1 << 1;
pub const FLAG_EN_PASSANT: u8 = 1 << 2;
pub const FLAG_CASTLING: u8 = 1 << 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChessMove {
    pub from: Square,
    pub to: Square,
    pub piece: PieceKind,
    pub captured: Option<PieceKind>,
    pub promotion: Option<PieceKind>,
    pub flags: u8,
}

impl ChessMove {
    pub fn quiet(from: Square, to: Square, piece: PieceKind) -> Self {
        Self {
            from,
            to,
            piece,
            captured: None,
            promotion: None,
            flags: 0,
        }
    }

    pub fn capture(from: Square, to: Square, piece: PieceKind, captured: PieceKind) -> Self {
        Self {
            from,
            to,
            piece,
            captured: Some(captured),
            promotion: None,
            flags: FLAG_CAPTURE,
        }
    }

    #[inline]
    pub fn with_promotion(mut self, promotion: PieceKind) -> Self {
        self.promotion = Some(promotion);
        self
    }

    #[inline]
    pub fn with_flags(mut self, flags: u8) -> Self {
        self.flags |= flags;
        self
    }

    #[inline]
    pub fn is_capture(&self) -> bool {
        self.flags & FLAG_CAPTURE != 0
    }

    #[inline]
    pub fn is_en_passant(&self) -> bool {
        self.flags & FLAG_EN_PASSANT != 0
    }

    #[inline]
    pub fn is_castling(&self) -> bool {
        self.flags & FLAG_CASTLING != 0
    }

    #[inline]
    pub fn is_double_pawn_push(&self) -> bool {
        self.flags & FLAG_DOUBLE_PAWN_PUSH != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_constructor_sets_flag_and_victim() {
        let mv = ChessMove::capture(28, 35, PieceKind::Pawn, PieceKind::Knight);
        assert!(mv.is_capture());
        assert_eq!(mv.captured, Some(PieceKind::Knight));
        assert!(!mv.is_castling());
    }

    #[test]
    fn builder_flags_accumulate() {
        let mv = ChessMove::quiet(4, 6, PieceKind::King).with_flags(FLAG_CASTLING);
        assert!(mv.is_castling());
        assert!(!mv.is_capture());
        let promo = ChessMove::quiet(52, 60, PieceKind::Pawn).with_promotion(PieceKind::Queen);
        assert_eq!(promo.promotion, Some(PieceKind::Queen));
    }
}
