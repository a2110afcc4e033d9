/// Core board vocabulary shared by every subsystem: colors, piece kinds,
/// squares and castling-right bits.

pub use crate::game_state::game_state::GameState;

/// Side to move / side owning a piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Light,
    Dark,
}

impl Color {
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Color::Light => 0,
            Color::Dark => 1,
        }
    }

    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Color::Light => Color::Dark,
            Color::Dark => Color::Light,
        }
    }

    /// Rank index (0-based) of this side's back rank.
    #[inline]
    pub const fn back_rank(self) -> u8 {
        match self {
            Color::Light => 0,
            Color::Dark => 7,
        }
    }
}

/// Piece kind (color is represented separately for cache-friendly layouts).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceKind {
    pub const ALL: [PieceKind; 6] = [
        PieceKind::Pawn,
        PieceKind::Knight,
        PieceKind::Bishop,
        PieceKind::Rook,
        PieceKind::Queen,
        PieceKind::King,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        match self {
            PieceKind::Pawn => 0,
            PieceKind::Knight => 1,
            PieceKind::Bishop => 2,
            PieceKind::Rook => 3,
            PieceKind::Queen => 4,
            PieceKind::King => 5,
        }
    }

    /// Minor and major pieces, i.e. everything but pawns and kings.
    #[inline]
    pub const fn is_minor_or_major(self) -> bool {
        !matches!(self, PieceKind::Pawn | PieceKind::King)
    }
}

pub const CASTLE_LIGHT_KINGSIDE: CastlingRights = 1 << 0;
pub const CASTLE_LIGHT_QUEENSIDE: CastlingRights = 1 << 1;
pub const CASTLE_DARK_KINGSIDE: CastlingRights = 1 << 2;
pub const CASTLE_DARK_QUEENSIDE: CastlingRights = 1 << 3;
pub type CastlingRights = u8;

/// Board square index (`0..=63`, a1 = 0, h8 = 63).
pub type Square = u8;

#[inline]
pub const fn square_file(square: Square) -> u8 {
    square % 8
}

#[inline]
pub const fn square_rank(square: Square) -> u8 {
    square / 8
}

#[inline]
pub const fn make_square(file: u8, rank: u8) -> Square {
    rank * 8 + file
}

/// Vertical flip (a1 <-> a8).
#[inline]
pub const fn mirror_square(square: Square) -> Square {
    square ^ 56
}

/// King-step (Chebyshev) distance between two squares.
#[inline]
pub fn square_distance(a: Square, b: Square) -> u8 {
    let df = square_file(a).abs_diff(square_file(b));
    let dr = square_rank(a).abs_diff(square_rank(b));
    df.max(dr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirror_square_flips_ranks_only() {
        assert_eq!(mirror_square(0), 56);
        assert_eq!(mirror_square(12), 52);
        assert_eq!(mirror_square(mirror_square(33)), 33);
    }

    #[test]
    fn chebyshev_distance_between_corners() {
        assert_eq!(square_distance(0, 63), 7);
        assert_eq!(square_distance(make_square(4, 0), make_square(5, 1)), 1);
    }
}
