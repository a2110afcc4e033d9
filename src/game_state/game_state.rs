//! Board position model.
//!
//! `GameState` is the Position handed to the decision engine each turn. It
//! stores piece bitboards, occupancy caches, side/rights flags and the move
//! counters. Positions are treated as values: every move produces a new one.

use crate::game_state::chess_rules::STARTING_POSITION_FEN;
use crate::game_state::chess_types::*;
use crate::utils::fen::{generate_fen, parse_fen};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    // [color][piece_kind]
    pub pieces: [[u64; 6]; 2],

    pub occupancy_by_color: [u64; 2],
    pub occupancy_all: u64,

    pub side_to_move: Color,
    pub castling_rights: CastlingRights,
    pub en_passant_square: Option<Square>,

    pub halfmove_clock: u16,
    pub fullmove_number: u16,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            pieces: [[0; 6]; 2],
            occupancy_by_color: [0; 2],
            occupancy_all: 0,

            side_to_move: Color::Light,
            castling_rights: 0,
            en_passant_square: None,

            halfmove_clock: 0,
            fullmove_number: 1,
        }
    }
}

impl GameState {
    #[inline]
    pub fn new_empty() -> Self {
        Self::default()
    }

    pub fn new_game() -> Self {
        // The starting FEN is a compile-time constant that always parses.
        parse_fen(STARTING_POSITION_FEN).unwrap_or_default()
    }

    #[inline]
    pub fn from_fen(fen: &str) -> Result<Self, String> {
        parse_fen(fen)
    }

    #[inline]
    pub fn get_fen(&self) -> String {
        generate_fen(self)
    }

    /// FEN without the two move counters. Two positions with equal
    /// fingerprints are repetitions of each other.
    pub fn fingerprint(&self) -> String {
        let fen = self.get_fen();
        fen.split_whitespace().take(4).collect::<Vec<_>>().join(" ")
    }

    #[inline]
    pub fn piece_of_color_at(&self, color: Color, square: Square) -> Option<PieceKind> {
        let mask = 1u64 << square;
        PieceKind::ALL
            .into_iter()
            .find(|piece| self.pieces[color.index()][piece.index()] & mask != 0)
    }

    #[inline]
    pub fn piece_at(&self, square: Square) -> Option<(Color, PieceKind)> {
        let mask = 1u64 << square;
        if self.occupancy_all & mask == 0 {
            return None;
        }
        for color in [Color::Light, Color::Dark] {
            if let Some(piece) = self.piece_of_color_at(color, square) {
                return Some((color, piece));
            }
        }
        None
    }

    #[inline]
    pub fn color_at(&self, square: Square) -> Option<Color> {
        self.piece_at(square).map(|(color, _)| color)
    }

    #[inline]
    pub fn bitboard(&self, color: Color, piece: PieceKind) -> u64 {
        self.pieces[color.index()][piece.index()]
    }

    #[inline]
    pub fn count(&self, color: Color, piece: PieceKind) -> u32 {
        self.bitboard(color, piece).count_ones()
    }

    /// Total number of pieces on the board, kings and pawns included.
    #[inline]
    pub fn piece_count(&self) -> u32 {
        self.occupancy_all.count_ones()
    }

    pub fn king_square(&self, color: Color) -> Option<Square> {
        let kings = self.bitboard(color, PieceKind::King);
        (kings != 0).then(|| kings.trailing_zeros() as Square)
    }

    /// Squares occupied by `color`, lowest index first.
    pub fn squares_of(&self, color: Color) -> Vec<Square> {
        bits(self.occupancy_by_color[color.index()]).collect()
    }

    /// Vertically flipped board with colors swapped, so the side to move
    /// always plays "up" the board.
    pub fn mirrored(&self) -> GameState {
        let mut out = GameState::new_empty();
        for color in [Color::Light, Color::Dark] {
            for piece in PieceKind::ALL {
                out.pieces[color.opposite().index()][piece.index()] =
                    self.bitboard(color, piece).swap_bytes();
            }
        }
        out.side_to_move = self.side_to_move.opposite();
        let rights = self.castling_rights;
        out.castling_rights = ((rights & 0b0011) << 2) | ((rights & 0b1100) >> 2);
        out.en_passant_square = self.en_passant_square.map(mirror_square);
        out.halfmove_clock = self.halfmove_clock;
        out.fullmove_number = self.fullmove_number;
        out.recalc_occupancy();
        out
    }

    /// Same placement with a different side to move. Used by analysis that
    /// needs "what could this side do here" regardless of whose turn it is.
    pub fn with_side_to_move(&self, side: Color) -> GameState {
        let mut out = self.clone();
        if side != self.side_to_move {
            out.side_to_move = side;
            out.en_passant_square = None;
        }
        out
    }

    pub fn recalc_occupancy(&mut self) {
        for color in [Color::Light, Color::Dark] {
            self.occupancy_by_color[color.index()] = self.pieces[color.index()]
                .iter()
                .copied()
                .fold(0u64, |acc, bb| acc | bb);
        }
        self.occupancy_all = self.occupancy_by_color[Color::Light.index()]
            | self.occupancy_by_color[Color::Dark.index()];
    }
}

/// Iterate the set bits of a bitboard as squares.
pub fn bits(mut bitboard: u64) -> impl Iterator<Item = Square> {
    std::iter::from_fn(move || {
        if bitboard == 0 {
            None
        } else {
            let square = bitboard.trailing_zeros() as Square;
            bitboard &= bitboard - 1;
            Some(square)
        }
    })
}
