//! One-hot board tensor consumed by the plausibility models.
//!
//! 8 x 8 x 12 values. Rows run from rank 8 down to rank 1, files a to h
//! within a row; planes are `p n b r q k` for the second player followed by
//! `P N B R Q K` for the first. The board is always seen from the side to
//! move, so a position with Dark to move is mirrored first.

use crate::game_state::{chess_types::*, game_state::{bits, GameState}};

pub const PLANES: usize = 12;
pub const BOARD_ENCODING_LEN: usize = 64 * PLANES;

#[derive(Debug, Clone, PartialEq)]
pub struct BoardEncoding {
    values: Vec<f32>,
    /// Perspective board the tensor was built from.
    perspective: GameState,
}

impl BoardEncoding {
    /// Encode `game_state` from `side`'s point of view.
    pub fn for_side(game_state: &GameState, side: Color) -> Self {
        let perspective = match side {
            Color::Light => game_state.clone(),
            Color::Dark => game_state.mirrored(),
        };

        let mut values = vec![0.0; BOARD_ENCODING_LEN];
        for color in [Color::Light, Color::Dark] {
            for piece in PieceKind::ALL {
                for square in bits(perspective.bitboard(color, piece)) {
                    values[tensor_index(square, plane(color, piece))] = 1.0;
                }
            }
        }

        Self {
            values,
            perspective,
        }
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Indices of the set inputs, in tensor order.
    pub fn active_inputs(&self) -> impl Iterator<Item = usize> + '_ {
        self.values
            .iter()
            .enumerate()
            .filter(|(_, value)| **value != 0.0)
            .map(|(index, _)| index)
    }

    /// The mirrored-if-needed board; its Light pieces are the mover's.
    pub fn perspective(&self) -> &GameState {
        &self.perspective
    }
}

/// Position of a perspective-board square in model output order (a8 first).
#[inline]
pub const fn output_index(square: Square) -> usize {
    mirror_square(square) as usize
}

#[inline]
const fn plane(color: Color, piece: PieceKind) -> usize {
    match color {
        Color::Dark => piece.index(),
        Color::Light => 6 + piece.index(),
    }
}

#[inline]
fn tensor_index(square: Square, plane: usize) -> usize {
    output_index(square) * PLANES + plane
}
