//! Static exchange ("en pris") evaluation and hanging-piece diffs.
//!
//! The exchange on a square is played out on a scratch copy of the board:
//! each side recaptures with its cheapest attacker, so x-ray attackers behind
//! a capturing slider join in naturally. Pins are ignored.

use crate::analysis::piece_values::exchange_value;
use crate::game_state::{chess_types::*, game_state::GameState};
use crate::move_generation::legal_move_checks::attackers_bitboard;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeOutcome {
    pub is_hanging: bool,
    /// Running material balance from the capturer's point of view when the
    /// exchange stopped. Positive means the occupant loses material.
    pub net_value: i32,
}

impl ExchangeOutcome {
    const SAFE: ExchangeOutcome = ExchangeOutcome {
        is_hanging: false,
        net_value: 0,
    };

    fn settle(net_value: i32) -> Self {
        Self {
            is_hanging: net_value > 0,
            net_value,
        }
    }
}

/// A piece that became hanging between two positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewlyAttacked {
    pub square: Square,
    pub piece: PieceKind,
}

pub fn is_en_pris(game_state: &GameState, square: Square) -> ExchangeOutcome {
    let Some((owner, occupant)) = game_state.piece_at(square) else {
        return ExchangeOutcome::SAFE;
    };

    let mut board = game_state.clone();
    let mut sum = exchange_value(occupant);
    let mut on_square = occupant;
    let mut capturer = owner.opposite();
    let mut first_capture = true;

    loop {
        let Some((from, piece)) = cheapest_attacker(&board, square, capturer) else {
            // The side to recapture has run out of attackers: the last capture
            // stands and its piece is not given back.
            if first_capture {
                return ExchangeOutcome::SAFE;
            }
            let last = exchange_value(on_square);
            sum += if capturer == owner { last } else { -last };
            return ExchangeOutcome::settle(sum);
        };

        capture_on(&mut board, from, square, capturer, piece, on_square);
        on_square = piece;
        first_capture = false;

        if capturer == owner {
            sum += exchange_value(piece);
            if sum < 0 {
                return ExchangeOutcome::settle(sum);
            }
        } else {
            sum -= exchange_value(piece);
            if sum > 0 {
                return ExchangeOutcome::settle(sum);
            }
        }

        capturer = capturer.opposite();
    }
}

/// All of `color`'s pieces that are currently hanging.
pub fn hanging_pieces(game_state: &GameState, color: Color) -> Vec<(Square, PieceKind, i32)> {
    game_state
        .squares_of(color)
        .into_iter()
        .filter_map(|square| {
            let outcome = is_en_pris(game_state, square);
            let piece = game_state.piece_of_color_at(color, square)?;
            outcome
                .is_hanging
                .then_some((square, piece, outcome.net_value))
        })
        .collect()
}

/// Highest-value piece of `color` that is hanging in `current` but was not in
/// `previous`. Only squares `color` occupied in both positions count; a piece
/// that moved is a different piece for this purpose.
pub fn newly_attacked(
    previous: &GameState,
    current: &GameState,
    color: Color,
) -> Option<NewlyAttacked> {
    current
        .squares_of(color)
        .into_iter()
        .filter(|&square| previous.color_at(square) == Some(color))
        .filter(|&square| is_en_pris(current, square).is_hanging)
        .filter(|&square| !is_en_pris(previous, square).is_hanging)
        .filter_map(|square| {
            current
                .piece_of_color_at(color, square)
                .map(|piece| NewlyAttacked { square, piece })
        })
        .max_by_key(|found| (exchange_value(found.piece), std::cmp::Reverse(found.square)))
}

fn cheapest_attacker(board: &GameState, square: Square, color: Color) -> Option<(Square, PieceKind)> {
    let attackers = attackers_bitboard(board, square, color);
    PieceKind::ALL.into_iter().find_map(|piece| {
        let bb = attackers & board.bitboard(color, piece);
        (bb != 0).then(|| (bb.trailing_zeros() as Square, piece))
    })
}

fn capture_on(
    board: &mut GameState,
    from: Square,
    to: Square,
    capturer: Color,
    piece: PieceKind,
    victim: PieceKind,
) {
    board.pieces[capturer.opposite().index()][victim.index()] &= !(1u64 << to);
    let own = &mut board.pieces[capturer.index()][piece.index()];
    *own &= !(1u64 << from);
    *own |= 1u64 << to;
    board.recalc_occupancy();
}
