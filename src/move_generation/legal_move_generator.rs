//! Legal move generation.
//!
//! Pseudo-legal moves are generated per piece kind, applied, and dropped when
//! they leave the mover's own king in check. Every legal move carries the
//! position it leads to so callers never re-apply it.

use crate::game_state::{chess_types::*, game_state::GameState};
use crate::move_generation::legal_move_apply::apply_move;
use crate::move_generation::legal_move_checks::{is_king_in_check, is_square_attacked};
use crate::moves::attack_tables::{
    bishop_attacks, king_attacks, knight_attacks, pawn_attacks, queen_attacks, rook_attacks,
};
use crate::moves::chess_move::{
    ChessMove, FLAG_CASTLING, FLAG_DOUBLE_PAWN_PUSH, FLAG_EN_PASSANT,
};

const PROMOTION_PIECES: [PieceKind; 4] = [
    PieceKind::Queen,
    PieceKind::Rook,
    PieceKind::Bishop,
    PieceKind::Knight,
];

#[derive(Debug, Clone)]
pub struct GeneratedMove {
    pub chess_move: ChessMove,
    pub game_after_move: GameState,
}

pub fn generate_legal_moves(game_state: &GameState) -> Result<Vec<GeneratedMove>, String> {
    let pseudo = generate_pseudo_legal_moves(game_state);
    let mut legal = Vec::with_capacity(pseudo.len());

    for mv in pseudo {
        let next = apply_move(game_state, &mv)?;
        if is_king_in_check(&next, game_state.side_to_move) {
            continue;
        }
        legal.push(GeneratedMove {
            chess_move: mv,
            game_after_move: next,
        });
    }

    Ok(legal)
}

/// Legal moves without their resulting positions.
pub fn legal_moves(game_state: &GameState) -> Result<Vec<ChessMove>, String> {
    Ok(generate_legal_moves(game_state)?
        .into_iter()
        .map(|generated| generated.chess_move)
        .collect())
}

pub fn generate_pseudo_legal_moves(game_state: &GameState) -> Vec<ChessMove> {
    let mut out = Vec::with_capacity(128);
    generate_pawn_moves(game_state, &mut out);
    for piece in [
        PieceKind::Knight,
        PieceKind::Bishop,
        PieceKind::Rook,
        PieceKind::Queen,
        PieceKind::King,
    ] {
        generate_piece_moves(game_state, piece, &mut out);
    }
    generate_castling_moves(game_state, &mut out);
    out
}

fn generate_piece_moves(game_state: &GameState, piece: PieceKind, out: &mut Vec<ChessMove>) {
    let side = game_state.side_to_move;
    let own_occ = game_state.occupancy_by_color[side.index()];
    let occupancy = game_state.occupancy_all;

    let mut pieces = game_state.bitboard(side, piece);
    while pieces != 0 {
        let from = pieces.trailing_zeros() as Square;
        let targets = match piece {
            PieceKind::Knight => knight_attacks(from),
            PieceKind::Bishop => bishop_attacks(from, occupancy),
            PieceKind::Rook => rook_attacks(from, occupancy),
            PieceKind::Queen => queen_attacks(from, occupancy),
            PieceKind::King => king_attacks(from),
            PieceKind::Pawn => 0,
        } & !own_occ;

        let mut bb = targets;
        while bb != 0 {
            let to = bb.trailing_zeros() as Square;
            out.push(match game_state.piece_of_color_at(side.opposite(), to) {
                Some(captured) => ChessMove::capture(from, to, piece, captured),
                None => ChessMove::quiet(from, to, piece),
            });
            bb &= bb - 1;
        }

        pieces &= pieces - 1;
    }
}

fn generate_pawn_moves(game_state: &GameState, out: &mut Vec<ChessMove>) {
    let side = game_state.side_to_move;
    let enemy = side.opposite();
    let empty = !game_state.occupancy_all;
    let enemy_occ = game_state.occupancy_by_color[enemy.index()];
    let (start_rank, promotion_rank) = match side {
        Color::Light => (1u8, 7u8),
        Color::Dark => (6u8, 0u8),
    };

    let mut pawns = game_state.bitboard(side, PieceKind::Pawn);
    while pawns != 0 {
        let from = pawns.trailing_zeros() as Square;
        let push_one = match side {
            Color::Light => from.checked_add(8),
            Color::Dark => from.checked_sub(8),
        };

        if let Some(to) = push_one.filter(|&to| to < 64 && empty & (1u64 << to) != 0) {
            push_with_promotions(ChessMove::quiet(from, to, PieceKind::Pawn), promotion_rank, out);

            if square_rank(from) == start_rank {
                let two = match side {
                    Color::Light => to + 8,
                    Color::Dark => to - 8,
                };
                if empty & (1u64 << two) != 0 {
                    out.push(
                        ChessMove::quiet(from, two, PieceKind::Pawn)
                            .with_flags(FLAG_DOUBLE_PAWN_PUSH),
                    );
                }
            }
        }

        let mut captures = pawn_attacks(side, from) & enemy_occ;
        while captures != 0 {
            let to = captures.trailing_zeros() as Square;
            if let Some(captured) = game_state.piece_of_color_at(enemy, to) {
                push_with_promotions(
                    ChessMove::capture(from, to, PieceKind::Pawn, captured),
                    promotion_rank,
                    out,
                );
            }
            captures &= captures - 1;
        }

        if let Some(ep) = game_state.en_passant_square {
            if pawn_attacks(side, from) & (1u64 << ep) != 0 {
                out.push(
                    ChessMove::capture(from, ep, PieceKind::Pawn, PieceKind::Pawn)
                        .with_flags(FLAG_EN_PASSANT),
                );
            }
        }

        pawns &= pawns - 1;
    }
}

fn push_with_promotions(mv: ChessMove, promotion_rank: u8, out: &mut Vec<ChessMove>) {
    if square_rank(mv.to) == promotion_rank {
        out.extend(PROMOTION_PIECES.iter().map(|&promo| mv.with_promotion(promo)));
    } else {
        out.push(mv);
    }
}

fn generate_castling_moves(game_state: &GameState, out: &mut Vec<ChessMove>) {
    let side = game_state.side_to_move;
    let enemy = side.opposite();
    let (king_from, kingside, queenside) = match side {
        Color::Light => (4u8, CASTLE_LIGHT_KINGSIDE, CASTLE_LIGHT_QUEENSIDE),
        Color::Dark => (60u8, CASTLE_DARK_KINGSIDE, CASTLE_DARK_QUEENSIDE),
    };

    if game_state.king_square(side) != Some(king_from)
        || is_square_attacked(game_state, king_from, enemy)
    {
        return;
    }

    let bit = |square: Square| 1u64 << square;
    // (right, squares that must be empty, king destination, rook corner)
    let options = [
        (kingside, bit(king_from + 1) | bit(king_from + 2), king_from + 2, king_from + 3),
        (
            queenside,
            bit(king_from - 1) | bit(king_from - 2) | bit(king_from - 3),
            king_from - 2,
            king_from - 4,
        ),
    ];

    for (right, must_be_empty, king_to, rook_corner) in options {
        if game_state.castling_rights & right == 0 {
            continue;
        }
        if game_state.bitboard(side, PieceKind::Rook) & bit(rook_corner) == 0 {
            continue;
        }
        if game_state.occupancy_all & must_be_empty != 0 {
            continue;
        }
        let mut passing = (king_from.min(king_to)..=king_from.max(king_to))
            .filter(|&square| square != king_from);
        if passing.any(|square| is_square_attacked(game_state, square, enemy)) {
            continue;
        }
        out.push(ChessMove::quiet(king_from, king_to, PieceKind::King).with_flags(FLAG_CASTLING));
    }
}
