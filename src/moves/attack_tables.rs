//! Attack bitboards for every piece kind.
//!
//! Leapers (knight, king, pawn captures) come from const tables built at
//! compile time. Sliders are traced against an occupancy mask on demand; the
//! first blocker on each ray is included so callers can mask out own pieces.

use crate::game_state::chess_types::{Color, PieceKind, Square};

const KNIGHT_OFFSETS: [(i32, i32); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];

const KING_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

const ORTHOGONAL_STEPS: [(i32, i32); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];
const DIAGONAL_STEPS: [(i32, i32); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

pub const KNIGHT_ATTACKS: [u64; 64] = leaper_table(&KNIGHT_OFFSETS);
pub const KING_ATTACKS: [u64; 64] = leaper_table(&KING_OFFSETS);
pub const LIGHT_PAWN_ATTACKS: [u64; 64] = leaper_table(&[(-1, 1), (1, 1)]);
pub const DARK_PAWN_ATTACKS: [u64; 64] = leaper_table(&[(-1, -1), (1, -1)]);

pub const FILE_A: u64 = 0x0101_0101_0101_0101;

#[inline]
pub const fn file_mask(file: u8) -> u64 {
    FILE_A << file
}

#[inline]
pub const fn rank_mask(rank: u8) -> u64 {
    0xFFu64 << (rank * 8)
}

#[inline]
pub const fn knight_attacks(square: Square) -> u64 {
    KNIGHT_ATTACKS[square as usize]
}

#[inline]
pub const fn king_attacks(square: Square) -> u64 {
    KING_ATTACKS[square as usize]
}

/// Squares a pawn of `color` standing on `square` attacks.
#[inline]
pub const fn pawn_attacks(color: Color, square: Square) -> u64 {
    match color {
        Color::Light => LIGHT_PAWN_ATTACKS[square as usize],
        Color::Dark => DARK_PAWN_ATTACKS[square as usize],
    }
}

#[inline]
pub fn rook_attacks(square: Square, occupancy: u64) -> u64 {
    ORTHOGONAL_STEPS
        .iter()
        .fold(0, |acc, &(df, dr)| acc | trace_ray(square, df, dr, occupancy))
}

#[inline]
pub fn bishop_attacks(square: Square, occupancy: u64) -> u64 {
    DIAGONAL_STEPS
        .iter()
        .fold(0, |acc, &(df, dr)| acc | trace_ray(square, df, dr, occupancy))
}

#[inline]
pub fn queen_attacks(square: Square, occupancy: u64) -> u64 {
    rook_attacks(square, occupancy) | bishop_attacks(square, occupancy)
}

/// Attack set of `piece` of `color` on `square`, given board occupancy.
pub fn piece_attacks(color: Color, piece: PieceKind, square: Square, occupancy: u64) -> u64 {
    match piece {
        PieceKind::Pawn => pawn_attacks(color, square),
        PieceKind::Knight => knight_attacks(square),
        PieceKind::Bishop => bishop_attacks(square, occupancy),
        PieceKind::Rook => rook_attacks(square, occupancy),
        PieceKind::Queen => queen_attacks(square, occupancy),
        PieceKind::King => king_attacks(square),
    }
}

fn trace_ray(square: Square, file_step: i32, rank_step: i32, occupancy: u64) -> u64 {
    let mut file = (square % 8) as i32 + file_step;
    let mut rank = (square / 8) as i32 + rank_step;
    let mut attacks = 0u64;

    while (0..8).contains(&file) && (0..8).contains(&rank) {
        let bit = 1u64 << (rank * 8 + file);
        attacks |= bit;
        if occupancy & bit != 0 {
            break;
        }
        file += file_step;
        rank += rank_step;
    }

    attacks
}

const fn leaper_table(offsets: &[(i32, i32)]) -> [u64; 64] {
    let mut table = [0u64; 64];
    let mut sq = 0usize;

    while sq < 64 {
        let file = (sq % 8) as i32;
        let rank = (sq / 8) as i32;
        let mut attacks = 0u64;
        let mut i = 0usize;

        while i < offsets.len() {
            let f = file + offsets[i].0;
            let r = rank + offsets[i].1;
            if f >= 0 && f < 8 && r >= 0 && r < 8 {
                attacks |= 1u64 << (r * 8 + f);
            }
            i += 1;
        }

        table[sq] = attacks;
        sq += 1;
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaper_counts_from_centre_and_corner() {
        let d4 = 27u8;
        assert_eq!(knight_attacks(d4).count_ones(), 8);
        assert_eq!(knight_attacks(0).count_ones(), 2);
        assert_eq!(king_attacks(d4).count_ones(), 8);
        assert_eq!(king_attacks(63).count_ones(), 3);
    }

    #[test]
    fn pawn_attacks_point_forward_for_each_color() {
        let e4 = 28u8;
        assert_eq!(pawn_attacks(Color::Light, e4), (1u64 << 35) | (1u64 << 37));
        assert_eq!(pawn_attacks(Color::Dark, e4), (1u64 << 19) | (1u64 << 21));
        assert_eq!(pawn_attacks(Color::Light, 8).count_ones(), 1);
    }

    #[test]
    fn sliders_stop_on_first_blocker() {
        let d4 = 27u8;
        assert_eq!(rook_attacks(d4, 0).count_ones(), 14);
        assert_eq!(bishop_attacks(d4, 0).count_ones(), 13);

        let blocker_d6 = 1u64 << 43;
        let attacks = rook_attacks(d4, blocker_d6);
        assert_ne!(attacks & blocker_d6, 0);
        assert_eq!(attacks & (1u64 << 51), 0);
    }

    #[test]
    fn file_and_rank_masks() {
        assert_eq!(file_mask(4).count_ones(), 8);
        assert_ne!(file_mask(4) & (1u64 << 60), 0);
        assert_eq!(rank_mask(1), 0xFF00);
    }
}
