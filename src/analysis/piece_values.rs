//! Piece value scales.
//!
//! Each analysis primitive weighs pieces on its own scale; they are kept side
//! by side here so the scales can be compared at a glance.

use crate::game_state::{chess_types::*, game_state::GameState};

/// Static-exchange scale. The king is priced so that it is always the last
/// piece to join an exchange.
#[inline]
pub const fn exchange_value(piece: PieceKind) -> i32 {
    match piece {
        PieceKind::Pawn => 1,
        PieceKind::Knight => 3,
        PieceKind::Bishop => 3,
        PieceKind::Rook => 5,
        PieceKind::Queen => 9,
        PieceKind::King => 100,
    }
}

/// Points used to compare the two pieces of a capture / recapture pair.
#[inline]
pub const fn trade_points(piece: PieceKind) -> f64 {
    match piece {
        PieceKind::Pawn => 1.0,
        PieceKind::Knight => 3.0,
        PieceKind::Bishop => 3.5,
        PieceKind::Rook => 4.5,
        PieceKind::Queen => 6.0,
        PieceKind::King => 0.0,
    }
}

/// Material scale behind the complexity and win-percentage formulas.
#[inline]
pub const fn material_weight(piece: PieceKind) -> f64 {
    match piece {
        PieceKind::Pawn => 1.0,
        PieceKind::Knight => 3.1,
        PieceKind::Bishop => 3.5,
        PieceKind::Rook => 5.5,
        PieceKind::Queen => 9.9,
        PieceKind::King => 3.0,
    }
}

/// How much a human notices a piece being attacked or left hanging.
#[inline]
pub const fn salience(piece: PieceKind) -> f64 {
    match piece {
        PieceKind::Pawn => 2.0,
        PieceKind::Knight => 20.0,
        PieceKind::Bishop => 20.5,
        PieceKind::Rook => 35.5,
        PieceKind::Queen => 55.0,
        PieceKind::King => 0.0,
    }
}

/// Sum of [`material_weight`] over `color`'s pieces, or both sides when
/// `color` is `None`.
pub fn material(game_state: &GameState, color: Option<Color>) -> f64 {
    let colors: &[Color] = match color {
        Some(Color::Light) => &[Color::Light],
        Some(Color::Dark) => &[Color::Dark],
        None => &[Color::Light, Color::Dark],
    };

    colors
        .iter()
        .flat_map(|&c| PieceKind::ALL.into_iter().map(move |p| (c, p)))
        .map(|(c, p)| game_state.count(c, p) as f64 * material_weight(p))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starting_material_is_symmetric() {
        let game = GameState::new_game();
        let white = material(&game, Some(Color::Light));
        let black = material(&game, Some(Color::Dark));
        assert!((white - black).abs() < 1e-9);
        assert!((material(&game, None) - 2.0 * white).abs() < 1e-9);
        // 8 + 2*3.1 + 2*3.5 + 2*5.5 + 9.9 + 3
        assert!((white - 45.1).abs() < 1e-9);
    }

    #[test]
    fn exchange_scale_orders_pieces() {
        assert!(exchange_value(PieceKind::Pawn) < exchange_value(PieceKind::Knight));
        assert_eq!(exchange_value(PieceKind::Knight), exchange_value(PieceKind::Bishop));
        assert!(exchange_value(PieceKind::Queen) < exchange_value(PieceKind::King));
    }
}
