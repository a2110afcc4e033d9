//! Square <-> coordinate name conversion (`e4` <-> 28).

use crate::game_state::chess_types::Square;

#[inline]
pub fn algebraic_to_square(square: &str) -> Result<Square, String> {
    let bytes = square.as_bytes();
    if bytes.len() != 2 {
        return Err(format!("Invalid algebraic square: {square}"));
    }

    let file = bytes[0];
    let rank = bytes[1];
    if !(b'a'..=b'h').contains(&file) {
        return Err(format!("Invalid algebraic file: {}", file as char));
    }
    if !(b'1'..=b'8').contains(&rank) {
        return Err(format!("Invalid algebraic rank: {}", rank as char));
    }

    Ok((rank - b'1') * 8 + (file - b'a'))
}

#[inline]
pub fn square_to_algebraic(square: Square) -> Result<String, String> {
    if square > 63 {
        return Err(format!("Square index out of bounds: {square}"));
    }

    let file_char = char::from(b'a' + square % 8);
    let rank_char = char::from(b'1' + square / 8);
    Ok(format!("{file_char}{rank_char}"))
}

#[cfg(test)]
mod tests {
    use super::{algebraic_to_square, square_to_algebraic};

    #[test]
    fn corner_squares_convert_both_ways() {
        assert_eq!(algebraic_to_square("a1").expect("a1 should parse"), 0);
        assert_eq!(algebraic_to_square("h8").expect("h8 should parse"), 63);
        assert_eq!(square_to_algebraic(28).expect("28 should convert"), "e4");
    }

    #[test]
    fn rejects_off_board_names() {
        assert!(algebraic_to_square("i1").is_err());
        assert!(algebraic_to_square("a9").is_err());
        assert!(square_to_algebraic(64).is_err());
    }
}
