//! FEN <-> GameState conversion.
//!
//! The move counters are optional on input (scraped positions often carry
//! only the first four fields) and default to `0 1`.

use crate::game_state::{chess_types::*, game_state::GameState};
use crate::utils::algebraic::{algebraic_to_square, square_to_algebraic};

pub fn parse_fen(fen: &str) -> Result<GameState, String> {
    let mut parts = fen.split_whitespace();

    let board_part = parts.next().ok_or("Missing board layout in FEN")?;
    let side_part = parts.next().ok_or("Missing side-to-move in FEN")?;
    let castling_part = parts.next().ok_or("Missing castling rights in FEN")?;
    let en_passant_part = parts.next().ok_or("Missing en-passant square in FEN")?;
    let halfmove_part = parts.next().unwrap_or("0");
    let fullmove_part = parts.next().unwrap_or("1");

    if parts.next().is_some() {
        return Err("FEN has extra trailing fields".to_owned());
    }

    let mut game_state = GameState::new_empty();
    parse_board(board_part, &mut game_state)?;
    game_state.side_to_move = match side_part {
        "w" => Color::Light,
        "b" => Color::Dark,
        _ => return Err(format!("Invalid side-to-move field: {side_part}")),
    };
    game_state.castling_rights = parse_castling_rights(castling_part)?;
    game_state.en_passant_square = match en_passant_part {
        "-" => None,
        square => Some(algebraic_to_square(square)?),
    };
    game_state.halfmove_clock = halfmove_part
        .parse::<u16>()
        .map_err(|_| format!("Invalid halfmove clock: {halfmove_part}"))?;
    game_state.fullmove_number = fullmove_part
        .parse::<u16>()
        .map_err(|_| format!("Invalid fullmove number: {fullmove_part}"))?;
    game_state.recalc_occupancy();

    for color in [Color::Light, Color::Dark] {
        if game_state.count(color, PieceKind::King) != 1 {
            return Err(format!("FEN must contain exactly one {color:?} king"));
        }
    }

    Ok(game_state)
}

fn parse_board(board_part: &str, game_state: &mut GameState) -> Result<(), String> {
    let ranks: Vec<&str> = board_part.split('/').collect();
    if ranks.len() != 8 {
        return Err("Board layout must contain 8 ranks".to_owned());
    }

    for (fen_rank_idx, rank_str) in ranks.iter().enumerate() {
        let board_rank = 7 - fen_rank_idx;
        let mut file = 0usize;

        for ch in rank_str.chars() {
            if let Some(empty_count) = ch.to_digit(10) {
                if !(1..=8).contains(&empty_count) {
                    return Err(format!("Invalid empty-square count '{ch}'"));
                }
                file += empty_count as usize;
                continue;
            }

            let (color, piece) = piece_from_fen_char(ch)
                .ok_or_else(|| format!("Invalid piece character '{ch}' in board layout"))?;
            if file >= 8 {
                return Err("Board rank has too many files".to_owned());
            }
            game_state.pieces[color.index()][piece.index()] |= 1u64 << (board_rank * 8 + file);
            file += 1;
        }

        if file != 8 {
            return Err("Board rank does not sum to 8 files".to_owned());
        }
    }

    Ok(())
}

fn parse_castling_rights(castling_part: &str) -> Result<CastlingRights, String> {
    if castling_part == "-" {
        return Ok(0);
    }

    castling_part.chars().try_fold(0, |rights, ch| {
        let bit = match ch {
            'K' => CASTLE_LIGHT_KINGSIDE,
            'Q' => CASTLE_LIGHT_QUEENSIDE,
            'k' => CASTLE_DARK_KINGSIDE,
            'q' => CASTLE_DARK_QUEENSIDE,
            _ => return Err(format!("Invalid castling rights character: {ch}")),
        };
        Ok(rights | bit)
    })
}

pub fn piece_from_fen_char(ch: char) -> Option<(Color, PieceKind)> {
    let color = if ch.is_ascii_uppercase() {
        Color::Light
    } else if ch.is_ascii_lowercase() {
        Color::Dark
    } else {
        return None;
    };

    let piece = match ch.to_ascii_lowercase() {
        'p' => PieceKind::Pawn,
        'n' => PieceKind::Knight,
        'b' => PieceKind::Bishop,
        'r' => PieceKind::Rook,
        'q' => PieceKind::Queen,
        'k' => PieceKind::King,
        _ => return None,
    };

    Some((color, piece))
}

pub fn piece_to_fen_char(color: Color, piece: PieceKind) -> char {
    let base = match piece {
        PieceKind::Pawn => 'p',
        PieceKind::Knight => 'n',
        PieceKind::Bishop => 'b',
        PieceKind::Rook => 'r',
        PieceKind::Queen => 'q',
        PieceKind::King => 'k',
    };

    match color {
        Color::Light => base.to_ascii_uppercase(),
        Color::Dark => base,
    }
}

pub fn generate_fen(game_state: &GameState) -> String {
    let mut board = String::new();
    for rank in (0..8u8).rev() {
        let mut empty_count = 0u8;
        for file in 0..8u8 {
            match game_state.piece_at(make_square(file, rank)) {
                Some((color, piece)) => {
                    if empty_count > 0 {
                        board.push(char::from(b'0' + empty_count));
                        empty_count = 0;
                    }
                    board.push(piece_to_fen_char(color, piece));
                }
                None => empty_count += 1,
            }
        }
        if empty_count > 0 {
            board.push(char::from(b'0' + empty_count));
        }
        if rank > 0 {
            board.push('/');
        }
    }

    let side_to_move = match game_state.side_to_move {
        Color::Light => "w",
        Color::Dark => "b",
    };

    let mut castling = String::new();
    for (bit, ch) in [
        (CASTLE_LIGHT_KINGSIDE, 'K'),
        (CASTLE_LIGHT_QUEENSIDE, 'Q'),
        (CASTLE_DARK_KINGSIDE, 'k'),
        (CASTLE_DARK_QUEENSIDE, 'q'),
    ] {
        if game_state.castling_rights & bit != 0 {
            castling.push(ch);
        }
    }
    if castling.is_empty() {
        castling.push('-');
    }

    let en_passant = game_state
        .en_passant_square
        .and_then(|square| square_to_algebraic(square).ok())
        .unwrap_or_else(|| "-".to_owned());

    format!(
        "{} {} {} {} {} {}",
        board,
        side_to_move,
        castling,
        en_passant,
        game_state.halfmove_clock,
        game_state.fullmove_number
    )
}

#[cfg(test)]
mod tests {
    use super::{generate_fen, parse_fen};
    use crate::game_state::chess_rules::STARTING_POSITION_FEN;
    use crate::game_state::chess_types::{Color, CASTLE_DARK_KINGSIDE, CASTLE_DARK_QUEENSIDE};

    #[test]
    fn starting_position_survives_generation() {
        let parsed = parse_fen(STARTING_POSITION_FEN).expect("starting FEN should parse");
        assert_eq!(generate_fen(&parsed), STARTING_POSITION_FEN);
    }

    #[test]
    fn mid_game_fen_keeps_rights_and_counters() {
        let fen = "r1bqk2r/pppp1ppp/2n2n2/2b1p3/2B1P3/2N2N2/PPPP1PPP/R1BQ1RK1 b kq - 4 6";
        let parsed = parse_fen(fen).expect("custom FEN should parse");
        assert_eq!(generate_fen(&parsed), fen);
        assert_eq!(parsed.side_to_move, Color::Dark);
        assert_eq!(
            parsed.castling_rights,
            CASTLE_DARK_KINGSIDE | CASTLE_DARK_QUEENSIDE
        );
        assert_eq!(parsed.halfmove_clock, 4);
    }

    #[test]
    fn four_field_fen_defaults_counters() {
        let parsed = parse_fen("4k3/8/8/8/8/8/8/4K3 w - -").expect("short FEN should parse");
        assert_eq!(parsed.halfmove_clock, 0);
        assert_eq!(parsed.fullmove_number, 1);
    }

    #[test]
    fn rejects_missing_king() {
        assert!(parse_fen("8/8/8/8/8/8/8/4K3 w - - 0 1").is_err());
    }
}
