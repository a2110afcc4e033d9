//! Speculative replies prepared while the opponent is still to move.

use std::sync::atomic::AtomicBool;

use log::debug;
use rand::Rng;

use crate::analysis::piece_values::{exchange_value, trade_points};
use crate::engines::policy::PremovePolicy;
use crate::errors::{HumanEngineError, HumanResult};
use crate::game_state::{chess_types::*, game_state::GameState};
use crate::move_generation::legal_move_checks::{attackers_to_square, is_square_attacked};
use crate::move_generation::legal_move_generator::{generate_legal_moves, GeneratedMove};
use crate::oracle::oracle_trait::{EvaluationRequest, PositionalOracle, SearchLimit};
use crate::utils::long_algebraic::find_legal_move;

/// The opponent's most natural capture of one of `side`'s contested pieces:
/// the cheapest non-king attacker close in value to the target. Most
/// valuable targets are tried first.
pub fn likely_capture(
    position: &GameState,
    side: Color,
    policy: &PremovePolicy,
) -> HumanResult<Option<GeneratedMove>> {
    let opponent = side.opposite();
    let mut targets: Vec<(Square, PieceKind)> = position
        .squares_of(side)
        .into_iter()
        .filter_map(|square| position.piece_of_color_at(side, square).map(|p| (square, p)))
        .filter(|&(_, piece)| piece != PieceKind::King)
        .collect();
    targets.sort_by_key(|&(square, piece)| (std::cmp::Reverse(exchange_value(piece)), square));

    let mut legal: Option<Vec<GeneratedMove>> = None;
    for (square, piece) in targets {
        if !is_square_attacked(position, square, side) {
            continue;
        }
        let Some((from, _)) = attackers_to_square(position, square, opponent)
            .into_iter()
            .find(|&(_, attacker)| {
                attacker != PieceKind::King
                    && (trade_points(attacker) - trade_points(piece)).abs() <= policy.value_tolerance
            })
        else {
            continue;
        };

        if legal.is_none() {
            legal = Some(generate_legal_moves(position).map_err(HumanEngineError::InvalidPosition)?);
        }
        let capture = legal.iter().flatten().find(|generated| {
            let mv = &generated.chess_move;
            mv.from == from && mv.to == square && matches!(mv.promotion, None | Some(PieceKind::Queen))
        });
        if let Some(capture) = capture {
            return Ok(Some(capture.clone()));
        }
    }
    Ok(None)
}

/// A premove for `side` in `position`, where the opponent is to move. There is
/// nothing to premove when `side` is already to move.
///
/// In premove mode the oracle's predicted reply is committed blindly with a
/// fixed probability; otherwise only genuine recaptures are prepared.
pub fn find_premove(
    position: &GameState,
    side: Color,
    premove_mode: bool,
    oracle: &dyn PositionalOracle,
    cancel: Option<&AtomicBool>,
    policy: &PremovePolicy,
    rng: &mut impl Rng,
) -> HumanResult<Option<String>> {
    if position.side_to_move == side {
        debug!("no premove for {side:?}: already to move");
        return Ok(None);
    }

    if premove_mode && rng.random_bool(policy.blind_probability.clamp(0.0, 1.0)) {
        let played = oracle.play(position, SearchLimit::Depth(policy.blind_depth), cancel)?;
        let Some(ponder) = played.ponder else {
            return Ok(None);
        };
        // Only keep a reply that is legal after the predicted move.
        let Ok(predicted) = find_legal_move(&played.best_move, position) else {
            return Ok(None);
        };
        let reply = find_legal_move(&ponder, &predicted.game_after_move).ok();
        debug!("blind premove {ponder} after predicted {}", played.best_move);
        return Ok(reply.map(|_| ponder));
    }

    let Some(capture) = likely_capture(position, side, policy)? else {
        return Ok(None);
    };
    let after = &capture.game_after_move;
    let request = EvaluationRequest::new(after, SearchLimit::Depth(policy.probe_depth), 1);
    let lines = oracle.evaluate(&request, cancel)?;
    let Some(reply) = lines.first() else {
        return Ok(None);
    };
    let recaptures = find_legal_move(&reply.move_uci, after)
        .map(|generated| generated.chess_move.to == capture.chess_move.to)
        .map_err(|e| HumanEngineError::OracleProtocol(format!("premove probe line: {e}")))?;

    Ok(recaptures.then(|| reply.move_uci.clone()))
}
