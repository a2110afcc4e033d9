//! Human-likeness re-ranking of raw candidates.
//!
//! Each rule multiplies or divides a candidate's plausibility. The rules only
//! look at the position before and after the candidate, the opponent's last
//! move (through the previous position) and the engine's own last move.

use log::debug;

use crate::analysis::en_pris::{hanging_pieces, is_en_pris, newly_attacked, NewlyAttacked};
use crate::analysis::king_danger::HIGH_KING_DANGER;
use crate::analysis::phase::GamePhase;
use crate::analysis::piece_values::{exchange_value, material, salience};
use crate::analysis::weird_move::is_weird_move;
use crate::engines::candidates::{sort_candidates, CandidateMove};
use crate::engines::policy::{CapsPolicy, RerankPolicy};
use crate::errors::{HumanEngineError, HumanResult};
use crate::game_state::{chess_types::*, game_state::GameState};
use crate::move_generation::legal_move_checks::attackers_to_square;
use crate::moves::attack_tables::piece_attacks;
use crate::moves::chess_move::ChessMove;

pub struct RerankContext<'a> {
    pub position: &'a GameState,
    pub side: Color,
    pub phase: GamePhase,
    /// Position before the opponent's last move, if known.
    pub prev_position: Option<&'a GameState>,
    pub prev_own_move: Option<&'a ChessMove>,
    pub obvious_move: Option<&'a str>,
    pub king_danger: f64,
}

/// Facts about the current position shared by every candidate.
struct Baseline {
    own_hanging: Vec<Square>,
    threatened: Option<NewlyAttacked>,
    material_deficit: f64,
}

impl Baseline {
    fn new(ctx: &RerankContext<'_>) -> Self {
        let opponent = ctx.side.opposite();
        Self {
            own_hanging: hanging_pieces(ctx.position, ctx.side)
                .into_iter()
                .map(|(square, _, _)| square)
                .collect(),
            threatened: ctx
                .prev_position
                .and_then(|prev| newly_attacked(prev, ctx.position, ctx.side)),
            material_deficit: material(ctx.position, Some(opponent))
                - material(ctx.position, Some(ctx.side)),
        }
    }
}

/// Square of the piece a capture removes.
fn captured_square(mv: &ChessMove) -> Square {
    if mv.is_en_passant() {
        make_square(square_file(mv.to), square_rank(mv.from))
    } else {
        mv.to
    }
}

fn capture_factor(ctx: &RerankContext<'_>, mv: &ChessMove, policy: &RerankPolicy) -> f64 {
    let Some(captured) = mv.captured else {
        return 1.0;
    };
    if is_en_pris(ctx.position, captured_square(mv)).is_hanging {
        let mut factor = policy.hanging_capture;
        if captured == PieceKind::Pawn && ctx.phase == GamePhase::Endgame {
            factor *= policy.endgame_pawn_capture;
        }
        factor
    } else if exchange_value(captured) < exchange_value(mv.piece) {
        1.0 / policy.poor_trade_divisor
    } else {
        1.0
    }
}

/// A quiet move that puts the piece where an equal enemy piece can take it.
fn offers_trade(ctx: &RerankContext<'_>, candidate: &CandidateMove) -> bool {
    let mv = &candidate.chess_move;
    if mv.is_capture() || mv.piece == PieceKind::King {
        return false;
    }
    let after = &candidate.game_after_move;
    let value = exchange_value(mv.promotion.unwrap_or(mv.piece));
    attackers_to_square(after, mv.to, ctx.side.opposite())
        .iter()
        .any(|&(_, attacker)| exchange_value(attacker) == value)
        && !is_en_pris(after, mv.to).is_hanging
}

fn is_shuffle(ctx: &RerankContext<'_>, mv: &ChessMove) -> bool {
    let Some(prev) = ctx.prev_own_move else {
        return false;
    };
    if mv.from != prev.to {
        return false;
    }
    let reachable_before = piece_attacks(ctx.side, mv.piece, prev.from, ctx.position.occupancy_all);
    mv.to == prev.from || reachable_before & (1u64 << mv.to) != 0
}

/// Salience of the most noticeable own piece hanging after the move.
fn worst_hung_salience(ctx: &RerankContext<'_>, after: &GameState) -> f64 {
    hanging_pieces(after, ctx.side)
        .into_iter()
        .map(|(_, piece, _)| salience(piece))
        .fold(0.0, f64::max)
}

fn candidate_factor(
    ctx: &RerankContext<'_>,
    baseline: &Baseline,
    candidate: &CandidateMove,
    policy: &RerankPolicy,
) -> HumanResult<f64> {
    let mv = &candidate.chess_move;
    let after = &candidate.game_after_move;
    let mut factor = capture_factor(ctx, mv, policy);

    if baseline.material_deficit > policy.losing_material && offers_trade(ctx, candidate) {
        factor /= policy.losing_trade_divisor;
    }

    if mv.piece == PieceKind::Pawn {
        factor *= policy.pawn_advance;
        if mv.promotion.is_some() {
            factor *= policy.promotion;
        }
    }

    if baseline.own_hanging.contains(&mv.from) {
        factor *= policy.hanging_escape;
    }

    if let Some(target) = newly_attacked(ctx.position, after, ctx.side.opposite()) {
        factor *= 1.0 + salience(target.piece) / policy.new_attack_scale;
    }

    if let Some(threat) = baseline.threatened {
        if threat.square != mv.from
            && after.color_at(threat.square) == Some(ctx.side)
            && !is_en_pris(after, threat.square).is_hanging
        {
            factor *= policy.protect_threatened;
        }
    }

    if is_shuffle(ctx, mv) && ctx.obvious_move != Some(candidate.move_uci.as_str()) {
        factor /= policy.shuffle_divisor;
    }

    let hung = worst_hung_salience(ctx, after);
    factor /= (hung / policy.hang_scale).max(1.0);

    let weird = is_weird_move(ctx.position, ctx.phase, mv, ctx.obvious_move, ctx.king_danger)
        .map_err(HumanEngineError::InvalidMove)?;
    if weird {
        factor /= policy.weird_divisor;
    }

    Ok(factor)
}

/// Apply every rule and re-sort, best first.
pub fn rerank(
    mut candidates: Vec<CandidateMove>,
    ctx: &RerankContext<'_>,
    policy: &RerankPolicy,
) -> HumanResult<Vec<CandidateMove>> {
    let baseline = Baseline::new(ctx);
    for candidate in &mut candidates {
        let factor = candidate_factor(ctx, &baseline, candidate, policy)?;
        candidate.score *= factor;
    }
    sort_candidates(&mut candidates);

    if log::log_enabled!(log::Level::Debug) {
        let top: Vec<String> = candidates
            .iter()
            .take(5)
            .map(|c| format!("{}={:.4}", c.move_uci, c.score))
            .collect();
        debug!("re-ranked: {}", top.join(" "));
    }
    Ok(candidates)
}

/// How many candidates a blunder-prone turn keeps under consideration.
pub fn blunder_prone_width(efficient_mobility: Option<f64>, king_danger: f64, policy: &CapsPolicy) -> usize {
    let base = match efficient_mobility {
        Some(eff) if eff < policy.low_mobility => policy.narrow_low_mobility,
        _ => policy.narrow_default,
    };
    if king_danger > HIGH_KING_DANGER {
        base + policy.narrow_king_danger_bonus
    } else {
        base
    }
}
