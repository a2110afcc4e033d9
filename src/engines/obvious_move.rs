//! Fast path for moves a human would play almost without thinking.
//!
//! The engine probes the oracle shallowly with a few lines; `detect` decides
//! from those lines, the clocks and the mode flags whether one of them is
//! played at once or the full candidate pipeline runs.

use log::{debug, warn};
use rand::Rng;

use crate::analysis::en_pris::{is_en_pris, newly_attacked};
use crate::analysis::piece_values::trade_points;
use crate::analysis::weird_move::is_weird_move;
use crate::engines::decision_state::DecisionState;
use crate::engines::engine_trait::ClockInfo;
use crate::engines::policy::{ClockPolicy, HumanPolicy, ObviousPolicy};
use crate::engines::selection::{flagging_pick, sample_near_best, FlaggingInputs};
use crate::errors::{HumanEngineError, HumanResult};
use crate::game_state::{chess_types::*, game_state::GameState};
use crate::move_generation::legal_move_generator::GeneratedMove;
use crate::oracle::oracle_trait::EngineLine;
use crate::utils::long_algebraic::find_legal_move;

pub struct ObviousContext<'a> {
    pub position: &'a GameState,
    /// Position before the opponent's last move, if known.
    pub prev_position: Option<&'a GameState>,
    /// State for this turn, after `mode_machine::next_state`.
    pub state: &'a DecisionState,
    pub clocks: &'a ClockInfo,
    pub king_danger: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObviousOutcome {
    /// The move to play right away, if any.
    pub chosen: Option<String>,
    /// Top probe line when it clearly dominates the second one.
    pub cached_obvious: Option<String>,
    pub mate_in_one: bool,
    pub big_material_take: bool,
    pub take_back: bool,
}

/// Probe depth: shallower in short games.
pub fn probe_depth(clocks: &ClockInfo, clock_policy: &ClockPolicy, policy: &ObviousPolicy) -> u32 {
    if clocks.is_timed() && clocks.start_secs() < clock_policy.short_game_secs {
        policy.short_game_depth
    } else {
        policy.depth
    }
}

/// Square where the opponent's last move captured one of `side`'s pieces,
/// and the piece lost there.
fn last_capture(prev: &GameState, current: &GameState, side: Color) -> Option<(Square, PieceKind)> {
    prev.squares_of(side)
        .into_iter()
        .filter(|&square| current.color_at(square) == Some(side.opposite()))
        .find_map(|square| prev.piece_of_color_at(side, square).map(|piece| (square, piece)))
}

#[derive(Debug, Clone, Copy, Default)]
struct CaptureKind {
    take_back: bool,
    big_material_take: bool,
}

fn classify_capture(
    ctx: &ObviousContext<'_>,
    generated: &GeneratedMove,
    policy: &ObviousPolicy,
) -> CaptureKind {
    let mv = &generated.chess_move;
    let Some(captured) = mv.captured else {
        return CaptureKind::default();
    };
    let target_points = trade_points(captured);
    let mover_points = trade_points(mv.piece);

    let lost = ctx
        .prev_position
        .and_then(|prev| last_capture(prev, ctx.position, ctx.state.side));
    let take_back = lost.is_some_and(|(square, piece)| {
        square == mv.to && (trade_points(piece) - target_points).abs() < policy.takeback_tolerance
    });

    let lost_points = lost.map_or(0.0, |(_, piece)| trade_points(piece));
    let deficit = lost_points - target_points;
    let big_material_take = !take_back
        && is_en_pris(ctx.position, mv.to).is_hanging
        && (deficit < policy.big_take_deficit
            || target_points > policy.big_take_value
            || target_points - mover_points > policy.big_take_gain);

    CaptureKind {
        take_back,
        big_material_take,
    }
}

/// No capture, and nothing on either side becomes hanging.
fn is_quiet(ctx: &ObviousContext<'_>, generated: &GeneratedMove) -> bool {
    let mv = &generated.chess_move;
    let after = &generated.game_after_move;
    let side = ctx.state.side;
    !mv.is_capture()
        && !is_en_pris(after, mv.to).is_hanging
        && newly_attacked(ctx.position, after, side).is_none()
        && newly_attacked(ctx.position, after, side.opposite()).is_none()
}

pub fn detect(
    lines: &[EngineLine],
    ctx: &ObviousContext<'_>,
    policy: &HumanPolicy,
    rng: &mut impl Rng,
) -> HumanResult<ObviousOutcome> {
    let obvious = &policy.obvious;
    let flags = ctx.state.flags;

    if lines.len() < 2 {
        warn!("obvious-move probe returned {} line(s); abstaining", lines.len());
        return Ok(ObviousOutcome::default());
    }

    let best_cp = lines[0].centipawns();
    let picked = if flags.flagging {
        let losing = best_cp <= obvious.losing_cp;
        let behind_on_clock = ctx.clocks.is_timed()
            && ctx.clocks.own_secs() < obvious.critical_time_ratio * ctx.clocks.opp_secs();
        let times_seen = |fingerprint: &str| ctx.state.times_seen(fingerprint);
        let inputs = FlaggingInputs {
            position: ctx.position,
            last_own_square: ctx.state.prev_own_move.map(|mv| mv.to),
            avoid_repetitions: !losing && !behind_on_clock,
            times_seen: &times_seen,
        };
        flagging_pick(lines, &inputs, obvious)?
    } else {
        sample_near_best(lines, obvious.sample_band_cp, rng)
    };
    let Some(picked) = picked else {
        return Ok(ObviousOutcome::default());
    };

    let generated = find_legal_move(&picked.move_uci, ctx.position).map_err(|e| {
        HumanEngineError::OracleProtocol(format!("probe line {} is not playable: {e}", picked.move_uci))
    })?;
    let capture = classify_capture(ctx, &generated, obvious);
    let margin = best_cp.saturating_sub(lines[1].centipawns()) > obvious.margin_cp;

    let mut outcome = ObviousOutcome {
        chosen: None,
        cached_obvious: margin.then(|| lines[0].move_uci.clone()),
        mate_in_one: picked.score.is_mate_in_one(),
        big_material_take: capture.big_material_take,
        take_back: capture.take_back,
    };

    let play_now = if flags.premove_mode || flags.flagging {
        true
    } else if capture.take_back && (flags.time_scramble || margin) {
        true
    } else {
        let short_game = ctx.clocks.is_timed() && ctx.clocks.start_secs() < policy.clock.short_game_secs;
        short_game
            && rng.random_bool(obvious.quick_move_probability.clamp(0.0, 1.0))
            && !capture.big_material_take
            && is_quiet(ctx, &generated)
            && !is_weird_move(
                ctx.position,
                ctx.state.phase,
                &generated.chess_move,
                outcome.cached_obvious.as_deref(),
                ctx.king_danger,
            )
            .map_err(HumanEngineError::InvalidMove)?
    };

    if play_now {
        debug!(
            "obvious move {} (take back {}, margin {})",
            picked.move_uci, capture.take_back, margin
        );
        outcome.chosen = Some(picked.move_uci.clone());
    }
    Ok(outcome)
}
