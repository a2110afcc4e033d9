//! Picking one line out of the oracle's ranked lines.

use rand::seq::IndexedRandom;
use rand::Rng;

use crate::engines::policy::{BlunderPolicy, ObviousPolicy};
use crate::engines::time_management::sample_normal;
use crate::errors::{HumanEngineError, HumanResult};
use crate::game_state::{chess_types::*, game_state::GameState};
use crate::oracle::oracle_trait::EngineLine;
use crate::utils::long_algebraic::find_legal_move;

/// Aim `N(-loss_per_level * (10 - difficulty), stdev)` centipawns below the
/// best line and play whichever line lands closest. `lines` must be sorted
/// best first; ties go to the better line.
pub fn select_by_centipawn_loss<'a>(
    lines: &'a [EngineLine],
    difficulty: f64,
    loss_stdev: f64,
    policy: &BlunderPolicy,
    rng: &mut impl Rng,
) -> Option<&'a EngineLine> {
    let best = lines.first()?.centipawns();
    let mean = -policy.loss_per_level * (10.0 - difficulty.clamp(0.0, 10.0));
    let target = f64::from(best) + sample_normal(rng, mean, loss_stdev);

    lines.iter().min_by(|a, b| {
        let da = (f64::from(a.centipawns()) - target).abs();
        let db = (f64::from(b.centipawns()) - target).abs();
        da.total_cmp(&db)
    })
}

/// Lines scoring within `band_cp` of the best one, in oracle order.
pub fn near_best(lines: &[EngineLine], band_cp: i32) -> Vec<&EngineLine> {
    let Some(best) = lines.iter().map(EngineLine::centipawns).max() else {
        return Vec::new();
    };
    lines
        .iter()
        .filter(|line| best.saturating_sub(line.centipawns()) <= band_cp)
        .collect()
}

/// Uniform choice among the near-best lines.
pub fn sample_near_best<'a>(
    lines: &'a [EngineLine],
    band_cp: i32,
    rng: &mut impl Rng,
) -> Option<&'a EngineLine> {
    near_best(lines, band_cp).choose(rng).copied()
}

/// What survival play needs to know beyond the lines themselves.
pub struct FlaggingInputs<'a> {
    pub position: &'a GameState,
    /// Where the engine's last move landed; the hand is still there.
    pub last_own_square: Option<Square>,
    /// Off when already losing or far behind on the clock.
    pub avoid_repetitions: bool,
    pub times_seen: &'a dyn Fn(&str) -> usize,
}

/// Survival pick: among near-best lines, prefer ones that do not walk into a
/// position already seen too often, then the shortest hand travel from the
/// last moved piece. Equal distances keep oracle order.
pub fn flagging_pick<'a>(
    lines: &'a [EngineLine],
    inputs: &FlaggingInputs<'_>,
    policy: &ObviousPolicy,
) -> HumanResult<Option<&'a EngineLine>> {
    let near = near_best(lines, policy.flagging_band_cp);

    let mut resolved = Vec::with_capacity(near.len());
    for line in near {
        let generated = find_legal_move(&line.move_uci, inputs.position).map_err(|e| {
            HumanEngineError::OracleProtocol(format!("oracle line {} is not playable: {e}", line.move_uci))
        })?;
        let repeats = (inputs.times_seen)(&generated.game_after_move.fingerprint());
        resolved.push((line, generated.chess_move.from, repeats));
    }

    if inputs.avoid_repetitions
        && resolved
            .iter()
            .any(|&(_, _, repeats)| repeats < policy.repetition_count)
    {
        resolved.retain(|&(_, _, repeats)| repeats < policy.repetition_count);
    }

    Ok(resolved
        .into_iter()
        .min_by_key(|&(_, from, _)| {
            inputs
                .last_own_square
                .map_or(0, |square| square_distance(square, from))
        })
        .map(|(line, _, _)| line))
}
