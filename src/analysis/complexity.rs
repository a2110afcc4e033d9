//! Position complexity, efficient mobility and win percentage.
//!
//! Both metrics combine a count of "good" oracle lines with static board
//! counts:
//!
//! ```text
//! complexity = gmo * mov * pie * mat / (400 * own_mat)
//! eff_mob    = (gmo - 1) * 100 / mov
//! ```
//!
//! where `gmo` is the number of lines within a cutoff of the best one, `mov`
//! the number of legal moves, `pie` the number of pieces on the board, and
//! `mat` / `own_mat` the material of both sides / the side to move.

use crate::analysis::piece_values::material;
use crate::game_state::game_state::GameState;
use crate::move_generation::legal_move_generator::legal_moves;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComplexityReport {
    pub complexity: f64,
    pub efficient_mobility: f64,
    pub good_moves: usize,
    pub legal_moves: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WinEstimate {
    /// Winning chances of whichever side is better, 0..=100.
    pub percentage: f64,
    /// Whether the better side is the side to move.
    pub side_to_move_winning: bool,
}

/// How far below the best line a line may score and still count as good.
/// The band widens when the side to move is already clearly better.
pub fn good_move_cutoff(best: i32) -> f64 {
    if best > 350 {
        best as f64 / 2.0
    } else if best > 200 {
        150.0
    } else {
        100.0
    }
}

/// Number of scores strictly within the cutoff of the best one.
pub fn count_good_moves(scores_cp: &[i32]) -> usize {
    let Some(&best) = scores_cp.iter().max() else {
        return 0;
    };
    let cutoff = good_move_cutoff(best);
    scores_cp
        .iter()
        .filter(|&&score| score as f64 + cutoff > best as f64)
        .count()
}

pub fn position_complexity(
    game_state: &GameState,
    scores_cp: &[i32],
) -> Result<ComplexityReport, String> {
    let mov = legal_moves(game_state)?.len();
    if mov == 0 {
        return Err("Complexity is undefined without legal moves".to_owned());
    }

    let gmo = count_good_moves(scores_cp);
    let pie = game_state.piece_count() as f64;
    let mat = material(game_state, None);
    let own_mat = material(game_state, Some(game_state.side_to_move));

    let complexity = gmo as f64 * mov as f64 * pie * mat / (400.0 * own_mat);
    let efficient_mobility = (gmo as f64 - 1.0) * 100.0 / mov as f64;

    Ok(ComplexityReport {
        complexity,
        efficient_mobility,
        good_moves: gmo,
        legal_moves: mov,
    })
}

pub fn win_percentage(game_state: &GameState, eval_cp: i32) -> WinEstimate {
    let mat = material(game_state, None);
    WinEstimate {
        percentage: (100.0 * (eval_cp as f64 / (2.0 * mat)).tanh()).abs(),
        side_to_move_winning: eval_cp >= 0,
    }
}
