//! Human-like move decision engine.
//!
//! One `HumanEngine` per game. A turn runs the stages in order:
//!
//! 1. measure the position (phase, king danger, and complexity outside the
//!    opening and time scrambles),
//! 2. derive this turn's modes and think plan with `mode_machine::next_state`,
//! 3. optionally consider resigning,
//! 4. probe shallowly for an obvious move,
//! 5. otherwise build predictor candidates, re-rank them for human
//!    plausibility, and let the oracle pick among them with a sampled
//!    centipawn loss.
//!
//! Everything is computed into locals; the engine's position and decision
//! state change only once the move is decided, so an error or a raised stop
//! signal leaves the engine as it was.

use std::sync::{atomic::AtomicBool, Arc};
use std::time::Duration;

use chrono::Utc;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::analysis::complexity::{position_complexity, win_percentage, ComplexityReport};
use crate::analysis::en_pris::newly_attacked;
use crate::analysis::king_danger::king_danger;
use crate::analysis::phase::{phase_of_game, GamePhase};
use crate::engines::candidates::{all_legal_candidates, calculate_caps, generate_candidates};
use crate::engines::decision_state::DecisionState;
use crate::engines::engine_trait::{ClockInfo, HumanlikeEngine, ModeFlags, MoveDecision};
use crate::engines::mode_machine::{clock_modes, next_state, TurnSignals};
use crate::engines::obvious_move::{detect, probe_depth, ObviousContext};
use crate::engines::policy::HumanPolicy;
use crate::engines::premove::find_premove;
use crate::engines::reranker::{blunder_prone_width, rerank, RerankContext};
use crate::engines::resign::{resignation_considered, should_resign};
use crate::engines::selection::select_by_centipawn_loss;
use crate::errors::{HumanEngineError, HumanResult};
use crate::game_state::{chess_types::*, game_state::GameState};
use crate::move_generation::legal_move_generator::{generate_legal_moves, GeneratedMove};
use crate::oracle::oracle_trait::{EngineLine, EvaluationRequest, PositionalOracle, SearchLimit};
use crate::predictor::predictor_trait::PlausibilityPredictor;
use crate::utils::long_algebraic::{find_legal_move, move_to_long_algebraic};

pub struct HumanEngine {
    side: Color,
    position: GameState,
    oracle: Arc<dyn PositionalOracle>,
    predictor: Arc<dyn PlausibilityPredictor>,
    policy: HumanPolicy,
    state: DecisionState,
    rng: StdRng,
    stop_signal: Option<Arc<AtomicBool>>,
}

/// The move a turn settled on, before anything is committed.
struct Chosen {
    generated: GeneratedMove,
    think_time: Duration,
}

impl HumanEngine {
    pub fn new(
        side: Color,
        oracle: Arc<dyn PositionalOracle>,
        predictor: Arc<dyn PlausibilityPredictor>,
        policy: HumanPolicy,
    ) -> Self {
        Self::with_rng(side, oracle, predictor, policy, StdRng::from_os_rng())
    }

    /// Reproducible engine for tests and calibration runs.
    pub fn with_seed(
        side: Color,
        oracle: Arc<dyn PositionalOracle>,
        predictor: Arc<dyn PlausibilityPredictor>,
        policy: HumanPolicy,
        seed: u64,
    ) -> Self {
        Self::with_rng(side, oracle, predictor, policy, StdRng::seed_from_u64(seed))
    }

    fn with_rng(
        side: Color,
        oracle: Arc<dyn PositionalOracle>,
        predictor: Arc<dyn PlausibilityPredictor>,
        policy: HumanPolicy,
        mut rng: StdRng,
    ) -> Self {
        let state = DecisionState::new(side, &policy, &mut rng);
        Self {
            side,
            position: GameState::new_game(),
            oracle,
            predictor,
            policy,
            state,
            rng,
            stop_signal: None,
        }
    }

    pub fn side(&self) -> Color {
        self.side
    }

    pub fn state(&self) -> &DecisionState {
        &self.state
    }

    pub fn policy(&self) -> &HumanPolicy {
        &self.policy
    }

    fn cancel_flag(&self) -> Option<&AtomicBool> {
        self.stop_signal.as_deref()
    }

    fn evaluate(&self, request: &EvaluationRequest<'_>) -> HumanResult<Vec<EngineLine>> {
        self.oracle.evaluate(request, self.cancel_flag())
    }

    fn measure_complexity(&self, position: &GameState) -> HumanResult<ComplexityReport> {
        let obvious = &self.policy.obvious;
        let request = EvaluationRequest::new(
            position,
            SearchLimit::Depth(obvious.complexity_depth),
            obvious.complexity_multipv,
        );
        let scores: Vec<i32> = self.evaluate(&request)?.iter().map(EngineLine::centipawns).collect();
        position_complexity(position, &scores).map_err(HumanEngineError::InvalidPosition)
    }

    fn hopeless(&self, position: &GameState, next: &DecisionState, clocks: &ClockInfo) -> HumanResult<bool> {
        let resign = &self.policy.resign;
        if !resignation_considered(position.fullmove_number, next.resign_threshold, resign) {
            return Ok(false);
        }
        let request = EvaluationRequest::new(position, SearchLimit::Depth(resign.probe_depth), 1);
        let Some(best) = self.evaluate(&request)?.first().map(EngineLine::centipawns) else {
            return Ok(false);
        };
        let estimate = win_percentage(position, best);
        Ok(should_resign(
            position.fullmove_number,
            next.resign_threshold,
            clocks,
            &estimate,
            resign,
        ))
    }

    /// Candidate pipeline and final centipawn-loss selection.
    fn deliberate(
        &mut self,
        position: &GameState,
        legal: &[GeneratedMove],
        next: &DecisionState,
        prev_position: Option<&GameState>,
        danger: f64,
        complexity: Option<&ComplexityReport>,
    ) -> HumanResult<String> {
        let caps = calculate_caps(position, next.phase, next.flags.blunder_prone, legal, &self.policy.caps);
        let mut candidates = generate_candidates(
            position,
            self.side,
            &caps,
            legal,
            self.predictor.as_ref(),
            &self.policy.caps,
        )?;
        if candidates.is_empty() {
            let degraded = HumanEngineError::EmptyCandidateSet(format!(
                "no legal predictor candidates in {}",
                position.get_fen()
            ));
            warn!("{degraded}; searching all legal moves");
            candidates = all_legal_candidates(legal);
        }

        let ctx = RerankContext {
            position,
            side: self.side,
            phase: next.phase,
            prev_position,
            prev_own_move: next.prev_own_move.as_ref(),
            obvious_move: next.obvious_move.as_deref(),
            king_danger: danger,
        };
        let mut ranked = rerank(candidates, &ctx, &self.policy.rerank)?;
        if next.flags.blunder_prone {
            let width = blunder_prone_width(
                complexity.map(|report| report.efficient_mobility),
                danger,
                &self.policy.caps,
            );
            ranked.truncate(width.max(1));
        }

        let root_moves: Vec<String> = ranked.iter().map(|c| c.move_uci.clone()).collect();
        let request = EvaluationRequest::new(
            position,
            SearchLimit::Time(next.plan.think_time),
            self.policy.blunder.final_multipv,
        )
        .restricted_to(&root_moves);
        let lines = self.evaluate(&request)?;

        let picked = select_by_centipawn_loss(
            &lines,
            next.plan.difficulty,
            next.plan.loss_stdev,
            &self.policy.blunder,
            &mut self.rng,
        );
        match picked {
            Some(line) => {
                debug!("final lines {:?}, picked {}", lines, line.move_uci);
                Ok(line.move_uci.clone())
            }
            None => {
                warn!("oracle returned no lines for the candidate set; playing the top candidate");
                root_moves
                    .into_iter()
                    .next()
                    .or_else(|| legal.first().map(|g| move_to_long_algebraic(&g.chess_move)))
                    .ok_or_else(|| HumanEngineError::InvalidPosition("no legal moves".to_owned()))
            }
        }
    }

    fn evasion_delay(&mut self, chosen: &GeneratedMove, prev_position: Option<&GameState>) -> Duration {
        let Some(prev) = prev_position else {
            return Duration::ZERO;
        };
        let Some(threat) = newly_attacked(prev, &self.position, self.side) else {
            return Duration::ZERO;
        };
        if chosen.chess_move.from != threat.square {
            return Duration::ZERO;
        }
        let timing = &self.policy.timing;
        let low = timing.evasion_delay_min_ms.min(timing.evasion_delay_max_ms);
        let high = timing.evasion_delay_max_ms.max(low);
        Duration::from_millis(self.rng.random_range(low..=high))
    }

    /// The position the opponent last moved from, when the current position
    /// is one legal reply to the engine's own last move.
    fn remembered_predecessor(&self) -> Option<GameState> {
        let before = GameState::from_fen(self.state.prev_fen.as_deref()?).ok()?;
        let target = self.position.fingerprint();
        generate_legal_moves(&before)
            .ok()?
            .iter()
            .any(|reply| reply.game_after_move.fingerprint() == target)
            .then_some(before)
    }

    fn log_mode_changes(&self, next: &ModeFlags) {
        let prev = &self.state.flags;
        let changes = [
            ("time scramble", prev.time_scramble, next.time_scramble),
            ("premove", prev.premove_mode, next.premove_mode),
            ("flagging", prev.flagging, next.flagging),
            ("blunder prone", prev.blunder_prone, next.blunder_prone),
        ];
        for (name, before, after) in changes {
            if before != after {
                info!("{:?}: {name} {}", self.side, if after { "on" } else { "off" });
            }
        }
    }

    fn commit(&mut self, mut next: DecisionState, chosen: Chosen, prev_move: Option<&str>) {
        next.prev_own_move = Some(chosen.generated.chess_move);
        next.prev_opponent_move = prev_move.map(str::to_owned);
        next.prev_fen = Some(chosen.generated.game_after_move.get_fen());
        next.push_position(self.position.fingerprint());
        next.push_position(chosen.generated.game_after_move.fingerprint());
        next.push_move_time(chosen.think_time);
        self.position = chosen.generated.game_after_move;
        self.state = next;
    }
}

impl HumanlikeEngine for HumanEngine {
    fn update_position(&mut self, position: GameState) {
        self.position = position;
    }

    fn position(&self) -> &GameState {
        &self.position
    }

    fn make_move(
        &mut self,
        clocks: ClockInfo,
        prev_position: Option<&GameState>,
        prev_move: Option<&str>,
    ) -> HumanResult<MoveDecision> {
        if self.state.flags.resigned {
            return Ok(MoveDecision::resigned(self.state.phase, self.state.flags));
        }

        let position = self.position.clone();
        if position.side_to_move != self.side {
            return Err(HumanEngineError::TurnViolation {
                expected: self.side,
                found: position.side_to_move,
            });
        }
        let remembered = match prev_position {
            Some(_) => None,
            None => self.remembered_predecessor(),
        };
        let prev_position = prev_position.or(remembered.as_ref());
        if let (Some(prev), Some(mv)) = (prev_position, prev_move) {
            find_legal_move(mv, prev).map_err(HumanEngineError::InvalidMove)?;
        }

        let legal = generate_legal_moves(&position).map_err(HumanEngineError::InvalidPosition)?;
        if legal.is_empty() {
            return Err(HumanEngineError::InvalidPosition(format!(
                "no legal moves in {}",
                position.get_fen()
            )));
        }

        let phase = phase_of_game(&position);
        let danger = king_danger(&position, self.side, phase);
        let modes = clock_modes(&clocks, self.state.bullet_threshold, &self.policy.clock);
        let complexity = if phase != GamePhase::Opening && !modes.time_scramble {
            Some(self.measure_complexity(&position)?)
        } else {
            None
        };

        let signals = TurnSignals {
            phase,
            fullmove_number: position.fullmove_number,
            complexity,
            king_danger: danger,
        };
        let mut next = next_state(&self.state, &signals, &clocks, &self.policy, &mut self.rng);
        self.log_mode_changes(&next.flags);
        debug!(
            "{:?} move {}: phase {:?}, danger {:.0}, complexity {:?}, plan {:?}",
            self.side, position.fullmove_number, phase, danger, complexity, next.plan
        );

        if self.hopeless(&position, &next, &clocks)? {
            info!("{:?} resigns at move {}", self.side, position.fullmove_number);
            next.flags.resigned = true;
            let decision = MoveDecision::resigned(phase, next.flags);
            self.state = next;
            return Ok(decision);
        }

        let probe = EvaluationRequest::new(
            &position,
            SearchLimit::Depth(probe_depth(&clocks, &self.policy.clock, &self.policy.obvious)),
            self.policy.obvious.multipv,
        );
        let probe_lines = self.evaluate(&probe)?;
        let outcome = {
            let ctx = ObviousContext {
                position: &position,
                prev_position,
                state: &next,
                clocks: &clocks,
                king_danger: danger,
            };
            detect(&probe_lines, &ctx, &self.policy, &mut self.rng)?
        };
        next.obvious_move = outcome.cached_obvious.clone();
        next.flags.mate_in_one = outcome.mate_in_one;
        next.flags.big_material_take = outcome.big_material_take;

        let (move_uci, think_time) = match outcome.chosen {
            Some(uci) => {
                let quick = Duration::from_secs_f64(self.policy.timing.obvious_move_max_secs.max(0.0));
                (uci, next.plan.think_time.min(quick))
            }
            None => {
                let uci = self.deliberate(
                    &position,
                    &legal,
                    &next,
                    prev_position,
                    danger,
                    complexity.as_ref(),
                )?;
                (uci, next.plan.think_time)
            }
        };

        let generated = legal
            .iter()
            .find(|generated| move_to_long_algebraic(&generated.chess_move) == move_uci)
            .cloned()
            .ok_or_else(|| {
                HumanEngineError::OracleProtocol(format!("oracle chose illegal move {move_uci}"))
            })?;
        let extra_delay = self.evasion_delay(&generated, prev_position);

        info!(
            "{:?} plays {move_uci} after {:?} (+{:?}), {:?}",
            self.side, think_time, extra_delay, phase
        );
        let decision = MoveDecision {
            chosen_move: Some(move_uci),
            think_time,
            extra_delay,
            flags: next.flags,
            phase,
            decided_at: Utc::now(),
        };
        self.commit(
            next,
            Chosen {
                generated,
                think_time,
            },
            prev_move,
        );
        Ok(decision)
    }

    fn premove(&mut self, position: &GameState) -> HumanResult<Option<String>> {
        let premove = find_premove(
            position,
            self.side,
            self.state.flags.premove_mode,
            self.oracle.as_ref(),
            self.stop_signal.as_deref(),
            &self.policy.premove,
            &mut self.rng,
        )?;
        if let Some(uci) = &premove {
            debug!("{:?} premove {uci}", self.side);
        }
        Ok(premove)
    }

    fn reset(&mut self) {
        self.position = GameState::new_game();
        self.state = DecisionState::new(self.side, &self.policy, &mut self.rng);
    }

    fn set_stop_signal(&mut self, stop_signal: Option<Arc<AtomicBool>>) {
        self.stop_signal = stop_signal;
    }
}
