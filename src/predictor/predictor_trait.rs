//! Plausibility predictor abstraction.
//!
//! A predictor maps a [`BoardEncoding`] to a 64-square probability vector.
//! There is one "piece selector" model that scores origin squares and one
//! destination model per piece kind.

use crate::errors::HumanResult;
use crate::game_state::chess_types::{PieceKind, Square};
use crate::predictor::board_encoding::{output_index, BoardEncoding};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredictorModel {
    PieceSelector,
    Destination(PieceKind),
}

/// 64 probabilities in model output order (a8 first).
#[derive(Debug, Clone, PartialEq)]
pub struct SquareDistribution(pub [f32; 64]);

impl SquareDistribution {
    pub fn uniform() -> Self {
        Self([1.0 / 64.0; 64])
    }

    /// Probability for a square of the perspective board.
    #[inline]
    pub fn probability_at(&self, square: Square) -> f32 {
        self.0[output_index(square)]
    }

    /// The `k` most likely perspective-board squares, most likely first.
    /// Ties go to the lower output index.
    pub fn top_squares(&self, k: usize) -> Vec<(Square, f32)> {
        let mut ranked: Vec<(usize, f32)> = self.0.iter().copied().enumerate().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked
            .into_iter()
            .take(k)
            .map(|(index, probability)| ((index as Square) ^ 56, probability))
            .collect()
    }
}

pub trait PlausibilityPredictor: Send + Sync {
    fn predict(
        &self,
        model: PredictorModel,
        encoding: &BoardEncoding,
    ) -> HumanResult<SquareDistribution>;
}

/// Normalise logits into probabilities.
pub fn softmax(logits: &[f32; 64]) -> [f32; 64] {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut out = [0.0f32; 64];
    let mut total = 0.0f32;
    for (slot, logit) in out.iter_mut().zip(logits) {
        *slot = (logit - max).exp();
        total += *slot;
    }
    if total > 0.0 {
        for slot in &mut out {
            *slot /= total;
        }
    }
    out
}
