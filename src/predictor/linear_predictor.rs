//! Single-layer softmax models loaded from a JSON weights artifact.
//!
//! ```json
//! {
//!   "selector": { "weights": [[...64 floats...], ... 768 rows], "bias": [...64] },
//!   "pawn":     { ... },
//!   "knight":   { ... },
//!   "bishop":   { ... },
//!   "rook":     { ... },
//!   "queen":    { ... },
//!   "king":     { ... }
//! }
//! ```
//!
//! Weights are read once and never mutated, so one predictor can be shared by
//! every game through an `Arc`.

use std::path::Path;

use serde::Deserialize;

use crate::errors::{HumanEngineError, HumanResult};
use crate::game_state::chess_types::PieceKind;
use crate::predictor::board_encoding::{BoardEncoding, BOARD_ENCODING_LEN};
use crate::predictor::predictor_trait::{
    softmax, PlausibilityPredictor, PredictorModel, SquareDistribution,
};

#[derive(Debug, Clone, Deserialize)]
pub struct LinearModel {
    /// `BOARD_ENCODING_LEN` rows of 64 output weights.
    pub weights: Vec<Vec<f32>>,
    pub bias: Vec<f32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct WeightsFile {
    selector: LinearModel,
    pawn: LinearModel,
    knight: LinearModel,
    bishop: LinearModel,
    rook: LinearModel,
    queen: LinearModel,
    king: LinearModel,
}

#[derive(Debug, Clone)]
pub struct LinearPredictor {
    selector: LinearModel,
    /// Indexed by `PieceKind::index()`.
    destinations: [LinearModel; 6],
}

impl LinearModel {
    fn validate(&self, name: &str) -> HumanResult<()> {
        if self.weights.len() != BOARD_ENCODING_LEN {
            return Err(HumanEngineError::Predictor(format!(
                "model '{name}' has {} weight rows, expected {BOARD_ENCODING_LEN}",
                self.weights.len()
            )));
        }
        if let Some(row) = self.weights.iter().position(|row| row.len() != 64) {
            return Err(HumanEngineError::Predictor(format!(
                "model '{name}' weight row {row} does not have 64 outputs"
            )));
        }
        if self.bias.len() != 64 {
            return Err(HumanEngineError::Predictor(format!(
                "model '{name}' bias has {} entries, expected 64",
                self.bias.len()
            )));
        }
        Ok(())
    }

    fn forward(&self, encoding: &BoardEncoding) -> [f32; 64] {
        let mut logits = [0.0f32; 64];
        logits.copy_from_slice(&self.bias);
        // The encoding is one-hot, so only active rows contribute.
        for input in encoding.active_inputs() {
            for (logit, weight) in logits.iter_mut().zip(&self.weights[input]) {
                *logit += weight;
            }
        }
        softmax(&logits)
    }
}

impl LinearPredictor {
    pub fn from_json_str(json: &str) -> HumanResult<Self> {
        let file: WeightsFile = serde_json::from_str(json)
            .map_err(|e| HumanEngineError::Predictor(format!("invalid weights file: {e}")))?;

        file.selector.validate("selector")?;
        let destinations = [
            file.pawn, file.knight, file.bishop, file.rook, file.queen, file.king,
        ];
        for (piece, model) in PieceKind::ALL.iter().zip(&destinations) {
            model.validate(&format!("{piece:?}").to_lowercase())?;
        }

        Ok(Self {
            selector: file.selector,
            destinations,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> HumanResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            HumanEngineError::Predictor(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&json)
    }
}

impl PlausibilityPredictor for LinearPredictor {
    fn predict(
        &self,
        model: PredictorModel,
        encoding: &BoardEncoding,
    ) -> HumanResult<SquareDistribution> {
        let model = match model {
            PredictorModel::PieceSelector => &self.selector,
            PredictorModel::Destination(piece) => &self.destinations[piece.index()],
        };
        Ok(SquareDistribution(model.forward(encoding)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_state::{chess_types::Color, game_state::GameState};
    use serde_json::json;

    fn zero_model() -> serde_json::Value {
        json!({
            "weights": vec![vec![0.0f32; 64]; BOARD_ENCODING_LEN],
            "bias": vec![0.0f32; 64],
        })
    }

    fn weights_with_knight_bias(output: usize) -> String {
        let mut knight = zero_model();
        knight["bias"][output] = json!(5.0);
        json!({
            "selector": zero_model(),
            "pawn": zero_model(),
            "knight": knight,
            "bishop": zero_model(),
            "rook": zero_model(),
            "queen": zero_model(),
            "king": zero_model(),
        })
        .to_string()
    }

    #[test]
    fn zero_weights_give_a_uniform_distribution() {
        let predictor =
            LinearPredictor::from_json_str(&weights_with_knight_bias(0)).expect("weights load");
        let encoding = BoardEncoding::for_side(&GameState::new_game(), Color::Light);
        let selector = predictor
            .predict(PredictorModel::PieceSelector, &encoding)
            .expect("prediction");
        for probability in selector.0 {
            assert!((probability - 1.0 / 64.0).abs() < 1e-6);
        }
    }

    #[test]
    fn bias_picks_the_favoured_square() {
        // Output index 45 is f3 on the perspective board.
        let predictor =
            LinearPredictor::from_json_str(&weights_with_knight_bias(45)).expect("weights load");
        let encoding = BoardEncoding::for_side(&GameState::new_game(), Color::Light);
        let knight = predictor
            .predict(PredictorModel::Destination(PieceKind::Knight), &encoding)
            .expect("prediction");
        assert_eq!(knight.top_squares(1)[0].0, 21);
    }

    #[test]
    fn malformed_weights_are_rejected() {
        let short = json!({
            "selector": { "weights": [[0.0]], "bias": [0.0] },
            "pawn": zero_model(), "knight": zero_model(), "bishop": zero_model(),
            "rook": zero_model(), "queen": zero_model(), "king": zero_model(),
        })
        .to_string();
        assert!(matches!(
            LinearPredictor::from_json_str(&short),
            Err(HumanEngineError::Predictor(_))
        ));
        assert!(LinearPredictor::from_json_str("not json").is_err());
    }
}
