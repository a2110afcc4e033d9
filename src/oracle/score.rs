//! Oracle evaluations, decoded once at the protocol boundary.
//!
//! Scores are relative to the side to move. Mate scores are folded into the
//! centipawn scale so that any mate outranks any material evaluation and a
//! shorter mate outranks a longer one.

use std::fmt;
use std::str::FromStr;

use crate::errors::HumanEngineError;

/// Centipawns per move of mate distance when folding mates into centipawns.
const MATE_STEP_CP: i32 = 100;
/// Mate distance at which the folded score reaches zero.
const MATE_HORIZON: i32 = 50;
/// Folded scores above this are mate in one.
pub const MATE_IN_ONE_THRESHOLD: i32 = 4800;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MateSide {
    /// The side to move delivers mate.
    Giving,
    /// The side to move gets mated.
    Receiving,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    Centipawns(i32),
    MateIn { moves: u32, side: MateSide },
}

impl Score {
    /// Decode the `score <kind> <value>` pair of a UCI `info` line.
    pub fn from_uci(kind: &str, value: &str) -> Result<Score, HumanEngineError> {
        let number: i32 = value
            .parse()
            .map_err(|_| HumanEngineError::OracleProtocol(format!("bad score value '{value}'")))?;

        match kind {
            "cp" => Ok(Score::Centipawns(number)),
            "mate" => Ok(Score::mate_from_signed(number)),
            _ => Err(HumanEngineError::OracleProtocol(format!(
                "unknown score kind '{kind}'"
            ))),
        }
    }

    /// `mate 0` (already mated) and negative distances are received mates.
    fn mate_from_signed(distance: i32) -> Score {
        Score::MateIn {
            moves: distance.unsigned_abs(),
            side: if distance > 0 {
                MateSide::Giving
            } else {
                MateSide::Receiving
            },
        }
    }

    pub fn to_centipawns(self) -> i32 {
        match self {
            Score::Centipawns(cp) => cp,
            Score::MateIn { moves, side } => {
                let moves = moves.min(i32::MAX as u32) as i32;
                match side {
                    MateSide::Giving => (MATE_HORIZON - moves) * MATE_STEP_CP,
                    MateSide::Receiving => (moves - MATE_HORIZON) * MATE_STEP_CP,
                }
            }
        }
    }

    #[inline]
    pub fn is_mate_in_one(self) -> bool {
        self.to_centipawns() > MATE_IN_ONE_THRESHOLD
    }
}

/// Accepts `cp 34`, `mate -2`, and the compact `+34` / `-12` / `#3` / `#-2`
/// forms.
impl FromStr for Score {
    type Err = HumanEngineError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let text = text.trim();
        let mut parts = text.split_whitespace();
        if let (Some(kind), Some(value), None) = (parts.next(), parts.next(), parts.next()) {
            return Score::from_uci(kind, value);
        }

        if let Some(mate) = text.strip_prefix('#') {
            let distance: i32 = mate.trim_start_matches('+').parse().map_err(|_| {
                HumanEngineError::OracleProtocol(format!("bad mate marker '{text}'"))
            })?;
            return Ok(Score::mate_from_signed(distance));
        }

        text.trim_start_matches('+')
            .parse()
            .map(Score::Centipawns)
            .map_err(|_| HumanEngineError::OracleProtocol(format!("bad score '{text}'")))
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Centipawns(cp) => write!(f, "{cp:+}"),
            Score::MateIn {
                moves,
                side: MateSide::Giving,
            } => write!(f, "#+{moves}"),
            Score::MateIn {
                moves,
                side: MateSide::Receiving,
            } => write!(f, "#-{moves}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_uci_centipawns_and_mates() {
        assert_eq!(Score::from_uci("cp", "-35").expect("cp"), Score::Centipawns(-35));
        assert_eq!(
            Score::from_uci("mate", "3").expect("mate"),
            Score::MateIn {
                moves: 3,
                side: MateSide::Giving
            }
        );
        assert_eq!(
            Score::from_uci("mate", "-2").expect("mate"),
            Score::MateIn {
                moves: 2,
                side: MateSide::Receiving
            }
        );
    }

    #[test]
    fn rejects_garbage_instead_of_guessing() {
        assert!(matches!(
            Score::from_uci("cp", "abc"),
            Err(HumanEngineError::OracleProtocol(_))
        ));
        assert!(matches!(
            Score::from_uci("wdl", "500"),
            Err(HumanEngineError::OracleProtocol(_))
        ));
        assert!("#x".parse::<Score>().is_err());
        assert!("".parse::<Score>().is_err());
    }

    #[test]
    fn mate_folding_orders_scores() {
        let mate_in_one: Score = "#+1".parse().expect("mate marker");
        let mate_in_three: Score = "#3".parse().expect("mate marker");
        let mated_in_two: Score = "#-2".parse().expect("mate marker");

        assert_eq!(mate_in_one.to_centipawns(), 4900);
        assert!(mate_in_one.is_mate_in_one());
        assert!(!mate_in_three.is_mate_in_one());
        assert!(mate_in_three.to_centipawns() > Score::Centipawns(2000).to_centipawns());
        assert_eq!(mated_in_two.to_centipawns(), -4800);
        assert!(mated_in_two.to_centipawns() < Score::Centipawns(-2000).to_centipawns());
    }

    #[test]
    fn compact_forms_round_trip_through_display() {
        for text in ["+34", "-12", "#+4", "#-1"] {
            let score: Score = text.parse().expect("compact score");
            assert_eq!(score.to_string(), text);
        }
        assert_eq!("cp 0".parse::<Score>().expect("cp"), Score::Centipawns(0));
    }
}
