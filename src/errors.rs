//! Error type for the move-decision engine.
//!
//! Board and FEN utilities keep returning `Result<_, String>`; those strings
//! are wrapped into `InvalidPosition` / `InvalidMove` where they cross into
//! the engine.

use crate::game_state::chess_types::Color;

#[derive(thiserror::Error, Debug)]
pub enum HumanEngineError {
    /// The oracle printed a score or info line that cannot be decoded.
    #[error("Oracle protocol error: {0}")]
    OracleProtocol(String),

    /// A move was requested while the other side is to move.
    #[error("Turn violation: engine plays {expected:?} but {found:?} is to move")]
    TurnViolation { expected: Color, found: Color },

    /// Not enough candidate moves or oracle lines to continue a stage.
    /// Recovered inside the engine; never returned from a turn.
    #[error("Empty candidate set: {0}")]
    EmptyCandidateSet(String),

    /// Spawning or talking to the oracle process failed.
    #[error("Oracle I/O error: {0}")]
    OracleIo(#[from] std::io::Error),

    #[error("Oracle did not answer within {0:?}")]
    OracleTimeout(std::time::Duration),

    /// The caller's stop signal was raised mid-turn.
    #[error("Decision cancelled")]
    Cancelled,

    #[error("Predictor error: {0}")]
    Predictor(String),

    #[error("Invalid position: {0}")]
    InvalidPosition(String),

    #[error("Invalid move: {0}")]
    InvalidMove(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type HumanResult<T> = Result<T, HumanEngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_violation_names_both_sides() {
        let err = HumanEngineError::TurnViolation {
            expected: Color::Light,
            found: Color::Dark,
        };
        assert_eq!(
            err.to_string(),
            "Turn violation: engine plays Light but Dark is to move"
        );
    }

    #[test]
    fn io_errors_convert_with_question_mark() {
        fn spawn() -> HumanResult<()> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "no such engine"))?;
            Ok(())
        }
        assert!(matches!(spawn(), Err(HumanEngineError::OracleIo(_))));
    }
}
