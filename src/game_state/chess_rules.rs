//! Rule-level constants shared by position setup and analysis.

/// Standard chess starting position in Forsyth-Edwards Notation (FEN).
pub const STARTING_POSITION_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Squares on one back rank.
pub const BACK_RANK_SQUARES: u32 = 8;
