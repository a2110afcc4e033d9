//! Crate root module declarations for the human-like chess move engine.
//!
//! Board representation and legal move generation sit at the bottom; the
//! analysis primitives, the positional oracle client and the plausibility
//! predictor build on them; `engines` combines everything into the per-game
//! decision engine used by the `human_move` driver.

pub mod game_state {
    pub mod chess_rules;
    pub mod chess_types;
    pub mod game_state;
}

pub mod moves {
    pub mod attack_tables;
    pub mod chess_move;
}

pub mod move_generation {
    pub mod legal_move_apply;
    pub mod legal_move_checks;
    pub mod legal_move_generator;
}

pub mod utils {
    pub mod algebraic;
    pub mod fen;
    pub mod long_algebraic;
}

pub mod analysis {
    pub mod complexity;
    pub mod en_pris;
    pub mod files;
    pub mod king_danger;
    pub mod phase;
    pub mod piece_values;
    pub mod weird_move;
}

pub mod oracle {
    pub mod oracle_trait;
    pub mod score;
    pub mod uci_oracle;
}

pub mod predictor {
    pub mod board_encoding;
    pub mod centrality_predictor;
    pub mod linear_predictor;
    pub mod predictor_trait;
}

pub mod engines {
    pub mod candidates;
    pub mod decision_state;
    pub mod engine_humanized;
    pub mod engine_trait;
    pub mod mode_machine;
    pub mod obvious_move;
    pub mod policy;
    pub mod premove;
    pub mod reranker;
    pub mod resign;
    pub mod selection;
    #[cfg(test)]
    pub mod test_support;
    pub mod think_delay;
    pub mod time_management;
}

pub mod errors;
