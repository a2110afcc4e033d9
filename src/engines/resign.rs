//! Resignation policy. Disabled unless `resign.enabled` is set.

use crate::analysis::complexity::WinEstimate;
use crate::engines::engine_trait::ClockInfo;
use crate::engines::policy::ResignPolicy;

/// Whether the engine should be probed for resignation at all this turn.
pub fn resignation_considered(fullmove_number: u16, resign_threshold: u16, policy: &ResignPolicy) -> bool {
    policy.enabled && fullmove_number >= resign_threshold
}

/// `estimate` comes from a deep probe of the position with the engine to move.
pub fn should_resign(
    fullmove_number: u16,
    resign_threshold: u16,
    clocks: &ClockInfo,
    estimate: &WinEstimate,
    policy: &ResignPolicy,
) -> bool {
    if !resignation_considered(fullmove_number, resign_threshold, policy) {
        return false;
    }
    if estimate.side_to_move_winning {
        return false;
    }
    if !clocks.is_timed() {
        return estimate.percentage > policy.untimed_hopeless_percentage;
    }
    // An opponent low on time may still lose on the clock.
    if clocks.opp_secs() < policy.opponent_floor_secs {
        return false;
    }
    clocks.opp_fraction() > policy.opponent_fraction && estimate.percentage > policy.hopeless_percentage
}
