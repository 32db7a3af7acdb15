//! Per-step retry caps derived from the remaining turn allowance.

use crate::domain::{Participant, TurnState};

/// Retries `participant` may spend on its next step.
///
/// On its last allowed turn (or past it) a participant gets exactly one
/// attempt. Otherwise the cap is `max_requeries`, clamped to the turns left.
pub fn allocate(participant: &Participant, turn: &TurnState) -> u32 {
    let remaining = i64::from(participant.max_consecutive_turns) - i64::from(turn.consecutive_turns);
    if remaining < 1 {
        return 1;
    }
    // remaining ≤ max_consecutive_turns, so it fits back into u32.
    participant.max_requeries.min(remaining as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participant(max_turns: u32, max_requeries: u32) -> Participant {
        Participant::new("driver", 0, max_turns).with_max_requeries(max_requeries)
    }

    #[test]
    fn last_turn_caps_at_remaining() {
        let p = participant(3, 3);
        let turn = TurnState {
            consecutive_turns: 2,
        };
        assert_eq!(allocate(&p, &turn), 1);
    }

    #[test]
    fn exhausted_allowance_still_gets_one_attempt() {
        let p = participant(2, 3);
        let turn = TurnState {
            consecutive_turns: 4,
        };
        assert_eq!(allocate(&p, &turn), 1);
    }

    #[test]
    fn fresh_turn_uses_configured_requeries() {
        let p = participant(5, 3);
        assert_eq!(allocate(&p, &TurnState::default()), 3);
    }

    #[test]
    fn cap_never_exceeds_turns_left() {
        let p = participant(5, 10);
        let turn = TurnState {
            consecutive_turns: 3,
        };
        assert_eq!(allocate(&p, &turn), 2);
    }

    #[test]
    fn zero_requeries_is_zero_cap() {
        let p = participant(3, 0);
        assert_eq!(allocate(&p, &TurnState::default()), 0);
    }
}
