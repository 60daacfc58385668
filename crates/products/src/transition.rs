//! Transition validation.
//!
//! Both functions are total and side-effect free. They only answer yes/no;
//! the caller decides which error a rejection becomes.

use supplychain_core::LifecycleState;

/// Whether `requested` (wire code) is the immediate successor of `current`.
///
/// Unknown codes, no-ops, regressions, skips and anything requested from the
/// terminal state are all rejected.
pub fn can_advance(current: LifecycleState, requested: u8) -> bool {
    LifecycleState::from_code(requested).is_some_and(|to| can_transition(current, to))
}

/// Typed form of [`can_advance`].
pub fn can_transition(from: LifecycleState, to: LifecycleState) -> bool {
    from.successor() == Some(to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn only_the_three_consecutive_pairs_are_legal() {
        let mut legal = Vec::new();
        for from in LifecycleState::ALL {
            for to in LifecycleState::ALL {
                if can_transition(from, to) {
                    legal.push((from.code(), to.code()));
                }
            }
        }
        assert_eq!(legal, vec![(0, 1), (1, 2), (2, 3)]);
    }

    #[test]
    fn rejects_noop_regression_and_skip() {
        assert!(!can_advance(LifecycleState::Packed, 1));
        assert!(!can_advance(LifecycleState::Shipped, 0));
        assert!(!can_advance(LifecycleState::Created, 2));
        assert!(!can_advance(LifecycleState::Created, 3));
    }

    #[test]
    fn nothing_follows_delivered() {
        for code in 0..=u8::MAX {
            assert!(!can_advance(LifecycleState::Delivered, code));
        }
    }

    #[test]
    fn rejects_out_of_range_codes() {
        for state in LifecycleState::ALL {
            assert!(!can_advance(state, 4));
            assert!(!can_advance(state, 200));
        }
    }

    proptest! {
        /// Property: a code is accepted iff it equals current + 1 and names a state.
        #[test]
        fn accepts_exactly_current_plus_one(current in 0u8..4, requested in any::<u8>()) {
            let state = LifecycleState::from_code(current).unwrap();
            let expected = requested == current + 1 && requested <= 3;
            prop_assert_eq!(can_advance(state, requested), expected);
        }

        /// Property: the validator is deterministic.
        #[test]
        fn is_deterministic(current in 0u8..4, requested in any::<u8>()) {
            let state = LifecycleState::from_code(current).unwrap();
            prop_assert_eq!(can_advance(state, requested), can_advance(state, requested));
        }
    }
}
