// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Swap-partner prediction.

Given an index and a pending step, computes which index it will be compared against.  Within one step the
pairing is an involution, so the pairs form a perfect matching and no two workers touch the same element.

```text
flip, span 4          disperse, span 4
 0  1  2  3            0  1  2  3
 └──┼──┼──┘            └──┼──┘  │
    └──┘                  └─────┘
```
*/

use super::StepPhase;

/**
Returns the index that `index` is compared against when `phase` runs with `span`.

Returns `index` itself when there is no pending comparison (`StepPhase::None`, or a span of 0).
Returns `None` when `index` is out of range or `span` does not evenly divide `total_elements`.

```
use bitonic_sequencer::sequencer::{predict_partner, StepPhase};
assert_eq!(predict_partner(1, StepPhase::FlipLocal, 4, 8), Some(2));
assert_eq!(predict_partner(1, StepPhase::DisperseLocal, 4, 8), Some(3));
assert_eq!(predict_partner(5, StepPhase::None, 0, 8), Some(5));
```
*/
pub fn predict_partner(index: u32, phase: StepPhase, span: u32, total_elements: u32) -> Option<u32> {
    if index >= total_elements {
        return None;
    }
    if phase == StepPhase::None || span == 0 {
        return Some(index);
    }
    if !span.is_power_of_two() || total_elements % span != 0 {
        return None;
    }
    let offset = index % span;
    if phase.is_flip() {
        Some(span * (index / span + 1) - offset - 1)
    } else {
        let half = span / 2;
        if offset < half {
            Some(index + half)
        } else {
            Some(index - half)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAIRING: [StepPhase; 4] = [
        StepPhase::FlipLocal,
        StepPhase::DisperseLocal,
        StepPhase::FlipGlobal,
        StepPhase::DisperseGlobal,
    ];

    #[test]
    fn flip_mirrors_within_block() {
        assert_eq!(predict_partner(1, StepPhase::FlipLocal, 4, 8), Some(2));
        assert_eq!(predict_partner(0, StepPhase::FlipLocal, 4, 8), Some(3));
        assert_eq!(predict_partner(5, StepPhase::FlipGlobal, 4, 8), Some(6));
        assert_eq!(predict_partner(0, StepPhase::FlipGlobal, 8, 8), Some(7));
    }

    #[test]
    fn disperse_pairs_halves() {
        assert_eq!(predict_partner(1, StepPhase::DisperseLocal, 4, 8), Some(3));
        assert_eq!(predict_partner(3, StepPhase::DisperseLocal, 4, 8), Some(1));
        assert_eq!(predict_partner(6, StepPhase::DisperseGlobal, 8, 8), Some(2));
    }

    #[test]
    fn no_pending_comparison() {
        assert_eq!(predict_partner(3, StepPhase::None, 4, 8), Some(3));
        assert_eq!(predict_partner(3, StepPhase::FlipLocal, 0, 8), Some(3));
        assert_eq!(predict_partner(3, StepPhase::DisperseLocal, 1, 8), Some(3));
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(predict_partner(8, StepPhase::FlipLocal, 4, 8), None);
        assert_eq!(predict_partner(1, StepPhase::FlipLocal, 3, 8), None);
        assert_eq!(predict_partner(1, StepPhase::FlipLocal, 16, 8), None);
    }

    #[test]
    fn involution() {
        for log2 in 2..=10 {
            let total = 1u32 << log2;
            let mut span = 2;
            while span <= total {
                for phase in PAIRING {
                    for i in 0..total {
                        let partner = predict_partner(i, phase, span, total).unwrap();
                        assert!(partner < total);
                        assert_eq!(i / span, partner / span, "pairs never leave their block");
                        assert_eq!(predict_partner(partner, phase, span, total), Some(i));
                    }
                }
                span *= 2;
            }
        }
    }
}
