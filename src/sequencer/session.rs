// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
use std::fmt::Display;

use super::{StepPhase, predict_partner};
use crate::bittricks::{exact_log2, network_steps, workgroups_for};

///Smallest element count the sequencer accepts.
pub const MIN_ELEMENTS: u32 = 4;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigurationError {
    #[error("{what} must be a power of two, got {value}")]
    NotPowerOfTwo { what: &'static str, value: u32 },
    #[error("at least 4 elements are required, got {0}")]
    TooFewElements(u32),
    #[error("size limit {size_limit} exceeds half of {total_elements} elements")]
    SizeLimitTooLarge { size_limit: u32, total_elements: u32 },
    #[error("unknown step phase code {0}")]
    UnknownPhaseCode(u32),
    #[error("array holds {actual} elements but the session sorts {expected}")]
    ArrayLength { expected: u32, actual: usize },
}

/**
Describes one dispatch.  Produced by [SortSession::peek_next_step] and consumed once by an executor.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StepDescriptor {
    pub phase: StepPhase,
    pub span: u32,
    ///How many workgroups to dispatch.  0 when there is nothing to dispatch.
    pub workgroups: u32,
    ///Threads per workgroup.  Each thread owns two elements, so a local step may span `2 * workgroup_size`.
    pub workgroup_size: u32,
}

impl StepDescriptor {
    ///Packs the descriptor as `[phase code, span, workgroup size, workgroups]` for a uniform buffer.
    pub fn uniform_words(&self) -> [u32; 4] {
        [self.phase.code(), self.span, self.workgroup_size, self.workgroups]
    }

    ///Number of elements one workgroup can address in a local step.
    pub fn local_range(&self) -> u32 {
        self.workgroup_size * 2
    }
}

impl Display for StepDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} span={} workgroups={}", self.phase, self.span, self.workgroups)
    }
}

/**
The state of one sort run.

This is a plain value.  Transitions ([SortSession::advance], [SortSession::reset]) return a new session and
leave the receiver alone, so observers can hold on to old snapshots.

```
use bitonic_sequencer::sequencer::{SortSession, StepPhase};
let mut session = SortSession::new(8, 4).unwrap();
let mut trace = Vec::new();
while !session.is_complete() {
    let step = session.peek_next_step();
    trace.push((step.phase, step.span));
    session = session.advance(0);
}
assert_eq!(trace.len() as u32, session.total_steps());
assert_eq!(trace[0], (StepPhase::FlipLocal, 2));
assert_eq!(trace[1], (StepPhase::FlipLocal, 4));
assert_eq!(trace[2], (StepPhase::DisperseLocal, 2));
```
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SortSession {
    total_elements: u32,
    size_limit: u32,
    step_index: u32,
    total_steps: u32,
    current_phase: StepPhase,
    current_span: u32,
    next_phase: StepPhase,
    next_span: u32,
    //u64 since the terminal value is 2 * total_elements
    highest_block_height: u64,
    total_swaps: u64,
}

impl SortSession {
    /**
    Creates a session for `total_elements` elements with workgroups of `size_limit` threads.

    Both values must be powers of two, `total_elements` must be at least 4, and `size_limit` may not exceed
    `total_elements / 2`.
    */
    pub fn new(total_elements: u32, size_limit: u32) -> Result<Self, ConfigurationError> {
        let log2 = Self::validate_elements(total_elements)?;
        Self::validate_size_limit(size_limit)?;
        if size_limit > total_elements / 2 {
            return Err(ConfigurationError::SizeLimitTooLarge {
                size_limit,
                total_elements,
            });
        }
        Ok(Self::fresh(total_elements, size_limit, log2))
    }

    /**
    Creates a session whose workgroup size is `min(max_workgroup_size, total_elements / 2)`.

    This is how an interactive frontend behaves: the device reports a maximum workgroup size, and small
    arrays simply use fewer threads.
    */
    pub fn clamped(total_elements: u32, max_workgroup_size: u32) -> Result<Self, ConfigurationError> {
        let log2 = Self::validate_elements(total_elements)?;
        Self::validate_size_limit(max_workgroup_size)?;
        let size_limit = max_workgroup_size.min(total_elements / 2);
        Ok(Self::fresh(total_elements, size_limit, log2))
    }

    fn validate_elements(total_elements: u32) -> Result<u32, ConfigurationError> {
        let log2 = exact_log2(total_elements).ok_or(ConfigurationError::NotPowerOfTwo {
            what: "total_elements",
            value: total_elements,
        })?;
        if total_elements < MIN_ELEMENTS {
            return Err(ConfigurationError::TooFewElements(total_elements));
        }
        Ok(log2)
    }

    fn validate_size_limit(size_limit: u32) -> Result<(), ConfigurationError> {
        match exact_log2(size_limit) {
            Some(_) => Ok(()),
            None => Err(ConfigurationError::NotPowerOfTwo {
                what: "size_limit",
                value: size_limit,
            }),
        }
    }

    fn fresh(total_elements: u32, size_limit: u32, log2: u32) -> Self {
        SortSession {
            total_elements,
            size_limit,
            step_index: 0,
            total_steps: network_steps(log2),
            current_phase: StepPhase::None,
            current_span: 0,
            next_phase: StepPhase::FlipLocal,
            next_span: 2,
            highest_block_height: 2,
            total_swaps: 0,
        }
    }

    ///Returns a session with the same configuration at step 0.
    pub fn reset(&self) -> Self {
        //already validated
        let log2 = self.total_elements.trailing_zeros();
        Self::fresh(self.total_elements, self.size_limit, log2)
    }

    ///Describes the step that will run next.  Does not change the session.
    pub fn peek_next_step(&self) -> StepDescriptor {
        let workgroups = if self.is_complete() {
            0
        } else {
            workgroups_for(self.total_elements, self.size_limit)
        };
        StepDescriptor {
            phase: self.next_phase,
            span: self.next_span,
            workgroups,
            workgroup_size: self.size_limit,
        }
    }

    /**
    Applies the transition for the step that [Self::peek_next_step] described.

    `swaps_observed` is the number of swaps read back since the previous advance.  Readback may lag, so these
    swaps can belong to earlier steps; they are simply accumulated.

    Advancing a complete session returns it unchanged.
    */
    pub fn advance(self, swaps_observed: u32) -> Self {
        if self.is_complete() {
            return self;
        }
        let mut next = self;
        next.step_index += 1;
        next.total_swaps += u64::from(swaps_observed);
        next.current_phase = self.next_phase;
        next.current_span = self.next_span;

        let local_range = u64::from(self.size_limit) * 2;
        let halved = self.next_span / 2;
        if halved <= 1 {
            //the disperse chain for this block height is exhausted
            next.highest_block_height *= 2;
            if next.highest_block_height == u64::from(self.total_elements) * 2 {
                next.next_phase = StepPhase::None;
                next.next_span = 0;
            } else if next.highest_block_height > local_range {
                next.next_phase = StepPhase::FlipGlobal;
                next.next_span = next.highest_block_height as u32;
            } else {
                next.next_phase = StepPhase::FlipLocal;
                next.next_span = next.highest_block_height as u32;
            }
        } else {
            next.next_span = halved;
            next.next_phase = if u64::from(halved) > local_range {
                StepPhase::DisperseGlobal
            } else {
                StepPhase::DisperseLocal
            };
        }
        debug_assert!(next.step_index <= next.total_steps);
        debug_assert_eq!(next.is_complete(), next.step_index == next.total_steps);
        log::debug!(
            "step {}/{} ran {} span={}; next {} span={}",
            next.step_index,
            next.total_steps,
            next.current_phase,
            next.current_span,
            next.next_phase,
            next.next_span
        );
        next
    }

    ///Accumulates swaps that were read back after their step was already applied.
    pub fn record_swaps(self, swaps: u32) -> Self {
        let mut next = self;
        next.total_swaps += u64::from(swaps);
        next
    }

    pub fn is_complete(&self) -> bool {
        self.next_phase == StepPhase::None
    }

    ///Partner of `index` in the pending step.  See [predict_partner].
    pub fn pending_partner(&self, index: u32) -> Option<u32> {
        predict_partner(index, self.next_phase, self.next_span, self.total_elements)
    }

    ///The `(low, high)` index pairs the pending step compares.  Empty when complete.
    pub fn pending_pairs(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (0..self.total_elements).filter_map(move |i| match self.pending_partner(i) {
            Some(partner) if partner > i => Some((i, partner)),
            _ => None,
        })
    }

    pub fn total_elements(&self) -> u32 {
        self.total_elements
    }
    ///Effective workgroup size.
    pub fn size_limit(&self) -> u32 {
        self.size_limit
    }
    pub fn step_index(&self) -> u32 {
        self.step_index
    }
    pub fn total_steps(&self) -> u32 {
        self.total_steps
    }
    ///Phase of the most recently executed step.
    pub fn current_phase(&self) -> StepPhase {
        self.current_phase
    }
    ///Span of the most recently executed step.
    pub fn current_span(&self) -> u32 {
        self.current_span
    }
    pub fn next_phase(&self) -> StepPhase {
        self.next_phase
    }
    pub fn next_span(&self) -> u32 {
        self.next_span
    }
    pub fn highest_block_height(&self) -> u64 {
        self.highest_block_height
    }
    pub fn total_swaps(&self) -> u64 {
        self.total_swaps
    }
    pub fn workgroups_per_step(&self) -> u32 {
        workgroups_for(self.total_elements, self.size_limit)
    }

    ///A session that claims to have run every step but still has one pending.
    #[cfg(test)]
    pub(crate) fn exhausted(self) -> Self {
        let mut next = self;
        next.step_index = next.total_steps;
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trace(mut session: SortSession) -> Vec<(StepPhase, u32)> {
        let mut out = Vec::new();
        while !session.is_complete() {
            let step = session.peek_next_step();
            out.push((step.phase, step.span));
            session = session.advance(0);
        }
        out
    }

    #[test]
    fn rejects_bad_configuration() {
        assert_eq!(
            SortSession::new(12, 2),
            Err(ConfigurationError::NotPowerOfTwo {
                what: "total_elements",
                value: 12
            })
        );
        assert_eq!(
            SortSession::new(16, 3),
            Err(ConfigurationError::NotPowerOfTwo {
                what: "size_limit",
                value: 3
            })
        );
        assert_eq!(
            SortSession::new(16, 0),
            Err(ConfigurationError::NotPowerOfTwo {
                what: "size_limit",
                value: 0
            })
        );
        assert_eq!(SortSession::new(2, 1), Err(ConfigurationError::TooFewElements(2)));
        assert_eq!(
            SortSession::new(8, 8),
            Err(ConfigurationError::SizeLimitTooLarge {
                size_limit: 8,
                total_elements: 8
            })
        );
    }

    #[test]
    fn clamped_limits_workgroup() {
        let session = SortSession::clamped(8, 256).unwrap();
        assert_eq!(session.size_limit(), 4);
        assert!(SortSession::clamped(8, 100).is_err());
    }

    #[test]
    fn initial_state() {
        let session = SortSession::new(16, 4).unwrap();
        assert_eq!(session.step_index(), 0);
        assert_eq!(session.total_steps(), 10);
        assert_eq!(session.current_phase(), StepPhase::None);
        assert_eq!(session.current_span(), 0);
        assert_eq!(session.next_phase(), StepPhase::FlipLocal);
        assert_eq!(session.next_span(), 2);
        assert_eq!(session.highest_block_height(), 2);
        assert!(!session.is_complete());
    }

    #[test]
    fn eight_elements_all_local() {
        let session = SortSession::clamped(8, 8).unwrap();
        assert_eq!(
            trace(session),
            vec![
                (StepPhase::FlipLocal, 2),
                (StepPhase::FlipLocal, 4),
                (StepPhase::DisperseLocal, 2),
                (StepPhase::FlipLocal, 8),
                (StepPhase::DisperseLocal, 4),
                (StepPhase::DisperseLocal, 2),
            ]
        );
    }

    #[test]
    fn sixteen_elements_go_global() {
        //local range is 4 elements
        let session = SortSession::new(16, 2).unwrap();
        assert_eq!(
            trace(session),
            vec![
                (StepPhase::FlipLocal, 2),
                (StepPhase::FlipLocal, 4),
                (StepPhase::DisperseLocal, 2),
                (StepPhase::FlipGlobal, 8),
                (StepPhase::DisperseLocal, 4),
                (StepPhase::DisperseLocal, 2),
                (StepPhase::FlipGlobal, 16),
                (StepPhase::DisperseGlobal, 8),
                (StepPhase::DisperseLocal, 4),
                (StepPhase::DisperseLocal, 2),
            ]
        );
    }

    #[test]
    fn terminal_is_idempotent() {
        let mut session = SortSession::new(4, 2).unwrap();
        while !session.is_complete() {
            session = session.advance(1);
        }
        assert_eq!(session.next_span(), 0);
        assert_eq!(session.step_index(), 3);
        assert_eq!(session.total_swaps(), 3);
        assert_eq!(session.advance(7), session);
        assert_eq!(session.peek_next_step().workgroups, 0);
        assert_eq!(session.pending_pairs().count(), 0);
        assert_eq!(session.record_swaps(2).total_swaps(), 5);
    }

    #[test]
    fn reset_restarts() {
        let session = SortSession::new(32, 4).unwrap();
        let advanced = session.advance(3).advance(2);
        assert_eq!(advanced.reset(), session);
    }

    #[test]
    fn uniform_words() {
        let step = SortSession::new(1024, 64).unwrap().peek_next_step();
        assert_eq!(step.uniform_words(), [1, 2, 64, 8]);
        assert_eq!(step.local_range(), 128);
        assert_eq!(step.to_string(), "FLIP_LOCAL span=2 workgroups=8");
    }

    #[test]
    fn pending_pairs_are_a_matching() {
        let mut session = SortSession::new(64, 4).unwrap();
        while !session.is_complete() {
            let mut seen = vec![false; 64];
            for (low, high) in session.pending_pairs() {
                assert!(low < high);
                assert!(!seen[low as usize] && !seen[high as usize]);
                seen[low as usize] = true;
                seen[high as usize] = true;
            }
            assert!(seen.iter().all(|s| *s));
            session = session.advance(0);
        }
    }
}
