// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
A CPU implementation of the compare-exchange dispatch.

This follows the dispatch model a compute shader sees:

* A local step is run per workgroup.  Each workgroup owns `2 * workgroup_size` consecutive elements and may
  only compare elements inside that range, so a local step whose span is wider than that is rejected.
* A global step sees the whole array.

Every flip or disperse pairs indices inside blocks of `span` elements, so blocks are independent.  With the
`parallel` feature blocks are processed on the rayon pool.

Swap counts are reported through [SwapReadback]s.  By default they resolve immediately;
[SoftwareExecutor::with_readback_lag] holds each one back for a number of later dispatches, the way a mapped
GPU counter arrives late.
*/

use std::collections::VecDeque;
use std::future::Future;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::{ExecutionError, StepExecutor, StepOutcome, SwapReadback, SwapSender};
use crate::sequencer::{StepDescriptor, StepPhase};

#[derive(Debug, Default)]
pub struct SoftwareExecutor {
    readback_lag: usize,
    in_flight: VecDeque<(SwapSender, u32)>,
    dispatches: u64,
}

impl SoftwareExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    ///Each swap count resolves only after `lag` further dispatches (or a flush).
    pub fn with_readback_lag(lag: usize) -> Self {
        SoftwareExecutor {
            readback_lag: lag,
            ..Self::default()
        }
    }

    ///Number of steps dispatched so far, including no-op ones.
    pub fn dispatches(&self) -> u64 {
        self.dispatches
    }

    fn run(&mut self, elements: &[u32], step: StepDescriptor) -> Result<StepOutcome, ExecutionError> {
        validate(elements.len(), step)?;
        let mut output = elements.to_vec();
        let swaps = match step.phase {
            StepPhase::None => 0,
            StepPhase::FlipLocal | StepPhase::DisperseLocal => {
                dispatch_local(&mut output, step.local_range() as usize, step.span as usize, step.phase.is_flip())
            }
            StepPhase::FlipGlobal | StepPhase::DisperseGlobal => {
                dispatch_blocks(&mut output, step.span as usize, step.phase.is_flip())
            }
        };
        self.dispatches += 1;
        log::trace!("software dispatch {}: {} swapped {}", self.dispatches, step, swaps);

        let (sender, readback) = SwapReadback::channel();
        self.in_flight.push_back((sender, swaps));
        while self.in_flight.len() > self.readback_lag {
            if let Some((sender, swaps)) = self.in_flight.pop_front() {
                sender.send(swaps);
            }
        }
        Ok(StepOutcome {
            elements: output,
            swaps: readback,
        })
    }
}

impl StepExecutor for SoftwareExecutor {
    fn execute_step(
        &mut self,
        elements: &[u32],
        step: StepDescriptor,
    ) -> impl Future<Output = Result<StepOutcome, ExecutionError>> {
        futures::future::ready(self.run(elements, step))
    }

    fn flush_readbacks(&mut self) {
        for (sender, swaps) in self.in_flight.drain(..) {
            sender.send(swaps);
        }
    }
}

fn validate(len: usize, step: StepDescriptor) -> Result<(), ExecutionError> {
    if step.phase == StepPhase::None {
        return Ok(());
    }
    let span = step.span as usize;
    if span < 2 || !span.is_power_of_two() || len % span != 0 {
        return Err(ExecutionError::InvalidSpan {
            span: step.span,
            elements: len,
        });
    }
    if step.phase.is_local() && step.span > step.local_range() {
        return Err(ExecutionError::SpanExceedsWorkgroup {
            phase: step.phase,
            span: step.span,
            local_range: step.local_range(),
        });
    }
    Ok(())
}

///Runs one workgroup per `local_range` elements; each only touches its own range.
fn dispatch_local(elements: &mut [u32], local_range: usize, span: usize, flip: bool) -> u32 {
    #[cfg(feature = "parallel")]
    {
        elements
            .par_chunks_mut(local_range)
            .map(|workgroup| workgroup.chunks_mut(span).map(|block| compare_block(block, flip)).sum::<u32>())
            .sum()
    }
    #[cfg(not(feature = "parallel"))]
    {
        elements
            .chunks_mut(local_range)
            .map(|workgroup| workgroup.chunks_mut(span).map(|block| compare_block(block, flip)).sum::<u32>())
            .sum()
    }
}

fn dispatch_blocks(elements: &mut [u32], span: usize, flip: bool) -> u32 {
    #[cfg(feature = "parallel")]
    {
        elements.par_chunks_mut(span).map(|block| compare_block(block, flip)).sum()
    }
    #[cfg(not(feature = "parallel"))]
    {
        elements.chunks_mut(span).map(|block| compare_block(block, flip)).sum()
    }
}

/**
Compare-exchanges one block, ascending.

Flip pairs `offset` with `len - 1 - offset`; disperse pairs `offset` with `offset + len / 2`.
*/
fn compare_block(block: &mut [u32], flip: bool) -> u32 {
    let half = block.len() / 2;
    let mut swaps = 0;
    for offset in 0..half {
        let partner = if flip { block.len() - 1 - offset } else { offset + half };
        if block[offset] > block[partner] {
            block.swap(offset, partner);
            swaps += 1;
        }
    }
    swaps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ReadbackState;
    use crate::sequencer::{SortSession, predict_partner};

    fn step(phase: StepPhase, span: u32, workgroup_size: u32) -> StepDescriptor {
        StepDescriptor {
            phase,
            span,
            workgroups: 1,
            workgroup_size,
        }
    }

    #[test]
    fn flip_block() {
        let mut block = [3, 2, 1, 0];
        assert_eq!(compare_block(&mut block, true), 2);
        assert_eq!(block, [0, 1, 2, 3]);
    }

    #[test]
    fn disperse_block() {
        let mut block = [2, 3, 0, 1];
        assert_eq!(compare_block(&mut block, false), 2);
        assert_eq!(block, [0, 1, 2, 3]);
    }

    #[test]
    fn pairing_matches_prediction() {
        //strictly descending input: every compared pair swaps, so each slot receives its partner's value
        for phase in [StepPhase::FlipGlobal, StepPhase::DisperseGlobal, StepPhase::FlipLocal] {
            let input: Vec<u32> = (0..16).rev().collect();
            let mut executor = SoftwareExecutor::new();
            let outcome = futures::executor::block_on(executor.execute_step(&input, step(phase, 8, 4))).unwrap();
            for i in 0..16u32 {
                let partner = predict_partner(i, phase, 8, 16).unwrap();
                assert_eq!(outcome.elements[i as usize], input[partner as usize], "{phase} index {i}");
            }
        }
    }

    #[test]
    fn rejects_wide_local_step() {
        let mut executor = SoftwareExecutor::new();
        let input = vec![0; 16];
        let result = futures::executor::block_on(executor.execute_step(&input, step(StepPhase::FlipLocal, 8, 2)));
        assert_eq!(
            result.unwrap_err(),
            ExecutionError::SpanExceedsWorkgroup {
                phase: StepPhase::FlipLocal,
                span: 8,
                local_range: 4
            }
        );
        let result = futures::executor::block_on(executor.execute_step(&input, step(StepPhase::DisperseGlobal, 6, 2)));
        assert!(matches!(result, Err(ExecutionError::InvalidSpan { span: 6, .. })));
        assert_eq!(executor.dispatches(), 0);
    }

    #[test]
    fn none_is_a_copy() {
        let mut executor = SoftwareExecutor::new();
        let input = vec![4, 3, 2, 1];
        let mut outcome =
            futures::executor::block_on(executor.execute_step(&input, step(StepPhase::None, 0, 2))).unwrap();
        assert_eq!(outcome.elements, input);
        assert_eq!(outcome.swaps.try_take(), ReadbackState::Ready(0));
    }

    #[test]
    fn lagged_readback() {
        let mut executor = SoftwareExecutor::with_readback_lag(2);
        let session = SortSession::new(8, 2).unwrap();
        let input = vec![7, 6, 5, 4, 3, 2, 1, 0];
        let mut first = futures::executor::block_on(executor.execute_step(&input, session.peek_next_step())).unwrap();
        assert_eq!(first.swaps.try_take(), ReadbackState::Pending);
        let session = session.advance(0);
        let mut second =
            futures::executor::block_on(executor.execute_step(&first.elements, session.peek_next_step())).unwrap();
        assert_eq!(first.swaps.try_take(), ReadbackState::Pending);
        let session = session.advance(0);
        let _third =
            futures::executor::block_on(executor.execute_step(&second.elements, session.peek_next_step())).unwrap();
        assert_eq!(first.swaps.try_take(), ReadbackState::Ready(4));
        assert_eq!(second.swaps.try_take(), ReadbackState::Pending);
        executor.flush_readbacks();
        assert!(matches!(second.swaps.try_take(), ReadbackState::Ready(_)));
    }
}
