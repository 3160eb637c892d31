// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*! The compare-exchange side of the sort.

An executor receives the element array and one [StepDescriptor], performs every compare-exchange of that
step, and returns the new array together with a [SwapReadback].  On a GPU the swap counter lives in a buffer
that is mapped asynchronously, so the readback may resolve several steps after the array itself.

The crate ships [software::SoftwareExecutor], a CPU implementation of the dispatch model.
*/

pub mod software;

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::oneshot;

use crate::sequencer::{StepDescriptor, StepPhase};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ExecutionError {
    #[error("executor returned {actual} elements, expected {expected}")]
    ElementCount { expected: usize, actual: usize },
    #[error("span {span} does not divide {elements} elements")]
    InvalidSpan { span: u32, elements: usize },
    #[error("{phase} step with span {span} does not fit a workgroup addressing {local_range} elements")]
    SpanExceedsWorkgroup {
        phase: StepPhase,
        span: u32,
        local_range: u32,
    },
    #[error("dispatch failed: {0}")]
    Dispatch(String),
}

/**
The result of one step.
*/
#[derive(Debug)]
pub struct StepOutcome {
    ///The array after every compare-exchange of the step.
    pub elements: Vec<u32>,
    ///Swaps performed by the step, possibly not known yet.
    pub swaps: SwapReadback,
}

/**
Runs compare-exchange steps.

Implementations must not partially apply a step: either the returned future resolves to the complete new
array, or to an error and the caller keeps its old array.
*/
pub trait StepExecutor {
    fn execute_step(
        &mut self,
        elements: &[u32],
        step: StepDescriptor,
    ) -> impl Future<Output = Result<StepOutcome, ExecutionError>>;

    /**
    Asks the executor to resolve every outstanding [SwapReadback].

    GPU executors typically poll their device here.  The default does nothing.
    */
    fn flush_readbacks(&mut self) {}
}

/**
Sending half of a [SwapReadback].
*/
#[derive(Debug)]
pub struct SwapSender(oneshot::Sender<u32>);

impl SwapSender {
    pub fn send(self, swaps: u32) {
        //receiver may have been dropped with its driver; nothing to do then
        let _ = self.0.send(swaps);
    }
}

///What a non-blocking look at a [SwapReadback] found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadbackState {
    Ready(u32),
    Pending,
    ///The sender was dropped without sending.
    Lost,
}

/**
A swap count that may arrive later.

Awaiting resolves to `None` if the sender was dropped.
*/
#[derive(Debug)]
pub struct SwapReadback {
    receiver: oneshot::Receiver<u32>,
}

impl SwapReadback {
    pub fn channel() -> (SwapSender, SwapReadback) {
        let (s, r) = oneshot::channel();
        (SwapSender(s), SwapReadback { receiver: r })
    }

    ///A readback that is already resolved.
    pub fn ready(swaps: u32) -> SwapReadback {
        let (s, r) = Self::channel();
        s.send(swaps);
        r
    }

    ///Checks for the value without blocking.
    pub fn try_take(&mut self) -> ReadbackState {
        match self.receiver.try_recv() {
            Ok(Some(swaps)) => ReadbackState::Ready(swaps),
            Ok(None) => ReadbackState::Pending,
            Err(oneshot::Canceled) => ReadbackState::Lost,
        }
    }
}

impl Future for SwapReadback {
    type Output = Option<u32>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver).poll(cx).map(Result::ok)
    }
}
