// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Drives a [SortSession] against a [StepExecutor].

The driver owns the element array and the session.  Each step is dispatched, awaited, and only then
committed, so a failed or cancelled step leaves everything at the pre-step state.  Every stepping operation
takes `&mut self`, which is what keeps manual and timer-driven stepping from ever having two steps in flight.

```
use bitonic_sequencer::driver::{RunOutcome, SortDriver};
use bitonic_sequencer::executor::software::SoftwareExecutor;
use bitonic_sequencer::sequencer::SortSession;

let session = SortSession::new(16, 4).unwrap();
let elements: Vec<u32> = (0..16).rev().collect();
let mut driver = SortDriver::new(session, elements, SoftwareExecutor::new()).unwrap();
futures::executor::block_on(async {
    let outcome = driver.auto_run(futures::stream::repeat(())).await.unwrap();
    assert_eq!(outcome, RunOutcome::Complete { steps: 10 });
});
assert_eq!(driver.elements(), (0..16).collect::<Vec<u32>>().as_slice());
```
*/

mod ticker;

pub use ticker::{Ticker, TickerStop};

use std::sync::Arc;

use futures::channel::mpsc;
use futures::{Stream, StreamExt};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;

use crate::config::SortConfig;
use crate::executor::{ExecutionError, ReadbackState, StepExecutor, SwapReadback};
use crate::sequencer::{ConfigurationError, SortSession, StepDescriptor};

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DriverError {
    #[error("Invalid configuration {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("Step failed {0}")]
    Execution(#[from] ExecutionError),
}

/**
What observers receive after every change to the driver's state.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub session: SortSession,
    pub elements: Arc<[u32]>,
    ///Swap readbacks dispatched but not yet folded into `session.total_swaps()`.
    pub pending_readbacks: usize,
}

///Returned by [SortDriver::step].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepReport {
    ///The step that ran.
    pub step: StepDescriptor,
    ///Session after the step.
    pub session: SortSession,
    ///Swaps folded in by this step.  May include swaps of earlier steps and exclude this one's.
    pub swaps_observed: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    ///The sort finished.
    Complete { steps: u32 },
    ///The tick stream ended first.
    Stopped { steps: u32 },
}

#[derive(Debug)]
pub struct SortDriver<E> {
    session: SortSession,
    elements: Vec<u32>,
    executor: E,
    max_workgroup_size: u32,
    pending_swaps: Vec<SwapReadback>,
    subscribers: Vec<mpsc::UnboundedSender<SessionSnapshot>>,
    rng: SmallRng,
}

impl<E: StepExecutor> SortDriver<E> {
    /**
    Creates a driver for an existing session and array.

    The array must hold exactly `session.total_elements()` values.
    */
    pub fn new(session: SortSession, elements: Vec<u32>, executor: E) -> Result<Self, ConfigurationError> {
        if elements.len() != session.total_elements() as usize {
            return Err(ConfigurationError::ArrayLength {
                expected: session.total_elements(),
                actual: elements.len(),
            });
        }
        Ok(SortDriver {
            max_workgroup_size: session.size_limit(),
            session,
            elements,
            executor,
            pending_swaps: Vec::new(),
            subscribers: Vec::new(),
            rng: SmallRng::from_entropy(),
        })
    }

    ///Creates a driver over a shuffled permutation of `0..total_elements`.
    pub fn from_config(config: &SortConfig, executor: E) -> Result<Self, ConfigurationError> {
        let session = config.session()?;
        let elements = (0..session.total_elements()).collect();
        let mut driver = Self::new(session, elements, executor)?;
        driver.max_workgroup_size = config.size_limit;
        driver.randomize();
        Ok(driver)
    }

    ///Replaces the random source used by [Self::randomize] and [Self::reconfigure].
    pub fn with_rng(mut self, rng: SmallRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn session(&self) -> &SortSession {
        &self.session
    }

    pub fn elements(&self) -> &[u32] {
        &self.elements
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn executor_mut(&mut self) -> &mut E {
        &mut self.executor
    }

    pub fn is_complete(&self) -> bool {
        self.session.is_complete()
    }

    ///Number of swap readbacks not yet folded into the session.
    pub fn pending_readbacks(&self) -> usize {
        self.pending_swaps.len()
    }

    ///Partner of `index` in the pending step, for highlighting.
    pub fn pending_partner(&self, index: u32) -> Option<u32> {
        self.session.pending_partner(index)
    }

    /**
    Runs exactly one step.

    Returns `Ok(None)` without dispatching when the sort is already complete.  On error the session and
    array are unchanged.
    */
    pub async fn step(&mut self) -> Result<Option<StepReport>, DriverError> {
        //step_index guard keeps a fixed-length loop even if the transition misbehaves
        if self.session.is_complete() || self.session.step_index() >= self.session.total_steps() {
            return Ok(None);
        }
        let descriptor = self.session.peek_next_step();
        log::trace!("step {} dispatching {}", self.session.step_index(), descriptor);
        let outcome = match self.executor.execute_step(&self.elements, descriptor).await {
            Ok(outcome) => outcome,
            Err(err) => {
                log::error!("step {} ({}) failed: {}", self.session.step_index(), descriptor, err);
                return Err(err.into());
            }
        };
        if outcome.elements.len() != self.elements.len() {
            let err = ExecutionError::ElementCount {
                expected: self.elements.len(),
                actual: outcome.elements.len(),
            };
            log::error!("step {} ({}) failed: {}", self.session.step_index(), descriptor, err);
            return Err(err.into());
        }

        self.elements = outcome.elements;
        self.pending_swaps.push(outcome.swaps);
        let swaps_observed = self.drain_readbacks();
        self.session = self.session.advance(swaps_observed);
        if self.session.is_complete() {
            log::info!(
                "sort of {} elements complete after {} steps; {} swaps observed, {} readbacks pending",
                self.session.total_elements(),
                self.session.step_index(),
                self.session.total_swaps(),
                self.pending_swaps.len()
            );
        }
        self.publish();
        Ok(Some(StepReport {
            step: descriptor,
            session: self.session,
            swaps_observed,
        }))
    }

    /**
    Steps once per item of `ticks` until the sort completes or the stream ends.

    Ending the stream (for example with [Ticker::stop]) stops the run between steps; a later call resumes
    where it left off.  Dropping the returned future also stops the run, and any step in flight is discarded.
    */
    pub async fn auto_run<S>(&mut self, ticks: S) -> Result<RunOutcome, DriverError>
    where
        S: Stream + Unpin,
    {
        let mut ticks = ticks;
        let mut steps = 0;
        while !self.session.is_complete() {
            if ticks.next().await.is_none() {
                log::info!(
                    "auto run stopped at step {}/{}",
                    self.session.step_index(),
                    self.session.total_steps()
                );
                return Ok(RunOutcome::Stopped { steps });
            }
            match self.step().await? {
                Some(_) => steps += 1,
                None => {
                    //step() refuses to run past total_steps
                    log::warn!("step budget exhausted before the session completed");
                    return Ok(RunOutcome::Stopped { steps });
                }
            }
        }
        Ok(RunOutcome::Complete { steps })
    }

    /**
    Folds in readbacks that have resolved, without waiting.  Returns how many swaps were folded in.
    */
    pub fn poll_readbacks(&mut self) -> u32 {
        let swaps = self.drain_readbacks();
        if swaps > 0 {
            self.session = self.session.record_swaps(swaps);
            self.publish();
        }
        swaps
    }

    /**
    Flushes the executor and waits for every outstanding readback.

    Returns the final swap total.
    */
    pub async fn settle_swaps(&mut self) -> u64 {
        self.executor.flush_readbacks();
        let pending = std::mem::take(&mut self.pending_swaps);
        let mut swaps = 0u32;
        for readback in pending {
            match readback.await {
                Some(s) => swaps = swaps.saturating_add(s),
                None => log::warn!("swap readback dropped before resolving"),
            }
        }
        log::debug!("settled {} late swaps", swaps);
        self.session = self.session.record_swaps(swaps);
        self.publish();
        self.session.total_swaps()
    }

    ///Shuffles the array and restarts the session.
    pub fn randomize(&mut self) {
        self.elements.shuffle(&mut self.rng);
        self.restart(self.session.reset());
    }

    /**
    Switches to `total_elements` elements, restarting with a shuffled permutation of `0..total_elements`.
    */
    pub fn reconfigure(&mut self, total_elements: u32) -> Result<(), ConfigurationError> {
        let session = SortSession::clamped(total_elements, self.max_workgroup_size)?;
        self.elements = (0..total_elements).collect();
        self.elements.shuffle(&mut self.rng);
        self.restart(session);
        Ok(())
    }

    /**
    Returns a stream of snapshots, starting with the current state.

    Dropping the receiver unsubscribes.
    */
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<SessionSnapshot> {
        let (sender, receiver) = mpsc::unbounded();
        if sender.unbounded_send(self.snapshot()).is_ok() {
            self.subscribers.push(sender);
        }
        receiver
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session: self.session,
            elements: Arc::from(self.elements.as_slice()),
            pending_readbacks: self.pending_swaps.len(),
        }
    }

    pub fn log_elements(&self) {
        log::info!(
            "step {}/{} elements: {:?}",
            self.session.step_index(),
            self.session.total_steps(),
            self.elements
        );
    }

    fn restart(&mut self, session: SortSession) {
        //readbacks of the abandoned run must not leak into the new one
        self.pending_swaps.clear();
        self.session = session;
        log::debug!(
            "session restarted: {} elements, workgroup size {}, {} steps",
            session.total_elements(),
            session.size_limit(),
            session.total_steps()
        );
        self.publish();
    }

    fn drain_readbacks(&mut self) -> u32 {
        let mut observed = 0u32;
        self.pending_swaps.retain_mut(|readback| match readback.try_take() {
            ReadbackState::Ready(swaps) => {
                observed = observed.saturating_add(swaps);
                false
            }
            ReadbackState::Pending => true,
            ReadbackState::Lost => {
                log::warn!("swap readback dropped before resolving");
                false
            }
        });
        observed
    }

    fn publish(&mut self) {
        if self.subscribers.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        self.subscribers
            .retain(|subscriber| subscriber.unbounded_send(snapshot.clone()).is_ok());
    }
}
