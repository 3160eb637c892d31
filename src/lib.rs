/*! bitonic_sequencer drives a bitonic sort as a sequence of GPU-style dispatches.

A bitonic sorting network for `N = 2^n` elements is `n(n+1)/2` compare-exchange passes.  On a GPU each
pass is one dispatch, and passes that fit inside a workgroup can use a cheaper "local" kernel than passes
that cross workgroups.  This crate is the CPU side of that design:

| Piece                                   | Role                                                          | GPU needed |
|-----------------------------------------|---------------------------------------------------------------|------------|
| [sequencer::SortSession]                | Which pass runs next: phase, span, workgroup count            | No         |
| [sequencer::predict_partner]            | Which index a given index is compared against                 | No         |
| [executor::StepExecutor]                | Runs one pass over the array, reports swaps asynchronously    | Backend    |
| [executor::software::SoftwareExecutor]  | CPU implementation of the dispatch model                      | No         |
| [driver::SortDriver]                    | One-step-at-a-time orchestration, manual or timer driven      | No         |

# Phases

| Phase           | Pairing inside each block of `span` | Fits one workgroup |
|-----------------|-------------------------------------|--------------------|
| FLIP_LOCAL      | `i` with its mirror                 | yes                |
| DISPERSE_LOCAL  | lower half with upper half          | yes                |
| FLIP_GLOBAL     | `i` with its mirror                 | no                 |
| DISPERSE_GLOBAL | lower half with upper half          | no                 |
| NONE            | nothing pending                     |                    |

# Synchronization

Steps are strictly ordered; the driver awaits each dispatch before committing it.  Swap counts are the one
relaxed value: like a mapped GPU counter, they may arrive some steps late and are folded in as they resolve.

```
use bitonic_sequencer::driver::SortDriver;
use bitonic_sequencer::executor::software::SoftwareExecutor;
use bitonic_sequencer::sequencer::SortSession;

let session = SortSession::new(8, 2).unwrap();
let mut driver = SortDriver::new(session, vec![5, 7, 1, 0, 6, 2, 4, 3], SoftwareExecutor::new()).unwrap();
futures::executor::block_on(async {
    while driver.step().await.unwrap().is_some() {}
});
assert_eq!(driver.elements(), &[0, 1, 2, 3, 4, 5, 6, 7]);
```
*/

pub mod sequencer;
pub mod executor;
pub mod driver;
pub mod config;
mod bittricks;

pub use config::SortConfig;
pub use driver::SortDriver;
pub use sequencer::{SortSession, StepDescriptor, StepPhase};
