// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*! The step sequencer for multi-dispatch bitonic sort.

A bitonic network for `N` elements is executed as a sequence of dispatches.  Each dispatch is either a
*flip* (mirror pairing inside blocks of `span` elements) or a *disperse* (lower/upper half pairing inside
blocks of `span` elements).  Dispatches whose span fits inside one workgroup are *local*; wider ones are *global*.

The sequencer only describes dispatches.  It never reads or writes the element array; see
[crate::executor] for the other side of that boundary.
*/

mod phase;
mod session;
mod partner;

pub use phase::StepPhase;
pub use session::{ConfigurationError, SortSession, StepDescriptor};
pub use partner::predict_partner;
