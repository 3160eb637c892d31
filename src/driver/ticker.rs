// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::stream::{AbortHandle, Abortable, BoxStream};
use futures::{Stream, StreamExt};
use futures_timer::Delay;

/**
A timer-driven tick stream for [super::SortDriver::auto_run].

Each tick is an async delay that starts when the previous tick is taken, so a slow step never causes a
burst of catch-up steps.

The stream ends once stopped, either through [Ticker::stop] or a [TickerStop] handle.  Stopping wakes a
parked consumer immediately; it does not wait out the current interval.
*/
pub struct Ticker {
    ticks: Abortable<BoxStream<'static, ()>>,
    handle: AbortHandle,
}

/**
Stops a [Ticker] from elsewhere, such as a UI callback.
*/
#[derive(Debug, Clone)]
pub struct TickerStop {
    handle: AbortHandle,
}

impl TickerStop {
    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Ticker {
    pub fn every(interval: Duration) -> Ticker {
        let ticks = futures::stream::unfold((), move |()| async move {
            Delay::new(interval).await;
            Some(((), ()))
        })
        .boxed();
        let (ticks, handle) = futures::stream::abortable(ticks);
        Ticker { ticks, handle }
    }

    pub fn stop(&self) {
        self.handle.abort();
    }

    pub fn stop_handle(&self) -> TickerStop {
        TickerStop {
            handle: self.handle.clone(),
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.handle.is_aborted()
    }
}

impl std::fmt::Debug for Ticker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ticker")
            .field("stopped", &self.is_stopped())
            .finish_non_exhaustive()
    }
}

impl Stream for Ticker {
    type Item = ();

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.ticks.poll_next_unpin(cx)
    }
}
