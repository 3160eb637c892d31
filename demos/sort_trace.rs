// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Sorts a shuffled array one timed step at a time and logs every step.

```sh
RUST_LOG=debug BITONIC_TOTAL_ELEMENTS=32 BITONIC_SIZE_LIMIT=4 cargo run --example sort_trace
```
*/

use bitonic_sequencer::driver::{RunOutcome, SortDriver, Ticker};
use bitonic_sequencer::executor::software::SoftwareExecutor;
use bitonic_sequencer::SortConfig;
use futures::StreamExt;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = SortConfig::from_env_or_default();
    log::info!("{:?}", config);

    let mut driver = match SortDriver::from_config(&config, SoftwareExecutor::new()) {
        Ok(driver) => driver,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };
    let snapshots = driver.subscribe();
    let ticker = Ticker::every(config.step_interval);

    driver.log_elements();
    let result = futures::executor::block_on(async {
        let outcome = driver.auto_run(ticker).await?;
        driver.settle_swaps().await;
        Ok::<_, bitonic_sequencer::driver::DriverError>(outcome)
    });
    match result {
        Ok(RunOutcome::Complete { steps }) => log::info!("sorted in {} steps", steps),
        Ok(RunOutcome::Stopped { steps }) => log::warn!("stopped after {} steps", steps),
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    }
    driver.log_elements();

    drop(driver);
    let states = futures::executor::block_on(snapshots.collect::<Vec<_>>());
    for snapshot in states.iter().filter(|s| s.session.step_index() > 0) {
        log::debug!(
            "after step {}: {} swaps so far, next {} span {}",
            snapshot.session.step_index(),
            snapshot.session.total_swaps(),
            snapshot.session.next_phase(),
            snapshot.session.next_span()
        );
    }
}
