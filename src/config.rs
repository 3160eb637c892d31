// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Run configuration.

Values come from code or from the environment:

| Variable                   | Field           | Default |
|----------------------------|-----------------|---------|
| `BITONIC_TOTAL_ELEMENTS`   | total_elements  | 16      |
| `BITONIC_SIZE_LIMIT`       | size_limit      | 256     |
| `BITONIC_STEP_INTERVAL_MS` | step_interval   | 50      |
*/

use std::str::FromStr;
use std::time::Duration;

use crate::sequencer::{ConfigurationError, SortSession};

pub const TOTAL_ELEMENTS_VAR: &str = "BITONIC_TOTAL_ELEMENTS";
pub const SIZE_LIMIT_VAR: &str = "BITONIC_SIZE_LIMIT";
pub const STEP_INTERVAL_VAR: &str = "BITONIC_STEP_INTERVAL_MS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortConfig {
    pub total_elements: u32,
    ///Maximum workgroup size.  Sessions clamp it to `total_elements / 2`.
    pub size_limit: u32,
    ///Delay between automatic steps.
    pub step_interval: Duration,
}

impl Default for SortConfig {
    fn default() -> Self {
        SortConfig {
            total_elements: 16,
            size_limit: 256,
            step_interval: Duration::from_millis(50),
        }
    }
}

impl SortConfig {
    /**
    Reads the environment, falling back to [Default] for anything unset.

    Unparsable values are logged and ignored rather than reported; validation of the values themselves happens
    in [Self::session].
    */
    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = SortConfig::default();
        if let Some(v) = parse_var(&lookup, TOTAL_ELEMENTS_VAR) {
            config.total_elements = v;
        }
        if let Some(v) = parse_var(&lookup, SIZE_LIMIT_VAR) {
            config.size_limit = v;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, STEP_INTERVAL_VAR) {
            config.step_interval = Duration::from_millis(ms);
        }
        log::info!(
            "sort config: {} elements, size limit {}, step interval {:?}",
            config.total_elements,
            config.size_limit,
            config.step_interval
        );
        config
    }

    ///Builds a session with the workgroup size clamped to the element count.
    pub fn session(&self) -> Result<SortSession, ConfigurationError> {
        SortSession::clamped(self.total_elements, self.size_limit)
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("ignoring {name}={raw:?}: not a number");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SortConfig::from_lookup(|_| None);
        assert_eq!(config, SortConfig::default());
        let session = config.session().unwrap();
        assert_eq!(session.total_elements(), 16);
        assert_eq!(session.size_limit(), 8);
    }

    #[test]
    fn reads_variables() {
        let config = SortConfig::from_lookup(|name| match name {
            TOTAL_ELEMENTS_VAR => Some("1024".to_string()),
            SIZE_LIMIT_VAR => Some(" 64 ".to_string()),
            STEP_INTERVAL_VAR => Some("5".to_string()),
            _ => None,
        });
        assert_eq!(config.total_elements, 1024);
        assert_eq!(config.size_limit, 64);
        assert_eq!(config.step_interval, Duration::from_millis(5));
        assert_eq!(config.session().unwrap().workgroups_per_step(), 8);
    }

    #[test]
    fn ignores_garbage() {
        let config = SortConfig::from_lookup(|name| match name {
            TOTAL_ELEMENTS_VAR => Some("many".to_string()),
            _ => None,
        });
        assert_eq!(config.total_elements, 16);
    }

    #[test]
    fn invalid_values_fail_at_session() {
        let config = SortConfig {
            total_elements: 100,
            ..SortConfig::default()
        };
        assert!(matches!(
            config.session(),
            Err(ConfigurationError::NotPowerOfTwo { what: "total_elements", .. })
        ));
    }
}
