//! Run configuration.
//!
//! Limits default to off. Hosts set them through
//! [`InterpreterBuilder`](crate::InterpreterBuilder), or pick them up from
//! the environment with [`RunConfig::from_env`]:
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `KITE_MAX_STEPS` | Step budget; the run is interrupted once exceeded |
//! | `KITE_STEPS_PER_SECOND` | Throttle evaluation to this many steps per second |
//! | `KITE_DEBUG_PANICS` | When set, host panics propagate instead of becoming errors |

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunConfig {
    /// Maximum evaluation steps. `None` is unlimited.
    pub max_steps: Option<u64>,
    /// Evaluation rate limit. `None` is unthrottled.
    pub steps_per_second: Option<u64>,
    /// Convert host panics into `Panic` errors.
    pub recover_panics: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            max_steps: None,
            steps_per_second: None,
            recover_panics: true,
        }
    }
}

impl RunConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        RunConfig {
            max_steps: parse_limit(&lookup, "KITE_MAX_STEPS"),
            steps_per_second: parse_limit(&lookup, "KITE_STEPS_PER_SECOND"),
            recover_panics: lookup("KITE_DEBUG_PANICS").is_none(),
        }
    }
}

fn parse_limit(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u64> {
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(0) => None,
        Ok(n) => Some(n),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring non-numeric limit");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RunConfig;

    fn lookup(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v).to_string())
        }
    }

    #[test]
    fn empty_environment_is_default() {
        assert_eq!(RunConfig::from_lookup(lookup(&[])), RunConfig::default());
    }

    #[test]
    fn reads_limits() {
        let config = RunConfig::from_lookup(lookup(&[
            ("KITE_MAX_STEPS", "1000"),
            ("KITE_STEPS_PER_SECOND", " 50 "),
            ("KITE_DEBUG_PANICS", "1"),
        ]));
        assert_eq!(config.max_steps, Some(1000));
        assert_eq!(config.steps_per_second, Some(50));
        assert!(!config.recover_panics);
    }

    #[test]
    fn zero_and_garbage_mean_unlimited() {
        let config = RunConfig::from_lookup(lookup(&[
            ("KITE_MAX_STEPS", "0"),
            ("KITE_STEPS_PER_SECOND", "fast"),
        ]));
        assert_eq!(config.max_steps, None);
        assert_eq!(config.steps_per_second, None);
    }
}
