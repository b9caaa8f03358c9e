//! Wait monitor configuration
//!
//! Defines the polling cadence and the overall wait bound used when
//! waiting on pipeline jobs.

use anyhow::bail;
use mlpipe_core::timeouts::DEFAULT_MAX_WAIT;
use std::time::Duration;

/// Default delay before the first re-poll
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Default cap for exponential backoff between polls
const DEFAULT_MAX_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Shortest pause between two polls, whatever the policy says
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Delay policy between two status polls
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackoffPolicy {
    /// Fixed delay between polls.
    Fixed(Duration),
    /// Exponential backoff: base * 2^attempt, capped at max.
    Exponential { base: Duration, max: Duration },
}

impl BackoffPolicy {
    /// Compute the delay after the given poll (0-indexed).
    ///
    /// Never shorter than [`MIN_POLL_INTERVAL`].
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = match self {
            BackoffPolicy::Fixed(d) => *d,
            BackoffPolicy::Exponential { base, max } => base
                .saturating_mul(2u32.saturating_pow(attempt))
                .min(*max),
        };
        delay.max(MIN_POLL_INTERVAL)
    }

    fn shortest(&self) -> Duration {
        match self {
            BackoffPolicy::Fixed(d) => *d,
            BackoffPolicy::Exponential { base, .. } => *base,
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffPolicy::Exponential {
            base: DEFAULT_POLL_INTERVAL,
            max: DEFAULT_MAX_POLL_INTERVAL,
        }
    }
}

/// Wait monitor configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitConfig {
    /// Delay between consecutive status polls
    pub backoff: BackoffPolicy,

    /// Give up waiting after this long; the remote job keeps running
    pub max_wait: Duration,
}

impl WaitConfig {
    /// Creates a configuration polling at a fixed interval
    pub fn fixed(poll_interval: Duration, max_wait: Duration) -> Self {
        Self {
            backoff: BackoffPolicy::Fixed(poll_interval),
            max_wait,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables (all optional, in seconds):
    /// - MLPIPE_POLL_INTERVAL (default: 10)
    /// - MLPIPE_MAX_POLL_INTERVAL (default: 60; equal to the poll interval
    ///   means fixed polling)
    /// - MLPIPE_MAX_WAIT (default: 7200)
    pub fn from_env() -> anyhow::Result<Self> {
        let poll_interval = env_seconds("MLPIPE_POLL_INTERVAL")?.unwrap_or(DEFAULT_POLL_INTERVAL);
        let max_poll_interval = env_seconds("MLPIPE_MAX_POLL_INTERVAL")?
            .unwrap_or_else(|| DEFAULT_MAX_POLL_INTERVAL.max(poll_interval));
        let max_wait = env_seconds("MLPIPE_MAX_WAIT")?.unwrap_or(DEFAULT_MAX_WAIT);

        let backoff = if max_poll_interval == poll_interval {
            BackoffPolicy::Fixed(poll_interval)
        } else {
            BackoffPolicy::Exponential {
                base: poll_interval,
                max: max_poll_interval,
            }
        };

        let config = Self { backoff, max_wait };
        config.validate()?;
        Ok(config)
    }

    /// Overrides the overall wait bound
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.backoff.shortest() < MIN_POLL_INTERVAL {
            bail!(
                "poll interval must be at least {}ms",
                MIN_POLL_INTERVAL.as_millis()
            );
        }

        if let BackoffPolicy::Exponential { base, max } = &self.backoff {
            if max < base {
                bail!("max poll interval must not be shorter than the poll interval");
            }
        }

        if self.max_wait.is_zero() {
            bail!("max_wait must be greater than 0");
        }

        Ok(())
    }
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            backoff: BackoffPolicy::default(),
            max_wait: DEFAULT_MAX_WAIT,
        }
    }
}

fn env_seconds(name: &str) -> anyhow::Result<Option<Duration>> {
    match std::env::var(name) {
        Ok(value) => {
            let seconds = value
                .trim()
                .parse::<u64>()
                .map_err(|_| anyhow::anyhow!("{} must be a whole number of seconds, got '{}'", name, value))?;
            Ok(Some(Duration::from_secs(seconds)))
        }
        Err(_) => Ok(None),
    }
}
