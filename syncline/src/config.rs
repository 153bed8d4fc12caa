/// Configuration for a [`Reactor`](crate::Reactor).
#[derive(Debug, Clone)]
pub struct Config {
    /// Initial capacity of the ready queue.
    pub queue_capacity: usize,
    /// Maximum time in microseconds that an idle loop blocks waiting for a
    /// remote wakeup before re-checking timers and stall state.
    /// 0 = block until woken.
    /// Default: 1000 (1ms).
    pub tick_timeout_us: u64,
    /// Number of ready tasks executed before the loop drains the remote
    /// channel and promotes due timers again.
    /// Default: 256.
    pub max_tasks_per_tick: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            tick_timeout_us: 1000,
            max_tasks_per_tick: 256,
        }
    }
}

impl Config {
    /// Validate configuration values. Returns an error if any value is out of range.
    pub fn validate(&self) -> Result<(), crate::error::Error> {
        if self.queue_capacity == 0 {
            return Err(crate::error::Error::InvalidConfig(
                "queue_capacity must be > 0".into(),
            ));
        }
        if self.max_tasks_per_tick == 0 {
            return Err(crate::error::Error::InvalidConfig(
                "max_tasks_per_tick must be > 0".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`Config`] with discoverable methods and `build()` validation.
///
/// # Example
///
/// ```rust
/// use syncline::ConfigBuilder;
///
/// let config = ConfigBuilder::default()
///     .queue_capacity(128)
///     .tick_timeout_us(500)
///     .max_tasks_per_tick(64)
///     .build()
///     .expect("invalid config");
/// assert_eq!(config.max_tasks_per_tick, 64);
/// ```
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with default config values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the initial capacity of the ready queue.
    pub fn queue_capacity(mut self, n: usize) -> Self {
        self.config.queue_capacity = n;
        self
    }

    /// Set the idle block timeout in microseconds. 0 = block until woken.
    pub fn tick_timeout_us(mut self, us: u64) -> Self {
        self.config.tick_timeout_us = us;
        self
    }

    /// Set how many ready tasks run between remote/timer drains.
    pub fn max_tasks_per_tick(mut self, n: usize) -> Self {
        self.config.max_tasks_per_tick = n;
        self
    }

    /// Validate and build the final [`Config`].
    pub fn build(self) -> Result<Config, crate::error::Error> {
        self.config.validate()?;
        Ok(self.config)
    }
}
