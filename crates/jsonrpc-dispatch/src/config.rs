use std::time::Duration;

/// Timing for adapters that wait on a dispatched call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterConfig {
    /// How long a blocked caller sleeps before re-checking for a response
    pub poll_interval: Duration,
    /// Overall limit on waiting for a response; `None` waits indefinitely
    pub deadline: Option<Duration>,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            deadline: Some(Duration::from_secs(30)),
        }
    }
}

impl AdapterConfig {
    /// Set the re-check interval
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the overall deadline
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Wait for as long as the handler takes
    pub fn no_deadline(mut self) -> Self {
        self.deadline = None;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_config_defaults() {
        let config = AdapterConfig::default();
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.deadline, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_adapter_config_builder() {
        let config = AdapterConfig::default()
            .poll_interval(Duration::from_millis(5))
            .deadline(Duration::from_secs(2));
        assert_eq!(config.poll_interval, Duration::from_millis(5));
        assert_eq!(config.deadline, Some(Duration::from_secs(2)));

        assert_eq!(config.no_deadline().deadline, None);
    }
}
