use std::time::Duration;

/// How often the build driver retries a failing task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            retry_delay: Duration::from_secs(0),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: usize, retry_delay: Duration) -> Self {
        Self {
            max_retries,
            retry_delay,
        }
    }

    pub fn with_max_retries(mut self, value: usize) -> Self {
        self.max_retries = value;
        self
    }

    pub fn with_retry_delay(mut self, value: Duration) -> Self {
        self.retry_delay = value;
        self
    }

    /// Total attempts, the first one included.
    pub fn max_attempts(&self) -> usize {
        self.max_retries + 1
    }
}
