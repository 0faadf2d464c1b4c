use crate::task::RetryPolicy;

#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Maximum number of tasks running at the same time
    pub workers: usize,
    /// Used for tasks that don't declare their own policy
    pub retry_policy: RetryPolicy,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            workers: 1,
            retry_policy: RetryPolicy::default(),
        }
    }
}

impl BuildOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values below one are raised to one.
    pub fn with_workers(mut self, value: usize) -> Self {
        self.workers = value.max(1);
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }
}
