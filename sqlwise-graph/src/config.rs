pub const DEFAULT_MAX_STEPS: usize = 50;

#[derive(Clone, Debug)]
pub struct ExecutionConfig {
    /// Upper bound on node invocations per run; `None` disables the check.
    pub max_steps: Option<usize>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_steps: Some(DEFAULT_MAX_STEPS),
        }
    }
}

impl ExecutionConfig {
    pub fn with_max_steps(max_steps: usize) -> Self {
        Self {
            max_steps: Some(max_steps),
        }
    }
}
