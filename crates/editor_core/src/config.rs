use std::time::Duration;

pub const DEFAULT_AUTOSAVE_DELAY: Duration = Duration::from_millis(30_000);
pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorConfig {
    pub autosave_enabled: bool,
    pub autosave_delay: Duration,
    pub history_capacity: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            autosave_enabled: true,
            autosave_delay: DEFAULT_AUTOSAVE_DELAY,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

impl EditorConfig {
    pub fn with_autosave(mut self, enabled: bool) -> Self {
        self.autosave_enabled = enabled;
        self
    }

    pub fn with_autosave_delay(mut self, delay: Duration) -> Self {
        self.autosave_delay = delay;
        self
    }

    /// A capacity of zero would make every record evict itself, so it is
    /// clamped to one.
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity.max(1);
        self
    }
}
