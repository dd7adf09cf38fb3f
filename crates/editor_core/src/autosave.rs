use std::{future::Future, time::Duration};

use tokio::{runtime::Handle, task::JoinHandle};
use tracing::{debug, warn};

/// Debounced auto-save timer. At most one timer is pending; every arm
/// cancels the previous one and bumps the generation so a timer that already
/// fired can tell it has been superseded.
#[derive(Debug)]
pub struct AutoSaveScheduler {
    enabled: bool,
    delay: Duration,
    generation: u64,
    pending: Option<JoinHandle<()>>,
    /// Runtime current at construction; timers are spawned onto it so
    /// arming works from threads that are not inside a runtime.
    runtime: Option<Handle>,
}

impl AutoSaveScheduler {
    pub fn new(enabled: bool, delay: Duration) -> Self {
        Self {
            enabled,
            delay,
            generation: 0,
            pending: None,
            runtime: Handle::try_current().ok(),
        }
    }

    /// Cancels any pending timer, then starts a new one when auto-save is
    /// enabled and the document is both dirty and identified. `fire` receives
    /// the generation of the new timer and runs once the delay elapses.
    /// Without a runtime to spawn on, nothing is armed and the document simply
    /// stays dirty until an explicit save.
    pub fn arm<F, Fut>(&mut self, dirty: bool, identified: bool, fire: F) -> bool
    where
        F: FnOnce(u64) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        if !self.enabled || !dirty || !identified {
            return false;
        }

        let Some(runtime) = self.runtime.clone().or_else(|| Handle::try_current().ok()) else {
            warn!("autosave: no tokio runtime available, timer not armed");
            return false;
        };

        self.generation += 1;
        let generation = self.generation;
        let delay = self.delay;
        let task = fire(generation);
        debug!(generation, delay_ms = delay.as_millis() as u64, "autosave: armed");
        self.pending = Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        }));
        true
    }

    /// Called by a timer when it wakes up. Returns `false` if the timer was
    /// superseded. Detaches the pending handle so that a later arm does not
    /// abort the save that is now in flight.
    pub fn claim(&mut self, generation: u64) -> bool {
        if generation != self.generation || self.pending.is_none() {
            return false;
        }
        self.pending = None;
        true
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
            debug!(generation = self.generation, "autosave: cancelled pending timer");
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.cancel();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Drop for AutoSaveScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
