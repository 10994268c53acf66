use indicatif::ProgressBar;

use carrier_bench_core::prelude::{DelegatedShutdownListener, ShutdownHandle};

use crate::progress::start_progress;

/// Per-scenario hooks the engines consult while collecting results: progress output and the
/// run-wide shutdown signal.
pub struct RunControl {
    progress: ProgressBar,
    shutdown_listener: DelegatedShutdownListener,
}

impl RunControl {
    pub fn new(
        scenario_name: &str,
        expected: u64,
        show_progress: bool,
        shutdown_listener: DelegatedShutdownListener,
    ) -> Self {
        Self {
            progress: start_progress(scenario_name, expected, show_progress),
            shutdown_listener,
        }
    }

    /// No progress output and a shutdown signal nobody else can send.
    ///
    /// Useful when driving engines directly, for example from tests.
    pub fn unattended() -> Self {
        Self {
            progress: ProgressBar::hidden(),
            shutdown_listener: ShutdownHandle::new().new_listener(),
        }
    }

    pub fn record_completed(&self, count: u64) {
        self.progress.inc(count);
    }

    /// Whether the run has been asked to stop.
    pub fn interrupted(&self) -> bool {
        self.shutdown_listener.should_shutdown()
    }

    pub fn shutdown_listener(&self) -> DelegatedShutdownListener {
        self.shutdown_listener.clone()
    }

    pub fn finish(&self) {
        self.progress.finish_and_clear();
    }
}

impl Drop for RunControl {
    fn drop(&mut self) {
        if !self.progress.is_finished() {
            self.progress.finish_and_clear();
        }
    }
}
