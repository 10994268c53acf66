use tokio::signal;

use carrier_bench_core::prelude::ShutdownHandle;

/// Signal `handle` on the first Ctrl-C.
///
/// The scenario in progress stops waiting for results and the scenarios after it are skipped.
pub(crate) fn start_shutdown_listener(runtime: &tokio::runtime::Runtime, handle: ShutdownHandle) {
    runtime.spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl-C, the run can only be stopped by killing it: {e}");
            return;
        }
        handle.shutdown();
        println!("Received shutdown signal, shutting down...");
    });
}
