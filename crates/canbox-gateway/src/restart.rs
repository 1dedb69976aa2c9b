//! Whole-process restart

use std::time::Duration;

use canbox_core::supervisor::{RestartReason, Restarter};

/// Grace period before restarting, lets the log line reach its sink
const GRACE: Duration = Duration::from_millis(100);

/// Exit status used when re-executing is not possible (EX_TEMPFAIL)
pub const RESTART_EXIT_CODE: i32 = 75;

/// Restarts the running binary with its original arguments
///
/// On Unix the process image is replaced in place. Elsewhere, or if exec
/// fails, the process exits with [`RESTART_EXIT_CODE`] for the service
/// manager to restart it.
#[derive(Debug, Default)]
pub struct ProcessRestarter;

impl Restarter for ProcessRestarter {
    fn restart(&mut self, reason: &RestartReason) {
        tracing::error!("Restarting gateway: {}", reason);
        std::thread::sleep(GRACE);

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;

            match std::env::current_exe() {
                Ok(exe) => {
                    let err = std::process::Command::new(exe)
                        .args(std::env::args_os().skip(1))
                        .exec();
                    tracing::error!("Re-exec failed: {}", err);
                }
                Err(e) => tracing::error!("Cannot locate own executable: {}", e),
            }
        }

        std::process::exit(RESTART_EXIT_CODE);
    }
}
