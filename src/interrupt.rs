//! Cooperative interruption.
//!
//! A raised [`Interrupt`] is observed by the job queues while they block, and
//! surfaces to the caller as [`Error::Interrupted`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{Error, Result};

/// Exit status used when a second Ctrl-C arrives before the first was handled.
pub const SIGINT_EXIT_CODE: i32 = 130;

#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    raised: Arc<AtomicBool>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.raised.store(false, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_raised() {
            return Err(Error::Interrupted);
        }
        Ok(())
    }

    /// Raise this interrupt on SIGINT. A second SIGINT while it is still
    /// raised terminates the process with [`SIGINT_EXIT_CODE`].
    #[cfg(unix)]
    pub fn install_sigint_handler(&self) -> std::io::Result<()> {
        use signal_hook::consts::signal::SIGINT;

        // Registration order matters: the shutdown check must run before the
        // flag is set by the same signal.
        signal_hook::flag::register_conditional_shutdown(
            SIGINT,
            SIGINT_EXIT_CODE,
            Arc::clone(&self.raised),
        )?;
        signal_hook::flag::register(SIGINT, Arc::clone(&self.raised))?;
        tracing::debug!("[interrupt] SIGINT handler installed");
        Ok(())
    }

    #[cfg(not(unix))]
    pub fn install_sigint_handler(&self) -> std::io::Result<()> {
        Ok(())
    }
}
