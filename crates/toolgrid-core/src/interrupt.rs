//! Process-wide Ctrl+C / termination signal state.
//!
//! Signal handlers only flip atomics; the dashboard decides what an interrupt
//! means (cancel the running item, or leave the loop) by waiting on
//! [`wait_for_signal`] alongside its other work.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);
static TERMINATE: AtomicBool = AtomicBool::new(false);
static INTERRUPT_NOTIFY: OnceLock<Notify> = OnceLock::new();
static RESTORE_HOOK: OnceLock<Box<dyn Fn() + Send + Sync>> = OnceLock::new();

/// SIGTERM/SIGHUP are only visible through an atomic, so waiters re-check
/// at this cadence.
const TERMINATE_CHECK_INTERVAL: Duration = Duration::from_millis(200);

/// Which signal woke a waiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Ctrl+C: cancel the current operation.
    Interrupt,
    /// SIGTERM / SIGHUP: leave now.
    Terminate,
}

/// Returned up to `main` when a signal ended the dashboard; maps to exit
/// status 130.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterruptedError(pub Signal);

impl std::fmt::Display for InterruptedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Signal::Interrupt => write!(f, "Interrupted by Ctrl+C"),
            Signal::Terminate => write!(f, "Terminated by signal"),
        }
    }
}

impl std::error::Error for InterruptedError {}

/// Installs the Ctrl+C handler and raises the terminate flag on SIGTERM and
/// SIGHUP.
///
/// # Panics
/// Panics if a handler cannot be registered.
pub fn init() {
    ctrlc::set_handler(trigger_ctrl_c).expect("Error setting Ctrl+C handler");

    #[cfg(unix)]
    {
        use signal_hook::consts::{SIGHUP, SIGTERM};

        for signal in [SIGTERM, SIGHUP] {
            // SAFETY: the handler only stores to an AtomicBool, which is
            // async-signal-safe.
            unsafe {
                signal_hook::low_level::register(signal, || TERMINATE.store(true, Ordering::SeqCst))
                    .expect("Error registering termination handler");
            }
        }
    }
}

fn notifier() -> &'static Notify {
    INTERRUPT_NOTIFY.get_or_init(Notify::new)
}

/// Records a Ctrl+C. A second one before the first is consumed restores the
/// terminal and exits with status 130.
pub fn trigger_ctrl_c() {
    if INTERRUPTED.swap(true, Ordering::SeqCst) {
        // process::exit() bypasses Drop, so restore explicitly.
        if let Some(hook) = RESTORE_HOOK.get() {
            hook();
        }
        std::process::exit(130);
    }
    notifier().notify_waiters();
}

pub fn is_interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Checks if a terminate signal (SIGTERM/SIGHUP) was received.
pub fn should_terminate() -> bool {
    TERMINATE.load(Ordering::SeqCst)
}

/// Clears a pending Ctrl+C once it has been acted on.
pub fn reset() {
    INTERRUPTED.store(false, Ordering::SeqCst);
}

/// Waits until Ctrl+C or a terminate signal arrives.
///
/// The interrupt flag is left set; callers [`reset`] it after handling.
pub async fn wait_for_signal() -> Signal {
    loop {
        if should_terminate() {
            return Signal::Terminate;
        }
        if is_interrupted() {
            return Signal::Interrupt;
        }
        let notified = notifier().notified();
        // Re-check after registering so a notify between the load and the
        // await is not lost.
        if is_interrupted() {
            return Signal::Interrupt;
        }
        let _ = tokio::time::timeout(TERMINATE_CHECK_INTERVAL, notified).await;
    }
}

/// Registers a restore hook called on the second Ctrl+C before exit.
pub fn set_restore_hook<F>(hook: F)
where
    F: Fn() + Send + Sync + 'static,
{
    let _ = RESTORE_HOOK.set(Box::new(hook));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupted_error_names_the_signal() {
        assert_eq!(
            InterruptedError(Signal::Interrupt).to_string(),
            "Interrupted by Ctrl+C"
        );
        assert_eq!(
            InterruptedError(Signal::Terminate).to_string(),
            "Terminated by signal"
        );
    }

    // Only test touching the flags: they are process-wide.
    #[tokio::test]
    async fn test_wait_wakes_on_ctrl_c_and_reset_clears() {
        reset();
        let waiter = tokio::spawn(wait_for_signal());
        tokio::time::sleep(Duration::from_millis(20)).await;
        INTERRUPTED.store(true, Ordering::SeqCst);
        notifier().notify_waiters();

        let signal = tokio::time::timeout(Duration::from_secs(2), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
        assert_eq!(signal, Signal::Interrupt);
        assert!(is_interrupted());

        reset();
        assert!(!is_interrupted());
    }
}
