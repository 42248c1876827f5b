/*!
 * Timeout Engine
 * Deadline scopes backed by the singular process alarm
 */

use crate::capability;
use crate::core::types::{Reaction, SigId, SignalError, SignalResult};
use crate::handler::HandlerChain;
use crate::platform;
use crate::scope::OverrideGuard;
use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// The OS alarm resource is singular, so at most one deadline scope may be
// armed per process. A second `enter` is rejected, never coalesced.
static DEADLINE_ARMED: AtomicBool = AtomicBool::new(false);
static DEADLINE_EXPIRED: AtomicBool = AtomicBool::new(false);

/// An armed deadline scope
///
/// Arms the process alarm on entry and guarantees that the alarm is disarmed
/// and the previous deadline-signal disposition restored on every exit path,
/// whether through [`finish`](DeadlineGuard::finish) or drop.
pub struct DeadlineGuard {
    restore: Option<OverrideGuard>,
    message: String,
    disarmed: bool,
}

impl DeadlineGuard {
    /// Arm a deadline `seconds` from now
    ///
    /// The expiry error's message defaults to the deadline signal's
    /// canonical name.
    pub fn enter(seconds: u32) -> SignalResult<Self> {
        let message = deadline_signal()?.name().to_string();
        Self::enter_with_message(seconds, message)
    }

    /// Arm a deadline with a caller-chosen expiry message
    pub fn enter_with_message(seconds: u32, message: impl Into<String>) -> SignalResult<Self> {
        let alarm_id = deadline_signal()?;
        if DEADLINE_ARMED
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SignalError::DeadlineAlreadyArmed);
        }
        DEADLINE_EXPIRED.store(false, Ordering::SeqCst);

        // The expiry entry does the minimum delivery-context-legal work: one
        // atomic store observed by expired()/finish().
        let (chain, _token) = HandlerChain::single(Arc::new(|_| {
            DEADLINE_EXPIRED.store(true, Ordering::SeqCst);
            Ok(())
        }));
        let restore = match OverrideGuard::enter(&[alarm_id], Reaction::Callback(chain)) {
            Ok(guard) => guard,
            Err(e) => {
                DEADLINE_ARMED.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };
        if seconds == 0 {
            // A zero budget is an already-spent deadline, not an OS alarm.
            DEADLINE_EXPIRED.store(true, Ordering::SeqCst);
        } else {
            platform::alarm_after(seconds);
        }
        debug!("Armed {}s deadline", seconds);

        Ok(Self {
            restore: Some(restore),
            message: message.into(),
            disarmed: false,
        })
    }

    /// Check whether the deadline has fired
    pub fn expired(&self) -> bool {
        DEADLINE_EXPIRED.load(Ordering::SeqCst)
    }

    /// Cooperative checkpoint for CPU-bound work inside the scope
    pub fn check(&self) -> SignalResult<()> {
        if self.expired() {
            Err(SignalError::TimeoutExceeded(self.message.clone()))
        } else {
            Ok(())
        }
    }

    /// Disarm and close the scope
    ///
    /// Returns `TimeoutExceeded` if the deadline fired at any point inside
    /// the scope, including in the same instant the guarded work completed.
    pub fn finish(mut self) -> SignalResult<()> {
        let message = std::mem::take(&mut self.message);
        self.disarm();
        if DEADLINE_EXPIRED.swap(false, Ordering::SeqCst) {
            Err(SignalError::TimeoutExceeded(message))
        } else {
            Ok(())
        }
    }

    fn disarm(&mut self) {
        if self.disarmed {
            return;
        }
        self.disarmed = true;
        // Cancel the alarm before restoring the old disposition so a late
        // expiry cannot land on the restored reaction.
        platform::alarm_cancel();
        if let Some(guard) = self.restore.take() {
            guard.exit();
        }
        DEADLINE_ARMED.store(false, Ordering::SeqCst);
        debug!("Deadline disarmed");
    }
}

impl Drop for DeadlineGuard {
    fn drop(&mut self) {
        self.disarm();
        // Abandoned scope (drop without finish): leave nothing behind for
        // the next deadline to misread.
        DEADLINE_EXPIRED.store(false, Ordering::SeqCst);
    }
}

fn deadline_signal() -> SignalResult<SigId> {
    capability::resolve("SIGALRM")
}

/// Run `body` under a deadline of `seconds`
///
/// Yields `TimeoutExceeded` when the deadline fires before `body` is done;
/// the alarm is disarmed before control returns in either case. Blocking
/// syscalls inside `body` are interrupted by the expiry; CPU-bound loops
/// should poll [`DeadlineGuard::check`] via the guard form instead.
pub fn with_timeout<T, F>(seconds: u32, body: F) -> SignalResult<T>
where
    F: FnOnce() -> T,
{
    let guard = DeadlineGuard::enter(seconds)?;
    let value = body();
    guard.finish()?;
    Ok(value)
}

/// [`with_timeout`] with a caller-chosen expiry message
pub fn with_timeout_message<T, F>(seconds: u32, message: impl Into<String>, body: F) -> SignalResult<T>
where
    F: FnOnce() -> T,
{
    let guard = DeadlineGuard::enter_with_message(seconds, message)?;
    let value = body();
    guard.finish()?;
    Ok(value)
}
