/*!
 * Async Bridge
 * Converts signal arrivals into ordinary callbacks on the running scheduler
 *
 * The delivery context forbids nearly everything an application callback
 * needs (allocation, locking, scheduler internals). The bridge therefore
 * splits delivery in two: the trampoline's chain entry writes one
 * fixed-width marker byte to a nonblocking self-wakeup pipe and returns; a
 * dispatcher task the scheduler already polls reads the marker and invokes
 * the callback as a normal unit of scheduled work.
 */

use crate::capability;
use crate::core::atomic_stats;
use crate::core::traits::DispositionStore;
use crate::core::types::{Reaction, SigId, SignalError, SignalResult};
use crate::handler::{HandlerChain, HandlerFn};
use crate::registry::SignalRegistry;
use ahash::RandomState;
use dashmap::DashMap;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::fs::File;
use std::io::Read;
use std::os::fd::{FromRawFd, IntoRawFd, OwnedFd};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::io::unix::AsyncFd;
use tokio::runtime::Handle;

/// Ordinary callback dispatched on a scheduler turn
pub type BridgeCallback = Arc<dyn Fn(SigId) + Send + Sync>;

type CallbackTable = DashMap<i32, BridgeCallback, RandomState>;

// Write end of the wakeup pipe; the only thing the delivery context touches.
static WAKEUP_FD: AtomicI32 = AtomicI32::new(-1);
// Process-lifetime duplicate of the read end; see wakeup_channel().
static READER_KEEPALIVE: AtomicI32 = AtomicI32::new(-1);
// Cleared when a dispatcher task is torn down with its runtime.
static DISPATCHER_ALIVE: AtomicBool = AtomicBool::new(false);
// Registered callbacks outlive any single scheduler.
static CALLBACKS: OnceLock<Arc<CallbackTable>> = OnceLock::new();

/// Register `callback` to run on the active scheduler whenever one of `ids`
/// arrives
///
/// Re-registering an id replaces the previous callback rather than chaining
/// it — deliberately asymmetric with
/// [`HandlerChaining::chain`](crate::core::traits::HandlerChaining::chain),
/// mirroring how an event loop owns exactly one handler per signal. Fails
/// with `BridgeUnavailable` when no scheduler is running.
pub fn register<F>(ids: &[SigId], callback: F) -> SignalResult<()>
where
    F: Fn(SigId) + Send + Sync + 'static,
{
    let handle =
        Handle::try_current().map_err(|e| SignalError::BridgeUnavailable(e.to_string()))?;
    let callbacks = ensure_dispatcher(&handle)?;
    let callback: BridgeCallback = Arc::new(callback);
    let registry = SignalRegistry::global();

    for &id in ids {
        capability::ensure_known(id)?;
        if !capability::can_catch(id) {
            return Err(SignalError::Uncatchable(id));
        }
        callbacks.insert(id.number(), Arc::clone(&callback));
        let (chain, _token) = HandlerChain::single(marker_entry(id));
        registry.set_one(id, Reaction::Callback(chain))?;
        info!("Registered async handler for {}", id);
    }
    Ok(())
}

/// Drop the bridge callback for each id and reset the id to `Default`
pub fn unregister(ids: &[SigId]) -> SignalResult<()> {
    let registry = SignalRegistry::global();
    for &id in ids {
        if let Some(callbacks) = CALLBACKS.get() {
            callbacks.remove(&id.number());
        }
        registry.set_one(id, Reaction::Default)?;
        info!("Unregistered async handler for {}", id);
    }
    Ok(())
}

/// Chain entry run in the delivery context: one nonblocking write, nothing
/// else
fn marker_entry(id: SigId) -> HandlerFn {
    let marker = [id.number() as u8];
    Arc::new(move |_| {
        let fd = WAKEUP_FD.load(Ordering::SeqCst);
        if fd >= 0 {
            // A full pipe drops the marker, coalescing a burst the same way
            // pending standard signals coalesce.
            unsafe { libc::write(fd, marker.as_ptr().cast(), 1) };
        }
        Ok(())
    })
}

/// Make sure a dispatcher task is polling the wakeup pipe on `handle`
///
/// A dispatcher dies with the runtime that spawned it; the next
/// registration rebuilds the pipe and spawns a fresh one, so the bridge
/// follows whichever scheduler is current.
fn ensure_dispatcher(handle: &Handle) -> SignalResult<Arc<CallbackTable>> {
    static INIT: Mutex<()> = Mutex::new(());

    let callbacks = Arc::clone(CALLBACKS.get_or_init(|| Arc::new(CallbackTable::default())));
    let _guard = INIT.lock();
    if DISPATCHER_ALIVE.load(Ordering::SeqCst) {
        return Ok(callbacks);
    }

    let (reader, writer) = wakeup_channel()?;
    let old_writer = WAKEUP_FD.swap(writer.into_raw_fd(), Ordering::SeqCst);
    if old_writer >= 0 {
        // A delivery racing this close loses its marker, indistinguishable
        // from a coalesced burst.
        unsafe { libc::close(old_writer) };
    }
    DISPATCHER_ALIVE.store(true, Ordering::SeqCst);
    handle.spawn(dispatch_loop(reader, Arc::clone(&callbacks)));
    info!("Async bridge dispatcher started");
    Ok(callbacks)
}

/// Create the nonblocking self-wakeup pipe
fn wakeup_channel() -> SignalResult<(File, OwnedFd)> {
    let mut fds = [0 as libc::c_int; 2];
    if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
        return Err(SignalError::OperationFailed(format!(
            "pipe failed: {}",
            std::io::Error::last_os_error()
        )));
    }
    for &fd in &fds {
        unsafe {
            libc::fcntl(fd, libc::F_SETFL, libc::O_NONBLOCK);
            libc::fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC);
        }
    }
    // Keep a duplicate of the read end open for the life of the process: a
    // dispatcher torn down with its runtime drops its reader, and the write
    // end must never be left without one (marker writes would raise
    // SIGPIPE).
    let keepalive = unsafe { libc::dup(fds[0]) };
    let old_keepalive = READER_KEEPALIVE.swap(keepalive, Ordering::SeqCst);
    if old_keepalive >= 0 {
        unsafe { libc::close(old_keepalive) };
    }

    let reader = unsafe { File::from_raw_fd(fds[0]) };
    let writer = unsafe { OwnedFd::from_raw_fd(fds[1]) };
    Ok((reader, writer))
}

/// Flipped off when the dispatcher future is dropped with its runtime
struct AliveGuard;

impl Drop for AliveGuard {
    fn drop(&mut self) {
        DISPATCHER_ALIVE.store(false, Ordering::SeqCst);
    }
}

/// Scheduler-side half of the handoff: await markers, dispatch callbacks
async fn dispatch_loop(reader: File, callbacks: Arc<CallbackTable>) {
    let _alive = AliveGuard;
    let afd = match AsyncFd::new(reader) {
        Ok(afd) => afd,
        Err(e) => {
            warn!("Bridge reader unusable: {}", e);
            return;
        }
    };
    let mut buf = [0u8; 16];
    loop {
        let mut guard = match afd.readable().await {
            Ok(guard) => guard,
            Err(e) => {
                warn!("Bridge wakeup wait failed: {}", e);
                return;
            }
        };
        match guard.try_io(|inner| {
            let mut reader = inner.get_ref();
            reader.read(&mut buf)
        }) {
            Ok(Ok(0)) => return,
            Ok(Ok(n)) => {
                for &marker in &buf[..n] {
                    let signo = i32::from(marker);
                    // Clone out of the map so the callback runs without a
                    // shard lock held; it may re-register freely.
                    let Some(callback) = callbacks.get(&signo).map(|cb| Arc::clone(cb.value()))
                    else {
                        continue;
                    };
                    atomic_stats::global().inc_bridge_wakeups();
                    debug!("Dispatching bridged signal {} on a scheduler turn", signo);
                    callback(SigId::from_raw(signo));
                }
            }
            Ok(Err(e)) => {
                warn!("Bridge read failed: {}", e);
                return;
            }
            Err(_would_block) => continue,
        }
    }
}
