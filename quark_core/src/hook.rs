//! Failure hook: side-effecting diagnostics run by every `raise()`.
//!
//! A hook sees each failure by reference just before it propagates. The
//! hook cannot stop propagation; it exists to log, print a trace, or
//! record metrics.
//!
//! # Resolution Order
//!
//! 1. The innermost hook injected on the current thread with [`with_hook`].
//! 2. The process-wide hook set once at startup with [`install`].
//! 3. None: `raise()` proceeds without side effects.
//!
//! A hook that itself raises does not re-enter hook dispatch.
//!
//! Inside [`with_recording`], dispatch also keeps a [`FailureReport`] of the
//! most recent raise on the current thread, so a top-level handler can still
//! name the reason and origin of a payload type it does not know.
//!
//! # Usage
//!
//! ```rust,no_run
//! use quark_core::config::FailureConfig;
//! use quark_core::hook::{self, TracingHook};
//!
//! fn main() {
//!     tracing_subscriber::fmt().init();
//!     hook::install(TracingHook::new(FailureConfig::default())).expect("hook installed once");
//! }
//! ```

use std::any::TypeId;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::OnceLock;

use tracing::{debug, error, warn};

use crate::config::{FailureConfig, ReportFormat};
use crate::error::HookError;
use crate::frame::{FailureFrame, FailureReport};
use crate::trace::{capture_trace, render_trace};

/// Log target used by [`TracingHook`].
pub const FAILURE_LOG_TARGET: &str = "quark::failure";

/// Side-effecting observer of raised failures.
pub trait FailureHook: Send + Sync {
    /// Called once per `raise()`, before the payload propagates.
    fn on_failure(&self, frame: &FailureFrame);
}

impl<F> FailureHook for F
where
    F: Fn(&FailureFrame) + Send + Sync,
{
    fn on_failure(&self, frame: &FailureFrame) {
        self(frame)
    }
}

static GLOBAL_HOOK: OnceLock<Box<dyn FailureHook>> = OnceLock::new();

thread_local! {
    static SCOPED_HOOKS: RefCell<Vec<Rc<dyn FailureHook>>> = const { RefCell::new(Vec::new()) };
    static IN_HOOK: Cell<bool> = const { Cell::new(false) };
    static RECORDING: Cell<usize> = const { Cell::new(0) };
    static LAST_RAISED: RefCell<Option<(TypeId, FailureReport)>> = const { RefCell::new(None) };
}

/// Install the process-wide hook. Intended to be called once at startup.
///
/// # Errors
///
/// Returns [`HookError::AlreadyInstalled`] on every call after the first.
pub fn install<H: FailureHook + 'static>(hook: H) -> Result<(), HookError> {
    GLOBAL_HOOK
        .set(Box::new(hook))
        .map_err(|_| HookError::AlreadyInstalled)?;
    debug!("process-wide failure hook installed");
    Ok(())
}

/// True once a process-wide hook has been installed.
pub fn is_installed() -> bool {
    GLOBAL_HOOK.get().is_some()
}

/// Run `f` with `hook` injected for the current thread.
///
/// The injected hook shadows outer injected hooks and the process-wide
/// hook, and is removed when `f` returns or unwinds.
pub fn with_hook<H, R>(hook: H, f: impl FnOnce() -> R) -> R
where
    H: FailureHook + 'static,
{
    SCOPED_HOOKS.with(|hooks| hooks.borrow_mut().push(Rc::new(hook)));
    let _scope = ScopeGuard;
    f()
}

/// Pops the innermost scoped hook on drop, including during unwinding.
struct ScopeGuard;

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        SCOPED_HOOKS.with(|hooks| {
            hooks.borrow_mut().pop();
        });
    }
}

/// Marks the current thread as running a hook.
struct ReentryGuard;

impl ReentryGuard {
    fn enter() -> Option<Self> {
        if IN_HOOK.with(|flag| flag.replace(true)) {
            None
        } else {
            Some(Self)
        }
    }
}

impl Drop for ReentryGuard {
    fn drop(&mut self) {
        IN_HOOK.with(|flag| flag.set(false));
    }
}

/// Run `f` while keeping a report of the latest failure raised on this
/// thread. Nests; recording stops when the outermost call returns or unwinds.
pub fn with_recording<R>(f: impl FnOnce() -> R) -> R {
    RECORDING.with(|depth| depth.set(depth.get() + 1));
    let _recording = RecordingGuard;
    f()
}

struct RecordingGuard;

impl Drop for RecordingGuard {
    fn drop(&mut self) {
        RECORDING.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Take the report of the latest failure raised under [`with_recording`],
/// together with the type id of its payload.
pub fn take_last_raised() -> Option<(TypeId, FailureReport)> {
    LAST_RAISED.with(|slot| slot.borrow_mut().take())
}

/// Forget the recorded failure, e.g. once a handler has intercepted it.
pub fn clear_last_raised() {
    LAST_RAISED.with(|slot| slot.borrow_mut().take());
}

fn record(frame: &FailureFrame) {
    if RECORDING.with(Cell::get) == 0 {
        return;
    }
    let Some(identity) = frame.type_identity() else {
        return;
    };
    let report = frame.report();
    LAST_RAISED.with(|slot| *slot.borrow_mut() = Some((identity.id(), report)));
}

/// Run the active hook for `frame`. No-op if none is registered.
pub fn invoke(frame: &FailureFrame) {
    // Recorded even from inside a hook: the latest raise is the one that escapes.
    record(frame);

    let Some(_guard) = ReentryGuard::enter() else {
        return;
    };

    // Clone the handle out so the hook may itself call `with_hook`.
    let scoped = SCOPED_HOOKS.with(|hooks| hooks.borrow().last().cloned());
    match scoped {
        Some(hook) => hook.on_failure(frame),
        None => {
            if let Some(hook) = GLOBAL_HOOK.get() {
                hook.on_failure(frame);
            }
        }
    }
}

// ─── Tracing Hook ───────────────────────────────────────────────────

/// Default hook: logs every failure through `tracing`.
///
/// In text mode the reason, type and origin are logged as one event and the
/// stack trace (if enabled both here and on the frame) as a second one. In
/// JSON mode a single serialized [`FailureReport`] is logged.
#[derive(Debug, Clone, Default)]
pub struct TracingHook {
    config: FailureConfig,
}

impl TracingHook {
    /// Create a hook with the given failure configuration.
    pub fn new(config: FailureConfig) -> Self {
        Self { config }
    }

    /// The configuration this hook reports with.
    pub fn config(&self) -> &FailureConfig {
        &self.config
    }

    fn wants_trace(&self, frame: &FailureFrame) -> bool {
        self.config.show_trace && frame.show_trace()
    }
}

impl FailureHook for TracingHook {
    fn on_failure(&self, frame: &FailureFrame) {
        let with_trace = self.wants_trace(frame);

        match self.config.report_format {
            ReportFormat::Json => {
                let report = if with_trace {
                    frame.report_with_trace(self.config.max_trace_depth)
                } else {
                    frame.report()
                };
                match report.to_json() {
                    Ok(json) => error!(target: FAILURE_LOG_TARGET, "{json}"),
                    Err(e) => warn!(target: FAILURE_LOG_TARGET, "failed to serialize failure report: {e}"),
                }
            }
            ReportFormat::Text => {
                error!(
                    target: FAILURE_LOG_TARGET,
                    type_name = frame.type_name(),
                    file = frame.file(),
                    line = frame.line(),
                    "{}",
                    frame.reason()
                );
                if with_trace {
                    let frames = capture_trace(self.config.max_trace_depth);
                    if !frames.is_empty() {
                        error!(target: FAILURE_LOG_TARGET, "stack trace:\n{}", render_trace(&frames));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::catch;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl io::Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    fn counting_hook(counter: &Arc<AtomicUsize>) -> impl FailureHook + 'static {
        let counter = Arc::clone(counter);
        move |_: &FailureFrame| {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_invoke_without_hook_is_noop() {
        let frame = FailureFrame::capture(String::from("nobody listens"));
        invoke(&frame);
    }

    #[test]
    fn test_innermost_scoped_hook_wins() {
        let outer = Arc::new(AtomicUsize::new(0));
        let inner = Arc::new(AtomicUsize::new(0));

        with_hook(counting_hook(&outer), || {
            with_hook(counting_hook(&inner), || {
                invoke(&FailureFrame::capture(String::from("a")));
            });
            invoke(&FailureFrame::capture(String::from("b")));
        });

        assert_eq!(inner.load(Ordering::SeqCst), 1);
        assert_eq!(outer.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_scoped_hook_removed_after_unwind() {
        let calls = Arc::new(AtomicUsize::new(0));
        let caught = catch::<String, ()>(|| {
            with_hook(counting_hook(&calls), || {
                FailureFrame::capture(String::from("boom")).raise()
            })
        });
        assert_eq!(caught, Err(String::from("boom")));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Hook stack is empty again.
        invoke(&FailureFrame::capture(String::from("after")));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    /// Hook that raises a failure of its own.
    struct RaisingHook(Arc<AtomicUsize>);

    impl FailureHook for RaisingHook {
        fn on_failure(&self, _: &FailureFrame) {
            self.0.fetch_add(1, Ordering::SeqCst);
            FailureFrame::capture(String::from("from hook")).raise()
        }
    }

    #[test]
    fn test_raising_hook_does_not_reenter() {
        let calls = Arc::new(AtomicUsize::new(0));

        let caught = with_hook(RaisingHook(Arc::clone(&calls)), || {
            catch::<String, ()>(|| FailureFrame::capture(String::from("original")).raise())
        });

        assert_eq!(caught, Err(String::from("from hook")));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!IN_HOOK.with(Cell::get));
    }

    #[test]
    fn test_recording_keeps_latest_raise() {
        clear_last_raised();
        invoke(&FailureFrame::new(String::from("unrecorded"), "a.qk", 1));
        assert!(take_last_raised().is_none());

        with_recording(|| {
            invoke(&FailureFrame::new(String::from("first"), "a.qk", 1));
            invoke(&FailureFrame::new(String::from("second"), "b.qk", 2));
        });

        let (id, report) = take_last_raised().expect("recorded");
        assert_eq!(id, TypeId::of::<String>());
        assert_eq!(report.reason, "second");
        assert_eq!(report.file, "b.qk");
        assert_eq!(report.line, 2);
        assert!(take_last_raised().is_none());
        assert_eq!(RECORDING.with(Cell::get), 0);
    }

    #[test]
    fn test_recording_sees_failure_raised_by_hook() {
        let calls = Arc::new(AtomicUsize::new(0));
        clear_last_raised();

        let caught = with_recording(|| {
            with_hook(RaisingHook(Arc::clone(&calls)), || {
                std::panic::catch_unwind(|| {
                    FailureFrame::new(String::from("original"), "a.qk", 1).raise();
                })
            })
        });

        assert!(caught.is_err());
        let (_, report) = take_last_raised().expect("recorded");
        assert_eq!(report.reason, "from hook");
    }

    #[test]
    fn test_tracing_hook_text_output() {
        let buf = SharedBuf::default();
        let writer = buf.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let hook = TracingHook::new(FailureConfig {
            show_trace: false,
            ..FailureConfig::default()
        });
        let frame = FailureFrame::new(String::from("disk full"), "io.qk", 12);

        tracing::subscriber::with_default(subscriber, || hook.on_failure(&frame));

        let out = buf.contents();
        assert!(out.contains("disk full"), "missing reason: {out}");
        assert!(out.contains("io.qk"), "missing file: {out}");
        assert!(!out.contains("stack trace"));
    }

    #[test]
    fn test_tracing_hook_json_output() {
        let buf = SharedBuf::default();
        let writer = buf.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let hook = TracingHook::new(FailureConfig {
            report_format: ReportFormat::Json,
            show_trace: false,
            ..FailureConfig::default()
        });
        let frame = FailureFrame::new(String::from("bad input"), "parse.qk", 3);

        tracing::subscriber::with_default(subscriber, || hook.on_failure(&frame));

        let out = buf.contents();
        assert!(out.contains("bad input"), "missing reason: {out}");
        assert!(out.contains("parse.qk"), "missing file: {out}");
    }

    #[test]
    fn test_tracing_hook_respects_frame_flag() {
        let hook = TracingHook::default();
        let frame = FailureFrame::capture(String::from("quiet")).with_show_trace(false);
        assert!(!hook.wants_trace(&frame));

        let frame = FailureFrame::capture(String::from("loud"));
        assert_eq!(hook.wants_trace(&frame), hook.config().show_trace);
    }
}
