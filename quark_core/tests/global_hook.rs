//! Process-wide hook installation.
//!
//! Kept in its own test binary: the global hook can be installed only once
//! per process.

use std::sync::atomic::{AtomicUsize, Ordering};

use quark_core::hook::{self, TracingHook};
use quark_core::prelude::*;

static GLOBAL_CALLS: AtomicUsize = AtomicUsize::new(0);

fn collapse_null() -> Result<u8, NullValueError> {
    catch::<NullValueError, u8>(|| QuantumValue::<u8>::null().into_value())
}

#[test]
fn test_global_hook_lifecycle() {
    assert!(!hook::is_installed());

    // No hook yet: raising still works.
    assert_eq!(collapse_null(), Err(NullValueError));

    hook::install(|_: &FailureFrame| {
        GLOBAL_CALLS.fetch_add(1, Ordering::SeqCst);
    })
    .expect("first install");
    assert!(hook::is_installed());
    assert_eq!(
        hook::install(TracingHook::default()),
        Err(HookError::AlreadyInstalled)
    );

    assert_eq!(collapse_null(), Err(NullValueError));
    assert_eq!(GLOBAL_CALLS.load(Ordering::SeqCst), 1);

    // A scoped hook shadows the global one on this thread only.
    hook::with_hook(|_: &FailureFrame| {}, || {
        assert_eq!(collapse_null(), Err(NullValueError));
    });
    assert_eq!(GLOBAL_CALLS.load(Ordering::SeqCst), 1);

    let worker = std::thread::spawn(collapse_null);
    assert_eq!(worker.join().expect("worker thread"), Err(NullValueError));
    assert_eq!(GLOBAL_CALLS.load(Ordering::SeqCst), 2);
}
