//! Handler boundaries: where raised failures stop unwinding.
//!
//! [`catch`] is the typed handler. It intercepts failures of exactly one
//! dynamic type and lets everything else continue unwinding untouched.
//! [`top_level`] is the last line of a process: it logs whatever escaped,
//! with the reason and origin of the last raised frame when the payload
//! came from one, and turns it into a failure exit code.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::process::ExitCode;

use tracing::error;

use crate::consts::UNCAUGHT_FAILURE_EXIT_CODE;
use crate::error::{CapsuleError, HookError, NullValueError, TypeMismatchError};
use crate::frame::FailureReport;
use crate::hook::{self, FAILURE_LOG_TARGET};

/// Run `f`, intercepting a raised failure of dynamic type `E`.
///
/// Returns `Ok` with the result of `f` if nothing was raised, or `Err` with
/// the original payload if a failure of type `E` was. Failures of any other
/// type continue unwinding.
///
/// ```rust
/// use quark_core::boundary::catch;
/// use quark_core::crash;
///
/// let caught = catch::<String, u32>(|| crash!(String::from("boom")));
/// assert_eq!(caught, Err(String::from("boom")));
///
/// assert_eq!(catch::<String, u32>(|| 7), Ok(7));
/// ```
pub fn catch<E: Any, R>(f: impl FnOnce() -> R) -> Result<R, E> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Ok(value),
        Err(payload) => match payload.downcast::<E>() {
            Ok(failure) => {
                hook::clear_last_raised();
                Err(*failure)
            }
            Err(other) => panic::resume_unwind(other),
        },
    }
}

/// Describe an unwinding payload if its type is known to the core.
///
/// Recognizes the core error types as well as `String` and `&'static str`
/// (the payloads of ordinary panics).
pub fn describe_uncaught(payload: &(dyn Any + Send)) -> Option<String> {
    if let Some(err) = payload.downcast_ref::<NullValueError>() {
        return Some(err.to_string());
    }
    if let Some(err) = payload.downcast_ref::<TypeMismatchError>() {
        return Some(err.to_string());
    }
    if let Some(err) = payload.downcast_ref::<CapsuleError>() {
        return Some(err.to_string());
    }
    if let Some(err) = payload.downcast_ref::<HookError>() {
        return Some(err.to_string());
    }
    if let Some(text) = payload.downcast_ref::<String>() {
        return Some(text.clone());
    }
    payload
        .downcast_ref::<&'static str>()
        .map(|text| (*text).to_string())
}

/// Run `f` as the top of a process, converting any uncaught failure into
/// [`UNCAUGHT_FAILURE_EXIT_CODE`].
///
/// If the escaping payload is the one last raised through a
/// [`FailureFrame`](crate::frame::FailureFrame), its reason and `file:line`
/// are logged whether or not a hook is installed. Other payloads are
/// described by [`describe_uncaught`].
pub fn top_level(f: impl FnOnce() -> ExitCode) -> ExitCode {
    hook::clear_last_raised();
    let outcome = hook::with_recording(|| panic::catch_unwind(AssertUnwindSafe(f)));
    let last = hook::take_last_raised();

    match outcome {
        Ok(code) => code,
        Err(payload) => {
            match last.filter(|(id, _)| *id == (*payload).type_id()) {
                Some((_, report)) => log_uncaught_report(&report),
                None => match describe_uncaught(&*payload) {
                    Some(reason) => error!(target: FAILURE_LOG_TARGET, "uncaught failure: {reason}"),
                    None => error!(target: FAILURE_LOG_TARGET, "uncaught failure of unrecognized type"),
                },
            }
            ExitCode::from(UNCAUGHT_FAILURE_EXIT_CODE)
        }
    }
}

fn log_uncaught_report(report: &FailureReport) {
    error!(
        target: FAILURE_LOG_TARGET,
        type_name = report.type_name,
        "uncaught failure: {} (at {}:{})",
        report.reason,
        report.file,
        report.line
    );
}
