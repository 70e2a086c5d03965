//! Behavioural properties of quantum values and failure frames, exercised
//! through the public API only.

use std::fmt::Debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use quark_core::hook::with_hook;
use quark_core::prelude::*;

#[derive(Debug, Clone, PartialEq)]
struct DivideByZero {
    expr: String,
}

impl Diagnosable for DivideByZero {
    fn reason(&self) -> String {
        self.expr.clone()
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Timeout {
    millis: u64,
}

impl Diagnosable for Timeout {
    const REASON: Option<&'static str> = Some("operation timed out");

    fn reason(&self) -> String {
        format!("timed out after {}ms", self.millis)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Unrelated;

impl Diagnosable for Unrelated {}

fn assert_null_state<T>() {
    for q in [QuantumValue::<T>::new(), QuantumValue::<T>::null()] {
        assert!(q.is_null());
        assert!(!q.is_value());
        assert!(!q.is_error());
    }
}

fn assert_failure_round_trip<E>(payload: E)
where
    E: Diagnosable + Clone + Send + PartialEq + Debug + 'static,
{
    let q: QuantumValue<u32> = QuantumValue::failure(payload.clone());
    assert!(q.is_error());
    assert!(q.is_error_of::<E>());

    // An unrelated handler does not intercept, the matching one does.
    let caught = catch::<E, Result<u32, Unrelated>>(|| catch::<Unrelated, u32>(|| q.into_value()));
    assert_eq!(caught, Err(payload));
}

#[test]
fn test_null_state_for_any_type() {
    assert_null_state::<i32>();
    assert_null_state::<String>();
    assert_null_state::<Vec<u8>>();
    assert_null_state::<QuantumValue<i32>>();
}

#[test]
fn test_value_collapses_to_itself() {
    assert_eq!(QuantumValue::from(7u8).into_value(), 7);
    assert_eq!(QuantumValue::from(String::from("s")).into_value(), "s");
    assert_eq!(QuantumValue::from(vec![1, 2, 3]).into_value(), vec![1, 2, 3]);
}

#[test]
fn test_failure_reproduces_exact_type() {
    assert_failure_round_trip(DivideByZero {
        expr: "x/0".into(),
    });
    assert_failure_round_trip(Timeout { millis: 250 });
    assert_failure_round_trip(String::from("text failure"));
    assert_failure_round_trip("static text failure");
    assert_failure_round_trip(NullValueError);
    assert_failure_round_trip(TypeMismatchError::new("a", "b"));
}

#[test]
fn test_type_level_reason_wins() {
    let q: QuantumValue<()> = QuantumValue::failure(Timeout { millis: 5 });
    assert_eq!(q.error().map(FailureFrame::reason), Some("operation timed out"));
}

#[test]
fn test_divide_by_zero_scenario() {
    let q: QuantumValue<i32> = QuantumValue::failure(DivideByZero {
        expr: "x/0".into(),
    });

    assert!(q.is_error());
    assert!(q.is_error_of::<DivideByZero>());
    assert!(!q.is_error_of::<TypeMismatchError>());

    let reasons = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = Arc::clone(&reasons);
    let caught = with_hook(
        move |frame: &FailureFrame| sink.lock().unwrap().push(frame.reason().to_string()),
        || catch::<DivideByZero, i32>(|| *q),
    );

    assert_eq!(caught.unwrap_err().expr, "x/0");
    assert_eq!(*reasons.lock().unwrap(), vec!["x/0".to_string()]);
}

#[test]
fn test_hello_then_null_scenario() {
    let mut q = QuantumValue::from("hello");
    assert_eq!(*q, "hello");

    q = QuantumValue::null();
    assert_eq!(catch::<NullValueError, &str>(|| q.into_value()), Err(NullValueError));
}

#[test]
fn test_take_never_double_raises() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    with_hook(
        move |_: &FailureFrame| {
            counter.fetch_add(1, Ordering::SeqCst);
        },
        || {
            let mut source: QuantumValue<i32> = QuantumValue::failure(Unrelated);
            let moved = source.take();
            assert!(source == Null);
            drop(source);

            assert_eq!(catch::<Unrelated, i32>(|| moved.into_value()), Err(Unrelated));
        },
    );

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_context_clone_crashes_identically() {
    let original = FailureContext::new(Timeout { millis: 9 });
    let copy = original.try_clone().expect("live payload");
    assert_eq!(copy.type_name(), original.type_name());

    let a = catch::<Timeout, ()>(|| copy.crash());
    let b = catch::<Timeout, ()>(|| original.crash());
    assert_eq!(a, b);
    assert_eq!(a, Err(Timeout { millis: 9 }));
}

#[test]
fn test_capsule_destroy_twice_is_safe() {
    let mut capsule = TypeCapsule::make(String::from("payload"));
    capsule.destroy();
    capsule.destroy();
    assert!(capsule.is_destroyed());
    assert!(capsule.raw().is_none());
    assert!(capsule.type_identity().is::<String>());
}

#[test]
fn test_error_value_moves_across_threads() {
    let q: QuantumValue<u16> = QuantumValue::failure(DivideByZero {
        expr: "y/0".into(),
    });

    let handle = std::thread::spawn(move || catch::<DivideByZero, u16>(|| q.into_value()));
    let caught = handle.join().expect("worker thread");
    assert_eq!(caught.unwrap_err().expr, "y/0");
}

#[test]
fn test_fail_macro_in_chain() {
    fn parse(input: &str) -> QuantumValue<u32> {
        if input.is_empty() {
            return QuantumValue::null();
        }
        match input.parse::<u32>() {
            Ok(n) => QuantumValue::from(n),
            Err(_) => quark_core::fail!(format!("not a number: {input}")),
        }
    }

    let doubled = parse("21").and_then(|n| QuantumValue::from(n * 2));
    assert_eq!(doubled.ok(), Some(42));
    assert!(parse("").map(|n| n + 1) == Null);

    let bad = parse("x");
    assert_eq!(bad.try_cast_error::<String>().map(String::as_str), Ok("not a number: x"));
}
