//! Failure scenarios run by the diagnostic binary.
//!
//! Each recoverable scenario raises a failure and verifies it is handled
//! with its original type. [`Scenario::Uncaught`] deliberately lets a
//! failure escape to the top-level handler.

use clap::ValueEnum;
use quark_core::prelude::*;
use std::process::ExitCode;
use thiserror::Error;
use tracing::{error, info};

/// Selectable scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// Every recoverable scenario, in order.
    All,
    /// Division by zero stored in a quantum value, then collapsed.
    DivideByZero,
    /// Collapsing a value that was reset to null.
    NullCollapse,
    /// Asking a stored failure for the wrong type.
    TypeMismatch,
    /// Copying a failure frame and raising both copies.
    CloneFrame,
    /// A failure no handler catches.
    Uncaught,
}

const RECOVERABLE: [Scenario; 4] = [
    Scenario::DivideByZero,
    Scenario::NullCollapse,
    Scenario::TypeMismatch,
    Scenario::CloneFrame,
];

/// A scenario did not behave as expected.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("{scenario:?}: expected {expected}, got {actual}")]
    Unexpected {
        scenario: Scenario,
        expected: &'static str,
        actual: String,
    },
}

/// Failure payload used by the arithmetic scenarios.
#[derive(Debug, Clone, PartialEq)]
pub struct DivideByZero {
    pub expr: String,
}

impl Diagnosable for DivideByZero {
    fn reason(&self) -> String {
        format!("division by zero in `{}`", self.expr)
    }
}

pub fn checked_div(a: i64, b: i64) -> QuantumValue<i64> {
    if b == 0 {
        quark_core::fail!(DivideByZero {
            expr: format!("{a}/{b}"),
        });
    }
    QuantumValue::from(a / b)
}

/// Run `scenario` and map the outcome to an exit code.
///
/// [`Scenario::Uncaught`] never returns normally.
pub fn run(scenario: Scenario) -> ExitCode {
    let selected: &[Scenario] = match scenario {
        Scenario::All => &RECOVERABLE,
        Scenario::Uncaught => uncaught(),
        ref single => std::slice::from_ref(single),
    };

    for &scenario in selected {
        info!("Running scenario {:?}", scenario);
        if let Err(e) = run_one(scenario) {
            error!("Scenario failed: {}", e);
            return ExitCode::FAILURE;
        }
        info!("Scenario {:?} passed", scenario);
    }

    info!("All {} scenario(s) passed", selected.len());
    ExitCode::SUCCESS
}

fn run_one(scenario: Scenario) -> Result<(), ScenarioError> {
    match scenario {
        Scenario::DivideByZero => divide_by_zero(),
        Scenario::NullCollapse => null_collapse(),
        Scenario::TypeMismatch => type_mismatch(),
        Scenario::CloneFrame => clone_frame(),
        Scenario::All | Scenario::Uncaught => Ok(()),
    }
}

fn unexpected(scenario: Scenario, expected: &'static str, actual: impl std::fmt::Debug) -> ScenarioError {
    ScenarioError::Unexpected {
        scenario,
        expected,
        actual: format!("{actual:?}"),
    }
}

pub fn divide_by_zero() -> Result<(), ScenarioError> {
    let q = checked_div(10, 0);
    if !q.is_error_of::<DivideByZero>() || q.is_error_of::<TypeMismatchError>() {
        return Err(unexpected(Scenario::DivideByZero, "DivideByZero error state", q.state()));
    }

    match catch::<DivideByZero, i64>(|| q.into_value()) {
        Err(caught) if caught.expr == "10/0" => {
            info!("Caught {:?}", caught);
            Ok(())
        }
        other => Err(unexpected(Scenario::DivideByZero, "DivideByZero(10/0)", other)),
    }
}

pub fn null_collapse() -> Result<(), ScenarioError> {
    let mut q = QuantumValue::from("hello");
    if *q != "hello" {
        return Err(unexpected(Scenario::NullCollapse, "\"hello\"", *q));
    }

    q.set_null();
    match catch::<NullValueError, &str>(|| *q) {
        Err(NullValueError) => Ok(()),
        other => Err(unexpected(Scenario::NullCollapse, "NullValueError", other)),
    }
}

pub fn type_mismatch() -> Result<(), ScenarioError> {
    let q = checked_div(1, 0);
    match catch::<TypeMismatchError, ()>(|| {
        q.cast_error::<NullValueError>();
    }) {
        Err(mismatch) => {
            info!("Caught {}", mismatch);
            Ok(())
        }
        other => Err(unexpected(Scenario::TypeMismatch, "TypeMismatchError", other)),
    }
}

pub fn clone_frame() -> Result<(), ScenarioError> {
    let original = FailureFrame::capture(DivideByZero {
        expr: "x/0".to_string(),
    })
    .with_show_trace(false);
    let copy = original.clone();

    let a = catch::<DivideByZero, ()>(|| copy.raise());
    let b = catch::<DivideByZero, ()>(|| original.raise());
    if a.is_ok() || a != b {
        return Err(unexpected(Scenario::CloneFrame, "identical failures", (a, b)));
    }
    Ok(())
}

/// Collapse a failure with no handler in between.
fn uncaught() -> ! {
    let value = checked_div(1, 0).into_value();
    quark_core::crash!(format!("collapse unexpectedly produced {value}"))
}
