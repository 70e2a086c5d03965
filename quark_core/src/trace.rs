//! Stack trace capture and symbol demangling for failure diagnostics.
//!
//! These are presentation helpers used by failure hooks. Nothing in the
//! propagation path depends on them.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt::Write as _;

use serde::Serialize;

use crate::consts::MAX_TRACE_DEPTH;

/// One resolved stack frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceFrame {
    /// Demangled symbol name.
    pub symbol: String,
    /// Source file, if debug info was available.
    pub file: Option<String>,
    /// Source line, if debug info was available.
    pub line: Option<u32>,
}

/// Capture the current call stack, innermost frame first.
///
/// Frames belonging to the capture machinery itself are skipped. At most
/// `max_depth` frames are returned (clamped to [`MAX_TRACE_DEPTH`]); a
/// depth of 0 means the maximum. Returns an empty vector when the platform
/// cannot capture backtraces.
pub fn capture_trace(max_depth: usize) -> Vec<TraceFrame> {
    let limit = match max_depth {
        0 => MAX_TRACE_DEPTH,
        n => n.min(MAX_TRACE_DEPTH),
    };

    let backtrace = Backtrace::force_capture();
    if backtrace.status() != BacktraceStatus::Captured {
        return Vec::new();
    }

    parse_backtrace(&backtrace.to_string())
        .into_iter()
        .skip_while(|frame| is_capture_frame(&frame.symbol))
        .take(limit)
        .collect()
}

fn is_capture_frame(symbol: &str) -> bool {
    symbol.starts_with("std::backtrace")
        || symbol.starts_with("quark_core::trace::")
}

/// Parse the textual form of a `std::backtrace::Backtrace`.
///
/// The format is a numbered symbol line optionally followed by an
/// `at file:line:col` line:
///
/// ```text
///    0: app::main
///              at ./src/main.rs:10:5
/// ```
pub fn parse_backtrace(text: &str) -> Vec<TraceFrame> {
    let mut frames: Vec<TraceFrame> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim_start();

        if let Some(location) = trimmed.strip_prefix("at ") {
            if let Some(last) = frames.last_mut() {
                let (file, line_no) = split_location(location);
                last.file = Some(file.to_string());
                last.line = line_no;
            }
            continue;
        }

        let Some((index, symbol)) = trimmed.split_once(": ") else {
            continue;
        };
        if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }

        frames.push(TraceFrame {
            symbol: demangle(symbol.trim()),
            file: None,
            line: None,
        });
    }

    frames
}

/// Split `file:line:col` into the file and the line number.
fn split_location(location: &str) -> (&str, Option<u32>) {
    let mut parts = location.rsplitn(3, ':');
    let col = parts.next();
    let line = parts.next();
    let file = parts.next();

    match (file, line, col) {
        (Some(file), Some(line), Some(_)) => (file, line.parse().ok()),
        _ => (location, None),
    }
}

/// Demangle a Rust symbol for display.
///
/// Handles legacy `_ZN…E` mangled names (including the `$LT$`-style
/// escapes) and strips the trailing `::h<hash>` disambiguator from already
/// readable names. Anything else is returned unchanged.
pub fn demangle(symbol: &str) -> String {
    let readable = demangle_legacy(symbol).unwrap_or_else(|| symbol.to_string());
    strip_hash(&readable).to_string()
}

fn strip_hash(symbol: &str) -> &str {
    if let Some((head, tail)) = symbol.rsplit_once("::h") {
        if tail.len() == 16 && tail.bytes().all(|b| b.is_ascii_hexdigit()) {
            return head;
        }
    }
    symbol
}

fn demangle_legacy(symbol: &str) -> Option<String> {
    let body = symbol
        .strip_prefix("_ZN")
        .or_else(|| symbol.strip_prefix("__ZN"))?;
    let mut rest = body;
    let mut segments: Vec<String> = Vec::new();

    loop {
        if let Some(tail) = rest.strip_prefix('E') {
            if !tail.is_empty() && !tail.starts_with('.') {
                return None;
            }
            break;
        }
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            return None;
        }
        let len: usize = rest[..digits].parse().ok()?;
        let end = digits.checked_add(len)?;
        let ident = rest.get(digits..end)?;
        segments.push(unescape_segment(ident));
        rest = &rest[end..];
    }

    if segments.is_empty() {
        return None;
    }
    Some(segments.join("::"))
}

fn unescape_segment(segment: &str) -> String {
    // Segments starting with `$` carry an extra leading `_`.
    let segment = if segment.starts_with("_$") {
        &segment[1..]
    } else {
        segment
    };
    let mut out = String::with_capacity(segment.len());
    let mut rest = segment;

    while !rest.is_empty() {
        if let Some(tail) = rest.strip_prefix("..") {
            out.push_str("::");
            rest = tail;
            continue;
        }
        if rest.starts_with('$') {
            if let Some(end) = rest[1..].find('$') {
                let code = &rest[1..=end];
                if let Some(decoded) = decode_escape(code) {
                    out.push_str(decoded);
                    rest = &rest[end + 2..];
                    continue;
                }
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }

    out
}

fn decode_escape(code: &str) -> Option<&'static str> {
    Some(match code {
        "SP" => "@",
        "BP" => "*",
        "RF" => "&",
        "LT" => "<",
        "GT" => ">",
        "LP" => "(",
        "RP" => ")",
        "C" => ",",
        "u20" => " ",
        "u27" => "'",
        "u5b" => "[",
        "u5d" => "]",
        "u7b" => "{",
        "u7d" => "}",
        "u7e" => "~",
        _ => return None,
    })
}

/// Render frames one per line: `symbol (file:line)`.
pub fn render_trace(frames: &[TraceFrame]) -> String {
    let mut out = String::new();
    for frame in frames {
        let _ = match (&frame.file, frame.line) {
            (Some(file), Some(line)) => writeln!(out, "  {} ({}:{})", frame.symbol, file, line),
            (Some(file), None) => writeln!(out, "  {} ({})", frame.symbol, file),
            _ => writeln!(out, "  {}", frame.symbol),
        };
    }
    out
}
