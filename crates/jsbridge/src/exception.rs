//! Translation of engine-reported exceptions into host errors.
//!
//! The engine hands back an [`EngineFailure`]: the thrown value's message, its
//! error class name when it has one, and the textual backtrace the engine
//! recorded. [`translate`] turns that into a [`ScriptError`] whose frames are
//! parsed out of the backtrace, innermost frame first.
//!
//! Backtrace lines have the form `    at <function> (<source>:<line>[:<column>])`;
//! frames inside native functions read `    at <function> (native)` and carry no
//! line number. Lines that match neither shape are skipped.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::EngineFailure;

/// Language tag carried by every frame produced here.
pub const LANGUAGE: &str = "JavaScript";

/// Function name the engine reports for top-level script code.
pub const TOP_LEVEL_FUNCTION: &str = "<eval>";

/// One level of the script call chain at the point of failure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StackFrame {
    /// Always [`LANGUAGE`].
    pub language: String,
    /// Name of the executing function, [`TOP_LEVEL_FUNCTION`] for top-level code.
    pub function: String,
    /// Source name the function was evaluated under, `"native"` for builtins.
    pub source: String,
    /// 1-based line of the call or failure, `None` for native frames.
    pub line: Option<u32>,
}

impl StackFrame {
    #[must_use]
    pub fn new(function: impl Into<String>, source: impl Into<String>, line: Option<u32>) -> Self {
        Self {
            language: LANGUAGE.to_owned(),
            function: function.into(),
            source: source.into(),
            line,
        }
    }

    /// Returns `true` for the frame of top-level script code.
    #[must_use]
    pub fn is_top_level(&self) -> bool {
        self.function == TOP_LEVEL_FUNCTION
    }

    /// Returns `true` for frames inside engine builtins.
    #[must_use]
    pub fn is_native(&self) -> bool {
        self.line.is_none()
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "at {} ({}:{line})", self.function, self.source),
            None => write!(f, "at {} ({})", self.function, self.source),
        }
    }
}

/// A script exception surfaced to the host.
///
/// Displays as the bare exception message so callers can match on it directly;
/// use [`ScriptError::summary`] for the `Name: message` form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptError {
    name: Option<String>,
    message: String,
    frames: Vec<StackFrame>,
}

impl ScriptError {
    #[must_use]
    pub fn new(name: Option<String>, message: impl Into<String>, frames: Vec<StackFrame>) -> Self {
        Self {
            name,
            message: message.into(),
            frames,
        }
    }

    /// The exception message, e.g. `nope is not defined`.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The error class name, e.g. `ReferenceError`, when the thrown value had one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Script frames at the point of failure, innermost first.
    #[must_use]
    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    /// `Name: message`, or just the message when there is no class name.
    #[must_use]
    pub fn summary(&self) -> String {
        match &self.name {
            Some(name) => format!("{name}: {}", self.message),
            None => self.message.clone(),
        }
    }

    /// Summary followed by one indented line per frame.
    #[must_use]
    pub fn traceback(&self) -> String {
        let mut out = self.summary();
        for frame in &self.frames {
            out.push_str("\n    ");
            out.push_str(&frame.to_string());
        }
        out
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ScriptError {}

/// Converts an engine failure into a [`ScriptError`].
///
/// `source_name` fills in frames whose location names no source. A failure
/// without a backtrace still produces an error, just with no frames.
#[must_use]
pub fn translate(failure: EngineFailure, source_name: &str) -> ScriptError {
    let frames = failure
        .stack
        .as_deref()
        .map(|stack| parse_stack(stack, source_name))
        .unwrap_or_default();
    ScriptError::new(failure.name, failure.message, frames)
}

fn parse_stack(stack: &str, source_name: &str) -> Vec<StackFrame> {
    stack.lines().filter_map(|line| parse_frame(line, source_name)).collect()
}

fn parse_frame(line: &str, source_name: &str) -> Option<StackFrame> {
    let rest = line.trim().strip_prefix("at ")?;

    let (function, location) = match rest.rfind(" (") {
        Some(idx) if rest.ends_with(')') => (&rest[..idx], &rest[idx + 2..rest.len() - 1]),
        _ => ("<anonymous>", rest),
    };
    let function = if function.is_empty() { "<anonymous>" } else { function };

    if location == "native" {
        return Some(StackFrame::new(function, "native", None));
    }

    let (source, line) = split_location(location)?;
    let source = if source.is_empty() { source_name } else { source };
    Some(StackFrame::new(function, source, Some(line)))
}

/// Splits `source:line` or `source:line:column` into the source and the line.
fn split_location(location: &str) -> Option<(&str, u32)> {
    let (head, last) = location.rsplit_once(':')?;
    let last: u32 = last.parse().ok()?;
    match head.rsplit_once(':') {
        Some((source, line)) => match line.parse() {
            Ok(line) => Some((source, line)),
            Err(_) => Some((head, last)),
        },
        None => Some((head, last)),
    }
}
