//! Error Model
//!
//! A single error currency threaded through every fallible operation in the
//! crate, mirroring the teacher's `InterpreterError`/`ParseException` split:
//! parse-time errors carry their own location inline, evaluator errors are
//! enriched once by the session on first surfacing (see `Session::enrich`).

use std::fmt;

/// A source location, attached to an error the first time it surfaces in a
/// session. Never overwritten on re-throw (§3 invariant 6).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
    pub script: Option<String>,
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(line: usize, column: usize) -> Self {
        Self { script: None, line, column }
    }

    pub fn with_script(mut self, script: impl Into<String>) -> Self {
        self.script = Some(script.into());
        self
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.script {
            Some(s) => write!(f, "{}:{}:{}", s, self.line, self.column),
            None => write!(f, "{}:{}", self.line, self.column),
        }
    }
}

/// Unified error enum for all shell-core errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ShellError {
    #[error("session closed")]
    SessionClosed,

    #[error("{1}:{2}: syntax error: {0}")]
    SyntaxError(String, usize, usize),

    #[error("incomplete input")]
    EofIncomplete,

    #[error("{0}: command not found")]
    CommandNotFound(String),

    #[error("command name evaluated to null")]
    CommandNameNull,

    #[error("missing profile: {0}")]
    MissingProfile(String),

    #[error("host invoke error: {0}")]
    HostInvokeError(String),

    #[error("interrupted")]
    Interrupted,

    /// A user-level error raised by a `Callable` (registered command or
    /// host-provided handler). Carries a message and, once surfaced, a
    /// location.
    #[error("{message}")]
    Failure {
        message: String,
        location: Option<Location>,
    },
}

impl ShellError {
    pub fn failure(message: impl Into<String>) -> Self {
        ShellError::Failure { message: message.into(), location: None }
    }

    pub fn syntax(msg: impl Into<String>, line: usize, column: usize) -> Self {
        ShellError::SyntaxError(msg.into(), line, column)
    }

    /// Current location, if this error kind carries one.
    pub fn location(&self) -> Option<Location> {
        match self {
            ShellError::SyntaxError(_, line, column) => Some(Location::new(*line, *column)),
            ShellError::Failure { location, .. } => location.clone(),
            _ => None,
        }
    }

    /// Annotate with a location unless one is already present (invariant 6:
    /// the first reported location is never overwritten).
    pub fn enrich(self, loc: Location) -> Self {
        match self {
            ShellError::Failure { message, location: None } => {
                ShellError::Failure { message, location: Some(loc) }
            }
            other => other,
        }
    }
}

pub type ShellResult<T> = Result<T, ShellError>;
