//! shellcore - the core of a small embeddable command-shell language.
//!
//! A tokenizer, parser, and tree-walking evaluator that turns source text
//! into pipeline-connected invocations over a tagged `Value` model, plus the
//! resource-graph sorter and profile overlay/interpolation engines used by
//! the surrounding configuration layer.

pub mod ast;
pub mod closure;
pub mod commands;
pub mod dispatch;
pub mod errors;
pub mod expander;
pub mod expr;
pub mod parser;
pub mod pipeline;
pub mod profile;
pub mod resource;
pub mod session;
pub mod value;

pub use closure::{execute, run_program};
pub use errors::{Location, ShellError, ShellResult};
pub use session::Session;
pub use value::{Callable, HostObject, Value};
