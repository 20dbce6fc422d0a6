//! Built-in commands (§1, §10).
//!
//! A handful of demo `Callable`s sufficient to exercise the evaluator and
//! pipeline engine end to end, plus the `install` wiring that registers them
//! on a fresh `Session`. Grounded on the teacher's one-file-per-command
//! layout (`true_cmd.rs`, `hostname_cmd.rs`, ...), adapted to this crate's
//! sync `Callable` contract instead of the teacher's `async_trait::Command`.

mod cat_cmd;
mod echo_cmd;
mod set_cmd;
mod true_false_cmd;
mod type_cmd;
mod unset_cmd;
mod wc_cmd;

use std::sync::Arc;

use crate::session::Session;

/// Register the built-in command set on `session`.
pub fn install(session: &Session) {
    let mut registry = session.commands();
    registry.register("echo", Arc::new(echo_cmd::EchoCommand));
    registry.register("true", Arc::new(true_false_cmd::TrueCommand));
    registry.register("false", Arc::new(true_false_cmd::FalseCommand));
    registry.register("set", Arc::new(set_cmd::SetCommand));
    registry.register("unset", Arc::new(unset_cmd::UnsetCommand));
    registry.register("type", Arc::new(type_cmd::TypeCommand));
    registry.register("cat", Arc::new(cat_cmd::CatCommand));
    registry.register("wc", Arc::new(wc_cmd::WcCommand));
}
