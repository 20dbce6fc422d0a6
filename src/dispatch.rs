//! Dispatch
//!
//! Resolves a token to a callable: scoped-command lookup with a `default`
//! fallback (§4.3). Grounded on the teacher's `commands/registry.rs`
//! (`CommandRegistry` as a name -> boxed-trait-object table) generalised to
//! the spec's multi-rung resolution ladder, and on `command_resolution.rs`'s
//! pattern of a session-held lookup table consulted by the evaluator.

use std::sync::Arc;

use crate::errors::{ShellError, ShellResult};
use crate::session::Session;
use crate::value::{Callable, Value};

/// Host-side name -> `Callable` table, the final rung of the resolution
/// ladder (§3 "Session", §4.3).
#[derive(Default)]
pub struct CommandRegistry {
    entries: indexmap::IndexMap<String, Arc<dyn Callable>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, callable: Arc<dyn Callable>) {
        self.entries.insert(name.into(), callable);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Callable>> {
        self.entries.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

/// Resolve `name` to a `Callable` per the ladder (§4.3):
/// 1. `session.get(name)` (a variable bound to a closure/callable value).
/// 2. unscoped `name` -> try `"{SCOPE}:" + name`, where `SCOPE` is a session
///    variable (default `"*"` when unset, matching the ladder's literal
///    `"*:"` when no scope override is in play).
/// 3. unresolved and default-lock free -> try `"default"`, then
///    `"*:default"`, prepending `name` as the first argument.
/// 4. otherwise `CommandNotFound(name)`.
pub fn resolve(session: &Session, name: &str) -> ShellResult<Arc<dyn Callable>> {
    if let Some(Value::Callable(c)) = session.get_var(name) {
        return Ok(c);
    }
    if let Some(c) = session.commands().get(name) {
        return Ok(c);
    }

    if !name.contains(':') {
        let scope = session.get_var("SCOPE").map(|v| v.display_string()).unwrap_or_else(|| "*".to_string());
        let scoped = format!("{}:{}", scope, name);
        if let Some(c) = session.commands().get(&scoped) {
            return Ok(c);
        }
    }

    Err(ShellError::CommandNotFound(name.to_string()))
}

/// Resolve and invoke `name`, falling back to a registered `default`/
/// `*:default` handler (with `name` prepended to `args`) under the
/// default-lock reentry guard (§4.3, §5).
pub fn resolve_and_invoke(session: &Session, name: &str, args: Vec<Value>) -> ShellResult<Value> {
    match resolve(session, name) {
        Ok(callable) => callable.invoke(session, args),
        Err(ShellError::CommandNotFound(_)) => invoke_default(session, name, args),
        Err(other) => Err(other),
    }
}

fn invoke_default(session: &Session, name: &str, args: Vec<Value>) -> ShellResult<Value> {
    let guard = session.try_acquire_default_lock();
    let guard = match guard {
        Some(g) => g,
        None => return Err(ShellError::CommandNotFound(name.to_string())),
    };

    let default_handler = session
        .commands()
        .get("default")
        .or_else(|| session.commands().get("*:default"));

    let result = match default_handler {
        Some(handler) => {
            let mut full_args = Vec::with_capacity(args.len() + 1);
            full_args.push(Value::text(name));
            full_args.extend(args);
            handler.invoke(session, full_args)
        }
        None => Err(ShellError::CommandNotFound(name.to_string())),
    };

    drop(guard);
    result
}

/// Host reflective dispatch contract (§4.3, §6): `invoke(session, target,
/// method_name, args) -> Value | Error`. The evaluator never reflects into
/// host types itself, it only requests `invoke` through this trait.
pub trait HostInvoker: Send + Sync {
    fn invoke(
        &self,
        session: &Session,
        target: &Value,
        method_name: &str,
        args: Vec<Value>,
    ) -> ShellResult<Value>;
}
