use crate::errors::{ShellError, ShellResult};
use crate::session::Session;
use crate::value::{Callable, Value};

/// `set name value` binds a session variable directly, bypassing the
/// assignment-token path (§4.1) — useful from a nested closure or a host
/// integration that only has a `Callable` handle.
#[derive(Debug)]
pub struct SetCommand;

impl Callable for SetCommand {
    fn invoke(&self, session: &Session, mut args: Vec<Value>) -> ShellResult<Value> {
        if args.len() != 2 {
            return Err(ShellError::failure("set expects exactly 2 arguments: name value"));
        }
        let value = args.pop().unwrap();
        let name = args.pop().unwrap().display_string();
        session.set_var(name, value.clone());
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_binds_a_session_variable() {
        let session = Session::new();
        let result = SetCommand.invoke(&session, vec![Value::text("x"), Value::Int(7)]).unwrap();
        assert_eq!(result, Value::Int(7));
        assert_eq!(session.get_var("x"), Some(Value::Int(7)));
    }

    #[test]
    fn set_rejects_wrong_arity() {
        let session = Session::new();
        assert!(SetCommand.invoke(&session, vec![Value::text("x")]).is_err());
    }
}
