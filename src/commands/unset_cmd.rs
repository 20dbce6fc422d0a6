use crate::errors::{ShellError, ShellResult};
use crate::session::Session;
use crate::value::{Callable, Value};

#[derive(Debug)]
pub struct UnsetCommand;

impl Callable for UnsetCommand {
    fn invoke(&self, session: &Session, args: Vec<Value>) -> ShellResult<Value> {
        if args.len() != 1 {
            return Err(ShellError::failure("unset expects exactly 1 argument: name"));
        }
        let name = args[0].display_string();
        Ok(session.remove_var(&name).unwrap_or(Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_removes_and_returns_the_prior_value() {
        let session = Session::new();
        session.set_var("x", Value::Int(1));
        let result = UnsetCommand.invoke(&session, vec![Value::text("x")]).unwrap();
        assert_eq!(result, Value::Int(1));
        assert_eq!(session.get_var("x"), None);
    }

    #[test]
    fn unset_of_a_missing_variable_is_null() {
        let session = Session::new();
        assert_eq!(UnsetCommand.invoke(&session, vec![Value::text("missing")]).unwrap(), Value::Null);
    }
}
