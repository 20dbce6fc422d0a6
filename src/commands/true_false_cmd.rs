use crate::errors::ShellResult;
use crate::session::Session;
use crate::value::{Callable, Value};

#[derive(Debug)]
pub struct TrueCommand;

impl Callable for TrueCommand {
    fn invoke(&self, _session: &Session, _args: Vec<Value>) -> ShellResult<Value> {
        Ok(Value::Bool(true))
    }
}

#[derive(Debug)]
pub struct FalseCommand;

impl Callable for FalseCommand {
    fn invoke(&self, _session: &Session, _args: Vec<Value>) -> ShellResult<Value> {
        Ok(Value::Bool(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn true_and_false_return_their_bools() {
        let session = Session::new();
        assert_eq!(TrueCommand.invoke(&session, vec![]).unwrap(), Value::Bool(true));
        assert_eq!(FalseCommand.invoke(&session, vec![]).unwrap(), Value::Bool(false));
    }
}
