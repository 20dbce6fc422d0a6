use crate::errors::ShellResult;
use crate::session::Session;
use crate::value::{Callable, Value};

/// Writes its arguments, space-joined, to the session's stdout and returns
/// them as text — mirrors the teacher's `EchoCommand` minus flag parsing,
/// since there is no argv-string layer here to parse flags out of.
#[derive(Debug)]
pub struct EchoCommand;

impl Callable for EchoCommand {
    fn invoke(&self, session: &Session, args: Vec<Value>) -> ShellResult<Value> {
        let text = args.iter().map(Value::display_string).collect::<Vec<_>>().join(" ");
        session.write_stdout(text.as_bytes());
        session.write_stdout(b"\n");
        Ok(Value::text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echo_joins_args_and_writes_stdout() {
        let session = Session::new();
        let result = EchoCommand.invoke(&session, vec![Value::text("a"), Value::Int(1)]).unwrap();
        assert_eq!(result, Value::text("a 1"));
        assert_eq!(session.streams().stdout.contents_string(), "a 1\n");
    }
}
