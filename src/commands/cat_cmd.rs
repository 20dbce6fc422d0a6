use crate::errors::ShellResult;
use crate::session::Session;
use crate::value::{Callable, Value};

/// Reads the calling stage's stdin to a string and returns it as text,
/// writing it straight through to stdout too — the minimal pipeline-stage
/// demo command: grounded on the teacher's `cat/mod.rs` minus file args.
#[derive(Debug)]
pub struct CatCommand;

impl Callable for CatCommand {
    fn invoke(&self, session: &Session, _args: Vec<Value>) -> ShellResult<Value> {
        let text = session.read_stdin_to_string();
        session.write_stdout(text.as_bytes());
        Ok(Value::text(text))
    }
}
