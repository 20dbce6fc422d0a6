use crate::errors::ShellResult;
use crate::session::Session;
use crate::value::Value;

/// Counts lines/words/bytes of the calling stage's stdin, returned as a map
/// `{lines, words, bytes}` — grounded on the teacher's `wc/mod.rs`, narrowed
/// to a single in-memory stream instead of multiple file arguments.
#[derive(Debug)]
pub struct WcCommand;

impl crate::value::Callable for WcCommand {
    fn invoke(&self, session: &Session, _args: Vec<Value>) -> ShellResult<Value> {
        let text = session.read_stdin_to_string();
        let lines = text.lines().count() as i64;
        let words = text.split_whitespace().count() as i64;
        let bytes = text.len() as i64;
        let mut map = indexmap::IndexMap::new();
        map.insert("lines".to_string(), Value::Int(lines));
        map.insert("words".to_string(), Value::Int(words));
        map.insert("bytes".to_string(), Value::Int(bytes));
        Ok(Value::Map(map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{MemStream, Triad};
    use crate::value::Callable;

    #[test]
    fn wc_counts_lines_words_and_bytes() {
        let session = Session::new();
        let triad = Triad {
            stdin: MemStream::from_bytes(b"a b\nc\n".to_vec()),
            stdout: MemStream::new(),
            stderr: MemStream::new(),
        };
        let result = Session::with_stage_triad(triad, || WcCommand.invoke(&session, vec![])).unwrap();
        let Value::Map(map) = result else { panic!("expected a map") };
        assert_eq!(map.get("lines"), Some(&Value::Int(2)));
        assert_eq!(map.get("words"), Some(&Value::Int(3)));
        assert_eq!(map.get("bytes"), Some(&Value::Int(6)));
    }
}
