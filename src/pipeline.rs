//! Pipeline execution (§4.4, §5).
//!
//! A pipeline with one statement runs inline on the calling thread. A
//! pipeline with more than one statement runs each stage on its own OS
//! thread (grounded on the teacher's thread-per-stage job runner, not
//! tokio), wired so a predecessor's stdout becomes its successor's stdin.
//! `stderr` is never chained stage-to-stage: every stage's diagnostics land
//! directly on the session's own error stream (`Session::write_err` always
//! targets the session-level triad, bypassing any stage override).

use std::sync::atomic::Ordering;

use crate::ast::Pipeline;
use crate::closure::ClosureFrame;
use crate::errors::{ShellError, ShellResult};
use crate::session::{MemStream, Session, Triad};
use crate::value::Value;

pub fn execute_pipeline(
    session: &Session,
    frame: &ClosureFrame<'_>,
    pipeline: &Pipeline,
) -> ShellResult<Value> {
    let statements = &pipeline.statements;
    if statements.is_empty() {
        return Ok(Value::Null);
    }

    let original = session.streams();

    if statements.len() == 1 {
        return execute_singleton(session, frame, &statements[0], &original);
    }

    if session.is_interrupted() {
        return Err(ShellError::Interrupted);
    }

    let n = statements.len();
    let mut triads: Vec<Triad> = Vec::with_capacity(n);
    for i in 0..n {
        let stdin = if i == 0 {
            original.stdin.clone()
        } else {
            triads[i - 1].stdout.clone()
        };
        triads.push(Triad { stdin, stdout: MemStream::new(), stderr: original.stderr.clone() });
    }

    let mut outcomes: Vec<Option<ShellResult<Value>>> = (0..n).map(|_| None).collect();

    std::thread::scope(|scope| {
        let mut handles = Vec::with_capacity(n);
        for (i, stmt) in statements.iter().enumerate() {
            let triad = triads[i].clone();
            handles.push(scope.spawn(move || {
                Session::with_stage_triad(triad, || frame.execute_statement(stmt))
            }));
        }
        for (i, handle) in handles.into_iter().enumerate() {
            let outcome = handle
                .join()
                .unwrap_or_else(|_| Err(ShellError::failure("pipeline stage panicked")));
            outcomes[i] = Some(outcome);
        }
    });

    let mut pipe_exception = None;
    for outcome in outcomes.iter_mut().take(n - 1) {
        if let Some(Err(e)) = outcome.take() {
            let line = match session.last_location() {
                Some(loc) => format!("{}: {}\n", loc, e),
                None => format!("pipe: {}\n", e),
            };
            session.write_err(&line);
            pipe_exception = Some(e);
        }
    }
    if let Some(e) = pipe_exception {
        session.set_var("pipe-exception", Value::text(e.to_string()));
    }

    let last_stdout = triads[n - 1].stdout.contents();
    session.write_stdout(&last_stdout);
    session.set_streams(original);

    let last_result = outcomes[n - 1].take().unwrap();
    if session.is_interrupted() {
        return Err(ShellError::Interrupted);
    }
    last_result
}

fn execute_singleton(
    session: &Session,
    frame: &ClosureFrame<'_>,
    stmt: &crate::ast::Statement,
    original: &Triad,
) -> ShellResult<Value> {
    let triad = Triad { stdin: original.stdin.clone(), stdout: MemStream::new(), stderr: original.stderr.clone() };
    let stdout = triad.stdout.clone();
    let result = Session::with_stage_triad(triad, || frame.execute_statement(stmt));
    session.write_stdout(&stdout.contents());
    session.set_streams(original.clone());
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Position, Token, WordPart};

    fn word(text: &str) -> Token {
        Token::word(text, vec![WordPart::Literal(text.to_string())], Position::default())
    }

    #[derive(Debug)]
    struct Echo;
    impl crate::value::Callable for Echo {
        fn invoke(&self, session: &Session, args: Vec<Value>) -> ShellResult<Value> {
            let text = args
                .iter()
                .map(Value::display_string)
                .collect::<Vec<_>>()
                .join(" ");
            session.write_stdout(text.as_bytes());
            Ok(Value::Int(1))
        }
    }

    #[derive(Debug)]
    struct ReadAll;
    impl crate::value::Callable for ReadAll {
        fn invoke(&self, session: &Session, _args: Vec<Value>) -> ShellResult<Value> {
            let _ = session.read_stdin_to_string();
            Ok(Value::text("ok"))
        }
    }

    #[derive(Debug)]
    struct Boom;
    impl crate::value::Callable for Boom {
        fn invoke(&self, _session: &Session, _args: Vec<Value>) -> ShellResult<Value> {
            Err(ShellError::failure("kaboom"))
        }
    }

    #[test]
    fn single_stage_pipeline_runs_inline_and_surfaces_stdout() {
        let session = Session::new();
        session.commands().register("echo", std::sync::Arc::new(Echo));
        let pipeline = Pipeline::new(vec![crate::ast::Statement::new(vec![word("echo")])]);
        let frame = ClosureFrame::top_level(&session, Vec::new());
        let result = execute_pipeline(&session, &frame, &pipeline).unwrap();
        assert_eq!(result, Value::Int(1));
        assert_eq!(session.streams().stdout.contents_string(), "echo");
    }

    #[test]
    fn two_stage_pipeline_pipes_stdout_to_stdin_and_returns_last_result() {
        let session = Session::new();
        session.commands().register("echo", std::sync::Arc::new(Echo));
        session.commands().register("readall", std::sync::Arc::new(ReadAll));
        let pipeline = Pipeline::new(vec![
            crate::ast::Statement::new(vec![word("echo")]),
            crate::ast::Statement::new(vec![word("readall")]),
        ]);
        let frame = ClosureFrame::top_level(&session, Vec::new());
        let result = execute_pipeline(&session, &frame, &pipeline).unwrap();
        assert_eq!(result, Value::text("ok"));
        assert!(session.get_var("pipe-exception").is_none());
    }

    #[test]
    fn non_last_stage_failure_is_stashed_and_logged_but_does_not_abort_the_pipeline() {
        let session = Session::new();
        session.commands().register("boom", std::sync::Arc::new(Boom));
        session.commands().register("readall", std::sync::Arc::new(ReadAll));
        let pipeline = Pipeline::new(vec![
            crate::ast::Statement::new(vec![word("boom")]),
            crate::ast::Statement::new(vec![word("readall")]),
        ]);
        let frame = ClosureFrame::top_level(&session, Vec::new());
        let result = execute_pipeline(&session, &frame, &pipeline).unwrap();
        assert_eq!(result, Value::text("ok"));
        assert!(session.get_var("pipe-exception").is_some());
        assert!(session.streams().stderr.contents_string().contains("kaboom"));
    }

    #[test]
    fn last_stage_failure_propagates() {
        let session = Session::new();
        session.commands().register("echo", std::sync::Arc::new(Echo));
        session.commands().register("boom", std::sync::Arc::new(Boom));
        let pipeline = Pipeline::new(vec![
            crate::ast::Statement::new(vec![word("echo")]),
            crate::ast::Statement::new(vec![word("boom")]),
        ]);
        let frame = ClosureFrame::top_level(&session, Vec::new());
        let err = execute_pipeline(&session, &frame, &pipeline).unwrap_err();
        assert!(matches!(err, ShellError::Failure { .. }));
    }

    #[test]
    fn interrupt_requested_before_a_multi_stage_pipeline_short_circuits() {
        let session = Session::new();
        session.commands().register("echo", std::sync::Arc::new(Echo));
        session.request_interrupt();
        let pipeline = Pipeline::new(vec![
            crate::ast::Statement::new(vec![word("echo")]),
            crate::ast::Statement::new(vec![word("echo")]),
        ]);
        let frame = ClosureFrame::top_level(&session, Vec::new());
        let err = execute_pipeline(&session, &frame, &pipeline).unwrap_err();
        assert!(matches!(err, ShellError::Interrupted));
    }

    #[test]
    fn empty_pipeline_is_null() {
        let session = Session::new();
        let pipeline = Pipeline::new(vec![]);
        let frame = ClosureFrame::top_level(&session, Vec::new());
        assert_eq!(execute_pipeline(&session, &frame, &pipeline).unwrap(), Value::Null);
    }
}
