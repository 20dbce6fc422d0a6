//! Closure evaluator (§4.1)
//!
//! The recursive tree-walker at the center of the crate: per-invocation
//! parameter scoping, token evaluation (word/closure/execution/array/assign/
//! expr), statement-form classification (assignment, command invocation,
//! method invocation, dotted chaining, array indexing). Grounded on the
//! teacher's `execution_engine.rs` (one method per node kind, matching on
//! the AST, propagating `?`) generalised from bash's command grammar to
//! this spec's WORD/CLOSURE/EXECUTION/ARRAY/ASSIGN/EXPR token set.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::ast::{Program, Statement, Token, TokenKind, WordPart};
use crate::dispatch;
use crate::errors::{Location, ShellError, ShellResult};
use crate::expander::{self, Expansion};
use crate::parser::ArrayBody;
use crate::session::Session;
use crate::value::{Callable, Value};

/// Per-invocation evaluation context (§3 "Closure frame"). Borrows its
/// session rather than owning it: pipeline stages build a frame per
/// statement inside a `std::thread::scope`, so the borrow never needs to
/// outlive the scope that spawned the stage threads.
pub struct ClosureFrame<'s> {
    session: &'s Session,
    parmv: Arc<Vec<Value>>,
}

impl<'s> ClosureFrame<'s> {
    pub fn top_level(session: &'s Session, parmv: Vec<Value>) -> Self {
        Self { session, parmv: Arc::new(parmv) }
    }

    pub fn session(&self) -> &'s Session {
        self.session
    }

    /// Variable lookup order (§3 invariant 3): reserved parameter names,
    /// then session variables, then the host command registry.
    pub fn get(&self, name: &str) -> ShellResult<Option<Value>> {
        if let Some(v) = self.reserved_param(name) {
            return Ok(Some(v));
        }
        if let Some(v) = self.session.get_var(name) {
            return Ok(Some(v));
        }
        if let Some(c) = self.session.commands().get(name) {
            return Ok(Some(Value::Callable(c)));
        }
        Ok(match name {
            ".variables" => Some(Value::List(
                self.session.variable_names().into_iter().map(Value::Text).collect(),
            )),
            ".commands" => Some(Value::List(
                self.session.commands().names().into_iter().map(Value::Text).collect(),
            )),
            ".location" => Some(
                self.session
                    .last_location()
                    .map(|l| Value::Text(l.to_string()))
                    .unwrap_or(Value::Null),
            ),
            _ => None,
        })
    }

    fn reserved_param(&self, name: &str) -> Option<Value> {
        match name {
            "args" => Some(Value::Splice(Arc::clone(&self.parmv))),
            "argv" => Some(Value::List((*self.parmv).clone())),
            "it" => Some(self.parmv.first().cloned().unwrap_or(Value::Null)),
            _ => {
                let mut chars = name.chars();
                let only = chars.next()?;
                if chars.next().is_none() && only.is_ascii_digit() && only != '0' {
                    let idx = only.to_digit(10).unwrap() as usize;
                    Some(self.parmv.get(idx - 1).cloned().unwrap_or(Value::Null))
                } else {
                    None
                }
            }
        }
    }

    /// `eval(token)` (§4.1), enriched with this token's position on error
    /// (§3 invariant 6: the earliest touched position wins, once).
    pub fn eval_token(&self, token: &Token) -> ShellResult<Value> {
        let loc = Location::new(token.position.line, token.position.column);
        self.eval_token_inner(token)
            .map_err(|e| self.session.enrich_error(e, loc))
    }

    fn eval_token_inner(&self, token: &Token) -> ShellResult<Value> {
        match token.kind {
            TokenKind::Word => match expander::expand(self, token)? {
                Expansion::Unchanged => Ok(Value::from_text_ladder(&literal_text(token))),
                Expansion::Substituted(v) => Ok(v),
            },
            TokenKind::Closure => {
                let program = token
                    .nested_program
                    .as_ref()
                    .expect("CLOSURE token without a nested program")
                    .as_ref()
                    .clone();
                Ok(Value::Callable(Arc::new(ClosureCallable { program })))
            }
            TokenKind::Execution => {
                let program = token
                    .nested_program
                    .as_ref()
                    .expect("EXECUTION token without a nested program");
                execute(self.session, program, Some((*self.parmv).clone()))
            }
            TokenKind::Array => self.eval_array(token),
            TokenKind::Assign => Err(ShellError::syntax(
                "ASSIGN token cannot be evaluated as a value",
                token.position.line,
                token.position.column,
            )),
            TokenKind::Expr => {
                let text = token.expr_text.as_deref().unwrap_or("");
                crate::expr::evaluate(self.session, text)
            }
        }
    }

    fn eval_array(&self, token: &Token) -> ShellResult<Value> {
        let body = token.array_body.as_deref().unwrap_or("");
        let parsed = crate::parser::parse_array_body(body, token.position)?;
        match parsed {
            ArrayBody::Positional(items) => {
                let mut out = Vec::new();
                for item in &items {
                    match self.eval_token(item)? {
                        Value::List(inner) => out.extend(inner),
                        Value::Splice(inner) => out.extend((*inner).clone()),
                        other => out.push(other),
                    }
                }
                Ok(Value::List(out))
            }
            ArrayBody::MapBody(pairs) => {
                let mut map = IndexMap::new();
                for (key_tok, value_tok) in &pairs {
                    let key_value = self.eval_token(key_tok)?;
                    let key = match key_value {
                        Value::Text(s) => s,
                        _ => {
                            return Err(ShellError::syntax(
                                "map key null or not String",
                                key_tok.position.line,
                                key_tok.position.column,
                            ))
                        }
                    };
                    let value = self.eval_token(value_tok)?;
                    map.insert(key, value);
                }
                Ok(Value::Map(map))
            }
        }
    }

    /// `executeStatement(tokens)` (§4.1).
    pub fn execute_statement(&self, stmt: &Statement) -> ShellResult<Value> {
        let tokens = &stmt.tokens;
        if tokens.is_empty() {
            return Ok(Value::Null);
        }

        self.trace_raw(tokens);

        if tokens.len() >= 3 && tokens[1].kind == TokenKind::Assign {
            return self.execute_assignment(tokens);
        }

        self.execute_invocation(tokens)
    }

    /// `tokens.len() >= 3` is guaranteed by the caller, so `rhs_tokens` is
    /// non-empty, but splicing a bare empty `$args` can still yield zero
    /// *values* (§4.1 "with no rhs values remaining").
    fn execute_assignment(&self, tokens: &[Token]) -> ShellResult<Value> {
        let name = self.token_name(&tokens[0])?;
        let rhs_tokens = &tokens[2..];

        let mut values = Vec::new();
        for t in rhs_tokens {
            match self.eval_token(t)? {
                Value::Splice(items) => values.extend((*items).clone()),
                other => values.push(other),
            }
        }

        match values.len() {
            0 => Ok(self.session.remove_var(&name).unwrap_or(Value::Null)),
            1 => {
                let value = values.into_iter().next().unwrap();
                self.session.set_var(name, value.clone());
                Ok(value)
            }
            _ => {
                let head_token = &rhs_tokens[0];
                let head_value = values[0].clone();
                let rest = values[1..].to_vec();
                let result = self.dispatch_or_invoke(head_token, head_value, rest)?;
                self.session.set_var(name, result.clone());
                Ok(result)
            }
        }
    }

    /// A plain-literal word's text used as a name (variable/command name),
    /// bypassing the text->value ladder; a non-literal head is evaluated and
    /// stringified instead.
    fn token_name(&self, token: &Token) -> ShellResult<String> {
        if token.kind == TokenKind::Word && token.is_pure_literal() {
            Ok(literal_text(token))
        } else {
            Ok(self.eval_token(token)?.display_string())
        }
    }

    /// Evaluate a non-assignment run of tokens. A lone EXECUTION token is
    /// already its own invocation (case 1) and its value is returned as-is;
    /// every other single- or multi-token statement is classified as command
    /// invocation (plain unsubstituted literal word) or method invocation
    /// (cases 3/4), with an empty rhs when there are no further tokens.
    fn execute_invocation(&self, tokens: &[Token]) -> ShellResult<Value> {
        let head_token = &tokens[0];
        let head_value = self.eval_token(head_token)?;
        if tokens.len() == 1 && head_token.kind == TokenKind::Execution {
            return Ok(head_value);
        }

        let mut rhs = Vec::with_capacity(tokens.len().saturating_sub(1));
        for t in &tokens[1..] {
            match self.eval_token(t)? {
                Value::Splice(items) => rhs.extend((*items).clone()),
                other => rhs.push(other),
            }
        }

        self.trace_expanded(head_token, &head_value, &rhs);

        self.dispatch_or_invoke(head_token, head_value, rhs)
    }

    fn dispatch_or_invoke(&self, head_token: &Token, head_value: Value, rest: Vec<Value>) -> ShellResult<Value> {
        if head_token.kind == TokenKind::Word && head_token.is_pure_literal() {
            let name = literal_text(head_token);
            dispatch::resolve_and_invoke(self.session, &name, rest)
        } else {
            self.execute_method_invocation(head_value, rest)
        }
    }

    fn execute_method_invocation(&self, head_value: Value, rhs: Vec<Value>) -> ShellResult<Value> {
        if head_value.is_null() {
            return if rhs.is_empty() {
                Ok(Value::Null)
            } else {
                Err(ShellError::CommandNameNull)
            };
        }
        if rhs.is_empty() {
            return Ok(head_value);
        }

        if rhs[0] == Value::text(".") {
            return self.execute_dotted_chain(head_value, &rhs[1..]);
        }

        if let Value::List(items) = &head_value {
            if rhs.len() == 1 {
                return index_list(items, &rhs[0]);
            }
        }

        let method_name = rhs[0].display_string();
        self.invoke_method(&head_value, &method_name, rhs[1..].to_vec())
    }

    fn execute_dotted_chain(&self, mut target: Value, rest: &[Value]) -> ShellResult<Value> {
        let mut i = 0;
        let mut last = target.clone();
        while i < rest.len() {
            let method_name = rest[i].display_string();
            i += 1;
            let mut args = Vec::new();
            while i < rest.len() && rest[i] != Value::text(".") {
                args.push(rest[i].clone());
                i += 1;
            }
            if i < rest.len() {
                i += 1; // consume the separating "."
            }
            last = self.invoke_method(&target, &method_name, args)?;
            target = last.clone();
        }
        Ok(last)
    }

    fn invoke_method(&self, target: &Value, method: &str, args: Vec<Value>) -> ShellResult<Value> {
        if let Some(v) = intrinsic_method(target, method, &args) {
            return v;
        }
        match self.session.host_invoker() {
            Some(invoker) => invoker.invoke(self.session, target, method, args),
            None => Err(ShellError::HostInvokeError(format!(
                "no host invoker registered for method '{}'",
                method
            ))),
        }
    }

    fn trace_raw(&self, tokens: &[Token]) {
        let Some(echo) = self.session.get_var("echo") else { return };
        let echo = echo.display_string();
        if echo == "true" || echo == "verbose" {
            let raw = tokens.iter().map(|t| t.source_text.as_str()).collect::<Vec<_>>().join(" ");
            self.session.write_err(&format!("{}\n", raw));
        }
    }

    fn trace_expanded(&self, head_token: &Token, head_value: &Value, rhs: &[Value]) {
        let Some(echo) = self.session.get_var("echo") else { return };
        if echo.display_string() != "verbose" {
            return;
        }
        let raw = head_token.source_text.clone();
        let head_repr = if head_token.kind == TokenKind::Word && head_token.is_pure_literal() {
            literal_text(head_token)
        } else {
            head_value.display_string()
        };
        let mut parts = vec![head_repr];
        parts.extend(rhs.iter().map(Value::display_string));
        let expanded = parts.join(" ");
        if expanded != raw {
            self.session.write_err(&format!("{}\n", expanded));
        }
    }
}

fn literal_text(token: &Token) -> String {
    match token.parts.as_slice() {
        [WordPart::Literal(s)] => s.clone(),
        _ => token.source_text.clone(),
    }
}

fn index_list(items: &[Value], arg: &Value) -> ShellResult<Value> {
    let text = arg.display_string();
    if text == "length" {
        return Ok(Value::Int(items.len() as i64));
    }
    let idx: usize = text
        .parse()
        .map_err(|_| ShellError::failure(format!("invalid array index '{}'", text)))?;
    Ok(items.get(idx).cloned().unwrap_or(Value::Null))
}

/// A handful of built-in, no-host-required methods on the non-opaque value
/// kinds, tried before delegating to a registered host invoker.
fn intrinsic_method(target: &Value, method: &str, args: &[Value]) -> Option<ShellResult<Value>> {
    match (target, method) {
        (Value::List(items), "length") if args.is_empty() => Some(Ok(Value::Int(items.len() as i64))),
        (Value::Map(map), "keys") if args.is_empty() => {
            Some(Ok(Value::List(map.keys().cloned().map(Value::Text).collect())))
        }
        (Value::Map(map), "get") if args.len() == 1 => {
            let key = args[0].display_string();
            Some(Ok(map.get(&key).cloned().unwrap_or(Value::Null)))
        }
        (Value::Text(s), "upper") if args.is_empty() => Some(Ok(Value::Text(s.to_uppercase()))),
        (Value::Text(s), "lower") if args.is_empty() => Some(Ok(Value::Text(s.to_lowercase()))),
        (Value::Text(s), "length") if args.is_empty() => Some(Ok(Value::Int(s.chars().count() as i64))),
        _ => None,
    }
}

/// A CLOSURE-token value: constructed without executing (§4.1). Owns a
/// cloned, `'static` nested `Program`, so it carries no session/frame
/// lifetime and can live in a `Value` indefinitely.
#[derive(Debug)]
struct ClosureCallable {
    program: Program,
}

impl Callable for ClosureCallable {
    fn invoke(&self, session: &Session, args: Vec<Value>) -> ShellResult<Value> {
        execute(session, &self.program, Some(args))
    }
}

/// Top-level entry point (§4.1 `execute(session, values?)`): resolve
/// `parmv` (explicit values, else the session's `args` list, else empty),
/// build a frame, and run every pipeline in order.
pub fn execute(session: &Session, program: &Program, values: Option<Vec<Value>>) -> ShellResult<Value> {
    session.check_open()?;
    let parmv = match values {
        Some(v) => v,
        None => match session.get_var("args") {
            Some(Value::List(items)) => items,
            _ => Vec::new(),
        },
    };
    let frame = ClosureFrame::top_level(session, parmv);
    let mut last = Value::Null;
    for pipeline in &program.pipelines {
        last = crate::pipeline::execute_pipeline(session, &frame, pipeline)?;
    }
    Ok(last)
}

/// Entry point for a caller's top-level run (the CLI, a REPL): resets the
/// session's error-location latch first (§3 invariant 6 is scoped to one
/// top-level call, not the session's whole lifetime) and fires the
/// `beforeExecute`/`afterExecute` hooks around it. `source` is the raw
/// script text, passed through to the hooks unchanged.
pub fn run_program(
    session: &Session,
    source: &str,
    program: &Program,
    values: Option<Vec<Value>>,
) -> ShellResult<Value> {
    session.reset_location();
    session.run_before_execute(source);
    let result = execute(session, program, values);
    session.run_after_execute(source, &result);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn assignment_binds_and_returns_value() {
        let session = Session::new();
        let frame = ClosureFrame::top_level(&session, vec![]);
        let program = crate::parser::parse_program("x = 42").unwrap();
        let stmt = &program.pipelines[0].statements[0];
        let result = frame.execute_statement(stmt).unwrap();
        assert_eq!(result, Value::Int(42));
        assert_eq!(session.get_var("x"), Some(Value::Int(42)));
    }

    #[test]
    fn assignment_with_an_empty_splice_rhs_removes_variable() {
        // tokens.len() must be >= 3 to classify as an assignment at all
        // (§4.1); "no rhs values remaining" means the rhs *token* spliced
        // down to zero values (an empty `$args`), not an absent rhs token.
        let session = Session::new();
        session.set_var("x", Value::Int(1));
        let frame = ClosureFrame::top_level(&session, vec![]); // empty parmv
        let program = crate::parser::parse_program("x = $args").unwrap();
        let stmt = &program.pipelines[0].statements[0];
        let result = frame.execute_statement(stmt).unwrap();
        assert_eq!(result, Value::Int(1));
        assert_eq!(session.get_var("x"), None);
    }

    #[test]
    fn null_head_with_args_fails_command_name_null() {
        let session = Session::new();
        let frame = ClosureFrame::top_level(&session, vec![]);
        let err = frame.execute_method_invocation(Value::Null, vec![Value::text("x")]).unwrap_err();
        assert!(matches!(err, ShellError::CommandNameNull));
    }

    #[test]
    fn array_token_evaluates_to_list_with_splicing() {
        let session = Session::new();
        let frame = ClosureFrame::top_level(&session, vec![]);
        let program = crate::parser::parse_program("[1, 2, 3]").unwrap();
        let stmt = &program.pipelines[0].statements[0];
        let result = frame.execute_statement(stmt).unwrap();
        assert_eq!(result, Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]));
    }

    #[test]
    fn array_token_evaluates_to_map() {
        let session = Session::new();
        let frame = ClosureFrame::top_level(&session, vec![]);
        let program = crate::parser::parse_program("[a: 1, b: 2]").unwrap();
        let stmt = &program.pipelines[0].statements[0];
        let result = frame.execute_statement(stmt).unwrap();
        match result {
            Value::Map(m) => {
                assert_eq!(m.get("a"), Some(&Value::Int(1)));
                assert_eq!(m.get("b"), Some(&Value::Int(2)));
            }
            _ => panic!("expected a map"),
        }
    }

    #[test]
    fn closure_token_is_constructed_but_not_run() {
        let session = Session::new();
        let frame = ClosureFrame::top_level(&session, vec![]);
        let program = crate::parser::parse_program("x = { y = 1 }").unwrap();
        let stmt = &program.pipelines[0].statements[0];
        let result = frame.execute_statement(stmt).unwrap();
        assert!(matches!(result, Value::Callable(_)));
        // The inner `y = 1` never ran against this session.
        assert_eq!(session.get_var("y"), None);
    }

    #[test]
    fn invoking_a_closure_value_runs_its_body() {
        let session = Session::new();
        let frame = ClosureFrame::top_level(&session, vec![]);
        let program = crate::parser::parse_program("{ y = 1 }").unwrap();
        let stmt = &program.pipelines[0].statements[0];
        let closure = frame.execute_statement(stmt).unwrap();
        let Value::Callable(callable) = closure else { panic!("expected a callable") };
        let result = callable.invoke(&session, vec![]).unwrap();
        assert_eq!(result, Value::Int(1));
        assert_eq!(session.get_var("y"), Some(Value::Int(1)));
    }

    #[test]
    fn execution_token_inherits_enclosing_parameters() {
        let session = Session::new();
        let frame = ClosureFrame::top_level(&session, vec![Value::text("outer")]);
        let program = crate::parser::parse_program("x = $($1)").unwrap();
        let stmt = &program.pipelines[0].statements[0];
        let result = frame.execute_statement(stmt).unwrap();
        assert_eq!(result, Value::text("outer"));
    }

    #[test]
    fn reserved_param_single_digit_positional_out_of_range_is_null() {
        let session = Session::new();
        let frame = ClosureFrame::top_level(&session, vec![Value::text("only")]);
        assert_eq!(frame.get("1").unwrap(), Some(Value::text("only")));
        assert_eq!(frame.get("2").unwrap(), Some(Value::Null));
    }

    #[test]
    fn bare_args_resolves_as_a_splice_sentinel() {
        let session = Session::new();
        let frame = ClosureFrame::top_level(&session, vec![Value::Int(1), Value::Int(2)]);
        match frame.get("args").unwrap() {
            Some(Value::Splice(items)) => assert_eq!(*items, vec![Value::Int(1), Value::Int(2)]),
            _ => panic!("expected a Splice sentinel"),
        }
    }

    #[test]
    fn index_list_supports_length_and_integer_index() {
        let items = vec![Value::text("a"), Value::text("b")];
        assert_eq!(index_list(&items, &Value::text("length")).unwrap(), Value::Int(2));
        assert_eq!(index_list(&items, &Value::text("1")).unwrap(), Value::text("b"));
    }
}
