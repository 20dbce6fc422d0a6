//! Expander
//!
//! Walks a WORD token's `Vec<WordPart>` (§4.0, §4.2), substituting `$name`
//! references and nested CLOSURE/EXECUTION tokens. Name lookup delegates to
//! the active closure frame's `get(name)` (§3 lookup order); nested-token
//! evaluation delegates back to the frame's `eval_token`. This is the sole
//! place textual interpolation happens — `eval` never re-scans a word body.

use crate::ast::{Token, WordPart};
use crate::closure::ClosureFrame;
use crate::errors::ShellResult;
use crate::value::Value;

/// Whether expansion substituted something, or the word was a pure literal
/// the caller must still run through the text->value ladder.
pub enum Expansion {
    Unchanged,
    Substituted(Value),
}

pub fn expand(frame: &ClosureFrame<'_>, token: &Token) -> ShellResult<Expansion> {
    match token.parts.as_slice() {
        [] => Ok(Expansion::Unchanged),
        [WordPart::Literal(_)] => Ok(Expansion::Unchanged),
        [WordPart::Var(name)] => {
            let value = frame.get(name)?.unwrap_or(Value::Null);
            Ok(Expansion::Substituted(value))
        }
        [WordPart::Nested(nested)] => {
            let value = frame.eval_token(nested)?;
            Ok(Expansion::Substituted(value))
        }
        parts => {
            let mut buf = String::new();
            for part in parts {
                match part {
                    WordPart::Literal(s) => buf.push_str(s),
                    WordPart::Var(name) => {
                        let value = frame.get(name)?.unwrap_or(Value::Null);
                        buf.push_str(&value.display_string());
                    }
                    WordPart::Nested(nested) => {
                        let value = frame.eval_token(nested)?;
                        buf.push_str(&value.display_string());
                    }
                }
            }
            Ok(Expansion::Substituted(Value::Text(buf)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Position;
    use crate::session::Session;

    #[test]
    fn pure_literal_is_unchanged() {
        let session = Session::new();
        let frame = ClosureFrame::top_level(&session, Vec::new());
        let token = Token::word("hi", vec![WordPart::Literal("hi".into())], Position::default());
        assert!(matches!(expand(&frame, &token).unwrap(), Expansion::Unchanged));
    }

    #[test]
    fn single_var_preserves_type() {
        let session = Session::new();
        session.set_var("x", Value::Int(5));
        let frame = ClosureFrame::top_level(&session, Vec::new());
        let token = Token::word("$x", vec![WordPart::Var("x".into())], Position::default());
        match expand(&frame, &token).unwrap() {
            Expansion::Substituted(Value::Int(5)) => {}
            _ => panic!("expected a substituted Int(5)"),
        }
    }

    #[test]
    fn mixed_parts_concatenate_as_text() {
        let session = Session::new();
        session.set_var("x", Value::Int(5));
        let frame = ClosureFrame::top_level(&session, Vec::new());
        let token = Token::word(
            "a${x}b",
            vec![
                WordPart::Literal("a".into()),
                WordPart::Var("x".into()),
                WordPart::Literal("b".into()),
            ],
            Position::default(),
        );
        match expand(&frame, &token).unwrap() {
            Expansion::Substituted(Value::Text(s)) => assert_eq!(s, "a5b"),
            _ => panic!("expected substituted text"),
        }
    }

    #[test]
    fn missing_var_resolves_to_null() {
        let session = Session::new();
        let frame = ClosureFrame::top_level(&session, Vec::new());
        let token = Token::word("$missing", vec![WordPart::Var("missing".into())], Position::default());
        match expand(&frame, &token).unwrap() {
            Expansion::Substituted(Value::Null) => {}
            _ => panic!("expected Null for unbound variable"),
        }
    }
}
