//! AST node types.
//!
//! Grounded on the teacher's `ast/types.rs` (`Position`/`Span`, a root
//! `ScriptNode` holding an ordered list of statements, enum-of-structs
//! command nodes) but reshaped to the token kinds this spec contracts:
//! `WORD | CLOSURE | EXECUTION | ARRAY | ASSIGN | EXPR`.

use std::fmt;

/// Position information for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// The kind of a token, per §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Word,
    Closure,
    Execution,
    Array,
    Assign,
    Expr,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenKind::Word => "WORD",
            TokenKind::Closure => "CLOSURE",
            TokenKind::Execution => "EXECUTION",
            TokenKind::Array => "ARRAY",
            TokenKind::Assign => "ASSIGN",
            TokenKind::Expr => "EXPR",
        };
        write!(f, "{}", s)
    }
}

/// A fragment of a WORD token's body: the "internal marker" structure the
/// Expander walks (§4.0). Produced structurally by the parser instead of
/// being re-scanned from raw text at expansion time.
#[derive(Debug, Clone, PartialEq)]
pub enum WordPart {
    Literal(String),
    Var(String),
    Nested(Box<Token>),
}

/// A single token: `{kind, source_span, line, column, value}` (§3).
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: Position,
    /// Raw source text this token was parsed from (used for xtrace).
    pub source_text: String,
    /// WORD: interpolation parts. Empty for non-WORD kinds.
    pub parts: Vec<WordPart>,
    /// CLOSURE / EXECUTION: the nested subprogram.
    pub nested_program: Option<Box<Program>>,
    /// ARRAY: the raw bracketed body text, re-parsed by the evaluator.
    pub array_body: Option<String>,
    /// EXPR: the raw expression text.
    pub expr_text: Option<String>,
}

impl Token {
    pub fn word(text: impl Into<String>, parts: Vec<WordPart>, position: Position) -> Self {
        let source_text = text.into();
        Self {
            kind: TokenKind::Word,
            position,
            source_text,
            parts,
            nested_program: None,
            array_body: None,
            expr_text: None,
        }
    }

    pub fn assign(position: Position) -> Self {
        Self {
            kind: TokenKind::Assign,
            position,
            source_text: "=".to_string(),
            parts: Vec::new(),
            nested_program: None,
            array_body: None,
            expr_text: None,
        }
    }

    pub fn closure(source_text: impl Into<String>, program: Program, position: Position) -> Self {
        Self {
            kind: TokenKind::Closure,
            position,
            source_text: source_text.into(),
            parts: Vec::new(),
            nested_program: Some(Box::new(program)),
            array_body: None,
            expr_text: None,
        }
    }

    pub fn execution(source_text: impl Into<String>, program: Program, position: Position) -> Self {
        Self {
            kind: TokenKind::Execution,
            position,
            source_text: source_text.into(),
            parts: Vec::new(),
            nested_program: Some(Box::new(program)),
            array_body: None,
            expr_text: None,
        }
    }

    pub fn array(source_text: impl Into<String>, body: impl Into<String>, position: Position) -> Self {
        Self {
            kind: TokenKind::Array,
            position,
            source_text: source_text.into(),
            parts: Vec::new(),
            nested_program: None,
            array_body: Some(body.into()),
            expr_text: None,
        }
    }

    pub fn expr(source_text: impl Into<String>, expr_text: impl Into<String>, position: Position) -> Self {
        Self {
            kind: TokenKind::Expr,
            position,
            source_text: source_text.into(),
            parts: Vec::new(),
            nested_program: None,
            array_body: None,
            expr_text: Some(expr_text.into()),
        }
    }

    /// True if this WORD token is a pure literal (no interpolation parts
    /// beyond a single `Literal`), used by `eval` to decide whether to run
    /// the text->value ladder (§4.1).
    pub fn is_pure_literal(&self) -> bool {
        self.kind == TokenKind::Word
            && matches!(self.parts.as_slice(), [] | [WordPart::Literal(_)])
    }
}

/// A statement: an ordered sequence of tokens. The first token names the
/// operation; `[T, ASSIGN, ...]` encodes an assignment (§3).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Statement {
    pub tokens: Vec<Token>,
}

impl Statement {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }
}

/// A pipeline: an ordered sequence of statements connected by `|` (§3, §4.4).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pipeline {
    pub statements: Vec<Statement>,
}

impl Pipeline {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }
}

/// A program: an ordered sequence of pipelines (§3).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub pipelines: Vec<Pipeline>,
}

impl Program {
    pub fn new(pipelines: Vec<Pipeline>) -> Self {
        Self { pipelines }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pure_literal_word_has_no_parts_or_a_single_literal() {
        let t = Token::word("hi", vec![WordPart::Literal("hi".into())], Position::default());
        assert!(t.is_pure_literal());

        let t2 = Token::word("$x", vec![WordPart::Var("x".into())], Position::default());
        assert!(!t2.is_pure_literal());
    }
}
