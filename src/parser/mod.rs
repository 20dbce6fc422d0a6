//! Tokenizer / Parser (§4.0, ambient)
//!
//! A small internal grammar sufficient to produce the Token/Program shape
//! §3 contracts. Grounded on the teacher's `parser/lexer.rs` + `parser.rs`
//! split (a char-cursor lexer feeding a recursive-descent parser), scaled
//! down to this crate's much smaller surface: words with inline `$name`
//! interpolation, `$(...)` executions, `{...}` closures, `[...]` arrays,
//! `$((...))` expressions, and a bare `=` for assignment. Grammar choices
//! here are not load-bearing; only the AST shape they emit is (§4.0).

mod cursor;
mod lexer;

pub use lexer::{parse_array_body, parse_program, ArrayBody};
