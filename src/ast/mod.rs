//! Abstract Syntax Tree (AST) Types
//!
//! The nested AST shape the evaluator consumes (§3). The tokenizer/parser
//! (`crate::parser`) is the only producer of these types; the evaluator only
//! ever contracts against their shape.

pub mod types;

pub use types::*;
