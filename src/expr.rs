//! Expression evaluator
//!
//! `session.expr(text)` (§6): a minimal arithmetic/logical/comparison
//! evaluator over `Value`, since EXPR tokens must evaluate to something for
//! the crate to be runnable end-to-end. The distilled spec treats this as a
//! black box; this is the default implementation it asks for.

use crate::errors::{ShellError, ShellResult};
use crate::session::Session;
use crate::value::Value;

/// Evaluate an EXPR token's raw text against `session` (variable lookups
/// only; no closure-frame positional parameters are visible here).
pub fn evaluate(session: &Session, text: &str) -> ShellResult<Value> {
    let mut parser = ExprParser { chars: text.chars().collect(), pos: 0, session };
    let value = parser.parse_or()?;
    parser.skip_ws();
    if parser.pos != parser.chars.len() {
        return Err(ShellError::failure(format!(
            "unexpected trailing input in expression at offset {}",
            parser.pos
        )));
    }
    Ok(value)
}

struct ExprParser<'a> {
    chars: Vec<char>,
    pos: usize,
    session: &'a Session,
}

impl<'a> ExprParser<'a> {
    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn starts_with(&self, lit: &str) -> bool {
        let rest: String = self.chars[self.pos..].iter().collect();
        rest.starts_with(lit)
    }

    fn consume(&mut self, lit: &str) -> bool {
        self.skip_ws();
        if self.starts_with(lit) {
            self.pos += lit.chars().count();
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> ShellResult<Value> {
        let mut lhs = self.parse_and()?;
        loop {
            self.skip_ws();
            if self.consume("||") {
                let rhs = self.parse_and()?;
                lhs = Value::Bool(truthy(&lhs) || truthy(&rhs));
            } else {
                break;
            }
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> ShellResult<Value> {
        let mut lhs = self.parse_not()?;
        loop {
            self.skip_ws();
            if self.consume("&&") {
                let rhs = self.parse_not()?;
                lhs = Value::Bool(truthy(&lhs) && truthy(&rhs));
            } else {
                break;
            }
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> ShellResult<Value> {
        self.skip_ws();
        if self.consume("!") {
            let v = self.parse_not()?;
            return Ok(Value::Bool(!truthy(&v)));
        }
        self.parse_cmp()
    }

    fn parse_cmp(&mut self) -> ShellResult<Value> {
        let lhs = self.parse_add()?;
        self.skip_ws();
        let op = ["==", "!=", "<=", ">=", "<", ">"]
            .iter()
            .find(|op| self.starts_with(op))
            .copied();
        if let Some(op) = op {
            self.consume(op);
            let rhs = self.parse_add()?;
            return Ok(Value::Bool(compare(op, &lhs, &rhs)?));
        }
        Ok(lhs)
    }

    fn parse_add(&mut self) -> ShellResult<Value> {
        let mut lhs = self.parse_mul()?;
        loop {
            self.skip_ws();
            if self.consume("+") {
                let rhs = self.parse_mul()?;
                lhs = arith(&lhs, &rhs, '+')?;
            } else if self.consume("-") {
                let rhs = self.parse_mul()?;
                lhs = arith(&lhs, &rhs, '-')?;
            } else {
                break;
            }
        }
        Ok(lhs)
    }

    fn parse_mul(&mut self) -> ShellResult<Value> {
        let mut lhs = self.parse_unary()?;
        loop {
            self.skip_ws();
            if self.consume("*") {
                let rhs = self.parse_unary()?;
                lhs = arith(&lhs, &rhs, '*')?;
            } else if self.consume("/") {
                let rhs = self.parse_unary()?;
                lhs = arith(&lhs, &rhs, '/')?;
            } else if self.consume("%") {
                let rhs = self.parse_unary()?;
                lhs = arith(&lhs, &rhs, '%')?;
            } else {
                break;
            }
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> ShellResult<Value> {
        self.skip_ws();
        if self.consume("-") {
            let v = self.parse_unary()?;
            return arith(&Value::Int(0), &v, '-');
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> ShellResult<Value> {
        self.skip_ws();
        if self.consume("(") {
            let v = self.parse_or()?;
            self.skip_ws();
            if !self.consume(")") {
                return Err(ShellError::failure("expected ')' in expression"));
            }
            return Ok(v);
        }
        if self.consume("\"") {
            return self.parse_string_literal('"');
        }
        if self.consume("'") {
            return self.parse_string_literal('\'');
        }
        if self.consume("$") {
            let name = self.parse_ident()?;
            return Ok(self.session.get_var(&name).unwrap_or(Value::Null));
        }
        if matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            return self.parse_number();
        }
        let word = self.parse_ident()?;
        if word.is_empty() {
            return Err(ShellError::failure("expected expression"));
        }
        Ok(match word.as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            "null" => Value::Null,
            _ => self.session.get_var(&word).unwrap_or(Value::Null),
        })
    }

    fn parse_string_literal(&mut self, quote: char) -> ShellResult<Value> {
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(ShellError::failure("unterminated string in expression")),
                Some(c) if c == quote => {
                    self.pos += 1;
                    break;
                }
                Some(c) => {
                    out.push(c);
                    self.pos += 1;
                }
            }
        }
        Ok(Value::Text(out))
    }

    fn parse_ident(&mut self) -> ShellResult<String> {
        self.skip_ws();
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_' || c == '.' || c == ':') {
            self.pos += 1;
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn parse_number(&mut self) -> ShellResult<Value> {
        let start = self.pos;
        let mut is_float = false;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek() == Some('.') {
            is_float = true;
            self.pos += 1;
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        if is_float {
            text.parse::<f64>()
                .map(Value::Float)
                .map_err(|_| ShellError::failure(format!("bad number literal '{}'", text)))
        } else {
            text.parse::<i64>()
                .map(Value::Int)
                .map_err(|_| ShellError::failure(format!("bad number literal '{}'", text)))
        }
    }
}

fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Int(i) => *i != 0,
        Value::Float(f) => *f != 0.0,
        Value::Text(s) => !s.is_empty(),
        Value::List(items) => !items.is_empty(),
        Value::Map(m) => !m.is_empty(),
        Value::Callable(_) | Value::Opaque(_) => true,
        Value::Splice(items) => !items.is_empty(),
    }
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

fn arith(lhs: &Value, rhs: &Value, op: char) -> ShellResult<Value> {
    if op == '+' {
        if let (Value::Text(a), b) = (lhs, rhs) {
            return Ok(Value::Text(format!("{}{}", a, b.display_string())));
        }
        if let (a, Value::Text(b)) = (lhs, rhs) {
            if !matches!(a, Value::Int(_) | Value::Float(_)) {
                return Ok(Value::Text(format!("{}{}", a.display_string(), b)));
            }
        }
    }
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => Ok(match op {
            '+' => Value::Int(a.wrapping_add(*b)),
            '-' => Value::Int(a.wrapping_sub(*b)),
            '*' => Value::Int(a.wrapping_mul(*b)),
            '/' => {
                if *b == 0 {
                    Err(ShellError::failure("division by zero"))?
                } else {
                    Value::Int(a / b)
                }
            }
            '%' => {
                if *b == 0 {
                    Err(ShellError::failure("division by zero"))?
                } else {
                    Value::Int(a % b)
                }
            }
            _ => unreachable!(),
        }),
        _ => {
            let (a, b) = (
                as_f64(lhs).ok_or_else(|| ShellError::failure("non-numeric operand"))?,
                as_f64(rhs).ok_or_else(|| ShellError::failure("non-numeric operand"))?,
            );
            Ok(match op {
                '+' => Value::Float(a + b),
                '-' => Value::Float(a - b),
                '*' => Value::Float(a * b),
                '/' => Value::Float(a / b),
                '%' => Value::Float(a % b),
                _ => unreachable!(),
            })
        }
    }
}

fn compare(op: &str, lhs: &Value, rhs: &Value) -> ShellResult<bool> {
    if op == "==" {
        return Ok(lhs == rhs);
    }
    if op == "!=" {
        return Ok(lhs != rhs);
    }
    let (a, b) = match (as_f64(lhs), as_f64(rhs)) {
        (Some(a), Some(b)) => (a, b),
        _ => {
            let a = lhs.display_string();
            let b = rhs.display_string();
            return Ok(match op {
                "<" => a < b,
                "<=" => a <= b,
                ">" => a > b,
                ">=" => a >= b,
                _ => unreachable!(),
            });
        }
    };
    Ok(match op {
        "<" => a < b,
        "<=" => a <= b,
        ">" => a > b,
        ">=" => a >= b,
        _ => unreachable!(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_precedence() {
        let session = Session::new();
        assert_eq!(evaluate(&session, "1 + 2 * 3").unwrap(), Value::Int(7));
        assert_eq!(evaluate(&session, "(1 + 2) * 3").unwrap(), Value::Int(9));
    }

    #[test]
    fn float_division_and_int_division() {
        let session = Session::new();
        assert_eq!(evaluate(&session, "7 / 2").unwrap(), Value::Int(3));
        assert_eq!(evaluate(&session, "7.0 / 2").unwrap(), Value::Float(3.5));
    }

    #[test]
    fn string_concatenation_with_plus() {
        let session = Session::new();
        assert_eq!(
            evaluate(&session, "\"a\" + \"b\"").unwrap(),
            Value::Text("ab".into())
        );
    }

    #[test]
    fn comparisons_and_logic() {
        let session = Session::new();
        assert_eq!(evaluate(&session, "1 < 2 && 2 < 3").unwrap(), Value::Bool(true));
        assert_eq!(evaluate(&session, "!false").unwrap(), Value::Bool(true));
        assert_eq!(evaluate(&session, "1 == 1.0").unwrap(), Value::Bool(true));
    }

    #[test]
    fn variable_lookup_via_dollar_sigil() {
        let session = Session::new();
        session.set_var("x", Value::Int(10));
        assert_eq!(evaluate(&session, "$x + 1").unwrap(), Value::Int(11));
    }
}
