use crate::errors::{ShellError, ShellResult};
use crate::session::Session;
use crate::value::{Callable, Value};

/// Reports the tag name of its single argument's `Value` variant.
/// Grounded on the teacher's `type_command.rs` (bash's `type` builtin),
/// narrowed from "is this a function/alias/builtin/file" to the value
/// tag since there is no separate command-kind registry to inspect here.
#[derive(Debug)]
pub struct TypeCommand;

impl Callable for TypeCommand {
    fn invoke(&self, _session: &Session, args: Vec<Value>) -> ShellResult<Value> {
        if args.len() != 1 {
            return Err(ShellError::failure("type expects exactly 1 argument"));
        }
        let name = match &args[0] {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Callable(_) => "closure",
            Value::Opaque(obj) => return Ok(Value::text(format!("opaque:{}", obj.type_name()))),
            Value::Splice(_) => "splice",
        };
        Ok(Value::text(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_reports_the_value_tag() {
        let session = Session::new();
        assert_eq!(TypeCommand.invoke(&session, vec![Value::Int(1)]).unwrap(), Value::text("int"));
        assert_eq!(TypeCommand.invoke(&session, vec![Value::Null]).unwrap(), Value::text("null"));
        assert_eq!(
            TypeCommand.invoke(&session, vec![Value::List(vec![])]).unwrap(),
            Value::text("list")
        );
    }
}
