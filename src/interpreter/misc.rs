//! Literal parsing and the remaining miscellaneous opcodes.

use crate::error::FatalError;
use crate::machine::Machine;
use crate::value::Value;

/// `[`: reads a balanced bracketed string and pushes it as a String.
pub fn push_line(m: &mut Machine) -> Result<(), FatalError> {
    let s = m.read_bracketed_string();
    m.stack.push(Value::Str(s));
    Ok(())
}

/// `#`: discards the remainder of the current line.
pub fn comment(m: &mut Machine) -> Result<(), FatalError> {
    m.read_line();
    Ok(())
}

/// Digits, `.`, and leading `_` all route here: push back the triggering
/// byte and delegate to the source's digit-run reader.
pub fn parse_number(m: &mut Machine) -> Result<(), FatalError> {
    m.unread_char();
    let n = m.read_number();
    m.stack.push(Value::Num(n));
    Ok(())
}

/// Whitespace and `M` (outside a `J` scan) are no-ops.
pub fn nop(_m: &mut Machine) -> Result<(), FatalError> {
    Ok(())
}

/// An unmapped byte.
pub fn unknown(m: &mut Machine, ch: u8) -> Result<(), FatalError> {
    m.warn(format!("{} (0{:o}) is unimplemented", ch as char, ch));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::StringSource;

    fn run(input: &str) -> Machine {
        let mut m = Machine::new(false, Box::new(Vec::new()), Box::new(Vec::new()));
        m.install_primary_source(Box::new(StringSource::new(input)));
        crate::interpreter::run(&mut m).unwrap();
        m
    }

    #[test]
    fn bracketed_string_becomes_a_value() {
        let mut m = run("[abc]");
        assert_eq!(m.stack.pop().unwrap().into_string().unwrap(), "abc");
    }

    #[test]
    fn comment_discards_rest_of_line() {
        let mut m = run("1 #2 3\n4");
        let v = m.stack.pop().unwrap().into_number().unwrap();
        assert_eq!(v.n, crate::int::Int::from_i64(4));
        let v2 = m.stack.pop().unwrap().into_number().unwrap();
        assert_eq!(v2.n, crate::int::Int::from_i64(1));
    }

    #[test]
    fn leading_underscore_parses_negative_literal() {
        let mut m = run("_5");
        let v = m.stack.pop().unwrap().into_number().unwrap();
        assert_eq!(v.n, crate::int::Int::from_i64(-5));
    }
}
