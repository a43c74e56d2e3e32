//! Stack manipulation and printing opcodes.

use crate::error::FatalError;
use crate::format::{print_ascii, print_value};
use crate::int::Int;
use crate::machine::Machine;
use crate::number::Number;
use crate::value::Value;

pub fn dup(m: &mut Machine) -> Result<(), FatalError> {
    m.stack.dup();
    Ok(())
}

pub fn swap(m: &mut Machine) -> Result<(), FatalError> {
    m.stack.swap();
    Ok(())
}

pub fn drop(m: &mut Machine) -> Result<(), FatalError> {
    m.stack.pop();
    Ok(())
}

pub fn clear_stack(m: &mut Machine) -> Result<(), FatalError> {
    m.stack.clear();
    Ok(())
}

pub fn print_tos(m: &mut Machine) -> Result<(), FatalError> {
    let obase = m.obase;
    match m.stack.top() {
        Some(v) => {
            let v = v.clone();
            print_value(m.out(), &v, "", obase);
            let _ = writeln!(m.out());
        }
        None => m.warn("stack empty"),
    }
    Ok(())
}

pub fn print_err(m: &mut Machine) -> Result<(), FatalError> {
    let obase = m.obase;
    match m.stack.top() {
        Some(v) => {
            let v = v.clone();
            let mut buf = Vec::new();
            print_value(&mut buf, &v, "", obase);
            m.warn(String::from_utf8_lossy(&buf));
        }
        None => m.warn("stack empty"),
    }
    Ok(())
}

pub fn pop_print(m: &mut Machine) -> Result<(), FatalError> {
    let v = match m.stack.pop() {
        Some(v) => v,
        None => return Ok(()),
    };
    let v = match v {
        Value::Empty => return Ok(()),
        Value::Num(mut n) => {
            n.normalize(0);
            Value::Num(n)
        }
        other => other,
    };
    print_ascii(m.out(), &v);
    Ok(())
}

pub fn pop_printn(m: &mut Machine) -> Result<(), FatalError> {
    let obase = m.obase;
    if let Some(v) = m.stack.pop() {
        print_value(m.out(), &v, "", obase);
    }
    Ok(())
}

pub fn print_stack(m: &mut Machine) -> Result<(), FatalError> {
    let obase = m.obase;
    let values: Vec<Value> = m.stack.iter_top_to_bottom().cloned().collect();
    for v in values {
        print_value(m.out(), &v, "", obase);
        let _ = writeln!(m.out());
    }
    Ok(())
}

pub fn get_scale(m: &mut Machine) -> Result<(), FatalError> {
    m.stack.push(Value::Num(Number::from_i64(m.scale as i64)));
    Ok(())
}

pub fn set_scale(m: &mut Machine) -> Result<(), FatalError> {
    let n = match m.stack.pop().and_then(Value::into_number) {
        Some(n) => n,
        None => return Ok(()),
    };
    if n.n.sign() < 0 {
        m.warn("scale must be a nonnegative number");
    } else {
        match n.get_ulong() {
            Some(v) if v <= u32::MAX as u64 => m.scale = v as u32,
            _ => m.warn("scale too large"),
        }
    }
    Ok(())
}

pub fn get_obase(m: &mut Machine) -> Result<(), FatalError> {
    m.stack.push(Value::Num(Number::from_i64(m.obase as i64)));
    Ok(())
}

pub fn set_obase(m: &mut Machine) -> Result<(), FatalError> {
    let n = match m.stack.pop().and_then(Value::into_number) {
        Some(n) => n,
        None => return Ok(()),
    };
    match n.get_ulong() {
        Some(v) if v > 1 && v <= u32::MAX as u64 => m.obase = v as u32,
        _ => m.warn("output base must be a number greater than 1"),
    }
    Ok(())
}

pub fn get_ibase(m: &mut Machine) -> Result<(), FatalError> {
    m.stack.push(Value::Num(Number::from_i64(m.ibase as i64)));
    Ok(())
}

pub fn set_ibase(m: &mut Machine) -> Result<(), FatalError> {
    let n = match m.stack.pop().and_then(Value::into_number) {
        Some(n) => n,
        None => return Ok(()),
    };
    match n.get_ulong() {
        Some(v) if (2..=16).contains(&v) => m.ibase = v as u32,
        _ => m.warn("input base must be a number between 2 and 16 (inclusive)"),
    }
    Ok(())
}

pub fn stackdepth(m: &mut Machine) -> Result<(), FatalError> {
    let depth = m.stack.depth() as i64;
    m.stack.push(Value::Num(Number::from_i64(depth)));
    Ok(())
}

/// `X`: pushes the top value's `scale` attribute (strings: 0), consuming it.
pub fn push_scale(m: &mut Machine) -> Result<(), FatalError> {
    let v = match m.stack.pop() {
        Some(v) => v,
        None => return Ok(()),
    };
    if matches!(v, Value::Empty) {
        return Ok(());
    }
    let scale = v.scale();
    m.stack.push(Value::Num(Number::from_i64(scale as i64)));
    Ok(())
}

/// `Z`: digit count for a Number, byte length for a String.
pub fn num_digits(m: &mut Machine) -> Result<(), FatalError> {
    let v = match m.stack.pop() {
        Some(v) => v,
        None => return Ok(()),
    };
    if matches!(v, Value::Empty) {
        return Ok(());
    }
    let len = v.length();
    m.stack.push(Value::Num(Number::from_i64(len as i64)));
    Ok(())
}

/// `a`: Number truncates to its integer part and takes the low byte; String
/// takes its first byte. Either way a one-byte String is pushed.
pub fn to_ascii(m: &mut Machine) -> Result<(), FatalError> {
    let v = match m.stack.pop() {
        Some(v) => v,
        None => return Ok(()),
    };
    let byte = match v {
        Value::Empty => return Ok(()),
        Value::Num(mut n) => {
            n.normalize(0);
            n.n.get_ui().unwrap_or(0) as u8
        }
        Value::Str(s) => s.as_bytes().first().copied().unwrap_or(0),
    };
    let mut s = String::new();
    s.push(byte as char);
    m.stack.push(Value::Str(s));
    Ok(())
}

use std::io::Write;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::StringSource;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn run(input: &str) -> Machine {
        let mut m = Machine::new(false, Box::new(Vec::new()), Box::new(Vec::new()));
        m.install_primary_source(Box::new(StringSource::new(input)));
        crate::interpreter::run(&mut m).unwrap();
        m
    }

    #[derive(Clone, Default)]
    struct SharedBuf(Rc<RefCell<Vec<u8>>>);
    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().write(buf)
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn dup_then_depth_is_two() {
        let m = run("5d");
        assert_eq!(m.stack.depth(), 2);
    }

    #[test]
    fn clear_then_depth_is_zero() {
        let m = run("1 2 3cz");
        let n = match &m.stack.iter_top_to_bottom().next() {
            Some(Value::Num(n)) => n.n.clone(),
            _ => panic!("expected a number"),
        };
        assert_eq!(n, Int::from_i64(0));
    }

    #[test]
    fn to_ascii_truncates_to_low_byte() {
        let mut m = run("99a");
        let s = m.stack.pop().unwrap().into_string().unwrap();
        assert_eq!(s, "c");
    }

    #[test]
    fn set_scale_rejects_negative() {
        let err_buf = SharedBuf::default();
        let mut m = Machine::new(false, Box::new(Vec::new()), Box::new(err_buf.clone()));
        m.install_primary_source(Box::new(StringSource::new("_1k")));
        crate::interpreter::run(&mut m).unwrap();
        assert_eq!(m.scale, 0);
        let text = String::from_utf8(err_buf.0.borrow().clone()).unwrap();
        assert!(text.contains("scale must be a nonnegative number"));
    }
}
