//! Macro execution and conditional dispatch.

use crate::error::FatalError;
use crate::machine::{Machine, BAD_REGISTER};
use crate::number::compare;
use crate::source::StringSource;
use crate::value::Value;
use std::cmp::Ordering;

/// `x`: if the popped value is a String, executes it as a macro. A Number
/// or Empty is a silent no-op.
pub fn eval_tos(m: &mut Machine) -> Result<(), FatalError> {
    let v = match m.stack.pop() {
        Some(v) => v,
        None => return Ok(()),
    };
    if let Some(s) = v.into_string() {
        m.eval_string(Box::new(StringSource::new(s)))?;
    }
    Ok(())
}

/// `?`: reads one line from standard input and evaluates it.
pub fn eval_line(m: &mut Machine, stdin_line: impl FnOnce() -> String) -> Result<(), FatalError> {
    let line = stdin_line();
    m.eval_string(Box::new(StringSource::new(line)))
}

/// `q`: pops two macro frames, or signals a clean exit if fewer than two
/// remain.
pub fn quit(m: &mut Machine) -> Result<(), FatalError> {
    if m.readsp() < 2 {
        return Err(FatalError::Quit);
    }
    m.pop_source();
    m.pop_source();
    Ok(())
}

/// `Q`: pops a count and pops that many frames; warns on a count < 1 or
/// exceeding the current depth.
pub fn quitn(m: &mut Machine) -> Result<(), FatalError> {
    let n = match m.stack.pop().and_then(Value::into_number) {
        Some(n) => n,
        None => return Ok(()),
    };
    let i = match n.get_ulong() {
        Some(i) if i >= 1 => i,
        _ => {
            m.warn("Q command requires a number >= 1");
            return Ok(());
        }
    };
    if m.readsp() < i as usize {
        m.warn("Q command argument exceeded string execution depth");
        return Ok(());
    }
    for _ in 0..i {
        m.pop_source();
    }
    Ok(())
}

/// `J`: pops a count, pops that many frames, then scans forward for `M`.
pub fn skipn(m: &mut Machine) -> Result<(), FatalError> {
    let n = match m.stack.pop().and_then(Value::into_number) {
        Some(n) => n,
        None => return Ok(()),
    };
    let i = match n.get_ulong() {
        Some(i) => i,
        None => {
            m.warn("J command requires a number >= 0");
            return Ok(());
        }
    };
    if i > 0 && m.readsp() < i as usize {
        m.warn("J command argument exceeded string execution depth");
        return Ok(());
    }
    for _ in 0..i {
        m.pop_source();
    }
    skip_until_mark(m)
}

pub fn mark(_m: &mut Machine) -> Result<(), FatalError> {
    Ok(())
}

/// Scans forward past opcodes with in-stream arguments (register bytes,
/// bracketed strings, `!`'s line-consuming deprecated form) until `M`.
/// Running off the end of input is fatal.
pub fn skip_until_mark(m: &mut Machine) -> Result<(), FatalError> {
    loop {
        let ch = match m.read_char() {
            Some(c) => c,
            None => return Err(FatalError::MarkNotFound),
        };
        match ch {
            b'M' => return Ok(()),
            b'l' | b'L' | b's' | b'S' | b':' | b';' | b'<' | b'>' | b'=' => {
                skip_register_and_optional_else(m);
            }
            b'[' => {
                m.read_bracketed_string();
            }
            b'!' => match m.read_char() {
                Some(b'<') | Some(b'>') | Some(b'=') => {
                    skip_register_and_optional_else(m);
                }
                _ => {
                    m.read_line();
                }
            },
            _ => {}
        }
    }
}

fn skip_register_and_optional_else(m: &mut Machine) {
    let _ = m.read_register_index();
    match m.read_char() {
        Some(b'e') => {
            let _ = m.read_register_index();
        }
        Some(_) => m.unread_char(),
        None => {}
    }
}

#[derive(Clone, Copy)]
pub enum CompareKind {
    Equal,
    NotEqual,
    Less,
    NotLess,
    Greater,
    NotGreater,
}

/// `<R` tests `b < a`, matching `-`/`/`, which compute `b - a`/`b ÷ a`.
fn compare_numbers(kind: CompareKind, a_cmp_b: Ordering) -> bool {
    match kind {
        CompareKind::Equal => a_cmp_b == Ordering::Equal,
        CompareKind::NotEqual => a_cmp_b != Ordering::Equal,
        CompareKind::Less => a_cmp_b == Ordering::Greater,
        CompareKind::NotLess => a_cmp_b != Ordering::Greater,
        CompareKind::Greater => a_cmp_b == Ordering::Less,
        CompareKind::NotGreater => a_cmp_b != Ordering::Less,
    }
}

/// Shared body of `<`, `>`, `=`, `!<`, `!>`, `!=`.
fn do_compare(m: &mut Machine, kind: CompareKind) -> Result<(), FatalError> {
    const NO_ELSE: i64 = -2;
    let idx = m.read_register_index();
    let else_idx = match m.read_char() {
        Some(b'e') => m.read_register_index(),
        Some(_) => {
            m.unread_char();
            NO_ELSE
        }
        None => NO_ELSE,
    };

    let a = match m.stack.pop().and_then(Value::into_number) {
        Some(n) => n,
        None => return Ok(()),
    };
    let b = match m.stack.pop() {
        Some(v) => v,
        None => {
            m.stack.push(Value::Num(a));
            return Ok(());
        }
    };
    let b = match b.into_number() {
        Some(n) => n,
        None => return Ok(()),
    };

    let ok = compare_numbers(kind, compare(&a, &b));

    let target = if ok {
        idx
    } else if else_idx != NO_ELSE {
        else_idx
    } else {
        BAD_REGISTER
    };

    if target == BAD_REGISTER || target as usize >= m.registers.len() {
        return Ok(());
    }
    let reg = target as usize;
    match m.registers[reg].top().cloned() {
        None => m.warn(format!("register '{}' (0{:o}) is empty", reg as u8 as char, reg)),
        Some(Value::Empty) => m.warn(format!("register '{}' (0{:o}) is empty", reg as u8 as char, reg)),
        Some(Value::Num(_)) => m.warn("eval called with non-string argument"),
        Some(Value::Str(s)) => m.eval_string(Box::new(StringSource::new(s)))?,
    }
    Ok(())
}

pub fn less(m: &mut Machine) -> Result<(), FatalError> {
    do_compare(m, CompareKind::Less)
}

pub fn greater(m: &mut Machine) -> Result<(), FatalError> {
    do_compare(m, CompareKind::Greater)
}

pub fn equal(m: &mut Machine) -> Result<(), FatalError> {
    do_compare(m, CompareKind::Equal)
}

/// `!`: dispatches to the negated comparisons, or (for any other following
/// byte) emits the deprecation warning and pushes the byte back.
pub fn not_compare(m: &mut Machine) -> Result<(), FatalError> {
    match m.read_char() {
        Some(b'<') => do_compare(m, CompareKind::NotLess),
        Some(b'>') => do_compare(m, CompareKind::NotGreater),
        Some(b'=') => do_compare(m, CompareKind::NotEqual),
        Some(_) => {
            m.unread_char();
            m.warn("! command is deprecated");
            Ok(())
        }
        None => {
            m.warn("! command is deprecated");
            Ok(())
        }
    }
}
