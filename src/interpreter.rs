//! The opcode dispatch table and main execution loop.

pub mod arithmetic;
pub mod control;
pub mod misc;
pub mod registers;
pub mod stackio;

use crate::error::FatalError;
use crate::machine::Machine;
use lazy_static::lazy_static;
use std::collections::HashMap;
use tracing::debug;

type Handler = fn(&mut Machine) -> Result<(), FatalError>;

lazy_static! {
    static ref OPCODES: HashMap<u8, Handler> = {
        let mut m: HashMap<u8, Handler> = HashMap::new();
        m.insert(b'+', arithmetic::badd);
        m.insert(b'-', arithmetic::bsub);
        m.insert(b'*', arithmetic::bmul);
        m.insert(b'/', arithmetic::bdiv);
        m.insert(b'%', arithmetic::bmod);
        m.insert(b'~', arithmetic::bdivmod);
        m.insert(b'^', arithmetic::bexp);
        m.insert(b'v', arithmetic::bsqrt);
        m.insert(b'G', arithmetic::equal_numbers);
        m.insert(b'(', arithmetic::less_numbers);
        m.insert(b'{', arithmetic::lesseq_numbers);
        m.insert(b'N', arithmetic::not);

        m.insert(b'd', stackio::dup);
        m.insert(b'r', stackio::swap);
        m.insert(b'R', stackio::drop);
        m.insert(b'c', stackio::clear_stack);
        m.insert(b'p', stackio::print_tos);
        m.insert(b'n', stackio::pop_printn);
        m.insert(b'P', stackio::pop_print);
        m.insert(b'f', stackio::print_stack);
        m.insert(b'K', stackio::get_scale);
        m.insert(b'k', stackio::set_scale);
        m.insert(b'O', stackio::get_obase);
        m.insert(b'o', stackio::set_obase);
        m.insert(b'I', stackio::get_ibase);
        m.insert(b'i', stackio::set_ibase);
        m.insert(b'z', stackio::stackdepth);
        m.insert(b'X', stackio::push_scale);
        m.insert(b'Z', stackio::num_digits);
        m.insert(b'a', stackio::to_ascii);
        m.insert(b'e', stackio::print_err);

        m.insert(b'l', registers::load);
        m.insert(b's', registers::store);
        m.insert(b'L', registers::load_stack);
        m.insert(b'S', registers::store_stack);
        m.insert(b';', registers::load_array);
        m.insert(b':', registers::store_array);

        m.insert(b'x', control::eval_tos);
        m.insert(b'q', control::quit);
        m.insert(b'Q', control::quitn);
        m.insert(b'J', control::skipn);
        m.insert(b'M', control::mark);
        m.insert(b'<', control::less);
        m.insert(b'>', control::greater);
        m.insert(b'=', control::equal);
        m.insert(b'!', control::not_compare);

        m.insert(b'[', misc::push_line);
        m.insert(b'#', misc::comment);

        for b in b'0'..=b'9' {
            m.insert(b, misc::parse_number);
        }
        for b in b'A'..=b'F' {
            m.insert(b, misc::parse_number);
        }
        m.insert(b'.', misc::parse_number);
        m.insert(b'_', misc::parse_number);

        for ws in [b' ', b'\t', b'\n', b'\r'] {
            m.insert(ws, misc::nop);
        }

        m
    };
}

/// `?` requires a live stdin reader, so it is dispatched outside `OPCODES`.
fn dispatch_eval_line(m: &mut Machine) -> Result<(), FatalError> {
    control::eval_line(m, || {
        let mut line = String::new();
        let _ = std::io::stdin().read_line(&mut line);
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        line
    })
}

/// Executes one opcode byte against `m`.
fn step(m: &mut Machine, ch: u8) -> Result<(), FatalError> {
    if ch == b'?' {
        return dispatch_eval_line(m);
    }
    match OPCODES.get(&ch) {
        Some(handler) => handler(m),
        None => misc::unknown(m, ch),
    }
}

/// Runs `m` to completion: reads from the top macro frame, popping exhausted
/// frames until the stack itself is empty, checking the interrupt flag
/// between opcodes. Returns once the macro-execution stack is drained.
pub fn run(m: &mut Machine) -> Result<(), FatalError> {
    loop {
        if m.is_interrupted() {
            if m.readsp() > 0 {
                m.pop_source();
            } else {
                m.clear_interrupted();
            }
            continue;
        }

        match m.read_char() {
            Some(ch) => {
                debug!(opcode = %(ch as char), "dispatch");
                step(m, ch)?;
            }
            None => {
                if m.macro_depth() <= 1 {
                    m.pop_source();
                    return Ok(());
                }
                m.pop_source();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::StringSource;

    fn run_str(input: &str) -> Machine {
        let mut m = Machine::new(false, Box::new(Vec::new()), Box::new(Vec::new()));
        m.install_primary_source(Box::new(StringSource::new(input)));
        run(&mut m).unwrap();
        m
    }

    #[test]
    fn simple_addition() {
        let mut m = run_str("2 3 +");
        let v = m.stack.pop().unwrap().into_number().unwrap();
        assert_eq!(v.n, crate::int::Int::from_i64(5));
    }

    #[test]
    fn unknown_opcode_warns_and_continues() {
        let err = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        struct W(std::rc::Rc<std::cell::RefCell<Vec<u8>>>);
        impl std::io::Write for W {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.borrow_mut().write(buf)
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }
        let mut m = Machine::new(false, Box::new(Vec::new()), Box::new(W(err.clone())));
        m.install_primary_source(Box::new(StringSource::new("1@2+")));
        run(&mut m).unwrap();
        let v = m.stack.pop().unwrap().into_number().unwrap();
        assert_eq!(v.n, crate::int::Int::from_i64(3));
        let text = String::from_utf8(err.borrow().clone()).unwrap();
        assert!(text.contains("is unimplemented"));
    }

    #[derive(Clone, Default)]
    struct CapturedOut(std::rc::Rc<std::cell::RefCell<Vec<u8>>>);
    impl std::io::Write for CapturedOut {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().write(buf)
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Runs `input` to completion and returns whatever was written to the
    /// machine's standard output.
    fn run_capture(input: &str) -> String {
        let out = CapturedOut::default();
        let mut m = Machine::new(false, Box::new(out.clone()), Box::new(Vec::new()));
        m.install_primary_source(Box::new(StringSource::new(input)));
        run(&mut m).unwrap();
        String::from_utf8(out.0.borrow().clone()).unwrap()
    }

    #[test]
    fn scenario_1_addition() {
        assert_eq!(run_capture("2 3 + p"), "5\n");
    }

    #[test]
    fn scenario_2_division_at_scale() {
        assert_eq!(run_capture("10k 355 113 / p"), "3.1415929203\n");
    }

    #[test]
    fn scenario_3_exponentiation() {
        assert_eq!(run_capture("2 10 ^ p"), "1024\n");
    }

    #[test]
    fn scenario_4_square_root_at_scale() {
        assert_eq!(run_capture("10k 2 v p"), "1.4142135623\n");
    }

    #[test]
    fn scenario_5_raw_byte_string_print() {
        assert_eq!(run_capture("[abc]P"), "abc");
    }

    #[test]
    fn scenario_6_register_stack_roundtrip() {
        let mut m = Machine::new(false, Box::new(Vec::new()), Box::new(Vec::new()));
        m.install_primary_source(Box::new(StringSource::new("5 sa 7 La + p")));
        run(&mut m).unwrap();
        assert!(m.registers[b'a' as usize].pop().is_none());
    }

    #[test]
    fn scenario_6_prints_twelve() {
        assert_eq!(run_capture("5 sa 7 La + p"), "12\n");
    }

    #[test]
    fn scenario_7_conditional_dispatch() {
        assert_eq!(run_capture("[3]sa [2]sb 1 2 <a p"), "3\n");
    }

    #[test]
    fn scenario_8_repeated_nines_from_truncation() {
        assert_eq!(
            run_capture("20k 1 3 / 3 * p"),
            "0.99999999999999999999\n"
        );
    }

    #[test]
    fn scenario_9_truncate_to_ascii() {
        assert_eq!(run_capture("99 a p"), "c\n");
    }

    #[test]
    fn scenario_10_quit_from_nested_macro_stops_enclosing_program() {
        let out = CapturedOut::default();
        let mut m = Machine::new(false, Box::new(out.clone()), Box::new(Vec::new()));
        m.install_primary_source(Box::new(StringSource::new("[1 p q] x 2 p")));
        let result = run(&mut m);
        assert!(matches!(result, Err(crate::error::FatalError::Quit)));
        assert_eq!(String::from_utf8(out.0.borrow().clone()).unwrap(), "1\n");
    }
}

