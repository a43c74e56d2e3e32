//! Global interpreter state and the macro-execution stack, owned by a single
//! context threaded through the interpreter by exclusive reference.

use crate::error::FatalError;
use crate::number::Number;
use crate::source::Source;
use crate::stack::Stack;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

pub const REG_COUNT_COMPACT: usize = 256;
/// 256 one-byte registers plus 65536 two-byte ones.
pub const REG_COUNT_EXTENDED: usize = 256 + 65536;

const INITIAL_MACRO_STACK_CAPACITY: usize = 8;

pub const BAD_REGISTER: i64 = -1;

/// Radixes, working scale, the main stack, the register array, and the
/// macro-execution stack.
pub struct Machine {
    pub ibase: u32,
    pub obase: u32,
    pub scale: u32,
    pub stack: Stack,
    pub registers: Vec<Stack>,
    pub extended_regs: bool,
    macro_stack: Vec<Box<dyn Source>>,
    pub interrupted: Arc<AtomicBool>,
    out: Box<dyn Write>,
    err: Box<dyn Write>,
}

impl Machine {
    pub fn new(extended_regs: bool, out: Box<dyn Write>, err: Box<dyn Write>) -> Machine {
        let reg_count = if extended_regs {
            REG_COUNT_EXTENDED
        } else {
            REG_COUNT_COMPACT
        };
        let mut registers = Vec::with_capacity(reg_count);
        registers.resize_with(reg_count, Stack::new);
        Machine {
            ibase: 10,
            obase: 10,
            scale: 0,
            stack: Stack::new(),
            registers,
            extended_regs,
            macro_stack: Vec::with_capacity(INITIAL_MACRO_STACK_CAPACITY),
            interrupted: Arc::new(AtomicBool::new(false)),
            out,
            err,
        }
    }

    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupted)
    }

    pub fn out(&mut self) -> &mut dyn Write {
        &mut *self.out
    }

    pub fn warn(&mut self, msg: impl std::fmt::Display) {
        let _ = writeln!(self.err, "{}", msg);
    }

    pub fn readsp(&self) -> usize {
        self.macro_stack.len().saturating_sub(1)
    }

    pub fn macro_depth(&self) -> usize {
        self.macro_stack.len()
    }

    fn top_source(&mut self) -> Option<&mut Box<dyn Source>> {
        self.macro_stack.last_mut()
    }

    /// Must be called exactly once, before interpretation starts.
    pub fn install_primary_source(&mut self, src: Box<dyn Source>) {
        self.macro_stack.push(src);
    }

    pub fn read_char(&mut self) -> Option<u8> {
        self.top_source().and_then(|s| s.read_char())
    }

    pub fn unread_char(&mut self) {
        if let Some(s) = self.top_source() {
            s.unread_char();
        }
    }

    pub fn read_line(&mut self) -> String {
        self.top_source().map(|s| s.read_line()).unwrap_or_default()
    }

    pub fn read_bracketed_string(&mut self) -> String {
        self.top_source()
            .map(|s| s.read_bracketed_string())
            .unwrap_or_default()
    }

    pub fn read_number(&mut self) -> Number {
        let ibase = self.ibase;
        self.top_source()
            .map(|s| s.read_number(ibase))
            .unwrap_or_else(Number::zero)
    }

    pub fn lastchar(&self) -> Option<u8> {
        self.macro_stack.last().and_then(|s| s.lastchar())
    }

    fn current_source_has_more(&mut self) -> bool {
        if self.macro_stack.is_empty() {
            return false;
        }
        let ch = self.read_char();
        if ch.is_some() {
            self.unread_char();
            true
        } else {
            false
        }
    }

    /// Below the outermost frame, an exhausted current source is replaced in
    /// place (tail call) instead of pushed, so tail-recursive macros run in
    /// bounded stack depth. The outermost frame always pushes.
    pub fn eval_string(&mut self, src: Box<dyn Source>) -> Result<(), FatalError> {
        if self.macro_stack.len() > 1 {
            if self.current_source_has_more() {
                trace!(depth = self.macro_stack.len() + 1, "macro push");
                self.push_frame(src)?;
            } else {
                trace!(depth = self.macro_stack.len(), "tail call");
                *self.macro_stack.last_mut().unwrap() = src;
            }
        } else {
            trace!(depth = self.macro_stack.len() + 1, "macro push");
            self.push_frame(src)?;
        }
        Ok(())
    }

    fn push_frame(&mut self, src: Box<dyn Source>) -> Result<(), FatalError> {
        if self.macro_stack.len() == self.macro_stack.capacity() {
            let additional = self.macro_stack.capacity().max(1);
            self.macro_stack
                .try_reserve(additional)
                .map_err(|_| FatalError::RecursionTooDeep)?;
        }
        self.macro_stack.push(src);
        Ok(())
    }

    pub fn pop_source(&mut self) {
        if self.macro_stack.pop().is_some() {
            debug!(depth = self.macro_stack.len(), "macro pop");
        }
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    pub fn clear_interrupted(&self) {
        self.interrupted.store(false, Ordering::SeqCst);
    }

    /// A single byte, or in extended mode a `0xFF` escape followed by a
    /// two-byte big-endian offset added to 256.
    pub fn read_register_index(&mut self) -> i64 {
        let b = match self.read_char() {
            Some(b) => b,
            None => return BAD_REGISTER,
        };
        if b == 0xFF && self.extended_regs {
            let h = self.read_char();
            let l = self.read_char();
            match (h, l) {
                (Some(h), Some(l)) => ((h as i64) << 8) + l as i64 + 256,
                _ => {
                    self.warn("unexpected eof");
                    BAD_REGISTER
                }
            }
        } else {
            b as i64
        }
    }
}
