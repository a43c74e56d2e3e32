//! Register access opcodes.

use crate::error::FatalError;
use crate::machine::{Machine, BAD_REGISTER};
use crate::number::Number;
use crate::stack::MAX_ARRAY_INDEX;
use crate::value::Value;

fn reg_index(m: &mut Machine) -> Option<usize> {
    let idx = m.read_register_index();
    if idx == BAD_REGISTER || idx as usize >= m.registers.len() {
        if idx != BAD_REGISTER {
            m.warn(format!("internal error: reg num = {}", idx));
        }
        None
    } else {
        Some(idx as usize)
    }
}

/// `l`: push a clone of register R's top, or zero if the register is empty.
pub fn load(m: &mut Machine) -> Result<(), FatalError> {
    let idx = match reg_index(m) {
        Some(i) => i,
        None => return Ok(()),
    };
    let v = match m.registers[idx].top() {
        Some(v) => v.clone(),
        None => Value::Num(Number::zero()),
    };
    m.stack.push(v);
    Ok(())
}

/// `s`: overwrite register R's top with the popped value (creating it if
/// the register is empty).
pub fn store(m: &mut Machine) -> Result<(), FatalError> {
    let idx = match reg_index(m) {
        Some(i) => i,
        None => return Ok(()),
    };
    if let Some(v) = m.stack.pop() {
        m.registers[idx].set_top(v);
    }
    Ok(())
}

/// `L`: pop register R's stack onto the main stack; warns if empty.
pub fn load_stack(m: &mut Machine) -> Result<(), FatalError> {
    let idx = match reg_index(m) {
        Some(i) => i,
        None => return Ok(()),
    };
    match m.registers[idx].pop() {
        Some(v) => m.stack.push(v),
        None => m.warn(format!("stack register '{}' (0{:o}) is empty", idx as u8 as char, idx)),
    }
    Ok(())
}

/// `S`: push the popped value onto register R's stack.
pub fn store_stack(m: &mut Machine) -> Result<(), FatalError> {
    let idx = match reg_index(m) {
        Some(i) => i,
        None => return Ok(()),
    };
    if let Some(v) = m.stack.pop() {
        m.registers[idx].push(v);
    }
    Ok(())
}

/// `;`: pop index; push a clone of register R's top-frame slot at that
/// index, or zero if unassigned.
pub fn load_array(m: &mut Machine) -> Result<(), FatalError> {
    let idx = match reg_index(m) {
        Some(i) => i,
        None => return Ok(()),
    };
    let inumber = match m.stack.pop().and_then(Value::into_number) {
        Some(n) => n,
        None => return Ok(()),
    };
    if inumber.n.sign() < 0 {
        m.warn("negative idx");
        return Ok(());
    }
    let array_idx = match inumber.get_ulong() {
        Some(v) if v <= MAX_ARRAY_INDEX => v,
        _ => {
            m.warn("idx too big");
            return Ok(());
        }
    };
    let v = m.registers[idx]
        .frame_retrieve(array_idx)
        .unwrap_or(Value::Num(Number::zero()));
    m.stack.push(v);
    Ok(())
}

/// `:`: pop index, pop value; frame_assign writes value at index in register
/// R's top-frame slot.
pub fn store_array(m: &mut Machine) -> Result<(), FatalError> {
    let idx = match reg_index(m) {
        Some(i) => i,
        None => return Ok(()),
    };
    let inumber = match m.stack.pop().and_then(Value::into_number) {
        Some(n) => n,
        None => return Ok(()),
    };
    let value = match m.stack.pop() {
        Some(v) => v,
        None => return Ok(()),
    };
    if inumber.n.sign() < 0 {
        m.warn("negative idx");
        return Ok(());
    }
    let array_idx = match inumber.get_ulong() {
        Some(v) if v <= MAX_ARRAY_INDEX => v,
        _ => {
            m.warn("idx too big");
            return Ok(());
        }
    };
    m.registers[idx].frame_assign(array_idx, value);
    Ok(())
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::source::StringSource;
    use proptest::prelude::*;

    proptest! {
        /// `v R s R l` yields a value equal to `v` for any register R.
        #[test]
        fn store_then_load_roundtrips_for_any_value(v in -1_000_000i64..1_000_000, reg in 0u8..=127u8) {
            // dc's literal syntax negates with a leading `_`, not `-` (that's subtraction).
            let literal = if v < 0 {
                format!("_{}", -v)
            } else {
                v.to_string()
            };
            let program = format!("{} s{} l{}", literal, reg as char, reg as char);
            let mut m = Machine::new(false, Box::new(Vec::new()), Box::new(Vec::new()));
            m.install_primary_source(Box::new(StringSource::new(program)));
            crate::interpreter::run(&mut m).unwrap();
            let result = m.stack.pop().unwrap().into_number().unwrap();
            prop_assert_eq!(result.n, crate::int::Int::from_i64(v));
        }
    }
}
