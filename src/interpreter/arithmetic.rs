//! Arithmetic opcodes plus the boolean comparison opcodes.

use crate::error::FatalError;
use crate::int::Int;
use crate::machine::Machine;
use crate::number::{compare, Number};
use crate::value::Value;
use std::cmp::Ordering;

/// Pops the right operand (`a`), then the left (`b`). If only `a` is
/// present, it's restored and the caller treats this as a no-op.
fn pop_two_numbers(m: &mut Machine) -> Option<(Number, Number)> {
    let a = m.stack.pop()?;
    let a = match a.into_number() {
        Some(n) => n,
        None => return None,
    };
    let b = match m.stack.pop() {
        Some(v) => v,
        None => {
            m.stack.push(Value::Num(a));
            return None;
        }
    };
    let b = match b.into_number() {
        Some(n) => n,
        None => {
            m.stack.push(Value::Num(a));
            return None;
        }
    };
    Some((a, b))
}

pub fn badd(m: &mut Machine) -> Result<(), FatalError> {
    if let Some((mut a, mut b)) = pop_two_numbers(m) {
        let scale = a.scale.max(b.scale);
        a.normalize(scale);
        b.normalize(scale);
        b.n = &b.n + &a.n;
        m.stack.push(Value::Num(b));
    }
    Ok(())
}

pub fn bsub(m: &mut Machine) -> Result<(), FatalError> {
    if let Some((mut a, mut b)) = pop_two_numbers(m) {
        let scale = a.scale.max(b.scale);
        a.normalize(scale);
        b.normalize(scale);
        b.n = &b.n - &a.n;
        m.stack.push(Value::Num(b));
    }
    Ok(())
}

/// `r.scale = a.scale + b.scale`, truncated to `normalize_cap` only if it
/// exceeds `machine_scale` and both operand scales.
fn mul_number(a: &Number, b: &Number, normalize_cap: u32, machine_scale: u32) -> Number {
    let mut r = Number {
        n: &a.n * &b.n,
        scale: a.scale + b.scale,
    };
    if r.scale > machine_scale && r.scale > a.scale && r.scale > b.scale {
        r.normalize(normalize_cap.max(a.scale.max(b.scale)));
    }
    r
}

pub fn bmul(m: &mut Machine) -> Result<(), FatalError> {
    if let Some((a, b)) = pop_two_numbers(m) {
        let r = mul_number(&a, &b, m.scale, m.scale);
        m.stack.push(Value::Num(r));
    }
    Ok(())
}

pub fn bdiv(m: &mut Machine) -> Result<(), FatalError> {
    if let Some((mut a, mut b)) = pop_two_numbers(m) {
        let rscale = m.scale;
        let scale = a.scale.max(b.scale);
        if a.is_zero() {
            m.warn("divide by zero");
            m.stack.push(Value::Num(Number {
                n: Int::zero(),
                scale: rscale,
            }));
        } else {
            a.normalize(scale);
            b.normalize(scale + rscale);
            let q = b.n.div_q(&a.n);
            m.stack.push(Value::Num(Number { n: q, scale: rscale }));
        }
    }
    Ok(())
}

pub fn bmod(m: &mut Machine) -> Result<(), FatalError> {
    if let Some((mut a, mut b)) = pop_two_numbers(m) {
        let rscale = b.scale.max(a.scale + m.scale);
        let scale = a.scale.max(b.scale);
        if a.is_zero() {
            m.warn("remainder by zero");
            m.stack.push(Value::Num(Number {
                n: Int::zero(),
                scale: rscale,
            }));
        } else {
            a.normalize(scale);
            b.normalize(scale + m.scale);
            let r = b.n.div_r(&a.n);
            m.stack.push(Value::Num(Number { n: r, scale: rscale }));
        }
    }
    Ok(())
}

pub fn bdivmod(m: &mut Machine) -> Result<(), FatalError> {
    if let Some((mut a, mut b)) = pop_two_numbers(m) {
        let div_scale = m.scale;
        let mod_scale = b.scale.max(a.scale + m.scale);
        let scale = a.scale.max(b.scale);
        if a.is_zero() {
            m.warn("divide by zero");
            m.stack.push(Value::Num(Number {
                n: Int::zero(),
                scale: div_scale,
            }));
            m.stack.push(Value::Num(Number {
                n: Int::zero(),
                scale: mod_scale,
            }));
        } else {
            a.normalize(scale);
            b.normalize(scale + m.scale);
            let (q, r) = b.n.div_qr(&a.n);
            m.stack.push(Value::Num(Number {
                n: q,
                scale: div_scale,
            }));
            m.stack.push(Value::Num(Number {
                n: r,
                scale: mod_scale,
            }));
        }
    }
    Ok(())
}

pub fn bexp(m: &mut Machine) -> Result<(), FatalError> {
    let (mut p, mut a) = match pop_two_numbers(m) {
        Some(pair) => pair,
        None => return Ok(()),
    };

    if p.scale != 0 {
        let (i, f) = p.split();
        if !f.is_zero() {
            m.warn("Runtime warning: non-zero fractional part in exponent");
        }
        p.n = i;
    }

    let neg = p.n.sign() < 0;
    if neg {
        p.n.neg();
    }

    let rscale = if neg {
        m.scale
    } else {
        let bound = a.scale.max(m.scale);
        match p.n.get_ui() {
            Some(e) => {
                let product = a.scale as u128 * e as u128;
                if product > bound as u128 {
                    bound
                } else {
                    product as u32
                }
            }
            // Exponent too large to fit a u64: fall back to the conservative clamp.
            None => bound,
        }
    };

    let r = if p.n.is_zero() {
        let mut one = Number::from_i64(1);
        one.normalize(rscale);
        one
    } else {
        let mut ascale = a.scale;
        while !p.n.test_bit(0) {
            ascale *= 2;
            a = mul_number(&a, &a, ascale, m.scale);
            p.n = p.n.shr(1);
        }

        let mut r = a.clone();
        p.n = p.n.shr(1);

        let mut mscale = ascale;
        while !p.n.is_zero() {
            ascale *= 2;
            a = mul_number(&a, &a, ascale, m.scale);
            if p.n.test_bit(0) {
                mscale += ascale;
                r = mul_number(&r, &a, mscale, m.scale);
            }
            p.n = p.n.shr(1);
        }

        if neg {
            if r.n.is_zero() {
                m.warn("divide by zero");
                r.n = Int::zero();
            } else {
                let one = crate::number::scale_number(&Int::from_u64(1), (r.scale + rscale) as i64);
                r.n = one.div_q(&r.n);
            }
            r.scale = rscale;
        } else {
            r.normalize(rscale);
        }
        r
    };

    m.stack.push(Value::Num(r));
    Ok(())
}

/// Newton's method, seeded with `n >> (bits(n)/2)`, terminating when the
/// running delta reaches zero or equals one twice.
pub fn bsqrt(m: &mut Machine) -> Result<(), FatalError> {
    let n = match m.stack.pop() {
        Some(v) => v,
        None => return Ok(()),
    };
    let mut n = match n.into_number() {
        Some(n) => n,
        None => return Ok(()),
    };

    if n.is_zero() {
        m.stack.push(Value::Num(Number::zero()));
        return Ok(());
    }
    if n.n.sign() < 0 {
        m.warn("square root of negative number");
        return Ok(());
    }

    let scale = m.scale.max(n.scale);
    n.normalize(2 * scale);

    let one = Int::from_u64(1);
    let mut x = n.n.shr(n.n.bits() / 2);
    let mut y;
    let mut onecount = 0u32;
    loop {
        y = n.n.div_q(&x);
        y = &x + &y;
        y = y.shr(1);
        let diff = &y - &x;
        x = y;
        y = diff;
        if y.is_zero() {
            break;
        }
        if y == one {
            onecount += 1;
            if onecount >= 2 {
                break;
            }
        }
    }
    let result = &x - &y;
    m.stack.push(Value::Num(Number {
        n: result,
        scale,
    }));
    Ok(())
}

fn push_bool(m: &mut Machine, v: bool) {
    m.stack.push(Value::Num(Number::from_i64(if v { 1 } else { 0 })));
}

/// `G`: pop `a`, `b`; push `1` if `b == a`.
pub fn equal_numbers(m: &mut Machine) -> Result<(), FatalError> {
    if let Some((a, b)) = pop_two_numbers(m) {
        push_bool(m, compare(&a, &b) == Ordering::Equal);
    }
    Ok(())
}

/// `(`: pop `a`, `b`; push `1` if `b < a` (the same left/right convention as
/// `-`, which computes `b - a`).
pub fn less_numbers(m: &mut Machine) -> Result<(), FatalError> {
    if let Some((a, b)) = pop_two_numbers(m) {
        push_bool(m, compare(&a, &b) == Ordering::Greater);
    }
    Ok(())
}

/// `{`: pop `a`, `b`; push `1` if `b <= a`.
pub fn lesseq_numbers(m: &mut Machine) -> Result<(), FatalError> {
    if let Some((a, b)) = pop_two_numbers(m) {
        push_bool(m, compare(&a, &b) != Ordering::Less);
    }
    Ok(())
}

/// `N`: logical NOT. Pops `a`; pushes `1` if `a == 0` else `0`.
pub fn not(m: &mut Machine) -> Result<(), FatalError> {
    let v = match m.stack.pop() {
        Some(v) => v,
        None => return Ok(()),
    };
    if let Some(n) = v.into_number() {
        m.stack.push(Value::Num(Number::from_i64(if n.is_zero() { 1 } else { 0 })));
    }
    Ok(())
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::source::StringSource;
    use proptest::prelude::*;
    use std::cmp::Ordering;

    fn eval_at_scale20(program: &str) -> Number {
        let mut m = Machine::new(false, Box::new(Vec::new()), Box::new(Vec::new()));
        m.scale = 20;
        m.install_primary_source(Box::new(StringSource::new(program)));
        crate::interpreter::run(&mut m).unwrap();
        m.stack.pop().unwrap().into_number().unwrap()
    }

    // dc's literal syntax negates with a leading `_`, not `-` (that's subtraction).
    fn literal(v: i64) -> String {
        if v < 0 {
            format!("_{}", -v)
        } else {
            v.to_string()
        }
    }

    proptest! {
        /// `(a+b)-b == a` at scale 20.
        #[test]
        fn add_then_subtract_roundtrips(a in -100_000i64..100_000, b in -100_000i64..100_000) {
            let result = eval_at_scale20(&format!("{} {} + {} -", literal(a), literal(b), literal(b)));
            prop_assert_eq!(result.n, Int::from_i64(a));
            prop_assert_eq!(result.scale, 0);
        }

        /// `a e ^` then dividing by `a` `e` times yields 1, for a non-zero
        /// base and exponent up to 16.
        #[test]
        fn exponent_then_repeated_division_yields_one(a in 1i64..50, e in 0u32..16) {
            let mut program = format!("{} {} ^", a, e);
            for _ in 0..e {
                program.push_str(&format!(" {} /", a));
            }
            let result = eval_at_scale20(&program);
            prop_assert_eq!(compare(&result, &Number::from_i64(1)), Ordering::Equal);
        }
    }
}
