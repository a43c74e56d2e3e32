//! The textual formatter: renders a scaled Number in an arbitrary output
//! base with line-width wrapping.

use crate::number::Number;
use crate::value::Value;
use std::io::Write;

/// Column width at which output wraps with a backslash-newline continuation,
/// matching the traditional `bc`/`dc` `LINE_LENGTH` convention.
pub const LINE_WIDTH: usize = 70;

fn digit_char(d: u32) -> char {
    if d < 10 {
        (b'0' + d as u8) as char
    } else {
        (b'A' + (d - 10) as u8) as char
    }
}

/// Renders `n` in `obase`. For `obase <= 16` digits are `0-9A-F`; for larger
/// bases each positional digit is rendered as a space-separated decimal
/// number.
pub fn format_number(n: &Number, obase: u32) -> String {
    let (int_part, frac_part) = n.split();
    let negative = int_part.sign() < 0 || (int_part.is_zero() && n.n.sign() < 0);

    let mut int_digits = digits_in_base(&int_part, obase);
    if int_digits.is_empty() {
        int_digits.push(0);
    }

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    push_digits(&mut out, &int_digits, obase);

    if n.scale > 0 {
        out.push('.');
        let frac_digits = fraction_digits_in_base(&frac_part, n.scale, obase);
        push_digits(&mut out, &frac_digits, obase);
    }
    out
}

fn push_digits(out: &mut String, digits: &[u32], obase: u32) {
    if obase <= 16 {
        for d in digits {
            out.push(digit_char(*d));
        }
    } else {
        let rendered: Vec<String> = digits.iter().map(|d| d.to_string()).collect();
        out.push_str(&rendered.join(" "));
    }
}

fn digits_in_base(n: &crate::int::Int, base: u32) -> Vec<u32> {
    if n.is_zero() {
        return Vec::new();
    }
    let mut n = n.clone();
    if n.sign() < 0 {
        n.neg();
    }
    let b = crate::int::Int::from_u64(base as u64);
    let mut digits = Vec::new();
    while !n.is_zero() {
        let (q, r) = n.div_qr(&b);
        digits.push(r.get_ui().unwrap_or(0) as u32);
        n = q;
    }
    digits.reverse();
    digits
}

/// Renders the fractional part (a non-negative integer < 10^scale) as
/// `scale`-equivalent digits in `base`, by repeatedly multiplying by `base`
/// and taking the integer part, the standard radix-conversion algorithm for
/// fractions.
fn fraction_digits_in_base(frac: &crate::int::Int, scale: u32, base: u32) -> Vec<u32> {
    // frac / 10^scale is the fractional value; convert by repeated
    // multiplication, using scale decimal digits of output precision.
    let ten_scale = crate::int::Int::pow_ui(10, scale as u64);
    let mut remainder = frac.clone();
    let mut digits = Vec::with_capacity(scale as usize);
    for _ in 0..scale {
        remainder = remainder.mul_ui(base as u64);
        let (d, r) = remainder.div_qr(&ten_scale);
        digits.push(d.get_ui().unwrap_or(0) as u32);
        remainder = r;
    }
    digits
}

/// Writes `v` to `out`, line-wrapping at `LINE_WIDTH` columns with a
/// `\`-newline continuation. Does not emit a trailing newline; callers (`p`,
/// `n`) decide that.
pub fn print_value(out: &mut dyn Write, v: &Value, prefix: &str, obase: u32) {
    let text = match v {
        Value::Num(n) => format_number(n, obase),
        Value::Str(s) => s.clone(),
        Value::Empty => String::new(),
    };
    let mut col = 0usize;
    let _ = write!(out, "{}", prefix);
    for ch in text.chars() {
        if col >= LINE_WIDTH {
            let _ = write!(out, "\\\n");
            col = 0;
        }
        let _ = write!(out, "{}", ch);
        col += 1;
    }
}

/// Raw-byte output for `P`: a Number prints as the base-256 big-endian byte
/// string of its integer part; a String prints verbatim.
pub fn print_ascii(out: &mut dyn Write, v: &Value) {
    match v {
        Value::Num(n) => {
            let (int_part, _) = n.split();
            let bytes = int_part.to_bytes_be();
            let _ = out.write_all(&bytes);
        }
        Value::Str(s) => {
            let _ = out.write_all(s.as_bytes());
        }
        Value::Empty => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::int::Int;

    #[test]
    fn formats_decimal_integer() {
        let n = Number {
            n: Int::from_i64(5),
            scale: 0,
        };
        assert_eq!(format_number(&n, 10), "5");
    }

    #[test]
    fn formats_decimal_fraction() {
        let n = Number {
            n: Int::from_i64(314159),
            scale: 5,
        };
        assert_eq!(format_number(&n, 10), "3.14159");
    }

    #[test]
    fn formats_negative_number() {
        let n = Number {
            n: Int::from_i64(-42),
            scale: 0,
        };
        assert_eq!(format_number(&n, 10), "-42");
    }

    #[test]
    fn formats_zero() {
        let n = Number::zero();
        assert_eq!(format_number(&n, 10), "0");
    }

    #[test]
    fn formats_hex_integer() {
        let n = Number {
            n: Int::from_i64(255),
            scale: 0,
        };
        assert_eq!(format_number(&n, 16), "FF");
    }
}
