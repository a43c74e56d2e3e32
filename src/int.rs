//! The arbitrary-precision integer primitive. A thin adapter over
//! `num-bigint::BigInt` so the rest of the interpreter never touches
//! `BigInt` directly.

use num_bigint::{BigInt, Sign};
use num_integer::Integer;
use num_traits::{Signed, ToPrimitive, Zero};
use std::cmp::Ordering;
use std::ops::{Add, Mul, Neg, Sub};

/// An arbitrary-precision signed integer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Int(BigInt);

impl Int {
    pub fn zero() -> Int {
        Int(BigInt::zero())
    }

    pub fn from_u64(v: u64) -> Int {
        Int(BigInt::from(v))
    }

    pub fn from_i64(v: i64) -> Int {
        Int(BigInt::from(v))
    }

    /// Truncated-toward-zero quotient.
    pub fn div_q(&self, other: &Int) -> Int {
        Int(self.0.clone() / other.0.clone())
    }

    /// Truncated-toward-zero remainder (sign follows the dividend).
    pub fn div_r(&self, other: &Int) -> Int {
        Int(self.0.clone() % other.0.clone())
    }

    /// Quotient and remainder in one pass.
    pub fn div_qr(&self, other: &Int) -> (Int, Int) {
        let (q, r) = self.0.div_rem(&other.0);
        (Int(q), Int(r))
    }

    pub fn mul_ui(&self, v: u64) -> Int {
        Int(self.0.clone() * BigInt::from(v))
    }

    /// Divide by a small unsigned value, truncating toward zero, returning the
    /// (unsigned) remainder.
    pub fn div_q_ui(&mut self, v: u64) -> u64 {
        let (q, r) = self.0.div_rem(&BigInt::from(v));
        self.0 = q;
        r.to_u64().unwrap_or_else(|| r.abs().to_u64().unwrap_or(0))
    }

    pub fn pow_ui(base: u64, exp: u64) -> Int {
        Int(BigInt::from(base).pow(exp as u32))
    }

    /// Arithmetic right shift by `k` bits (floor division by 2^k).
    pub fn shr(&self, k: u64) -> Int {
        Int(self.0.clone() >> k)
    }

    pub fn shl(&self, k: u64) -> Int {
        Int(self.0.clone() << k)
    }

    /// True if bit `k` (0 = least significant) of the magnitude is set.
    pub fn test_bit(&self, k: u64) -> bool {
        let (_, bytes) = self.0.to_bytes_le();
        let byte_idx = (k / 8) as usize;
        let bit_idx = (k % 8) as u32;
        bytes
            .get(byte_idx)
            .map(|b| (b >> bit_idx) & 1 == 1)
            .unwrap_or(false)
    }

    pub fn sign(&self) -> i32 {
        match self.0.sign() {
            Sign::Minus => -1,
            Sign::NoSign => 0,
            Sign::Plus => 1,
        }
    }

    pub fn cmp(&self, other: &Int) -> Ordering {
        self.0.cmp(&other.0)
    }

    pub fn cmp_abs(&self, other: &Int) -> Ordering {
        self.0.abs().cmp(&other.0.abs())
    }

    /// Number of bits needed to represent the magnitude (0 has bit length 0).
    pub fn bits(&self) -> u64 {
        self.0.bits()
    }

    /// Reads the value as an unsigned long; `None` if it does not fit (negative
    /// or too large). Callers must check for this sentinel before use.
    pub fn get_ui(&self) -> Option<u64> {
        self.0.to_u64()
    }

    pub fn set_ui(v: u64) -> Int {
        Int(BigInt::from(v))
    }

    pub fn neg(&mut self) {
        self.0 = -self.0.clone();
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn to_decimal_string(&self) -> String {
        self.0.to_str_radix(10)
    }

    pub fn from_decimal_str(s: &str) -> Option<Int> {
        s.parse::<BigInt>().ok().map(Int)
    }

    /// Exports the magnitude as big-endian bytes, matching the `P` opcode's
    /// base-256 byte-string rendering of a number's integer part.
    pub fn to_bytes_be(&self) -> Vec<u8> {
        self.0.to_bytes_be().1
    }

    pub fn from_u8(b: u8) -> Int {
        Int(BigInt::from(b))
    }
}

impl Add for &Int {
    type Output = Int;
    fn add(self, rhs: &Int) -> Int {
        Int(self.0.clone() + rhs.0.clone())
    }
}

impl Sub for &Int {
    type Output = Int;
    fn sub(self, rhs: &Int) -> Int {
        Int(self.0.clone() - rhs.0.clone())
    }
}

impl Mul for &Int {
    type Output = Int;
    fn mul(self, rhs: &Int) -> Int {
        Int(self.0.clone() * rhs.0.clone())
    }
}

impl Neg for Int {
    type Output = Int;
    fn neg(self) -> Int {
        Int(-self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncated_division_matches_c_semantics() {
        let a = Int::from_i64(-7);
        let b = Int::from_i64(2);
        assert_eq!(a.div_q(&b), Int::from_i64(-3));
        assert_eq!(a.div_r(&b), Int::from_i64(-1));
    }

    #[test]
    fn test_bit_reads_twos_complement_magnitude() {
        let n = Int::from_u64(0b1010);
        assert!(!n.test_bit(0));
        assert!(n.test_bit(1));
        assert!(!n.test_bit(2));
        assert!(n.test_bit(3));
    }

    #[test]
    fn shr_is_floor_division() {
        let n = Int::from_i64(5);
        assert_eq!(n.shr(1), Int::from_i64(2));
    }
}
