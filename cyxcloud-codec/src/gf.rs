//! GF(2^8) arithmetic
//!
//! Field elements are bytes. Addition is XOR; multiplication and inversion go
//! through log/antilog tables generated at compile time from the polynomial
//! x^8 + x^4 + x^3 + x^2 + 1 (0x11D) with generator 2. The tables live in a
//! `static`, so every coder instance and thread reads the same copy.
//!
//! Bulk byte-lane kernels run on `reed_solomon_erasure::galois_8`, which is the
//! same field and uses SIMD when built with the `simd` feature.

use reed_solomon_erasure::galois_8;
use std::ops::{Add, Mul, Sub};

/// Irreducible polynomial for the field.
const POLY: u16 = 0x11D;

/// Number of elements in the field. Also the upper bound on `k + m`.
pub const FIELD_SIZE: usize = 256;

pub struct GfTables {
    /// Doubled so `log[a] + log[b]` never needs a modulo.
    pub exp: [u8; 512],
    pub log: [u8; 256],
}

const fn gen_tables() -> GfTables {
    let mut exp = [0u8; 512];
    let mut log = [0u8; 256];
    let mut x: u16 = 1;
    let mut i = 0;

    while i < 255 {
        exp[i] = x as u8;
        exp[i + 255] = x as u8;
        log[x as usize] = i as u8;

        x <<= 1;
        if x & 0x100 != 0 {
            x ^= POLY;
        }
        i += 1;
    }

    exp[510] = exp[0];
    exp[511] = exp[1];

    GfTables { exp, log }
}

/// Compile-time generated tables.
pub static TABLES: GfTables = gen_tables();

/// GF(2^8) field element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct Gf256(pub u8);

impl Gf256 {
    pub const ZERO: Self = Self(0);
    pub const ONE: Self = Self(1);

    #[inline]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Multiplicative inverse; `None` for zero.
    pub fn inv(self) -> Option<Self> {
        if self.0 == 0 {
            return None;
        }
        let log_a = TABLES.log[self.0 as usize] as usize;
        Some(Self(TABLES.exp[255 - log_a]))
    }
}

impl Add for Gf256 {
    type Output = Self;

    #[allow(clippy::suspicious_arithmetic_impl)]
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(self.0 ^ rhs.0)
    }
}

impl Sub for Gf256 {
    type Output = Self;

    #[allow(clippy::suspicious_arithmetic_impl)]
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 ^ rhs.0)
    }
}

impl Mul for Gf256 {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self(mul(self.0, rhs.0))
    }
}

#[inline]
pub fn mul(a: u8, b: u8) -> u8 {
    if a == 0 || b == 0 {
        return 0;
    }
    let idx = TABLES.log[a as usize] as usize + TABLES.log[b as usize] as usize;
    TABLES.exp[idx]
}

/// `dst ^= c * src` over the common prefix of both slices.
pub fn add_scaled(dst: &mut [u8], src: &[u8], c: Gf256) {
    let len = dst.len().min(src.len());
    if len == 0 || c.is_zero() {
        return;
    }
    galois_8::mul_slice_xor(c.0, &src[..len], &mut dst[..len]);
}

/// `buf = c * buf`
pub fn scale_in_place(buf: &mut [u8], c: Gf256) {
    match c.0 {
        0 => buf.fill(0),
        1 => {}
        _ if buf.is_empty() => {}
        _ => {
            let src = buf.to_vec();
            galois_8::mul_slice(c.0, &src, buf);
        }
    }
}
