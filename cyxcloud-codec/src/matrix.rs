//! Matrices over GF(2^8)
//!
//! `GfMatrix` backs the Reed-Solomon generator and its decode inversions.
//! `Eliminator` is the incremental Gaussian elimination used by RLNC decode:
//! rows arrive one at a time with a payload attached and are kept in reduced
//! row-echelon form, so the payloads are the solved data chunks once the rank
//! reaches `k`.

use crate::error::{CodecError, Result};
use crate::gf::{self, Gf256, FIELD_SIZE};

/// Dense row-major matrix of field elements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GfMatrix {
    rows: usize,
    cols: usize,
    data: Vec<Gf256>,
}

impl GfMatrix {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![Gf256::ZERO; rows * cols],
        }
    }

    pub fn identity(n: usize) -> Self {
        let mut m = Self::new(n, n);
        for i in 0..n {
            m.data[i * n + i] = Gf256::ONE;
        }
        m
    }

    /// Systematic generator `[I_k ; C]` where `C` is an `m x k` Cauchy matrix,
    /// `C[i][j] = 1 / (x_i + y_j)` with `x_i = i` and `y_j = m + j`.
    ///
    /// All `x_i`, `y_j` are distinct, so every square submatrix of `C` is
    /// nonsingular and any `k` rows of the result are linearly independent.
    pub fn cauchy_systematic(k: usize, m: usize) -> Result<Self> {
        if k == 0 || k + m > FIELD_SIZE {
            return Err(CodecError::InvalidInput(format!(
                "cannot build a ({} + {}) x {} generator over GF(256)",
                k, m, k
            )));
        }

        let mut g = Self::new(k + m, k);
        for i in 0..k {
            g.data[i * k + i] = Gf256::ONE;
        }
        for i in 0..m {
            let x = Gf256(i as u8);
            for j in 0..k {
                let y = Gf256((m + j) as u8);
                let elem = (x + y).inv().ok_or(CodecError::SingularMatrix)?;
                g.data[(k + i) * k + j] = elem;
            }
        }
        Ok(g)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, r: usize, c: usize) -> Option<Gf256> {
        if r >= self.rows || c >= self.cols {
            return None;
        }
        Some(self.data[r * self.cols + c])
    }

    pub fn set(&mut self, r: usize, c: usize, val: Gf256) {
        if r < self.rows && c < self.cols {
            self.data[r * self.cols + c] = val;
        }
    }

    /// Row `r` as a slice. Panics if `r` is out of bounds.
    pub fn row(&self, r: usize) -> &[Gf256] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    /// Submatrix built from the given rows, in the given order.
    pub fn select_rows(&self, rows: &[usize]) -> Result<Self> {
        let mut out = Self::new(rows.len(), self.cols);
        for (dst, &src) in rows.iter().enumerate() {
            if src >= self.rows {
                return Err(CodecError::InvalidInput(format!(
                    "row {} out of range (rows: {})",
                    src, self.rows
                )));
            }
            out.data[dst * self.cols..(dst + 1) * self.cols].copy_from_slice(self.row(src));
        }
        Ok(out)
    }

    /// Y = A * X
    pub fn mul_vec(&self, x: &[Gf256]) -> Result<Vec<Gf256>> {
        if x.len() != self.cols {
            return Err(CodecError::InvalidInput(format!(
                "vector length {} does not match {} columns",
                x.len(),
                self.cols
            )));
        }

        let y = (0..self.rows)
            .map(|r| {
                self.row(r)
                    .iter()
                    .zip(x)
                    .fold(Gf256::ZERO, |acc, (&a, &b)| acc + a * b)
            })
            .collect();
        Ok(y)
    }

    /// Gauss-Jordan inversion. Each column pivots on the first row at or below
    /// the diagonal holding a nonzero element.
    pub fn invert(&self) -> Result<GfMatrix> {
        if self.rows != self.cols {
            return Err(CodecError::InvalidInput(format!(
                "cannot invert a non-square {}x{} matrix",
                self.rows, self.cols
            )));
        }

        let n = self.rows;
        let mut work = self.clone();
        let mut inv = GfMatrix::identity(n);

        for col in 0..n {
            let pivot = (col..n)
                .find(|&r| !work.data[r * n + col].is_zero())
                .ok_or(CodecError::SingularMatrix)?;

            if pivot != col {
                work.swap_rows(pivot, col);
                inv.swap_rows(pivot, col);
            }

            let pivot_inv = work.data[col * n + col]
                .inv()
                .ok_or(CodecError::SingularMatrix)?;
            work.scale_row(col, pivot_inv);
            inv.scale_row(col, pivot_inv);

            for r in 0..n {
                if r == col {
                    continue;
                }
                let factor = work.data[r * n + col];
                if !factor.is_zero() {
                    work.add_scaled_row(r, col, factor);
                    inv.add_scaled_row(r, col, factor);
                }
            }
        }

        Ok(inv)
    }

    fn swap_rows(&mut self, a: usize, b: usize) {
        for c in 0..self.cols {
            self.data.swap(a * self.cols + c, b * self.cols + c);
        }
    }

    fn scale_row(&mut self, r: usize, factor: Gf256) {
        for x in &mut self.data[r * self.cols..(r + 1) * self.cols] {
            *x = *x * factor;
        }
    }

    /// row[dst] -= factor * row[src]
    fn add_scaled_row(&mut self, dst: usize, src: usize, factor: Gf256) {
        for c in 0..self.cols {
            let v = self.data[src * self.cols + c];
            let d = &mut self.data[dst * self.cols + c];
            *d = *d + factor * v;
        }
    }
}

/// A basis row: unit coefficient at its pivot, zero at every other pivot.
#[derive(Debug, Clone)]
struct BasisRow {
    coeffs: Vec<u8>,
    payload: Vec<u8>,
}

/// Incremental Gaussian elimination over `k` unknowns with payload
/// right-hand sides.
#[derive(Debug, Clone)]
pub struct Eliminator {
    k: usize,
    payload_len: usize,
    /// Indexed by pivot column.
    basis: Vec<Option<BasisRow>>,
    rank: usize,
}

impl Eliminator {
    pub fn new(k: usize, payload_len: usize) -> Self {
        Self {
            k,
            payload_len,
            basis: vec![None; k],
            rank: 0,
        }
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn is_complete(&self) -> bool {
        self.rank == self.k
    }

    /// Reduce a row against the basis.
    /// Returns `Ok(true)` if it was innovative and joined the basis,
    /// `Ok(false)` if it was linearly dependent and discarded.
    pub fn absorb(&mut self, coeffs: &[u8], payload: &[u8]) -> Result<bool> {
        if coeffs.len() != self.k {
            return Err(CodecError::InvalidInput(format!(
                "coefficient vector has {} entries, expected {}",
                coeffs.len(),
                self.k
            )));
        }
        if payload.len() != self.payload_len {
            return Err(CodecError::InvalidInput(format!(
                "payload is {} bytes, expected {}",
                payload.len(),
                self.payload_len
            )));
        }

        let mut cand_coeffs = coeffs.to_vec();
        let mut cand_payload = payload.to_vec();

        for (col, slot) in self.basis.iter().enumerate() {
            if let Some(row) = slot {
                let factor = Gf256(cand_coeffs[col]);
                if !factor.is_zero() {
                    gf::add_scaled(&mut cand_coeffs, &row.coeffs, factor);
                    gf::add_scaled(&mut cand_payload, &row.payload, factor);
                }
            }
        }

        let Some(pivot) = cand_coeffs.iter().position(|&c| c != 0) else {
            return Ok(false);
        };

        let inv = Gf256(cand_coeffs[pivot])
            .inv()
            .ok_or(CodecError::SingularMatrix)?;
        gf::scale_in_place(&mut cand_coeffs, inv);
        gf::scale_in_place(&mut cand_payload, inv);

        // Clear the new pivot column from the existing rows.
        for row in self.basis.iter_mut().flatten() {
            let factor = Gf256(row.coeffs[pivot]);
            if !factor.is_zero() {
                gf::add_scaled(&mut row.coeffs, &cand_coeffs, factor);
                gf::add_scaled(&mut row.payload, &cand_payload, factor);
            }
        }

        self.basis[pivot] = Some(BasisRow {
            coeffs: cand_coeffs,
            payload: cand_payload,
        });
        self.rank += 1;
        Ok(true)
    }

    /// The solved payloads, one per unknown in column order.
    pub fn into_solution(self) -> Result<Vec<Vec<u8>>> {
        let (rank, required) = (self.rank, self.k);
        if rank != required {
            return Err(CodecError::InsufficientRank { rank, required });
        }

        self.basis
            .into_iter()
            .map(|slot| {
                slot.map(|row| row.payload)
                    .ok_or(CodecError::InsufficientRank { rank, required })
            })
            .collect()
    }
}
