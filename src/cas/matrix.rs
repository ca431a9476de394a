//! Dense matrices of rational functions and exact-structure linear solves.

use std::fmt;

use nalgebra::DMatrix;

use super::delayed::Delayed;
use super::poly::C64;
use super::ratio::Ratio;
use super::signal::Signal;
use crate::error::{Result, SymnodalError};

/// Right-hand-side values a symbolic matrix can be solved against.
pub trait Excitation: Clone {
    /// Zero of the same kind (and, for signals, the same family and variable).
    fn zero_like(&self) -> Self;
    fn plus(&self, other: &Self) -> Result<Self>;
    fn times(&self, k: &Ratio) -> Self;
    fn is_null(&self) -> bool;
}

impl Excitation for Ratio {
    fn zero_like(&self) -> Self {
        Ratio::zero()
    }

    fn plus(&self, other: &Self) -> Result<Self> {
        Ok(self.add(other))
    }

    fn times(&self, k: &Ratio) -> Self {
        self.mul(k)
    }

    fn is_null(&self) -> bool {
        self.is_zero()
    }
}

impl Excitation for Delayed {
    fn zero_like(&self) -> Self {
        Delayed::zero()
    }

    fn plus(&self, other: &Self) -> Result<Self> {
        Ok(self.add(other))
    }

    fn times(&self, k: &Ratio) -> Self {
        self.mul_ratio(k)
    }

    fn is_null(&self) -> bool {
        self.is_zero()
    }
}

impl Excitation for Signal {
    fn zero_like(&self) -> Self {
        Signal::zero(self.family(), self.var())
    }

    fn plus(&self, other: &Self) -> Result<Self> {
        self.add(other)
    }

    fn times(&self, k: &Ratio) -> Self {
        self.scale(k)
    }

    fn is_null(&self) -> bool {
        self.is_zero()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymMatrix {
    rows: usize,
    cols: usize,
    data: Vec<Ratio>,
}

impl SymMatrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![Ratio::zero(); rows * cols],
        }
    }

    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m.set(i, i, Ratio::one());
        }
        m
    }

    pub fn from_rows(rows: Vec<Vec<Ratio>>) -> Result<Self> {
        let n = rows.len();
        let c = rows.first().map(Vec::len).unwrap_or(0);
        if rows.iter().any(|r| r.len() != c) {
            return Err(SymnodalError::Algebra("ragged matrix rows".to_string()));
        }
        Ok(Self {
            rows: n,
            cols: c,
            data: rows.into_iter().flatten().collect(),
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, i: usize, j: usize) -> &Ratio {
        &self.data[i * self.cols + j]
    }

    pub fn set(&mut self, i: usize, j: usize, v: Ratio) {
        self.data[i * self.cols + j] = v;
    }

    /// Accumulates into an entry; stamps never overwrite.
    pub fn add_at(&mut self, i: usize, j: usize, v: &Ratio) {
        let k = i * self.cols + j;
        self.data[k] = self.data[k].add(v);
    }

    pub fn row(&self, i: usize) -> &[Ratio] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn is_zero(&self) -> bool {
        self.data.iter().all(Ratio::is_zero)
    }

    pub fn map<F>(&self, f: F) -> Result<SymMatrix>
    where
        F: Fn(&Ratio) -> Result<Ratio>,
    {
        Ok(Self {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(f).collect::<Result<_>>()?,
        })
    }

    pub fn add(&self, other: &SymMatrix) -> Result<SymMatrix> {
        self.check_shape(other, "add")?;
        Ok(Self {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().zip(&other.data).map(|(a, b)| a.add(b)).collect(),
        })
    }

    pub fn sub(&self, other: &SymMatrix) -> Result<SymMatrix> {
        self.check_shape(other, "subtract")?;
        Ok(Self {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().zip(&other.data).map(|(a, b)| a.sub(b)).collect(),
        })
    }

    pub fn scale(&self, k: &Ratio) -> SymMatrix {
        Self {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|a| a.mul(k)).collect(),
        }
    }

    fn check_shape(&self, other: &SymMatrix, op: &str) -> Result<()> {
        if self.rows != other.rows || self.cols != other.cols {
            return Err(SymnodalError::Algebra(format!(
                "cannot {} {}x{} and {}x{} matrices",
                op, self.rows, self.cols, other.rows, other.cols
            )));
        }
        Ok(())
    }

    pub fn mul(&self, other: &SymMatrix) -> Result<SymMatrix> {
        if self.cols != other.rows {
            return Err(SymnodalError::Algebra(format!(
                "cannot multiply {}x{} by {}x{}",
                self.rows, self.cols, other.rows, other.cols
            )));
        }
        let mut out = Self::zeros(self.rows, other.cols);
        for i in 0..self.rows {
            for k in 0..self.cols {
                let a = self.get(i, k);
                if a.is_zero() {
                    continue;
                }
                for j in 0..other.cols {
                    let b = other.get(k, j);
                    if !b.is_zero() {
                        out.add_at(i, j, &a.mul(b));
                    }
                }
            }
        }
        Ok(out)
    }

    pub fn transpose(&self) -> SymMatrix {
        let mut out = Self::zeros(self.cols, self.rows);
        for i in 0..self.rows {
            for j in 0..self.cols {
                out.set(j, i, self.get(i, j).clone());
            }
        }
        out
    }

    /// Assembles `[[a, b], [c, d]]`.
    pub fn block(a: &SymMatrix, b: &SymMatrix, c: &SymMatrix, d: &SymMatrix) -> Result<SymMatrix> {
        if a.rows != b.rows || c.rows != d.rows || a.cols != c.cols || b.cols != d.cols {
            return Err(SymnodalError::Algebra("block sizes do not agree".to_string()));
        }
        let n = a.rows + c.rows;
        let m = a.cols + b.cols;
        let mut out = Self::zeros(n, m);
        for i in 0..n {
            for j in 0..m {
                let v = match (i < a.rows, j < a.cols) {
                    (true, true) => a.get(i, j),
                    (true, false) => b.get(i, j - a.cols),
                    (false, true) => c.get(i - a.rows, j),
                    (false, false) => d.get(i - a.rows, j - a.cols),
                };
                out.set(i, j, v.clone());
            }
        }
        Ok(out)
    }

    /// Row `k..` index of the simplest usable pivot in column `col`.
    fn pick_pivot(&self, col: usize, from: usize) -> Option<usize> {
        (from..self.rows)
            .filter(|&i| !self.get(i, col).is_zero())
            .min_by(|&a, &b| {
                let cost = |i: usize| {
                    let r = self.get(i, col);
                    match r.as_constant() {
                        Some(c) => (0usize, -c.norm()),
                        None => (r.num().len() + r.den().len(), 0.0),
                    }
                };
                let (ca, ma) = cost(a);
                let (cb, mb) = cost(b);
                ca.cmp(&cb)
                    .then(ma.partial_cmp(&mb).unwrap_or(std::cmp::Ordering::Equal))
            })
    }

    fn swap_rows(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        for j in 0..self.cols {
            self.data.swap(a * self.cols + j, b * self.cols + j);
        }
    }

    /// Solves `self · X = rhs` for several right-hand sides at once;
    /// `rhs[i]` holds row `i` of every column.
    pub fn solve_many<E: Excitation>(&self, rhs: &[Vec<E>]) -> Result<Vec<Vec<E>>> {
        if self.rows != self.cols || rhs.len() != self.rows {
            return Err(SymnodalError::Algebra(format!(
                "cannot solve {}x{} system with {} right-hand rows",
                self.rows,
                self.cols,
                rhs.len()
            )));
        }
        let n = self.rows;
        let mut a = self.clone();
        let mut b: Vec<Vec<E>> = rhs.to_vec();

        for k in 0..n {
            let p = a.pick_pivot(k, k).ok_or_else(|| singular(k))?;
            a.swap_rows(k, p);
            b.swap(k, p);
            let pivot = a.get(k, k).clone();
            for i in (k + 1)..n {
                let aik = a.get(i, k).clone();
                if aik.is_zero() {
                    continue;
                }
                let f = aik.div(&pivot)?;
                for j in k..n {
                    let akj = a.get(k, j).clone();
                    if !akj.is_zero() {
                        a.add_at(i, j, &akj.mul(&f).neg());
                    }
                }
                a.set(i, k, Ratio::zero());
                let neg_f = f.neg();
                let row_k = b[k].clone();
                for (bij, bkj) in b[i].iter_mut().zip(row_k.iter()) {
                    if !bkj.is_null() {
                        *bij = bij.plus(&bkj.times(&neg_f))?;
                    }
                }
            }
        }

        let cols = b.first().map(Vec::len).unwrap_or(0);
        let mut x: Vec<Vec<E>> = b.clone();
        for k in (0..n).rev() {
            let inv = a.get(k, k).inv()?;
            for c in 0..cols {
                let mut acc = b[k][c].clone();
                for j in (k + 1)..n {
                    let akj = a.get(k, j);
                    if !akj.is_zero() && !x[j][c].is_null() {
                        acc = acc.plus(&x[j][c].times(&akj.neg()))?;
                    }
                }
                x[k][c] = acc.times(&inv);
            }
        }
        Ok(x)
    }

    pub fn solve<E: Excitation>(&self, rhs: &[E]) -> Result<Vec<E>> {
        let columns: Vec<Vec<E>> = rhs.iter().map(|e| vec![e.clone()]).collect();
        Ok(self
            .solve_many(&columns)?
            .into_iter()
            .filter_map(|mut row| row.pop())
            .collect())
    }

    pub fn inverse(&self) -> Result<SymMatrix> {
        let n = self.rows;
        let id: Vec<Vec<Ratio>> = (0..n)
            .map(|i| (0..n).map(|j| if i == j { Ratio::one() } else { Ratio::zero() }).collect())
            .collect();
        SymMatrix::from_rows(self.solve_many(&id)?)
    }

    pub fn det(&self) -> Result<Ratio> {
        if self.rows != self.cols {
            return Err(SymnodalError::Algebra("determinant of a non-square matrix".to_string()));
        }
        let n = self.rows;
        let mut a = self.clone();
        let mut det = Ratio::one();
        for k in 0..n {
            let Some(p) = a.pick_pivot(k, k) else {
                return Ok(Ratio::zero());
            };
            if p != k {
                a.swap_rows(k, p);
                det = det.neg();
            }
            let pivot = a.get(k, k).clone();
            det = det.mul(&pivot);
            for i in (k + 1)..n {
                let aik = a.get(i, k).clone();
                if aik.is_zero() {
                    continue;
                }
                let f = aik.div(&pivot)?;
                for j in k..n {
                    let akj = a.get(k, j).clone();
                    if !akj.is_zero() {
                        a.add_at(i, j, &akj.mul(&f).neg());
                    }
                }
            }
        }
        Ok(det)
    }

    /// Generic rank by exact elimination.
    pub fn rank(&self) -> Result<usize> {
        let mut a = self.clone();
        let mut row = 0;
        for col in 0..self.cols {
            if row == self.rows {
                break;
            }
            let Some(p) = a.pick_pivot(col, row) else {
                continue;
            };
            a.swap_rows(row, p);
            let pivot = a.get(row, col).clone();
            for i in (row + 1)..self.rows {
                let aic = a.get(i, col).clone();
                if aic.is_zero() {
                    continue;
                }
                let f = aic.div(&pivot)?;
                for j in col..self.cols {
                    let arj = a.get(row, j).clone();
                    if !arj.is_zero() {
                        a.add_at(i, j, &arj.mul(&f).neg());
                    }
                }
                a.set(i, col, Ratio::zero());
            }
            row += 1;
        }
        Ok(row)
    }

    /// `det(var·I − self)`.
    pub fn char_poly(&self, var: &str) -> Result<Ratio> {
        let s = Ratio::symbol(var);
        SymMatrix::identity(self.rows).scale(&s).sub(self)?.det()
    }

    /// Numeric copy; every entry must be a real constant.
    pub fn to_real(&self) -> Result<DMatrix<f64>> {
        let values: Vec<f64> = self
            .data
            .iter()
            .map(|r| {
                r.as_real().ok_or_else(|| {
                    SymnodalError::Algebra(format!("matrix entry {} is not a real number", r))
                })
            })
            .collect::<Result<_>>()?;
        Ok(DMatrix::from_row_slice(self.rows, self.cols, &values))
    }

    pub fn from_real(m: &DMatrix<f64>) -> SymMatrix {
        let mut out = SymMatrix::zeros(m.nrows(), m.ncols());
        for i in 0..m.nrows() {
            for j in 0..m.ncols() {
                out.set(i, j, Ratio::constant(C64::new(m[(i, j)], 0.0)));
            }
        }
        out
    }
}

fn singular(col: usize) -> SymnodalError {
    SymnodalError::StructuralDegeneracy {
        cause: format!("matrix is singular (no pivot in column {})", col),
        hint: "check for floating nodes or redundant constraints".to_string(),
    }
}

impl fmt::Display for SymMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows: Vec<String> = (0..self.rows)
            .map(|i| {
                let entries: Vec<String> = self.row(i).iter().map(|r| r.to_string()).collect();
                format!("[{}]", entries.join(", "))
            })
            .collect();
        write!(f, "[{}]", rows.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(x: f64) -> Ratio {
        Ratio::real(x)
    }

    #[test]
    fn test_solve_numeric() {
        // 2x + y = 3, x + 3y = 5 -> x = 0.8, y = 1.4
        let a = SymMatrix::from_rows(vec![vec![r(2.0), r(1.0)], vec![r(1.0), r(3.0)]]).unwrap();
        let x = a.solve(&[r(3.0), r(5.0)]).unwrap();
        assert!((x[0].as_real().unwrap() - 0.8).abs() < 1e-12);
        assert!((x[1].as_real().unwrap() - 1.4).abs() < 1e-12);
    }

    #[test]
    fn test_solve_symbolic_needs_pivoting() {
        // [[0, 1], [G, 0]] x = [V, I]
        let g = Ratio::symbol("G");
        let a = SymMatrix::from_rows(vec![vec![r(0.0), r(1.0)], vec![g.clone(), r(0.0)]]).unwrap();
        let x = a.solve(&[Ratio::symbol("V"), Ratio::symbol("I")]).unwrap();
        assert_eq!(x[0], Ratio::symbol("I").div(&g).unwrap());
        assert_eq!(x[1], Ratio::symbol("V"));
    }

    #[test]
    fn test_singular_is_structural_error() {
        let a = SymMatrix::from_rows(vec![vec![r(1.0), r(1.0)], vec![r(1.0), r(1.0)]]).unwrap();
        let err = a.solve(&[r(1.0), r(2.0)]).unwrap_err();
        assert!(matches!(err, SymnodalError::StructuralDegeneracy { .. }));
        assert!(a.det().unwrap().is_zero());
    }

    #[test]
    fn test_inverse_and_char_poly() {
        let a = SymMatrix::from_rows(vec![vec![r(0.0), r(1.0)], vec![r(-2.0), r(-3.0)]]).unwrap();
        let inv = a.inverse().unwrap();
        assert_eq!(a.mul(&inv).unwrap(), SymMatrix::identity(2));
        // s^2 + 3s + 2
        let p = a.char_poly("s").unwrap();
        let s = Ratio::symbol("s");
        assert_eq!(p, s.mul(&s).add(&s.scale(C64::new(3.0, 0.0))).add(&r(2.0)));
    }

    #[test]
    fn test_rank() {
        let a = SymMatrix::from_rows(vec![vec![r(1.0), r(2.0)], vec![r(2.0), r(4.0)]]).unwrap();
        assert_eq!(a.rank().unwrap(), 1);
        let g = Ratio::symbol("G");
        let b = SymMatrix::from_rows(vec![vec![g.clone(), r(0.0), r(1.0)], vec![r(0.0), g, r(1.0)]]).unwrap();
        assert_eq!(b.rank().unwrap(), 2);
        assert_eq!(SymMatrix::zeros(2, 2).rank().unwrap(), 0);
    }
}
