//! Univariate polynomials with rational-function coefficients, and root finding.

use std::fmt;

use super::poly::{fmt_c64, Poly, C64};
use super::ratio::Ratio;
use crate::error::{Result, SymnodalError};

/// Polynomial in `var`, coefficients stored lowest power first.
#[derive(Debug, Clone, PartialEq)]
pub struct UPoly {
    var: String,
    coeffs: Vec<Ratio>,
}

/// A root together with its multiplicity.
#[derive(Debug, Clone)]
pub struct Root {
    pub value: Ratio,
    pub multiplicity: u32,
}

impl Root {
    /// Numeric value of the root, if it has no free symbols.
    pub fn numeric(&self) -> Option<C64> {
        self.value.as_constant()
    }
}

impl UPoly {
    pub fn new(var: &str, coeffs: Vec<Ratio>) -> Self {
        let mut p = Self {
            var: var.to_string(),
            coeffs,
        };
        p.trim();
        p
    }

    pub fn from_poly(p: &Poly, var: &str) -> Self {
        Self::new(
            var,
            p.coeffs(var).into_iter().map(Ratio::from_poly).collect(),
        )
    }

    pub fn from_numeric(var: &str, coeffs: &[C64]) -> Self {
        Self::new(var, coeffs.iter().map(|c| Ratio::constant(*c)).collect())
    }

    /// `lc * prod (var - r)^m`.
    pub fn from_roots(var: &str, lc: Ratio, roots: &[(C64, u32)]) -> Self {
        let mut p = Self::new(var, vec![lc]);
        for (r, m) in roots {
            let factor = Self::new(var, vec![Ratio::constant(-*r), Ratio::one()]);
            for _ in 0..*m {
                p = p.mul(&factor);
            }
        }
        p
    }

    fn trim(&mut self) {
        while self.coeffs.last().is_some_and(Ratio::is_zero) {
            self.coeffs.pop();
        }
    }

    pub fn var(&self) -> &str {
        &self.var
    }

    pub fn coeffs(&self) -> &[Ratio] {
        &self.coeffs
    }

    pub fn coeff(&self, k: usize) -> Ratio {
        self.coeffs.get(k).cloned().unwrap_or_default()
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs.is_empty()
    }

    /// Degree; the zero polynomial reports 0.
    pub fn degree(&self) -> usize {
        self.coeffs.len().saturating_sub(1)
    }

    pub fn leading(&self) -> Ratio {
        self.coeffs.last().cloned().unwrap_or_default()
    }

    pub fn numeric_coeffs(&self) -> Option<Vec<C64>> {
        self.coeffs.iter().map(Ratio::as_constant).collect()
    }

    pub fn is_numeric(&self) -> bool {
        self.coeffs.iter().all(|c| c.as_constant().is_some())
    }

    pub fn to_ratio(&self) -> Ratio {
        let x = Ratio::symbol(&self.var);
        let mut acc = Ratio::zero();
        for c in self.coeffs.iter().rev() {
            acc = acc.mul(&x).add(c);
        }
        acc
    }

    pub fn add(&self, other: &UPoly) -> UPoly {
        let n = self.coeffs.len().max(other.coeffs.len());
        Self::new(
            &self.var,
            (0..n).map(|k| self.coeff(k).add(&other.coeff(k))).collect(),
        )
    }

    pub fn mul(&self, other: &UPoly) -> UPoly {
        if self.is_zero() || other.is_zero() {
            return Self::new(&self.var, Vec::new());
        }
        let mut out = vec![Ratio::zero(); self.coeffs.len() + other.coeffs.len() - 1];
        for (i, a) in self.coeffs.iter().enumerate() {
            for (j, b) in other.coeffs.iter().enumerate() {
                out[i + j] = out[i + j].add(&a.mul(b));
            }
        }
        Self::new(&self.var, out)
    }

    pub fn scale(&self, k: &Ratio) -> UPoly {
        Self::new(&self.var, self.coeffs.iter().map(|c| c.mul(k)).collect())
    }

    pub fn eval(&self, x: &Ratio) -> Ratio {
        let mut acc = Ratio::zero();
        for c in self.coeffs.iter().rev() {
            acc = acc.mul(x).add(c);
        }
        acc
    }

    pub fn eval_numeric(&self, x: C64) -> Option<C64> {
        let mut acc = C64::new(0.0, 0.0);
        for c in self.coeffs.iter().rev() {
            acc = acc * x + c.as_constant()?;
        }
        Some(acc)
    }

    pub fn derivative(&self) -> UPoly {
        Self::new(
            &self.var,
            self.coeffs
                .iter()
                .enumerate()
                .skip(1)
                .map(|(k, c)| c.scale(C64::new(k as f64, 0.0)))
                .collect(),
        )
    }

    /// Quotient and remainder of long division.
    pub fn div_rem(&self, d: &UPoly) -> Result<(UPoly, UPoly)> {
        if d.is_zero() {
            return Err(SymnodalError::Algebra("polynomial division by zero".to_string()));
        }
        let dd = d.degree();
        let lc = d.leading();
        let mut rem = self.coeffs.clone();
        if rem.len() <= dd {
            return Ok((Self::new(&self.var, Vec::new()), self.clone()));
        }
        let mut quot = vec![Ratio::zero(); rem.len() - dd];
        for k in (0..quot.len()).rev() {
            let q = rem[k + dd].div(&lc)?;
            for (i, dc) in d.coeffs.iter().enumerate() {
                rem[k + i] = rem[k + i].sub(&q.mul(dc));
            }
            rem[k + dd] = Ratio::zero();
            quot[k] = q;
        }
        rem.truncate(dd);
        Ok((Self::new(&self.var, quot), Self::new(&self.var, rem)))
    }

    /// Coefficients of `p(var + a)`.
    pub fn taylor_shift(&self, a: &Ratio) -> UPoly {
        let mut c = self.coeffs.clone();
        let n = c.len();
        for i in 0..n {
            for k in (i..n.saturating_sub(1)).rev() {
                c[k] = c[k].add(&a.mul(&c[k + 1]));
            }
        }
        Self::new(&self.var, c)
    }

    /// Roots with multiplicity. Numeric coefficients use Aberth iteration;
    /// symbolic coefficients are supported up to degree one.
    pub fn roots(&self) -> Result<Vec<Root>> {
        let zeros = self.coeffs.iter().take_while(|c| c.is_zero()).count();
        let reduced = &self.coeffs[zeros.min(self.coeffs.len())..];
        let mut out = Vec::new();
        if zeros > 0 {
            out.push(Root {
                value: Ratio::zero(),
                multiplicity: zeros as u32,
            });
        }
        match reduced.len() {
            0 | 1 => return Ok(out),
            2 if reduced.iter().any(|c| c.as_constant().is_none()) => {
                out.push(Root {
                    value: reduced[0].neg().div(&reduced[1])?,
                    multiplicity: 1,
                });
                return Ok(out);
            }
            _ => {}
        }
        let numeric: Vec<C64> = reduced
            .iter()
            .map(Ratio::as_constant)
            .collect::<Option<_>>()
            .ok_or_else(|| {
                SymnodalError::Algebra(format!(
                    "cannot find the roots of {} in {}: degree {} with symbolic coefficients",
                    self,
                    self.var,
                    reduced.len() - 1
                ))
            })?;
        out.extend(
            numeric_roots(&numeric)
                .into_iter()
                .map(|(r, m)| Root {
                    value: Ratio::constant(r),
                    multiplicity: m,
                }),
        );
        Ok(out)
    }
}

/// Power-series quotient `a / b` truncated to `n` terms; `b[0]` must be non-zero.
pub fn series_div(a: &UPoly, b: &UPoly, n: usize) -> Result<Vec<Ratio>> {
    let b0 = b.coeff(0);
    if b0.is_zero() {
        return Err(SymnodalError::Algebra(
            "series division by a polynomial vanishing at the origin".to_string(),
        ));
    }
    let mut c: Vec<Ratio> = Vec::with_capacity(n);
    for k in 0..n {
        let mut acc = a.coeff(k);
        for i in 1..=k {
            acc = acc.sub(&b.coeff(i).mul(&c[k - i]));
        }
        c.push(acc.div(&b0)?);
    }
    Ok(c)
}

// ---------------------------------------------------------------------------
// Numeric roots
// ---------------------------------------------------------------------------

fn horner_with_derivative(coeffs: &[C64], z: C64) -> (C64, C64) {
    let mut p = C64::new(0.0, 0.0);
    let mut dp = C64::new(0.0, 0.0);
    for c in coeffs.iter().rev() {
        dp = dp * z + p;
        p = p * z + c;
    }
    (p, dp)
}

/// Roots of a polynomial with numeric coefficients (lowest power first),
/// grouped by multiplicity.
pub fn numeric_roots(coeffs: &[C64]) -> Vec<(C64, u32)> {
    let mut coeffs: Vec<C64> = coeffs.to_vec();
    while coeffs.last().is_some_and(|c| c.norm() == 0.0) {
        coeffs.pop();
    }
    let zeros = coeffs.iter().take_while(|c| c.norm() == 0.0).count();
    let reduced = &coeffs[zeros..];
    let mut grouped: Vec<(C64, u32)> = Vec::new();
    if zeros > 0 {
        grouped.push((C64::new(0.0, 0.0), zeros as u32));
    }
    if reduced.len() < 2 {
        return grouped;
    }
    let lc = reduced[reduced.len() - 1];
    let monic: Vec<C64> = reduced.iter().map(|c| c / lc).collect();
    let raw = aberth(&monic);

    let mut used = vec![false; raw.len()];
    for i in 0..raw.len() {
        if used[i] {
            continue;
        }
        // a root of multiplicity m spreads by about eps^(1/m)
        let tol = 1e-4 * raw[i].norm().max(1.0);
        let mut cluster = vec![raw[i]];
        used[i] = true;
        for j in (i + 1)..raw.len() {
            if !used[j] && (raw[j] - raw[i]).norm() < tol {
                cluster.push(raw[j]);
                used[j] = true;
            }
        }
        let m = cluster.len() as u32;
        let mean = cluster.iter().sum::<C64>() / m as f64;
        grouped.push((polish(&monic, mean, m), m));
    }
    if monic.iter().all(|c| c.im == 0.0) {
        conjugate_pairs(&mut grouped);
    }
    for (r, _) in grouped.iter_mut() {
        *r = clean(*r);
    }
    grouped.sort_by(|a, b| {
        a.0.re
            .partial_cmp(&b.0.re)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.im.partial_cmp(&b.0.im).unwrap_or(std::cmp::Ordering::Equal))
    });
    grouped
}

fn derivative(coeffs: &[C64]) -> Vec<C64> {
    coeffs
        .iter()
        .enumerate()
        .skip(1)
        .map(|(k, c)| c * k as f64)
        .collect()
}

/// Newton on the `(m-1)`-th derivative, where a root of multiplicity `m`
/// is simple.
fn polish(monic: &[C64], z0: C64, m: u32) -> C64 {
    let mut d = monic.to_vec();
    for _ in 1..m {
        d = derivative(&d);
    }
    let mut z = z0;
    for _ in 0..8 {
        let (p, dp) = horner_with_derivative(&d, z);
        if dp.norm() < 1e-300 {
            break;
        }
        let step = p / dp;
        if !(step.re.is_finite() && step.im.is_finite()) || step.norm() > 1e-3 * z.norm().max(1.0) {
            break;
        }
        z -= step;
        if step.norm() <= f64::EPSILON * z.norm().max(1.0) {
            break;
        }
    }
    z
}

/// Real-coefficient polynomials have real roots and conjugate pairs of equal
/// multiplicity; enforce that exactly.
fn conjugate_pairs(roots: &mut [(C64, u32)]) {
    let n = roots.len();
    let mut paired = vec![false; n];
    for i in 0..n {
        if paired[i] {
            continue;
        }
        let (z, m) = roots[i];
        let tol = 1e-8 * z.norm().max(1.0);
        if z.im.abs() < tol {
            roots[i].0 = C64::new(z.re, 0.0);
            paired[i] = true;
            continue;
        }
        let partner = (0..n).filter(|&j| j != i && !paired[j] && roots[j].1 == m).min_by(|&a, &b| {
            let da = (roots[a].0 - z.conj()).norm();
            let db = (roots[b].0 - z.conj()).norm();
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        });
        if let Some(j) = partner.filter(|&j| (roots[j].0 - z.conj()).norm() < 1e3 * tol) {
            let re = 0.5 * (z.re + roots[j].0.re);
            let im = 0.5 * (z.im.abs() + roots[j].0.im.abs());
            let sign = z.im.signum();
            roots[i].0 = C64::new(re, sign * im);
            roots[j].0 = C64::new(re, -sign * im);
            paired[i] = true;
            paired[j] = true;
        }
    }
}

/// Snaps negligible real or imaginary parts to zero.
fn clean(z: C64) -> C64 {
    let scale = z.norm().max(1e-300);
    let re = if z.re.abs() < 1e-10 * scale { 0.0 } else { z.re };
    let im = if z.im.abs() < 1e-10 * scale { 0.0 } else { z.im };
    C64::new(re, im)
}

/// Aberth–Ehrlich simultaneous iteration on a monic polynomial.
fn aberth(monic: &[C64]) -> Vec<C64> {
    let n = monic.len() - 1;
    if n == 1 {
        return vec![-monic[0]];
    }
    let radius = monic[..n]
        .iter()
        .enumerate()
        .map(|(k, c)| c.norm().powf(1.0 / (n - k) as f64))
        .fold(0.0_f64, f64::max)
        .max(1e-3);
    let mut z: Vec<C64> = (0..n)
        .map(|k| {
            let angle = 2.0 * std::f64::consts::PI * k as f64 / n as f64 + 0.4;
            C64::from_polar(radius, angle)
        })
        .collect();

    for _ in 0..500 {
        let mut max_step: f64 = 0.0;
        for k in 0..n {
            let (p, dp) = horner_with_derivative(monic, z[k]);
            if p.norm() == 0.0 {
                continue;
            }
            let ratio = p / dp;
            let sum: C64 = (0..n)
                .filter(|&j| j != k)
                .map(|j| C64::new(1.0, 0.0) / (z[k] - z[j]))
                .sum();
            let w = ratio / (C64::new(1.0, 0.0) - ratio * sum);
            if w.re.is_finite() && w.im.is_finite() {
                z[k] -= w;
                max_step = max_step.max(w.norm() / z[k].norm().max(1.0));
            }
        }
        if max_step < 1e-15 {
            break;
        }
    }

    for root in z.iter_mut() {
        for _ in 0..3 {
            let (p, dp) = horner_with_derivative(monic, *root);
            if dp.norm() < 1e-300 {
                break;
            }
            let step = p / dp;
            if !(step.re.is_finite() && step.im.is_finite()) {
                break;
            }
            *root -= step;
        }
    }
    z
}

impl fmt::Display for UPoly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .coeffs
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, c)| !c.is_zero())
            .map(|(k, c)| {
                let coeff = match c.as_constant() {
                    Some(v) => fmt_c64(v),
                    None => format!("({})", c),
                };
                match k {
                    0 => coeff,
                    1 => format!("{}*{}", coeff, self.var),
                    _ => format!("{}*{}^{}", coeff, self.var, k),
                }
            })
            .collect();
        if parts.is_empty() {
            write!(f, "0")
        } else {
            write!(f, "{}", parts.join(" + "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(x: f64) -> C64 {
        C64::new(x, 0.0)
    }

    #[test]
    fn test_numeric_roots_real() {
        // (s + 1)(s + 2)(s - 3) = s^3 - 7s - 6
        let roots = numeric_roots(&[c(-6.0), c(-7.0), c(0.0), c(1.0)]);
        assert_eq!(roots.len(), 3);
        assert!((roots[0].0 - c(-2.0)).norm() < 1e-9);
        assert!((roots[1].0 - c(-1.0)).norm() < 1e-9);
        assert!((roots[2].0 - c(3.0)).norm() < 1e-9);
    }

    #[test]
    fn test_numeric_roots_multiplicity() {
        // (s + 1)^2 s
        let roots = numeric_roots(&[c(0.0), c(1.0), c(2.0), c(1.0)]);
        assert_eq!(roots.len(), 2);
        assert_eq!(roots[0].1, 2);
        assert!((roots[0].0 - c(-1.0)).norm() < 1e-6);
        assert_eq!(roots[1].1, 1);
    }

    #[test]
    fn test_repeated_roots_are_polished() {
        // (s + 1)^3 = s^3 + 3s^2 + 3s + 1
        let roots = numeric_roots(&[c(1.0), c(3.0), c(3.0), c(1.0)]);
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].1, 3);
        assert_eq!(roots[0].0.im, 0.0);
        assert!((roots[0].0.re + 1.0).abs() < 1e-14);

        // (s^2 + 2s + 5)^2 -> -1 +- 2j, each twice
        let roots = numeric_roots(&[c(25.0), c(20.0), c(14.0), c(4.0), c(1.0)]);
        assert_eq!(roots.len(), 2);
        assert_eq!(roots[0].1, 2);
        assert_eq!(roots[0].0, roots[1].0.conj());
        assert!((roots[1].0 - C64::new(-1.0, 2.0)).norm() < 1e-12);
    }

    #[test]
    fn test_complex_pair() {
        // s^2 + 2s + 5 -> -1 +- 2j
        let roots = numeric_roots(&[c(5.0), c(2.0), c(1.0)]);
        assert_eq!(roots.len(), 2);
        assert!((roots[0].0 - C64::new(-1.0, -2.0)).norm() < 1e-9);
        assert!((roots[1].0 - C64::new(-1.0, 2.0)).norm() < 1e-9);
    }

    #[test]
    fn test_symbolic_first_order_root() {
        // R*C*s + 1 -> s = -1/(R*C)
        let rc = Ratio::symbol("R").mul(&Ratio::symbol("C"));
        let p = UPoly::new("s", vec![Ratio::one(), rc.clone()]);
        let roots = p.roots().unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].value, Ratio::one().neg().div(&rc).unwrap());
    }

    #[test]
    fn test_div_rem_and_shift() {
        let p = UPoly::from_numeric("x", &[c(-1.0), c(0.0), c(1.0)]);
        let d = UPoly::from_numeric("x", &[c(-1.0), c(1.0)]);
        let (q, r) = p.div_rem(&d).unwrap();
        assert!(r.is_zero());
        assert_eq!(q, UPoly::from_numeric("x", &[c(1.0), c(1.0)]));

        // x^2 at x + 1 is x^2 + 2x + 1
        let sq = UPoly::from_numeric("x", &[c(0.0), c(0.0), c(1.0)]);
        let shifted = sq.taylor_shift(&Ratio::one());
        assert_eq!(shifted, UPoly::from_numeric("x", &[c(1.0), c(2.0), c(1.0)]));
    }

    #[test]
    fn test_series_div() {
        // 1 / (1 - x) = 1 + x + x^2 + ...
        let a = UPoly::from_numeric("x", &[c(1.0)]);
        let b = UPoly::from_numeric("x", &[c(1.0), c(-1.0)]);
        let s = series_div(&a, &b, 3).unwrap();
        assert!(s.iter().all(Ratio::is_one));
    }
}
