//! Multivariate polynomials over named symbols.
//!
//! Coefficients are `Complex64`. A coefficient sum that cancels to within
//! [`REL_TOL`] of its operands is dropped, which keeps the sparse term map
//! free of floating-point residue after elimination steps.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use num_complex::Complex64;

/// Complex scalar used for every coefficient.
pub type C64 = Complex64;

/// Relative tolerance under which a cancelling coefficient sum is treated as zero.
pub const REL_TOL: f64 = 1e-10;

/// Returns true if `sum` is the numerical remains of cancelling `a` and `b`.
pub(crate) fn cancels(a: C64, b: C64, sum: C64) -> bool {
    sum.norm() <= REL_TOL * (a.norm() + b.norm())
}

/// Product of symbol powers, kept sorted by symbol name. Exponents are never zero.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Monomial(Vec<(String, u32)>);

impl Monomial {
    pub fn one() -> Self {
        Self(Vec::new())
    }

    pub fn var(name: &str, exp: u32) -> Self {
        if exp == 0 {
            Self::one()
        } else {
            Self(vec![(name.to_string(), exp)])
        }
    }

    pub fn is_one(&self) -> bool {
        self.0.is_empty()
    }

    pub fn degree_in(&self, var: &str) -> u32 {
        self.0
            .iter()
            .find(|(name, _)| name == var)
            .map(|(_, e)| *e)
            .unwrap_or(0)
    }

    pub fn total_degree(&self) -> u32 {
        self.0.iter().map(|(_, e)| *e).sum()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }

    pub fn powers(&self) -> &[(String, u32)] {
        &self.0
    }

    pub fn mul(&self, other: &Monomial) -> Monomial {
        let mut out: Vec<(String, u32)> = Vec::with_capacity(self.0.len() + other.0.len());
        let (mut i, mut j) = (0, 0);
        while i < self.0.len() && j < other.0.len() {
            let (a, ea) = &self.0[i];
            let (b, eb) = &other.0[j];
            match a.cmp(b) {
                std::cmp::Ordering::Less => {
                    out.push((a.clone(), *ea));
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    out.push((b.clone(), *eb));
                    j += 1;
                }
                std::cmp::Ordering::Equal => {
                    out.push((a.clone(), ea + eb));
                    i += 1;
                    j += 1;
                }
            }
        }
        out.extend(self.0[i..].iter().cloned());
        out.extend(other.0[j..].iter().cloned());
        Monomial(out)
    }

    /// Removes `var` from the monomial.
    pub fn without(&self, var: &str) -> Monomial {
        Monomial(self.0.iter().filter(|(n, _)| n != var).cloned().collect())
    }

    /// Exact monomial quotient, `None` when `other` does not divide `self`.
    pub fn div(&self, other: &Monomial) -> Option<Monomial> {
        let mut out = self.0.clone();
        for (name, e) in &other.0 {
            let pos = out.iter().position(|(n, _)| n == name)?;
            if out[pos].1 < *e {
                return None;
            }
            out[pos].1 -= e;
            if out[pos].1 == 0 {
                out.remove(pos);
            }
        }
        Some(Monomial(out))
    }

    /// Greatest common divisor (minimum exponents).
    pub fn gcd(&self, other: &Monomial) -> Monomial {
        Monomial(
            self.0
                .iter()
                .filter_map(|(name, e)| {
                    let o = other.degree_in(name);
                    (o > 0).then(|| (name.clone(), (*e).min(o)))
                })
                .collect(),
        )
    }
}

impl fmt::Display for Monomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(name, e)| {
                if *e == 1 {
                    name.clone()
                } else {
                    format!("{}^{}", name, e)
                }
            })
            .collect();
        write!(f, "{}", parts.join("*"))
    }
}

/// Sparse multivariate polynomial.
#[derive(Debug, Clone, Default)]
pub struct Poly {
    terms: BTreeMap<Monomial, C64>,
}

impl Poly {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn one() -> Self {
        Self::constant(C64::new(1.0, 0.0))
    }

    pub fn constant(c: C64) -> Self {
        Self::monomial(Monomial::one(), c)
    }

    pub fn real(x: f64) -> Self {
        Self::constant(C64::new(x, 0.0))
    }

    pub fn symbol(name: &str) -> Self {
        Self::monomial(Monomial::var(name, 1), C64::new(1.0, 0.0))
    }

    pub fn monomial(m: Monomial, c: C64) -> Self {
        let mut p = Self::zero();
        if c != C64::new(0.0, 0.0) {
            p.terms.insert(m, c);
        }
        p
    }

    /// `var^exp` as a polynomial.
    pub fn power_of(var: &str, exp: u32) -> Self {
        Self::monomial(Monomial::var(var, exp), C64::new(1.0, 0.0))
    }

    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn terms(&self) -> impl Iterator<Item = (&Monomial, &C64)> {
        self.terms.iter()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Returns the value if the polynomial has no symbols.
    pub fn as_constant(&self) -> Option<C64> {
        match self.terms.len() {
            0 => Some(C64::new(0.0, 0.0)),
            1 => self.terms.get(&Monomial::one()).copied(),
            _ => None,
        }
    }

    pub fn is_constant(&self) -> bool {
        self.as_constant().is_some()
    }

    /// Accumulates `c * m`, dropping the term when it cancels.
    pub fn add_term(&mut self, m: Monomial, c: C64) {
        if c == C64::new(0.0, 0.0) {
            return;
        }
        match self.terms.get_mut(&m) {
            Some(existing) => {
                let a = *existing;
                let sum = a + c;
                if sum == C64::new(0.0, 0.0) || cancels(a, c, sum) {
                    self.terms.remove(&m);
                } else {
                    *existing = sum;
                }
            }
            None => {
                self.terms.insert(m, c);
            }
        }
    }

    pub fn add(&self, other: &Poly) -> Poly {
        let mut out = self.clone();
        for (m, c) in &other.terms {
            out.add_term(m.clone(), *c);
        }
        out
    }

    pub fn sub(&self, other: &Poly) -> Poly {
        let mut out = self.clone();
        for (m, c) in &other.terms {
            out.add_term(m.clone(), -*c);
        }
        out
    }

    pub fn neg(&self) -> Poly {
        Poly {
            terms: self.terms.iter().map(|(m, c)| (m.clone(), -*c)).collect(),
        }
    }

    pub fn scale(&self, k: C64) -> Poly {
        if k == C64::new(0.0, 0.0) {
            return Poly::zero();
        }
        Poly {
            terms: self.terms.iter().map(|(m, c)| (m.clone(), *c * k)).collect(),
        }
    }

    pub fn mul(&self, other: &Poly) -> Poly {
        let mut out = Poly::zero();
        for (ma, ca) in &self.terms {
            for (mb, cb) in &other.terms {
                out.add_term(ma.mul(mb), *ca * *cb);
            }
        }
        out
    }

    pub fn pow(&self, n: u32) -> Poly {
        let mut out = Poly::one();
        for _ in 0..n {
            out = out.mul(self);
        }
        out
    }

    pub fn contains(&self, var: &str) -> bool {
        self.terms.keys().any(|m| m.degree_in(var) > 0)
    }

    pub fn free_symbols(&self) -> BTreeSet<String> {
        self.terms
            .keys()
            .flat_map(|m| m.symbols().map(str::to_string))
            .collect()
    }

    pub fn degree(&self, var: &str) -> u32 {
        self.terms.keys().map(|m| m.degree_in(var)).max().unwrap_or(0)
    }

    pub fn min_degree(&self, var: &str) -> u32 {
        self.terms.keys().map(|m| m.degree_in(var)).min().unwrap_or(0)
    }

    /// Coefficients of `var^0 .. var^deg`, each free of `var`.
    pub fn coeffs(&self, var: &str) -> Vec<Poly> {
        let deg = self.degree(var) as usize;
        let mut out = vec![Poly::zero(); deg + 1];
        for (m, c) in &self.terms {
            let d = m.degree_in(var) as usize;
            out[d].add_term(m.without(var), *c);
        }
        out
    }

    pub fn from_coeffs(var: &str, coeffs: &[Poly]) -> Poly {
        let mut out = Poly::zero();
        for (d, c) in coeffs.iter().enumerate() {
            out = out.add(&c.mul(&Poly::power_of(var, d as u32)));
        }
        out
    }

    /// Substitutes `var` by the polynomial `value`.
    pub fn subs(&self, var: &str, value: &Poly) -> Poly {
        if !self.contains(var) {
            return self.clone();
        }
        let coeffs = self.coeffs(var);
        let mut out = Poly::zero();
        for c in coeffs.iter().rev() {
            out = out.mul(value).add(c);
        }
        out
    }

    /// Substitutes numeric values for any symbols present in `values`.
    pub fn eval(&self, values: &HashMap<String, C64>) -> Poly {
        let mut out = Poly::zero();
        for (m, c) in &self.terms {
            let mut coeff = *c;
            let mut rest: Vec<(String, u32)> = Vec::new();
            for (name, e) in m.powers() {
                match values.get(name) {
                    Some(v) => coeff *= v.powu(*e),
                    None => rest.push((name.clone(), *e)),
                }
            }
            out.add_term(Monomial(rest), coeff);
        }
        out
    }

    pub fn derivative(&self, var: &str) -> Poly {
        let mut out = Poly::zero();
        for (m, c) in &self.terms {
            let d = m.degree_in(var);
            if d == 0 {
                continue;
            }
            let reduced = m.without(var).mul(&Monomial::var(var, d - 1));
            out.add_term(reduced, *c * d as f64);
        }
        out
    }

    /// Complex conjugate of every coefficient (symbols are taken as real).
    pub fn conj(&self) -> Poly {
        Poly {
            terms: self.terms.iter().map(|(m, c)| (m.clone(), c.conj())).collect(),
        }
    }

    pub fn is_real(&self) -> bool {
        self.terms.values().all(|c| c.im.abs() <= REL_TOL * c.norm().max(1e-300))
    }

    pub fn max_abs_coeff(&self) -> f64 {
        self.terms.values().map(|c| c.norm()).fold(0.0, f64::max)
    }

    /// Largest monomial under graded ordering, with its coefficient.
    pub fn lead(&self) -> Option<(&Monomial, C64)> {
        self.terms
            .iter()
            .max_by(|(a, _), (b, _)| {
                a.total_degree()
                    .cmp(&b.total_degree())
                    .then_with(|| b.cmp(a))
            })
            .map(|(m, c)| (m, *c))
    }

    /// Monomial dividing every term.
    pub fn content_monomial(&self) -> Monomial {
        let mut iter = self.terms.keys();
        let Some(first) = iter.next() else {
            return Monomial::one();
        };
        iter.fold(first.clone(), |acc, m| acc.gcd(m))
    }

    pub fn div_monomial(&self, m: &Monomial) -> Option<Poly> {
        let mut out = Poly::zero();
        for (t, c) in &self.terms {
            out.terms.insert(t.div(m)?, *c);
        }
        Some(out)
    }

    /// Drops every term containing exactly `var^deg`.
    fn drop_degree(&mut self, var: &str, deg: u32) {
        self.terms.retain(|m, _| m.degree_in(var) != deg);
    }

    /// Exact polynomial division. Returns `None` when `d` does not divide `self`.
    pub fn div_exact(&self, d: &Poly) -> Option<Poly> {
        if d.is_zero() {
            return None;
        }
        if self.is_zero() {
            return Some(Poly::zero());
        }
        if let Some(c) = d.as_constant() {
            return Some(self.scale(C64::new(1.0, 0.0) / c));
        }
        if d.terms.len() == 1 {
            let (m, c) = d.terms.iter().next()?;
            let q = self.div_monomial(m)?;
            return Some(q.scale(C64::new(1.0, 0.0) / *c));
        }
        let var = d
            .free_symbols()
            .into_iter()
            .max_by_key(|v| d.degree(v))?;
        let dd = d.degree(&var);
        let d_coeffs = d.coeffs(&var);
        let lc = &d_coeffs[dd as usize];

        let mut rem = self.clone();
        let mut quot = Poly::zero();
        let mut guard = self.degree(&var) + 2;
        loop {
            if rem.is_zero() {
                return Some(quot);
            }
            let rd = rem.degree(&var);
            if rd < dd || guard == 0 {
                return None;
            }
            guard -= 1;
            let lead = &rem.coeffs(&var)[rd as usize];
            let qc = lead.div_exact(lc)?;
            let step = qc.mul(&Poly::power_of(&var, rd - dd));
            rem = rem.sub(&step.mul(d));
            rem.drop_degree(&var, rd);
            quot = quot.add(&step);
        }
    }
}

impl PartialEq for Poly {
    fn eq(&self, other: &Self) -> bool {
        self.sub(other).is_zero()
    }
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

fn round_sig(x: f64, digits: usize) -> f64 {
    if x == 0.0 || !x.is_finite() {
        return x;
    }
    format!("{:.*e}", digits - 1, x).parse().unwrap_or(x)
}

/// Formats a real number with twelve significant digits.
pub fn fmt_real(x: f64) -> String {
    let r = round_sig(x, 12);
    if r.fract() == 0.0 && r.abs() < 1e15 {
        format!("{:.0}", r)
    } else {
        format!("{}", r)
    }
}

/// Formats a complex number using `j` as imaginary unit.
pub fn fmt_c64(c: C64) -> String {
    let scale = c.norm().max(1e-300);
    let re_zero = c.re.abs() <= 1e-12 * scale;
    let im_zero = c.im.abs() <= 1e-12 * scale;
    match (re_zero, im_zero) {
        (_, true) => fmt_real(c.re),
        (true, false) => {
            if (c.im - 1.0).abs() < 1e-15 {
                "j".to_string()
            } else if (c.im + 1.0).abs() < 1e-15 {
                "-j".to_string()
            } else {
                format!("{}*j", fmt_real(c.im))
            }
        }
        (false, false) => {
            let sign = if c.im < 0.0 { "-" } else { "+" };
            format!("({} {} {}*j)", fmt_real(c.re), sign, fmt_real(c.im.abs()))
        }
    }
}

impl fmt::Display for Poly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            return write!(f, "0");
        }
        let mut ordered: Vec<(&Monomial, &C64)> = self.terms.iter().collect();
        ordered.sort_by(|(a, _), (b, _)| {
            b.total_degree().cmp(&a.total_degree()).then_with(|| a.cmp(b))
        });
        let mut out = String::new();
        for (i, (m, c)) in ordered.into_iter().enumerate() {
            let real = c.im.abs() <= 1e-12 * c.norm();
            let negative = real && c.re < 0.0;
            let mag = if negative { -*c } else { *c };
            if i == 0 {
                if negative {
                    out.push('-');
                }
            } else if negative {
                out.push_str(" - ");
            } else {
                out.push_str(" + ");
            }
            let unit = (mag - C64::new(1.0, 0.0)).norm() < 1e-15;
            if m.is_one() {
                out.push_str(&fmt_c64(mag));
            } else if unit {
                out.push_str(&m.to_string());
            } else {
                out.push_str(&format!("{}*{}", fmt_c64(mag), m));
            }
        }
        write!(f, "{}", out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s() -> Poly {
        Poly::symbol("s")
    }

    #[test]
    fn test_mul_and_display() {
        // (s + 1)(s - 2) = s^2 - s - 2
        let p = s().add(&Poly::real(1.0)).mul(&s().sub(&Poly::real(2.0)));
        assert_eq!(p.to_string(), "s^2 - s - 2");
        assert_eq!(p.degree("s"), 2);
    }

    #[test]
    fn test_cancellation_drops_terms() {
        let a = Poly::real(0.1).add(&Poly::real(0.2));
        let b = a.sub(&Poly::real(0.3));
        assert!(b.is_zero());
    }

    #[test]
    fn test_div_exact_multivariate() {
        // (R*s + 1)(s + C) / (s + C) = R*s + 1
        let r = Poly::symbol("R");
        let c = Poly::symbol("C");
        let f1 = r.mul(&s()).add(&Poly::one());
        let f2 = s().add(&c);
        let q = f1.mul(&f2).div_exact(&f2).expect("exact");
        assert_eq!(q, f1);
        assert!(f1.div_exact(&f2).is_none());
    }

    #[test]
    fn test_subs_and_eval() {
        let p = s().pow(2).add(&Poly::symbol("a"));
        let q = p.subs("s", &Poly::real(3.0));
        let mut values = HashMap::new();
        values.insert("a".to_string(), C64::new(1.0, 0.0));
        let v = q.eval(&values).as_constant().unwrap();
        assert!((v.re - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_coeffs_roundtrip() {
        let p = Poly::symbol("x").mul(&s().pow(2)).add(&s()).add(&Poly::real(4.0));
        let coeffs = p.coeffs("s");
        assert_eq!(coeffs.len(), 3);
        assert_eq!(Poly::from_coeffs("s", &coeffs), p);
    }

    #[test]
    fn test_fmt_complex() {
        assert_eq!(fmt_c64(C64::new(0.0, 2.0)), "2*j");
        assert_eq!(fmt_c64(C64::new(1.5, -1.0)), "(1.5 - 1*j)");
        assert_eq!(fmt_real(0.1 + 0.2), "0.3");
    }
}
