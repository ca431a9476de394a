//! Rational functions of multivariate polynomials.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use super::poly::{Monomial, Poly, C64};
use crate::error::{Result, SymnodalError};

/// `num / den`, kept normalised: no common monomial content, common
/// polynomial factors cancelled where a GCD is found, and a monic denominator.
#[derive(Debug, Clone)]
pub struct Ratio {
    num: Poly,
    den: Poly,
}

impl Default for Ratio {
    fn default() -> Self {
        Self::zero()
    }
}

impl Ratio {
    pub fn zero() -> Self {
        Self {
            num: Poly::zero(),
            den: Poly::one(),
        }
    }

    pub fn one() -> Self {
        Self::from_poly(Poly::one())
    }

    pub fn constant(c: C64) -> Self {
        Self::from_poly(Poly::constant(c))
    }

    pub fn real(x: f64) -> Self {
        Self::constant(C64::new(x, 0.0))
    }

    pub fn imag(x: f64) -> Self {
        Self::constant(C64::new(0.0, x))
    }

    pub fn symbol(name: &str) -> Self {
        Self::from_poly(Poly::symbol(name))
    }

    pub fn from_poly(p: Poly) -> Self {
        Self {
            num: p,
            den: Poly::one(),
        }
    }

    /// Builds `num / den`, failing on a zero denominator.
    pub fn new(num: Poly, den: Poly) -> Result<Self> {
        if den.is_zero() {
            return Err(SymnodalError::Algebra(format!("division by zero: ({}) / 0", num)));
        }
        Ok(Self::normalized(num, den))
    }

    fn normalized(num: Poly, den: Poly) -> Self {
        if num.is_zero() {
            return Self::zero();
        }
        let mut num = num;
        let mut den = den;

        let content = num.content_monomial().gcd(&den.content_monomial());
        if !content.is_one() {
            if let (Some(n), Some(d)) = (num.div_monomial(&content), den.div_monomial(&content)) {
                num = n;
                den = d;
            }
        }

        if !den.is_constant() {
            if let Some(q) = num.div_exact(&den) {
                num = q;
                den = Poly::one();
            } else if let Some(q) = den.div_exact(&num) {
                num = Poly::one();
                den = q;
            } else {
                let g = gcd(&num, &den);
                if !g.is_constant() {
                    if let (Some(n), Some(d)) = (num.div_exact(&g), den.div_exact(&g)) {
                        num = n;
                        den = d;
                    }
                }
            }
        }

        if let Some((_, lc)) = den.lead() {
            let k = C64::new(1.0, 0.0) / lc;
            num = num.scale(k);
            den = den.scale(k);
        }
        Self { num, den }
    }

    pub fn num(&self) -> &Poly {
        &self.num
    }

    pub fn den(&self) -> &Poly {
        &self.den
    }

    pub fn into_parts(self) -> (Poly, Poly) {
        (self.num, self.den)
    }

    pub fn is_zero(&self) -> bool {
        self.num.is_zero()
    }

    pub fn is_one(&self) -> bool {
        self.as_constant()
            .map(|c| (c - C64::new(1.0, 0.0)).norm() < 1e-12)
            .unwrap_or(false)
    }

    pub fn is_polynomial(&self) -> bool {
        self.den.is_constant()
    }

    pub fn as_constant(&self) -> Option<C64> {
        let n = self.num.as_constant()?;
        let d = self.den.as_constant()?;
        Some(n / d)
    }

    /// Real value when the ratio is a numeric constant with negligible imaginary part.
    pub fn as_real(&self) -> Option<f64> {
        let c = self.as_constant()?;
        (c.im.abs() <= 1e-12 * c.norm().max(1.0)).then_some(c.re)
    }

    pub fn free_symbols(&self) -> BTreeSet<String> {
        let mut syms = self.num.free_symbols();
        syms.extend(self.den.free_symbols());
        syms
    }

    pub fn contains(&self, var: &str) -> bool {
        self.num.contains(var) || self.den.contains(var)
    }

    pub fn is_real(&self) -> bool {
        self.num.is_real() && self.den.is_real()
    }

    pub fn add(&self, other: &Ratio) -> Ratio {
        if self.is_zero() {
            return other.clone();
        }
        if other.is_zero() {
            return self.clone();
        }
        if self.den == other.den {
            return Self::normalized(self.num.add(&other.num), self.den.clone());
        }
        if let Some(k) = self.den.div_exact(&other.den) {
            return Self::normalized(self.num.add(&other.num.mul(&k)), self.den.clone());
        }
        if let Some(k) = other.den.div_exact(&self.den) {
            return Self::normalized(self.num.mul(&k).add(&other.num), other.den.clone());
        }
        Self::normalized(
            self.num.mul(&other.den).add(&other.num.mul(&self.den)),
            self.den.mul(&other.den),
        )
    }

    pub fn sub(&self, other: &Ratio) -> Ratio {
        self.add(&other.neg())
    }

    pub fn neg(&self) -> Ratio {
        Self {
            num: self.num.neg(),
            den: self.den.clone(),
        }
    }

    pub fn scale(&self, k: C64) -> Ratio {
        if k == C64::new(0.0, 0.0) {
            return Ratio::zero();
        }
        Self {
            num: self.num.scale(k),
            den: self.den.clone(),
        }
    }

    pub fn mul(&self, other: &Ratio) -> Ratio {
        if self.is_zero() || other.is_zero() {
            return Ratio::zero();
        }
        if other.is_polynomial() && self.is_polynomial() {
            let k = C64::new(1.0, 0.0) / (self.den_const() * other.den_const());
            return Self::from_poly(self.num.mul(&other.num).scale(k));
        }
        Self::normalized(self.num.mul(&other.num), self.den.mul(&other.den))
    }

    fn den_const(&self) -> C64 {
        self.den.as_constant().unwrap_or(C64::new(1.0, 0.0))
    }

    pub fn div(&self, other: &Ratio) -> Result<Ratio> {
        Ok(self.mul(&other.inv()?))
    }

    pub fn inv(&self) -> Result<Ratio> {
        if self.is_zero() {
            return Err(SymnodalError::Algebra("division by zero".to_string()));
        }
        Ok(Self::normalized(self.den.clone(), self.num.clone()))
    }

    pub fn powi(&self, n: i32) -> Result<Ratio> {
        let base = if n < 0 { self.inv()? } else { self.clone() };
        let mut out = Ratio::one();
        for _ in 0..n.unsigned_abs() {
            out = out.mul(&base);
        }
        Ok(out)
    }

    /// Substitutes `var` by `value` in numerator and denominator.
    pub fn subs(&self, var: &str, value: &Ratio) -> Result<Ratio> {
        if !self.contains(var) {
            return Ok(self.clone());
        }
        let n = horner(&self.num, var, value);
        let d = horner(&self.den, var, value);
        if d.is_zero() {
            return Err(SymnodalError::Algebra(format!(
                "substituting {} = {} makes the denominator of {} vanish",
                var, value, self
            )));
        }
        n.div(&d)
    }

    /// Substitutes numeric values for the named symbols.
    pub fn eval(&self, values: &HashMap<String, C64>) -> Result<Ratio> {
        let den = self.den.eval(values);
        if den.is_zero() {
            return Err(SymnodalError::Algebra(format!(
                "denominator of {} vanishes at the given values",
                self
            )));
        }
        Ratio::new(self.num.eval(values), den)
    }

    pub fn eval_at(&self, var: &str, x: C64) -> Result<Ratio> {
        let mut values = HashMap::new();
        values.insert(var.to_string(), x);
        self.eval(&values)
    }

    /// Evaluates to a number; every free symbol must be bound.
    pub fn evaluate(&self, values: &HashMap<String, C64>) -> Result<C64> {
        let r = self.eval(values)?;
        r.as_constant().ok_or_else(|| {
            SymnodalError::Algebra(format!(
                "cannot evaluate {} numerically: unbound symbols {:?}",
                self,
                r.free_symbols()
            ))
        })
    }

    /// Limit as `var -> 0`. Diverging limits are an error.
    pub fn limit_zero(&self, var: &str) -> Result<Ratio> {
        if !self.contains(var) {
            return Ok(self.clone());
        }
        if self.is_zero() {
            return Ok(Ratio::zero());
        }
        let a = self.num.min_degree(var);
        let b = self.den.min_degree(var);
        if a > b {
            return Ok(Ratio::zero());
        }
        if a < b {
            return Err(SymnodalError::Algebra(format!(
                "{} diverges as {} -> 0",
                self, var
            )));
        }
        let na = &self.num.coeffs(var)[a as usize];
        let db = &self.den.coeffs(var)[b as usize];
        Ratio::new(na.clone(), db.clone())
    }

    pub fn derivative(&self, var: &str) -> Ratio {
        let dn = self.num.derivative(var);
        let dd = self.den.derivative(var);
        if dd.is_zero() {
            return Self::normalized(dn, self.den.clone());
        }
        Self::normalized(
            dn.mul(&self.den).sub(&self.num.mul(&dd)),
            self.den.mul(&self.den),
        )
    }

    /// Coefficient of `var` in an expression affine in `var`.
    pub fn linear_coefficient(&self, var: &str) -> Result<Ratio> {
        let d = self.derivative(var);
        if d.contains(var) {
            return Err(SymnodalError::Algebra(format!(
                "{} is not linear in {}",
                self, var
            )));
        }
        Ok(d)
    }

    pub fn conj(&self) -> Ratio {
        Self {
            num: self.num.conj(),
            den: self.den.conj(),
        }
    }

    pub fn num_degree(&self, var: &str) -> u32 {
        self.num.degree(var)
    }

    pub fn den_degree(&self, var: &str) -> u32 {
        self.den.degree(var)
    }
}

fn horner(p: &Poly, var: &str, value: &Ratio) -> Ratio {
    let mut acc = Ratio::zero();
    for c in p.coeffs(var).iter().rev() {
        acc = acc.mul(value).add(&Ratio::from_poly(c.clone()));
    }
    acc
}

impl PartialEq for Ratio {
    fn eq(&self, other: &Self) -> bool {
        self.num.mul(&other.den) == other.num.mul(&self.den)
    }
}

impl From<f64> for Ratio {
    fn from(x: f64) -> Self {
        Ratio::real(x)
    }
}

impl From<C64> for Ratio {
    fn from(c: C64) -> Self {
        Ratio::constant(c)
    }
}

// ---------------------------------------------------------------------------
// GCD
// ---------------------------------------------------------------------------

/// Greatest common divisor by primitive pseudo-remainder sequences.
///
/// Coefficients are floating point, so the candidate is verified by exact
/// division and `1` is returned whenever verification fails.
pub fn gcd(a: &Poly, b: &Poly) -> Poly {
    if a.is_zero() {
        return b.clone();
    }
    if b.is_zero() {
        return a.clone();
    }
    if a.is_constant() || b.is_constant() {
        return Poly::one();
    }
    let monomial = a.content_monomial().gcd(&b.content_monomial());
    let common: Vec<String> = a
        .free_symbols()
        .intersection(&b.free_symbols())
        .cloned()
        .collect();
    let Some(var) = common
        .iter()
        .max_by_key(|v| a.degree(v).min(b.degree(v)))
        .cloned()
    else {
        return Poly::monomial(monomial, C64::new(1.0, 0.0));
    };

    let (ca, pa) = primitive(a, &var);
    let (cb, pb) = primitive(b, &var);
    let content = gcd(&ca, &cb);

    let (mut x, mut y) = if pa.degree(&var) >= pb.degree(&var) {
        (pa, pb)
    } else {
        (pb, pa)
    };
    let mut guard = x.degree(&var) + 2;
    let g = loop {
        if guard == 0 {
            break Poly::one();
        }
        guard -= 1;
        let r = prem(&x, &y, &var);
        if r.is_zero() {
            break y;
        }
        if r.degree(&var) == 0 {
            break Poly::one();
        }
        x = y;
        y = primitive(&r, &var).1;
    };
    let candidate = normalize_lead(&g.mul(&content));
    if candidate.is_constant() {
        return Poly::monomial(monomial, C64::new(1.0, 0.0));
    }
    match (a.div_exact(&candidate), b.div_exact(&candidate)) {
        (Some(_), Some(_)) => candidate,
        _ => Poly::monomial(monomial, C64::new(1.0, 0.0)),
    }
}

fn normalize_lead(p: &Poly) -> Poly {
    match p.lead() {
        Some((_, c)) => p.scale(C64::new(1.0, 0.0) / c),
        None => p.clone(),
    }
}

/// Content (GCD of coefficients in `var`) and primitive part.
fn primitive(p: &Poly, var: &str) -> (Poly, Poly) {
    let coeffs: Vec<Poly> = p.coeffs(var).into_iter().filter(|c| !c.is_zero()).collect();
    let mut content = match coeffs.first() {
        Some(c) => c.clone(),
        None => return (Poly::one(), Poly::zero()),
    };
    for c in &coeffs[1..] {
        if content.is_constant() {
            break;
        }
        content = gcd(&content, c);
    }
    if content.is_constant() {
        return (Poly::one(), normalize_lead(p));
    }
    match p.div_exact(&content) {
        Some(pp) => (content, normalize_lead(&pp)),
        None => (Poly::one(), normalize_lead(p)),
    }
}

/// Pseudo-remainder of `a` by `b` in `var`.
fn prem(a: &Poly, b: &Poly, var: &str) -> Poly {
    let db = b.degree(var);
    let lb = &b.coeffs(var)[db as usize];
    let mut r = a.clone();
    let mut guard = a.degree(var) + 2;
    while !r.is_zero() && r.degree(var) >= db && r.contains(var) && guard > 0 {
        guard -= 1;
        let dr = r.degree(var);
        let lr = r.coeffs(var)[dr as usize].clone();
        let shift = Poly::monomial(Monomial::var(var, dr - db), C64::new(1.0, 0.0));
        let mut next = r.mul(lb).sub(&lr.mul(&shift).mul(b));
        next = Poly::from_coeffs(
            var,
            &next.coeffs(var)[..(dr as usize).min(next.degree(var) as usize + 1)],
        );
        r = next;
    }
    if db == 0 {
        return Poly::zero();
    }
    r
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

fn wrap(p: &Poly) -> String {
    if p.len() > 1 {
        format!("({})", p)
    } else {
        p.to_string()
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.den.as_constant() {
            Some(d) if (d - C64::new(1.0, 0.0)).norm() < 1e-15 => write!(f, "{}", self.num),
            _ => write!(f, "{}/{}", wrap(&self.num), wrap(&self.den)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s() -> Ratio {
        Ratio::symbol("s")
    }

    #[test]
    fn test_cancels_common_factor() {
        // (s^2 - 1) / (s + 1) = s - 1
        let num = s().mul(&s()).sub(&Ratio::one());
        let r = num.div(&s().add(&Ratio::one())).unwrap();
        assert!(r.is_polynomial());
        assert_eq!(r, s().sub(&Ratio::one()));
    }

    #[test]
    fn test_gcd_with_symbolic_coefficients() {
        // (R*C*s + 1)(s + 2) / ((R*C*s + 1)(s + 3))
        let rc = Ratio::symbol("R").mul(&Ratio::symbol("C"));
        let f = rc.mul(&s()).add(&Ratio::one());
        let a = f.mul(&s().add(&Ratio::real(2.0)));
        let b = f.mul(&s().add(&Ratio::real(3.0)));
        let r = a.div(&b).unwrap();
        assert_eq!(r.den_degree("s"), 1);
        assert_eq!(r, s().add(&Ratio::real(2.0)).div(&s().add(&Ratio::real(3.0))).unwrap());
    }

    #[test]
    fn test_divide_by_zero_is_error() {
        assert!(Ratio::one().div(&Ratio::zero()).is_err());
    }

    #[test]
    fn test_limit_zero() {
        let eps = Ratio::symbol("epsilon");
        // (eps + 2) / (3 eps + 4) -> 1/2
        let r = eps.add(&Ratio::real(2.0)).div(&eps.scale(C64::new(3.0, 0.0)).add(&Ratio::real(4.0))).unwrap();
        let l = r.limit_zero("epsilon").unwrap().as_real().unwrap();
        assert!((l - 0.5).abs() < 1e-12);
        // 1 / eps diverges
        assert!(eps.inv().unwrap().limit_zero("epsilon").is_err());
    }

    #[test]
    fn test_subs_rational_value() {
        // 1/(s+1) at s = 1/x gives x/(x+1)
        let r = Ratio::one().div(&s().add(&Ratio::one())).unwrap();
        let x = Ratio::symbol("x");
        let v = r.subs("s", &x.inv().unwrap()).unwrap();
        assert_eq!(v, x.div(&x.add(&Ratio::one())).unwrap());
    }

    #[test]
    fn test_linear_coefficient() {
        let a = Ratio::symbol("a");
        let e = a.scale(C64::new(3.0, 0.0)).add(&Ratio::symbol("b"));
        let k = e.linear_coefficient("a").unwrap().as_real().unwrap();
        assert!((k - 3.0).abs() < 1e-12);
        assert!(a.mul(&a).linear_coefficient("a").is_err());
    }

    #[test]
    fn test_display() {
        let r = Ratio::one().div(&s().add(&Ratio::one())).unwrap();
        assert_eq!(r.to_string(), "1/(s + 1)");
    }
}
