//! Rational-function views of transform-domain expressions: poles, zeros,
//! residues and the canonical, ZPK and partial-fraction presentations.

use std::fmt;

use super::domain::Domain;
use super::expression::{Expr, Value};
use super::transform::{expand, split_proper};
use crate::cas::poly::{fmt_c64, Poly};
use crate::cas::{self, Ratio, Root, UPoly, C64};
use crate::error::{Result, SymnodalError};

/// Roots of a polynomial in `var`.
pub fn roots_in(p: &Poly, var: &str) -> Result<Vec<Root>> {
    UPoly::from_poly(p, var).roots()
}

/// One partial-fraction term `coeff / (var − pole)^order`.
#[derive(Debug, Clone)]
pub struct Residue {
    pub pole: Ratio,
    pub order: u32,
    pub coeff: Ratio,
}

/// Sum of a polynomial part and partial-fraction terms.
///
/// Kept as a presentation: converting back to a [`Ratio`] recombines the
/// terms over a common denominator.
#[derive(Debug, Clone)]
pub struct PartialFractions {
    pub var: String,
    pub polynomial: UPoly,
    pub terms: Vec<Residue>,
}

impl PartialFractions {
    pub fn to_ratio(&self) -> Result<Ratio> {
        let x = Ratio::symbol(&self.var);
        let mut acc = self.polynomial.to_ratio();
        for r in &self.terms {
            acc = acc.add(&r.coeff.mul(&x.sub(&r.pole).powi(-(r.order as i32))?));
        }
        Ok(acc)
    }
}

fn factor_str(var: &str, root: &Ratio) -> String {
    if root.is_zero() {
        return var.to_string();
    }
    match root.as_constant() {
        Some(c) => format!("{} - {}", var, fmt_c64(c)),
        None => format!("{} - ({})", var, root),
    }
}

fn paren(s: String) -> String {
    if s.contains(' ') {
        format!("({})", s)
    } else {
        s
    }
}

impl fmt::Display for PartialFractions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if !self.polynomial.is_zero() {
            parts.push(self.polynomial.to_string());
        }
        for r in &self.terms {
            let base = paren(factor_str(&self.var, &r.pole));
            let den = if r.order == 1 {
                base
            } else {
                format!("{}^{}", base, r.order)
            };
            parts.push(format!("{}/{}", paren(r.coeff.to_string()), den));
        }
        if parts.is_empty() {
            write!(f, "0")
        } else {
            write!(f, "{}", parts.join(" + "))
        }
    }
}

/// `gain · N(x) / D(x)` with monic `N` and `D`.
#[derive(Debug, Clone)]
pub struct Canonical {
    pub gain: Ratio,
    pub num: UPoly,
    pub den: UPoly,
}

impl Canonical {
    pub fn to_ratio(&self) -> Result<Ratio> {
        Ok(self.gain.mul(&self.num.to_ratio().div(&self.den.to_ratio())?))
    }
}

impl fmt::Display for Canonical {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let gain = paren(self.gain.to_string());
        if self.den.degree() == 0 {
            return write!(f, "{}*{}", gain, paren(self.num.to_string()));
        }
        write!(
            f,
            "{}*{}/{}",
            gain,
            paren(self.num.to_string()),
            paren(self.den.to_string())
        )
    }
}

/// Zero-pole-gain form.
#[derive(Debug, Clone)]
pub struct Zpk {
    pub var: String,
    pub gain: Ratio,
    pub zeros: Vec<Root>,
    pub poles: Vec<Root>,
}

impl Zpk {
    pub fn to_ratio(&self) -> Result<Ratio> {
        let x = Ratio::symbol(&self.var);
        let mut acc = self.gain.clone();
        for z in &self.zeros {
            acc = acc.mul(&x.sub(&z.value).powi(z.multiplicity as i32)?);
        }
        for p in &self.poles {
            acc = acc.mul(&x.sub(&p.value).powi(-(p.multiplicity as i32))?);
        }
        Ok(acc)
    }
}

fn product_str(var: &str, roots: &[Root]) -> String {
    if roots.is_empty() {
        return "1".to_string();
    }
    roots
        .iter()
        .map(|r| {
            let base = format!("({})", factor_str(var, &r.value));
            if r.multiplicity > 1 {
                format!("{}^{}", base, r.multiplicity)
            } else {
                base
            }
        })
        .collect::<Vec<_>>()
        .join("*")
}

impl fmt::Display for Zpk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let num = product_str(&self.var, &self.zeros);
        let gain = paren(self.gain.to_string());
        if self.poles.is_empty() {
            write!(f, "{}*{}", gain, num)
        } else {
            write!(f, "{}*{}/({})", gain, num, product_str(&self.var, &self.poles))
        }
    }
}

impl Expr {
    /// Domain variable and the undelayed rational value.
    fn rational(&self) -> Result<(&'static str, Ratio)> {
        let var = match self.domain() {
            Domain::Laplace => cas::S,
            Domain::Fourier => cas::F,
            Domain::AngularFourier => cas::OMEGA,
            Domain::Z => cas::Z,
            Domain::Constant => cas::S,
            d => {
                return Err(SymnodalError::IncompatibleOperands(format!(
                    "{} expressions are not rational functions",
                    d
                )));
            }
        };
        let r = self.ratio().ok_or_else(|| {
            SymnodalError::IncompatibleOperands(format!(
                "{} contains delays and is not a rational function",
                self
            ))
        })?;
        Ok((var, r))
    }

    /// Poles, with multiplicity. Delayed sums report the poles of every part.
    pub fn poles(&self) -> Result<Vec<Root>> {
        if let Value::Laplace(d) | Value::Fourier(d) | Value::AngularFourier(d) = self.value() {
            let var = self.domain().var().unwrap_or(cas::S);
            let mut out: Vec<Root> = Vec::new();
            for (_, r) in d.parts() {
                for p in roots_in(r.den(), var)? {
                    match out.iter_mut().find(|q| q.value == p.value) {
                        Some(q) => q.multiplicity = q.multiplicity.max(p.multiplicity),
                        None => out.push(p),
                    }
                }
            }
            return Ok(out);
        }
        let (var, r) = self.rational()?;
        roots_in(r.den(), var)
    }

    pub fn zeros(&self) -> Result<Vec<Root>> {
        let (var, r) = self.rational()?;
        roots_in(r.num(), var)
    }

    /// Partial-fraction coefficients of the proper part.
    pub fn residues(&self) -> Result<Vec<Residue>> {
        Ok(self.partfrac()?.terms)
    }

    pub fn partfrac(&self) -> Result<PartialFractions> {
        let (var, r) = self.rational()?;
        let (polynomial, rem, den) = split_proper(&r, var)?;
        let terms = if rem.is_zero() {
            Vec::new()
        } else {
            expand(&rem, &den)?
                .into_iter()
                .map(|(pole, order, coeff)| Residue { pole, order, coeff })
                .collect()
        };
        Ok(PartialFractions {
            var: var.to_string(),
            polynomial,
            terms,
        })
    }

    pub fn canonical(&self) -> Result<Canonical> {
        let (var, r) = self.rational()?;
        let num = UPoly::from_poly(r.num(), var);
        let den = UPoly::from_poly(r.den(), var);
        let (ln, ld) = (num.leading(), den.leading());
        if ln.is_zero() {
            return Ok(Canonical {
                gain: Ratio::zero(),
                num: UPoly::new(var, vec![Ratio::one()]),
                den: UPoly::new(var, vec![Ratio::one()]),
            });
        }
        Ok(Canonical {
            gain: ln.div(&ld)?,
            num: num.scale(&ln.inv()?),
            den: den.scale(&ld.inv()?),
        })
    }

    pub fn zpk(&self) -> Result<Zpk> {
        let (var, r) = self.rational()?;
        let c = self.canonical()?;
        Ok(Zpk {
            var: var.to_string(),
            gain: c.gain,
            zeros: roots_in(r.num(), var)?,
            poles: roots_in(r.den(), var)?,
        })
    }

    /// Value at zero frequency: `s = 0`, `f = 0`, `omega = 0` or `z = 1`.
    pub fn dc_gain(&self) -> Result<Ratio> {
        match self.value() {
            Value::Constant(c) => Ok(c.clone()),
            Value::Z(r) => r.subs(cas::Z, &Ratio::one()),
            Value::Laplace(d) | Value::Fourier(d) | Value::AngularFourier(d) => {
                let var = self.domain().var().unwrap_or(cas::S);
                let mut acc = Ratio::zero();
                for (_, r) in d.parts() {
                    acc = acc.add(&r.subs(var, &Ratio::zero())?);
                }
                Ok(acc)
            }
            other => Err(SymnodalError::IncompatibleOperands(format!(
                "no DC gain for a {} expression",
                other.domain()
            ))),
        }
    }

    /// Zero before the origin. Transform-domain values must be proper with
    /// non-negative delays.
    pub fn is_causal(&self) -> bool {
        match self.value() {
            Value::Time(s) | Value::DiscreteTime(s) => s.is_causal(),
            Value::Laplace(d) => d.parts().iter().all(|(t, r)| {
                *t >= 0.0 && r.num_degree(cas::S) <= r.den_degree(cas::S)
            }),
            Value::Z(r) => r.num_degree(cas::Z) <= r.den_degree(cas::Z),
            _ => false,
        }
    }

    /// Bounded-input bounded-output stability. Symbolic poles are not
    /// provably stable.
    pub fn is_stable(&self) -> bool {
        let within = |poles: Result<Vec<Root>>, inside: &dyn Fn(C64) -> bool| match poles {
            Ok(poles) => poles
                .iter()
                .all(|p| p.numeric().map(inside).unwrap_or(false)),
            Err(_) => false,
        };
        match self.value() {
            Value::Time(s) => s.is_decaying() && s.impulses().iter().all(|d| d.order == 0),
            Value::DiscreteTime(s) => s.is_decaying(),
            Value::Laplace(_) => self.is_causal() && within(self.poles(), &|p| p.re < 0.0),
            Value::Z(_) => self.is_causal() && within(self.poles(), &|p| p.norm() < 1.0),
            Value::Constant(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn laplace(text: &str) -> Expr {
        Expr::parse(text, Domain::Laplace).unwrap()
    }

    #[test]
    fn test_poles_and_zeros() {
        let h = laplace("(s + 3)/((s + 1)*(s + 2))");
        let mut poles: Vec<f64> = h
            .poles()
            .unwrap()
            .iter()
            .map(|p| p.numeric().unwrap().re)
            .collect();
        poles.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_abs_diff_eq!(poles[0], -2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(poles[1], -1.0, epsilon = 1e-9);
        let zeros = h.zeros().unwrap();
        assert_eq!(zeros.len(), 1);
        assert_abs_diff_eq!(zeros[0].numeric().unwrap().re, -3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_partfrac_recombines() {
        let h = laplace("(s + 3)/((s + 1)*(s + 2))");
        let pf = h.partfrac().unwrap();
        assert_eq!(pf.terms.len(), 2);
        for r in &pf.terms {
            let p = r.pole.as_real().unwrap();
            let c = r.coeff.as_real().unwrap();
            if (p + 1.0).abs() < 1e-9 {
                assert_abs_diff_eq!(c, 2.0, epsilon = 1e-9);
            } else {
                assert_abs_diff_eq!(c, -1.0, epsilon = 1e-9);
            }
        }
        assert_eq!(pf.to_ratio().unwrap(), h.ratio().unwrap());
    }

    #[test]
    fn test_symbolic_first_order_residue() {
        let h = laplace("1/(s*R*C + 1)");
        let pf = h.partfrac().unwrap();
        assert_eq!(pf.terms.len(), 1);
        assert_eq!(pf.to_ratio().unwrap(), h.ratio().unwrap());
    }

    #[test]
    fn test_canonical_and_zpk() {
        let h = laplace("(2*s + 4)/(3*s + 3)");
        let c = h.canonical().unwrap();
        assert_abs_diff_eq!(c.gain.as_real().unwrap(), 2.0 / 3.0, epsilon = 1e-12);
        assert_eq!(c.to_ratio().unwrap(), h.ratio().unwrap());
        let z = h.zpk().unwrap();
        assert_eq!(z.to_ratio().unwrap(), h.ratio().unwrap());
    }

    #[test]
    fn test_dc_gain_and_stability() {
        let h = laplace("4/(s^2 + 3*s + 2)");
        assert_abs_diff_eq!(h.dc_gain().unwrap().as_real().unwrap(), 2.0, epsilon = 1e-12);
        assert!(h.is_stable());
        assert!(h.is_causal());
        assert!(!laplace("1/(s - 1)").is_stable());
        assert!(!laplace("s^2/(s + 1)").is_causal());
        assert!(laplace("1/s").dc_gain().is_err());
    }

    #[test]
    fn test_z_stability() {
        let h = Expr::parse("z/(z - 0.5)", Domain::Z).unwrap();
        assert!(h.is_stable());
        assert!(!Expr::parse("z/(z - 2)", Domain::Z).unwrap().is_stable());
    }
}
