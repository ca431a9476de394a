//! Sums of rational functions weighted by pure delays, `Σ R_i · e^{-x·T_i}`.
//!
//! The kernel variable is implied by the owning domain: `e^{-s·T}` for
//! Laplace values, `e^{-j·2π·f·T}` for Fourier values and `e^{-j·ω·T}` for
//! angular Fourier values. Substituting `s = j·2π·f` therefore maps a Laplace
//! value onto its Fourier counterpart without touching the delays.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use super::poly::{fmt_real, C64};
use super::ratio::Ratio;
use crate::error::{Result, SymnodalError};

/// Delays closer than this are merged.
const DELAY_TOL: f64 = 1e-15;

#[derive(Debug, Clone, Default)]
pub struct Delayed {
    parts: Vec<(f64, Ratio)>,
}

impl Delayed {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn from_ratio(r: Ratio) -> Self {
        Self::delayed(r, 0.0)
    }

    pub fn delayed(r: Ratio, delay: f64) -> Self {
        let mut d = Self::zero();
        d.push(delay, r);
        d
    }

    fn push(&mut self, delay: f64, r: Ratio) {
        if r.is_zero() {
            return;
        }
        match self
            .parts
            .iter()
            .position(|(t, _)| (t - delay).abs() <= DELAY_TOL * delay.abs().max(1.0))
        {
            Some(i) => {
                let sum = self.parts[i].1.add(&r);
                if sum.is_zero() {
                    self.parts.remove(i);
                } else {
                    self.parts[i].1 = sum;
                }
            }
            None => {
                self.parts.push((delay, r));
                self.parts
                    .sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
            }
        }
    }

    pub fn parts(&self) -> &[(f64, Ratio)] {
        &self.parts
    }

    pub fn is_zero(&self) -> bool {
        self.parts.is_empty()
    }

    /// The undelayed rational value, if there are no delays.
    pub fn as_ratio(&self) -> Option<Ratio> {
        match self.parts.as_slice() {
            [] => Some(Ratio::zero()),
            [(t, r)] if *t == 0.0 => Some(r.clone()),
            _ => None,
        }
    }

    pub fn has_delays(&self) -> bool {
        self.parts.iter().any(|(t, _)| *t != 0.0)
    }

    pub fn free_symbols(&self) -> BTreeSet<String> {
        self.parts
            .iter()
            .flat_map(|(_, r)| r.free_symbols())
            .collect()
    }

    pub fn contains(&self, var: &str) -> bool {
        self.parts.iter().any(|(_, r)| r.contains(var))
    }

    pub fn add(&self, other: &Delayed) -> Delayed {
        let mut out = self.clone();
        for (t, r) in &other.parts {
            out.push(*t, r.clone());
        }
        out
    }

    pub fn sub(&self, other: &Delayed) -> Delayed {
        self.add(&other.neg())
    }

    pub fn neg(&self) -> Delayed {
        Delayed {
            parts: self.parts.iter().map(|(t, r)| (*t, r.neg())).collect(),
        }
    }

    pub fn mul(&self, other: &Delayed) -> Delayed {
        let mut out = Delayed::zero();
        for (ta, ra) in &self.parts {
            for (tb, rb) in &other.parts {
                out.push(ta + tb, ra.mul(rb));
            }
        }
        out
    }

    pub fn mul_ratio(&self, k: &Ratio) -> Delayed {
        let mut out = Delayed::zero();
        for (t, r) in &self.parts {
            out.push(*t, r.mul(k));
        }
        out
    }

    /// Division; the divisor must be a single (possibly delayed) rational term.
    pub fn div(&self, other: &Delayed) -> Result<Delayed> {
        let [(td, rd)] = other.parts.as_slice() else {
            return Err(SymnodalError::Algebra(format!(
                "cannot divide by a sum of differently delayed terms: {}",
                other
            )));
        };
        let inv = rd.inv()?;
        let mut out = Delayed::zero();
        for (t, r) in &self.parts {
            out.push(t - td, r.mul(&inv));
        }
        Ok(out)
    }

    pub fn map_ratios<F>(&self, f: F) -> Result<Delayed>
    where
        F: Fn(&Ratio) -> Result<Ratio>,
    {
        let mut out = Delayed::zero();
        for (t, r) in &self.parts {
            out.push(*t, f(r)?);
        }
        Ok(out)
    }

    pub fn subs(&self, var: &str, value: &Ratio) -> Result<Delayed> {
        self.map_ratios(|r| r.subs(var, value))
    }

    pub fn eval(&self, values: &HashMap<String, C64>) -> Result<Delayed> {
        self.map_ratios(|r| r.eval(values))
    }

    /// Conjugate along the real frequency axis: coefficients conjugated, delays negated.
    pub fn conj(&self) -> Delayed {
        let mut out = Delayed::zero();
        for (t, r) in &self.parts {
            out.push(-t, r.conj());
        }
        out
    }

    /// Numeric value with `var = x`, where `s_equiv` is the Laplace-variable
    /// value that drives the delay kernels.
    pub fn evaluate(
        &self,
        var: &str,
        x: C64,
        s_equiv: C64,
        values: &HashMap<String, C64>,
    ) -> Result<C64> {
        let mut bound = values.clone();
        bound.insert(var.to_string(), x);
        let mut acc = C64::new(0.0, 0.0);
        for (t, r) in &self.parts {
            acc += r.evaluate(&bound)? * (-s_equiv * *t).exp();
        }
        Ok(acc)
    }

    /// Formats with a caller-supplied kernel for each non-zero delay.
    pub fn fmt_with(&self, kernel: impl Fn(f64) -> String) -> String {
        if self.parts.is_empty() {
            return "0".to_string();
        }
        self.parts
            .iter()
            .map(|(t, r)| {
                if *t == 0.0 {
                    r.to_string()
                } else if r.is_one() {
                    kernel(*t)
                } else {
                    format!("({})*{}", r, kernel(*t))
                }
            })
            .collect::<Vec<_>>()
            .join(" + ")
    }
}

impl PartialEq for Delayed {
    fn eq(&self, other: &Self) -> bool {
        self.sub(other).is_zero()
    }
}

impl fmt::Display for Delayed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fmt_with(|t| format!("exp(-s*{})", fmt_real(t))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delays_merge_and_cancel() {
        let a = Delayed::delayed(Ratio::real(2.0), 1.0);
        let b = Delayed::delayed(Ratio::real(-2.0), 1.0);
        assert!(a.add(&b).is_zero());
        let c = a.add(&Delayed::from_ratio(Ratio::one()));
        assert_eq!(c.parts().len(), 2);
        assert!(c.has_delays());
    }

    #[test]
    fn test_mul_adds_delays() {
        let a = Delayed::delayed(Ratio::symbol("s"), 1.0);
        let b = Delayed::delayed(Ratio::one(), 0.5);
        let p = a.mul(&b);
        assert_eq!(p.parts().len(), 1);
        assert!((p.parts()[0].0 - 1.5).abs() < 1e-15);
    }

    #[test]
    fn test_div_by_delayed_term() {
        let a = Delayed::delayed(Ratio::real(4.0), 2.0);
        let b = Delayed::delayed(Ratio::real(2.0), 1.0);
        let q = a.div(&b).unwrap();
        assert_eq!(q, Delayed::delayed(Ratio::real(2.0), 1.0));
        let sum = b.add(&Delayed::from_ratio(Ratio::one()));
        assert!(a.div(&sum).is_err());
    }

    #[test]
    fn test_evaluate_kernel() {
        let a = Delayed::delayed(Ratio::one(), 1.0);
        let v = a
            .evaluate("s", C64::new(1.0, 0.0), C64::new(1.0, 0.0), &HashMap::new())
            .unwrap();
        assert!((v.re - (-1.0f64).exp()).abs() < 1e-12);
    }
}
