//! Noise amplitude spectral densities.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::cas::poly::fmt_real;
use crate::cas::{Ratio, C64};
use crate::error::Result;

/// Amplitude spectral density `Σ cₖ·|rₖ|`.
///
/// Each `rₖ` is a rational in the frequency variable and may carry a phase;
/// only its magnitude contributes. Multiplying by a transfer function
/// therefore scales the density by the magnitude response, and terms of
/// one noise process add as magnitudes.
#[derive(Debug, Clone, Default)]
pub struct Density {
    terms: Vec<(f64, Ratio)>,
}

impl Density {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn from_ratio(r: Ratio) -> Self {
        let mut d = Self::zero();
        d.push(1.0, r);
        d
    }

    /// Adds `c·|r|`, folding numeric constants into the coefficient and
    /// merging with a term that differs only by a constant factor.
    fn push(&mut self, c: f64, r: Ratio) {
        if c == 0.0 || r.is_zero() {
            return;
        }
        let (c, r) = match (r.as_real(), r.as_constant()) {
            (Some(x), _) => (c * x, Ratio::one()),
            (None, Some(k)) => (c * k.norm(), Ratio::one()),
            (None, None) => (c, r),
        };
        let existing = self.terms.iter().position(|(_, ri)| {
            r.div(ri).ok().and_then(|q| q.as_constant()).is_some()
        });
        let Some(i) = existing else {
            self.terms.push((c, r));
            return;
        };
        let k = r
            .div(&self.terms[i].1)
            .ok()
            .and_then(|q| q.as_constant())
            .map_or(1.0, |k| k.norm());
        let before = self.terms[i].0;
        let after = before + c * k;
        if after.abs() <= 1e-12 * (before.abs() + (c * k).abs()) {
            self.terms.remove(i);
        } else {
            self.terms[i].0 = after;
        }
    }

    pub fn terms(&self) -> &[(f64, Ratio)] {
        &self.terms
    }

    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn neg(&self) -> Density {
        Density {
            terms: self.terms.iter().map(|(c, r)| (-c, r.clone())).collect(),
        }
    }

    pub fn add(&self, other: &Density) -> Density {
        let mut out = self.clone();
        for (c, r) in &other.terms {
            out.push(*c, r.clone());
        }
        out
    }

    pub fn sub(&self, other: &Density) -> Density {
        self.add(&other.neg())
    }

    /// Product with a constant; real numeric factors keep their sign.
    pub fn mul_ratio(&self, k: &Ratio) -> Density {
        match k.as_real() {
            Some(x) => Density {
                terms: self
                    .terms
                    .iter()
                    .filter(|_| x != 0.0)
                    .map(|(c, r)| (c * x, r.clone()))
                    .collect(),
            },
            None => self.mul_magnitude(k),
        }
    }

    pub fn div_ratio(&self, k: &Ratio) -> Result<Density> {
        Ok(self.mul_ratio(&k.inv()?))
    }

    /// Product with `|h|`, e.g. a transfer function evaluated at `j2πf`.
    pub fn mul_magnitude(&self, h: &Ratio) -> Density {
        let mut out = Density::zero();
        for (c, r) in &self.terms {
            out.push(*c, r.mul(h));
        }
        out
    }

    /// Applies a map to every rational and re-merges the terms.
    pub fn map_ratios<F>(&self, f: F) -> Result<Density>
    where
        F: Fn(&Ratio) -> Result<Ratio>,
    {
        let mut out = Density::zero();
        for (c, r) in &self.terms {
            out.push(*c, f(r)?);
        }
        Ok(out)
    }

    pub fn free_symbols(&self) -> BTreeSet<String> {
        self.terms
            .iter()
            .flat_map(|(_, r)| r.free_symbols())
            .collect()
    }

    /// Density at bound symbol values.
    pub fn evaluate(&self, values: &HashMap<String, C64>) -> Result<f64> {
        let mut acc = 0.0;
        for (c, r) in &self.terms {
            acc += c * r.evaluate(values)?.norm();
        }
        Ok(acc)
    }

    /// The density as one rational whose magnitude it is; `None` when the
    /// terms differ in shape.
    pub fn as_ratio(&self) -> Option<Ratio> {
        match self.terms.as_slice() {
            [] => Some(Ratio::zero()),
            [(c, r)] => Some(r.scale(C64::new(*c, 0.0))),
            _ => None,
        }
    }

    /// Numeric value of a frequency-independent density.
    pub fn as_real(&self) -> Option<f64> {
        self.terms
            .iter()
            .map(|(c, r)| r.as_constant().map(|k| c * k.norm()))
            .sum()
    }
}

impl PartialEq for Density {
    fn eq(&self, other: &Self) -> bool {
        self.sub(other).is_zero()
    }
}

impl fmt::Display for Density {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            return write!(f, "0");
        }
        let parts: Vec<String> = self
            .terms
            .iter()
            .map(|(c, r)| match (r.is_one(), *c == 1.0) {
                (true, _) => fmt_real(*c),
                (false, true) => format!("|{}|", r),
                (false, false) => format!("{}*|{}|", fmt_real(*c), r),
            })
            .collect();
        write!(f, "{}", parts.join(" + "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cas;
    use approx::assert_abs_diff_eq;

    fn at_f(d: &Density, f: f64) -> f64 {
        let values = HashMap::from([(cas::F.to_string(), C64::new(f, 0.0))]);
        d.evaluate(&values).unwrap()
    }

    #[test]
    fn test_constants_add_algebraically() {
        let three = Density::from_ratio(Ratio::real(3.0));
        let four = Density::from_ratio(Ratio::real(4.0));
        assert_eq!(three.add(&four).as_real(), Some(7.0));
        assert!(three.sub(&three).is_zero());
    }

    #[test]
    fn test_magnitude_of_filtered_term() {
        // |1/(1 + j2πf)| at f = 1/2π
        let h = Ratio::one().add(&cas::j2pif()).inv().unwrap();
        let d = Density::from_ratio(Ratio::one()).mul_magnitude(&h);
        let f = 0.5 / std::f64::consts::PI;
        assert_abs_diff_eq!(at_f(&d, f), 0.5f64.sqrt(), epsilon = 1e-12);

        // magnitudes add within one process
        let sum = d.add(&Density::from_ratio(Ratio::one()));
        assert_abs_diff_eq!(at_f(&sum, f), 1.0 + 0.5f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_phase_does_not_split_terms() {
        let h = Ratio::one().add(&cas::j2pif()).inv().unwrap();
        let a = Density::from_ratio(h.clone());
        let b = Density::from_ratio(h.scale(C64::new(0.0, -2.0)));
        let sum = a.add(&b);
        assert_eq!(sum.terms().len(), 1);
        assert_abs_diff_eq!(sum.terms()[0].0, 3.0, epsilon = 1e-12);
    }
}
