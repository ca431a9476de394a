//! Numeric evaluation of expressions.

use std::collections::HashMap;
use std::f64::consts::PI;

use super::domain::Domain;
use super::expression::{Expr, Value};
use crate::cas::{self, C64};
use crate::error::{Result, SymnodalError};

impl Expr {
    /// Value at a complex point of the domain variable. Time-domain values
    /// use the real part of the point and exclude impulses.
    pub fn evaluate_at(&self, x: C64) -> Result<C64> {
        self.evaluate_with(x, &HashMap::new())
    }

    /// Like [`Expr::evaluate_at`] with values bound for other symbols.
    pub fn evaluate_with(&self, x: C64, values: &HashMap<String, C64>) -> Result<C64> {
        match self.value() {
            Value::Time(s) | Value::DiscreteTime(s) | Value::DiscreteFrequency(s) => {
                s.value_at(x.re, values)
            }
            Value::Laplace(d) => d.evaluate(cas::S, x, x, values),
            Value::Fourier(d) => d.evaluate(cas::F, x, x * C64::new(0.0, 2.0 * PI), values),
            Value::AngularFourier(d) => d.evaluate(cas::OMEGA, x, x * C64::new(0.0, 1.0), values),
            Value::Z(r) => {
                let mut bound = values.clone();
                bound.insert(cas::Z.to_string(), x);
                r.evaluate(&bound)
            }
            Value::Constant(r) => r.evaluate(values),
            Value::Phasor { value, omega } => {
                let mut bound = values.clone();
                bound.insert(cas::OMEGA.to_string(), omega.value().evaluate(values)?);
                value.evaluate(&bound)
            }
            Value::NoiseF { asd, .. } => {
                let mut bound = values.clone();
                bound.insert(cas::F.to_string(), x);
                Ok(C64::new(asd.evaluate(&bound)?, 0.0))
            }
            Value::NoiseOmega { asd, .. } => {
                let mut bound = values.clone();
                bound.insert(cas::OMEGA.to_string(), x);
                Ok(C64::new(asd.evaluate(&bound)?, 0.0))
            }
        }
    }

    /// Values at real points of the domain variable.
    pub fn evaluate(&self, points: &[f64]) -> Result<Vec<C64>> {
        points
            .iter()
            .map(|p| self.evaluate_at(C64::new(*p, 0.0)))
            .collect()
    }

    /// Response at the given linear frequencies in hertz.
    pub fn frequency_response(&self, freqs: &[f64]) -> Result<Vec<C64>> {
        match self.domain() {
            Domain::Laplace => freqs
                .iter()
                .map(|f| self.evaluate_at(C64::new(0.0, 2.0 * PI * f)))
                .collect(),
            Domain::Fourier | Domain::NoiseF | Domain::Constant => self.evaluate(freqs),
            Domain::AngularFourier | Domain::NoiseOmega => freqs
                .iter()
                .map(|f| self.evaluate_at(C64::new(2.0 * PI * f, 0.0)))
                .collect(),
            Domain::Z => freqs
                .iter()
                .map(|f| self.evaluate_at(C64::from_polar(1.0, 2.0 * PI * f)))
                .collect(),
            Domain::Time | Domain::DiscreteTime => self.laplace_or_z()?.frequency_response(freqs),
            d => Err(SymnodalError::IncompatibleOperands(format!(
                "no frequency response for a {} expression",
                d
            ))),
        }
    }

    fn laplace_or_z(&self) -> Result<Expr> {
        match self.domain() {
            Domain::DiscreteTime => self.zt(),
            _ => self.laplace(),
        }
    }

    /// Samples of the time-domain waveform, impulses excluded.
    pub fn transient_response(&self, times: &[f64]) -> Result<Vec<f64>> {
        let x = match self.domain() {
            Domain::Time | Domain::DiscreteTime => self.clone(),
            Domain::Z => self.izt()?,
            _ => self.time()?,
        };
        times
            .iter()
            .map(|t| {
                let v = x.evaluate_at(C64::new(*t, 0.0))?;
                if v.im.abs() > 1e-9 * v.re.abs().max(1.0) {
                    return Err(SymnodalError::Algebra(format!(
                        "time-domain value {} at {} is not real",
                        v, t
                    )));
                }
                Ok(v.re)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cas::Ratio;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_frequency_response_of_low_pass() {
        let h = Expr::parse("1/(s + 1)", Domain::Laplace).unwrap();
        let corner = 1.0 / (2.0 * PI);
        let r = h.frequency_response(&[0.0, corner]).unwrap();
        assert_abs_diff_eq!(r[0].norm(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(r[1].norm(), 1.0 / 2f64.sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(r[1].arg(), -PI / 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_delay_shows_in_phase() {
        let h = Expr::parse("exp(-s)", Domain::Laplace).unwrap();
        let r = h.frequency_response(&[0.25]).unwrap();
        assert_abs_diff_eq!(r[0].arg(), -PI / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_transient_response_from_laplace() {
        let h = Expr::parse("1/(s*(s + 1))", Domain::Laplace).unwrap();
        let y = h.transient_response(&[0.0, 1.0, 10.0]).unwrap();
        assert_abs_diff_eq!(y[0], 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(y[1], 1.0 - (-1.0f64).exp(), epsilon = 1e-9);
        assert_abs_diff_eq!(y[2], 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_with_values_binds_symbols() {
        let h = Expr::parse("1/(s*R*C + 1)", Domain::Laplace).unwrap();
        let mut values = HashMap::new();
        values.insert("R".to_string(), 1e3);
        values.insert("C".to_string(), 1e-6);
        let bound = h.with_values(&values).unwrap();
        assert_eq!(bound, Expr::parse("1000/(s + 1000)", Domain::Laplace).unwrap());
        let v = bound.evaluate_at(C64::new(0.0, 1000.0)).unwrap();
        assert_abs_diff_eq!(v.norm(), 1.0 / 2f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_subs_symbol() {
        let h = Expr::parse("R1 + R2", Domain::Constant).unwrap();
        let v = h.subs("R2", &Ratio::real(5.0)).unwrap();
        assert_eq!(v, Expr::parse("R1 + 5", Domain::Constant).unwrap());
    }
}
